use std::error::Error;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

/// Error type returned by async token providers when token acquisition fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenError {
    message: String,
}

impl TokenError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn from_error(err: impl Error) -> Self {
        Self::new(err.to_string())
    }
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for TokenError {}

/// Source of the bearer-style tokens attached to outgoing requests (auth ID token, App Check
/// token, messaging registration token).
#[async_trait]
pub trait AsyncTokenProvider: Send + Sync {
    async fn get_token(&self, force_refresh: bool) -> Result<Option<String>, TokenError>;

    /// Single-use token for endpoints that opt into replay protection. Providers without such a
    /// notion hand out their regular token.
    async fn get_limited_use_token(&self) -> Result<Option<String>, TokenError> {
        self.get_token(false).await
    }
}

/// Component service wrapping a token provider so it can be stored in an app container.
#[derive(Clone)]
pub struct TokenProviderService {
    provider: Arc<dyn AsyncTokenProvider>,
}

impl TokenProviderService {
    pub fn new(provider: Arc<dyn AsyncTokenProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &Arc<dyn AsyncTokenProvider> {
        &self.provider
    }
}

impl fmt::Debug for TokenProviderService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenProviderService").finish_non_exhaustive()
    }
}

/// Provider that always returns the same token; handy for service accounts and tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl AsyncTokenProvider for StaticTokenProvider {
    async fn get_token(&self, _force_refresh: bool) -> Result<Option<String>, TokenError> {
        Ok(Some(self.token.clone()))
    }
}
