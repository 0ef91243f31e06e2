use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::app::FirebaseApp;
use crate::component::types::{DynService, InstanceFactory};
use crate::component::{Component, ComponentContainer};
use crate::functions::constants::{
    APP_CHECK_INTERNAL_COMPONENT, AUTH_INTERNAL_COMPONENT, MESSAGING_INTERNAL_COMPONENT,
};
use crate::functions::error::FunctionsResult;
use crate::functions::LOGGER;
use crate::platform::token::{AsyncTokenProvider, TokenProviderService};

/// Metadata that may be attached to callable Function requests.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CallContext {
    pub auth_token: Option<String>,
    pub messaging_token: Option<String>,
    pub app_check_token: Option<String>,
}

/// Resolves the tokens registered on the app at call time, so providers added after the
/// `Functions` instance was created are still picked up.
pub struct ContextProvider {
    container: ComponentContainer,
}

impl Debug for ContextProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextProvider")
            .field("app", &self.container.name())
            .finish()
    }
}

impl ContextProvider {
    pub fn new(app: &FirebaseApp) -> Self {
        Self {
            container: app.container(),
        }
    }

    pub async fn get_context_async(&self, limited_use_app_check_tokens: bool) -> CallContext {
        let auth_token = match self.provider(AUTH_INTERNAL_COMPONENT) {
            Some(provider) => {
                let result = provider.get_token(false).await;
                non_empty(AUTH_INTERNAL_COMPONENT, result)
            }
            None => None,
        };

        let messaging_token = match self.provider(MESSAGING_INTERNAL_COMPONENT) {
            Some(provider) => {
                let result = provider.get_token(false).await;
                non_empty(MESSAGING_INTERNAL_COMPONENT, result)
            }
            None => None,
        };

        let app_check_token = match self.provider(APP_CHECK_INTERNAL_COMPONENT) {
            Some(provider) => {
                let result = if limited_use_app_check_tokens {
                    provider.get_limited_use_token().await
                } else {
                    provider.get_token(false).await
                };
                non_empty(APP_CHECK_INTERNAL_COMPONENT, result)
            }
            None => None,
        };

        CallContext {
            auth_token,
            messaging_token,
            app_check_token,
        }
    }

    fn provider(&self, name: &str) -> Option<Arc<dyn AsyncTokenProvider>> {
        self.container
            .get_provider(name)
            .get_immediate::<TokenProviderService>()
            .map(|service| Arc::clone(service.provider()))
    }
}

fn non_empty(
    source: &str,
    result: Result<Option<String>, crate::platform::token::TokenError>,
) -> Option<String> {
    match result {
        Ok(Some(token)) if !token.is_empty() => Some(token),
        Ok(_) => None,
        Err(err) => {
            LOGGER.warn(format!(
                "Failed to retrieve {source} token, sending the call without it: {err}"
            ));
            None
        }
    }
}

fn register_token_provider(
    app: &FirebaseApp,
    component_name: &'static str,
    provider: Arc<dyn AsyncTokenProvider>,
) -> FunctionsResult<()> {
    let service = TokenProviderService::new(provider);
    let factory: InstanceFactory =
        Arc::new(move |_container, _options| Ok(Arc::new(service.clone()) as DynService));
    app.add_or_overwrite_component(Component::new(component_name, factory))?;
    Ok(())
}

/// Supplies the Firebase Auth ID token sent as `Authorization: Bearer <token>`.
pub fn set_auth_token_provider(
    app: &FirebaseApp,
    provider: Arc<dyn AsyncTokenProvider>,
) -> FunctionsResult<()> {
    register_token_provider(app, AUTH_INTERNAL_COMPONENT, provider)
}

/// Supplies the App Check token sent as `X-Firebase-AppCheck`.
pub fn set_app_check_token_provider(
    app: &FirebaseApp,
    provider: Arc<dyn AsyncTokenProvider>,
) -> FunctionsResult<()> {
    register_token_provider(app, APP_CHECK_INTERNAL_COMPONENT, provider)
}

/// Supplies the FCM registration token sent as `Firebase-Instance-ID-Token`.
pub fn set_messaging_token_provider(
    app: &FirebaseApp,
    provider: Arc<dyn AsyncTokenProvider>,
) -> FunctionsResult<()> {
    register_token_provider(app, MESSAGING_INTERNAL_COMPONENT, provider)
}
