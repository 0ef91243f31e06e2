use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::functions::error::FunctionsResult;

#[derive(Clone, Debug)]
pub struct CallableRequest {
    pub url: String,
    pub payload: JsonValue,
    pub timeout: Duration,
    pub headers: HashMap<String, String>,
}

impl CallableRequest {
    pub fn new(url: impl Into<String>, payload: JsonValue, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            payload,
            timeout,
            headers: HashMap::new(),
        }
    }
}

/// Performs one callable exchange and returns the parsed response body.
///
/// Implementations map HTTP-level failures through
/// [`error_for_http_response`](crate::functions::error::error_for_http_response); they never
/// retry.
#[async_trait]
pub trait CallableTransport: Send + Sync {
    async fn invoke(&self, request: CallableRequest) -> FunctionsResult<JsonValue>;
}

/// Transport a fresh `Functions` instance starts with. Each instance owns its connection pool.
pub fn default_transport() -> Arc<dyn CallableTransport> {
    Arc::new(HttpCallableTransport::new())
}

/// reqwest-backed transport.
#[derive(Clone, Debug, Default)]
pub struct HttpCallableTransport {
    client: reqwest::Client,
}

impl HttpCallableTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CallableTransport for HttpCallableTransport {
    async fn invoke(&self, request: CallableRequest) -> FunctionsResult<JsonValue> {
        http::invoke(&self.client, request).await
    }
}

mod http {
    use super::{CallableRequest, JsonValue};
    use crate::functions::error::{
        decoding_error, error_for_http_response, invalid_argument, network_error,
        FunctionsError, FunctionsErrorCode, FunctionsResult,
    };
    use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
    use reqwest::{Client, Response};
    use std::collections::HashMap;

    fn build_headers(headers: &HashMap<String, String>) -> FunctionsResult<HeaderMap> {
        let mut map = HeaderMap::new();
        for (key, value) in headers {
            let name = HeaderName::from_bytes(key.as_bytes())
                .map_err(|err| invalid_argument(format!("invalid header name `{key}`: {err}")))?;
            let header_value = HeaderValue::from_str(value).map_err(|err| {
                invalid_argument(format!("invalid header value for `{key}`: {err}"))
            })?;
            map.insert(name, header_value);
        }
        Ok(map)
    }

    fn map_reqwest_error(err: reqwest::Error) -> FunctionsError {
        if err.is_timeout() {
            return network_error(
                FunctionsErrorCode::DeadlineExceeded,
                format!("callable request timed out: {err}"),
            );
        }
        if err.is_connect() {
            return network_error(
                FunctionsErrorCode::Unavailable,
                format!("failed to connect to callable endpoint: {err}"),
            );
        }
        if err.is_builder() {
            return invalid_argument(format!("malformed callable request: {err}"));
        }
        network_error(
            FunctionsErrorCode::Unavailable,
            format!("callable request failed: {err}"),
        )
    }

    pub(super) async fn invoke(
        client: &Client,
        request: CallableRequest,
    ) -> FunctionsResult<JsonValue> {
        let CallableRequest {
            url,
            payload,
            timeout,
            headers,
        } = request;

        let header_map = build_headers(&headers)?;
        log::debug!("POST {url} (timeout {timeout:?})");
        let response = client
            .post(url)
            .timeout(timeout)
            .headers(header_map)
            .json(&payload)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        handle_response(response).await
    }

    async fn handle_response(response: Response) -> FunctionsResult<JsonValue> {
        let status = response.status();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        log::debug!("callable response {status} ({} bytes)", bytes.len());

        let (body, parse_error) = if bytes.is_empty() {
            (None, None)
        } else {
            match serde_json::from_slice::<JsonValue>(&bytes) {
                Ok(value) => (Some(value), None),
                Err(err) => (None, Some(err)),
            }
        };

        if let Some(error) = error_for_http_response(status.as_u16(), body.as_ref()) {
            return Err(error);
        }

        if let Some(err) = parse_error {
            return Err(decoding_error(format!(
                "Response is not valid JSON object: {err}"
            )));
        }

        body.ok_or_else(|| decoding_error("Response is not valid JSON object."))
    }
}
