use std::marker::PhantomData;
use std::pin::pin;
use std::sync::{Arc, LazyLock, Mutex, RwLock};
use std::time::Duration;

use futures::future::{select, Either};
use serde_json::{Map, Value as JsonValue};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::app;
use crate::app::FirebaseApp;
use crate::component::types::{ComponentError, DynService, InstanceFactoryOptions};
use crate::component::{Component, ComponentContainer};
use crate::functions::constants::{DEFAULT_REGION, DEFAULT_TIMEOUT_MS, FUNCTIONS_COMPONENT_NAME};
use crate::functions::context::ContextProvider;
use crate::functions::error::{
    cancelled, configuration_error, decoding_error, invalid_argument, network_error,
    FunctionsErrorCode, FunctionsResult,
};
use crate::functions::serializer::{decode, encode};
use crate::functions::transport::{default_transport, CallableRequest, CallableTransport};
use crate::functions::value::CallableValue;
use crate::functions::LOGGER;

/// Client entry point for invoking HTTPS callable Cloud Functions of one app and one region (or
/// custom domain).
///
/// Obtain it with [`get_functions`]; instances are cached per app and identifier.
#[derive(Clone)]
pub struct Functions {
    inner: Arc<FunctionsInner>,
}

struct FunctionsInner {
    app: FirebaseApp,
    endpoint: Endpoint,
    context: ContextProvider,
    transport: RwLock<Arc<dyn CallableTransport>>,
}

impl std::fmt::Debug for Functions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Functions")
            .field("app", &self.inner.app.name())
            .field("endpoint", &self.inner.endpoint)
            .field("context", &self.inner.context)
            .finish()
    }
}

impl Functions {
    fn new(app: FirebaseApp, endpoint: Endpoint) -> Self {
        let context = ContextProvider::new(&app);
        Self {
            inner: Arc::new(FunctionsInner {
                app,
                endpoint,
                context,
                transport: RwLock::new(default_transport()),
            }),
        }
    }

    pub fn app(&self) -> &FirebaseApp {
        &self.inner.app
    }

    pub fn region(&self) -> &str {
        self.inner.endpoint.region()
    }

    pub fn custom_domain(&self) -> Option<&str> {
        self.inner.endpoint.custom_domain.as_deref()
    }

    pub fn emulator_origin(&self) -> Option<String> {
        self.inner.endpoint.emulator_origin()
    }

    /// Routes every subsequent call to a local Functions emulator.
    pub fn use_emulator(&self, host: &str, port: u16) {
        let origin = format!("http://{host}:{port}");
        LOGGER.info(format!(
            "Routing callable Functions of app '{}' to the emulator at {origin}",
            self.inner.app.name()
        ));
        self.inner.endpoint.set_emulator_origin(origin);
    }

    /// Swaps the HTTP layer, e.g. to share a configured `reqwest::Client` or to stub the backend.
    pub fn set_transport(&self, transport: Arc<dyn CallableTransport>) {
        *self
            .inner
            .transport
            .write()
            .unwrap_or_else(|poison| poison.into_inner()) = transport;
    }

    fn transport(&self) -> Arc<dyn CallableTransport> {
        self.inner
            .transport
            .read()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }

    /// Returns a reference to the callable function `name` using default options.
    ///
    /// Fails with a configuration error once the owning app has been deleted.
    pub fn https_callable(&self, name: &str) -> FunctionsResult<HttpsCallable> {
        self.https_callable_with_options(name, HttpsCallableOptions::default())
    }

    pub fn https_callable_with_options(
        &self,
        name: &str,
        options: HttpsCallableOptions,
    ) -> FunctionsResult<HttpsCallable> {
        self.inner.app.check_destroyed()?;
        let name = name.trim().trim_matches('/');
        if name.is_empty() {
            return Err(invalid_argument("Function name must not be empty"));
        }
        Ok(HttpsCallable {
            functions: self.clone(),
            target: CallableTarget::Name(name.to_string()),
            options,
        })
    }

    /// Returns a reference to a callable deployed at an explicit URL. Region, custom domain and
    /// emulator settings do not apply to it.
    pub fn https_callable_from_url(
        &self,
        url: &str,
        options: HttpsCallableOptions,
    ) -> FunctionsResult<HttpsCallable> {
        self.inner.app.check_destroyed()?;
        let parsed = Url::parse(url.trim())
            .map_err(|err| invalid_argument(format!("Invalid callable URL `{url}`: {err}")))?;
        Ok(HttpsCallable {
            functions: self.clone(),
            target: CallableTarget::Url(parsed.to_string()),
            options,
        })
    }

    /// Typed variant of [`Functions::https_callable`] that serializes requests and deserializes
    /// responses with serde.
    pub fn typed_callable<Request, Response>(
        &self,
        name: &str,
    ) -> FunctionsResult<TypedCallable<Request, Response>>
    where
        Request: serde::Serialize,
        Response: serde::de::DeserializeOwned,
    {
        Ok(TypedCallable {
            callable: self.https_callable(name)?,
            _request: PhantomData,
            _response: PhantomData,
        })
    }

    fn callable_url(&self, name: &str) -> FunctionsResult<String> {
        self.inner.app.check_destroyed()?;
        let project_id = self
            .inner
            .app
            .options()
            .project_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                configuration_error("FirebaseOptions.project_id is required to call Functions")
            })?;
        Ok(self.inner.endpoint.callable_url(&project_id, name))
    }

    fn context(&self) -> &ContextProvider {
        &self.inner.context
    }
}

/// Per-reference settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpsCallableOptions {
    /// Upper bound for the whole exchange; exceeding it fails with `deadline-exceeded`.
    pub timeout: Duration,
    /// Ask the App Check provider for a single-use token.
    pub limited_use_app_check_tokens: bool,
}

impl Default for HttpsCallableOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            limited_use_app_check_tokens: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum CallableTarget {
    Name(String),
    Url(String),
}

/// Decoded payload returned by a successful call.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct HttpsCallableResult {
    data: CallableValue,
}

impl HttpsCallableResult {
    pub fn new(data: CallableValue) -> Self {
        Self { data }
    }

    pub fn data(&self) -> &CallableValue {
        &self.data
    }

    pub fn into_data(self) -> CallableValue {
        self.data
    }
}

/// Reference to one callable function. Cheap to clone; holds no per-call state.
///
/// [`invoke`](Self::invoke) and [`call`](Self::call) are the same operation: `invoke(None)` and
/// `call(CallableValue::Null)` send the same `{"data": null}` request.
#[derive(Clone, Debug)]
pub struct HttpsCallable {
    functions: Functions,
    target: CallableTarget,
    options: HttpsCallableOptions,
}

impl HttpsCallable {
    /// Function name, or the full URL for references built with
    /// [`Functions::https_callable_from_url`].
    pub fn name(&self) -> &str {
        match &self.target {
            CallableTarget::Name(name) | CallableTarget::Url(name) => name,
        }
    }

    pub fn region(&self) -> &str {
        self.functions.region()
    }

    pub fn options(&self) -> &HttpsCallableOptions {
        &self.options
    }

    pub fn url(&self) -> FunctionsResult<String> {
        match &self.target {
            CallableTarget::Name(name) => self.functions.callable_url(name),
            CallableTarget::Url(url) => {
                self.functions.app().check_destroyed()?;
                Ok(url.clone())
            }
        }
    }

    /// Invokes the function with an optional argument; `None` sends a null payload.
    pub async fn invoke(&self, data: Option<CallableValue>) -> FunctionsResult<HttpsCallableResult> {
        self.execute(data.unwrap_or_default(), None).await
    }

    /// Invokes the function with `data`.
    pub async fn call(&self, data: impl Into<CallableValue>) -> FunctionsResult<HttpsCallableResult> {
        self.execute(data.into(), None).await
    }

    /// Like [`call`](Self::call), but resolves with a `cancelled` error as soon as `token` fires.
    /// The in-flight request is dropped and no partial result is delivered.
    pub async fn call_with_cancellation(
        &self,
        data: impl Into<CallableValue>,
        token: &CancellationToken,
    ) -> FunctionsResult<HttpsCallableResult> {
        self.execute(data.into(), Some(token)).await
    }

    async fn execute(
        &self,
        data: CallableValue,
        cancellation: Option<&CancellationToken>,
    ) -> FunctionsResult<HttpsCallableResult> {
        let Some(token) = cancellation else {
            return self.exchange(data).await;
        };
        if token.is_cancelled() {
            return Err(cancelled(format!("Call to {} was cancelled", self.name())));
        }

        let exchange = pin!(self.exchange(data));
        let cancelled_signal = pin!(token.cancelled());
        match select(exchange, cancelled_signal).await {
            Either::Left((result, _)) => result,
            Either::Right(_) => {
                LOGGER.debug(format!("Call to {} cancelled while in flight", self.name()));
                Err(cancelled(format!("Call to {} was cancelled", self.name())))
            }
        }
    }

    async fn exchange(&self, data: CallableValue) -> FunctionsResult<HttpsCallableResult> {
        let url = self.url()?;
        let mut envelope = Map::new();
        envelope.insert("data".to_string(), encode(&data)?);

        let mut request =
            CallableRequest::new(url, JsonValue::Object(envelope), self.options.timeout);
        request
            .headers
            .insert("Content-Type".to_string(), "application/json".to_string());

        let context = self
            .functions
            .context()
            .get_context_async(self.options.limited_use_app_check_tokens)
            .await;
        if let Some(token) = context.auth_token {
            request
                .headers
                .insert("Authorization".to_string(), format!("Bearer {token}"));
        }
        if let Some(token) = context.messaging_token {
            request
                .headers
                .insert("Firebase-Instance-ID-Token".to_string(), token);
        }
        if let Some(token) = context.app_check_token {
            request
                .headers
                .insert("X-Firebase-AppCheck".to_string(), token);
        }

        let timeout = self.options.timeout;
        let transport = self.functions.transport();
        let response_body = tokio::time::timeout(timeout, transport.invoke(request))
            .await
            .map_err(|_| {
                network_error(
                    FunctionsErrorCode::DeadlineExceeded,
                    format!("Call to {} exceeded {timeout:?}", self.name()),
                )
            })??;
        extract_data(response_body).map(HttpsCallableResult::new)
    }
}

fn extract_data(body: JsonValue) -> FunctionsResult<CallableValue> {
    match body {
        JsonValue::Object(mut map) => match map.remove("data").or_else(|| map.remove("result")) {
            Some(data_value) => decode(&data_value),
            None => Err(decoding_error("Response is missing data field.")),
        },
        other => Err(decoding_error(format!(
            "Unexpected callable response shape: expected object, got {other}"
        ))),
    }
}

/// Integers above `i64::MAX` have no `Long` encoding and would otherwise degrade to doubles.
fn reject_unsigned_overflow(value: &JsonValue) -> FunctionsResult<()> {
    match value {
        JsonValue::Number(number) if number.is_u64() && number.as_i64().is_none() => Err(
            invalid_argument(format!("Integer {number} does not fit in a 64-bit signed value")),
        ),
        JsonValue::Array(values) => values.iter().try_for_each(reject_unsigned_overflow),
        JsonValue::Object(entries) => entries.values().try_for_each(reject_unsigned_overflow),
        _ => Ok(()),
    }
}

/// Callable handle whose payloads are plain serde types.
pub struct TypedCallable<Request, Response> {
    callable: HttpsCallable,
    _request: PhantomData<fn(Request)>,
    _response: PhantomData<fn() -> Response>,
}

impl<Request, Response> Clone for TypedCallable<Request, Response> {
    fn clone(&self) -> Self {
        Self {
            callable: self.callable.clone(),
            _request: PhantomData,
            _response: PhantomData,
        }
    }
}

impl<Request, Response> TypedCallable<Request, Response>
where
    Request: serde::Serialize,
    Response: serde::de::DeserializeOwned,
{
    /// Serializes `data`, invokes the function and deserializes the returned payload.
    ///
    /// Integers wider than 32 bits are sent as 64-bit wrapped values; unsigned values above
    /// `i64::MAX` are rejected with an invalid-argument error.
    pub async fn call_async(&self, data: &Request) -> FunctionsResult<Response> {
        let payload = serde_json::to_value(data).map_err(|err| {
            invalid_argument(format!("Failed to serialize callable payload: {err}"))
        })?;
        reject_unsigned_overflow(&payload)?;
        let result = self.callable.call(CallableValue::from(payload)).await?;
        serde_json::from_value(result.into_data().to_json()).map_err(|err| {
            decoding_error(format!(
                "Failed to deserialize callable response payload: {err}"
            ))
        })
    }

    pub fn name(&self) -> &str {
        self.callable.name()
    }

    pub fn untyped(&self) -> &HttpsCallable {
        &self.callable
    }
}

#[derive(Debug)]
struct Endpoint {
    region: String,
    custom_domain: Option<String>,
    emulator_origin: Mutex<Option<String>>,
}

impl Endpoint {
    /// Interprets the identifier passed to [`get_functions`]: anything that parses as a URL is a
    /// custom domain, anything else a region.
    fn new(identifier: Option<String>) -> Self {
        let Some(raw) = identifier
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
        else {
            return Self::default();
        };

        match Url::parse(&raw) {
            Ok(url) if url.has_host() => {
                let mut normalized = url.origin().ascii_serialization();
                let path = url.path();
                if path != "/" {
                    normalized.push_str(path.trim_end_matches('/'));
                }
                Self {
                    custom_domain: Some(normalized),
                    ..Self::default()
                }
            }
            _ => Self {
                region: raw,
                ..Self::default()
            },
        }
    }

    fn region(&self) -> &str {
        &self.region
    }

    fn emulator_origin(&self) -> Option<String> {
        self.emulator_origin
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .clone()
    }

    fn set_emulator_origin(&self, origin: String) {
        *self
            .emulator_origin
            .lock()
            .unwrap_or_else(|poison| poison.into_inner()) = Some(origin);
    }

    fn callable_url(&self, project_id: &str, name: &str) -> String {
        if let Some(origin) = self.emulator_origin() {
            return format!("{origin}/{project_id}/{}/{name}", self.region);
        }

        if let Some(domain) = &self.custom_domain {
            return format!("{}/{name}", domain.trim_end_matches('/'));
        }

        format!(
            "https://{}-{project_id}.cloudfunctions.net/{name}",
            self.region
        )
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            custom_domain: None,
            emulator_origin: Mutex::new(None),
        }
    }
}

static FUNCTIONS_COMPONENT: LazyLock<()> = LazyLock::new(|| {
    let component = Component::new(FUNCTIONS_COMPONENT_NAME, Arc::new(functions_factory))
        .with_multiple_instances(true);
    let _ = app::register_component(component);
});

fn functions_factory(
    container: &ComponentContainer,
    options: InstanceFactoryOptions,
) -> Result<DynService, ComponentError> {
    let app = container.root_service::<FirebaseApp>().ok_or_else(|| {
        ComponentError::InitializationFailed {
            name: FUNCTIONS_COMPONENT_NAME.to_string(),
            reason: "Firebase app not attached to component container".to_string(),
        }
    })?;

    let endpoint = Endpoint::new(options.instance_identifier);
    let functions = Functions::new((*app).clone(), endpoint);
    Ok(Arc::new(functions) as DynService)
}

/// Registers the Functions component with the global app registry. [`get_functions`] calls this
/// itself; calling it again is a no-op.
pub fn register_functions_component() {
    LazyLock::force(&FUNCTIONS_COMPONENT);
}

/// Fetches (or lazily creates) the `Functions` client for `app` (the default app when `None`).
///
/// `region_or_domain` selects a region such as `europe-west1`, or a custom domain when it parses
/// as a URL. Fails with a configuration error when the app does not exist or has been deleted.
pub async fn get_functions(
    app: Option<FirebaseApp>,
    region_or_domain: Option<&str>,
) -> FunctionsResult<Arc<Functions>> {
    register_functions_component();
    let app = match app {
        Some(app) => app,
        None => app::get_app(None).await?,
    };
    app.check_destroyed()?;

    let identifier = region_or_domain
        .map(str::trim)
        .filter(|value| !value.is_empty());
    app::get_provider(&app, FUNCTIONS_COMPONENT_NAME)
        .get_or_init::<Functions>(identifier)
        .map_err(|err| configuration_error(err.to_string()))
}

/// Points `functions` at a local emulator (`http://{host}:{port}`).
pub fn connect_functions_emulator(functions: &Functions, host: &str, port: u16) {
    functions.use_emulator(host, port);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{initialize_app, FirebaseAppSettings, FirebaseOptions};
    use crate::functions::context::{
        set_app_check_token_provider, set_auth_token_provider, set_messaging_token_provider,
    };
    use crate::functions::error::FunctionsError;
    use crate::platform::token::StaticTokenProvider;
    use crate::test_support::start_mock_server;
    use async_trait::async_trait;
    use httpmock::Method::POST;
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn unique_settings() -> FirebaseAppSettings {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        FirebaseAppSettings {
            name: Some(format!(
                "functions-{}",
                COUNTER.fetch_add(1, Ordering::SeqCst)
            )),
            ..Default::default()
        }
    }

    async fn test_app() -> FirebaseApp {
        let options = FirebaseOptions {
            project_id: Some("demo-project".into()),
            ..Default::default()
        };
        initialize_app(options, Some(unique_settings()))
            .await
            .unwrap()
    }

    /// Records requests and answers with a canned response.
    struct RecordingTransport {
        requests: Mutex<Vec<CallableRequest>>,
        response: FunctionsResult<JsonValue>,
    }

    impl RecordingTransport {
        fn new(response: FunctionsResult<JsonValue>) -> Arc<Self> {
            Arc::new(Self {
                requests: Mutex::new(Vec::new()),
                response,
            })
        }

        fn requests(&self) -> Vec<CallableRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CallableTransport for RecordingTransport {
        async fn invoke(&self, request: CallableRequest) -> FunctionsResult<JsonValue> {
            self.requests.lock().unwrap().push(request);
            self.response.clone()
        }
    }

    struct PendingTransport;

    #[async_trait]
    impl CallableTransport for PendingTransport {
        async fn invoke(&self, _request: CallableRequest) -> FunctionsResult<JsonValue> {
            futures::future::pending().await
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn https_callable_invokes_backend() {
        let Some(server) = start_mock_server("https_callable_invokes_backend") else {
            return;
        };
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/callable/hello")
                .header("content-type", "application/json")
                .json_body(json!({ "data": { "message": "ping" } }));
            then.status(200)
                .json_body(json!({ "result": { "message": "pong" } }));
        });

        let functions = get_functions(Some(test_app().await), Some(&server.url("/callable")))
            .await
            .unwrap();
        let callable = functions.https_callable("hello").unwrap();

        let response = callable
            .call(CallableValue::map([("message", "ping")]))
            .await
            .unwrap();

        assert_eq!(response.data(), &CallableValue::map([("message", "pong")]));
        mock.assert();
    }

    #[tokio::test(flavor = "current_thread")]
    async fn server_error_body_is_surfaced() {
        let Some(server) = start_mock_server("server_error_body_is_surfaced") else {
            return;
        };
        server.mock(|when, then| {
            when.method(POST).path("/callable/guarded");
            then.status(403).json_body(json!({
                "error": {
                    "status": "PERMISSION_DENIED",
                    "message": "caller is not an admin",
                    "details": { "role": "viewer" }
                }
            }));
        });

        let functions = get_functions(Some(test_app().await), Some(&server.url("/callable")))
            .await
            .unwrap();
        let err = functions
            .https_callable("guarded")
            .unwrap()
            .invoke(None)
            .await
            .unwrap_err();

        match err {
            FunctionsError::Server {
                code,
                message,
                details,
            } => {
                assert_eq!(code, FunctionsErrorCode::PermissionDenied);
                assert_eq!(message, "caller is not an admin");
                assert_eq!(details, Some(CallableValue::map([("role", "viewer")])));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn timeout_maps_to_deadline_exceeded() {
        let Some(server) = start_mock_server("timeout_maps_to_deadline_exceeded") else {
            return;
        };
        server.mock(|when, then| {
            when.method(POST).path("/callable/slow");
            then.status(200)
                .delay(Duration::from_secs(2))
                .json_body(json!({ "result": null }));
        });

        let functions = get_functions(Some(test_app().await), Some(&server.url("/callable")))
            .await
            .unwrap();
        let callable = functions
            .https_callable_with_options(
                "slow",
                HttpsCallableOptions {
                    timeout: Duration::from_millis(100),
                    ..Default::default()
                },
            )
            .unwrap();

        let err = callable.invoke(None).await.unwrap_err();
        assert!(matches!(err, FunctionsError::Network { .. }));
        assert_eq!(err.code(), FunctionsErrorCode::DeadlineExceeded);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn invoke_and_call_send_identical_requests() {
        let functions = get_functions(Some(test_app().await), None).await.unwrap();
        let transport = RecordingTransport::new(Ok(json!({ "result": { "ok": true } })));
        functions.set_transport(transport.clone());
        let callable = functions.https_callable("echo").unwrap();

        let input = CallableValue::map([("n", CallableValue::Long(3))]);
        let invoked = callable.invoke(Some(input.clone())).await.unwrap();
        let called = callable.call(input).await.unwrap();
        assert_eq!(invoked, called);

        let absent = callable.invoke(None).await.unwrap();
        let null = callable.call(CallableValue::Null).await.unwrap();
        assert_eq!(absent, null);

        let requests = transport.requests();
        assert_eq!(requests.len(), 4);
        assert_eq!(requests[0].payload, requests[1].payload);
        assert_eq!(requests[2].payload, json!({ "data": null }));
        assert_eq!(requests[2].payload, requests[3].payload);
        assert_eq!(
            requests[0].url,
            "https://us-central1-demo-project.cloudfunctions.net/echo"
        );
        assert_eq!(
            requests[0].timeout,
            Duration::from_millis(DEFAULT_TIMEOUT_MS)
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn auth_token_is_attached_as_bearer_header() {
        let app = test_app().await;
        set_auth_token_provider(&app, Arc::new(StaticTokenProvider::new("id-token"))).unwrap();
        let functions = get_functions(Some(app), None).await.unwrap();
        let transport = RecordingTransport::new(Ok(json!({ "data": 1 })));
        functions.set_transport(transport.clone());

        let result = functions
            .https_callable("secure")
            .unwrap()
            .invoke(None)
            .await
            .unwrap();
        assert_eq!(result.into_data(), CallableValue::Int(1));

        let headers = &transport.requests()[0].headers;
        assert_eq!(
            headers.get("Authorization").map(String::as_str),
            Some("Bearer id-token")
        );
        assert!(!headers.contains_key("X-Firebase-AppCheck"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn region_and_emulator_urls() {
        let app = test_app().await;
        let functions = get_functions(Some(app.clone()), Some("europe-west1"))
            .await
            .unwrap();
        let callable = functions.https_callable("/nested/").unwrap();
        assert_eq!(callable.name(), "nested");
        assert_eq!(callable.region(), "europe-west1");
        assert_eq!(
            callable.url().unwrap(),
            "https://europe-west1-demo-project.cloudfunctions.net/nested"
        );

        connect_functions_emulator(&functions, "127.0.0.1", 5001);
        assert_eq!(
            callable.url().unwrap(),
            "http://127.0.0.1:5001/demo-project/europe-west1/nested"
        );

        let same = get_functions(Some(app), Some("europe-west1")).await.unwrap();
        assert!(Arc::ptr_eq(&functions, &same));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn custom_domain_and_explicit_url() {
        let functions = get_functions(
            Some(test_app().await),
            Some("https://functions.example.com/api/"),
        )
        .await
        .unwrap();
        assert_eq!(
            functions.custom_domain(),
            Some("https://functions.example.com/api")
        );
        assert_eq!(
            functions.https_callable("ping").unwrap().url().unwrap(),
            "https://functions.example.com/api/ping"
        );

        let direct = functions
            .https_callable_from_url(
                "https://run.example.com/hook",
                HttpsCallableOptions::default(),
            )
            .unwrap();
        assert_eq!(direct.url().unwrap(), "https://run.example.com/hook");
        assert!(functions
            .https_callable_from_url("not a url", HttpsCallableOptions::default())
            .is_err());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn empty_name_is_rejected() {
        let functions = get_functions(Some(test_app().await), None).await.unwrap();
        let err = functions.https_callable(" / ").unwrap_err();
        assert!(matches!(err, FunctionsError::InvalidArgument { .. }));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn deleted_app_is_a_configuration_error() {
        let app = test_app().await;
        let functions = get_functions(Some(app.clone()), None).await.unwrap();
        let callable = functions.https_callable("late").unwrap();

        app::delete_app(&app).await.unwrap();

        assert!(matches!(
            functions.https_callable("late"),
            Err(FunctionsError::Configuration { .. })
        ));
        assert!(matches!(
            callable.invoke(None).await,
            Err(FunctionsError::Configuration { .. })
        ));
        assert!(matches!(
            get_functions(Some(app), None).await,
            Err(FunctionsError::Configuration { .. })
        ));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn missing_project_id_is_a_configuration_error() {
        let app = initialize_app(
            FirebaseOptions {
                api_key: Some("key-only".into()),
                ..Default::default()
            },
            Some(unique_settings()),
        )
        .await
        .unwrap();
        let functions = get_functions(Some(app), None).await.unwrap();
        let err = functions
            .https_callable("any")
            .unwrap()
            .invoke(None)
            .await
            .unwrap_err();
        assert!(matches!(err, FunctionsError::Configuration { .. }));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn response_without_data_is_a_decoding_error() {
        let functions = get_functions(Some(test_app().await), None).await.unwrap();
        functions.set_transport(RecordingTransport::new(Ok(json!({ "other": 1 }))));
        let err = functions
            .https_callable("shapeless")
            .unwrap()
            .invoke(None)
            .await
            .unwrap_err();
        assert!(matches!(err, FunctionsError::Decoding { .. }));
        assert_eq!(err.code(), FunctionsErrorCode::Internal);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn cancellation_resolves_with_cancelled() {
        let functions = get_functions(Some(test_app().await), None).await.unwrap();
        functions.set_transport(Arc::new(PendingTransport));
        let callable = functions.https_callable("forever").unwrap();

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = callable
            .call_with_cancellation(CallableValue::Null, &token)
            .await
            .unwrap_err();
        assert!(matches!(err, FunctionsError::Cancelled { .. }));
        assert_eq!(err.code(), FunctionsErrorCode::Cancelled);

        let err = callable
            .call_with_cancellation(CallableValue::Null, &token)
            .await
            .unwrap_err();
        assert!(matches!(err, FunctionsError::Cancelled { .. }));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn deadline_applies_to_custom_transports() {
        let functions = get_functions(Some(test_app().await), None).await.unwrap();
        functions.set_transport(Arc::new(PendingTransport));
        let callable = functions
            .https_callable_with_options(
                "stuck",
                HttpsCallableOptions {
                    timeout: Duration::from_millis(30),
                    ..Default::default()
                },
            )
            .unwrap();

        let err = callable.invoke(None).await.unwrap_err();
        assert_eq!(err.code(), FunctionsErrorCode::DeadlineExceeded);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn uncancelled_token_lets_call_complete() {
        let functions = get_functions(Some(test_app().await), None).await.unwrap();
        functions.set_transport(RecordingTransport::new(Ok(json!({ "result": "done" }))));
        let token = CancellationToken::new();
        let result = functions
            .https_callable("quick")
            .unwrap()
            .call_with_cancellation("go", &token)
            .await
            .unwrap();
        assert_eq!(result.data().as_str(), Some("done"));
    }

    #[derive(Serialize)]
    struct AddRequest {
        a: i64,
        b: i64,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct AddResponse {
        sum: i64,
    }

    #[tokio::test(flavor = "current_thread")]
    async fn typed_callable_round_trips_serde_types() {
        let functions = get_functions(Some(test_app().await), None).await.unwrap();
        let transport = RecordingTransport::new(Ok(json!({
            "result": { "sum": { "@type": "type.googleapis.com/google.protobuf.Int64Value", "value": "12000000000" } }
        })));
        functions.set_transport(transport.clone());

        let add = functions
            .typed_callable::<AddRequest, AddResponse>("addNumbers")
            .unwrap();
        let response = add
            .call_async(&AddRequest {
                a: 5,
                b: 11_999_999_995,
            })
            .await
            .unwrap();
        assert_eq!(response, AddResponse { sum: 12_000_000_000 });

        let sent = &transport.requests()[0].payload;
        assert_eq!(sent["data"]["a"], json!(5));
        assert_eq!(
            sent["data"]["b"],
            json!({ "@type": "type.googleapis.com/google.protobuf.Int64Value", "value": "11999999995" })
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn typed_callable_reports_shape_mismatch() {
        let functions = get_functions(Some(test_app().await), None).await.unwrap();
        functions.set_transport(RecordingTransport::new(Ok(json!({ "result": "nope" }))));
        let add = functions
            .typed_callable::<AddRequest, AddResponse>("addNumbers")
            .unwrap();
        let err = add.call_async(&AddRequest { a: 1, b: 2 }).await.unwrap_err();
        assert!(matches!(err, FunctionsError::Decoding { .. }));
    }

    #[derive(Serialize)]
    struct Counter {
        hits: u64,
    }

    #[tokio::test(flavor = "current_thread")]
    async fn typed_callable_rejects_integers_beyond_i64() {
        let functions = get_functions(Some(test_app().await), None).await.unwrap();
        let transport = RecordingTransport::new(Ok(json!({ "result": null })));
        functions.set_transport(transport.clone());
        let record = functions
            .typed_callable::<Counter, Option<u64>>("record")
            .unwrap();

        let err = record
            .call_async(&Counter { hits: u64::MAX })
            .await
            .unwrap_err();
        assert!(matches!(err, FunctionsError::InvalidArgument { .. }));
        assert!(transport.requests().is_empty());

        let ok = record
            .call_async(&Counter {
                hits: i64::MAX as u64,
            })
            .await
            .unwrap();
        assert_eq!(ok, None);
        assert_eq!(
            transport.requests()[0].payload["data"]["hits"],
            json!({ "@type": "type.googleapis.com/google.protobuf.Int64Value", "value": i64::MAX.to_string() })
        );
    }

    struct LimitedUseAppCheck;

    #[async_trait]
    impl crate::platform::token::AsyncTokenProvider for LimitedUseAppCheck {
        async fn get_token(
            &self,
            _force_refresh: bool,
        ) -> Result<Option<String>, crate::platform::token::TokenError> {
            Ok(Some("app-check".into()))
        }

        async fn get_limited_use_token(
            &self,
        ) -> Result<Option<String>, crate::platform::token::TokenError> {
            Ok(Some("app-check-limited".into()))
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn every_registered_token_becomes_a_header() {
        let app = test_app().await;
        set_auth_token_provider(&app, Arc::new(StaticTokenProvider::new("id-token"))).unwrap();
        set_messaging_token_provider(&app, Arc::new(StaticTokenProvider::new("fcm-token")))
            .unwrap();
        set_app_check_token_provider(&app, Arc::new(LimitedUseAppCheck)).unwrap();
        let functions = get_functions(Some(app), None).await.unwrap();
        let transport = RecordingTransport::new(Ok(json!({ "result": null })));
        functions.set_transport(transport.clone());

        functions
            .https_callable("tokens")
            .unwrap()
            .invoke(None)
            .await
            .unwrap();
        functions
            .https_callable_with_options(
                "tokens",
                HttpsCallableOptions {
                    limited_use_app_check_tokens: true,
                    ..Default::default()
                },
            )
            .unwrap()
            .invoke(None)
            .await
            .unwrap();

        let requests = transport.requests();
        let header = |index: usize, name: &str| requests[index].headers.get(name).cloned();
        for index in 0..2 {
            assert_eq!(header(index, "Authorization").as_deref(), Some("Bearer id-token"));
            assert_eq!(
                header(index, "Firebase-Instance-ID-Token").as_deref(),
                Some("fcm-token")
            );
            assert_eq!(
                header(index, "Content-Type").as_deref(),
                Some("application/json")
            );
        }
        assert_eq!(header(0, "X-Firebase-AppCheck").as_deref(), Some("app-check"));
        assert_eq!(
            header(1, "X-Firebase-AppCheck").as_deref(),
            Some("app-check-limited")
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn non_object_success_body_is_a_decoding_error() {
        let Some(server) = start_mock_server("non_object_success_body_is_a_decoding_error") else {
            return;
        };
        server.mock(|when, then| {
            when.method(POST).path("/callable/listing");
            then.status(200)
                .header("content-type", "application/json")
                .body("[1]");
        });

        let functions = get_functions(Some(test_app().await), Some(&server.url("/callable")))
            .await
            .unwrap();
        let err = functions
            .https_callable("listing")
            .unwrap()
            .invoke(None)
            .await
            .unwrap_err();
        assert!(matches!(err, FunctionsError::Decoding { .. }));
    }
}
