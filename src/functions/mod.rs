//! Client for HTTPS callable Cloud Functions.
//!
//! ```ignore
//! use firebase_functions_rs::app::{initialize_app, FirebaseOptions};
//! use firebase_functions_rs::functions::{get_functions, CallableValue};
//!
//! let app = initialize_app(
//!     FirebaseOptions { project_id: Some("demo-project".into()), ..Default::default() },
//!     None,
//! )
//! .await?;
//! let functions = get_functions(Some(app), None).await?;
//! let echo = functions.https_callable("echo")?;
//! let result = echo.call(CallableValue::map([("text", "hi")])).await?;
//! println!("{}", result.data());
//! ```
mod api;
mod constants;
mod context;
pub mod error;
pub mod serializer;
mod transport;
mod value;

use std::sync::LazyLock;

use crate::logger::Logger;

pub use api::{
    connect_functions_emulator, get_functions, register_functions_component, Functions,
    HttpsCallable, HttpsCallableOptions, HttpsCallableResult, TypedCallable,
};
pub use constants::{DEFAULT_REGION, DEFAULT_TIMEOUT_MS, FUNCTIONS_COMPONENT_NAME};
pub use context::{
    set_app_check_token_provider, set_auth_token_provider, set_messaging_token_provider,
    CallContext,
};
pub use error::{FunctionsError, FunctionsErrorCode, FunctionsResult};
pub use transport::{CallableRequest, CallableTransport, HttpCallableTransport};
pub use value::CallableValue;

pub(crate) static LOGGER: LazyLock<Logger> = LazyLock::new(|| Logger::new("@firebase/functions"));
