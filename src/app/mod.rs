//! App registry: every service is created for, and cached on, an initialized [`FirebaseApp`].
mod api;
mod constants;
mod errors;
mod logger;
mod registry;
mod types;

#[doc(inline)]
pub use api::{
    delete_app, get_app, get_apps, initialize_app, on_log, set_log_level, SDK_VERSION,
};

#[doc(inline)]
pub use constants::{APP_COMPONENT_NAME, DEFAULT_ENTRY_NAME};

#[doc(inline)]
pub use errors::{AppError, AppResult};

#[doc(inline)]
pub use logger::{LogCallback, LogLevel, LogOptions, Logger, LOGGER};

#[doc(inline)]
pub use registry::{get_provider, register_component};

#[doc(inline)]
pub use types::{FirebaseApp, FirebaseAppConfig, FirebaseAppSettings, FirebaseOptions};
