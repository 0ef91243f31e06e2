pub const FUNCTIONS_COMPONENT_NAME: &str = "functions";

pub const AUTH_INTERNAL_COMPONENT: &str = "auth-internal";
pub const APP_CHECK_INTERNAL_COMPONENT: &str = "app-check-internal";
pub const MESSAGING_INTERNAL_COMPONENT: &str = "messaging-internal";

pub const DEFAULT_REGION: &str = "us-central1";
pub const DEFAULT_TIMEOUT_MS: u64 = 70_000;
