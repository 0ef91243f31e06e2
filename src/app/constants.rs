pub use crate::component::constants::DEFAULT_ENTRY_NAME;

/// Name of the component every app registers for itself.
pub const APP_COMPONENT_NAME: &str = "app";
