use crate::app::{FirebaseApp, FirebaseAppConfig, FirebaseOptions};
use crate::component::ComponentContainer;

/// Build a Firebase app for the given project for use in tests.
///
/// The app is not added to the global registry and gets its own component container, so
/// token providers registered by one test never leak into another.
pub fn test_firebase_app(project_id: impl Into<String>) -> FirebaseApp {
    let options = FirebaseOptions {
        project_id: Some(project_id.into()),
        ..Default::default()
    };
    let config = FirebaseAppConfig::new("test", false);
    let container = ComponentContainer::new("test");
    FirebaseApp::new(options, config, container)
}
