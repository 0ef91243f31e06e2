use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};

use crate::app::logger::LOGGER;
use crate::app::types::FirebaseApp;
use crate::component::{self, Component, Provider};

pub static APPS: LazyLock<Mutex<HashMap<String, FirebaseApp>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

pub(crate) fn apps_guard() -> MutexGuard<'static, HashMap<String, FirebaseApp>> {
    APPS.lock().unwrap_or_else(|poison| poison.into_inner())
}

pub(crate) fn registered_components_guard() -> MutexGuard<'static, HashMap<Arc<str>, Component>> {
    component::global_components()
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

/// Attaches a component to the given app, logging failures for debugging.
pub fn add_component(app: &FirebaseApp, component: &Component) {
    if app.container().add_component(component.clone()).is_err() {
        LOGGER.debug(format!(
            "Component {} failed to register with FirebaseApp {}",
            component.name(),
            app.name()
        ));
    }
}

/// Registers a global component and propagates it to already-initialized apps.
pub fn register_component(component: Component) -> bool {
    if !component::register_component(component.clone()) {
        return false;
    }

    for app in apps_guard().values() {
        add_component(app, &component);
    }

    true
}

pub fn get_provider(app: &FirebaseApp, name: &str) -> Provider {
    app.container().get_provider(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::api;
    use crate::app::types::FirebaseOptions;
    use crate::component::types::{DynService, InstanceFactory};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn unique_settings() -> crate::app::FirebaseAppSettings {
        crate::app::FirebaseAppSettings {
            name: Some(format!("registry-{}", COUNTER.fetch_add(1, Ordering::SeqCst))),
            ..Default::default()
        }
    }

    fn test_options() -> FirebaseOptions {
        FirebaseOptions {
            api_key: Some("internal-test-key".into()),
            project_id: Some("internal-test".into()),
            ..Default::default()
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn add_component_attaches_to_app() {
        let app = api::initialize_app(test_options(), Some(unique_settings()))
            .await
            .expect("app init");
        let factory: InstanceFactory = Arc::new(|_, _| Ok(Arc::new(()) as DynService));
        add_component(&app, &Component::new("internal-comp", factory));

        assert!(app
            .container()
            .get_provider("internal-comp")
            .is_component_set());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn register_component_propagates_to_existing_apps() {
        let app = api::initialize_app(test_options(), Some(unique_settings()))
            .await
            .expect("app init");
        let name = format!("late-{}", COUNTER.fetch_add(1, Ordering::SeqCst));
        let factory: InstanceFactory = Arc::new(|_, _| Ok(Arc::new("shared") as DynService));

        assert!(register_component(Component::new(name.clone(), factory.clone())));
        assert!(get_provider(&app, &name).is_component_set());
        assert!(!register_component(Component::new(name, factory)));
    }
}
