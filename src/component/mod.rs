//! Minimal service container: apps hold one provider per component name, and providers build and
//! cache service instances on demand.

mod component;
pub mod constants;
pub mod container;
pub mod provider;
pub mod types;

pub use component::Component;
pub use constants::DEFAULT_ENTRY_NAME;
pub use container::ComponentContainer;
pub use provider::Provider;
pub use types::{ComponentError, DynService, InstanceFactory, InstanceFactoryOptions};

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex};


static GLOBAL_COMPONENTS: LazyLock<Mutex<HashMap<Arc<str>, Component>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

pub fn global_components() -> &'static Mutex<HashMap<Arc<str>, Component>> {
    &GLOBAL_COMPONENTS
}

/// Records a component for every app created afterwards. Returns `false` if the name is taken.
pub fn register_component(component: Component) -> bool {
    let mut guard = GLOBAL_COMPONENTS
        .lock()
        .unwrap_or_else(|poison| poison.into_inner());
    if guard.contains_key(component.name()) {
        return false;
    }
    guard.insert(Arc::from(component.name()), component);
    true
}
