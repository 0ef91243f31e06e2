use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::component::provider::Provider;
use crate::component::types::{ComponentError, DynService};
use crate::component::Component;

/// Per-app collection of providers, one per component name.
#[derive(Clone)]
pub struct ComponentContainer {
    pub(crate) inner: Arc<ComponentContainerInner>,
}

pub(crate) struct ComponentContainerInner {
    pub name: Arc<str>,
    pub providers: Mutex<HashMap<Arc<str>, Provider>>,
    pub root_service: Mutex<Option<DynService>>,
}

impl ComponentContainer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ComponentContainerInner {
                name: Arc::from(name.into()),
                providers: Mutex::new(HashMap::new()),
                root_service: Mutex::new(None),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    fn providers(&self) -> MutexGuard<'_, HashMap<Arc<str>, Provider>> {
        self.inner
            .providers
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    pub fn add_component(&self, component: Component) -> Result<(), ComponentError> {
        self.get_provider(component.name()).set_component(component)
    }

    /// Replaces the provider for `component`'s name, dropping any instance it had created.
    pub fn add_or_overwrite_component(&self, component: Component) {
        self.providers().remove(component.name());
        let _ = self.add_component(component);
    }

    pub fn get_provider(&self, name: &str) -> Provider {
        let mut providers = self.providers();
        if let Some(provider) = providers.get(name) {
            return provider.clone();
        }
        let provider = Provider::new(name, self);
        providers.insert(Arc::from(name), provider.clone());
        provider
    }

    pub fn get_providers(&self) -> Vec<Provider> {
        self.providers().values().cloned().collect()
    }

    pub fn attach_root_service(&self, service: DynService) {
        *self
            .inner
            .root_service
            .lock()
            .unwrap_or_else(|poison| poison.into_inner()) = Some(service);
    }

    pub fn detach_root_service(&self) {
        self.inner
            .root_service
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .take();
    }

    /// The service that owns this container (the `FirebaseApp`), downcast to `T`.
    pub fn root_service<T: 'static + Send + Sync>(&self) -> Option<Arc<T>> {
        self.inner
            .root_service
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .as_ref()
            .and_then(|svc| Arc::clone(svc).downcast::<T>().ok())
    }
}
