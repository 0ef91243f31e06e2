use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::component::component::Component;
use crate::component::constants::DEFAULT_ENTRY_NAME;
use crate::component::container::{ComponentContainer, ComponentContainerInner};
use crate::component::types::{ComponentError, DynService, InstanceFactoryOptions};

/// Lazily creates and caches the instances of one component inside a container.
#[derive(Clone)]
pub struct Provider {
    inner: Arc<ProviderInner>,
}

struct ProviderInner {
    name: Arc<str>,
    container: Weak<ComponentContainerInner>,
    component: Mutex<Option<Component>>,
    instances: Mutex<HashMap<Arc<str>, DynService>>,
}

impl Provider {
    pub(crate) fn new(name: &str, container: &ComponentContainer) -> Self {
        Self {
            inner: Arc::new(ProviderInner {
                name: Arc::from(name),
                container: Arc::downgrade(&container.inner),
                component: Mutex::new(None),
                instances: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    fn component(&self) -> MutexGuard<'_, Option<Component>> {
        self.inner
            .component
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    fn instances(&self) -> MutexGuard<'_, HashMap<Arc<str>, DynService>> {
        self.inner
            .instances
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    pub fn is_component_set(&self) -> bool {
        self.component().is_some()
    }

    pub fn is_initialized(&self, identifier: Option<&str>) -> bool {
        let id = self.normalize_identifier(identifier);
        self.instances().contains_key(&id)
    }

    pub fn clear_instance(&self, identifier: &str) {
        self.instances().remove(identifier);
    }

    /// Drops every cached instance; the component stays registered.
    pub fn delete(&self) {
        self.instances().clear();
    }

    pub fn set_component(&self, component: Component) -> Result<(), ComponentError> {
        if component.name() != self.name() {
            return Err(ComponentError::MismatchingComponent {
                expected: self.name().to_string(),
                found: component.name().to_string(),
            });
        }

        let mut guard = self.component();
        if guard.is_some() {
            return Err(ComponentError::ComponentAlreadyProvided {
                name: self.name().to_string(),
            });
        }
        *guard = Some(component);
        Ok(())
    }

    /// Returns the default instance when the component is registered and buildable.
    pub fn get_immediate<T>(&self) -> Option<Arc<T>>
    where
        T: Any + Send + Sync + 'static,
    {
        self.get_or_init::<T>(None).ok()
    }

    /// Returns the cached instance for `identifier`, creating it on first use.
    pub fn get_or_init<T>(&self, identifier: Option<&str>) -> Result<Arc<T>, ComponentError>
    where
        T: Any + Send + Sync + 'static,
    {
        self.get_or_initialize(identifier)?
            .downcast::<T>()
            .map_err(|_| ComponentError::InstanceUnavailable {
                name: self.name().to_string(),
            })
    }

    fn get_or_initialize(&self, identifier: Option<&str>) -> Result<DynService, ComponentError> {
        let id = self.normalize_identifier(identifier);

        if let Some(instance) = self.instances().get(&id) {
            return Ok(instance.clone());
        }

        let component =
            self.component()
                .clone()
                .ok_or_else(|| ComponentError::ComponentNotRegistered {
                    name: self.name().to_string(),
                })?;

        let container = match self.inner.container.upgrade() {
            Some(inner) => ComponentContainer { inner },
            None => {
                return Err(ComponentError::InitializationFailed {
                    name: self.name().to_string(),
                    reason: "container dropped".into(),
                });
            }
        };

        let factory_options = InstanceFactoryOptions::new(if id.as_ref() == DEFAULT_ENTRY_NAME {
            None
        } else {
            Some(id.to_string())
        });

        let instance = (component.instance_factory)(&container, factory_options).map_err(
            |err| ComponentError::InitializationFailed {
                name: self.name().to_string(),
                reason: err.to_string(),
            },
        )?;

        // Another caller may have raced us; keep whichever instance landed first.
        let mut instances = self.instances();
        let stored = instances.entry(id).or_insert(instance);
        Ok(stored.clone())
    }

    fn normalize_identifier(&self, identifier: Option<&str>) -> Arc<str> {
        let multiple = self
            .component()
            .as_ref()
            .map(Component::multiple_instances)
            .unwrap_or(false);
        match identifier {
            Some(id) if multiple => Arc::from(id),
            _ => Arc::from(DEFAULT_ENTRY_NAME),
        }
    }
}
