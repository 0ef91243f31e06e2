use std::sync::Arc;

use crate::component::types::InstanceFactory;

/// A named service definition: how to build the service and whether one app may hold several
/// instances of it keyed by identifier.
#[derive(Clone)]
pub struct Component {
    name: Arc<str>,
    pub(crate) instance_factory: InstanceFactory,
    pub(crate) multiple_instances: bool,
}

impl Component {
    pub fn new(name: impl Into<String>, instance_factory: InstanceFactory) -> Self {
        Self {
            name: Arc::from(name.into()),
            instance_factory,
            multiple_instances: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn multiple_instances(&self) -> bool {
        self.multiple_instances
    }

    pub fn with_multiple_instances(mut self, multiple: bool) -> Self {
        self.multiple_instances = multiple;
        self
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name())
            .field("multiple_instances", &self.multiple_instances)
            .finish()
    }
}
