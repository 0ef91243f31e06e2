use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::component::container::ComponentContainer;

pub type DynService = Arc<dyn Any + Send + Sync>;

/// Options handed to a factory when a provider creates an instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceFactoryOptions {
    /// `None` for the default instance, otherwise the identifier the caller asked for
    /// (a region or custom domain for Functions).
    pub instance_identifier: Option<String>,
}

impl InstanceFactoryOptions {
    pub fn new(instance_identifier: Option<String>) -> Self {
        Self {
            instance_identifier,
        }
    }
}

pub type InstanceFactory = Arc<
    dyn Fn(&ComponentContainer, InstanceFactoryOptions) -> Result<DynService, ComponentError>
        + Send
        + Sync,
>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentError {
    MismatchingComponent { expected: String, found: String },
    ComponentAlreadyProvided { name: String },
    ComponentNotRegistered { name: String },
    InitializationFailed { name: String, reason: String },
    InstanceUnavailable { name: String },
}

impl fmt::Display for ComponentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentError::MismatchingComponent { expected, found } => {
                write!(f, "Component {found} cannot satisfy provider for {expected}")
            }
            ComponentError::ComponentAlreadyProvided { name } => {
                write!(f, "Component {name} has already been registered")
            }
            ComponentError::ComponentNotRegistered { name } => {
                write!(f, "Component {name} has not been registered yet")
            }
            ComponentError::InitializationFailed { name, reason } => {
                write!(f, "Component {name} failed to initialize: {reason}")
            }
            ComponentError::InstanceUnavailable { name } => {
                write!(f, "Service {name} is not available")
            }
        }
    }
}

impl std::error::Error for ComponentError {}
