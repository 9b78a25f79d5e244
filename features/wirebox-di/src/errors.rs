use std::sync::Arc;

use thiserror::Error;

use crate::types::DynError;

/// Errors from any container operation
#[derive(Error, Debug, Clone)]
pub enum ContainerError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Teardown(#[from] TeardownErrors),
}

/// Errors when mutating the registry of a container
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The container was locked, no more registrations are accepted
    #[error("The container is locked, cannot register '{0}'")]
    LockedContainer(String),
    /// The service at this key is locked and cannot be replaced
    #[error("The service '{0}' is locked and cannot be overwritten")]
    LockedService(String),
    /// A declared dependency matches no registered service
    #[error("'{required_by}' depends on '{dependency}' but no such service is registered")]
    DependencyNotFound {
        dependency: String,
        required_by: String,
    },
    /// Only singletons can be locked as a dependency
    #[error("'{required_by}' locks its dependency '{key}', but '{key}' is not a singleton")]
    NonSingletonDependency { key: String, required_by: String },
    /// Declared dependencies form a cycle
    #[error("Locking dependencies ran into a cycle through {chain:?}")]
    CyclicDependencyLock { chain: Vec<String> },
}

/// Errors when resolving a service
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    /// No service matches the requested key or type
    #[error("No service registered for '{0}'")]
    NotFound(String),
    #[error("Service '{key}' is a '{actual}' and cannot be resolved as '{expected}'")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        actual: &'static str,
    },
    #[error("Circular dependency on '{key}' through {chain:?}")]
    CircularDependency { key: String, chain: Vec<String> },
    /// The provider of the service failed
    #[error("Provider for '{key}' ({type_name}) failed - error: {error}")]
    Provider {
        key: String,
        type_name: &'static str,
        error: Arc<DynError>,
    },
}
impl ResolveError {
    /// Follows provider failures caused by nested resolutions down to the first error raised
    pub fn root_cause(&self) -> &ResolveError {
        let mut current = self;
        while let ResolveError::Provider { error, .. } = current {
            match error.downcast_ref::<ResolveError>() {
                Some(inner) => current = inner,
                None => break,
            }
        }
        current
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::NotFound(_))
    }
}

/// Violations of the container and hub state machines
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("The container was already started")]
    AlreadyStarted,
    #[error("The container has not been started")]
    NotStarted,
    #[error("A container is already set up")]
    AlreadySetUp,
    #[error("No container has been set up")]
    NotSetUp,
}

/// A single failed teardown
#[derive(Error, Debug, Clone)]
#[error("Destroying '{key}' failed - error: {error}")]
pub struct TeardownError {
    pub key: String,
    pub error: Arc<DynError>,
}

/// All teardown failures of one destroy pass
#[derive(Error, Debug, Clone)]
pub struct TeardownErrors {
    pub errors: Vec<TeardownError>,
}
impl std::fmt::Display for TeardownErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut display = Vec::new();
        display.push("Destroying the container had one or more errors:".to_string());
        for error in &self.errors {
            display.push(format!("- {}", error));
        }
        f.write_str(&display.join("\n"))
    }
}
