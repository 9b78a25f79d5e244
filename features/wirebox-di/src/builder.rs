use crate::{
    container::Container,
    descriptor::ServiceDescriptor,
    errors::{ContainerError, RegistryError},
    types::Injectable,
};

/// Fluent setup of a [`Container`]
///
/// Modules are merged before the services added here, so services of this builder can
/// depend on, and overwrite, services of its modules.
///
/// ```rust
/// # use wirebox_di::{ContainerBuilder, DynError, ServiceDescriptor};
/// # futures::executor::block_on(async {
/// let container = ContainerBuilder::new()
///     .add_instance("localhost".to_string())
///     .add(ServiceDescriptor::singleton(|_| async { Ok::<_, DynError>(8080u16) }).build())
///     .build_started()
///     .await
///     .unwrap();
///
/// assert_eq!(*container.resolve::<u16>().await.unwrap(), 8080);
/// # });
/// ```
#[derive(Default)]
pub struct ContainerBuilder {
    /// Registered descriptors, in order
    descriptors: Vec<ServiceDescriptor>,
    /// Containers to merge in
    modules: Vec<Container>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, descriptor: ServiceDescriptor) -> Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Registers an existing value as a singleton keyed by its type name
    pub fn add_instance<T: Injectable>(self, instance: T) -> Self {
        self.add(ServiceDescriptor::instance(instance).build())
    }

    pub fn add_module(mut self, module: Container) -> Self {
        self.modules.push(module);
        self
    }

    pub fn build(self) -> Result<Container, RegistryError> {
        let container = Container::new();

        let modules: Vec<&Container> = self.modules.iter().collect();
        if !modules.is_empty() {
            container.merge(&modules)?;
        }

        for descriptor in self.descriptors {
            container.register(descriptor)?;
        }

        Ok(container)
    }

    /// Builds, starts and locks the container
    pub async fn build_started(self) -> Result<Container, ContainerError> {
        let container = self.build()?;
        container.start().await?;
        container.lock();
        Ok(container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DynError;

    #[tokio::test]
    async fn test_local_services_override_modules() {
        let module = ContainerBuilder::new()
            .add(ServiceDescriptor::instance("module".to_string()).named("name").build())
            .build()
            .unwrap();

        let container = ContainerBuilder::new()
            .add_module(module)
            .add(ServiceDescriptor::instance("local".to_string()).named("name").build())
            .build()
            .unwrap();

        let name = container.resolve_by_name::<String>("name").await.unwrap();
        assert_eq!(name.as_str(), "local");
    }

    #[tokio::test]
    async fn test_local_eager_service_depends_on_module() {
        let module = ContainerBuilder::new()
            .add(ServiceDescriptor::instance(3u8).named("retries").build())
            .build()
            .unwrap();

        let container = ContainerBuilder::new()
            .add_module(module)
            .add(
                ServiceDescriptor::singleton(|ctx| async move {
                    let retries = ctx.resolve_by_name::<u8>("retries").await?;
                    Ok::<_, DynError>(u32::from(*retries) * 10)
                })
                .named("timeout")
                .eager()
                .depends_on("retries")
                .build(),
            )
            .build_started()
            .await
            .unwrap();

        assert!(container.is_started());
        assert!(container.is_locked());
        assert!(container.is_cached("timeout"));
        assert!(container.snapshot().get("retries").unwrap().is_dependency_locked());
    }

    #[tokio::test]
    async fn test_build_fails_on_missing_dependency() {
        let err = ContainerBuilder::new()
            .add(
                ServiceDescriptor::singleton(|_| async { Ok::<_, DynError>(1u8) })
                    .locked()
                    .depends_on("missing")
                    .build(),
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::DependencyNotFound { .. }));
    }
}
