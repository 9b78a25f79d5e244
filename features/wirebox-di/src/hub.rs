use std::sync::{Arc, PoisonError, RwLock};

use crate::{
    container::Container,
    errors::{ContainerError, LifecycleError},
    types::Injectable,
};

/// Holds the container of the running application
///
/// Create one per process and pass it where services are needed. Only started
/// containers are accepted, and they are locked on the way in.
#[derive(Debug, Default)]
pub struct ServiceHub {
    current: RwLock<Option<Container>>,
}

impl ServiceHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the first container
    pub fn set_up(&self, container: Container) -> Result<(), LifecycleError> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if current.is_some() {
            return Err(LifecycleError::AlreadySetUp);
        }
        if !container.is_started() {
            return Err(LifecycleError::NotStarted);
        }

        container.lock();
        *current = Some(container);
        tracing::debug!("Service hub set up");
        Ok(())
    }

    /// Swaps in a new container, returning the previous one
    ///
    /// The previous container is not destroyed.
    pub fn refresh(&self, container: Container) -> Result<Container, LifecycleError> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let Some(installed) = current.as_mut() else {
            return Err(LifecycleError::NotSetUp);
        };
        if !container.is_started() {
            return Err(LifecycleError::NotStarted);
        }

        container.lock();
        let previous = std::mem::replace(installed, container);
        tracing::debug!("Service hub refreshed");
        Ok(previous)
    }

    /// Removes the container and destroys it
    pub async fn shutdown(&self) -> Result<(), ContainerError> {
        let container = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(LifecycleError::NotSetUp)?;

        tracing::debug!("Service hub shutting down");
        container.destroy().await?;
        Ok(())
    }

    pub fn container(&self) -> Result<Container, LifecycleError> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(LifecycleError::NotSetUp)
    }

    pub fn is_set_up(&self) -> bool {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub async fn resolve_by_name<C: ?Sized + Injectable>(&self, key: &str) -> Result<Arc<C>, ContainerError> {
        Ok(self.container()?.resolve_by_name(key).await?)
    }

    pub async fn resolve<C: ?Sized + Injectable>(&self) -> Result<Arc<C>, ContainerError> {
        Ok(self.container()?.resolve().await?)
    }

    pub async fn resolve_all<C: ?Sized + Injectable>(&self) -> Result<Vec<Arc<C>>, ContainerError> {
        Ok(self.container()?.resolve_all().await?)
    }

    pub async fn resolve_by_name_checked<C: ?Sized + Injectable>(
        &self,
        key: &str,
    ) -> Result<Arc<C>, ContainerError> {
        Ok(self.container()?.resolve_by_name_checked(key).await?)
    }

    pub async fn resolve_checked<C: ?Sized + Injectable>(&self) -> Result<Arc<C>, ContainerError> {
        Ok(self.container()?.resolve_checked().await?)
    }

    /// Destroys the cached instances of the current container, keeping it installed
    pub async fn destroy(&self) -> Result<(), ContainerError> {
        let container = self.container()?;
        container.destroy().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DynError, ServiceDescriptor};

    async fn started(value: &'static str) -> Container {
        let container = Container::new();
        container
            .register(ServiceDescriptor::instance(value.to_string()).named("name").build())
            .unwrap();
        container.start().await.unwrap();
        container
    }

    #[tokio::test]
    async fn test_set_up_requires_started_container() {
        let hub = ServiceHub::new();
        assert_eq!(hub.set_up(Container::new()), Err(LifecycleError::NotStarted));
        assert!(!hub.is_set_up());

        let container = started("first").await;
        hub.set_up(container.clone()).unwrap();
        assert!(container.is_locked());
        assert_eq!(
            hub.set_up(started("second").await),
            Err(LifecycleError::AlreadySetUp)
        );

        let name = hub.resolve_by_name::<String>("name").await.unwrap();
        assert_eq!(name.as_str(), "first");
    }

    #[tokio::test]
    async fn test_refresh_returns_previous() {
        let hub = ServiceHub::new();
        assert_eq!(
            hub.refresh(started("first").await).unwrap_err(),
            LifecycleError::NotSetUp
        );

        hub.set_up(started("first").await).unwrap();
        assert_eq!(
            hub.refresh(Container::new()).unwrap_err(),
            LifecycleError::NotStarted
        );
        let kept = hub.resolve_by_name::<String>("name").await.unwrap();
        assert_eq!(kept.as_str(), "first");

        let fresh = started("second").await;
        let previous = hub.refresh(fresh.clone()).unwrap();
        assert!(fresh.is_locked());

        let old = previous.resolve_by_name::<String>("name").await.unwrap();
        let new = hub.resolve_by_name::<String>("name").await.unwrap();
        assert_eq!((old.as_str(), new.as_str()), ("first", "second"));
    }

    #[tokio::test]
    async fn test_shutdown_destroys_and_empties() {
        struct Closeable;
        impl crate::Destroy for Closeable {
            async fn destroy(&self) -> Result<(), DynError> {
                Err("already closed".into())
            }
        }

        let hub = ServiceHub::new();
        assert!(matches!(
            hub.shutdown().await,
            Err(ContainerError::Lifecycle(LifecycleError::NotSetUp))
        ));

        let container = Container::new();
        container
            .register(ServiceDescriptor::instance(Closeable).eager().destroyable().build())
            .unwrap();
        container.start().await.unwrap();
        hub.set_up(container.clone()).unwrap();

        let err = hub.shutdown().await.unwrap_err();
        assert!(matches!(err, ContainerError::Teardown(ref errors) if errors.errors.len() == 1));
        assert!(!hub.is_set_up());
        assert!(container.cached_keys().is_empty());
        assert!(matches!(
            hub.resolve::<Closeable>().await,
            Err(ContainerError::Lifecycle(LifecycleError::NotSetUp))
        ));
    }
}
