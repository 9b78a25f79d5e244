use std::{
    fmt::Debug,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, PoisonError, RwLock,
    },
};

use crate::{
    cache::InstanceCache,
    descriptor::{Lifecycle, ServiceDescriptor},
    errors::{ContainerError, LifecycleError, RegistryError, ResolveError, TeardownError, TeardownErrors},
    registry::Registry,
    resolver::{ResolveContext, Resolver},
    types::{Injectable, Instance},
};

/// Registry of services and the singletons built from it
///
/// Cloning is cheap, clones share the same registry and cache.
#[derive(Clone, Default)]
pub struct Container(Arc<ContainerInner>);

#[derive(Default)]
struct ContainerInner {
    registry: RwLock<Registry>,
    instances: InstanceCache,
    started: AtomicBool,
    locked: AtomicBool,
}
impl Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_struct("Container");
        map.field("started", &self.is_started())
            .field("locked", &self.is_locked());
        self.with_registry(|registry| {
            for descriptor in registry.iter() {
                let state = if self.is_cached(descriptor.key()) {
                    "cached"
                } else {
                    "registered"
                };
                map.field(descriptor.key(), &state);
            }
        });
        map.finish()
    }
}

impl Container {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor, overwriting any unlocked service under the same key
    pub fn register(&self, descriptor: ServiceDescriptor) -> Result<&Self, RegistryError> {
        if self.is_locked() {
            return Err(RegistryError::LockedContainer(descriptor.key));
        }
        self.write_registry().insert(descriptor)?;
        Ok(self)
    }

    /// Copies every service of the given containers into this one
    ///
    /// All or nothing - on error no service of any module is registered.
    pub fn merge(&self, modules: &[&Container]) -> Result<&Self, RegistryError> {
        // Snapshot first, a module may share our registry
        let modules: Vec<Registry> = modules.iter().map(|module| module.snapshot()).collect();

        if self.is_locked() {
            let key = modules
                .iter()
                .flat_map(|module| module.keys())
                .next()
                .unwrap_or_default()
                .to_string();
            return Err(RegistryError::LockedContainer(key));
        }

        self.write_registry().merge(&modules)?;
        Ok(self)
    }

    /// An owned copy of the registry, unaffected by later registrations
    pub fn snapshot(&self) -> Registry {
        self.with_registry(Registry::clone)
    }

    /// Constructs every eager service, in registration order
    ///
    /// Eager singletons end up cached, eager factories are built once and dropped.
    /// If a provider fails the container counts as not started and can be started
    /// again, singletons built before the failure stay cached.
    pub async fn start(&self) -> Result<&Self, ContainerError> {
        if self.0.started.swap(true, Ordering::SeqCst) {
            return Err(LifecycleError::AlreadyStarted.into());
        }

        let eager: Vec<ServiceDescriptor> = self.with_registry(|registry| {
            registry.iter().filter(|service| service.is_eager()).cloned().collect()
        });
        tracing::debug!("Starting container with {} eager services", eager.len());

        let ctx = ResolveContext::root(self.clone());
        for descriptor in &eager {
            let constructed = match descriptor.lifecycle() {
                Lifecycle::Singleton => ctx.instantiate(descriptor).await,
                Lifecycle::Factory => ctx.construct(descriptor).await,
            };

            if let Err(e) = constructed {
                self.0.started.store(false, Ordering::SeqCst);
                return Err(e.into());
            }
            tracing::debug!("Started eager service '{}'", descriptor.key());
        }

        Ok(self)
    }

    /// Forbids any further registration, idempotent
    pub fn lock(&self) -> &Self {
        if !self.0.locked.swap(true, Ordering::SeqCst) {
            tracing::debug!("Container locked");
        }
        self
    }

    /// Empties the cache, tearing down destroyable instances newest first
    ///
    /// A failing teardown does not stop the others, all failures are returned together.
    pub async fn destroy(&self) -> Result<(), TeardownErrors> {
        let mut errors = Vec::new();

        for cached in self.0.instances.drain() {
            if !cached.instance.is_destroyable() {
                continue;
            }

            tracing::debug!("Destroying '{}'", cached.key);
            if let Err(error) = cached.instance.teardown().await {
                tracing::error!("Failed to destroy '{}': {}", cached.key, error);
                errors.push(TeardownError {
                    key: cached.key,
                    error: Arc::new(error),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(TeardownErrors { errors })
        }
    }

    pub fn is_started(&self) -> bool {
        self.0.started.load(Ordering::SeqCst)
    }

    pub fn is_locked(&self) -> bool {
        self.0.locked.load(Ordering::SeqCst)
    }

    /// Keys of the constructed singletons, oldest first
    pub fn cached_keys(&self) -> Vec<String> {
        self.0.instances.keys()
    }

    pub fn is_cached(&self, key: &str) -> bool {
        self.0.instances.contains(key.trim())
    }

    /// A resolution context with an empty chain
    pub fn context(&self) -> ResolveContext {
        ResolveContext::root(self.clone())
    }

    pub async fn resolve_by_name<C: ?Sized + Injectable>(&self, key: &str) -> Result<Arc<C>, ResolveError> {
        self.context().resolve_by_name(key).await
    }

    pub async fn resolve<C: ?Sized + Injectable>(&self) -> Result<Arc<C>, ResolveError> {
        self.context().resolve().await
    }

    pub async fn resolve_all<C: ?Sized + Injectable>(&self) -> Result<Vec<Arc<C>>, ResolveError> {
        self.context().resolve_all().await
    }

    pub async fn resolve_by_name_checked<C: ?Sized + Injectable>(
        &self,
        key: &str,
    ) -> Result<Arc<C>, ResolveError> {
        self.context().resolve_by_name_checked(key).await
    }

    pub async fn resolve_checked<C: ?Sized + Injectable>(&self) -> Result<Arc<C>, ResolveError> {
        self.context().resolve_checked().await
    }

    pub async fn resolve_instance(&self, key: &str) -> Result<Instance, ResolveError> {
        self.context().resolve_instance(key).await
    }

    pub async fn require<R: Resolver>(&self) -> Result<R, ResolveError> {
        self.context().require().await
    }

    pub(crate) fn with_registry<R>(&self, read: impl FnOnce(&Registry) -> R) -> R {
        let registry = self.0.registry.read().unwrap_or_else(PoisonError::into_inner);
        read(&registry)
    }

    pub(crate) fn instances(&self) -> &InstanceCache {
        &self.0.instances
    }

    fn write_registry(&self) -> std::sync::RwLockWriteGuard<'_, Registry> {
        self.0.registry.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::types::DynError;

    #[derive(Debug)]
    struct Counter(usize);

    fn counting(calls: Arc<AtomicUsize>) -> impl Fn(ResolveContext) -> futures::future::Ready<Result<Counter, DynError>> + Send + Sync + 'static {
        move |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            futures::future::ready(Ok(Counter(n)))
        }
    }

    #[tokio::test]
    async fn test_singleton_is_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let container = Container::new();
        container
            .register(ServiceDescriptor::singleton(counting(calls.clone())).build())
            .unwrap();

        let a = container.resolve::<Counter>().await.unwrap();
        let b = container.resolve::<Counter>().await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(container.is_cached(std::any::type_name::<Counter>()));
    }

    #[tokio::test]
    async fn test_factory_is_fresh() {
        let calls = Arc::new(AtomicUsize::new(0));
        let container = Container::new();
        container
            .register(ServiceDescriptor::factory(counting(calls.clone())).named("counter").build())
            .unwrap();

        let a = container.resolve_by_name::<Counter>("counter").await.unwrap();
        let b = container.resolve_by_name::<Counter>("counter").await.unwrap();
        assert_eq!((a.0, b.0), (0, 1));
        assert!(!container.is_cached("counter"));
    }

    #[tokio::test]
    async fn test_not_found_and_type_mismatch() {
        let container = Container::new();
        container
            .register(ServiceDescriptor::instance(5u32).named("number").build())
            .unwrap();

        let err = container.resolve_by_name::<u32>("missing").await.unwrap_err();
        assert_eq!(err.to_string(), "No service registered for 'missing'");

        let err = container.resolve_by_name::<String>("number").await.unwrap_err();
        assert!(matches!(err, ResolveError::TypeMismatch { ref key, .. } if key == "number"));
    }

    #[tokio::test]
    async fn test_locked_container_rejects_registration() {
        let container = Container::new();
        container.lock().lock();
        assert!(container.is_locked());

        let err = container
            .register(ServiceDescriptor::instance(1u8).named("one").build())
            .unwrap_err();
        assert_eq!(err, RegistryError::LockedContainer("one".into()));

        let module = Container::new();
        module
            .register(ServiceDescriptor::instance(2u8).named("two").build())
            .unwrap();
        let err = container.merge(&[&module]).unwrap_err();
        assert_eq!(err, RegistryError::LockedContainer("two".into()));
    }

    #[tokio::test]
    async fn test_snapshot_is_detached() {
        let container = Container::new();
        container
            .register(ServiceDescriptor::instance(1u8).named("one").build())
            .unwrap();
        let snapshot = container.snapshot();
        container
            .register(ServiceDescriptor::instance(2u8).named("two").build())
            .unwrap();

        assert_eq!(snapshot.len(), 1);
        assert!(!snapshot.contains("two"));
    }

    #[tokio::test]
    async fn test_merge_with_itself() {
        let container = Container::new();
        container
            .register(ServiceDescriptor::instance(1u8).named("one").build())
            .unwrap();
        container.merge(&[&container.clone()]).unwrap();
        assert_eq!(container.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_start_twice() {
        let container = Container::new();
        container.start().await.unwrap();
        let err = container.start().await.unwrap_err();
        assert!(matches!(
            err,
            ContainerError::Lifecycle(LifecycleError::AlreadyStarted)
        ));
    }

    #[tokio::test]
    async fn test_failed_start_can_be_retried() {
        let container = Container::new();
        container
            .register(
                ServiceDescriptor::singleton(|_| async { Err::<u8, _>("not yet") })
                    .named("flaky")
                    .eager()
                    .build(),
            )
            .unwrap();

        assert!(container.start().await.is_err());
        assert!(!container.is_started());

        container
            .register(ServiceDescriptor::instance(1u8).named("flaky").eager().build())
            .unwrap();
        container.start().await.unwrap();
        assert!(container.is_started());
        assert_eq!(container.cached_keys(), ["flaky"]);
    }

    #[tokio::test]
    async fn test_eager_factory_is_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let container = Container::new();
        container
            .register(
                ServiceDescriptor::factory(counting(calls.clone()))
                    .named("counter")
                    .eager()
                    .build(),
            )
            .unwrap();

        container.start().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(container.cached_keys().is_empty());
    }

    #[tokio::test]
    async fn test_unchecked_singleton_cycle_fails_instead_of_hanging() {
        let container = Container::new();
        container
            .register(
                ServiceDescriptor::singleton(|ctx: ResolveContext| async move {
                    ctx.resolve_by_name::<Counter>("b").await?;
                    Ok::<_, DynError>(Counter(0))
                })
                .named("a")
                .build(),
            )
            .unwrap();
        container
            .register(
                ServiceDescriptor::singleton(|ctx: ResolveContext| async move {
                    ctx.resolve_by_name::<Counter>("a").await?;
                    Ok::<_, DynError>(Counter(1))
                })
                .named("b")
                .build(),
            )
            .unwrap();

        let err = container.resolve_by_name::<Counter>("a").await.unwrap_err();
        match err.root_cause() {
            ResolveError::CircularDependency { key, chain } => {
                assert_eq!(key, "a");
                assert_eq!(chain, &["a", "b", "a"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(container.cached_keys().is_empty());
    }
}
