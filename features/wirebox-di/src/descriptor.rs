use std::{fmt::Debug, future::Future, sync::Arc};

use crate::{
    factories::{destroy_hook, Blueprint, DynFactory, ExistingInstance, FactoryProvider, InstanceFactory},
    resolver::ResolveContext,
    types::{Destroy, DynError, Injectable, TypeInfo},
};

/// How often a service is constructed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifecycle {
    /// One instance per container, cached after the first resolution
    #[default]
    Singleton,
    /// A new instance on every resolution, never cached
    Factory,
}

/// One registrable service
///
/// Created through [`DescriptorBuilder`], e.g. [`ServiceDescriptor::singleton`].
#[derive(Clone)]
pub struct ServiceDescriptor {
    pub(crate) key: String,
    pub(crate) type_info: TypeInfo,
    pub(crate) capability: TypeInfo,
    pub(crate) eager: bool,
    pub(crate) explicitly_locked: bool,
    pub(crate) dependency_locked: bool,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) dependencies: Vec<String>,
    pub(crate) priority: i32,
    pub(crate) provider: Arc<dyn DynFactory>,
}
impl Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("key", &self.key)
            .field("type", &self.type_info.type_name)
            .field("capability", &self.capability.type_name)
            .field("lifecycle", &self.lifecycle)
            .field("eager", &self.eager)
            .field("explicitly_locked", &self.explicitly_locked)
            .field("dependency_locked", &self.dependency_locked)
            .field("dependencies", &self.dependencies)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

impl ServiceDescriptor {
    /// A service constructed once and cached
    pub fn singleton<T, F, Fut, E>(provider: F) -> DescriptorBuilder<T>
    where
        T: Injectable,
        F: Fn(ResolveContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send,
        E: Into<DynError>,
    {
        DescriptorBuilder::with_factory(Lifecycle::Singleton, provider)
    }

    /// A service constructed anew on every resolution
    pub fn factory<T, F, Fut, E>(provider: F) -> DescriptorBuilder<T>
    where
        T: Injectable,
        F: Fn(ResolveContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, E>> + Send,
        E: Into<DynError>,
    {
        DescriptorBuilder::with_factory(Lifecycle::Factory, provider)
    }

    /// A singleton service handing out an already built value
    pub fn instance<T: Injectable>(value: T) -> DescriptorBuilder<T> {
        Self::shared_instance(Arc::new(value))
    }

    /// Like [`Self::instance`], for a value that is already shared
    pub fn shared_instance<T: Injectable>(value: Arc<T>) -> DescriptorBuilder<T> {
        DescriptorBuilder::new(
            Lifecycle::Singleton,
            Box::new(move |blueprint| Arc::new(ExistingInstance { value, blueprint }) as Arc<dyn DynFactory>),
        )
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    pub fn capability(&self) -> TypeInfo {
        self.capability
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_singleton(&self) -> bool {
        self.lifecycle == Lifecycle::Singleton
    }

    pub fn is_eager(&self) -> bool {
        self.eager
    }

    pub fn is_explicitly_locked(&self) -> bool {
        self.explicitly_locked
    }

    /// Set by the container when a locked or eager service depends on this one
    pub fn is_dependency_locked(&self) -> bool {
        self.dependency_locked
    }

    /// Locked services cannot be overwritten
    pub fn is_locked(&self) -> bool {
        self.explicitly_locked || self.dependency_locked
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Matches the key, the concrete type name or the capability name
    pub fn matches_name(&self, name: &str) -> bool {
        let name = name.trim();
        self.key == name || self.type_info.matches_name(name) || self.capability.matches_name(name)
    }

    /// Matches the key against the type name, or the concrete type or capability itself
    pub fn matches_type(&self, info: &TypeInfo) -> bool {
        self.key == info.type_name || self.type_info == *info || self.capability == *info
    }

    /// Whether registering this descriptor locks its dependencies
    pub(crate) fn locks_dependencies(&self) -> bool {
        if !self.is_singleton() || self.dependencies.is_empty() {
            return false;
        }
        self.eager || self.explicitly_locked
    }
}

type MakeProvider<T> = Box<dyn FnOnce(Blueprint<T>) -> Arc<dyn DynFactory>>;

/// Fluent builder for a [`ServiceDescriptor`] providing `T`
pub struct DescriptorBuilder<T: Injectable> {
    make_provider: MakeProvider<T>,
    lifecycle: Lifecycle,
    key: Option<String>,
    capability: TypeInfo,
    blueprint: Blueprint<T>,
    eager: bool,
    locked: bool,
    dependencies: Vec<String>,
    priority: i32,
}

impl<T: Injectable> DescriptorBuilder<T> {
    fn new(lifecycle: Lifecycle, make_provider: MakeProvider<T>) -> Self {
        DescriptorBuilder {
            make_provider,
            lifecycle,
            key: None,
            capability: TypeInfo::of::<T>(),
            blueprint: Blueprint::new(),
            eager: false,
            locked: false,
            dependencies: Vec::new(),
            priority: 0,
        }
    }

    /// Builds the service through any [`InstanceFactory`], not only closures
    pub fn with_factory<F: InstanceFactory<T>>(lifecycle: Lifecycle, factory: F) -> Self {
        Self::new(
            lifecycle,
            Box::new(move |blueprint| Arc::new(FactoryProvider { factory, blueprint }) as Arc<dyn DynFactory>),
        )
    }

    /// Registers the service under `key` instead of its type name
    pub fn named(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Resolves the service as `C`, e.g. a trait object it implements
    ///
    /// ```rust
    /// # use std::sync::Arc;
    /// # use wirebox_di::{DynError, ServiceDescriptor};
    /// trait Greeter: Send + Sync {}
    /// struct English;
    /// impl Greeter for English {}
    ///
    /// let descriptor = ServiceDescriptor::singleton(|_| async { Ok::<_, DynError>(English) })
    ///     .provides::<dyn Greeter>(|english| english)
    ///     .build();
    /// ```
    pub fn provides<C: ?Sized + Injectable>(mut self, cast: fn(Arc<T>) -> Arc<C>) -> Self {
        let teardown = self.blueprint.teardown;
        self.blueprint = Blueprint::with_capability(cast);
        self.blueprint.teardown = teardown;
        self.capability = TypeInfo::of::<C>();
        self
    }

    /// Constructs the service during [`crate::Container::start`]
    pub fn eager(mut self) -> Self {
        self.eager = true;
        self
    }

    /// Forbids overwriting the service, and locks its declared dependencies
    pub fn locked(mut self) -> Self {
        self.locked = true;
        self
    }

    /// Declares a dependency by key, type name or capability name
    ///
    /// Declarations are only used to propagate locks, providers still resolve their
    /// dependencies themselves.
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }

    /// Lower values win when several services share a capability
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Tear the instance down through [`Destroy`] when the container is destroyed
    pub fn destroyable(mut self) -> Self
    where
        T: Destroy,
    {
        self.blueprint.teardown = Some(destroy_hook::<T>);
        self
    }

    pub fn build(self) -> ServiceDescriptor {
        let type_info = TypeInfo::of::<T>();
        let key = match self.key {
            Some(key) => key.trim().to_string(),
            None => type_info.type_name.to_string(),
        };

        ServiceDescriptor {
            key,
            type_info,
            capability: self.capability,
            eager: self.eager,
            explicitly_locked: self.locked,
            dependency_locked: false,
            lifecycle: self.lifecycle,
            dependencies: self.dependencies,
            priority: self.priority,
            provider: (self.make_provider)(self.blueprint),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Storage: Send + Sync {}
    struct Repo;
    impl Storage for Repo {}

    fn repo() -> DescriptorBuilder<Repo> {
        ServiceDescriptor::singleton(|_| async { Ok::<_, DynError>(Repo) })
    }

    #[test]
    fn test_default_key_is_type_name() {
        let descriptor = repo().build();
        assert_eq!(descriptor.key(), std::any::type_name::<Repo>());
        assert_eq!(descriptor.capability(), TypeInfo::of::<Repo>());
        assert_eq!(descriptor.priority(), 0);
        assert!(descriptor.is_singleton());
        assert!(!descriptor.is_locked());
    }

    #[test]
    fn test_named_key_is_trimmed() {
        let descriptor = repo().named("  repo ").build();
        assert_eq!(descriptor.key(), "repo");
    }

    #[test]
    fn test_matches_name() {
        let descriptor = repo()
            .named("primary")
            .provides::<dyn Storage>(|repo| repo)
            .build();

        assert!(descriptor.matches_name("primary"));
        assert!(descriptor.matches_name(" primary "));
        assert!(descriptor.matches_name("Repo"));
        assert!(descriptor.matches_name("Storage"));
        assert!(descriptor.matches_name(std::any::type_name::<dyn Storage>()));
        assert!(!descriptor.matches_name("secondary"));
    }

    #[test]
    fn test_matches_type() {
        let descriptor = repo().provides::<dyn Storage>(|repo| repo).build();
        assert!(descriptor.matches_type(&TypeInfo::of::<Repo>()));
        assert!(descriptor.matches_type(&TypeInfo::of::<dyn Storage>()));
        assert!(!descriptor.matches_type(&TypeInfo::of::<String>()));
    }

    #[test]
    fn test_locks_dependencies() {
        assert!(!repo().depends_on("Db").build().locks_dependencies());
        assert!(repo().eager().depends_on("Db").build().locks_dependencies());
        assert!(repo().locked().depends_on("Db").build().locks_dependencies());
        assert!(!repo().eager().locked().build().locks_dependencies());

        let factory = ServiceDescriptor::factory(|_| async { Ok::<_, DynError>(Repo) })
            .eager()
            .depends_on("Db")
            .build();
        assert!(!factory.locks_dependencies());
    }
}
