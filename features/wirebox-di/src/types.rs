use std::{
    any::{Any, TypeId},
    fmt::Debug,
    future::Future,
    sync::Arc,
};

use futures::future::BoxFuture;

/// Errors raised by user supplied providers and teardown hooks
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// We assume that we are using a multithreaded async runtime
/// So anything injectable needs to be Send + Sync + 'static
pub trait Injectable: Send + Sync + 'static {}
impl<T: ?Sized + Send + Sync + 'static> Injectable for T {}

/// Teardown capability of a service
///
/// Only instances registered through [`crate::DescriptorBuilder::destroyable`] are
/// torn down by [`crate::Container::destroy`].
pub trait Destroy: Send + Sync {
    fn destroy(&self) -> impl Future<Output = Result<(), DynError>> + Send;
}

pub(crate) type TeardownHook = Arc<dyn Fn() -> BoxFuture<'static, Result<(), DynError>> + Send + Sync>;

/// A produced service instance with its type information erased
///
/// Holds the concrete value and the view it is resolved *as* (its capability),
/// so it can be handed out as either.
#[derive(Clone)]
pub struct Instance {
    pub info: TypeInfo,
    pub capability: TypeInfo,
    /// `Arc<T>` of the concrete type
    concrete: Arc<dyn Any + Send + Sync>,
    /// `Arc<C>` of the capability
    exposed: Arc<dyn Any + Send + Sync>,
    teardown: Option<TeardownHook>,
}
impl Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.info.type_name)
            .field("capability", &self.capability.type_name)
            .field("destroyable", &self.teardown.is_some())
            .finish()
    }
}

impl Instance {
    pub(crate) fn new<T: Injectable, C: ?Sized + Injectable>(value: Arc<T>, exposed: Arc<C>) -> Self {
        Instance {
            info: TypeInfo::of::<T>(),
            capability: TypeInfo::of::<C>(),
            concrete: Arc::new(value),
            exposed: Arc::new(exposed),
            teardown: None,
        }
    }

    pub(crate) fn with_teardown(mut self, hook: TeardownHook) -> Self {
        self.teardown = Some(hook);
        self
    }

    /// Returns the instance as `Arc<T>` if `T` is its capability or its concrete type
    ///
    /// On failure the concrete type name is returned
    pub fn downcast<T: ?Sized + Injectable>(&self) -> Result<Arc<T>, &'static str> {
        if let Some(exposed) = self.exposed.downcast_ref::<Arc<T>>() {
            return Ok(exposed.clone());
        }
        match self.concrete.downcast_ref::<Arc<T>>() {
            Some(concrete) => Ok(concrete.clone()),
            None => Err(self.info.type_name),
        }
    }

    /// True if both refer to the same underlying value
    pub fn same_as(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.concrete, &other.concrete)
    }

    pub fn is_destroyable(&self) -> bool {
        self.teardown.is_some()
    }

    /// Runs the teardown hook, if the instance has one
    pub(crate) async fn teardown(&self) -> Result<(), DynError> {
        match &self.teardown {
            Some(hook) => hook().await,
            None => Ok(()),
        }
    }
}

/// Type Name and Type Id
///
/// Doubles as the capability token services are registered and resolved by.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
}
impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}
impl TypeInfo {
    pub fn of<T: 'static + ?Sized>() -> TypeInfo {
        TypeInfo {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }

    /// Type name without its module path - `my_app::db::Repo` becomes `Repo`
    ///
    /// Generic parameters are kept as they are.
    pub fn short_name(&self) -> &'static str {
        short_name(self.type_name)
    }

    /// Accepts the full type name as well as the short one
    pub fn matches_name(&self, name: &str) -> bool {
        self.type_name == name || self.short_name() == name
    }
}

fn short_name(type_name: &'static str) -> &'static str {
    let base = type_name.split('<').next().unwrap_or(type_name);
    match base.rfind("::") {
        Some(idx) => &type_name[idx + 2..],
        None => type_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Speaker: Send + Sync {
        fn speak(&self) -> &'static str;
    }

    struct Dog;
    impl Speaker for Dog {
        fn speak(&self) -> &'static str {
            "woof"
        }
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("my_app::db::Repo"), "Repo");
        assert_eq!(short_name("Repo"), "Repo");
        assert_eq!(short_name("alloc::vec::Vec<my_app::Repo>"), "Vec<my_app::Repo>");
        assert_eq!(
            short_name("dyn my_app::Speaker"),
            "Speaker",
            "trait objects keep no module path"
        );
    }

    #[test]
    fn test_matches_name() {
        let info = TypeInfo::of::<Dog>();
        assert!(info.matches_name("Dog"));
        assert!(info.matches_name(std::any::type_name::<Dog>()));
        assert!(!info.matches_name("Cat"));
    }

    #[test]
    fn test_downcast_to_capability_and_concrete() {
        let dog = Arc::new(Dog);
        let speaker: Arc<dyn Speaker> = dog.clone();
        let instance = Instance::new(dog.clone(), speaker);

        let as_speaker = instance.downcast::<dyn Speaker>().unwrap();
        assert_eq!(as_speaker.speak(), "woof");

        let as_dog = instance.downcast::<Dog>().unwrap();
        assert!(Arc::ptr_eq(&as_dog, &dog));

        assert_eq!(
            instance.downcast::<String>().unwrap_err(),
            std::any::type_name::<Dog>()
        );
    }

    #[test]
    fn test_same_as() {
        let a = Instance::new(Arc::new(Dog), Arc::new(Dog));
        let b = a.clone();
        let c = Instance::new(Arc::new(Dog), Arc::new(Dog));
        assert!(a.same_as(&b));
        assert!(!a.same_as(&c));
    }
}
