use std::{future::Future, sync::Arc};

use futures::future::BoxFuture;

use crate::{
    resolver::ResolveContext,
    types::{Destroy, DynError, Injectable, Instance, TeardownHook},
};

/// A Factory providing instances of a given type
///
/// Implemented for every `Fn(ResolveContext) -> impl Future<Output = Result<T, E>>`,
/// so plain async closures can be registered directly:
///
/// ```rust
/// # use wirebox_di::{DynError, ServiceDescriptor};
/// struct Repo;
/// let descriptor = ServiceDescriptor::singleton(|_ctx| async { Ok::<_, DynError>(Repo) }).build();
/// ```
pub trait InstanceFactory<T>: Send + Sync + 'static {
    /// Constructs a new instance of the factory's provided type
    ///
    /// Dependencies are pulled through the given context, which must be used for every
    /// nested resolution so cycle checks see the whole chain.
    fn construct(&self, ctx: ResolveContext) -> impl Future<Output = Result<T, DynError>> + Send;
}

impl<T, F, Fut, E> InstanceFactory<T> for F
where
    F: Fn(ResolveContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send,
    E: Into<DynError>,
{
    fn construct(&self, ctx: ResolveContext) -> impl Future<Output = Result<T, DynError>> + Send {
        let construction_fut = self(ctx);
        async move { construction_fut.await.map_err(Into::into) }
    }
}

/// Wrapper Trait for factories, providing type erased instances
pub trait DynFactory: Send + Sync {
    /// Constructs a new instance, fulfilling all its dependencies through `ctx`
    fn construct(&self, ctx: ResolveContext) -> BoxFuture<'_, Result<Instance, DynError>>;
}

/// How a constructed `T` is exposed: its capability view and teardown hook
pub(crate) struct Blueprint<T: Injectable> {
    pub(crate) expose: Arc<dyn Fn(Arc<T>) -> Instance + Send + Sync>,
    pub(crate) teardown: Option<fn(Arc<T>) -> BoxFuture<'static, Result<(), DynError>>>,
}
impl<T: Injectable> Clone for Blueprint<T> {
    fn clone(&self) -> Self {
        Self {
            expose: self.expose.clone(),
            teardown: self.teardown,
        }
    }
}
impl<T: Injectable> Blueprint<T> {
    /// Exposes `T` as itself
    pub(crate) fn new() -> Self {
        Self::with_capability::<T>(|value| value)
    }

    pub(crate) fn with_capability<C: ?Sized + Injectable>(cast: fn(Arc<T>) -> Arc<C>) -> Self {
        Self {
            expose: Arc::new(move |value: Arc<T>| {
                let exposed = cast(value.clone());
                Instance::new(value, exposed)
            }),
            teardown: None,
        }
    }

    pub(crate) fn instantiate(&self, value: Arc<T>) -> Instance {
        let mut instance = (self.expose)(value.clone());
        if let Some(teardown) = self.teardown {
            let hook: TeardownHook = Arc::new(move || teardown(value.clone()));
            instance = instance.with_teardown(hook);
        }
        instance
    }
}

pub(crate) fn destroy_hook<T: Injectable + Destroy>(
    value: Arc<T>,
) -> BoxFuture<'static, Result<(), DynError>> {
    Box::pin(async move { value.destroy().await })
}

/// Builds a fresh `T` through an [`InstanceFactory`] on every call
pub(crate) struct FactoryProvider<T: Injectable, F> {
    pub(crate) factory: F,
    pub(crate) blueprint: Blueprint<T>,
}
impl<T: Injectable, F: InstanceFactory<T>> DynFactory for FactoryProvider<T, F> {
    fn construct(&self, ctx: ResolveContext) -> BoxFuture<'_, Result<Instance, DynError>> {
        Box::pin(async move {
            // Forward the call to the specific implementation
            let value = self.factory.construct(ctx).await?;
            Ok(self.blueprint.instantiate(Arc::new(value)))
        })
    }
}

/// Hands out an already built value
pub(crate) struct ExistingInstance<T: Injectable> {
    pub(crate) value: Arc<T>,
    pub(crate) blueprint: Blueprint<T>,
}
impl<T: Injectable> DynFactory for ExistingInstance<T> {
    fn construct(&self, _ctx: ResolveContext) -> BoxFuture<'_, Result<Instance, DynError>> {
        let instance = self.blueprint.instantiate(self.value.clone());
        Box::pin(async move { Ok(instance) })
    }
}
