use std::{ops::Deref, sync::Arc};

use crate::{
    errors::ResolveError,
    resolver::{ResolveContext, Resolver},
    types::Injectable,
};

impl<T: ?Sized + Injectable> Resolver for Arc<T> {
    async fn resolve(ctx: &ResolveContext) -> Result<Self, ResolveError> {
        ctx.resolve::<T>().await
    }
}

impl<Resolvable: Resolver> Resolver for Option<Resolvable> {
    async fn resolve(ctx: &ResolveContext) -> Result<Self, ResolveError> {
        match Resolvable::resolve(ctx).await {
            Ok(resolved) => Ok(Some(resolved)),
            // Only a missing registration makes the dependency absent, provider failures still surface
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Every service provided as `T`, ordered by priority
#[derive(Debug)]
pub struct All<T: ?Sized>(pub Vec<Arc<T>>);

impl<T: ?Sized> Deref for All<T> {
    type Target = [Arc<T>];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: ?Sized + Injectable> Resolver for All<T> {
    async fn resolve(ctx: &ResolveContext) -> Result<Self, ResolveError> {
        ctx.resolve_all::<T>().await.map(All)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Container, DynError, ServiceDescriptor};

    #[derive(Debug)]
    struct Metrics;

    #[tokio::test]
    async fn test_option_is_none_only_when_missing() {
        let container = Container::new();
        let missing = container.require::<Option<Arc<Metrics>>>().await.unwrap();
        assert!(missing.is_none());

        container
            .register(
                ServiceDescriptor::singleton(|_| async { Err::<Metrics, _>("exporter offline") })
                    .build(),
            )
            .unwrap();
        let err = container.require::<Option<Arc<Metrics>>>().await.unwrap_err();
        assert!(matches!(err, ResolveError::Provider { .. }));
        assert!(!err.is_not_found());
    }
}
