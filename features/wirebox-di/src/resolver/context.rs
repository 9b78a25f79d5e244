use std::{any::type_name, fmt::Debug, sync::Arc};

use crate::{
    container::Container,
    descriptor::{Lifecycle, ServiceDescriptor},
    errors::ResolveError,
    resolver::Resolver,
    types::{Injectable, Instance, TypeInfo},
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum ChainEntry {
    /// Identity claimed by a checked resolution
    Claimed(String),
    /// Key of a service whose provider is running
    Constructing(String),
}

struct ChainLink {
    entry: ChainEntry,
    parent: ResolutionChain,
}

/// The path of resolutions leading to the current provider call
///
/// Persistent list - pushing shares the parent, so every nested provider sees its own
/// path and siblings never see each other.
#[derive(Clone, Default)]
struct ResolutionChain(Option<Arc<ChainLink>>);

impl ResolutionChain {
    fn push(&self, entry: ChainEntry) -> Self {
        Self(Some(Arc::new(ChainLink {
            entry,
            parent: self.clone(),
        })))
    }

    fn entries(&self) -> impl Iterator<Item = &ChainEntry> + '_ {
        let mut next = self.0.as_deref();
        std::iter::from_fn(move || {
            let link = next?;
            next = link.parent.0.as_deref();
            Some(&link.entry)
        })
    }

    fn is_claimed(&self, identity: &str) -> bool {
        self.entries()
            .any(|entry| matches!(entry, ChainEntry::Claimed(claimed) if claimed == identity))
    }

    fn is_constructing(&self, key: &str) -> bool {
        self.entries()
            .any(|entry| matches!(entry, ChainEntry::Constructing(constructing) if constructing == key))
    }

    /// Claimed identities, outermost first
    fn claimed(&self) -> Vec<String> {
        let mut claimed: Vec<_> = self
            .entries()
            .filter_map(|entry| match entry {
                ChainEntry::Claimed(identity) => Some(identity.clone()),
                ChainEntry::Constructing(_) => None,
            })
            .collect();
        claimed.reverse();
        claimed
    }

    /// Keys under construction, outermost first
    fn constructing(&self) -> Vec<String> {
        let mut constructing: Vec<_> = self
            .entries()
            .filter_map(|entry| match entry {
                ChainEntry::Constructing(key) => Some(key.clone()),
                ChainEntry::Claimed(_) => None,
            })
            .collect();
        constructing.reverse();
        constructing
    }
}

/// Handle for resolving services, handed to every provider
///
/// Carries the chain of resolutions that led to the provider call. Nested
/// resolutions must go through the context the provider received, which is what lets
/// the checked variants detect cycles.
#[derive(Clone)]
pub struct ResolveContext {
    container: Container,
    chain: ResolutionChain,
}
impl Debug for ResolveContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolveContext")
            .field("claimed", &self.chain.claimed())
            .field("constructing", &self.chain.constructing())
            .finish()
    }
}

impl ResolveContext {
    /// A context with an empty chain
    pub(crate) fn root(container: Container) -> Self {
        Self {
            container,
            chain: ResolutionChain::default(),
        }
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Identities claimed by checked resolutions on the way here, outermost first
    pub fn claimed(&self) -> Vec<String> {
        self.chain.claimed()
    }

    /// Resolves the service registered under `key`
    pub async fn resolve_by_name<C: ?Sized + Injectable>(&self, key: &str) -> Result<Arc<C>, ResolveError> {
        let descriptor = self.descriptor(key)?;
        let instance = self.instantiate(&descriptor).await?;
        downcast(&descriptor, &instance)
    }

    /// Resolves the service with the lowest priority among those provided as `C`
    pub async fn resolve<C: ?Sized + Injectable>(&self) -> Result<Arc<C>, ResolveError> {
        let info = TypeInfo::of::<C>();
        let descriptor = self
            .container
            .with_registry(|registry| registry.matching_type(&info).first().map(|d| (*d).clone()))
            .ok_or_else(|| ResolveError::NotFound(info.type_name.to_string()))?;

        let instance = self.instantiate(&descriptor).await?;
        downcast(&descriptor, &instance)
    }

    /// Resolves every service provided as `C`, ordered by priority
    pub async fn resolve_all<C: ?Sized + Injectable>(&self) -> Result<Vec<Arc<C>>, ResolveError> {
        let info = TypeInfo::of::<C>();
        let descriptors: Vec<ServiceDescriptor> = self.container.with_registry(|registry| {
            registry
                .matching_type(&info)
                .into_iter()
                .cloned()
                .collect()
        });

        let mut resolved = Vec::with_capacity(descriptors.len());
        for descriptor in &descriptors {
            let instance = self.instantiate(descriptor).await?;
            resolved.push(downcast(descriptor, &instance)?);
        }
        Ok(resolved)
    }

    /// Like [`Self::resolve_by_name`], failing if `key` was already claimed on this chain
    pub async fn resolve_by_name_checked<C: ?Sized + Injectable>(
        &self,
        key: &str,
    ) -> Result<Arc<C>, ResolveError> {
        self.claim(key.trim())?.resolve_by_name(key).await
    }

    /// Like [`Self::resolve`], failing if `C` was already claimed on this chain
    pub async fn resolve_checked<C: ?Sized + Injectable>(&self) -> Result<Arc<C>, ResolveError> {
        self.claim(type_name::<C>())?.resolve::<C>().await
    }

    /// Resolves the service under `key` without knowing its type
    pub async fn resolve_instance(&self, key: &str) -> Result<Instance, ResolveError> {
        let descriptor = self.descriptor(key)?;
        self.instantiate(&descriptor).await
    }

    /// Resolves anything implementing [`Resolver`]
    pub async fn require<R: Resolver>(&self) -> Result<R, ResolveError> {
        R::resolve(self).await
    }

    fn descriptor(&self, key: &str) -> Result<ServiceDescriptor, ResolveError> {
        self.container
            .with_registry(|registry| registry.get(key).cloned())
            .ok_or_else(|| ResolveError::NotFound(key.trim().to_string()))
    }

    fn claim(&self, identity: &str) -> Result<ResolveContext, ResolveError> {
        if self.chain.is_claimed(identity) {
            let mut chain = self.chain.claimed();
            chain.push(identity.to_string());
            return Err(ResolveError::CircularDependency {
                key: identity.to_string(),
                chain,
            });
        }

        Ok(ResolveContext {
            container: self.container.clone(),
            chain: self.chain.push(ChainEntry::Claimed(identity.to_string())),
        })
    }

    /// Produces an instance for the descriptor, honouring its lifecycle
    pub(crate) async fn instantiate(&self, descriptor: &ServiceDescriptor) -> Result<Instance, ResolveError> {
        if descriptor.lifecycle == Lifecycle::Factory {
            return self.construct(descriptor).await;
        }

        let cache = self.container.instances();
        if let Some(instance) = cache.get(&descriptor.key) {
            tracing::trace!("Using cached instance of '{}'", descriptor.key);
            return Ok(instance);
        }

        // Waiting on our own construction would never finish
        if self.chain.is_constructing(&descriptor.key) {
            let mut chain = self.chain.constructing();
            chain.push(descriptor.key.clone());
            return Err(ResolveError::CircularDependency {
                key: descriptor.key.clone(),
                chain,
            });
        }

        cache
            .get_or_try_init(&descriptor.key, || self.construct(descriptor))
            .await
    }

    /// Runs the provider of the descriptor, without touching the cache
    pub(crate) async fn construct(&self, descriptor: &ServiceDescriptor) -> Result<Instance, ResolveError> {
        tracing::debug!("Constructing '{}'", descriptor.key);
        let ctx = ResolveContext {
            container: self.container.clone(),
            chain: self.chain.push(ChainEntry::Constructing(descriptor.key.clone())),
        };

        descriptor
            .provider
            .construct(ctx)
            .await
            .map_err(|error| ResolveError::Provider {
                key: descriptor.key.clone(),
                type_name: descriptor.type_info.type_name,
                error: Arc::new(error),
            })
    }
}

fn downcast<C: ?Sized + Injectable>(
    descriptor: &ServiceDescriptor,
    instance: &Instance,
) -> Result<Arc<C>, ResolveError> {
    instance
        .downcast::<C>()
        .map_err(|actual| ResolveError::TypeMismatch {
            key: descriptor.key.clone(),
            expected: type_name::<C>(),
            actual,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_is_persistent() {
        let root = ResolutionChain::default();
        let a = root.push(ChainEntry::Claimed("a".into()));
        let ab = a.push(ChainEntry::Constructing("b".into()));
        let ac = a.push(ChainEntry::Claimed("c".into()));

        assert!(ab.is_claimed("a"));
        assert!(ab.is_constructing("b"));
        assert!(!ac.is_constructing("b"), "siblings do not share entries");
        assert_eq!(ac.claimed(), ["a", "c"]);
        assert!(root.claimed().is_empty());
    }
}
