use std::collections::{HashMap, HashSet};

use crate::{
    descriptor::ServiceDescriptor, errors::RegistryError, locking::propagate_locks, types::TypeInfo,
};

/// All service descriptors of a container, keyed by service key
///
/// Registration order is kept: it drives eager construction during start and breaks
/// priority ties. Overwriting a key keeps its original position.
///
/// A `Registry` handed out by [`crate::Container::snapshot`] is an owned copy and can
/// only be read.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    order: Vec<String>,
    services: HashMap<String, ServiceDescriptor>,
}

impl Registry {
    pub fn get(&self, key: &str) -> Option<&ServiceDescriptor> {
        self.services.get(key.trim())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.services.contains_key(key.trim())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Descriptors in registration order
    pub fn iter(&self) -> impl Iterator<Item = &ServiceDescriptor> + '_ {
        self.order.iter().filter_map(|key| self.services.get(key))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.order.iter().map(String::as_str)
    }

    /// Descriptors whose key, type name or capability name is `name`
    pub fn matching_name(&self, name: &str) -> Vec<&ServiceDescriptor> {
        self.iter().filter(|service| service.matches_name(name)).collect()
    }

    /// Descriptors resolvable as `info`, ordered by priority then registration
    pub fn matching_type(&self, info: &TypeInfo) -> Vec<&ServiceDescriptor> {
        let mut matches: Vec<_> = self.iter().filter(|service| service.matches_type(info)).collect();
        // Stable - equal priorities stay in registration order
        matches.sort_by_key(|service| service.priority);
        matches
    }

    pub fn locked_keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.iter()
            .filter(|service| service.is_locked())
            .map(|service| service.key.as_str())
    }

    /// Inserts or overwrites a descriptor, then locks what it depends on
    ///
    /// Leaves the registry untouched on failure.
    pub(crate) fn insert(&mut self, descriptor: ServiceDescriptor) -> Result<(), RegistryError> {
        self.ensure_unlocked(&descriptor.key)?;

        let key = descriptor.key.clone();
        let previous = self.put(descriptor);

        if let Err(error) = propagate_locks(self, &key) {
            match previous {
                Some(previous) => {
                    self.put(previous);
                }
                None => self.remove(&key),
            }
            return Err(error);
        }

        tracing::debug!("Registered service '{key}'");
        Ok(())
    }

    /// Copies the descriptors of each sub registry into this one
    ///
    /// Every sub registry is checked against the locked keys before any of its
    /// descriptors is inserted. Locks are propagated once the whole sub registry is in,
    /// so declarations may point at services registered later in it. The registry is
    /// left untouched on failure.
    pub(crate) fn merge(&mut self, modules: &[Registry]) -> Result<(), RegistryError> {
        let backup = self.clone();

        let result = modules.iter().try_for_each(|module| {
            let locked: HashSet<&str> = self.locked_keys().collect();
            if let Some(key) = module.keys().find(|key| locked.contains(key)) {
                return Err(RegistryError::LockedService(key.to_string()));
            }

            for descriptor in module.iter() {
                self.put(descriptor.clone());
            }
            for key in module.keys() {
                propagate_locks(self, key)?;
            }
            tracing::debug!("Merged module with {} services", module.len());
            Ok(())
        });

        if result.is_err() {
            *self = backup;
        }
        result
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut ServiceDescriptor> {
        self.services.get_mut(key)
    }

    fn ensure_unlocked(&self, key: &str) -> Result<(), RegistryError> {
        match self.get(key) {
            Some(existing) if existing.is_locked() => {
                Err(RegistryError::LockedService(existing.key.clone()))
            }
            _ => Ok(()),
        }
    }

    fn put(&mut self, descriptor: ServiceDescriptor) -> Option<ServiceDescriptor> {
        let key = descriptor.key.clone();
        let previous = self.services.insert(key.clone(), descriptor);
        if previous.is_none() {
            self.order.push(key);
        }
        previous
    }

    fn remove(&mut self, key: &str) {
        if self.services.remove(key).is_some() {
            self.order.retain(|existing| existing != key);
        }
    }
}
