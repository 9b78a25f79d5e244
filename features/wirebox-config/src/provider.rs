use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::Arc,
};

use wirebox_di::{Container, RegistryError, ServiceDescriptor, TypeInfo};

use crate::errors::{GetConfigError, RegisterConfigError};

struct ConfigEntry {
    value: Arc<dyn Any + Send + Sync + 'static>,
    /// Locked singleton handing out `value`
    descriptor: ServiceDescriptor,
}

/// A provider to register all configs.
///
/// Configs can be registered and retrieved based on type, one value per type.
#[derive(Default)]
pub struct ConfigProvider {
    configs: HashMap<TypeId, ConfigEntry>,
    /// Registration order, kept for the module
    order: Vec<TypeId>,
}

impl ConfigProvider {
    /// Initializes an empty Config Provider
    pub fn initialize() -> Self {
        Self::default()
    }

    /// Retrieve a config with specified type.
    pub fn get_config<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.configs
            .get(&TypeId::of::<T>())
            .and_then(|entry| entry.value.clone().downcast().ok())
    }

    /// Like [`ConfigProvider::get_config`], failing if the config type is unknown
    pub fn require_config<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, GetConfigError> {
        self.get_config()
            .ok_or_else(|| GetConfigError::Missing(TypeInfo::of::<T>()))
    }

    /// Add a config to the registry.
    ///
    /// If the config type is already registered, it will return a
    /// [`RegisterConfigError`] runtime error
    pub fn add_config<T: Send + Sync + 'static>(
        &mut self,
        config: T,
    ) -> Result<&mut Self, RegisterConfigError> {
        let info = TypeInfo::of::<T>();

        if self.configs.contains_key(&info.type_id) {
            return Err(RegisterConfigError::AlreadyRegistered(info));
        }

        let value = Arc::new(config);
        let descriptor = ServiceDescriptor::shared_instance(value.clone())
            .locked()
            .build();

        self.configs.insert(info.type_id, ConfigEntry { value, descriptor });
        self.order.push(info.type_id);
        tracing::debug!("Registered config '{}'", info);
        Ok(self)
    }

    /// Can optionally add a config to the registry.
    ///
    /// If the config provided is `Some(T)`, it will be the same as calling [`ConfigProvider::add_config`]
    /// If the config provided is `None`, then the function just returns `Ok(self)` for chaining
    pub fn maybe_add_config<T: Send + Sync + 'static>(
        &mut self,
        config: Option<T>,
    ) -> Result<&mut Self, RegisterConfigError> {
        match config {
            Some(c) => self.add_config(c),
            None => Ok(self),
        }
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// A container holding every config as a locked singleton keyed by its type name
    ///
    /// Merge it into the application container, configs then cannot be overwritten.
    pub fn into_module(self) -> Result<Container, RegistryError> {
        let module = Container::new();
        let mut configs = self.configs;
        for type_id in &self.order {
            if let Some(entry) = configs.remove(type_id) {
                module.register(entry.descriptor)?;
            }
        }
        Ok(module)
    }
}
