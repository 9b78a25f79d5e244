//! Typed configuration values served as locked services of a wirebox container.
//!
//! Configs are collected in a [`ConfigProvider`], one value per type. Calling
//! [`ConfigProvider::into_module`] turns every config into an explicitly locked singleton
//! keyed by its type name. Merge that module into the application container and no later
//! registration can replace a config. Providers read configs through [`Config<T>`].
//!
//! ```rust
//! use wirebox_config::ConfigProvider;
//! use wirebox_di::{ContainerBuilder, RegistryError, ServiceDescriptor};
//!
//! struct Database {
//!     url: String,
//! }
//!
//! let mut configs = ConfigProvider::initialize();
//! configs
//!     .add_config(Database { url: "postgres://localhost".to_string() })
//!     .unwrap()
//!     .maybe_add_config(None::<u16>)
//!     .unwrap();
//! assert!(configs.add_config(Database { url: String::new() }).is_err());
//!
//! let container = ContainerBuilder::new()
//!     .add_module(configs.into_module().unwrap())
//!     .build()
//!     .unwrap();
//!
//! // The config is locked, overriding it is rejected
//! let err = container
//!     .register(ServiceDescriptor::instance(Database { url: String::new() }).build())
//!     .unwrap_err();
//! assert!(matches!(err, RegistryError::LockedService(_)));
//!
//! # futures::executor::block_on(async {
//! let database = container.resolve::<Database>().await.unwrap();
//! assert_eq!(database.url, "postgres://localhost");
//! # });
//! ```
//!
//! Configs that are only needed outside the container can still be read straight from the
//! provider with [`ConfigProvider::get_config`] before it is turned into a module.

pub mod config;
pub mod errors;
pub mod provider;

pub use config::Config;
pub use provider::ConfigProvider;
