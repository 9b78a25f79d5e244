//! Wirebox DI - an async dependency injection container
//!
//! Services are registered as [`ServiceDescriptor`]s under a string key. Each one
//! names the capability it is resolved as, its [`Lifecycle`], and an async provider
//! which receives a [`ResolveContext`] to pull its own dependencies.
//!
//! ```rust
//! use std::sync::Arc;
//! use wirebox_di::{Container, DynError, ResolveContext, ServiceDescriptor};
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! struct English {
//!     name: Arc<String>,
//! }
//! impl Greeter for English {
//!     fn greet(&self) -> String {
//!         format!("Hello {}", self.name)
//!     }
//! }
//!
//! # futures::executor::block_on(async {
//! let container = Container::new();
//! container
//!     .register(ServiceDescriptor::instance("World".to_string()).build())
//!     .unwrap();
//! container
//!     .register(
//!         ServiceDescriptor::singleton(|ctx: ResolveContext| async move {
//!             let name = ctx.resolve::<String>().await?;
//!             Ok::<_, DynError>(English { name })
//!         })
//!         .provides::<dyn Greeter>(|english| english)
//!         .build(),
//!     )
//!     .unwrap();
//!
//! let greeter = container.resolve::<dyn Greeter>().await.unwrap();
//! assert_eq!(greeter.greet(), "Hello World");
//! # });
//! ```
//!
//! A container goes through registration, [`Container::start`] (eager services are
//! built), optionally [`Container::lock`], and finally [`Container::destroy`].

mod builder;
mod cache;
mod container;
mod descriptor;
pub mod errors;
mod factories;
mod hub;
mod locking;
mod registry;
pub mod resolver;
pub mod types;

pub use builder::ContainerBuilder;
pub use container::Container;
pub use descriptor::{DescriptorBuilder, Lifecycle, ServiceDescriptor};
pub use errors::{ContainerError, LifecycleError, RegistryError, ResolveError, TeardownErrors};
pub use factories::{DynFactory, InstanceFactory};
pub use hub::ServiceHub;
pub use registry::Registry;
pub use resolver::{All, ResolveContext, Resolver};
pub use types::{Destroy, DynError, Injectable, Instance, TypeInfo};
