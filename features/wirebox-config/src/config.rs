use std::{any::type_name, ops::Deref, sync::Arc};

use wirebox_di::{ResolveContext, ResolveError, Resolver};

/// A wrapper type to allow for config injections
///
/// Resolves a config registered through [`crate::provider::ConfigProvider::into_module`]
/// from inside a provider.
///
/// # Example
/// ```rust
/// use wirebox_config::{Config, ConfigProvider};
/// use wirebox_di::{ContainerBuilder, DynError, ResolveContext, ServiceDescriptor};
///
/// pub struct ServerConfig {
///     port: u16,
/// }
///
/// struct Server {
///     port: u16,
/// }
///
/// # futures::executor::block_on(async {
/// let mut configs = ConfigProvider::initialize();
/// configs.add_config(ServerConfig { port: 8080 }).unwrap();
///
/// let container = ContainerBuilder::new()
///     .add_module(configs.into_module().unwrap())
///     .add(
///         ServiceDescriptor::singleton(|ctx: ResolveContext| async move {
///             let config = ctx.require::<Config<ServerConfig>>().await?;
///             Ok::<_, DynError>(Server { port: config.port })
///         })
///         .build(),
///     )
///     .build_started()
///     .await
///     .unwrap();
///
/// assert_eq!(container.resolve::<Server>().await.unwrap().port, 8080);
/// # });
/// ```
pub struct Config<T> {
    inner: Arc<T>,
}
impl<T> Deref for Config<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
impl<T> Config<T> {
    pub fn inner(&self) -> Arc<T> {
        self.inner.clone()
    }

    pub fn into_inner(self) -> Arc<T> {
        self.inner
    }
}

impl<T: Send + Sync + 'static> Resolver for Config<T> {
    async fn resolve(ctx: &ResolveContext) -> Result<Self, ResolveError> {
        let inner = ctx.resolve_by_name::<T>(type_name::<T>()).await?;
        Ok(Config { inner })
    }
}
