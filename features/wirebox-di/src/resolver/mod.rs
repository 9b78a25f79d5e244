use std::future::Future;

use crate::errors::ResolveError;

pub mod arc;
mod context;

pub use arc::All;
pub use context::ResolveContext;

/// Allows custom behaviour on resolution
///
/// Implemented for `Arc<T>`, `Option<R>` and [`All<T>`]. Use it through
/// [`ResolveContext::require`].
pub trait Resolver: Sized + Send {
    fn resolve(ctx: &ResolveContext) -> impl Future<Output = Result<Self, ResolveError>> + Send;
}
