//! User store seam.
//!
//! The pipeline only ever reads principals, by id, through this trait.

use std::future::Future;
use std::pin::Pin;

use anyhow::Result;

use crate::auth::context::Principal;
use crate::types::UserId;

/// Boxed future returned by [`UserStore`] lookups.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Read access to user records.
///
/// Implementations own timeouts; the resolver treats any error as "no
/// principal".
pub trait UserStore: Send + Sync {
    /// Load the principal with `id`, or `None` if no such user exists.
    fn find_by_id(&self, id: UserId) -> StoreFuture<'_, Option<Principal>>;
}
