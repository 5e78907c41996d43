//! Authentication and authorization pipeline.
//!
//! Requests flow through two explicit steps before an operation body runs:
//!
//! - **Resolve**: [`IdentityResolver`] turns the token header into a
//!   [`RequestContext`], loading the principal fresh from the [`UserStore`].
//!   Missing or bad tokens resolve to an anonymous context; resolution never
//!   rejects.
//! - **Decide**: [`decide`] checks the context against the operation's
//!   [`RoleRequirement`] from the [`RoleRegistry`]. This is the only
//!   enforcement point.
//!
//! ## Usage
//!
//! ```ignore
//! let ctx = resolver.resolve_headers(&headers).await;
//! authorize(&ctx, &roles, "createRestaurant")?;
//! // only now run the operation
//! ```

mod access;
mod context;
mod error;
mod password;
mod registry;
mod resolver;
mod role;
mod token;
mod user_store;

pub use access::{Decision, authorize, decide};
pub use context::{Principal, RequestContext};
pub use error::{AuthError, FORBIDDEN_MESSAGE};
pub use password::{Argon2Hasher, Credential, CredentialHasher, HashCost, PasswordDigest};
pub use registry::RoleRegistry;
pub use resolver::{DEFAULT_TOKEN_HEADER, IdentityResolver};
pub use role::{ANY_ROLE, Role, RoleRequirement};
pub use token::{Claim, TokenService};
pub use user_store::{StoreFuture, UserStore};

#[cfg(test)]
pub(crate) use password::tests::{FailingHasher, fast_hasher};
