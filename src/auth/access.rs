//! Access decisions.

use tracing::debug;

use crate::auth::context::RequestContext;
use crate::auth::error::AuthError;
use crate::auth::registry::RoleRegistry;
use crate::auth::role::RoleRequirement;

/// Outcome of an access decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Convert into the generic error surfaced to callers.
    pub fn into_result(self) -> Result<(), AuthError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny => Err(AuthError::Forbidden),
        }
    }
}

/// Decide whether the request's principal may invoke an operation.
///
/// Rules, in order:
/// 1. No requirement (public): allow
/// 2. No principal: deny
/// 3. `Any`: allow
/// 4. Allow iff the principal's role is in the declared set
pub fn decide(ctx: &RequestContext, requirement: Option<&RoleRequirement>) -> Decision {
    let Some(requirement) = requirement else {
        return Decision::Allow;
    };
    let Some(principal) = ctx.principal() else {
        return Decision::Deny;
    };
    if requirement.permits(principal.role()) {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

/// Look up `operation` in `registry` and decide for `ctx`.
pub fn authorize(
    ctx: &RequestContext,
    registry: &RoleRegistry,
    operation: &str,
) -> Result<(), AuthError> {
    let decision = decide(ctx, registry.requirement(operation));
    if !decision.is_allowed() {
        debug!(operation, caller = %ctx.display(), "Access denied");
    }
    decision.into_result()
}
