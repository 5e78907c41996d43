//! Small operations used to exercise each kind of role declaration.

use serde_json::{Value, json};

use crate::auth::{RequestContext, Role, RoleRequirement};
use crate::operations::{OperationFuture, OperationHandler};

/// Handler for `ping`: public liveness check.
pub struct PingHandler;

impl OperationHandler for PingHandler {
    fn name(&self) -> &str {
        "ping"
    }

    fn description(&self) -> &str {
        "Public operation; always answers."
    }

    fn execute<'a>(&'a self, _args: Value, ctx: &'a RequestContext) -> OperationFuture<'a> {
        Box::pin(async move {
            Ok(json!({
                "pong": true,
                "authenticated": ctx.is_authenticated(),
            }))
        })
    }
}

/// Operation restricted to a single role. Echoes the caller.
pub struct RoleGateHandler {
    name: &'static str,
    role: Role,
}

impl RoleGateHandler {
    /// `ownerDashboard`, restricted to owners.
    pub fn owner_dashboard() -> Self {
        Self {
            name: "ownerDashboard",
            role: Role::Owner,
        }
    }

    /// `deliveryQueue`, restricted to delivery drivers.
    pub fn delivery_queue() -> Self {
        Self {
            name: "deliveryQueue",
            role: Role::Delivery,
        }
    }
}

impl OperationHandler for RoleGateHandler {
    fn name(&self) -> &str {
        self.name
    }

    fn requirement(&self) -> Option<RoleRequirement> {
        Some(RoleRequirement::only(self.role))
    }

    fn execute<'a>(&'a self, _args: Value, ctx: &'a RequestContext) -> OperationFuture<'a> {
        Box::pin(async move {
            Ok(json!({
                "operation": self.name,
                "user_id": ctx.principal().map(|p| p.id()),
            }))
        })
    }
}
