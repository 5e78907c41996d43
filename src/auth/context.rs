//! Principal and request-scoped identity context.

use crate::auth::role::Role;
use crate::types::UserId;
use serde::{Deserialize, Serialize};

/// The authenticated identity behind a request.
///
/// Loaded fresh from the user store on every request; never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    id: UserId,
    email: String,
    role: Role,
    verified: bool,
}

impl Principal {
    pub fn new(id: UserId, email: impl Into<String>, role: Role, verified: bool) -> Self {
        Self {
            id,
            email: email.into(),
            role,
            verified,
        }
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Whether the principal confirmed their email address.
    pub fn is_verified(&self) -> bool {
        self.verified
    }
}

/// Per-request identity container.
///
/// Built once at the start of request handling and passed explicitly to
/// the access decision. Holds zero or one principal; "no principal" is a
/// normal state, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Resolved principal, if the request carried a valid token
    principal: Option<Principal>,
    /// Client IP address (for logging)
    ip_address: Option<String>,
    /// Client user agent (for logging)
    user_agent: Option<String>,
}

impl RequestContext {
    /// Context with no principal.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Context bound to a resolved principal.
    pub fn authenticated(principal: Principal) -> Self {
        Self {
            principal: Some(principal),
            ..Self::default()
        }
    }

    /// Set client metadata for logging.
    pub fn with_client_info(
        mut self,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        self.ip_address = ip_address;
        self.user_agent = user_agent;
        self
    }

    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.is_some()
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }

    /// Get a display-friendly name for the caller.
    pub fn display(&self) -> String {
        match &self.principal {
            Some(p) => format!("user {} ({})", p.id(), p.role()),
            None => "anonymous".to_string(),
        }
    }
}
