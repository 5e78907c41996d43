//! Roles and declarative role requirements.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::auth::error::AuthError;

/// Name reserved for the "any authenticated principal" requirement.
///
/// It is never a valid [`Role`], so a future role cannot collide with it.
pub const ANY_ROLE: &str = "Any";

/// Capability class of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    Client,
    Owner,
    Delivery,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Client, Role::Owner, Role::Delivery];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "Client",
            Role::Owner => "Owner",
            Role::Delivery => "Delivery",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    /// Case-sensitive, matching the declared enumeration names exactly.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| AuthError::InvalidRole(s.to_string()))
    }
}

/// Role requirement declared for a protected operation.
///
/// Public operations have no requirement at all; they are represented by
/// the absence of a `RoleRequirement` (`None`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleRequirement {
    /// Any authenticated principal, whatever its role.
    Any,
    /// One of the listed roles. Never empty.
    Roles(BTreeSet<Role>),
}

impl RoleRequirement {
    pub fn any() -> Self {
        Self::Any
    }

    /// Build a requirement from an explicit role set.
    pub fn roles(roles: impl IntoIterator<Item = Role>) -> Result<Self, AuthError> {
        let roles: BTreeSet<Role> = roles.into_iter().collect();
        if roles.is_empty() {
            return Err(AuthError::EmptyRequirement);
        }
        Ok(Self::Roles(roles))
    }

    /// Shorthand for a requirement naming a single role.
    pub fn only(role: Role) -> Self {
        Self::Roles(BTreeSet::from([role]))
    }

    /// Whether a principal holding `role` satisfies this requirement.
    pub fn permits(&self, role: Role) -> bool {
        match self {
            Self::Any => true,
            Self::Roles(roles) => roles.contains(&role),
        }
    }
}

impl fmt::Display for RoleRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str(ANY_ROLE),
            Self::Roles(roles) => {
                let names: Vec<&str> = roles.iter().map(Role::as_str).collect();
                write!(f, "{}", names.join("|"))
            }
        }
    }
}
