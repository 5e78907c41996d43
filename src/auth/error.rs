//! Error types for the auth pipeline.

use std::fmt;

use crate::types::OperationName;

/// Message shown to callers for every denied operation.
pub const FORBIDDEN_MESSAGE: &str = "Forbidden resource";

/// Authentication and authorization errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Token is malformed, forged, or expired. Carries no reason.
    InvalidToken,
    /// Access denied. Same outcome for anonymous callers and wrong roles.
    Forbidden,
    /// Credential hashing failed; the enclosing write must be abandoned
    Hashing(String),
    /// Token could not be signed
    Signing(String),
    /// An operation was declared twice
    DuplicateDeclaration(OperationName),
    /// Unknown role name
    InvalidRole(String),
    /// A role requirement named no roles
    EmptyRequirement,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidToken => write!(f, "Invalid token"),
            Self::Forbidden => write!(f, "{}", FORBIDDEN_MESSAGE),
            Self::Hashing(msg) => write!(f, "Failed to hash credential: {}", msg),
            Self::Signing(msg) => write!(f, "Failed to sign token: {}", msg),
            Self::DuplicateDeclaration(op) => {
                write!(f, "Operation `{}` already has a role declaration", op)
            }
            Self::InvalidRole(name) => write!(f, "Unknown role: {}", name),
            Self::EmptyRequirement => write!(f, "Role requirement must name at least one role"),
        }
    }
}

impl std::error::Error for AuthError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_display() {
        assert_eq!(AuthError::InvalidToken.to_string(), "Invalid token");
        assert_eq!(AuthError::Forbidden.to_string(), "Forbidden resource");
        assert_eq!(
            AuthError::DuplicateDeclaration(OperationName::new("editRestaurant")).to_string(),
            "Operation `editRestaurant` already has a role declaration"
        );
        assert_eq!(
            AuthError::InvalidRole("Admin".to_string()).to_string(),
            "Unknown role: Admin"
        );
    }
}
