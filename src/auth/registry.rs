//! Role declaration registry.
//!
//! Maps operation names to their declared [`RoleRequirement`]. Populated
//! while operations are wired up at startup and read-only afterwards.

use std::collections::HashMap;

use crate::auth::error::AuthError;
use crate::auth::role::RoleRequirement;
use crate::types::OperationName;

/// Registry of per-operation role requirements.
#[derive(Debug, Clone, Default)]
pub struct RoleRegistry {
    declarations: HashMap<OperationName, RoleRequirement>,
}

impl RoleRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the requirement for `operation` (builder style).
    pub fn declare(
        mut self,
        operation: impl Into<OperationName>,
        requirement: RoleRequirement,
    ) -> Result<Self, AuthError> {
        self.insert(operation, requirement)?;
        Ok(self)
    }

    /// Declare the requirement for `operation`.
    ///
    /// An operation can be declared at most once.
    pub fn insert(
        &mut self,
        operation: impl Into<OperationName>,
        requirement: RoleRequirement,
    ) -> Result<(), AuthError> {
        let operation = operation.into();
        if self.declarations.contains_key(&operation) {
            return Err(AuthError::DuplicateDeclaration(operation));
        }
        self.declarations.insert(operation, requirement);
        Ok(())
    }

    /// Requirement declared for `operation`; `None` means public.
    pub fn requirement(&self, operation: &str) -> Option<&RoleRequirement> {
        self.declarations.get(operation)
    }

    /// Check if `operation` has a declaration.
    pub fn is_declared(&self, operation: &str) -> bool {
        self.declarations.contains_key(operation)
    }

    /// List all declared operation names.
    pub fn operations(&self) -> Vec<&OperationName> {
        self.declarations.keys().collect()
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::role::Role;

    #[test]
    fn test_undeclared_operation_is_public() {
        let registry = RoleRegistry::new();
        assert!(registry.requirement("restaurants").is_none());
        assert!(!registry.is_declared("restaurants"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_declare_and_lookup() {
        let registry = RoleRegistry::new()
            .declare("createRestaurant", RoleRequirement::only(Role::Owner))
            .unwrap()
            .declare("me", RoleRequirement::Any)
            .unwrap();

        assert_eq!(
            registry.requirement("createRestaurant"),
            Some(&RoleRequirement::only(Role::Owner))
        );
        assert_eq!(registry.requirement("me"), Some(&RoleRequirement::Any));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_duplicate_declaration_rejected() {
        let result = RoleRegistry::new()
            .declare("editRestaurant", RoleRequirement::only(Role::Owner))
            .unwrap()
            .declare("editRestaurant", RoleRequirement::Any);

        assert_eq!(
            result.unwrap_err(),
            AuthError::DuplicateDeclaration(OperationName::new("editRestaurant"))
        );
    }

    #[test]
    fn test_failed_insert_keeps_first_declaration() {
        let mut registry = RoleRegistry::new();
        registry
            .insert("deleteRestaurant", RoleRequirement::only(Role::Owner))
            .unwrap();
        assert!(registry
            .insert("deleteRestaurant", RoleRequirement::Any)
            .is_err());

        assert_eq!(
            registry.requirement("deleteRestaurant"),
            Some(&RoleRequirement::only(Role::Owner))
        );
    }
}
