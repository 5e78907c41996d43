//! Operation registry.
//!
//! Provides an `OperationHandler` trait for implementing operations and an
//! `OperationRegistry` that records each handler's role requirement at
//! registration time and enforces it on every call.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::auth::{AuthError, RequestContext, RoleRegistry, RoleRequirement, authorize};

/// Boxed future returned by [`OperationHandler::execute`].
pub type OperationFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<Value>> + Send + 'a>>;

/// Trait for dispatchable operations.
pub trait OperationHandler: Send + Sync {
    /// Returns the operation's name (e.g., "createRestaurant").
    fn name(&self) -> &str;

    /// Returns the operation's description.
    fn description(&self) -> &str {
        ""
    }

    /// Role requirement declared for this operation. `None` is public.
    fn requirement(&self) -> Option<RoleRequirement> {
        None
    }

    /// Runs the operation body. Only called after access was allowed.
    fn execute<'a>(&'a self, args: Value, ctx: &'a RequestContext) -> OperationFuture<'a>;
}

/// Errors from [`OperationRegistry::call`].
#[derive(Debug)]
pub enum DispatchError {
    /// Denied, or no such operation. Callers cannot tell which.
    Forbidden,
    /// The operation body failed
    Failed(anyhow::Error),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forbidden => write!(f, "{}", AuthError::Forbidden),
            Self::Failed(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for DispatchError {}

/// Arguments an operation could not accept. Caller error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidArguments(pub String);

impl fmt::Display for InvalidArguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid arguments: {}", self.0)
    }
}

impl std::error::Error for InvalidArguments {}

/// Deserialize operation arguments; `null` means all defaults.
pub fn parse_args<T: DeserializeOwned + Default>(args: Value) -> anyhow::Result<T> {
    if args.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(args).map_err(|e| InvalidArguments(e.to_string()).into())
}

impl From<AuthError> for DispatchError {
    fn from(_: AuthError) -> Self {
        Self::Forbidden
    }
}

/// Registry of operation handlers and their role declarations.
#[derive(Clone, Default)]
pub struct OperationRegistry {
    handlers: HashMap<String, Arc<dyn OperationHandler>>,
    roles: RoleRegistry,
}

impl OperationRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, declaring its role requirement.
    ///
    /// Fails if an operation with the same name already exists.
    pub fn register(mut self, handler: Arc<dyn OperationHandler>) -> Result<Self, AuthError> {
        let name = handler.name().to_string();
        if self.handlers.contains_key(&name) {
            return Err(AuthError::DuplicateDeclaration(name.into()));
        }
        if let Some(requirement) = handler.requirement() {
            self.roles.insert(name.as_str(), requirement)?;
        }
        self.handlers.insert(name, handler);
        Ok(self)
    }

    /// Register a handler from a type that implements `OperationHandler`.
    pub fn register_handler<T: OperationHandler + 'static>(
        self,
        handler: T,
    ) -> Result<Self, AuthError> {
        self.register(Arc::new(handler))
    }

    /// Get a handler by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn OperationHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Role declarations of all registered operations.
    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    /// List all registered operation names.
    pub fn list_names(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    /// Decide access, then run the operation.
    ///
    /// The body never starts unless the decision is allow. Unknown
    /// operations are reported exactly like denied ones.
    pub async fn call(
        &self,
        name: &str,
        args: Value,
        ctx: &RequestContext,
    ) -> Result<Value, DispatchError> {
        authorize(ctx, &self.roles, name)?;
        let handler = self.get(name).ok_or(DispatchError::Forbidden)?;
        handler
            .execute(args, ctx)
            .await
            .map_err(DispatchError::Failed)
    }

    /// Check if an operation with the given name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
