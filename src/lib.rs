// Core modules
mod config;
mod types;
pub mod accounts;
pub mod api;
pub mod auth;
pub mod operations;

// Re-export key types and functions
pub use config::{AuthSettings, SECRET_KEY_ENV, load_settings, load_settings_from, resolve_config_path};
pub use types::{AuthToken, OperationName, UserId, VerificationCode};

use std::sync::Arc;

use anyhow::Result;
use accounts::AccountService;
use api::{AppContext, AppState};
use auth::{Argon2Hasher, AuthError, IdentityResolver, TokenService};
use operations::{
    EditProfileHandler, MeHandler, OperationRegistry, PingHandler, RoleGateHandler,
    VerifyEmailHandler,
};

/// Register the built-in operations and their role declarations.
pub fn default_operations(accounts: Arc<AccountService>) -> Result<OperationRegistry, AuthError> {
    OperationRegistry::new()
        .register_handler(PingHandler)?
        .register_handler(MeHandler)?
        .register_handler(EditProfileHandler::new(accounts.clone()))?
        .register_handler(VerifyEmailHandler::new(accounts))?
        .register_handler(RoleGateHandler::owner_dashboard())?
        .register_handler(RoleGateHandler::delivery_queue())
}

/// Convenience function to wire the full pipeline from settings.
///
/// Builds the token service, credential hasher, account store, identity
/// resolver, and operation registry, and returns the shared API state.
pub fn create_state(settings: &AuthSettings) -> Result<AppState> {
    settings.validate()?;

    let tokens = Arc::new(TokenService::new(&settings.secret_key, settings.token_ttl()));
    let hasher = Arc::new(Argon2Hasher::new(settings.hash_cost)?);
    let accounts = Arc::new(AccountService::new(hasher, tokens.clone()));
    let resolver = IdentityResolver::new(tokens, accounts.clone(), &settings.token_header);
    let operations = Arc::new(default_operations(accounts.clone())?);

    Ok(Arc::new(AppContext {
        resolver,
        accounts,
        operations,
    }))
}
