//! Handlers for the signed-in user's own profile.

use std::sync::Arc;

use anyhow::Context;
use serde_json::{Value, json};

use crate::accounts::{AccountService, EditProfileInput};
use crate::auth::{RequestContext, RoleRequirement};
use crate::operations::{InvalidArguments, OperationFuture, OperationHandler, parse_args};

/// Handler for `me`: returns the caller's principal.
pub struct MeHandler;

impl OperationHandler for MeHandler {
    fn name(&self) -> &str {
        "me"
    }

    fn description(&self) -> &str {
        "Return the authenticated caller's profile."
    }

    fn requirement(&self) -> Option<RoleRequirement> {
        Some(RoleRequirement::Any)
    }

    fn execute<'a>(&'a self, _args: Value, ctx: &'a RequestContext) -> OperationFuture<'a> {
        Box::pin(async move {
            let principal = ctx
                .principal()
                .context("`me` reached without a principal")?;
            Ok(serde_json::to_value(principal)?)
        })
    }
}

/// Handler for `editProfile`: changes the caller's email and/or password.
pub struct EditProfileHandler {
    accounts: Arc<AccountService>,
}

impl EditProfileHandler {
    pub fn new(accounts: Arc<AccountService>) -> Self {
        Self { accounts }
    }
}

impl OperationHandler for EditProfileHandler {
    fn name(&self) -> &str {
        "editProfile"
    }

    fn description(&self) -> &str {
        "Update the caller's email and/or password."
    }

    fn requirement(&self) -> Option<RoleRequirement> {
        Some(RoleRequirement::Any)
    }

    fn execute<'a>(&'a self, args: Value, ctx: &'a RequestContext) -> OperationFuture<'a> {
        Box::pin(async move {
            let principal = ctx
                .principal()
                .context("`editProfile` reached without a principal")?;
            let input: EditProfileInput = parse_args(args)?;

            let code = self.accounts.edit_profile(principal.id(), input).await?;
            Ok(json!({
                "ok": true,
                "verification_code": code,
            }))
        })
    }
}

/// Handler for `verifyEmail`: consumes a verification code.
pub struct VerifyEmailHandler {
    accounts: Arc<AccountService>,
}

impl VerifyEmailHandler {
    pub fn new(accounts: Arc<AccountService>) -> Self {
        Self { accounts }
    }
}

impl OperationHandler for VerifyEmailHandler {
    fn name(&self) -> &str {
        "verifyEmail"
    }

    fn description(&self) -> &str {
        "Confirm an email address with its verification code."
    }

    fn execute<'a>(&'a self, args: Value, _ctx: &'a RequestContext) -> OperationFuture<'a> {
        Box::pin(async move {
            let code = args
                .get("code")
                .and_then(Value::as_str)
                .ok_or_else(|| InvalidArguments("missing `code`".to_string()))?;
            self.accounts.verify_email(code).await?;
            Ok(json!({ "ok": true }))
        })
    }
}
