//! Identity resolution for inbound requests.

use std::sync::Arc;

use http::HeaderMap;
use tracing::{debug, warn};

use crate::auth::context::RequestContext;
use crate::auth::token::TokenService;
use crate::auth::user_store::UserStore;

/// Default header carrying the identity token.
pub const DEFAULT_TOKEN_HEADER: &str = "x-jwt";

/// Binds an inbound token to a principal.
///
/// Never rejects a request: a missing, invalid, or stale token yields an
/// anonymous context, and enforcement is left to the access decision.
#[derive(Clone)]
pub struct IdentityResolver {
    tokens: Arc<TokenService>,
    users: Arc<dyn UserStore>,
    token_header: String,
}

impl IdentityResolver {
    /// Create a resolver that reads tokens from `token_header`.
    pub fn new(tokens: Arc<TokenService>, users: Arc<dyn UserStore>, token_header: &str) -> Self {
        Self {
            tokens,
            users,
            token_header: token_header.to_ascii_lowercase(),
        }
    }

    pub fn token_header(&self) -> &str {
        &self.token_header
    }

    /// Resolve a request context from HTTP headers.
    ///
    /// Reads the token header plus client metadata used for logging.
    pub async fn resolve_headers(&self, headers: &HeaderMap) -> RequestContext {
        // A header value that is not visible ASCII cannot be a token.
        let token = headers
            .get(self.token_header.as_str())
            .map(|v| v.to_str().unwrap_or_default());

        let ip_address = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string());
        let user_agent = headers
            .get(http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        self.resolve(token)
            .await
            .with_client_info(ip_address, user_agent)
    }

    /// Resolve a request context from a raw token.
    ///
    /// 1. No token: anonymous
    /// 2. Token fails verification: anonymous
    /// 3. Token subject missing from the store, or the store errors: anonymous
    /// 4. Otherwise the freshly loaded principal
    pub async fn resolve(&self, token: Option<&str>) -> RequestContext {
        let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
            debug!("No token presented, resolving anonymous");
            return RequestContext::anonymous();
        };

        let claim = match self.tokens.verify(token) {
            Ok(claim) => claim,
            Err(_) => {
                debug!("Token rejected, resolving anonymous");
                return RequestContext::anonymous();
            }
        };

        match self.users.find_by_id(claim.id).await {
            Ok(Some(principal)) => {
                debug!(
                    user_id = %principal.id(),
                    role = %principal.role(),
                    "Resolved principal"
                );
                RequestContext::authenticated(principal)
            }
            Ok(None) => {
                debug!(user_id = %claim.id, "Token subject no longer exists");
                RequestContext::anonymous()
            }
            Err(e) => {
                warn!(user_id = %claim.id, "User store lookup failed: {}", e);
                RequestContext::anonymous()
            }
        }
    }
}
