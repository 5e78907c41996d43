// REST API endpoints for the auth pipeline

use axum::{
    Extension, Router,
    body::Bytes,
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::accounts::{AccountError, AccountService, CreateAccountInput, LoginInput};
use crate::auth::{FORBIDDEN_MESSAGE, IdentityResolver, RequestContext};
use crate::operations::{DispatchError, InvalidArguments, OperationRegistry};


/// Shared, read-only state behind every request.
pub struct AppContext {
    pub resolver: IdentityResolver,
    pub accounts: Arc<AccountService>,
    pub operations: Arc<OperationRegistry>,
}

pub type AppState = Arc<AppContext>;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/accounts", post(create_account))
        .route("/login", post(login))
        .route("/me", get(me))
        .route("/operations/{name}", post(call_operation))
        .layer(middleware::from_fn_with_state(state.clone(), resolve_identity))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Resolve the caller once per request and attach the context.
///
/// Runs before any handler; never rejects.
async fn resolve_identity(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let ctx = state.resolver.resolve_headers(req.headers()).await;
    req.extensions_mut().insert(ctx);
    next.run(req).await
}

/// Error body shared by every endpoint: `{ ok: false, error }`.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "ok": false, "error": self.message })),
        )
            .into_response()
    }
}

impl From<DispatchError> for ApiError {
    fn from(e: DispatchError) -> Self {
        match e {
            DispatchError::Forbidden => Self {
                status: StatusCode::FORBIDDEN,
                message: FORBIDDEN_MESSAGE.to_string(),
            },
            DispatchError::Failed(e) => {
                let status = if e.downcast_ref::<InvalidArguments>().is_some() {
                    StatusCode::BAD_REQUEST
                } else if let Some(account) = e.downcast_ref::<AccountError>() {
                    account_status(account)
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                if status.is_server_error() {
                    tracing::warn!("Operation failed: {:#}", e);
                }
                Self {
                    status,
                    message: e.to_string(),
                }
            }
        }
    }
}

/// Hashing and signing failures are ours; the rest are the caller's.
fn account_status(e: &AccountError) -> StatusCode {
    match e {
        AccountError::Auth(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}

impl From<AccountError> for ApiError {
    fn from(e: AccountError) -> Self {
        Self {
            status: account_status(&e),
            message: e.to_string(),
        }
    }
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn create_account(
    State(state): State<AppState>,
    Json(input): Json<CreateAccountInput>,
) -> Result<Json<Value>, ApiError> {
    let created = state.accounts.create_account(input).await?;
    Ok(Json(json!({
        "ok": true,
        "id": created.id,
        "verification_code": created.verification_code,
    })))
}

async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> Result<Json<Value>, ApiError> {
    let token = state.accounts.login(input).await?;
    Ok(Json(json!({ "ok": true, "token": token })))
}

async fn me(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Json<Value>, ApiError> {
    let user = state.operations.call("me", Value::Null, &ctx).await?;
    Ok(Json(json!({ "ok": true, "user": user })))
}

async fn call_operation(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Extension(ctx): Extension<RequestContext>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let args = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError {
            status: StatusCode::BAD_REQUEST,
            message: format!("Invalid arguments: {}", e),
        })?
    };
    let result = state.operations.call(&name, args, &ctx).await?;
    Ok(Json(json!({ "ok": true, "result": result })))
}
