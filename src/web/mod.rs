// Web server — Axum JSON API for accounts and bias neutralization.
//
// Everything lives under /api except the health check. Account creation and
// login are public; every other route goes through `auth::require_auth`.
// Superuser-only routes check the caller's Principal in the handler.
//
// Auth: stateless HMAC-SHA256 bearer tokens. No session table in the DB.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::TokenSigner;
use crate::bias::BiasClassifier;
use crate::directory::UserDirectory;
use crate::neutralize::Neutralizer;

pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod upload;

pub use error::ApiError;
pub use upload::UploadDir;

/// Request bodies above this size are rejected (image uploads included).
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Shared application state threaded through all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<UserDirectory>,
    pub tokens: Arc<TokenSigner>,
    pub classifier: Arc<dyn BiasClassifier>,
    pub neutralizer: Arc<Neutralizer>,
    pub uploads: Arc<UploadDir>,
}

/// Start the Axum web server and block until it exits.
pub async fn run_server(
    state: AppState,
    cors_origins: &[String],
    port: u16,
    bind: &str,
) -> Result<()> {
    let app = build_router(state, cors_origins);

    let addr = format!("{bind}:{port}");
    info!("Neutralizer API listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    // Authenticated API routes (require a valid bearer token)
    let protected_api = Router::new()
        .route("/users", get(handlers::users::list_users))
        .route(
            "/user/{id}",
            get(handlers::users::get_user)
                .patch(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        .route(
            "/change_superuser/{id}",
            patch(handlers::users::change_superuser),
        )
        .route("/verify_token", get(handlers::auth::verify_token))
        .route("/analyze/", post(handlers::analyze::analyze))
        .route("/gpt_analyze/", post(handlers::analyze::gpt_analyze))
        .route("/analyze_mult/", post(handlers::analyze::analyze_mult))
        .route("/reduce_bias", post(handlers::neutralize::reduce_bias))
        .route("/reduce_bias_txt", post(handlers::neutralize::reduce_bias_txt))
        .route("/multicon_GPT_ana", post(handlers::neutralize::multicon_gpt_ana))
        .route("/multicon_bias_ana", post(handlers::neutralize::multicon_bias_ana))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    // Public routes (no auth)
    let public_api = Router::new()
        .route("/login", post(handlers::auth::login))
        .route("/register", post(handlers::auth::register));

    Router::new()
        .nest("/api", protected_api.merge(public_api))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Liveness probe. Always returns 200 OK.
async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({ "status": "ok" })),
    )
}

/// Typed JSON error response helper.
pub fn api_error(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(serde_json::json!({ "error": message }))).into_response()
}
