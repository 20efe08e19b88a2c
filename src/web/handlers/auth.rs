// Auth handlers.
//
// POST /api/login        — form username/password → bearer token
// POST /api/register     — create an account, returns the user list
// GET  /api/verify_token — echo the claims of the presented token

use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::auth::Claims;
use crate::db::models::UserView;
use crate::directory::LoginSuccess;
use crate::web::extract::{ApiForm, ApiJson};
use crate::web::{ApiError, AppState};

#[derive(Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub is_superuser: bool,
}

/// POST /api/login
///
/// 404 for an unknown username, 401 for a wrong password.
pub async fn login(
    State(state): State<AppState>,
    ApiForm(form): ApiForm<LoginForm>,
) -> Result<Json<LoginSuccess>, ApiError> {
    let success = state
        .directory
        .login(&form.username, &form.password, &state.tokens)
        .await?;
    Ok(Json(success))
}

/// POST /api/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<Json<Vec<UserView>>, ApiError> {
    let users = state
        .directory
        .create(&body.username, &body.email, &body.password, body.is_superuser)
        .await?;
    Ok(Json(users))
}

/// GET /api/verify_token
pub async fn verify_token(Extension(claims): Extension<Claims>) -> Json<Claims> {
    Json(claims)
}
