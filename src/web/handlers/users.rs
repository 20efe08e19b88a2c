// Account management handlers.
//
// GET    /api/users                  — any authenticated user
// GET    /api/user/{id}              — superuser
// PATCH  /api/user/{id}              — superuser
// DELETE /api/user/{id}              — superuser
// PATCH  /api/change_superuser/{id}  — superuser, flips the stored flag
//
// Mutations answer with the full user list.

use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::auth::Principal;
use crate::db::models::UserView;
use crate::web::extract::{ApiJson, ApiPath};
use crate::web::{ApiError, AppState};

#[derive(Deserialize)]
pub struct UpdateUserRequest {
    pub username: String,
    pub email: String,
}

pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserView>>, ApiError> {
    Ok(Json(state.directory.list().await?))
}

pub async fn get_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<UserView>, ApiError> {
    principal.require_superuser()?;
    Ok(Json(state.directory.get(id).await?))
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<i64>,
    body: Result<ApiJson<UpdateUserRequest>, ApiError>,
) -> Result<Json<Vec<UserView>>, ApiError> {
    // Role first, so a non-superuser gets 403 whatever the body looks like.
    principal.require_superuser()?;
    let ApiJson(body) = body?;
    Ok(Json(
        state.directory.update(id, &body.username, &body.email).await?,
    ))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<UserView>>, ApiError> {
    principal.require_superuser()?;
    Ok(Json(state.directory.delete(id).await?))
}

/// Any request body is ignored; the flag is toggled, not set.
pub async fn change_superuser(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<UserView>>, ApiError> {
    principal.require_superuser()?;
    Ok(Json(state.directory.toggle_superuser(id).await?))
}
