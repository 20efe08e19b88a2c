// Auth middleware — bearer token validation.
//
// Expects `Authorization: Bearer {token}`. A valid token puts its Claims and
// the caller's Principal into request extensions; anything else is a 401
// before the handler runs. Superuser checks happen in the handlers.

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::error::ApiError;
use super::AppState;
use crate::auth::TokenError;

/// Axum middleware: reject requests without a valid bearer token with 401.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let claims = match bearer_token(request.headers()).and_then(|t| state.tokens.resolve(t)) {
        Ok(claims) => claims,
        Err(e) => return ApiError::from(e).into_response(),
    };

    request.extensions_mut().insert(claims.principal.clone());
    request.extensions_mut().insert(claims);
    next.run(request).await
}

/// Pull the token out of the Authorization header. The scheme is matched
/// case-insensitively.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, TokenError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(TokenError::Missing)?
        .to_str()
        .map_err(|_| TokenError::Malformed)?;

    let (scheme, token) = value.trim().split_once(' ').ok_or(TokenError::Missing)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(TokenError::Missing);
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(TokenError::Missing);
    }
    Ok(token)
}
