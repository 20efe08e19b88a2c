// HTTP error taxonomy.
//
// Every handler returns `Result<_, ApiError>`; domain errors convert in via
// From so handlers can use `?` directly. Bodies are `{"error": message}`.

use axum::extract::multipart::MultipartError;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::error;

use super::api_error;
use super::upload::UploadError;
use crate::auth::{Forbidden, TokenError};
use crate::directory::DirectoryError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Internal errors keep surfacing their message to the client.
        let message = match &self {
            ApiError::Internal(e) => {
                error!(error = %format!("{e:#}"), "Request failed");
                format!("{e:#}")
            }
            other => other.to_string(),
        };

        let mut response = api_error(status, &message);
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound | DirectoryError::UnknownUsername(_) => {
                ApiError::NotFound(err.to_string())
            }
            DirectoryError::WrongPassword => ApiError::Unauthorized(err.to_string()),
            DirectoryError::UsernameTaken(_) => ApiError::Conflict(err.to_string()),
            DirectoryError::Invalid(msg) => ApiError::BadRequest(msg.to_string()),
            DirectoryError::Internal(e) => ApiError::Internal(e),
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        ApiError::Unauthorized(err.to_string())
    }
}

impl From<Forbidden> for ApiError {
    fn from(err: Forbidden) -> Self {
        ApiError::Forbidden(err.to_string())
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::UnsupportedExtension(_) | UploadError::MissingFileName => {
                ApiError::BadRequest(err.to_string())
            }
            UploadError::Io(e) => ApiError::Internal(anyhow::Error::new(e).context("Failed to store upload")),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(format!("Invalid form data: {}", err.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_error_mapping() {
        let cases = [
            (DirectoryError::NotFound, StatusCode::NOT_FOUND),
            (DirectoryError::UnknownUsername("x".into()), StatusCode::NOT_FOUND),
            (DirectoryError::WrongPassword, StatusCode::UNAUTHORIZED),
            (DirectoryError::UsernameTaken("x".into()), StatusCode::CONFLICT),
            (DirectoryError::Invalid("bad"), StatusCode::BAD_REQUEST),
            (
                DirectoryError::Internal(anyhow::anyhow!("disk full")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_token_and_role_errors() {
        assert_eq!(
            ApiError::from(TokenError::Expired).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::from(Forbidden).status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_unauthorized_sets_challenge_header() {
        let response = ApiError::Unauthorized("no".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
            "Bearer"
        );
    }

    #[test]
    fn test_upload_extension_is_bad_request() {
        let err = ApiError::from(UploadError::UnsupportedExtension("gif".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
