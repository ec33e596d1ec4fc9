use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde_json::json;
use tracing::{debug, error};

pub type Error = anyhow::Error;
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type ApiResult<T, E = ApiError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Not authenticated: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            ApiError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> String {
        match self {
            ApiError::InvalidQuery(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::Conflict(msg) => msg.clone(),
            ApiError::ResourceNotFound(what) => format!("{what} not found"),
            ApiError::InternalError(_) => "Server error".to_string(),
        }
    }
}

impl From<bookrev_dal::Error> for ApiError {
    fn from(value: bookrev_dal::Error) -> Self {
        use bookrev_dal::Error;
        match value {
            Error::RecordNotFound(what) => ApiError::ResourceNotFound(what),
            Error::Conflict(msg) => ApiError::Conflict(msg),
            Error::NotOwner(what) => {
                ApiError::Forbidden(format!("You can change only your own {what}"))
            }
            Error::InvalidOrderByField(field) => {
                ApiError::InvalidQuery(format!("Cannot sort by {field}"))
            }
            Error::InvalidFilterField(field) => {
                ApiError::InvalidQuery(format!("Cannot filter by {field}"))
            }
            Error::InvalidCredentials => ApiError::Unauthorized("Invalid credentials".to_string()),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

impl From<bookrev_auth::Error> for ApiError {
    fn from(value: bookrev_auth::Error) -> Self {
        ApiError::InternalError(format!("Token error: {value}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {self}");
        } else {
            debug!("Request rejected ({status}): {self}");
        }
        (status, Json(json!({ "message": self.public_message() }))).into_response()
    }
}
