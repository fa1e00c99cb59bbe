use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use chemdocs_utils::{ChemdocsError, ErrorResponse};

/// Handler error: a [`ChemdocsError`] rendered as an [`ErrorResponse`] body.
#[derive(Debug)]
pub struct ApiError(pub ChemdocsError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<ChemdocsError> for ApiError {
    fn from(error: ChemdocsError) -> Self {
        Self(error)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast::<ChemdocsError>() {
            Ok(error) => Self(error),
            Err(error) => Self(ChemdocsError::internal(format!("{:#}", error))),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(code = self.0.error_code(), "{}", self.0);
        } else {
            tracing::debug!(code = self.0.error_code(), "{}", self.0);
        }

        (status, Json(ErrorResponse::from(self.0))).into_response()
    }
}
