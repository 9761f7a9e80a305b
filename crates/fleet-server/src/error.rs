use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use application::QueryError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Query(#[from] QueryError),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Query(QueryError::NoGateways) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Query(QueryError::UnknownGateway(_)) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
