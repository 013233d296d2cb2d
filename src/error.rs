//! Typed errors and the command response mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing setting: {0}")]
    Missing(&'static str),
    #[error("invalid setting {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("shape mismatch: {fields} set fields but {values} set values")]
    ShapeMismatch { fields: usize, values: usize },
    #[error("incorrect number of golfers: {0} (expected 1, 2 or 4)")]
    InvalidParticipantCount(usize),
    #[error("invalid option code for {field}: '{code}'")]
    InvalidOptionCode { field: &'static str, code: String },
    #[error("not found: {0}")]
    NotFound(String),
    /// Statement failure, tagged with the pipeline stage that issued it.
    #[error("{stage}: {source}")]
    Store {
        stage: &'static str,
        source: sqlx::Error,
    },
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("validation: {0}")]
    Validation(String),
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Stable machine-readable kind, carried in every error body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "config_error",
            AppError::ShapeMismatch { .. } => "shape_mismatch",
            AppError::InvalidParticipantCount(_) => "invalid_participant_count",
            AppError::InvalidOptionCode { .. } => "invalid_option_code",
            AppError::NotFound(_) => "not_found",
            AppError::Store { .. } => "store_error",
            AppError::Db(sqlx::Error::RowNotFound) => "not_found",
            AppError::Db(_) => "database_error",
            AppError::Validation(_) => "validation_error",
            AppError::BadRequest(_) => "bad_request",
        }
    }
}

/// Attach a stage name to a store error, e.g. `.stage("shopping_cart")?`.
pub trait StageExt<T> {
    fn stage(self, stage: &'static str) -> Result<T, AppError>;
}

impl<T> StageExt<T> for Result<T, sqlx::Error> {
    fn stage(self, stage: &'static str) -> Result<T, AppError> {
        self.map_err(|source| AppError::Store { stage, source })
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Command callers read failures from the body; the transport status stays 200.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        tracing::warn!(code, error = %self, "command failed");
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };
        (StatusCode::OK, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_message_leads_with_stage() {
        let err: Result<(), _> = Err(sqlx::Error::RowNotFound);
        let err = err.stage("shopping_cart").unwrap_err();
        assert_eq!(err.code(), "store_error");
        assert!(err.to_string().starts_with("shopping_cart: "));
    }

    #[test]
    fn row_not_found_maps_to_not_found_code() {
        assert_eq!(AppError::Db(sqlx::Error::RowNotFound).code(), "not_found");
        assert_eq!(AppError::InvalidParticipantCount(3).code(), "invalid_participant_count");
    }

    #[tokio::test]
    async fn error_response_is_200_with_structured_body() {
        let resp = AppError::ShapeMismatch { fields: 2, values: 1 }.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "shape_mismatch");
        assert_eq!(body["error"].as_object().map(|o| o.len()), Some(2));
        assert_eq!(
            body["error"]["message"],
            "shape mismatch: 2 set fields but 1 set values"
        );
    }
}
