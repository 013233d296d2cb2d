//! Command response envelope helpers.

use axum::{http::StatusCode, Json};
use serde::Serialize;

/// Literal token returned by writes that produce no identifier.
pub const SUCCESS_TOKEN: &str = "success!";

#[derive(Serialize)]
pub struct SuccessOne<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

#[derive(Serialize)]
pub struct SuccessMany<T> {
    pub data: Vec<T>,
    pub meta: MetaCount,
}

#[derive(Serialize)]
pub struct MetaCount {
    pub count: u64,
}

pub fn success_token() -> (StatusCode, Json<SuccessOne<&'static str>>) {
    success_one(SUCCESS_TOKEN)
}

/// Generated identifiers travel as text.
pub fn success_id(id: impl ToString) -> (StatusCode, Json<SuccessOne<String>>) {
    success_one(id.to_string())
}

pub fn success_one<T: Serialize>(data: T) -> (StatusCode, Json<SuccessOne<T>>) {
    (
        StatusCode::OK,
        Json(SuccessOne {
            data,
            meta: None,
        }),
    )
}

pub fn success_many<T: Serialize>(data: Vec<T>) -> (StatusCode, Json<SuccessMany<T>>) {
    let count = data.len() as u64;
    (
        StatusCode::OK,
        Json(SuccessMany {
            data,
            meta: MetaCount { count },
        }),
    )
}
