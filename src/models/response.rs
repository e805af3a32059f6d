// src/models/response.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Uniform response envelope returned by every endpoint.
///
/// `success` is derived from the status code (`< 400`), so callers never
/// set it by hand.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub status_code: u16,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(status: StatusCode, message: impl Into<String>, data: T) -> Self {
        Self {
            success: status.as_u16() < 400,
            status_code: status.as_u16(),
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self::new(StatusCode::OK, message, data)
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self::new(StatusCode::CREATED, message, data)
    }
}

impl ApiResponse<()> {
    /// Envelope without a payload (`data: null`).
    pub fn message(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            success: status.as_u16() < 400,
            status_code: status.as_u16(),
            message: message.into(),
            data: None,
        }
    }

    pub fn error(status: StatusCode, message: impl Into<String>) -> Self {
        Self::message(status, message)
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_follows_status_code() {
        let ok = ApiResponse::ok("fine", 1);
        assert!(ok.success);
        assert_eq!(ok.status_code, 200);

        let err = ApiResponse::error(StatusCode::NOT_FOUND, "missing");
        assert!(!err.success);
        assert!(err.data.is_none());
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let value = serde_json::to_value(ApiResponse::created("made", "x")).unwrap();
        assert_eq!(value["statusCode"], 201);
        assert_eq!(value["success"], true);
        assert_eq!(value["message"], "made");
        assert_eq!(value["data"], "x");
    }
}
