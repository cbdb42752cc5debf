//! # V1 API Response Envelope & Error Contract
//!
//! Every JSON endpoint returns an [`ApiResponse<T>`] envelope:
//!
//! ```json
//! {
//!   "data": { ... },       // present on success, absent on error
//!   "error": { "code": "not_found", "message": "..." }  // present on error
//! }
//! ```
//!
//! A failed answer from the chat model is *not* an error at this level: the
//! turn completed and the user-facing text is in `data.answer` with
//! `data.failed = true`.
//!
//! ## ID Formats
//!
//! - **sessionId**: nanoid, 21 characters (e.g. `"V1StGXR8_Z5jdHi6B-myT"`)
//! - **kind**: `spreadsheet`, `word` or `pdf` (`xlsx`, `excel` and `docx`
//!   are accepted as aliases)

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::DatamateError;

/// Machine-readable error code included in every error response.
///
/// Serialized as a snake_case string on the wire (e.g. `"invalid_request"`).
/// Each variant maps to a fixed HTTP status code via [`ErrorCode::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed request, unknown kind, blank question or nothing to export.
    /// HTTP 400.
    InvalidRequest,
    /// Unknown session, or no document uploaded for the kind. HTTP 404.
    NotFound,
    /// The file was accepted but nothing could be extracted from it. HTTP 422.
    Unprocessable,
    /// An unexpected server-side error occurred. Internal details are never
    /// leaked to the client. HTTP 500.
    InternalError,
    /// The answer service or OCR engine is not configured. HTTP 503.
    ServiceUnavailable,
}

impl ErrorCode {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unprocessable => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequest => write!(f, "invalid_request"),
            Self::NotFound => write!(f, "not_found"),
            Self::Unprocessable => write!(f, "unprocessable"),
            Self::InternalError => write!(f, "internal_error"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
        }
    }
}

/// Structured error payload within the API envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    /// Human-readable description safe to display to end users.
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,

    /// HTTP status to use in the response. Not serialized on the wire.
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    /// Success response with data (HTTP 200).
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            status: StatusCode::OK,
        }
    }

    /// Resource created response (HTTP 201).
    pub fn created(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            status: StatusCode::CREATED,
        }
    }

    /// Error response. HTTP status is derived from the [`ErrorCode`].
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        let status = code.status();
        Self {
            data: None,
            error: Some(ApiError {
                code,
                message: message.into(),
            }),
            status,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        match serde_json::to_value(&self) {
            Ok(body) => (status, Json(body)).into_response(),
            Err(_) => {
                let body = serde_json::json!({
                    "error": {
                        "code": "internal_error",
                        "message": "An internal error occurred"
                    }
                });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

impl<T: Serialize> From<DatamateError> for ApiResponse<T> {
    /// Internal error details are **never** leaked to the client. For
    /// `internal_error` responses a generic message is returned and the
    /// real error is logged via `tracing::error!`.
    fn from(err: DatamateError) -> Self {
        match err {
            DatamateError::NotFound(msg) => ApiResponse::error(ErrorCode::NotFound, msg),

            DatamateError::Validation(msg) => ApiResponse::error(ErrorCode::InvalidRequest, msg),

            DatamateError::Json(e) => {
                ApiResponse::error(ErrorCode::InvalidRequest, format!("Invalid JSON: {e}"))
            }

            ref empty @ DatamateError::EmptyExtraction(_) => {
                ApiResponse::error(ErrorCode::Unprocessable, empty.to_string())
            }

            DatamateError::Processing(msg) | DatamateError::Ocr(msg) => {
                ApiResponse::error(ErrorCode::Unprocessable, msg)
            }

            DatamateError::LlmUnavailable(msg) => ApiResponse::error(
                ErrorCode::ServiceUnavailable,
                format!("Answer service unavailable: {msg}"),
            ),

            DatamateError::OcrUnavailable(msg) => ApiResponse::error(
                ErrorCode::ServiceUnavailable,
                format!("OCR unavailable: {msg}"),
            ),

            ref internal @ (DatamateError::Http(_)
            | DatamateError::Csv(_)
            | DatamateError::Io(_)
            | DatamateError::Internal(_)
            | DatamateError::Llm { .. }) => {
                tracing::error!(error = %internal, "Internal error mapped to v1 response");
                ApiResponse::error(ErrorCode::InternalError, "An internal error occurred")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmErrorKind;

    #[test]
    fn success_response_serializes_without_error() {
        let resp = ApiResponse::success("hello");
        let json = serde_json::to_value(&resp).expect("serialize");
        assert_eq!(json["data"], "hello");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn error_response_serializes_without_data() {
        let resp = ApiResponse::<()>::error(ErrorCode::NotFound, "gone");
        let json = serde_json::to_value(&resp).expect("serialize");
        assert!(json.get("data").is_none());
        assert_eq!(json["error"]["code"], "not_found");
        assert_eq!(json["error"]["message"], "gone");
    }

    #[test]
    fn error_code_status_mapping() {
        assert_eq!(ErrorCode::InvalidRequest.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ErrorCode::Unprocessable.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ErrorCode::InternalError.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCode::ServiceUnavailable.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn error_code_serializes_snake_case() {
        let json = serde_json::to_value(&ErrorCode::ServiceUnavailable).expect("serialize");
        assert_eq!(json, "service_unavailable");
        assert_eq!(ErrorCode::Unprocessable.to_string(), "unprocessable");
    }

    #[test]
    fn created_response_has_201_status() {
        let resp = ApiResponse::created("new-session");
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    #[test]
    fn empty_extraction_maps_to_unprocessable() {
        let resp: ApiResponse<()> = DatamateError::EmptyExtraction("PDF".into()).into();
        let err = resp.error.as_ref().expect("error");
        assert_eq!(err.code, ErrorCode::Unprocessable);
        assert_eq!(err.message, "Could not extract any text from the PDF");
    }

    #[test]
    fn internal_errors_do_not_leak() {
        let resp: ApiResponse<()> = DatamateError::Internal("secret debug info".into()).into();
        let err = resp.error.as_ref().expect("error");
        assert_eq!(err.code, ErrorCode::InternalError);
        assert_eq!(err.message, "An internal error occurred");

        let resp: ApiResponse<()> =
            DatamateError::llm(LlmErrorKind::Transient, "upstream 502").into();
        assert_eq!(resp.error.expect("error").code, ErrorCode::InternalError);
    }

    #[test]
    fn unavailable_maps_to_503() {
        let resp: ApiResponse<()> = DatamateError::LlmUnavailable("no key".into()).into();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
