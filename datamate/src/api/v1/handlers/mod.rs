pub mod chats;
pub mod documents;
pub(crate) mod health;
pub mod sessions;

pub use health::health_check;

use serde::Serialize;

use crate::api::v1::response::{ApiResponse, ErrorCode};
use crate::models::DocumentKind;

/// Parses the `{kind}` path segment.
pub(crate) fn parse_kind<T: Serialize>(raw: &str) -> Result<DocumentKind, ApiResponse<T>> {
    raw.parse()
        .map_err(|msg: String| ApiResponse::error(ErrorCode::InvalidRequest, msg))
}
