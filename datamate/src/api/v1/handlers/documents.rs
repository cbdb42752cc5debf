//! Document upload handler.
//!
//! The upload is processed synchronously: extraction (including OCR of
//! image-only PDF pages) finishes before the response is sent, and every
//! progress update is returned in the response body.

use axum::extract::{Multipart, Path, State};

use crate::api::state::AppState;
use crate::api::v1::dto::UploadDocumentResponse;
use crate::api::v1::response::{ApiResponse, ErrorCode};
use crate::models::ExtractionProgress;

use super::parse_kind;

/// `POST /api/v1/sessions/{sessionId}/documents/{kind}`
///
/// Accepts a multipart form with a `file` field. Replaces the session's
/// document of that kind; its chat history is kept.
pub async fn upload_document(
    State(state): State<AppState>,
    Path((session_id, kind)): Path<(String, String)>,
    mut multipart: Multipart,
) -> ApiResponse<UploadDocumentResponse> {
    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(resp) => return resp,
    };

    let mut file_bytes: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        file_name = field.file_name().map(str::to_string);

        match field.bytes().await {
            Ok(bytes) => file_bytes = Some(bytes.to_vec()),
            Err(e) => {
                return ApiResponse::error(
                    ErrorCode::InvalidRequest,
                    format!("Failed to read file: {e}"),
                );
            }
        }
    }

    let Some(bytes) = file_bytes else {
        return ApiResponse::error(ErrorCode::InvalidRequest, "Missing 'file' field");
    };

    tracing::info!(
        session_id = %session_id,
        kind = %kind,
        file_name = file_name.as_deref().unwrap_or(""),
        size = bytes.len(),
        "Document upload received"
    );

    let result = state
        .documents
        .upload(&session_id, kind, &bytes, &mut |update: ExtractionProgress| {
            tracing::debug!(
                percent = update.percent(),
                message = %update.message,
                "Extraction progress"
            );
        })
        .await;

    match result {
        Ok(summary) => ApiResponse::success(UploadDocumentResponse {
            session_id,
            file_name,
            summary,
        }),
        Err(e) => e.into(),
    }
}
