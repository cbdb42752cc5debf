//! Chat endpoints: ask, history, clear and export, one conversation per
//! session and document kind.

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use validator::Validate;

use crate::api::state::AppState;
use crate::api::v1::dto::{
    AskRequest, AskResponse, ChatHistoryResponse, ClearChatResponse, ExportQuery,
};
use crate::api::v1::response::{ApiResponse, ErrorCode};

use super::parse_kind;

/// `GET /api/v1/sessions/{sessionId}/chats/{kind}`
pub async fn get_chat(
    State(state): State<AppState>,
    Path((session_id, kind)): Path<(String, String)>,
) -> ApiResponse<ChatHistoryResponse> {
    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(resp) => return resp,
    };

    match state.chat.history(&session_id, kind) {
        Ok(history) => ApiResponse::success(history.into()),
        Err(e) => e.into(),
    }
}

/// `POST /api/v1/sessions/{sessionId}/chats/{kind}`
///
/// A failed answer still returns 200 with `failed: true`; the conversation
/// already holds the error text.
pub async fn ask_question(
    State(state): State<AppState>,
    Path((session_id, kind)): Path<(String, String)>,
    Json(req): Json<AskRequest>,
) -> ApiResponse<AskResponse> {
    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(resp) => return resp,
    };

    if let Err(e) = req.validate() {
        return ApiResponse::error(ErrorCode::InvalidRequest, format!("Invalid question: {e}"));
    }

    match state.chat.ask(&session_id, kind, &req.question).await {
        Ok(outcome) => ApiResponse::success(outcome.into()),
        Err(e) => e.into(),
    }
}

/// `DELETE /api/v1/sessions/{sessionId}/chats/{kind}`
pub async fn clear_chat(
    State(state): State<AppState>,
    Path((session_id, kind)): Path<(String, String)>,
) -> ApiResponse<ClearChatResponse> {
    let kind = match parse_kind(&kind) {
        Ok(kind) => kind,
        Err(resp) => return resp,
    };

    match state.chat.clear(&session_id, kind) {
        Ok(()) => ApiResponse::success(ClearChatResponse {
            kind,
            cleared: true,
        }),
        Err(e) => e.into(),
    }
}

/// `GET /api/v1/sessions/{sessionId}/chats/{kind}/export?format=txt|csv`
///
/// Responds with the file itself rather than the JSON envelope. Errors
/// still use the envelope.
pub async fn export_chat(
    State(state): State<AppState>,
    Path((session_id, kind)): Path<(String, String)>,
    Query(query): Query<ExportQuery>,
) -> Response {
    let kind = match parse_kind::<()>(&kind) {
        Ok(kind) => kind,
        Err(resp) => return resp.into_response(),
    };
    let format = match query.parse_format() {
        Ok(format) => format,
        Err(msg) => {
            return ApiResponse::<()>::error(ErrorCode::InvalidRequest, msg).into_response();
        }
    };

    match state.chat.export(&session_id, kind, format) {
        Ok(artifact) => (
            [
                (header::CONTENT_TYPE, artifact.mime.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", artifact.file_name),
                ),
            ],
            artifact.content,
        )
            .into_response(),
        Err(e) => ApiResponse::<()>::from(e).into_response(),
    }
}
