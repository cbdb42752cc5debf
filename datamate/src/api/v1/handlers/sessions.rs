use axum::extract::{Path, State};

use crate::api::state::AppState;
use crate::api::v1::dto::{CreateSessionResponse, DeleteSessionResponse};
use crate::api::v1::response::ApiResponse;

/// `POST /api/v1/sessions`
pub async fn create_session(State(state): State<AppState>) -> ApiResponse<CreateSessionResponse> {
    let session_id = match state.sessions.create() {
        Ok(id) => id,
        Err(e) => return e.into(),
    };

    match state.sessions.with_session(&session_id, |s| s.created_at) {
        Ok(created_at) => ApiResponse::created(CreateSessionResponse {
            session_id,
            created_at,
        }),
        Err(e) => e.into(),
    }
}

/// `DELETE /api/v1/sessions/{sessionId}`
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResponse<DeleteSessionResponse> {
    match state.sessions.remove(&session_id) {
        Ok(()) => {
            tracing::debug!(session_id = %session_id, "Session deleted");
            ApiResponse::success(DeleteSessionResponse {
                session_id,
                deleted: true,
            })
        }
        Err(e) => e.into(),
    }
}
