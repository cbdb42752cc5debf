use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::api::state::AppState;

use super::handlers;

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn v1_router(state: &AppState) -> Router<AppState> {
    let upload_limit = state.config.extraction.max_upload_size + MULTIPART_OVERHEAD;

    let sessions = Router::new()
        .route("/", post(handlers::sessions::create_session))
        .route(
            "/{sessionId}",
            axum::routing::delete(handlers::sessions::delete_session),
        )
        .route(
            "/{sessionId}/documents/{kind}",
            post(handlers::documents::upload_document)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/{sessionId}/chats/{kind}",
            get(handlers::chats::get_chat)
                .post(handlers::chats::ask_question)
                .delete(handlers::chats::clear_chat),
        )
        .route(
            "/{sessionId}/chats/{kind}/export",
            get(handlers::chats::export_chat),
        );

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/sessions", sessions)
}
