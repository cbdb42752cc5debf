use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::services::UploadSummary;

/// Response for `POST /v1/sessions`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
}

/// Response for `DELETE /v1/sessions/{sessionId}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSessionResponse {
    pub session_id: String,
    pub deleted: bool,
}

/// Response for `POST /v1/sessions/{sessionId}/documents/{kind}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadDocumentResponse {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(flatten)]
    pub summary: UploadSummary,
}
