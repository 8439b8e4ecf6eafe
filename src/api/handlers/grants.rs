use crate::AppState;
use crate::api::error::AppError;
use crate::services::grants::GrantMethod;
use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GrantRequest {
    pub method: GrantMethod,
    #[validate(length(min = 3, max = 63, message = "Bucket names are 3 to 63 characters"))]
    pub bucket_name: String,
    #[validate(length(min = 1, max = 1024, message = "Keys are 1 to 1024 bytes"))]
    pub key: String,
    /// Lifetime of the URL; the configured default applies when omitted
    pub expiry_seconds: Option<u64>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GrantResponse {
    pub method: GrantMethod,
    pub bucket_name: String,
    pub key: String,
    pub url: String,
    pub expires_in_seconds: u64,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

#[utoipa::path(
    post,
    path = "/s3/grant",
    request_body = GrantRequest,
    responses(
        (status = 200, description = "Presigned URL issued", body = GrantResponse),
        (status = 400, description = "Invalid request or expiry rejected by the signer")
    ),
    tag = "grants"
)]
pub async fn issue_grant(
    State(state): State<AppState>,
    Json(req): Json<GrantRequest>,
) -> Result<Json<GrantResponse>, AppError> {
    req.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let expires_in = req
        .expiry_seconds
        .map(Duration::from_secs)
        .unwrap_or(state.config.default_grant_expiry);

    let grant = state
        .grants
        .issue(req.method, &req.bucket_name, &req.key, expires_in)
        .await?;

    Ok(Json(GrantResponse {
        expires_at: grant.expires_at(),
        method: grant.method,
        bucket_name: grant.bucket,
        key: grant.key,
        url: grant.url,
        expires_in_seconds: grant.expires_in.as_secs(),
        issued_at: grant.issued_at,
    }))
}
