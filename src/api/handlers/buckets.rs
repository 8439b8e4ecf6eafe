use crate::AppState;
use crate::api::error::AppError;
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Deserialize, IntoParams, Validate)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct BucketQuery {
    #[validate(length(min = 3, max = 63, message = "Bucket names are 3 to 63 characters"))]
    pub bucket_name: String,
}

#[derive(Serialize, ToSchema)]
pub struct CreateBucketResponse {
    pub message: String,
    pub location: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckBucketResponse {
    pub bucket_name: String,
    pub found: bool,
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/s3/create",
    params(BucketQuery),
    responses(
        (status = 200, description = "Bucket created", body = CreateBucketResponse),
        (status = 400, description = "Invalid bucket name"),
        (status = 409, description = "Bucket already exists")
    ),
    tag = "buckets"
)]
pub async fn create_bucket(
    State(state): State<AppState>,
    Query(query): Query<BucketQuery>,
) -> Result<Json<CreateBucketResponse>, AppError> {
    query
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let location = state.buckets.create(&query.bucket_name).await?;

    Ok(Json(CreateBucketResponse {
        message: format!("Bucket created at location: {}", location),
        location,
    }))
}

#[utoipa::path(
    get,
    path = "/s3/check/{bucket_name}",
    params(("bucket_name" = String, Path, description = "Bucket to look up")),
    responses(
        (status = 200, description = "Lookup result", body = CheckBucketResponse),
        (status = 503, description = "Backend unreachable")
    ),
    tag = "buckets"
)]
pub async fn check_bucket(
    State(state): State<AppState>,
    Path(bucket_name): Path<String>,
) -> Result<Json<CheckBucketResponse>, AppError> {
    let found = state.buckets.exists(&bucket_name).await?;

    Ok(Json(CheckBucketResponse {
        message: if found {
            "Bucket found".to_string()
        } else {
            "Bucket not found".to_string()
        },
        bucket_name,
        found,
    }))
}

#[utoipa::path(
    get,
    path = "/s3/list",
    responses(
        (status = 200, description = "Bucket names", body = Vec<String>)
    ),
    tag = "buckets"
)]
pub async fn list_buckets(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.buckets.list().await?))
}
