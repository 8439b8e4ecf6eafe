use crate::AppState;
use crate::api::error::AppError;
use axum::{
    Json,
    extract::{Multipart, Query, State, multipart::MultipartError},
    http::StatusCode,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Multipart form accepted by `/s3/upload`.
#[derive(ToSchema, Validate)]
#[schema(rename_all = "camelCase")]
pub struct UploadForm {
    #[validate(length(min = 3, max = 63, message = "Bucket names are 3 to 63 characters"))]
    pub bucket_name: String,
    #[validate(length(min = 1, max = 1024, message = "Keys are 1 to 1024 bytes"))]
    pub key: String,
    #[schema(value_type = String, format = Binary)]
    pub file: Bytes,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub bucket_name: String,
    pub key: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

#[derive(Deserialize, IntoParams, Validate)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ObjectQuery {
    #[validate(length(min = 3, max = 63, message = "Bucket names are 3 to 63 characters"))]
    pub bucket_name: String,
    #[validate(length(min = 1, max = 1024, message = "Keys are 1 to 1024 bytes"))]
    pub key: String,
}

#[derive(Serialize, ToSchema)]
pub struct DownloadResponse {
    pub message: String,
    pub path: String,
    pub size: u64,
}

#[utoipa::path(
    post,
    path = "/s3/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Object stored", body = UploadResponse),
        (status = 400, description = "Missing or invalid form fields"),
        (status = 404, description = "Bucket not found"),
        (status = 413, description = "File exceeds the configured maximum size"),
        (status = 502, description = "Backend refused the upload")
    ),
    tag = "objects"
)]
pub async fn upload_object(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut bucket_name = None;
    let mut key = None;
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(multipart_error)?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "bucketName" => {
                bucket_name = Some(
                    field
                        .text()
                        .await
                        .map_err(multipart_error)?,
                )
            }
            "key" => {
                key = Some(
                    field
                        .text()
                        .await
                        .map_err(multipart_error)?,
                )
            }
            "file" => {
                let filename = field.file_name().unwrap_or("unnamed").to_string();
                let data = field.bytes().await.map_err(multipart_error)?;
                if data.len() > state.config.max_file_size {
                    return Err(AppError::PayloadTooLarge(format!(
                        "File exceeds the maximum size of {} bytes",
                        state.config.max_file_size
                    )));
                }
                file = Some((filename, data));
            }
            other => tracing::debug!("Ignoring unexpected form field '{}'", other),
        }
    }

    let (filename, data) =
        file.ok_or_else(|| AppError::BadRequest("Missing 'file' field".to_string()))?;
    let form = UploadForm {
        bucket_name: bucket_name
            .ok_or_else(|| AppError::BadRequest("Missing 'bucketName' field".to_string()))?,
        key: key.ok_or_else(|| AppError::BadRequest("Missing 'key' field".to_string()))?,
        file: data,
    };
    form.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let report = state
        .transfers
        .upload(&form.bucket_name, &form.key, &filename, &form.file)
        .await?;

    Ok(Json(UploadResponse {
        message: "File uploaded successfully".to_string(),
        bucket_name: report.bucket,
        key: report.key,
        size: report.size,
        warning: report.cleanup_warning,
    }))
}

fn multipart_error(err: MultipartError) -> AppError {
    let err_msg = err.body_text();
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE || err_msg.contains("length limit exceeded") {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        AppError::BadRequest(err_msg)
    }
}

#[utoipa::path(
    post,
    path = "/s3/download",
    params(ObjectQuery),
    responses(
        (status = 200, description = "Object written to the destination directory", body = DownloadResponse),
        (status = 400, description = "Key has no usable file name"),
        (status = 404, description = "Bucket or key not found"),
        (status = 500, description = "Destination directory could not be written")
    ),
    tag = "objects"
)]
pub async fn download_object(
    State(state): State<AppState>,
    Query(query): Query<ObjectQuery>,
) -> Result<Json<DownloadResponse>, AppError> {
    query
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let report = state
        .transfers
        .download(&query.bucket_name, &query.key)
        .await?;

    Ok(Json(DownloadResponse {
        message: "File downloaded successfully".to_string(),
        path: report.path.display().to_string(),
        size: report.size,
    }))
}
