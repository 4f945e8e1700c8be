use super::json_body;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::validation::{self, path_id, ValidationError};
use axum::{
    body::Bytes,
    extract::{
        multipart::MultipartRejection,
        rejection::JsonRejection,
        Multipart, Path, State,
    },
    http::StatusCode,
    Json,
};
use shared_http::api::{Document, NewDocument, RecordId};
use std::path::Path as FilePath;
use tracing::{debug, info};

/// GET /api/users/{user}/documents
pub async fn list_documents(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> ApiResult<Json<Vec<Document>>> {
    let user_id = path_id(&user)?;
    Ok(Json(state.storage.documents(user_id).await?))
}

/// POST /api/documents - Record a document whose file lives elsewhere
pub async fn create_document(
    State(state): State<AppState>,
    payload: Result<Json<NewDocument>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Document>)> {
    let document = json_body(payload)?;
    validation::document(&document)?;
    let document = state.storage.create_document(document).await?;
    Ok((StatusCode::CREATED, Json(document)))
}

/// POST /api/documents/upload - Multipart upload with `userId`, `tags` and `file`
pub async fn upload_document(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<Document>)> {
    let mut multipart = multipart?;
    let mut user_id: Option<RecordId> = None;
    let mut tags = Vec::new();
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("userId") => {
                let raw = field.text().await?;
                user_id = Some(path_id(raw.trim())?);
            }
            Some("tags") => {
                tags = split_tags(&field.text().await?);
            }
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await?;
                file = Some(UploadedFile {
                    file_name,
                    content_type,
                    data,
                });
            }
            other => debug!("Ignoring upload field {:?}", other),
        }
    }

    let user_id = user_id.ok_or(ValidationError::Missing("userId"))?;
    let file = file.ok_or(ValidationError::Missing("file"))?;

    let document = file.into_document(user_id, tags);
    validation::document(&document)?;
    let document = state.storage.create_document(document).await?;
    info!(
        "UPLOAD_DOCUMENT: id={}, name={}, size={}",
        document.id, document.name, document.size
    );
    Ok((StatusCode::CREATED, Json(document)))
}

/// DELETE /api/documents/{id}
pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = path_id(&id)?;
    if state.storage.delete_document(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Document not found".into()))
    }
}

struct UploadedFile {
    file_name: String,
    content_type: Option<String>,
    data: Bytes,
}

impl UploadedFile {
    fn into_document(self, user_id: RecordId, tags: Vec<String>) -> NewDocument {
        let kind = document_kind(&self.file_name, self.content_type.as_deref());
        let url = format!(
            "/uploads/{}-{}",
            uuid::Uuid::new_v4().simple(),
            self.file_name
        );
        NewDocument {
            user_id,
            name: self.file_name,
            kind,
            size: self.data.len() as u64,
            url,
            tags,
        }
    }
}

/// File extension if there is one, otherwise the declared content type.
fn document_kind(file_name: &str, content_type: Option<&str>) -> String {
    FilePath::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .or_else(|| content_type.map(str::to_string))
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}
