//! HTTP handlers for image endpoints

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use serde::Deserialize;
use shared::{parse_bool_flag, ImageRecord, UploadImageInput, ValidationError};

use crate::error::{AppError, AppResult};
use crate::services::ImageService;
use crate::AppState;

/// Query parameters for listing images
#[derive(Debug, Deserialize)]
pub struct ListImagesParams {
    /// Comma separated tags an image must all carry
    pub objects: Option<String>,
}

/// List images, optionally only those containing every requested object
pub async fn list_images(
    State(state): State<AppState>,
    Query(params): Query<ListImagesParams>,
) -> AppResult<Json<Vec<ImageRecord>>> {
    let service = ImageService::new(state.store, state.tagger);
    let images = service.list_images(params.objects.as_deref()).await?;
    Ok(Json(images))
}

/// Get image by ID
pub async fn get_image(
    State(state): State<AppState>,
    Path(image_id): Path<i64>,
) -> AppResult<Json<ImageRecord>> {
    let service = ImageService::new(state.store, state.tagger);
    let image = service.get_image(image_id).await?;
    Ok(Json(image))
}

/// Upload an image by url or file, optionally detecting objects in it
pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<ImageRecord>> {
    let input = read_upload_form(multipart).await?;
    let service = ImageService::new(state.store, state.tagger);
    let image = service.upload_image(input).await?;
    Ok(Json(image))
}

/// Collect the `label`, `detectObjects`, `url` and `file` parts
async fn read_upload_form(mut multipart: Multipart) -> AppResult<UploadImageInput> {
    let mut input = UploadImageInput::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidMultipart(e.to_string()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "file" => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidMultipart(format!("file: {}", e)))?;
                input.file = Some(bytes.to_vec());
            }
            "label" | "detectObjects" | "url" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidMultipart(format!("{}: {}", name, e)))?;
                match name.as_str() {
                    "label" => input.label = Some(value),
                    "url" => input.url = Some(value),
                    _ => {
                        input.detect_objects = match parse_bool_flag(&value) {
                            Some(flag) => flag,
                            None if value.trim().is_empty() => false,
                            None => {
                                return Err(ValidationError::InvalidFlag {
                                    field: name.clone(),
                                    value,
                                }
                                .into())
                            }
                        };
                    }
                }
            }
            other => tracing::debug!("Ignoring unexpected form field '{}'", other),
        }
    }

    Ok(input)
}
