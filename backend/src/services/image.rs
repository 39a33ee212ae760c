//! Image upload, lookup and tag search

use std::sync::Arc;

use chrono::Utc;
use shared::{filter_superset, prepare_upload, ImageRecord, ImageSource, TagQuery, UploadImageInput};

use crate::error::{AppError, AppResult};
use crate::external::ImageTagger;
use crate::store::ImageStore;

/// Image service coordinating validation, tagging and storage
#[derive(Clone)]
pub struct ImageService {
    store: Arc<dyn ImageStore>,
    tagger: Arc<dyn ImageTagger>,
}

impl ImageService {
    /// Create a new ImageService instance
    pub fn new(store: Arc<dyn ImageStore>, tagger: Arc<dyn ImageTagger>) -> Self {
        Self { store, tagger }
    }

    /// Validate an upload, optionally tag it, then store it once.
    ///
    /// A tagging failure aborts the upload before anything is stored.
    pub async fn upload_image(&self, input: UploadImageInput) -> AppResult<ImageRecord> {
        let detect_objects = input.detect_objects;
        let mut image = prepare_upload(input, Utc::now().timestamp_millis())?;

        if detect_objects {
            let tags = self
                .tagger
                .detect_tags(&image.source)
                .await
                .map_err(|source| {
                    tracing::warn!(
                        "Tagging {} for '{}' failed: {}",
                        image.source.kind(),
                        image.label,
                        source
                    );
                    let message = match image.source {
                        ImageSource::Content(_) => "Error processing image file.",
                        ImageSource::Url(_) => "Error tagging image",
                    };
                    AppError::Processing { message, source }
                })?;
            tracing::debug!("Detected {} objects in '{}'", tags.len(), image.label);
            image.add_detected_objects(tags);
        }

        self.store.save(image).await
    }

    /// Get an image by id
    pub async fn get_image(&self, id: i64) -> AppResult<ImageRecord> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound { id })
    }

    /// List images, narrowed to those containing every tag in `objects`
    pub async fn list_images(&self, objects: Option<&str>) -> AppResult<Vec<ImageRecord>> {
        let query = match objects.and_then(TagQuery::parse) {
            Some(query) if !query.is_empty() => query,
            _ => return self.store.find_all().await,
        };

        let candidates = self.store.find_by_any_detected_object(&query).await?;
        Ok(filter_superset(candidates, &query))
    }
}
