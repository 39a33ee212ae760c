//! Persistence of image records

mod memory;
mod postgres;

use async_trait::async_trait;
use shared::{ImageRecord, NewImage, TagQuery};

use crate::error::AppResult;

pub use memory::MemoryImageStore;
pub use postgres::PgImageStore;

/// Storage for image records.
///
/// Listings are ordered by id.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Every stored image
    async fn find_all(&self) -> AppResult<Vec<ImageRecord>>;

    /// Image with the given id
    async fn find_by_id(&self, id: i64) -> AppResult<Option<ImageRecord>>;

    /// Images having at least one of the requested tags
    async fn find_by_any_detected_object(&self, tags: &TagQuery) -> AppResult<Vec<ImageRecord>>;

    /// Persist a new image and assign its id
    async fn save(&self, image: NewImage) -> AppResult<ImageRecord>;

    /// Check that the backing storage is reachable
    async fn ping(&self) -> AppResult<()>;
}
