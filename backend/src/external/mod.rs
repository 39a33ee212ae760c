//! External API integrations

pub mod imagga;

use async_trait::async_trait;
use shared::ImageSource;
use thiserror::Error;

pub use imagga::ImaggaClient;

/// Failure while asking the provider for tags
#[derive(Debug, Error)]
pub enum TaggingError {
    #[error("upload to tagging provider failed: {0}")]
    UploadFailed(String),

    #[error("tag query failed: {0}")]
    QueryFailed(String),

    #[error("could not stage image bytes: {0}")]
    Staging(#[from] std::io::Error),
}

/// Detects objects in an image
#[async_trait]
pub trait ImageTagger: Send + Sync {
    /// Tags for the image, uploading `Content` first and querying `Url` directly
    async fn detect_tags(&self, source: &ImageSource) -> Result<Vec<String>, TaggingError>;
}
