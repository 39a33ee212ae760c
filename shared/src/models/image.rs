//! Image metadata models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored image and the objects detected in it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageRecord {
    pub id: i64,
    pub label: String,
    /// Remote location of the image, never set together with `content`
    pub source_url: Option<String>,
    /// Raw uploaded bytes, base64 encoded on the wire
    #[serde(with = "base64_bytes")]
    pub content: Option<Vec<u8>>,
    /// Tags reported by the tagging provider, in provider order
    pub detected_objects: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Where the pixels of a new image come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Url(String),
    Content(Vec<u8>),
}

impl ImageSource {
    pub fn kind(&self) -> &'static str {
        match self {
            ImageSource::Url(_) => "url",
            ImageSource::Content(_) => "content",
        }
    }

    /// Split into the `(source_url, content)` column pair
    pub fn into_columns(self) -> (Option<String>, Option<Vec<u8>>) {
        match self {
            ImageSource::Url(url) => (Some(url), None),
            ImageSource::Content(bytes) => (None, Some(bytes)),
        }
    }
}

/// An image that has been validated and tagged but not yet persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewImage {
    pub label: String,
    pub source: ImageSource,
    pub detected_objects: Vec<String>,
}

impl NewImage {
    pub fn new(label: impl Into<String>, source: ImageSource) -> Self {
        Self {
            label: label.into(),
            source,
            detected_objects: Vec::new(),
        }
    }

    /// Append provider tags, keeping duplicates and order
    pub fn add_detected_objects<I>(&mut self, tags: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.detected_objects.extend(tags);
    }
}

/// Raw upload request as received from a multipart form
#[derive(Debug, Clone, Default)]
pub struct UploadImageInput {
    pub label: Option<String>,
    pub detect_objects: bool,
    pub url: Option<String>,
    pub file: Option<Vec<u8>>,
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(bytes) => serializer.serialize_some(&BASE64.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|encoded| BASE64.decode(encoded).map_err(serde::de::Error::custom))
            .transpose()
    }
}
