//! Response envelopes of the image tagging provider
//!
//! Every provider response is wrapped as `{"status": {...}, "result": {...}}`.
//! The models here are deliberately lenient: missing or oddly typed fields
//! decode to `None` so a partial envelope never aborts tag extraction.

use serde::{Deserialize, Deserializer};

/// Outcome reported in `status.type`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    Success,
    Error,
    #[serde(other)]
    Unknown,
}

/// The `status` object of an envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderStatus {
    #[serde(rename = "type")]
    pub kind: StatusKind,
    #[serde(default, deserialize_with = "lenient_string")]
    pub text: Option<String>,
}

impl ProviderStatus {
    pub fn is_success(&self) -> bool {
        self.kind == StatusKind::Success
    }
}

/// Response of `POST /uploads`
#[derive(Debug, Clone, Deserialize)]
pub struct UploadEnvelope {
    #[serde(default)]
    pub status: Option<ProviderStatus>,
    #[serde(default)]
    pub result: Option<UploadResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadResult {
    #[serde(default, deserialize_with = "lenient_string")]
    pub upload_id: Option<String>,
}

impl UploadEnvelope {
    /// The upload id, present only for a successful envelope
    pub fn into_upload_id(self) -> Option<String> {
        if !self.status.as_ref().is_some_and(ProviderStatus::is_success) {
            return None;
        }
        self.result.and_then(|result| result.upload_id)
    }

    /// Provider supplied explanation, if any
    pub fn status_text(&self) -> Option<&str> {
        self.status.as_ref().and_then(|s| s.text.as_deref())
    }
}

/// Response of `GET /tags`
#[derive(Debug, Clone, Deserialize)]
pub struct TagsEnvelope {
    #[serde(default)]
    pub status: Option<ProviderStatus>,
    #[serde(default)]
    pub result: Option<TagsResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagsResult {
    #[serde(default)]
    pub tags: Vec<TagEntry>,
}

/// One scored tag
#[derive(Debug, Clone, Deserialize)]
pub struct TagEntry {
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub tag: Option<LocalizedTag>,
}

/// Tag names keyed by language; only English is requested
#[derive(Debug, Clone, Deserialize)]
pub struct LocalizedTag {
    #[serde(default, deserialize_with = "lenient_string")]
    pub en: Option<String>,
}

impl TagsEnvelope {
    /// English tag names in provider order.
    ///
    /// Yields nothing unless the status is `success` and a result is present.
    pub fn into_tags(self) -> Vec<String> {
        if !self.status.as_ref().is_some_and(ProviderStatus::is_success) {
            return Vec::new();
        }
        let Some(result) = self.result else {
            return Vec::new();
        };
        result
            .tags
            .into_iter()
            .filter_map(|entry| entry.tag.and_then(|tag| tag.en))
            .collect()
    }
}

/// Decode a raw tags response body into tag names.
///
/// Never fails: an undecodable body yields an empty list.
pub fn parse_tags(body: &[u8]) -> Vec<String> {
    serde_json::from_slice::<TagsEnvelope>(body)
        .map(TagsEnvelope::into_tags)
        .unwrap_or_default()
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Some(s),
        _ => None,
    })
}
