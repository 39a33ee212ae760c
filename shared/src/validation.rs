//! Validation utilities for image uploads

use thiserror::Error;

use crate::models::{ImageSource, NewImage, UploadImageInput};

/// Longest source URL that can be stored
pub const MAX_SOURCE_URL_LEN: usize = 500;

/// Prefix of labels generated for unlabeled uploads
pub const DEFAULT_LABEL_PREFIX: &str = "image-";

/// Client input that cannot be turned into an image
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("A url or image file is required")]
    MissingSource,

    #[error("Both a url and image file were provided. Please provide only one of them.")]
    AmbiguousSource,

    #[error("The url must be at most {max} characters long")]
    UrlTooLong { max: usize },

    #[error("Invalid value for {field}: {value}")]
    InvalidFlag { field: String, value: String },
}

/// Pick the single source of an upload.
///
/// A blank url counts as absent. A file part counts as present even when
/// empty.
pub fn resolve_source(
    url: Option<String>,
    file: Option<Vec<u8>>,
) -> Result<ImageSource, ValidationError> {
    let url = url.filter(|u| !u.trim().is_empty());
    match (url, file) {
        (None, None) => Err(ValidationError::MissingSource),
        (Some(_), Some(_)) => Err(ValidationError::AmbiguousSource),
        (Some(url), None) => {
            if url.chars().count() > MAX_SOURCE_URL_LEN {
                return Err(ValidationError::UrlTooLong {
                    max: MAX_SOURCE_URL_LEN,
                });
            }
            Ok(ImageSource::Url(url))
        }
        (None, Some(bytes)) => Ok(ImageSource::Content(bytes)),
    }
}

/// Use the caller's label unless it is blank, else `image-<millis>`
pub fn resolve_label(label: Option<String>, now_millis: i64) -> String {
    match label {
        Some(label) if !label.trim().is_empty() => label,
        _ => format!("{DEFAULT_LABEL_PREFIX}{now_millis}"),
    }
}

/// Validate an upload and assemble the untagged image
pub fn prepare_upload(
    input: UploadImageInput,
    now_millis: i64,
) -> Result<NewImage, ValidationError> {
    let source = resolve_source(input.url, input.file)?;
    Ok(NewImage::new(resolve_label(input.label, now_millis), source))
}

/// Parse a form boolean (`true`/`false`, `yes`/`no`, `on`/`off`, `1`/`0`)
pub fn parse_bool_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}
