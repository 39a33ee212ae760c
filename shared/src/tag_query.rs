//! Multi-tag search: query parsing and "contains-all" filtering

use std::collections::HashSet;

use crate::models::ImageRecord;

/// Tags requested by a search, parsed from a comma separated string.
///
/// Tokens are matched verbatim. Whitespace is not trimmed, so `"dog, cat"`
/// asks for `"dog"` and `" cat"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagQuery {
    tags: Vec<String>,
}

impl TagQuery {
    /// Parse a raw `objects` parameter.
    ///
    /// Returns `None` for a blank input. All `"` characters are removed
    /// before splitting on `,`. Trailing empty tokens are dropped; interior
    /// ones are kept. Input that is empty once unquoted (`""`) asks for the
    /// single empty tag.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            return None;
        }
        let unquoted = raw.replace('"', "");
        if unquoted.is_empty() {
            return Some(Self {
                tags: vec![String::new()],
            });
        }
        let mut tags: Vec<String> = unquoted.split(',').map(str::to_string).collect();
        while tags.last().is_some_and(String::is_empty) {
            tags.pop();
        }
        Some(Self { tags })
    }

    pub fn from_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Requested tags in input order, duplicates included
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn to_set(&self) -> HashSet<&str> {
        self.tags.iter().map(String::as_str).collect()
    }

    /// True when `detected` contains every requested tag
    pub fn is_satisfied_by(&self, detected: &[String]) -> bool {
        let available: HashSet<&str> = detected.iter().map(String::as_str).collect();
        self.tags.iter().all(|tag| available.contains(tag.as_str()))
    }
}

/// Keep only the images whose detected tags are a superset of the request.
///
/// Input order is preserved.
pub fn filter_superset(candidates: Vec<ImageRecord>, requested: &TagQuery) -> Vec<ImageRecord> {
    candidates
        .into_iter()
        .filter(|image| requested.is_satisfied_by(&image.detected_objects))
        .collect()
}
