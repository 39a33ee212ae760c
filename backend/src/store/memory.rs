//! In-process image store

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use shared::{ImageRecord, NewImage, TagQuery};
use tokio::sync::RwLock;

use super::ImageStore;
use crate::error::AppResult;

/// Image store kept in memory; contents are lost on restart
#[derive(Default)]
pub struct MemoryImageStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    last_id: i64,
    images: BTreeMap<i64, ImageRecord>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn count(&self) -> usize {
        self.inner.read().await.images.len()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn find_all(&self) -> AppResult<Vec<ImageRecord>> {
        Ok(self.inner.read().await.images.values().cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<ImageRecord>> {
        Ok(self.inner.read().await.images.get(&id).cloned())
    }

    async fn find_by_any_detected_object(&self, tags: &TagQuery) -> AppResult<Vec<ImageRecord>> {
        let wanted = tags.to_set();
        Ok(self
            .inner
            .read()
            .await
            .images
            .values()
            .filter(|image| {
                image
                    .detected_objects
                    .iter()
                    .any(|tag| wanted.contains(tag.as_str()))
            })
            .cloned()
            .collect())
    }

    async fn save(&self, image: NewImage) -> AppResult<ImageRecord> {
        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        let (source_url, content) = image.source.into_columns();
        let record = ImageRecord {
            id: inner.last_id,
            label: image.label,
            source_url,
            content,
            detected_objects: image.detected_objects,
            created_at: Utc::now(),
        };
        inner.images.insert(record.id, record.clone());

        tracing::info!("Stored image {} ({})", record.id, record.label);
        Ok(record)
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::ImageSource;

    fn tagged(label: &str, tags: &[&str]) -> NewImage {
        let mut image = NewImage::new(label, ImageSource::Url(format!("http://img/{label}")));
        image.add_detected_objects(tags.iter().map(|t| t.to_string()));
        image
    }

    #[tokio::test]
    async fn test_ids_are_assigned_in_order() {
        let store = MemoryImageStore::new();
        let first = store.save(tagged("a", &[])).await.unwrap();
        let second = store.save(tagged("b", &[])).await.unwrap();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(store.count().await, 2);
    }

    #[tokio::test]
    async fn test_saved_record_round_trips() {
        let store = MemoryImageStore::new();
        let mut image = NewImage::new("raw", ImageSource::Content(vec![1, 2, 3]));
        image.add_detected_objects(vec!["dog".to_string(), "dog".to_string()]);
        let saved = store.save(image).await.unwrap();

        let fetched = store.find_by_id(saved.id).await.unwrap().unwrap();
        assert_eq!(fetched, saved);
        assert_eq!(fetched.label, "raw");
        assert_eq!(fetched.content, Some(vec![1, 2, 3]));
        assert_eq!(fetched.source_url, None);
        assert_eq!(fetched.detected_objects, vec!["dog", "dog"]);
    }

    #[tokio::test]
    async fn test_unknown_id_is_none() {
        let store = MemoryImageStore::new();
        assert!(store.find_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_any_tag_prefilter() {
        let store = MemoryImageStore::new();
        store.save(tagged("dog", &["dog"])).await.unwrap();
        store.save(tagged("tree", &["tree"])).await.unwrap();
        store.save(tagged("both", &["cat", "dog"])).await.unwrap();

        let found = store
            .find_by_any_detected_object(&TagQuery::from_tags(["dog", "cat"]))
            .await
            .unwrap();
        let labels: Vec<&str> = found.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(labels, vec!["dog", "both"]);
    }
}
