//! PostgreSQL image store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{ImageRecord, NewImage, TagQuery};
use sqlx::PgPool;

use super::ImageStore;
use crate::error::AppResult;

/// Image store backed by the `images` table
#[derive(Clone)]
pub struct PgImageStore {
    db: PgPool,
}

/// Database row for an image
#[derive(Debug, sqlx::FromRow)]
struct ImageRow {
    id: i64,
    label: String,
    source_url: Option<String>,
    content: Option<Vec<u8>>,
    detected_objects: Vec<String>,
    created_at: DateTime<Utc>,
}

impl From<ImageRow> for ImageRecord {
    fn from(row: ImageRow) -> Self {
        ImageRecord {
            id: row.id,
            label: row.label,
            source_url: row.source_url,
            content: row.content,
            detected_objects: row.detected_objects,
            created_at: row.created_at,
        }
    }
}

impl PgImageStore {
    /// Create a new PgImageStore instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ImageStore for PgImageStore {
    async fn find_all(&self) -> AppResult<Vec<ImageRecord>> {
        let rows = sqlx::query_as::<_, ImageRow>(
            r#"
            SELECT id, label, source_url, content, detected_objects, created_at
            FROM images
            ORDER BY id
            "#,
        )
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<ImageRecord>> {
        let row = sqlx::query_as::<_, ImageRow>(
            r#"
            SELECT id, label, source_url, content, detected_objects, created_at
            FROM images
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn find_by_any_detected_object(&self, tags: &TagQuery) -> AppResult<Vec<ImageRecord>> {
        let rows = sqlx::query_as::<_, ImageRow>(
            r#"
            SELECT id, label, source_url, content, detected_objects, created_at
            FROM images
            WHERE detected_objects && $1::text[]
            ORDER BY id
            "#,
        )
        .bind(tags.tags().to_vec())
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn save(&self, image: NewImage) -> AppResult<ImageRecord> {
        let (source_url, content) = image.source.into_columns();

        let row = sqlx::query_as::<_, ImageRow>(
            r#"
            INSERT INTO images (label, source_url, content, detected_objects)
            VALUES ($1, $2, $3, $4)
            RETURNING id, label, source_url, content, detected_objects, created_at
            "#,
        )
        .bind(image.label)
        .bind(source_url)
        .bind(content)
        .bind(image.detected_objects)
        .fetch_one(&self.db)
        .await?;

        tracing::info!("Stored image {} ({})", row.id, row.label);
        Ok(row.into())
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }
}
