use chrono::{DateTime, Utc};
use gurukul_core::model::{LessonDocument, LessonId};

use super::SqliteRepository;
use super::mapping::{map_lesson_row, ser};
use crate::repository::{LessonRepository, StorageError};

#[async_trait::async_trait]
impl LessonRepository for SqliteRepository {
    async fn upsert_lesson(
        &self,
        lesson: &LessonDocument,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let document = lesson.to_json().map_err(ser)?;

        sqlx::query(
            r"
            INSERT INTO lessons (id, title, document, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                document = excluded.document,
                updated_at = excluded.updated_at
            ",
        )
        .bind(lesson.id().as_str())
        .bind(lesson.title())
        .bind(document)
        .bind(updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        tracing::debug!(lesson_id = %lesson.id(), "stored lesson");
        Ok(())
    }

    async fn get_lesson(&self, id: &LessonId) -> Result<LessonDocument, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, title, document, updated_at
            FROM lessons WHERE id = ?1
            ",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => map_lesson_row(&row),
            None => Err(StorageError::NotFound),
        }
    }
}
