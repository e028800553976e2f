use chrono::{DateTime, Utc};
use gurukul_core::model::StudentId;

use super::SqliteRepository;
use super::mapping::{map_student_row, student_id_to_i64};
use crate::repository::{StorageError, StudentRecord, StudentRepository};

#[async_trait::async_trait]
impl StudentRepository for SqliteRepository {
    async fn upsert_student(&self, record: &StudentRecord) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO students (id, name, points, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                points = excluded.points,
                updated_at = excluded.updated_at
            ",
        )
        .bind(student_id_to_i64(record.id)?)
        .bind(&record.name)
        .bind(i64::from(record.points))
        .bind(record.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_student(&self, id: StudentId) -> Result<StudentRecord, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, name, points, updated_at
            FROM students WHERE id = ?1
            ",
        )
        .bind(student_id_to_i64(id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => map_student_row(&row),
            None => Err(StorageError::NotFound),
        }
    }

    async fn add_points(
        &self,
        id: StudentId,
        amount: u32,
        updated_at: DateTime<Utc>,
    ) -> Result<StudentRecord, StorageError> {
        let raw_id = student_id_to_i64(id)?;
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let row = sqlx::query("SELECT id, name, points, updated_at FROM students WHERE id = ?1")
            .bind(raw_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .ok_or(StorageError::NotFound)?;
        let mut record = map_student_row(&row)?;
        record.points = record
            .points
            .checked_add(amount)
            .ok_or(StorageError::Conflict)?;
        record.updated_at = updated_at;

        sqlx::query("UPDATE students SET points = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(i64::from(record.points))
            .bind(record.updated_at)
            .bind(raw_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        tracing::debug!(student_id = %id, points = record.points, "student points updated");
        Ok(record)
    }
}
