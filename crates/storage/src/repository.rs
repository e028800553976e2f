use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gurukul_core::model::{LessonDocument, LessonId, StudentId};
use gurukul_core::student::StudentSummary;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape of a student's point record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRecord {
    pub id: StudentId,
    pub name: String,
    pub points: u32,
    pub updated_at: DateTime<Utc>,
}

impl StudentRecord {
    #[must_use]
    pub fn new(id: StudentId, name: impl Into<String>, points: u32, updated_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            points,
            updated_at,
        }
    }

    /// Summary with the level derived from the point total.
    #[must_use]
    pub fn summary(&self) -> StudentSummary {
        StudentSummary::new(self.id, self.name.clone(), self.points)
    }
}

/// Repository contract for lesson documents.
#[async_trait]
pub trait LessonRepository: Send + Sync {
    /// Persist or replace a lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lesson cannot be stored.
    async fn upsert_lesson(
        &self,
        lesson: &LessonDocument,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Fetch a lesson by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or `Serialization` if the stored
    /// document no longer validates.
    async fn get_lesson(&self, id: &LessonId) -> Result<LessonDocument, StorageError>;
}

/// Repository contract for student point records.
#[async_trait]
pub trait StudentRepository: Send + Sync {
    /// Persist or replace a student record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert_student(&self, record: &StudentRecord) -> Result<(), StorageError>;

    /// Fetch a student by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_student(&self, id: StudentId) -> Result<StudentRecord, StorageError>;

    /// Add points to a student and return the updated record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the student is missing, `Conflict` if the
    /// total would overflow.
    async fn add_points(
        &self,
        id: StudentId,
        amount: u32,
        updated_at: DateTime<Utc>,
    ) -> Result<StudentRecord, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    lessons: Arc<Mutex<HashMap<LessonId, LessonDocument>>>,
    students: Arc<Mutex<HashMap<StudentId, StudentRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LessonRepository for InMemoryRepository {
    async fn upsert_lesson(
        &self,
        lesson: &LessonDocument,
        _updated_at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .lessons
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(lesson.id().clone(), lesson.clone());
        Ok(())
    }

    async fn get_lesson(&self, id: &LessonId) -> Result<LessonDocument, StorageError> {
        let guard = self
            .lessons
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(id).cloned().ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl StudentRepository for InMemoryRepository {
    async fn upsert_student(&self, record: &StudentRecord) -> Result<(), StorageError> {
        let mut guard = self
            .students
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(record.id, record.clone());
        Ok(())
    }

    async fn get_student(&self, id: StudentId) -> Result<StudentRecord, StorageError> {
        let guard = self
            .students
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn add_points(
        &self,
        id: StudentId,
        amount: u32,
        updated_at: DateTime<Utc>,
    ) -> Result<StudentRecord, StorageError> {
        let mut guard = self
            .students
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let record = guard.get_mut(&id).ok_or(StorageError::NotFound)?;
        record.points = record
            .points
            .checked_add(amount)
            .ok_or(StorageError::Conflict)?;
        record.updated_at = updated_at;
        Ok(record.clone())
    }
}

/// Aggregates lesson and student repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub lessons: Arc<dyn LessonRepository>,
    pub students: Arc<dyn StudentRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let lessons: Arc<dyn LessonRepository> = Arc::new(repo.clone());
        let students: Arc<dyn StudentRepository> = Arc::new(repo);
        Self { lessons, students }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_lesson;
    use gurukul_core::time::fixed_now;

    #[tokio::test]
    async fn round_trips_lesson() {
        let repo = InMemoryRepository::new();
        let lesson = sample_lesson().unwrap();
        repo.upsert_lesson(&lesson, fixed_now()).await.unwrap();

        let fetched = repo.get_lesson(lesson.id()).await.unwrap();
        assert_eq!(fetched, lesson);

        let missing = LessonId::new("no-such-lesson").unwrap();
        assert!(matches!(
            repo.get_lesson(&missing).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn adds_points_to_existing_student() {
        let repo = InMemoryRepository::new();
        let id = StudentId::new(1);
        repo.upsert_student(&StudentRecord::new(id, "Asha", 190, fixed_now()))
            .await
            .unwrap();

        let updated = repo.add_points(id, 20, fixed_now()).await.unwrap();
        assert_eq!(updated.points, 210);
        assert_eq!(updated.summary().level, 2);

        assert!(matches!(
            repo.add_points(StudentId::new(9), 5, fixed_now()).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn rejects_point_overflow() {
        let repo = InMemoryRepository::new();
        let id = StudentId::new(1);
        repo.upsert_student(&StudentRecord::new(id, "Max", u32::MAX, fixed_now()))
            .await
            .unwrap();
        assert!(matches!(
            repo.add_points(id, 1, fixed_now()).await,
            Err(StorageError::Conflict)
        ));
    }
}
