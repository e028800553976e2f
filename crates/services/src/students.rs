use std::sync::Arc;

use gurukul_core::model::StudentId;
use gurukul_core::student::StudentSummary;
use storage::repository::{StorageError, StudentRecord, StudentRepository};

use crate::Clock;
use crate::error::PointsSyncError;

/// Student-record service: reads summaries and applies point awards.
#[derive(Clone)]
pub struct StudentService {
    clock: Clock,
    students: Arc<dyn StudentRepository>,
}

impl StudentService {
    #[must_use]
    pub fn new(clock: Clock, students: Arc<dyn StudentRepository>) -> Self {
        Self { clock, students }
    }

    /// Current summary, with the level derived from the point total.
    ///
    /// # Errors
    ///
    /// Returns `PointsSyncError::UnknownStudent` if the student does not exist.
    pub async fn summary(&self, id: StudentId) -> Result<StudentSummary, PointsSyncError> {
        self.students
            .get_student(id)
            .await
            .map(|record| record.summary())
            .map_err(|e| PointsSyncError::from_storage(id, e))
    }

    /// Add whole points to a student. The returned summary reflects the stored total.
    ///
    /// # Errors
    ///
    /// Returns `PointsSyncError` if the update is rejected; nothing changes in that case.
    pub async fn add_points(
        &self,
        id: StudentId,
        amount: u32,
    ) -> Result<StudentSummary, PointsSyncError> {
        let record = self
            .students
            .add_points(id, amount, self.clock.now())
            .await
            .map_err(|e| PointsSyncError::from_storage(id, e))?;
        tracing::info!(student_id = %id, points = amount, total = record.points, "points awarded");
        Ok(record.summary())
    }

    /// Create the student with zero points unless it already exists.
    ///
    /// # Errors
    ///
    /// Returns `PointsSyncError` on storage failures.
    pub async fn ensure_student(
        &self,
        id: StudentId,
        name: &str,
    ) -> Result<StudentSummary, PointsSyncError> {
        match self.students.get_student(id).await {
            Ok(record) => Ok(record.summary()),
            Err(StorageError::NotFound) => {
                let record = StudentRecord::new(id, name, 0, self.clock.now());
                self.students
                    .upsert_student(&record)
                    .await
                    .map_err(PointsSyncError::Storage)?;
                tracing::info!(student_id = %id, name, "created student");
                Ok(record.summary())
            }
            Err(other) => Err(PointsSyncError::Storage(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gurukul_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    fn service() -> StudentService {
        StudentService::new(fixed_clock(), Arc::new(InMemoryRepository::new()))
    }

    #[tokio::test]
    async fn ensure_student_is_idempotent() {
        let svc = service();
        let id = StudentId::new(1);
        let created = svc.ensure_student(id, "Arjun").await.unwrap();
        assert_eq!(created.points, 0);
        assert_eq!(created.level, 1);

        svc.add_points(id, 250).await.unwrap();
        let again = svc.ensure_student(id, "Someone else").await.unwrap();
        assert_eq!(again.name, "Arjun");
        assert_eq!(again.points, 250);
        assert_eq!(again.level, 2);
    }

    #[tokio::test]
    async fn unknown_student_is_reported() {
        let svc = service();
        let id = StudentId::new(3);
        assert!(matches!(
            svc.summary(id).await,
            Err(PointsSyncError::UnknownStudent(missing)) if missing == id
        ));
        assert!(matches!(
            svc.add_points(id, 10).await,
            Err(PointsSyncError::UnknownStudent(_))
        ));
    }
}
