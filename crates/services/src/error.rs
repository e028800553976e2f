//! Shared error types for the services crate.

use thiserror::Error;

use gurukul_core::ai_evaluation::AiEvaluationError;
use gurukul_core::model::{LessonError, LessonId, StudentId};
use gurukul_core::phase::PhaseError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// A lesson could not be loaded. Recoverable: the view shows an error and may retry.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContentError {
    #[error("lesson {0} not found")]
    NotFound(LessonId),
    #[error("content service request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Network(#[from] reqwest::Error),
    #[error(transparent)]
    InvalidLesson(#[from] LessonError),
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for ContentError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Serialization(msg) => {
                ContentError::InvalidLesson(LessonError::Malformed(msg))
            }
            other => ContentError::Storage(other),
        }
    }
}

/// The student-record service rejected or failed a read or points update.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PointsSyncError {
    #[error("student {0} not found")]
    UnknownStudent(StudentId),
    #[error(transparent)]
    Storage(StorageError),
}

impl PointsSyncError {
    pub(crate) fn from_storage(student: StudentId, err: StorageError) -> Self {
        match err {
            StorageError::NotFound => PointsSyncError::UnknownStudent(student),
            other => PointsSyncError::Storage(other),
        }
    }
}

/// Errors emitted by the generative-text client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TutorError {
    #[error("the AI tutor is not configured")]
    Disabled,
    #[error("the AI tutor returned an empty response")]
    EmptyResponse,
    #[error("AI tutor request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by lesson sessions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LessonSessionError {
    /// The view that asked for this result is gone; the result was discarded.
    #[error("lesson load was cancelled")]
    Stale,
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Lesson(#[from] LessonError),
    #[error(transparent)]
    Phase(#[from] PhaseError),
    #[error(transparent)]
    AiEvaluation(#[from] AiEvaluationError),
    #[error(transparent)]
    Points(#[from] PointsSyncError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Lesson(#[from] LessonError),
    #[error(transparent)]
    Points(#[from] PointsSyncError),
}
