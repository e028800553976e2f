use std::sync::Arc;

use gurukul_core::model::{LessonDocument, StudentId};
use gurukul_core::student::StudentSummary;
use storage::fixtures::{DEMO_STUDENT_NAME, sample_lesson};
use storage::repository::{LessonRepository, Storage};

use crate::Clock;
use crate::config::AppConfig;
use crate::content::{ContentApiClient, LessonSource, RepositoryLessonSource};
use crate::error::AppServicesError;
use crate::lesson_session::LessonSessionService;
use crate::notifications::{NotificationCenter, NotificationSink};
use crate::students::StudentService;
use crate::tutor::TutorClient;

/// Assembles app-facing services from configuration.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    student_id: StudentId,
    lessons: Arc<dyn LessonRepository>,
    lesson_sessions: Arc<LessonSessionService>,
    students: Arc<StudentService>,
    notifications: Arc<NotificationCenter>,
    tutor: Arc<TutorClient>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// Lessons come from the content service when `content_url` is configured,
    /// otherwise from the database.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(config: &AppConfig, clock: Clock) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(&config.db_url).await?;
        Ok(Self::from_storage(storage, config, clock))
    }

    /// Build services on top of an existing storage backend.
    #[must_use]
    pub fn from_storage(storage: Storage, config: &AppConfig, clock: Clock) -> Self {
        let source: Arc<dyn LessonSource> = match &config.content_url {
            Some(url) => {
                tracing::info!(%url, "loading lessons from the content service");
                Arc::new(ContentApiClient::new(url.clone()))
            }
            None => Arc::new(RepositoryLessonSource::new(Arc::clone(&storage.lessons))),
        };
        let students = Arc::new(StudentService::new(clock, Arc::clone(&storage.students)));
        let notifications = Arc::new(NotificationCenter::new(clock));
        let sink: Arc<dyn NotificationSink> = notifications.clone();
        let lesson_sessions = Arc::new(LessonSessionService::new(
            source,
            (*students).clone(),
            sink,
            config.student_id,
        ));
        let tutor = Arc::new(TutorClient::new(config.tutor.clone()));

        Self {
            clock,
            student_id: config.student_id,
            lessons: storage.lessons,
            lesson_sessions,
            students,
            notifications,
            tutor,
        }
    }

    #[must_use]
    pub fn student_id(&self) -> StudentId {
        self.student_id
    }

    #[must_use]
    pub fn lesson_sessions(&self) -> Arc<LessonSessionService> {
        Arc::clone(&self.lesson_sessions)
    }

    #[must_use]
    pub fn students(&self) -> Arc<StudentService> {
        Arc::clone(&self.students)
    }

    #[must_use]
    pub fn notifications(&self) -> Arc<NotificationCenter> {
        Arc::clone(&self.notifications)
    }

    #[must_use]
    pub fn tutor(&self) -> Arc<TutorClient> {
        Arc::clone(&self.tutor)
    }

    /// Store the bundled sample lesson and make sure the configured student exists.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the sample does not validate or cannot be stored.
    pub async fn seed_sample(&self) -> Result<(LessonDocument, StudentSummary), AppServicesError> {
        let lesson = sample_lesson()?;
        self.lessons.upsert_lesson(&lesson, self.clock.now()).await?;
        let student = self
            .students
            .ensure_student(self.student_id, DEMO_STUDENT_NAME)
            .await?;
        tracing::info!(lesson_id = %lesson.id(), student_id = %self.student_id, "seeded sample data");
        Ok((lesson, student))
    }
}
