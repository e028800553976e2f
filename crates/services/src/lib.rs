#![forbid(unsafe_code)]

pub mod app_services;
pub mod config;
pub mod content;
pub mod error;
pub mod lesson_session;
pub mod notifications;
pub mod students;
pub mod tutor;

pub use gurukul_core::Clock;

pub use app_services::AppServices;
pub use config::{AppConfig, TutorConfig};
pub use content::{ContentApiClient, LessonSource, RepositoryLessonSource};
pub use error::{
    AppServicesError, ContentError, LessonSessionError, PointsSyncError, TutorError,
};
pub use lesson_session::{
    LessonSession, LessonSessionService, LoadGuard, LoadTicket, Navigation, PendingAward,
    SessionUpdate,
};
pub use notifications::{NotificationCenter, NotificationSink};
pub use students::StudentService;
pub use tutor::{
    AiEvaluationSession, EvaluationReply, LessonChat, TextCompletion, TutorClient,
};
