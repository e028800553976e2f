use thiserror::Error;

use crate::ai_evaluation::AiEvaluationError;
use crate::model::LessonError;
use crate::phase::PhaseError;
use crate::quiz::{GradeError, QuizError, QuizParseError};
use crate::route::RouteError;

/// Any error raised by the lesson engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Lesson(#[from] LessonError),
    #[error(transparent)]
    Phase(#[from] PhaseError),
    #[error(transparent)]
    QuizParse(#[from] QuizParseError),
    #[error(transparent)]
    Grade(#[from] GradeError),
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    AiEvaluation(#[from] AiEvaluationError),
    #[error(transparent)]
    Route(#[from] RouteError),
}
