//! Bundled sample content.

use gurukul_core::model::{LessonDocument, LessonError};

/// The "Introduction to Gravity" lesson, as served by the content service.
pub const SAMPLE_LESSON_JSON: &str = include_str!("../fixtures/introduction-to-gravity.json");

/// Name of the demo student created by seeding.
pub const DEMO_STUDENT_NAME: &str = "Arjun";

/// Parse and validate the bundled sample lesson.
///
/// # Errors
///
/// Returns `LessonError` if the bundled JSON does not validate.
pub fn sample_lesson() -> Result<LessonDocument, LessonError> {
    LessonDocument::from_json(SAMPLE_LESSON_JSON)
}
