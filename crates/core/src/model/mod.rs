mod evaluation;
mod ids;
mod lesson;
mod section;

pub use ids::{IdError, LessonId, SectionId, StudentId};

pub use evaluation::{
    AiMethod, EvaluationMethod, MethodType, QuizMethod, SupportedInput, UnknownMethodType,
};
pub use lesson::{
    EvaluationContent, LearningContent, LessonDocument, LessonError, LessonPhases,
    MasteryActivity, MasteryContent,
};
pub use section::{ContentType, ExperienceLabel, ExperienceTag, Section};
