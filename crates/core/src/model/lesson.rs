use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::evaluation::{EvaluationMethod, MethodType};
use crate::model::ids::{LessonId, SectionId};
use crate::model::section::Section;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Reasons a lesson document cannot drive a phase controller.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum LessonError {
    #[error("malformed lesson document: {0}")]
    Malformed(String),
    #[error("lesson id must not be empty")]
    EmptyId,
    #[error("lesson title must not be empty")]
    EmptyTitle,
    #[error("lesson has no learning sections")]
    NoSections,
    #[error("duplicate section id: {0}")]
    DuplicateSection(SectionId),
    #[error("section {section} has an invalid media url: {reason}")]
    InvalidMediaUrl { section: SectionId, reason: String },
    #[error("lesson has no evaluation methods")]
    NoMethods,
    #[error("evaluation method type {0} appears more than once")]
    DuplicateMethod(MethodType),
    #[error("evaluation method {method} has invalid points: {points}")]
    InvalidPoints { method: MethodType, points: f64 },
}

//
// ─── PHASE CONTENT ─────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningContent {
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasteryActivity {
    #[serde(rename = "content")]
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MasteryContent {
    pub activity: MasteryActivity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationContent {
    pub methods: Vec<EvaluationMethod>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonPhases {
    pub learning: LearningContent,
    pub mastery: MasteryContent,
    pub evaluation: EvaluationContent,
}

//
// ─── LESSON DOCUMENT ───────────────────────────────────────────────────────────
//

/// A lesson as supplied by the content service.
///
/// Instances built through [`LessonDocument::new`] or [`LessonDocument::from_json`]
/// are validated; a document obtained by plain deserialization should be passed
/// through [`LessonDocument::validate`] before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonDocument {
    id: LessonId,
    title: String,
    phases: LessonPhases,
}

impl LessonDocument {
    /// Assemble and validate a lesson.
    ///
    /// # Errors
    ///
    /// Returns `LessonError` if the assembled document fails validation.
    pub fn new(
        id: LessonId,
        title: impl Into<String>,
        sections: Vec<Section>,
        activity_body: impl Into<String>,
        methods: Vec<EvaluationMethod>,
    ) -> Result<Self, LessonError> {
        let doc = Self {
            id,
            title: title.into(),
            phases: LessonPhases {
                learning: LearningContent { sections },
                mastery: MasteryContent {
                    activity: MasteryActivity {
                        body: activity_body.into(),
                    },
                },
                evaluation: EvaluationContent { methods },
            },
        };
        doc.validate()?;
        Ok(doc)
    }

    /// Deserialize a lesson from the content service's JSON shape and validate it.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::Malformed` for JSON that does not match the shape,
    /// or any validation error.
    pub fn from_json(json: &str) -> Result<Self, LessonError> {
        let doc: Self =
            serde_json::from_str(json).map_err(|e| LessonError::Malformed(e.to_string()))?;
        doc.validate()?;
        Ok(doc)
    }

    /// Serialize back to the content service's JSON shape.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::Malformed` if serialization fails.
    pub fn to_json(&self) -> Result<String, LessonError> {
        serde_json::to_string(self).map_err(|e| LessonError::Malformed(e.to_string()))
    }

    /// Check the structural rules a phase controller relies on.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule.
    pub fn validate(&self) -> Result<(), LessonError> {
        if self.id.as_str().trim().is_empty() {
            return Err(LessonError::EmptyId);
        }
        if self.title.trim().is_empty() {
            return Err(LessonError::EmptyTitle);
        }

        let sections = &self.phases.learning.sections;
        if sections.is_empty() {
            return Err(LessonError::NoSections);
        }
        let mut seen_sections = HashSet::with_capacity(sections.len());
        for section in sections {
            if !seen_sections.insert(section.id()) {
                return Err(LessonError::DuplicateSection(section.id().clone()));
            }
            section
                .media_url()
                .map_err(|e| LessonError::InvalidMediaUrl {
                    section: section.id().clone(),
                    reason: e.to_string(),
                })?;
        }

        let methods = &self.phases.evaluation.methods;
        if methods.is_empty() {
            return Err(LessonError::NoMethods);
        }
        let mut seen_methods = HashSet::with_capacity(methods.len());
        for method in methods {
            let method_type = method.method_type();
            if !seen_methods.insert(method_type) {
                return Err(LessonError::DuplicateMethod(method_type));
            }
            let points = method.points();
            if !points.is_finite() || points < 0.0 {
                return Err(LessonError::InvalidPoints {
                    method: method_type,
                    points,
                });
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> &LessonId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.phases.learning.sections
    }

    #[must_use]
    pub fn section(&self, index: usize) -> Option<&Section> {
        self.phases.learning.sections.get(index)
    }

    #[must_use]
    pub fn section_count(&self) -> usize {
        self.phases.learning.sections.len()
    }

    #[must_use]
    pub fn activity(&self) -> &MasteryActivity {
        &self.phases.mastery.activity
    }

    #[must_use]
    pub fn methods(&self) -> &[EvaluationMethod] {
        &self.phases.evaluation.methods
    }

    #[must_use]
    pub fn method(&self, method_type: MethodType) -> Option<&EvaluationMethod> {
        self.phases
            .evaluation
            .methods
            .iter()
            .find(|m| m.method_type() == method_type)
    }

    /// Sum of the points every evaluation method can award.
    #[must_use]
    pub fn evaluation_points(&self) -> f64 {
        self.methods().iter().map(EvaluationMethod::points).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::evaluation::{AiMethod, QuizMethod, SupportedInput};
    use crate::model::section::{ContentType, ExperienceTag};

    fn text_section(id: &str) -> Section {
        Section::new(id, ContentType::Text, "body", ExperienceTag::Explanation, "ctx")
    }

    fn methods() -> Vec<EvaluationMethod> {
        vec![
            EvaluationMethod::Quiz(QuizMethod::new(50.0, "[text]\nQ\nR:= A")),
            EvaluationMethod::Ai(AiMethod::new(50.0, "p", "c", [SupportedInput::Text])),
        ]
    }

    fn lesson_id() -> LessonId {
        LessonId::new("introduction-to-gravity").unwrap()
    }

    #[test]
    fn valid_lesson_exposes_phases() {
        let lesson = LessonDocument::new(
            lesson_id(),
            "Introduction to Gravity",
            vec![text_section("a"), text_section("b")],
            "Drop things",
            methods(),
        )
        .unwrap();

        assert_eq!(lesson.section_count(), 2);
        assert_eq!(lesson.activity().body, "Drop things");
        assert!(lesson.method(MethodType::Ai).is_some());
        assert_eq!(lesson.evaluation_points(), 100.0);
    }

    #[test]
    fn rejects_structural_problems() {
        let err = LessonDocument::new(lesson_id(), "T", vec![], "x", methods()).unwrap_err();
        assert_eq!(err, LessonError::NoSections);

        let err = LessonDocument::new(
            lesson_id(),
            "T",
            vec![text_section("a"), text_section("a")],
            "x",
            methods(),
        )
        .unwrap_err();
        assert!(matches!(err, LessonError::DuplicateSection(_)));

        let err =
            LessonDocument::new(lesson_id(), "T", vec![text_section("a")], "x", vec![]).unwrap_err();
        assert_eq!(err, LessonError::NoMethods);

        let twice = vec![
            EvaluationMethod::Quiz(QuizMethod::new(10.0, "")),
            EvaluationMethod::Quiz(QuizMethod::new(10.0, "")),
        ];
        let err =
            LessonDocument::new(lesson_id(), "T", vec![text_section("a")], "x", twice).unwrap_err();
        assert_eq!(err, LessonError::DuplicateMethod(MethodType::Quiz));

        let negative = vec![EvaluationMethod::Quiz(QuizMethod::new(-1.0, ""))];
        let err = LessonDocument::new(lesson_id(), "T", vec![text_section("a")], "x", negative)
            .unwrap_err();
        assert!(matches!(err, LessonError::InvalidPoints { .. }));
    }

    #[test]
    fn blank_id_in_wire_document_is_rejected() {
        let lesson = LessonDocument::new(
            lesson_id(),
            "Introduction to Gravity",
            vec![text_section("a")],
            "Drop things",
            methods(),
        )
        .unwrap();
        let json = lesson
            .to_json()
            .unwrap()
            .replace("\"introduction-to-gravity\"", "\"  \"");

        assert_eq!(LessonDocument::from_json(&json), Err(LessonError::EmptyId));
    }

    #[test]
    fn media_sections_need_absolute_urls() {
        let image = Section::new(
            "img",
            ContentType::Image,
            "not a url",
            ExperienceTag::Curiosity,
            "",
        );
        let err =
            LessonDocument::new(lesson_id(), "T", vec![image], "x", methods()).unwrap_err();
        assert!(matches!(err, LessonError::InvalidMediaUrl { .. }));
    }

    #[test]
    fn from_json_validates() {
        let json = r#"{
            "id": "intro", "title": "",
            "phases": {
                "learning": {"sections": []},
                "mastery": {"activity": {"content": ""}},
                "evaluation": {"methods": []}
            }
        }"#;
        assert_eq!(
            LessonDocument::from_json(json).unwrap_err(),
            LessonError::EmptyTitle
        );
        assert!(matches!(
            LessonDocument::from_json("{").unwrap_err(),
            LessonError::Malformed(_)
        ));
    }
}
