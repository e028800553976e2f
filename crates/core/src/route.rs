//! Paths for lesson views.
//!
//! A lesson lives at `/fundamentals/{subject}/{topic}/{lesson}`, and each phase view
//! appends `/learn`, `/master` or `/evaluate`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::model::LessonId;
use crate::phase::LessonPhase;

const ROOT: &str = "fundamentals";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("path must start with /{ROOT}/: {0}")]
    WrongRoot(String),
    #[error("lesson path needs subject, topic and lesson segments: {0}")]
    MissingSegments(String),
    #[error("unknown phase suffix: {0}")]
    UnknownSuffix(String),
}

impl LessonPhase {
    /// Path segment of this phase's view.
    #[must_use]
    pub fn path_suffix(self) -> &'static str {
        match self {
            LessonPhase::Learning => "learn",
            LessonPhase::Mastery => "master",
            LessonPhase::Evaluation => "evaluate",
        }
    }

    #[must_use]
    pub fn from_path_suffix(segment: &str) -> Option<Self> {
        LessonPhase::ALL
            .into_iter()
            .find(|phase| phase.path_suffix() == segment)
    }
}

/// Location of one lesson in the subject/topic tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LessonPath {
    pub subject: String,
    pub topic: String,
    pub lesson: LessonId,
}

impl LessonPath {
    #[must_use]
    pub fn new(subject: impl Into<String>, topic: impl Into<String>, lesson: LessonId) -> Self {
        Self {
            subject: subject.into(),
            topic: topic.into(),
            lesson,
        }
    }

    /// Where "back" from the first section leads.
    #[must_use]
    pub fn topic_path(&self) -> String {
        format!("/{ROOT}/{}/{}", self.subject, self.topic)
    }

    #[must_use]
    pub fn phase(&self, phase: LessonPhase) -> LessonRoute {
        LessonRoute {
            path: self.clone(),
            phase,
        }
    }
}

impl fmt::Display for LessonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{ROOT}/{}/{}/{}", self.subject, self.topic, self.lesson)
    }
}

/// A lesson path plus the phase view selected by its suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LessonRoute {
    pub path: LessonPath,
    pub phase: LessonPhase,
}

impl fmt::Display for LessonRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.path, self.phase.path_suffix())
    }
}

impl FromStr for LessonRoute {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches('/');
        let rest = trimmed
            .strip_prefix('/')
            .and_then(|p| p.strip_prefix(ROOT))
            .and_then(|p| p.strip_prefix('/'))
            .ok_or_else(|| RouteError::WrongRoot(s.to_owned()))?;

        let segments: Vec<&str> = rest.split('/').filter(|seg| !seg.is_empty()).collect();
        let [subject, topic, lesson, suffix] = segments.as_slice() else {
            return Err(RouteError::MissingSegments(s.to_owned()));
        };
        let phase = LessonPhase::from_path_suffix(suffix)
            .ok_or_else(|| RouteError::UnknownSuffix((*suffix).to_owned()))?;
        let lesson =
            LessonId::new(*lesson).map_err(|_| RouteError::MissingSegments(s.to_owned()))?;

        Ok(Self {
            path: LessonPath::new(*subject, *topic, lesson),
            phase,
        })
    }
}
