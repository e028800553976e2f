//! Three-phase lesson flow: learning → mastery → evaluation.

mod controller;
mod event;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use controller::{
    FINISH_DELAY, LEARNING_COMPLETION_POINTS, LessonController, MASTERY_COMPLETION_POINTS,
    PhaseError, PhaseProgress, PhaseProgressState,
};
pub use event::{AwardReason, PhaseEvent};

/// A phase of a lesson. Ordering follows the lesson flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonPhase {
    Learning,
    Mastery,
    Evaluation,
}

impl LessonPhase {
    pub const ALL: [LessonPhase; 3] = [
        LessonPhase::Learning,
        LessonPhase::Mastery,
        LessonPhase::Evaluation,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LessonPhase::Learning => "learning",
            LessonPhase::Mastery => "mastery",
            LessonPhase::Evaluation => "evaluation",
        }
    }
}

impl fmt::Display for LessonPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LessonPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "learning" => Ok(LessonPhase::Learning),
            "mastery" => Ok(LessonPhase::Mastery),
            "evaluation" => Ok(LessonPhase::Evaluation),
            other => Err(format!("unknown lesson phase: {other}")),
        }
    }
}
