//! Quiz content: the line-oriented quiz markup, grading and the attempt loop.
//!
//! ```text
//! [passing_score]
//! 70
//!
//! [single]
//! What happens to objects of different masses in a vacuum?
//! - (x) They fall at the same rate
//! - ( ) Heavy objects fall faster
//!
//! [text]
//! What is the value of gravity?
//! R:= 9.8
//! ```

mod attempt;
mod grade;
mod parser;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use attempt::{QuizAttempt, QuizError, QuizOutcome, QuizStep, ScoreFeedback};
pub use grade::{GradeError, Response};
pub use parser::{QuizParseError, parse};

/// Pass threshold when the markup has no `[passing_score]` directive.
pub const DEFAULT_PASSING_SCORE: u8 = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    Single,
    Multiple,
    Text,
}

impl QuestionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::Single => "single",
            QuestionKind::Multiple => "multiple",
            QuestionKind::Text => "text",
        }
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prompt plus options of a `[single]` or `[multiple]` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    /// Indexes of the options marked `x`, in declaration order.
    pub correct: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextQuestion {
    pub prompt: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Question {
    Single(ChoiceQuestion),
    Multiple(ChoiceQuestion),
    Text(TextQuestion),
}

impl Question {
    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        match self {
            Question::Single(_) => QuestionKind::Single,
            Question::Multiple(_) => QuestionKind::Multiple,
            Question::Text(_) => QuestionKind::Text,
        }
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        match self {
            Question::Single(q) | Question::Multiple(q) => &q.prompt,
            Question::Text(q) => &q.prompt,
        }
    }

    /// Display options; empty for text questions.
    #[must_use]
    pub fn options(&self) -> &[String] {
        match self {
            Question::Single(q) | Question::Multiple(q) => &q.options,
            Question::Text(_) => &[],
        }
    }
}

/// A parsed quiz.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub passing_score: u8,
    pub questions: Vec<Question>,
}

impl Quiz {
    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Points one question is worth when the quiz is worth `total` points.
    #[must_use]
    pub fn points_per_question(&self, total: f64) -> f64 {
        if self.questions.is_empty() {
            0.0
        } else {
            total / self.questions.len() as f64
        }
    }
}

impl FromStr for Quiz {
    type Err = QuizParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}
