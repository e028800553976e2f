use serde::Serialize;
use thiserror::Error;

use super::{GradeError, Question, Quiz, QuizParseError, Response};
use crate::model::QuizMethod;
use crate::notification::NotificationDraft;

/// Percentage at which the "Quiz Master" badge is earned.
pub const QUIZ_MASTER_PERCENTAGE: f64 = 80.0;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("question {index} was already answered")]
    AlreadySubmitted { index: usize },
    #[error("question {index} has not been answered yet")]
    NotSubmitted { index: usize },
    #[error("the quiz is already finished")]
    Finished,
    #[error(transparent)]
    Grade(#[from] GradeError),
    #[error(transparent)]
    Parse(#[from] QuizParseError),
}

/// Where the attempt went after `next()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizStep {
    Question(usize),
    Finished,
}

/// Message tier shown on the result screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ScoreFeedback {
    Excellent,
    Good,
    KeepPracticing,
}

impl ScoreFeedback {
    #[must_use]
    pub fn for_percentage(percentage: f64) -> Self {
        if percentage >= 80.0 {
            ScoreFeedback::Excellent
        } else if percentage >= 60.0 {
            ScoreFeedback::Good
        } else {
            ScoreFeedback::KeepPracticing
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            ScoreFeedback::Excellent => "Excellent! You really know this topic!",
            ScoreFeedback::Good => "Good job! Keep learning!",
            ScoreFeedback::KeepPracticing => "Keep practicing! You'll get better!",
        }
    }
}

/// Result of a finished quiz.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOutcome {
    pub correct: usize,
    pub total: usize,
    /// Points earned out of the method's points.
    pub score: f64,
    pub percentage: f64,
    pub passing_score: u8,
    pub passed: bool,
    pub feedback: ScoreFeedback,
    pub quiz_master: bool,
}

impl QuizOutcome {
    /// Badge notification, if earned.
    #[must_use]
    pub fn badge(&self) -> Option<NotificationDraft> {
        self.quiz_master.then(|| {
            NotificationDraft::badge(
                "Quiz Master!",
                "You earned the Quiz Master badge for scoring 80% or higher!",
            )
        })
    }
}

/// One pass through a quiz, question by question.
#[derive(Debug, Clone)]
pub struct QuizAttempt {
    quiz: Quiz,
    points: f64,
    current: usize,
    results: Vec<Option<bool>>,
    finished: bool,
}

impl QuizAttempt {
    #[must_use]
    pub fn new(quiz: Quiz, points: f64) -> Self {
        let results = vec![None; quiz.question_count()];
        Self {
            quiz,
            points,
            current: 0,
            results,
            finished: false,
        }
    }

    /// Parse a lesson's quiz method and start an attempt for it.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Parse` if the method's markup is malformed.
    pub fn from_method(method: &QuizMethod) -> Result<Self, QuizError> {
        let quiz = super::parse(&method.raw_content)?;
        Ok(Self::new(quiz, method.points))
    }

    #[must_use]
    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.finished {
            None
        } else {
            self.quiz.questions.get(self.current)
        }
    }

    #[must_use]
    pub fn is_submitted(&self) -> bool {
        matches!(self.results.get(self.current), Some(Some(_)))
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    #[must_use]
    pub fn correct_count(&self) -> usize {
        self.results.iter().filter(|r| **r == Some(true)).count()
    }

    /// Points earned so far.
    #[must_use]
    pub fn score(&self) -> f64 {
        let total = self.quiz.question_count();
        if total == 0 {
            return 0.0;
        }
        self.points * self.correct_count() as f64 / total as f64
    }

    /// Grade the current question. Each question takes exactly one submission.
    ///
    /// # Errors
    ///
    /// `Finished` after the last question, `AlreadySubmitted` on a second submission,
    /// and `Grade` if the response does not fit the question.
    pub fn submit(&mut self, response: &Response) -> Result<bool, QuizError> {
        if self.finished {
            return Err(QuizError::Finished);
        }
        if self.is_submitted() {
            return Err(QuizError::AlreadySubmitted {
                index: self.current,
            });
        }
        let question = self
            .quiz
            .questions
            .get(self.current)
            .ok_or(QuizError::Finished)?;
        let correct = question.grade(response)?;
        self.results[self.current] = Some(correct);
        Ok(correct)
    }

    /// Move past the answered question.
    ///
    /// # Errors
    ///
    /// `NotSubmitted` if the current question has no answer, `Finished` if the
    /// attempt is already over.
    pub fn next(&mut self) -> Result<QuizStep, QuizError> {
        if self.finished {
            return Err(QuizError::Finished);
        }
        if !self.is_submitted() {
            return Err(QuizError::NotSubmitted {
                index: self.current,
            });
        }
        if self.current + 1 < self.quiz.question_count() {
            self.current += 1;
            Ok(QuizStep::Question(self.current))
        } else {
            self.finished = true;
            Ok(QuizStep::Finished)
        }
    }

    /// Final result, once the last question has been passed.
    #[must_use]
    pub fn outcome(&self) -> Option<QuizOutcome> {
        if !self.finished {
            return None;
        }
        let correct = self.correct_count();
        let total = self.quiz.question_count();
        let percentage = if total == 0 {
            0.0
        } else {
            100.0 * correct as f64 / total as f64
        };
        Some(QuizOutcome {
            correct,
            total,
            score: self.score(),
            percentage,
            passing_score: self.quiz.passing_score,
            passed: percentage >= f64::from(self.quiz.passing_score),
            feedback: ScoreFeedback::for_percentage(percentage),
            quiz_master: percentage >= QUIZ_MASTER_PERCENTAGE,
        })
    }
}
