//! Scoring for the conversational AI evaluation.
//!
//! The attempt only keeps the transcript and the score. The round trip to the text
//! service happens outside: `begin_turn` returns the prompt to send, then either
//! `record_reply` or `record_failure` closes the turn.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{AiMethod, SupportedInput};

/// Share of the method's points each answered turn adds.
pub const TURN_SCORE_SHARE: f64 = 0.2;
/// Share of the method's points at which the evaluation completes.
pub const COMPLETION_SHARE: f64 = 0.8;
pub const EVALUATION_FALLBACK: &str =
    "I had trouble processing that. Could you try expressing it differently?";
const IMAGE_PLACEHOLDER: &str = "Uploaded image from activity";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AiEvaluationError {
    #[error("write something or attach an image first")]
    EmptyTurn,
    #[error("this evaluation does not accept images")]
    ImagesNotSupported,
    #[error("waiting for the tutor to reply")]
    TurnInProgress,
    #[error("no turn is waiting for a reply")]
    NoTurnInProgress,
    #[error("the evaluation is already complete")]
    AlreadyComplete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default)]
    pub image: bool,
}

impl ChatMessage {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            image: false,
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            image: false,
        }
    }

    fn user_image() -> Self {
        Self {
            role: ChatRole::User,
            content: IMAGE_PLACEHOLDER.to_owned(),
            image: true,
        }
    }
}

/// What the learner sends in one turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LearnerTurn {
    pub text: String,
    pub images: usize,
}

impl LearnerTurn {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            images: 0,
        }
    }

    #[must_use]
    pub fn with_images(mut self, images: usize) -> Self {
        self.images = images;
        self
    }
}

/// Score change from one answered turn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnScore {
    pub score: f64,
    pub gained: f64,
    /// Set on the turn that completes the evaluation, with the final score.
    pub completed: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct AiEvaluationAttempt {
    method: AiMethod,
    transcript: Vec<ChatMessage>,
    score: f64,
    pending: bool,
    complete: bool,
}

impl AiEvaluationAttempt {
    /// Start with the method's prompt as the opening tutor message.
    #[must_use]
    pub fn new(method: AiMethod) -> Self {
        let opening = ChatMessage::assistant(method.prompt.clone());
        Self {
            method,
            transcript: vec![opening],
            score: 0.0,
            pending: false,
            complete: false,
        }
    }

    #[must_use]
    pub fn method(&self) -> &AiMethod {
        &self.method
    }

    #[must_use]
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    #[must_use]
    pub fn score(&self) -> f64 {
        self.score
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    #[must_use]
    pub fn is_waiting(&self) -> bool {
        self.pending
    }

    /// Add the learner's turn to the transcript and build the prompt for the tutor.
    ///
    /// # Errors
    ///
    /// `EmptyTurn` with neither text nor images, `ImagesNotSupported` when the
    /// method is text only, `TurnInProgress` while a reply is outstanding and
    /// `AlreadyComplete` after completion.
    pub fn begin_turn(&mut self, turn: &LearnerTurn) -> Result<String, AiEvaluationError> {
        if self.complete {
            return Err(AiEvaluationError::AlreadyComplete);
        }
        if self.pending {
            return Err(AiEvaluationError::TurnInProgress);
        }
        let text = turn.text.trim();
        if text.is_empty() && turn.images == 0 {
            return Err(AiEvaluationError::EmptyTurn);
        }
        if turn.images > 0 && !self.method.accepts(SupportedInput::Image) {
            return Err(AiEvaluationError::ImagesNotSupported);
        }

        let prompt = self.prompt_for(text, turn.images);
        if !text.is_empty() {
            self.transcript.push(ChatMessage::user(text));
        }
        self.transcript
            .extend(std::iter::repeat_with(ChatMessage::user_image).take(turn.images));
        self.pending = true;
        Ok(prompt)
    }

    /// Close the outstanding turn with the tutor's reply and raise the score.
    ///
    /// # Errors
    ///
    /// `NoTurnInProgress` if `begin_turn` was not called first.
    pub fn record_reply(&mut self, reply: impl Into<String>) -> Result<TurnScore, AiEvaluationError> {
        self.close_turn()?;
        self.transcript.push(ChatMessage::assistant(reply));

        let points = self.method.points;
        let previous = self.score;
        self.score = (previous + points * TURN_SCORE_SHARE).min(points);

        let completed = if self.score >= points * COMPLETION_SHARE {
            self.complete = true;
            Some(self.score)
        } else {
            None
        };
        Ok(TurnScore {
            score: self.score,
            gained: self.score - previous,
            completed,
        })
    }

    /// Close the outstanding turn after the tutor failed; the score stays put.
    ///
    /// # Errors
    ///
    /// `NoTurnInProgress` if `begin_turn` was not called first.
    pub fn record_failure(&mut self) -> Result<(), AiEvaluationError> {
        self.close_turn()?;
        self.transcript
            .push(ChatMessage::assistant(EVALUATION_FALLBACK));
        Ok(())
    }

    fn close_turn(&mut self) -> Result<(), AiEvaluationError> {
        if !self.pending {
            return Err(AiEvaluationError::NoTurnInProgress);
        }
        self.pending = false;
        Ok(())
    }

    fn prompt_for(&self, text: &str, images: usize) -> String {
        let history = self
            .transcript
            .iter()
            .map(|m| format!("{}: {}", m.role.as_str(), m.content))
            .collect::<Vec<_>>()
            .join("\n");
        let mut prompt = format!(
            "Context: {}\nPrevious messages: {history}\nCurrent response: {text}\n",
            self.method.context
        );
        if images > 0 {
            prompt.push_str(&format!(
                "The student has also shared {images} image(s) from their activity.\n"
            ));
        }
        prompt.push_str(
            "\nProvide encouraging and specific feedback that helps the student understand the lesson's concepts better.\n",
        );
        prompt
    }
}
