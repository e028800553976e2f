use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use gurukul_core::ai_evaluation::{
    AiEvaluationAttempt, AiEvaluationError, ChatMessage, LearnerTurn, TurnScore,
};
use gurukul_core::model::{AiMethod, Section};

use crate::config::TutorConfig;
use crate::error::TutorError;

pub const CHAT_GREETING: &str = "Hi! I'm your AI learning buddy for this lesson. Feel free to ask me any questions about what we're learning!";
pub const CHAT_FALLBACK: &str =
    "I had trouble understanding that. Could you try asking in a different way?";

const TUTOR_PREAMBLE: &str = "You are a friendly and encouraging AI tutor for a 10-year-old student.
Your responses should be:
- Simple and easy to understand
- Engaging and fun
- Educational but not overwhelming
- Built on examples from everyday life
- Broken down into simple steps
- Positive and supportive
- Brief (2-3 paragraphs at most)

If a concept would benefit from visual aids, suggest a relevant educational video from Crash Course Kids, SciShow Kids, Khan Academy or National Geographic Kids.

Question/Topic from the student: ";

/// Wrap a prompt in the kid-friendly tutoring instructions.
#[must_use]
pub fn tutoring_prompt(prompt: &str) -> String {
    format!("{TUTOR_PREAMBLE}{prompt}")
}

/// Generative-text service: one prompt in, one reply out.
#[async_trait]
pub trait TextCompletion: Send + Sync {
    /// # Errors
    ///
    /// Returns `TutorError` when the service is unavailable or replies with nothing.
    async fn complete(&self, prompt: &str) -> Result<String, TutorError>;
}

//
// ─── HTTP CLIENT ───────────────────────────────────────────────────────────────
//

/// OpenAI-compatible chat-completions client.
#[derive(Clone)]
pub struct TutorClient {
    client: Client,
    config: Option<TutorConfig>,
}

impl TutorClient {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(TutorConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<TutorConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }
}

#[async_trait]
impl TextCompletion for TutorClient {
    async fn complete(&self, prompt: &str) -> Result<String, TutorError> {
        let config = self.config.as_ref().ok_or(TutorError::Disabled)?;

        let url = format!(
            "{}/chat/completions",
            config.base_url.trim_end_matches('/')
        );
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![RequestMessage {
                role: "user",
                content: tutoring_prompt(prompt),
            }],
            temperature: 0.7,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TutorError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(TutorError::EmptyResponse)?;

        Ok(content)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<RequestMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct RequestMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

//
// ─── LESSON CHAT ───────────────────────────────────────────────────────────────
//

/// Question-and-answer chat attached to one learning section.
#[derive(Debug, Clone)]
pub struct LessonChat {
    section_content: String,
    ai_context: String,
    transcript: Vec<ChatMessage>,
}

impl LessonChat {
    #[must_use]
    pub fn for_section(section: &Section) -> Self {
        Self {
            section_content: section.body().to_owned(),
            ai_context: section.ai_context().to_owned(),
            transcript: vec![ChatMessage::assistant(CHAT_GREETING)],
        }
    }

    #[must_use]
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Ask the tutor about the section. Blank questions are ignored.
    ///
    /// A failed call is answered with a friendly fallback instead of an error.
    pub async fn ask(&mut self, tutor: &dyn TextCompletion, question: &str) -> Option<&ChatMessage> {
        let question = question.trim();
        if question.is_empty() {
            return None;
        }
        self.transcript.push(ChatMessage::user(question));

        let prompt = format!(
            "Current lesson section content: {}\nTeaching context: {}\nStudent question: {question}\n\n\
             Remember to:\n\
             1. Keep explanations simple and engaging for a young student\n\
             2. Use examples and analogies they can relate to\n\
             3. Encourage curiosity and critical thinking\n\
             4. Stay focused on the current topic\n\
             5. Be encouraging and supportive\n",
            self.section_content, self.ai_context
        );
        let reply = match tutor.complete(&prompt).await {
            Ok(reply) => reply,
            Err(err) => {
                tracing::warn!(error = %err, "lesson chat reply failed");
                CHAT_FALLBACK.to_owned()
            }
        };
        self.transcript.push(ChatMessage::assistant(reply));
        self.transcript.last()
    }
}

//
// ─── AI EVALUATION ─────────────────────────────────────────────────────────────
//

/// How a submitted evaluation turn ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EvaluationReply {
    Answered(TurnScore),
    /// The tutor call failed; the fallback message was added and the score is unchanged.
    Fallback,
}

/// Drives an `AiEvaluationAttempt` against a text service.
#[derive(Debug, Clone)]
pub struct AiEvaluationSession {
    attempt: AiEvaluationAttempt,
}

impl AiEvaluationSession {
    #[must_use]
    pub fn new(method: AiMethod) -> Self {
        Self {
            attempt: AiEvaluationAttempt::new(method),
        }
    }

    #[must_use]
    pub fn attempt(&self) -> &AiEvaluationAttempt {
        &self.attempt
    }

    /// Send one learner turn and wait for the tutor.
    ///
    /// # Errors
    ///
    /// Returns `AiEvaluationError` when the turn is rejected before anything is sent.
    pub async fn submit(
        &mut self,
        tutor: &dyn TextCompletion,
        turn: &LearnerTurn,
    ) -> Result<EvaluationReply, AiEvaluationError> {
        let prompt = self.attempt.begin_turn(turn)?;
        match tutor.complete(&prompt).await {
            Ok(reply) => {
                let score = self.attempt.record_reply(reply)?;
                tracing::debug!(score = score.score, gained = score.gained, "evaluation turn scored");
                Ok(EvaluationReply::Answered(score))
            }
            Err(err) => {
                tracing::warn!(error = %err, "evaluation reply failed");
                self.attempt.record_failure()?;
                Ok(EvaluationReply::Fallback)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use gurukul_core::ai_evaluation::{ChatRole, EVALUATION_FALLBACK};
    use gurukul_core::model::{ContentType, ExperienceTag, SupportedInput};

    /// Replies with canned answers, failing when it runs out.
    struct ScriptedTutor {
        replies: Mutex<Vec<Result<String, ()>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedTutor {
        fn new(replies: Vec<Result<&str, ()>>) -> Self {
            Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .rev()
                        .map(|r| r.map(str::to_owned))
                        .collect(),
                ),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextCompletion for ScriptedTutor {
        async fn complete(&self, prompt: &str) -> Result<String, TutorError> {
            self.prompts.lock().unwrap().push(prompt.to_owned());
            match self.replies.lock().unwrap().pop() {
                Some(Ok(reply)) => Ok(reply),
                _ => Err(TutorError::EmptyResponse),
            }
        }
    }

    fn section() -> Section {
        Section::new(
            "gravity-intro",
            ContentType::Text,
            "# Gravity pulls things down",
            ExperienceTag::Curiosity,
            "Basics of gravity",
        )
    }

    #[tokio::test]
    async fn lesson_chat_sends_section_context() {
        let tutor = ScriptedTutor::new(vec![Ok("Because Earth pulls it!")]);
        let mut chat = LessonChat::for_section(&section());
        assert_eq!(chat.transcript()[0].content, CHAT_GREETING);

        let reply = chat.ask(&tutor, "Why does a ball fall?").await.unwrap();
        assert_eq!(reply.content, "Because Earth pulls it!");

        let prompts = tutor.prompts.lock().unwrap();
        assert!(prompts[0].contains("Current lesson section content: # Gravity pulls things down"));
        assert!(prompts[0].contains("Teaching context: Basics of gravity"));
        assert!(prompts[0].contains("Student question: Why does a ball fall?"));
    }

    #[tokio::test]
    async fn lesson_chat_falls_back_and_ignores_blank_questions() {
        let tutor = ScriptedTutor::new(vec![Err(())]);
        let mut chat = LessonChat::for_section(&section());
        assert!(chat.ask(&tutor, "   ").await.is_none());

        let reply = chat.ask(&tutor, "What is mass?").await.unwrap();
        assert_eq!(reply.content, CHAT_FALLBACK);
        assert_eq!(reply.role, ChatRole::Assistant);
        assert_eq!(chat.transcript().len(), 3);
    }

    #[tokio::test]
    async fn evaluation_session_scores_replies_and_survives_failures() {
        let method = AiMethod::new(
            50.0,
            "Tell me about your experiment.",
            "Falling objects",
            [SupportedInput::Text],
        );
        let tutor = ScriptedTutor::new(vec![Ok("Nice!"), Err(()), Ok("Great!")]);
        let mut session = AiEvaluationSession::new(method);

        let first = session
            .submit(&tutor, &LearnerTurn::text("They fell together"))
            .await
            .unwrap();
        assert!(matches!(first, EvaluationReply::Answered(s) if s.score == 10.0));

        let second = session
            .submit(&tutor, &LearnerTurn::text("The paper was slower"))
            .await
            .unwrap();
        assert_eq!(second, EvaluationReply::Fallback);
        assert_eq!(session.attempt().score(), 10.0);
        assert_eq!(
            session.attempt().transcript().last().unwrap().content,
            EVALUATION_FALLBACK
        );

        let third = session
            .submit(&tutor, &LearnerTurn::text("Air pushes on it"))
            .await
            .unwrap();
        assert!(matches!(third, EvaluationReply::Answered(s) if s.score == 20.0));
    }

    #[test]
    fn tutoring_prompt_wraps_question() {
        let prompt = tutoring_prompt("What is gravity?");
        assert!(prompt.starts_with("You are a friendly and encouraging AI tutor"));
        assert!(prompt.ends_with("Question/Topic from the student: What is gravity?"));
    }
}
