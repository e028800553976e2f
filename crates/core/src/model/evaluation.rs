use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown evaluation method type: {0}")]
pub struct UnknownMethodType(pub String);

/// Discriminant of an evaluation method. A lesson holds at most one method per type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MethodType {
    Quiz,
    Ai,
}

impl MethodType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MethodType::Quiz => "quiz",
            MethodType::Ai => "ai",
        }
    }
}

impl fmt::Display for MethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MethodType {
    type Err = UnknownMethodType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "quiz" => Ok(MethodType::Quiz),
            "ai" => Ok(MethodType::Ai),
            other => Err(UnknownMethodType(other.to_owned())),
        }
    }
}

/// Kind of learner input an AI evaluation accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportedInput {
    Text,
    Image,
}

/// Quiz evaluation; `raw_content` is written in the quiz markup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizMethod {
    pub points: f64,
    #[serde(rename = "content")]
    pub raw_content: String,
}

impl QuizMethod {
    #[must_use]
    pub fn new(points: f64, raw_content: impl Into<String>) -> Self {
        Self {
            points,
            raw_content: raw_content.into(),
        }
    }
}

/// Conversation-based evaluation led by the AI tutor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiMethod {
    pub points: f64,
    pub prompt: String,
    pub context: String,
    #[serde(default)]
    pub supported_inputs: BTreeSet<SupportedInput>,
}

impl AiMethod {
    #[must_use]
    pub fn new(
        points: f64,
        prompt: impl Into<String>,
        context: impl Into<String>,
        supported_inputs: impl IntoIterator<Item = SupportedInput>,
    ) -> Self {
        Self {
            points,
            prompt: prompt.into(),
            context: context.into(),
            supported_inputs: supported_inputs.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn accepts(&self, input: SupportedInput) -> bool {
        self.supported_inputs.contains(&input)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EvaluationMethod {
    Quiz(QuizMethod),
    Ai(AiMethod),
}

impl EvaluationMethod {
    #[must_use]
    pub fn method_type(&self) -> MethodType {
        match self {
            EvaluationMethod::Quiz(_) => MethodType::Quiz,
            EvaluationMethod::Ai(_) => MethodType::Ai,
        }
    }

    /// Maximum score this method can contribute.
    #[must_use]
    pub fn points(&self) -> f64 {
        match self {
            EvaluationMethod::Quiz(quiz) => quiz.points,
            EvaluationMethod::Ai(ai) => ai.points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_union_round_trips_through_json() {
        let json = r#"[
            {"type": "quiz", "points": 50, "content": "[text]\nQ\nR:= A"},
            {"type": "ai", "points": 50, "prompt": "Tell me", "context": "ctx",
             "supportedInputs": ["text", "image"]}
        ]"#;
        let methods: Vec<EvaluationMethod> = serde_json::from_str(json).unwrap();

        assert_eq!(methods[0].method_type(), MethodType::Quiz);
        assert_eq!(methods[1].method_type(), MethodType::Ai);
        assert_eq!(methods[1].points(), 50.0);
        let EvaluationMethod::Ai(ai) = &methods[1] else {
            panic!("expected ai method");
        };
        assert!(ai.accepts(SupportedInput::Image));
    }

    #[test]
    fn method_type_parses_and_displays() {
        assert_eq!("quiz".parse::<MethodType>().unwrap(), MethodType::Quiz);
        assert_eq!(MethodType::Ai.to_string(), "ai");
        assert!("essay".parse::<MethodType>().is_err());
    }
}
