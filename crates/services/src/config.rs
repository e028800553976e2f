use std::env;

use gurukul_core::model::StudentId;

pub const DEFAULT_DB_URL: &str = "sqlite://gurukul.sqlite3";
pub const DEFAULT_AI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_AI_MODEL: &str = "gpt-4o-mini";

/// Connection settings for the generative-text service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TutorConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl TutorConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let api_key = lookup("GURUKUL_AI_API_KEY")?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url = lookup("GURUKUL_AI_BASE_URL").unwrap_or_else(|| DEFAULT_AI_BASE_URL.into());
        let model = lookup("GURUKUL_AI_MODEL").unwrap_or_else(|| DEFAULT_AI_MODEL.into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

/// Process-wide settings, read once at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub db_url: String,
    pub student_id: StudentId,
    /// When set, lessons come from the HTTP content service instead of the database.
    pub content_url: Option<String>,
    /// `None` disables the AI tutor.
    pub tutor: Option<TutorConfig>,
}

impl AppConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unparseable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let db_url = non_empty("GURUKUL_DB_URL").unwrap_or_else(|| DEFAULT_DB_URL.into());
        let student_id = non_empty("GURUKUL_STUDENT_ID")
            .and_then(|raw| raw.parse::<StudentId>().ok())
            .unwrap_or_else(|| StudentId::new(1));
        let content_url = non_empty("GURUKUL_CONTENT_URL");
        let tutor = TutorConfig::from_lookup(&lookup);

        Self {
            db_url,
            student_id,
            content_url,
            tutor,
        }
    }
}
