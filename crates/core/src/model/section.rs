use serde::{Deserialize, Serialize};
use url::Url;

use crate::model::ids::SectionId;

//
// ─── CONTENT TYPE ──────────────────────────────────────────────────────────────
//

/// How the body of a learning section is meant to be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// Markdown text.
    Text,
    Image,
    Video,
    Audio,
    Pdf,
}

impl ContentType {
    /// Media sections carry a URL as their body; text sections carry markdown.
    #[must_use]
    pub fn is_media(self) -> bool {
        !matches!(self, ContentType::Text)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Image => "image",
            ContentType::Video => "video",
            ContentType::Audio => "audio",
            ContentType::Pdf => "pdf",
        }
    }
}

//
// ─── EXPERIENCE TAG ────────────────────────────────────────────────────────────
//

/// Pedagogical intent of a section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceTag {
    Curiosity,
    Explanation,
    Verification,
}

/// Heading shown above a section for its experience tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExperienceLabel {
    pub title: &'static str,
    pub blurb: &'static str,
}

impl ExperienceTag {
    #[must_use]
    pub fn label(self) -> ExperienceLabel {
        match self {
            ExperienceTag::Curiosity => ExperienceLabel {
                title: "Discover",
                blurb: "Let's explore something interesting!",
            },
            ExperienceTag::Explanation => ExperienceLabel {
                title: "Learn",
                blurb: "Understanding the concepts",
            },
            ExperienceTag::Verification => ExperienceLabel {
                title: "Practice",
                blurb: "Let's apply what we learned",
            },
        }
    }
}

//
// ─── SECTION ───────────────────────────────────────────────────────────────────
//

/// One step of the learning phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    id: SectionId,
    #[serde(rename = "type")]
    content_type: ContentType,
    #[serde(rename = "content")]
    body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(rename = "experience")]
    experience_tag: ExperienceTag,
    #[serde(default)]
    ai_context: String,
}

impl Section {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        content_type: ContentType,
        body: impl Into<String>,
        experience_tag: ExperienceTag,
        ai_context: impl Into<String>,
    ) -> Self {
        Self {
            id: SectionId::new(id),
            content_type,
            body: body.into(),
            caption: None,
            description: None,
            experience_tag,
            ai_context: ai_context.into(),
        }
    }

    #[must_use]
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn id(&self) -> &SectionId {
        &self.id
    }

    #[must_use]
    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    #[must_use]
    pub fn caption(&self) -> Option<&str> {
        self.caption.as_deref()
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn experience_tag(&self) -> ExperienceTag {
        self.experience_tag
    }

    #[must_use]
    pub fn ai_context(&self) -> &str {
        &self.ai_context
    }

    /// Parsed media location for non-text sections.
    ///
    /// Returns `Ok(None)` for text sections.
    ///
    /// # Errors
    ///
    /// Returns the URL parse error when a media body is not an absolute URL.
    pub fn media_url(&self) -> Result<Option<Url>, url::ParseError> {
        if !self.content_type.is_media() {
            return Ok(None);
        }
        Url::parse(self.body.trim()).map(Some)
    }
}
