use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use gurukul_core::model::{LessonDocument, LessonId};
use storage::repository::LessonRepository;

use crate::error::ContentError;

/// Where lesson documents come from.
#[async_trait]
pub trait LessonSource: Send + Sync {
    /// Fetch and validate a lesson.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::NotFound` for unknown lessons, and network, storage or
    /// validation errors otherwise.
    async fn fetch_lesson(&self, id: &LessonId) -> Result<LessonDocument, ContentError>;
}

/// Serves lessons from the local lesson repository.
#[derive(Clone)]
pub struct RepositoryLessonSource {
    lessons: Arc<dyn LessonRepository>,
}

impl RepositoryLessonSource {
    #[must_use]
    pub fn new(lessons: Arc<dyn LessonRepository>) -> Self {
        Self { lessons }
    }
}

#[async_trait]
impl LessonSource for RepositoryLessonSource {
    async fn fetch_lesson(&self, id: &LessonId) -> Result<LessonDocument, ContentError> {
        match self.lessons.get_lesson(id).await {
            Ok(lesson) => Ok(lesson),
            Err(storage::repository::StorageError::NotFound) => {
                Err(ContentError::NotFound(id.clone()))
            }
            Err(other) => Err(other.into()),
        }
    }
}

/// HTTP client for the content service.
#[derive(Clone)]
pub struct ContentApiClient {
    client: Client,
    base_url: String,
}

impl ContentApiClient {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn lesson_url(&self, id: &LessonId) -> String {
        format!(
            "{}/api/lessons/{}/content",
            self.base_url.trim_end_matches('/'),
            id
        )
    }
}

#[derive(Debug, Deserialize)]
struct LessonContentResponse {
    content: LessonDocument,
}

#[async_trait]
impl LessonSource for ContentApiClient {
    async fn fetch_lesson(&self, id: &LessonId) -> Result<LessonDocument, ContentError> {
        let url = self.lesson_url(id);
        tracing::debug!(lesson_id = %id, %url, "fetching lesson");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ContentError::NotFound(id.clone()));
        }
        if !status.is_success() {
            return Err(ContentError::HttpStatus(status));
        }

        let body: LessonContentResponse = response.json().await?;
        body.content.validate()?;
        Ok(body.content)
    }
}
