use gurukul_core::model::LessonId;
use services::{
    ContentApiClient, ContentError, LessonSource, TextCompletion, TutorClient, TutorConfig,
    TutorError,
};
use storage::fixtures::SAMPLE_LESSON_JSON;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gravity_id() -> LessonId {
    LessonId::new("introduction-to-gravity").unwrap()
}

#[tokio::test]
async fn content_client_returns_validated_lesson() {
    let server = MockServer::start().await;
    let body = format!(r#"{{"content": {SAMPLE_LESSON_JSON}}}"#);
    Mock::given(method("GET"))
        .and(path("/api/lessons/introduction-to-gravity/content"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let client = ContentApiClient::new(server.uri());
    let lesson = client.fetch_lesson(&gravity_id()).await.unwrap();
    assert_eq!(lesson.title(), "Introduction to Gravity");
    assert_eq!(lesson.section_count(), 4);
}

#[tokio::test]
async fn content_client_maps_status_codes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/lessons/introduction-to-gravity/content"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/lessons/orbits/content"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = ContentApiClient::new(server.uri());
    assert!(matches!(
        client.fetch_lesson(&gravity_id()).await,
        Err(ContentError::NotFound(id)) if id == gravity_id()
    ));
    assert!(matches!(
        client.fetch_lesson(&LessonId::new("orbits").unwrap()).await,
        Err(ContentError::HttpStatus(status)) if status.as_u16() == 503
    ));
}

#[tokio::test]
async fn content_client_rejects_invalid_lessons() {
    let server = MockServer::start().await;
    let body = r#"{"content": {
        "id": "introduction-to-gravity",
        "title": "Introduction to Gravity",
        "phases": {
            "learning": {"sections": []},
            "mastery": {"activity": {"content": "Drop things"}},
            "evaluation": {"methods": []}
        }
    }}"#;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
        .mount(&server)
        .await;

    let client = ContentApiClient::new(server.uri());
    assert!(matches!(
        client.fetch_lesson(&gravity_id()).await,
        Err(ContentError::InvalidLesson(_))
    ));
}

fn tutor_for(server: &MockServer) -> TutorClient {
    TutorClient::new(Some(TutorConfig {
        base_url: server.uri(),
        api_key: "test-key".into(),
        model: "test-model".into(),
    }))
}

#[tokio::test]
async fn tutor_sends_prompt_with_preamble() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_string_contains("Question/Topic from the student: Why do things fall?"))
        .and(body_string_contains("\"model\":\"test-model\""))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"choices":[{"message":{"role":"assistant","content":"  Earth pulls them!  "}}]}"#,
            "application/json",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let reply = tutor_for(&server)
        .complete("Why do things fall?")
        .await
        .unwrap();
    assert_eq!(reply, "Earth pulls them!");
}

#[tokio::test]
async fn tutor_reports_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(matches!(
        tutor_for(&server).complete("hello").await,
        Err(TutorError::HttpStatus(status)) if status.as_u16() == 500
    ));
}

#[tokio::test]
async fn tutor_rejects_empty_replies() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"choices":[{"message":{"content":"   "}}]}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    assert!(matches!(
        tutor_for(&server).complete("hello").await,
        Err(TutorError::EmptyResponse)
    ));
}

#[tokio::test]
async fn unconfigured_tutor_is_disabled() {
    let tutor = TutorClient::new(None);
    assert!(!tutor.enabled());
    assert!(matches!(
        tutor.complete("hello").await,
        Err(TutorError::Disabled)
    ));
}
