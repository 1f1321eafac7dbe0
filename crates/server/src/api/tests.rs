use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use examly_core::config::YoutubeConfig;
use examly_core::{Language, Material, StudyContent, User};
use examly_llm::testing::ScriptedProvider;
use examly_llm::LlmClient;
use examly_notify::{NoopMailer, Notifier};
use examly_storage::BlobStore;
use examly_study::{Library, MaterialStore, MemoryStore, Pipeline, StudyError, VideoSearch};

use super::{status_for, USER_ID_HEADER};
use crate::router::build_router;
use crate::state::{AppState, UploadLimits};

const BOUNDARY: &str = "examly-test-boundary";

struct Fixture {
    app: Router,
    store: Arc<MemoryStore>,
    _dir: tempfile::TempDir,
}

fn fixture(provider: Option<ScriptedProvider>) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let blobs = Arc::new(BlobStore::local(&dir.path().join("data"), &dir.path().join("tmp")).unwrap());
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(Notifier::new(Arc::new(NoopMailer), "http://localhost:3000").unwrap());

    let pipeline = provider.map(|p| {
        let llm = LlmClient::new(Arc::new(p), 0.7, 1024);
        Pipeline::new(llm, store.clone(), blobs.clone(), Duration::from_secs(30))
    });
    let state = Arc::new(AppState {
        llm_unavailable: pipeline.is_none().then(|| "GEMINI_API_KEY not set".to_string()),
        llm_provider: pipeline.as_ref().map(|_| "scripted".to_string()),
        pipeline,
        library: Library::new(store.clone(), blobs, notifier),
        videos: VideoSearch::from_config(&YoutubeConfig { api_key: None, default_max_results: 5 }),
        uploads: UploadLimits { max_files: 2, max_file_bytes: 1024 },
        signed_url_ttl: Duration::from_secs(60),
        config_summary: json!({"profile": "default"}),
    });

    Fixture {
        app: build_router(state, "*"),
        store,
        _dir: dir,
    }
}

fn multipart(files: &[(&str, &str)]) -> Body {
    let mut body = String::new();
    for (name, content) in files {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n{content}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    Body::from(body)
}

impl Fixture {
    async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    async fn call(&self, method: &str, uri: &str, user: Uuid, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder()
            .method(method)
            .uri(uri)
            .header(USER_ID_HEADER, user.to_string());
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        self.send(req.body(body).unwrap()).await
    }

    async fn upload(&self, user: Uuid, files: &[(&str, &str)]) -> (StatusCode, Value) {
        let req = Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header(USER_ID_HEADER, user.to_string())
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(multipart(files))
            .unwrap();
        self.send(req).await
    }

    async fn material(&self, owner: Uuid) -> Material {
        let m = Material::new(owner, "Optics".into(), vec![], StudyContent::default(), Language::English, vec![]);
        self.store.insert_material(&m).await.unwrap();
        m
    }
}

#[tokio::test]
async fn missing_identity_is_unauthorized() {
    let f = fixture(None);
    let req = Request::builder().uri("/api/materials").body(Body::empty()).unwrap();
    let (status, body) = f.send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "access");

    let req = Request::builder()
        .uri("/api/materials")
        .header(USER_ID_HEADER, "not-a-uuid")
        .body(Body::empty())
        .unwrap();
    assert_eq!(f.send(req).await.0, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_reports_ai_readiness() {
    let f = fixture(None);
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = f.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["ai_ready"], false);
}

#[tokio::test]
async fn upload_then_poll_status() {
    let f = fixture(None);
    let user = Uuid::new_v4();
    let (status, body) = f.upload(user, &[("notes.txt", "Energy is conserved.")]).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["documents"][0]["originalName"], "notes.txt");
    assert_eq!(body["documents"][0]["extracted"], true);

    let id = body["documents"][0]["id"].as_str().unwrap().to_string();
    let (status, body) = f
        .call("GET", &format!("/api/documents/status?ids={id}"), user, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["documents"][0]["extractedText"], "Energy is conserved.");
    assert_eq!(body["documents"][0]["processed"], false);

    // someone else's poll sees nothing
    let (_, body) = f
        .call("GET", &format!("/api/documents/status?ids={id}"), Uuid::new_v4(), None)
        .await;
    assert_eq!(body["documents"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn upload_rejects_bad_type_and_too_many_files() {
    let f = fixture(None);
    let user = Uuid::new_v4();

    let (status, body) = f.upload(user, &[("data.xyz", "x")]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "input");

    let (status, _) = f.upload(user, &[("a.txt", "a"), ("b.txt", "b"), ("c.txt", "c")]).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn process_without_provider_is_a_configuration_error() {
    let f = fixture(None);
    let (status, body) = f
        .call(
            "POST",
            "/api/process",
            Uuid::new_v4(),
            Some(json!({"documentIds": [Uuid::new_v4()], "features": {"summary": true}})),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["kind"], "configuration");
    assert!(body["error"].as_str().unwrap().contains("GEMINI_API_KEY"));
}

#[tokio::test]
async fn process_end_to_end() {
    let f = fixture(Some(
        ScriptedProvider::new()
            .reply("Extract the chapter title", "Thermodynamics")
            .reply(
                "AI Study Assistant",
                r#"{"summary": "Energy is conserved.", "youtubeVideos": []}"#,
            ),
    ));
    let user = Uuid::new_v4();
    let (_, body) = f
        .upload(user, &[("thermo.txt", "Chapter 1: Thermodynamics\n\nEnergy cannot be created or destroyed.")])
        .await;
    let id = body["documents"][0]["id"].clone();

    let (status, body) = f
        .call(
            "POST",
            "/api/process",
            user,
            Some(json!({"documentIds": [id], "features": {"summary": true}})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let material = &body["studyMaterial"];
    assert_eq!(material["summary"], "Energy is conserved.");
    assert_eq!(material["outputLanguage"], "english");
    assert_eq!(material["chapters"].as_array().unwrap().len(), 1);
    assert_eq!(material["chapters"][0]["order"], 1);

    let (_, listed) = f.call("GET", "/api/materials", user, None).await;
    assert_eq!(listed["materials"][0]["isOwner"], true);
    assert_eq!(listed["materials"][0]["documents"][0]["originalName"], "thermo.txt");
}

#[tokio::test]
async fn process_with_unknown_documents_is_not_found() {
    let f = fixture(Some(ScriptedProvider::new()));
    let (status, _) = f
        .call(
            "POST",
            "/api/process",
            Uuid::new_v4(),
            Some(json!({"documentIds": [Uuid::new_v4()], "features": {"summary": true}})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn share_vote_and_notifications_over_http() {
    let f = fixture(None);
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    let (status, _) = f
        .call("PUT", "/api/users/me", alice, Some(json!({"email": "alice@example.com", "name": "Alice"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    f.call("PUT", "/api/users/me", bob, Some(json!({"email": "bob@example.com"}))).await;

    let m = f.material(alice).await;
    let share_uri = format!("/api/materials/{}/share", m.id);

    let (status, body) = f.call("POST", &share_uri, alice, Some(json!({"email": "Bob@Example.com"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["results"]["shared"], 1);

    let (_, body) = f.call("POST", &share_uri, alice, Some(json!({"emails": ["bob@example.com"]}))).await;
    assert_eq!(body["results"]["alreadyShared"], 1);
    assert_eq!(body["message"], "1 user already had access");

    let (status, _) = f.call("POST", &share_uri, bob, Some(json!({"email": "alice@example.com"}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, body) = f.call("GET", "/api/notifications", bob, None).await;
    let notes = body["notifications"].as_array().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["type"], "material_shared");
    assert_eq!(notes[0]["materialTitle"], "Optics");

    let vote_uri = format!("/api/materials/{}/vote", m.id);
    f.call("POST", &vote_uri, bob, Some(json!({"vote": "up"}))).await;
    let (status, body) = f.call("POST", &vote_uri, bob, Some(json!({"vote": "down"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["votes"], json!({"up": 0, "down": 1, "total": 1}));

    let (status, _) = f.call("POST", &vote_uri, bob, Some(json!({"vote": "sideways"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = f.call("GET", "/api/users/suggestions?query=bo", alice, None).await;
    assert_eq!(body["suggestions"], json!([{"email": "bob@example.com", "name": "bob"}]));
}

#[tokio::test]
async fn rename_and_delete_are_owner_only() {
    let f = fixture(None);
    let owner = Uuid::new_v4();
    f.store.insert_user(&User { id: owner, ..User::new("o@example.com", None) }).await.unwrap();
    let m = f.material(owner).await;
    let uri = format!("/api/materials/{}", m.id);

    let (status, _) = f.call("PUT", &uri, Uuid::new_v4(), Some(json!({"title": "Mine"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = f.call("PUT", &uri, owner, Some(json!({"title": "  Light  "}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["material"]["title"], "Light");

    let (status, _) = f.call("DELETE", &uri, owner, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(f.store.get_material(m.id).await.unwrap().is_none());
}

#[tokio::test]
async fn signed_url_requires_own_prefix() {
    let f = fixture(None);
    let user = Uuid::new_v4();
    let uri = format!("/api/documents/url?path={}/file.pdf", Uuid::new_v4());
    let (status, _) = f.call("GET", &uri, user, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[test]
fn errors_map_to_distinct_statuses() {
    assert_eq!(status_for(&StudyError::UnsupportedFileType(".xyz".into())), StatusCode::BAD_REQUEST);
    assert_eq!(status_for(&StudyError::EmptyExtraction), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(status_for(&StudyError::ConfigurationError("k".into())), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(status_for(&StudyError::RateLimited("q".into())), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(status_for(&StudyError::EmptyAIResponse), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(status_for(&StudyError::Timeout(300)), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(status_for(&StudyError::Unauthorized("x".into())), StatusCode::FORBIDDEN);
    assert_eq!(status_for(&StudyError::NotFound("x".into())), StatusCode::NOT_FOUND);
    assert_eq!(status_for(&StudyError::Store("db".into())), StatusCode::INTERNAL_SERVER_ERROR);
}
