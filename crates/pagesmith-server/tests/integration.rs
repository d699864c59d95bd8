use app_generator::{Attachment, CodeGenerator, GeneratedFiles};
use async_trait::async_trait;
use axum::http::StatusCode;
use http_body_util::BodyExt;
use pagesmith_core::config::ServiceConfig;
use pagesmith_core::memory::{HostCall, MemoryHost};
use pagesmith_core::settle::SettlePolicy;
use pagesmith_core::Synchronizer;
use pagesmith_server::AppState;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "s3cret";
const INDEX: &str = "<!DOCTYPE html><html><body>quiz</body></html>";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Returns a fixed file set and counts how often it was asked.
struct StubGenerator {
    files: GeneratedFiles,
    calls: AtomicUsize,
}

impl StubGenerator {
    fn producing(files: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            files: files.iter().map(|(p, c)| (*p, *c)).collect(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CodeGenerator for StubGenerator {
    async fn generate(&self, _brief: &str, _attachments: &[Attachment]) -> GeneratedFiles {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.files.clone()
    }
}

struct Harness {
    host: Arc<MemoryHost>,
    generator: Arc<StubGenerator>,
    state: AppState,
}

fn harness(generator: Arc<StubGenerator>) -> Harness {
    let mut config = ServiceConfig::default();
    config.secret = SECRET.into();
    config.notify.backoff_unit_ms = 1;
    config.notify.max_attempts = 2;

    let host = Arc::new(MemoryHost::new("alice"));
    let synchronizer = Synchronizer::new(host.clone(), SettlePolicy::immediate());
    let state = AppState::new(&config, generator.clone(), synchronizer).unwrap();
    Harness {
        host,
        generator,
        state,
    }
}

fn app_files() -> Arc<StubGenerator> {
    StubGenerator::producing(&[("index.html", INDEX), ("README.md", "# Quiz\n\nMIT License\n")])
}

fn request(task: &str, round: u32, evaluation_url: &str) -> serde_json::Value {
    serde_json::json!({
        "email": "student@example.com",
        "secret": SECRET,
        "task": task,
        "round": round,
        "nonce": "nonce-1",
        "brief": "Build a quiz",
        "evaluation_url": evaluation_url,
    })
}

/// Send a GET request via `oneshot` and return (status, parsed JSON body).
async fn get(app: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// Send a POST request with a JSON body via `oneshot` and return (status, parsed JSON body).
async fn post_json(
    app: axum::Router,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let req = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    let response = app.oneshot(req).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_ok() {
    let h = harness(app_files());
    let (status, json) = get(pagesmith_server::build_router(h.state), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn wrong_secret_is_rejected_before_any_side_effect() {
    let h = harness(app_files());
    let mut body = request("quiz", 1, "");
    body["secret"] = "nope".into();

    let (status, json) = post_json(pagesmith_server::build_router(h.state), "/build", body).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["status"], "error");
    assert_eq!(h.generator.calls(), 0);
    assert!(h.host.calls().is_empty());
}

#[tokio::test]
async fn invalid_task_and_round_zero_are_bad_requests() {
    let h = harness(app_files());

    let (status, _) = post_json(
        pagesmith_server::build_router(h.state.clone()),
        "/build",
        request("quiz app", 1, ""),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post_json(
        pagesmith_server::build_router(h.state),
        "/build",
        request("quiz", 0, ""),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(h.generator.calls(), 0);
}

#[tokio::test]
async fn empty_generation_never_reaches_the_synchronizer() {
    let h = harness(StubGenerator::producing(&[]));

    let (status, json) = post_json(
        pagesmith_server::build_router(h.state),
        "/build",
        request("quiz", 1, ""),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json["detail"].as_str().unwrap().contains("generate"));
    assert_eq!(h.generator.calls(), 1);
    assert!(h.host.calls().is_empty());
}

#[tokio::test]
async fn round_one_publishes_and_notifies() {
    let mut server = mockito::Server::new_async().await;
    let callback = server
        .mock("POST", "/evaluate")
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({
            "email": "student@example.com",
            "task": "quiz",
            "round": 1,
            "nonce": "nonce-1"
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let h = harness(app_files());
    let (status, json) = post_json(
        pagesmith_server::build_router(h.state),
        "/build",
        request("quiz", 1, &format!("{}/evaluate", server.url())),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["status"], "success");
    assert_eq!(json["notified"], true);
    assert_ne!(json["commit_sha"], "unknown");

    let names = h.host.repository_names();
    assert_eq!(names.len(), 1);
    let repo = &names[0];
    assert!(repo.starts_with("quiz-"));
    assert_eq!(json["repo_url"], format!("https://github.com/alice/{repo}"));
    assert_eq!(json["pages_url"], format!("https://alice.github.io/{repo}/"));

    let files = h.host.files(repo);
    assert_eq!(files["index.html"], INDEX);
    assert!(files.contains_key("README.md"));
    assert!(files.contains_key("LICENSE"));
    assert_eq!(h.host.hosting(repo).as_deref(), Some("building"));

    callback.assert_async().await;
}

#[tokio::test]
async fn round_two_updates_the_repository_named_by_url() {
    let h = harness(app_files());
    h.host.seed_repository(
        "quiz-20240101000000",
        &[("index.html", "<html>old</html>"), ("README.md", "# Old"), ("LICENSE", "MIT")],
    );
    let mut body = request("quiz", 2, "");
    body["repo_url"] = "https://github.com/alice/quiz-20240101000000.git".into();

    let (status, json) = post_json(pagesmith_server::build_router(h.state), "/build", body).await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["repo_url"], "https://github.com/alice/quiz-20240101000000");
    assert_eq!(json["notified"], false);
    assert_eq!(h.host.file("quiz-20240101000000", "index.html").as_deref(), Some(INDEX));

    let calls = h.host.calls();
    assert!(calls.contains(&HostCall::TriggerRebuild));
    assert!(!calls.iter().any(|c| matches!(c, HostCall::CreateRepository(_))));
    assert!(!calls.iter().any(|c| matches!(c, HostCall::EnableHosting { .. })));
}

#[tokio::test]
async fn round_two_without_a_repository_is_not_found() {
    let h = harness(app_files());
    h.host.seed_repository("other-20240101000000", &[("index.html", "x")]);

    let (status, json) = post_json(
        pagesmith_server::build_router(h.state),
        "/build",
        request("quiz", 2, ""),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], "error");
    assert!(!h.host.calls().iter().any(HostCall::is_write));
}

#[tokio::test]
async fn critical_file_failure_is_a_bad_gateway() {
    let h = harness(app_files());
    h.host.seed_repository("quiz-20240101000000", &[("index.html", "<html>old</html>")]);
    h.host.reject_updates("index.html");
    h.host.reject_creates("index.html");

    let mut body = request("quiz", 2, "");
    body["repo_url"] = "https://github.com/alice/quiz-20240101000000".into();
    let (status, json) = post_json(pagesmith_server::build_router(h.state), "/build", body).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json["detail"].as_str().unwrap().contains("index.html"));
    assert!(!h.host.calls().iter().any(HostCall::is_hosting));
}

#[tokio::test]
async fn repository_creation_failure_is_a_bad_gateway() {
    let h = harness(app_files());
    h.host.fail_repository_creation();

    let (status, json) = post_json(
        pagesmith_server::build_router(h.state),
        "/build",
        request("quiz", 1, ""),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(json["detail"].as_str().unwrap().contains("could not create repository"));
    assert!(!h.host.calls().iter().any(HostCall::is_write));
}
