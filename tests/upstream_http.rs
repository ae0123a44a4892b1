//! RedditSource and OpenAiClient against local fake upstreams

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use threadsift::classify::{FieldSpec, FieldType, LanguageModel, OpenAiClient, ResponseSchema};
use threadsift::config::{LlmConfig, RedditConfig};
use threadsift::source::{RedditSource, ThreadSource};
use threadsift::Error;

/// Serve `app` on a random local port and return its base URL
async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

// ============================================
// REDDIT
// ============================================

#[derive(Default)]
struct FakeReddit {
    tokens_issued: AtomicUsize,
    listing_calls: AtomicUsize,
}

fn link(id: &str) -> Value {
    json!({"kind": "t3", "data": {"id": id, "title": id.to_uppercase(), "created_utc": 1700000000.0}})
}

fn listing(children: Vec<Value>, after: Option<&str>) -> Response {
    Json(json!({"kind": "Listing", "data": {"after": after, "children": children}})).into_response()
}

async fn access_token(State(reddit): State<Arc<FakeReddit>>) -> Json<Value> {
    let n = reddit.tokens_issued.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({"access_token": format!("token-{}", n), "token_type": "bearer"}))
}

async fn newest(
    State(reddit): State<Arc<FakeReddit>>,
    Path(name): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    reddit.listing_calls.fetch_add(1, Ordering::SeqCst);
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    match name.as_str() {
        "throttled" => (StatusCode::TOO_MANY_REQUESTS, [(header::RETRY_AFTER, "30")]).into_response(),
        "banned" => (StatusCode::FORBIDDEN, "banned").into_response(),
        "stale_token" if bearer == "Bearer token-1" => StatusCode::UNAUTHORIZED.into_response(),
        "stale_token" => listing(vec![link("a")], None),
        "paged" => match query.get("after").map(String::as_str) {
            None => listing(vec![link("a"), link("b")], Some("t3_b")),
            Some("t3_b") => listing(vec![link("c")], None),
            Some(_) => StatusCode::BAD_REQUEST.into_response(),
        },
        "empty_page" => listing(vec![], Some("t3_z")),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn reddit_source() -> (RedditSource, Arc<FakeReddit>) {
    let reddit = Arc::new(FakeReddit::default());
    let app = Router::new()
        .route("/api/v1/access_token", post(access_token))
        .route("/r/{name}/new", get(newest))
        .with_state(reddit.clone());
    let base = serve(app).await;

    let source = RedditSource::new(RedditConfig {
        client_id: "id".to_string(),
        client_secret: "secret".to_string(),
        username: "bot".to_string(),
        password: "hunter2".to_string(),
        api_base: base.clone(),
        auth_url: format!("{}/api/v1/access_token", base),
        ..Default::default()
    });
    (source, reddit)
}

#[tokio::test]
async fn test_listing_429_is_rate_limited() {
    let (source, _) = reddit_source().await;
    let err = source.newest_submissions("throttled").await.unwrap_err();
    assert!(matches!(
        err,
        Error::RateLimited {
            retry_after_secs: Some(30)
        }
    ));
}

#[tokio::test]
async fn test_listing_forbidden_is_upstream_error() {
    let (source, _) = reddit_source().await;
    let err = source.newest_submissions("banned").await.unwrap_err();
    assert!(!err.is_rate_limited());
    assert!(matches!(err, Error::Upstream { status: 403, .. }));
}

#[tokio::test]
async fn test_rejected_token_is_renewed_once() {
    let (source, reddit) = reddit_source().await;
    let submissions = source.newest_submissions("stale_token").await.unwrap();

    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].id, "a");
    assert_eq!(reddit.tokens_issued.load(Ordering::SeqCst), 2);
    assert_eq!(reddit.listing_calls.load(Ordering::SeqCst), 2);

    // The renewed token is cached
    source.newest_submissions("stale_token").await.unwrap();
    assert_eq!(reddit.tokens_issued.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_listing_follows_after_cursor_until_exhausted() {
    let (source, reddit) = reddit_source().await;
    let submissions = source.newest_submissions("paged").await.unwrap();

    let ids: Vec<&str> = submissions.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(submissions[0].title, "A");
    assert_eq!(reddit.listing_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_listing_stops_on_empty_page() {
    let (source, reddit) = reddit_source().await;
    let submissions = source.newest_submissions("empty_page").await.unwrap();

    assert!(submissions.is_empty());
    assert_eq!(reddit.listing_calls.load(Ordering::SeqCst), 1);
}

// ============================================
// OPENAI
// ============================================

#[derive(Clone)]
struct FakeOpenAi {
    status: StatusCode,
    bodies: Arc<Mutex<Vec<String>>>,
}

async fn completions(State(fake): State<FakeOpenAi>, body: String) -> Response {
    fake.bodies.lock().unwrap().push(body);
    if fake.status == StatusCode::OK {
        Json(json!({
            "choices": [{"message": {"content": "{\"verdict\": true, \"explanation\": \"x\", \"alpha_score\": 1}"}}]
        }))
        .into_response()
    } else if fake.status == StatusCode::TOO_MANY_REQUESTS {
        (fake.status, [(header::RETRY_AFTER, "7")]).into_response()
    } else {
        (fake.status, "model overloaded").into_response()
    }
}

async fn openai_client(status: StatusCode) -> (OpenAiClient, Arc<Mutex<Vec<String>>>) {
    let fake = FakeOpenAi {
        status,
        bodies: Arc::new(Mutex::new(Vec::new())),
    };
    let bodies = fake.bodies.clone();
    let app = Router::new()
        .route("/chat/completions", post(completions))
        .with_state(fake);
    let base = serve(app).await;

    let client = OpenAiClient::new(&LlmConfig {
        api_key: "sk-test".to_string(),
        base_url: base,
        ..Default::default()
    });
    (client, bodies)
}

fn verdict_schema() -> ResponseSchema {
    ResponseSchema::new(
        "Verdict",
        vec![
            FieldSpec::new("verdict", FieldType::Bool),
            FieldSpec::new("explanation", FieldType::Str),
            FieldSpec::new("alpha_score", FieldType::Int),
        ],
    )
}

#[tokio::test]
async fn test_model_answer_is_parsed() {
    let (client, bodies) = openai_client(StatusCode::OK).await;
    let answer = client
        .structured("Judge it", "Title: x", &verdict_schema())
        .await
        .unwrap();
    assert_eq!(answer["alpha_score"], 1);

    // Properties go out in field order
    let sent: Value = serde_json::from_str(&bodies.lock().unwrap()[0]).unwrap();
    let properties: Vec<&String> = sent["response_format"]["json_schema"]["schema"]["properties"]
        .as_object()
        .unwrap()
        .keys()
        .collect();
    assert_eq!(properties, vec!["verdict", "explanation", "alpha_score"]);
}

#[tokio::test]
async fn test_model_429_is_rate_limited() {
    let (client, _) = openai_client(StatusCode::TOO_MANY_REQUESTS).await;
    let err = client
        .structured("Judge it", "Title: x", &verdict_schema())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::RateLimited {
            retry_after_secs: Some(7)
        }
    ));
}

#[tokio::test]
async fn test_model_server_error_is_upstream() {
    let (client, _) = openai_client(StatusCode::SERVICE_UNAVAILABLE).await;
    let err = client
        .structured("Judge it", "Title: x", &verdict_schema())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Upstream { status: 503, .. }));
}
