// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! News client tests against a fake generateContent endpoint on loopback.

use axum::{
    body::Body,
    extract::{Query, State},
    http::{Request, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use carbon_tracker::error::AppError;
use carbon_tracker::services::{NewsService, RetryPolicy};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

mod common;

/// Replies are served in order; the last one repeats.
struct FakeApi {
    replies: Mutex<VecDeque<(StatusCode, Value)>>,
    calls: AtomicUsize,
    last_key: Mutex<Option<String>>,
}

async fn generate(
    State(api): State<Arc<FakeApi>>,
    Query(params): Query<HashMap<String, String>>,
    Json(_payload): Json<Value>,
) -> impl IntoResponse {
    api.calls.fetch_add(1, Ordering::SeqCst);
    *api.last_key.lock().unwrap() = params.get("key").cloned();

    let mut replies = api.replies.lock().unwrap();
    let (status, body) = if replies.len() > 1 {
        replies.pop_front().unwrap()
    } else {
        replies.front().cloned().unwrap()
    };
    (status, Json(body))
}

async fn spawn_fake(replies: Vec<(StatusCode, Value)>) -> (String, Arc<FakeApi>) {
    let api = Arc::new(FakeApi {
        replies: Mutex::new(replies.into()),
        calls: AtomicUsize::new(0),
        last_key: Mutex::new(None),
    });

    let app = Router::new()
        .route("/generate", post(generate))
        .with_state(api.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}/generate", addr), api)
}

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_backoff_ms: 1,
        max_backoff_ms: 5,
    }
}

fn grounded_reply() -> Value {
    json!({
        "candidates": [{
            "finishReason": "STOP",
            "content": { "parts": [{ "text": "Here are some articles." }] },
            "groundingMetadata": {
                "groundingAttributions": [
                    { "web": { "uri": "https://news.example/a", "title": "Sea levels rising" } },
                    { "web": { "uri": "https://news.example/b", "title": "New carbon tax" } }
                ]
            }
        }]
    })
}

#[tokio::test]
async fn test_server_errors_retried_until_success() {
    let (url, api) = spawn_fake(vec![
        (StatusCode::INTERNAL_SERVER_ERROR, json!({})),
        (StatusCode::SERVICE_UNAVAILABLE, json!({})),
        (StatusCode::OK, grounded_reply()),
    ])
    .await;

    let news = NewsService::new(url, "test-key")
        .unwrap()
        .with_retry_policy(fast_retry());
    let articles = news.fetch_articles().await.unwrap();

    assert_eq!(api.calls.load(Ordering::SeqCst), 3);
    assert_eq!(api.last_key.lock().unwrap().as_deref(), Some("test-key"));
    assert_eq!(articles.len(), 2);
    assert_eq!(articles[0].title, "Sea levels rising");
}

#[tokio::test]
async fn test_retries_stop_at_attempt_limit() {
    let (url, api) = spawn_fake(vec![(StatusCode::INTERNAL_SERVER_ERROR, json!({}))]).await;

    let news = NewsService::new(url, "test-key")
        .unwrap()
        .with_retry_policy(fast_retry());
    let err = news.fetch_articles().await.unwrap_err();

    assert_eq!(api.calls.load(Ordering::SeqCst), 3);
    assert!(matches!(err, AppError::NewsApi(_)));
}

#[tokio::test]
async fn test_bad_request_not_retried() {
    let (url, api) = spawn_fake(vec![(
        StatusCode::BAD_REQUEST,
        json!({"error": {"message": "API key not valid"}}),
    )])
    .await;

    let news = NewsService::new(url, "bad-key")
        .unwrap()
        .with_retry_policy(fast_retry());
    let err = news.fetch_articles().await.unwrap_err();

    assert_eq!(api.calls.load(Ordering::SeqCst), 1);
    assert!(err.to_string().contains("API key not valid"), "{}", err);
}

#[tokio::test]
async fn test_news_route_serves_articles() {
    let (url, _api) = spawn_fake(vec![(StatusCode::OK, grounded_reply())]).await;
    let news = NewsService::new(url, "test-key")
        .unwrap()
        .with_retry_policy(fast_retry());
    let app = common::create_test_app_with_news(Some(news));

    let response = app
        .router
        .oneshot(Request::builder().uri("/news").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = common::json_body(response).await;
    assert_eq!(body["articles"][1]["uri"], "https://news.example/b");
}

#[tokio::test]
async fn test_news_route_unconfigured() {
    let app = common::create_test_app();

    let response = app
        .router
        .oneshot(Request::builder().uri("/news").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = common::json_body(response).await;
    assert_eq!(body["error"], "news_unavailable");
}
