// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Climate news from a generative-text API with web search grounding.
//!
//! The API is asked for recent articles. Grounding attributions are
//! preferred; when the response carries none, links are scraped from the
//! generated text instead.

use crate::error::{AppError, Result};
use crate::models::NewsArticle;
use anyhow::Context;
use regex::Regex;
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const SYSTEM_PROMPT: &str = "You are an assistant that finds and lists recent news articles \
about global warming and climate change. Provide web search results with links (URLs) and \
titles for each article. Focus on factual news reports from reputable sources published recently.";

const USER_QUERY: &str = "List 3-5 recent news articles (from the last month if available) \
about global warming, climate change impacts, relevant policy, or major sustainability \
projects. Format each as Title and URL.";

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 1_000,
            max_backoff_ms: 8_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryDecision {
    Retryable,
    NonRetryable,
}

fn retry_decision_for_status(status: reqwest::StatusCode) -> RetryDecision {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        RetryDecision::Retryable
    } else {
        RetryDecision::NonRetryable
    }
}

/// Backoff before the attempt following `attempt` (1-based).
fn retry_delay(attempt: u32, policy: &RetryPolicy) -> Duration {
    let exponent = 2u64.saturating_pow(attempt.saturating_sub(1));
    let millis = policy
        .initial_backoff_ms
        .saturating_mul(exponent)
        .min(policy.max_backoff_ms);
    Duration::from_millis(millis)
}

async fn send_with_retry(
    request: reqwest::RequestBuilder,
    policy: &RetryPolicy,
) -> Result<reqwest::Response> {
    let attempts = policy.max_attempts.max(1);
    for attempt in 1..=attempts {
        let Some(cloned) = request.try_clone() else {
            return request
                .send()
                .await
                .map_err(|e| AppError::NewsApi(e.to_string()));
        };

        match cloned.send().await {
            Ok(response) => {
                let status = response.status();
                if retry_decision_for_status(status) == RetryDecision::Retryable
                    && attempt < attempts
                {
                    let delay = retry_delay(attempt, policy);
                    tracing::warn!(
                        attempt,
                        attempts,
                        status = %status,
                        delay_ms = delay.as_millis() as u64,
                        "News API request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Ok(response);
            }
            Err(err) => {
                let retryable_transport = err.is_timeout() || err.is_connect();
                if retryable_transport && attempt < attempts {
                    let delay = retry_delay(attempt, policy);
                    tracing::warn!(
                        attempt,
                        attempts,
                        error = %err,
                        delay_ms = delay.as_millis() as u64,
                        "News API transport error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
                return Err(AppError::NewsApi(err.to_string()));
            }
        }
    }

    Err(AppError::NewsApi("Request exhausted retries".to_string()))
}

// ─── Response shapes ─────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_attributions: Vec<GroundingAttribution>,
}

#[derive(Debug, Deserialize)]
struct GroundingAttribution {
    web: Option<WebSource>,
}

#[derive(Debug, Deserialize)]
struct WebSource {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
}

/// Client for the news feed.
#[derive(Clone)]
pub struct NewsService {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    retry: RetryPolicy,
}

impl NewsService {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("failed building news HTTP client")?;

        Ok(Self {
            http,
            api_url: api_url.into(),
            api_key: api_key.into(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch recent climate news articles.
    pub async fn fetch_articles(&self) -> Result<Vec<NewsArticle>> {
        let payload = json!({
            "contents": [{ "parts": [{ "text": USER_QUERY }] }],
            "tools": [{ "google_search": {} }],
            "systemInstruction": { "parts": [{ "text": SYSTEM_PROMPT }] },
        });

        let request = self
            .http
            .post(&self.api_url)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload);

        let response = send_with_retry(request, &self.retry).await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "News API returned an error");
            return Err(AppError::NewsApi(error_message(status, &body)));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::NewsApi(format!("Unexpected response format: {}", e)))?;

        let articles = articles_from_response(parsed)?;
        tracing::debug!(count = articles.len(), "Fetched news articles");
        Ok(articles)
    }
}

fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    if status == reqwest::StatusCode::BAD_REQUEST {
        let message = serde_json::from_str::<ApiErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .and_then(|e| e.message)
            .unwrap_or_else(|| "Bad Request".to_string());
        return format!("API Request Error (400): {}", message);
    }
    format!("Request failed with status {}", status.as_u16())
}

fn articles_from_response(response: GenerateResponse) -> Result<Vec<NewsArticle>> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        return Err(match response.prompt_feedback.and_then(|f| f.block_reason) {
            Some(reason) => AppError::NewsApi(format!("API request blocked: {}", reason)),
            None => AppError::NewsApi("No valid candidates found in API response".to_string()),
        });
    };

    if let Some(reason) = candidate.finish_reason.as_deref() {
        if reason != "STOP" && reason != "MAX_TOKENS" {
            return Err(AppError::NewsApi(format!(
                "API call finished unexpectedly: {}",
                reason
            )));
        }
    }

    let attributions = candidate
        .grounding_metadata
        .map(|m| m.grounding_attributions)
        .unwrap_or_default();

    if !attributions.is_empty() {
        let sources = attributions.into_iter().filter_map(|a| {
            let web = a.web?;
            match (web.uri, web.title) {
                (Some(uri), Some(title)) if !uri.is_empty() && !title.is_empty() => {
                    Some(NewsArticle { title, uri })
                }
                _ => None,
            }
        });
        return Ok(dedup_by_uri(sources));
    }

    let text = candidate
        .content
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .ok_or_else(|| {
            AppError::NewsApi("No valid content or grounding metadata in API response".to_string())
        })?;

    tracing::warn!("Grounding metadata missing, parsing links from text");
    let articles = parse_news_from_text(&text);
    if articles.is_empty() {
        return Err(AppError::NewsApi(
            "No news links found in the response text".to_string(),
        ));
    }
    Ok(articles)
}

fn link_regex() -> &'static Regex {
    static LINK_RE: OnceLock<Regex> = OnceLock::new();
    LINK_RE.get_or_init(|| {
        Regex::new(r"\[([^\]]+)\]\((https?://[^\s)]+)\)|(https?://\S+)")
            .expect("link regex should compile")
    })
}

fn extension_regex() -> &'static Regex {
    static EXTENSION_RE: OnceLock<Regex> = OnceLock::new();
    EXTENSION_RE.get_or_init(|| {
        Regex::new(r"(?i)\.(html|php|asp|aspx)$").expect("extension regex should compile")
    })
}

/// Extract markdown links and bare URLs from free text, unique by uri.
pub fn parse_news_from_text(text: &str) -> Vec<NewsArticle> {
    let articles = link_regex().captures_iter(text).filter_map(|caps| {
        if let (Some(title), Some(uri)) = (caps.get(1), caps.get(2)) {
            return Some(NewsArticle {
                title: title.as_str().trim().to_string(),
                uri: uri.as_str().trim().to_string(),
            });
        }
        let uri = caps.get(3)?.as_str().trim().to_string();
        Some(NewsArticle {
            title: title_from_url(&uri),
            uri,
        })
    });
    dedup_by_uri(articles)
}

/// Human-friendly title for a bare URL, from its last path segment or,
/// when the path ends in a slash, its hostname.
fn title_from_url(raw: &str) -> String {
    let Ok(url) = Url::parse(raw) else {
        return "News Source Link".to_string();
    };
    let host = url.host_str().unwrap_or_default().to_string();

    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default()
        .replace(['-', '_'], " ");
    let segment = if segment.is_empty() {
        host.clone()
    } else {
        segment
    };
    let title = extension_regex().replace(&segment, "").into_owned();

    let mut chars = title.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None if host.is_empty() => "News Source Link".to_string(),
        None => format!("Source: {}", host),
    }
}

fn dedup_by_uri(articles: impl IntoIterator<Item = NewsArticle>) -> Vec<NewsArticle> {
    let mut seen = HashSet::new();
    articles
        .into_iter()
        .filter(|a| seen.insert(a.uri.clone()))
        .collect()
}
