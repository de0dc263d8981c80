// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{ActivityRecord, AggregateView, BlogPost, NewActivity, NewBlogPost};
use crate::services::{DashboardSession, DashboardState};
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Extension, Json, Router,
};
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const DEFAULT_PER_PAGE: usize = 50;
const MAX_PER_PAGE: usize = 100;
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/activities", post(create_activity).get(get_activities))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/dashboard/stream", get(stream_dashboard))
        .route("/api/blog/posts", post(create_blog_post))
}

// ─── Activities ──────────────────────────────────────────────

/// Log an activity. CO₂e is computed here and never recomputed.
async fn create_activity(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(submission): Json<NewActivity>,
) -> Result<(StatusCode, Json<ActivityRecord>)> {
    let record = state.activity_service.submit(&user, submission).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[derive(Deserialize)]
struct ActivitiesQuery {
    #[serde(default = "default_per_page")]
    per_page: usize,
}

fn default_per_page() -> usize {
    DEFAULT_PER_PAGE
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivitiesResponse {
    pub activities: Vec<ActivityRecord>,
}

/// Dated activities, newest first.
async fn get_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<ActivitiesQuery>,
) -> Result<Json<ActivitiesResponse>> {
    let limit = params.per_page.clamp(1, MAX_PER_PAGE);
    let activities = state.activity_service.list(&user, limit).await?;
    Ok(Json(ActivitiesResponse { activities }))
}

// ─── Dashboard ───────────────────────────────────────────────

async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<AggregateView>> {
    Ok(Json(state.activity_service.dashboard(&user).await?))
}

#[derive(Serialize)]
struct UnavailablePayload<'a> {
    reason: &'a str,
}

/// Live dashboard: one `dashboard` event per snapshot, `unavailable` when
/// the store fails. The subscription ends with the stream.
async fn stream_dashboard(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let session = DashboardSession::start(&state.snapshots, user);

    let events = stream::unfold(session, |mut session| async move {
        loop {
            let dashboard = session.next_state().await?;
            if let Some(event) = to_sse_event(&session, &dashboard) {
                return Some((Ok(event), session));
            }
        }
    });

    Sse::new(events).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    )
}

fn to_sse_event(session: &DashboardSession, state: &DashboardState) -> Option<Event> {
    let result = match state {
        DashboardState::Loading => return None,
        DashboardState::Ready { view } => Event::default().event("dashboard").json_data(view),
        DashboardState::Unavailable { reason } => Event::default()
            .event("unavailable")
            .json_data(UnavailablePayload { reason }),
    };

    match result {
        Ok(event) => Some(event),
        Err(err) => {
            tracing::error!(
                user_id = %session.user().user_id,
                error = %err,
                "Failed to serialize dashboard event"
            );
            None
        }
    }
}

// ─── Blog ────────────────────────────────────────────────────

async fn create_blog_post(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(post): Json<NewBlogPost>,
) -> Result<(StatusCode, Json<BlogPost>)> {
    let created = state.blog_service.create_post(&user, post).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
