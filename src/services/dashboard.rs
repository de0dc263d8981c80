// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard session: one user's snapshot subscription plus aggregation.

use crate::middleware::auth::AuthUser;
use crate::models::AggregateView;
use crate::services::aggregator::aggregate;
use crate::services::record_source::{SnapshotHub, SourceEvent, Subscription};
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// What the dashboard should show right now.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DashboardState {
    Loading,
    Ready { view: AggregateView },
    /// The record source failed; no view is current.
    Unavailable { reason: String },
}

impl DashboardState {
    /// Translate one source delivery. Snapshots are aggregated from scratch.
    pub fn from_event(event: &SourceEvent) -> Self {
        match event {
            SourceEvent::Pending => DashboardState::Loading,
            SourceEvent::Snapshot(records) => DashboardState::Ready {
                view: aggregate(records),
            },
            SourceEvent::Unavailable(reason) => DashboardState::Unavailable {
                reason: reason.clone(),
            },
        }
    }
}

/// Owns exactly one subscription for one signed-in user.
///
/// Dropping the session (sign-out, closed stream) releases the
/// subscription.
pub struct DashboardSession {
    user: AuthUser,
    subscription: Subscription,
}

impl DashboardSession {
    pub fn start(snapshots: &SnapshotHub, user: AuthUser) -> Self {
        tracing::info!(user_id = %user.user_id, "Dashboard session started");
        let subscription = snapshots.subscribe(&user.user_id);
        Self { user, subscription }
    }

    pub fn user(&self) -> &AuthUser {
        &self.user
    }

    /// Wait for the next delivery and recompute the dashboard from it.
    ///
    /// Each state replaces the previous one. `None` when the source is gone.
    pub async fn next_state(&mut self) -> Option<DashboardState> {
        let event = self.subscription.next().await?;
        let state = DashboardState::from_event(&event);
        if let DashboardState::Ready { view } = &state {
            tracing::debug!(
                user_id = %self.user.user_id,
                total_emissions = view.total_emissions,
                days = view.daily_totals.len(),
                "Dashboard recomputed"
            );
        }
        Some(state)
    }
}

impl Drop for DashboardSession {
    fn drop(&mut self) {
        tracing::info!(user_id = %self.user.user_id, "Dashboard session ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, Store};
    use crate::models::ActivityRecord;
    use std::sync::Arc;
    use std::time::Duration;

    fn user(id: &str) -> AuthUser {
        AuthUser {
            user_id: id.to_string(),
            display_name: None,
        }
    }

    fn record(id: &str, co2: f64) -> ActivityRecord {
        ActivityRecord {
            id: id.to_string(),
            category: "food".to_string(),
            subtype: "mixed".to_string(),
            quantity: None,
            co2,
            date: "2024-06-01".to_string(),
            created_at: None,
            description: None,
        }
    }

    async fn next(session: &mut DashboardSession) -> DashboardState {
        tokio::time::timeout(Duration::from_secs(2), session.next_state())
            .await
            .expect("timed out")
            .expect("source closed")
    }

    #[tokio::test]
    async fn test_session_recomputes_on_every_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let hub = SnapshotHub::new(store.clone());
        let mut session = DashboardSession::start(&hub, user("alice"));

        match next(&mut session).await {
            DashboardState::Ready { view } => assert_eq!(view, AggregateView::default()),
            other => panic!("unexpected state {:?}", other),
        }

        store.insert_activity("alice", &record("1", 5.0)).await.unwrap();
        hub.refresh("alice").await;

        match next(&mut session).await {
            DashboardState::Ready { view } => {
                assert_eq!(view.category_totals.food, 5.0);
                assert_eq!(view.recent_activities.len(), 1);
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_source_failure_replaces_view() {
        let store = Arc::new(MemoryStore::new());
        store.insert_activity("alice", &record("1", 5.0)).await.unwrap();
        let hub = SnapshotHub::new(store.clone());
        let mut session = DashboardSession::start(&hub, user("alice"));
        assert!(matches!(next(&mut session).await, DashboardState::Ready { .. }));

        store.set_available(false);
        hub.refresh("alice").await;

        assert!(matches!(
            next(&mut session).await,
            DashboardState::Unavailable { .. }
        ));
    }

    #[tokio::test]
    async fn test_dropping_session_releases_subscription() {
        let hub = SnapshotHub::new(Arc::new(MemoryStore::new()));
        let session = DashboardSession::start(&hub, user("alice"));
        assert_eq!(hub.subscriber_count("alice"), 1);

        drop(session);
        assert_eq!(hub.subscriber_count("alice"), 0);
    }

    #[test]
    fn test_state_serialization() {
        let state = DashboardState::Unavailable {
            reason: "down".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&state).unwrap(),
            serde_json::json!({"state": "unavailable", "reason": "down"})
        );
        assert_eq!(
            serde_json::to_value(DashboardState::Loading).unwrap(),
            serde_json::json!({"state": "loading"})
        );
    }
}
