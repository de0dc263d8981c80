// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Live per-user snapshot feed of activity records.
//!
//! Each subscribed user has one `watch` channel holding the latest full
//! snapshot of their records. A create triggers `refresh`, which reloads
//! the whole collection and publishes it. Nothing is delivered
//! incrementally.
//!
//! Refreshes are numbered before they start loading; a result is only
//! published if it is newer than what the channel already holds, so a slow
//! load can never overwrite a later snapshot.

use crate::db::Store;
use crate::models::ActivityRecord;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// One delivery from the record source.
#[derive(Debug, Clone)]
pub enum SourceEvent {
    /// No load has completed yet.
    Pending,
    /// The full current collection (possibly empty).
    Snapshot(Arc<Vec<ActivityRecord>>),
    /// Loading failed; any earlier snapshot is no longer current.
    Unavailable(String),
}

#[derive(Debug)]
struct Published {
    seq: u64,
    event: SourceEvent,
}

struct UserFeed {
    sender: watch::Sender<Published>,
    next_seq: AtomicU64,
    subscribers: AtomicUsize,
}

impl UserFeed {
    fn new() -> Self {
        let (sender, _) = watch::channel(Published {
            seq: 0,
            event: SourceEvent::Pending,
        });
        Self {
            sender,
            next_seq: AtomicU64::new(0),
            subscribers: AtomicUsize::new(0),
        }
    }
}

struct HubInner {
    store: Arc<dyn Store>,
    feeds: DashMap<String, Arc<UserFeed>>,
}

impl HubInner {
    async fn refresh(&self, user_id: &str) {
        let Some(feed) = self.feeds.get(user_id).map(|f| Arc::clone(&f)) else {
            tracing::trace!(user_id, "No subscribers, skipping snapshot refresh");
            return;
        };

        let seq = feed.next_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let event = match self.store.list_activities(user_id).await {
            Ok(records) => {
                tracing::debug!(user_id, seq, count = records.len(), "Snapshot loaded");
                SourceEvent::Snapshot(Arc::new(records))
            }
            Err(e) => {
                tracing::warn!(user_id, seq, error = %e, "Snapshot load failed");
                SourceEvent::Unavailable(e.to_string())
            }
        };

        let published = feed.sender.send_if_modified(|current| {
            if seq <= current.seq {
                return false;
            }
            *current = Published { seq, event };
            true
        });

        if !published {
            tracing::debug!(user_id, seq, "Discarding stale snapshot");
        }
    }

    fn release(&self, user_id: &str) {
        // The count is decremented under the shard lock so a concurrent
        // subscribe cannot pick up a feed that is about to be removed.
        let removed = self
            .feeds
            .remove_if(user_id, |_, feed| {
                feed.subscribers.fetch_sub(1, Ordering::SeqCst) == 1
            })
            .is_some();

        if removed {
            tracing::debug!(user_id, "Last subscription released, feed removed");
        }
    }
}

/// Record source handing out per-user snapshot subscriptions.
#[derive(Clone)]
pub struct SnapshotHub {
    inner: Arc<HubInner>,
}

impl SnapshotHub {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            inner: Arc::new(HubInner {
                store,
                feeds: DashMap::new(),
            }),
        }
    }

    /// Subscribe to a user's snapshots.
    ///
    /// The first subscriber for a user starts the initial load in the
    /// background; later subscribers see the current snapshot immediately.
    /// Must be called from within a tokio runtime.
    pub fn subscribe(&self, user_id: &str) -> Subscription {
        let (feed, created) = match self.inner.feeds.entry(user_id.to_string()) {
            Entry::Occupied(entry) => {
                let feed = Arc::clone(entry.get());
                feed.subscribers.fetch_add(1, Ordering::SeqCst);
                (feed, false)
            }
            Entry::Vacant(entry) => {
                let feed = Arc::new(UserFeed::new());
                feed.subscribers.fetch_add(1, Ordering::SeqCst);
                entry.insert(Arc::clone(&feed));
                (feed, true)
            }
        };

        let receiver = feed.sender.subscribe();
        tracing::debug!(user_id, new_feed = created, "Snapshot subscription opened");

        if created {
            let inner = Arc::clone(&self.inner);
            let user_id = user_id.to_string();
            tokio::spawn(async move { inner.refresh(&user_id).await });
        }

        Subscription {
            user_id: user_id.to_string(),
            receiver,
            last_seen: 0,
            hub: Arc::clone(&self.inner),
        }
    }

    /// Reload a user's full collection and deliver it to their subscribers.
    ///
    /// No-op when nobody is subscribed.
    pub async fn refresh(&self, user_id: &str) {
        self.inner.refresh(user_id).await;
    }

    /// Number of live subscriptions for a user.
    pub fn subscriber_count(&self, user_id: &str) -> usize {
        self.inner
            .feeds
            .get(user_id)
            .map(|feed| feed.subscribers.load(Ordering::SeqCst))
            .unwrap_or(0)
    }
}

/// A live registration for one user's snapshots. Dropping it releases it.
pub struct Subscription {
    user_id: String,
    receiver: watch::Receiver<Published>,
    last_seen: u64,
    hub: Arc<HubInner>,
}

impl Subscription {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Wait for a delivery this subscription has not returned yet.
    ///
    /// Only the latest delivery is observed; snapshots superseded while the
    /// caller was busy are skipped. Returns `None` once the feed is gone.
    pub async fn next(&mut self) -> Option<SourceEvent> {
        loop {
            {
                let current = self.receiver.borrow_and_update();
                if current.seq > self.last_seen {
                    self.last_seen = current.seq;
                    return Some(current.event.clone());
                }
            }
            if self.receiver.changed().await.is_err() {
                return None;
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.hub.release(&self.user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::error::AppError;
    use crate::models::BlogPost;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::time::Duration;
    use tokio::sync::oneshot;

    fn record(id: &str) -> ActivityRecord {
        ActivityRecord {
            id: id.to_string(),
            category: "travel".to_string(),
            subtype: "bus".to_string(),
            quantity: Some(5.0),
            co2: 0.5,
            date: "2024-06-01".to_string(),
            created_at: None,
            description: None,
        }
    }

    async fn next_event(subscription: &mut Subscription) -> SourceEvent {
        tokio::time::timeout(Duration::from_secs(2), subscription.next())
            .await
            .expect("timed out waiting for snapshot")
            .expect("feed closed")
    }

    fn snapshot_ids(event: &SourceEvent) -> Vec<String> {
        match event {
            SourceEvent::Snapshot(records) => {
                let mut ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
                ids.sort();
                ids
            }
            other => panic!("expected snapshot, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_initial_snapshot_may_be_empty() {
        let hub = SnapshotHub::new(Arc::new(MemoryStore::new()));
        let mut subscription = hub.subscribe("alice");
        assert_eq!(subscription.user_id(), "alice");

        let event = next_event(&mut subscription).await;
        assert!(snapshot_ids(&event).is_empty());
    }

    #[tokio::test]
    async fn test_refresh_redelivers_full_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let hub = SnapshotHub::new(store.clone());
        let mut subscription = hub.subscribe("alice");
        next_event(&mut subscription).await;

        store.insert_activity("alice", &record("1")).await.unwrap();
        hub.refresh("alice").await;
        assert_eq!(snapshot_ids(&next_event(&mut subscription).await), vec!["1"]);

        store.insert_activity("alice", &record("2")).await.unwrap();
        hub.refresh("alice").await;
        assert_eq!(
            snapshot_ids(&next_event(&mut subscription).await),
            vec!["1", "2"]
        );
    }

    #[tokio::test]
    async fn test_late_subscriber_sees_current_snapshot() {
        let store = Arc::new(MemoryStore::new());
        store.insert_activity("alice", &record("1")).await.unwrap();
        let hub = SnapshotHub::new(store);

        let mut first = hub.subscribe("alice");
        next_event(&mut first).await;

        let mut second = hub.subscribe("alice");
        assert_eq!(snapshot_ids(&next_event(&mut second).await), vec!["1"]);
        assert_eq!(hub.subscriber_count("alice"), 2);
    }

    #[tokio::test]
    async fn test_store_failure_is_delivered_as_unavailable() {
        let store = Arc::new(MemoryStore::new());
        let hub = SnapshotHub::new(store.clone());
        let mut subscription = hub.subscribe("alice");
        next_event(&mut subscription).await;

        store.set_available(false);
        hub.refresh("alice").await;

        assert!(matches!(
            next_event(&mut subscription).await,
            SourceEvent::Unavailable(_)
        ));
    }

    #[tokio::test]
    async fn test_dropping_last_subscription_removes_feed() {
        let hub = SnapshotHub::new(Arc::new(MemoryStore::new()));
        let first = hub.subscribe("alice");
        let second = hub.subscribe("alice");
        assert_eq!(hub.subscriber_count("alice"), 2);

        drop(first);
        assert_eq!(hub.subscriber_count("alice"), 1);

        drop(second);
        assert_eq!(hub.subscriber_count("alice"), 0);
        assert!(hub.inner.feeds.get("alice").is_none());
    }

    #[tokio::test]
    async fn test_refresh_without_subscribers_is_noop() {
        let store = Arc::new(MemoryStore::new());
        let hub = SnapshotHub::new(store);

        hub.refresh("nobody").await;
        assert_eq!(hub.subscriber_count("nobody"), 0);
    }

    /// Store whose loads complete only when the test releases them.
    struct GatedStore {
        gates: std::sync::Mutex<VecDeque<oneshot::Receiver<Vec<ActivityRecord>>>>,
    }

    #[async_trait]
    impl Store for GatedStore {
        async fn insert_activity(&self, _: &str, _: &ActivityRecord) -> Result<(), AppError> {
            Ok(())
        }

        async fn list_activities(&self, _: &str) -> Result<Vec<ActivityRecord>, AppError> {
            let gate = self.gates.lock().unwrap().pop_front().expect("unexpected load");
            gate.await
                .map_err(|_| AppError::Database("gate dropped".to_string()))
        }

        async fn insert_blog_post(&self, _: &BlogPost) -> Result<(), AppError> {
            Ok(())
        }

        async fn list_blog_posts(&self, _: u32) -> Result<Vec<BlogPost>, AppError> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_stale_refresh_does_not_overwrite_newer_snapshot() {
        let (initial_tx, initial_rx) = oneshot::channel();
        let (older_tx, older_rx) = oneshot::channel();
        let (newer_tx, newer_rx) = oneshot::channel();
        let store = GatedStore {
            gates: std::sync::Mutex::new(VecDeque::from([initial_rx, older_rx, newer_rx])),
        };
        let hub = SnapshotHub::new(Arc::new(store));

        let mut subscription = hub.subscribe("alice");
        initial_tx.send(vec![]).unwrap();
        next_event(&mut subscription).await;

        let older = tokio::spawn({
            let hub = hub.clone();
            async move { hub.refresh("alice").await }
        });
        tokio::task::yield_now().await;
        let newer = tokio::spawn({
            let hub = hub.clone();
            async move { hub.refresh("alice").await }
        });
        tokio::task::yield_now().await;

        // The later refresh finishes first; the earlier one must be dropped.
        newer_tx.send(vec![record("new")]).unwrap();
        newer.await.unwrap();
        older_tx.send(vec![record("old")]).unwrap();
        older.await.unwrap();

        assert_eq!(snapshot_ids(&next_event(&mut subscription).await), vec!["new"]);
        let feed = Arc::clone(&*hub.inner.feeds.get("alice").unwrap());
        assert_eq!(feed.sender.borrow().seq, 3);
    }

    #[tokio::test]
    async fn test_users_are_isolated() {
        let store = Arc::new(MemoryStore::new());
        store.insert_activity("bob", &record("b1")).await.unwrap();
        let hub = SnapshotHub::new(store);

        let mut alice = hub.subscribe("alice");
        let mut bob = hub.subscribe("bob");

        assert!(snapshot_ids(&next_event(&mut alice).await).is_empty());
        assert_eq!(snapshot_ids(&next_event(&mut bob).await), vec!["b1"]);
    }
}
