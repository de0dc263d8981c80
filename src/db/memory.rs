// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store used by tests and offline development.

use crate::db::Store;
use crate::error::AppError;
use crate::models::{ActivityRecord, BlogPost};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// Activity records keyed by user, plus blog posts.
///
/// `set_available(false)` makes every call fail, to exercise outage paths.
#[derive(Default)]
pub struct MemoryStore {
    activities: DashMap<String, Vec<ActivityRecord>>,
    blog_posts: RwLock<Vec<BlogPost>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::Database("Store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_activity(
        &self,
        user_id: &str,
        record: &ActivityRecord,
    ) -> Result<(), AppError> {
        self.check_available()?;
        let mut records = self.activities.entry(user_id.to_string()).or_default();
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        Ok(())
    }

    async fn list_activities(&self, user_id: &str) -> Result<Vec<ActivityRecord>, AppError> {
        self.check_available()?;
        Ok(self
            .activities
            .get(user_id)
            .map(|records| records.clone())
            .unwrap_or_default())
    }

    async fn insert_blog_post(&self, post: &BlogPost) -> Result<(), AppError> {
        self.check_available()?;
        let mut posts = self
            .blog_posts
            .write()
            .map_err(|_| AppError::Database("Blog store poisoned".to_string()))?;
        posts.retain(|p| p.id != post.id);
        posts.push(post.clone());
        Ok(())
    }

    async fn list_blog_posts(&self, limit: u32) -> Result<Vec<BlogPost>, AppError> {
        self.check_available()?;
        let posts = self
            .blog_posts
            .read()
            .map_err(|_| AppError::Database("Blog store poisoned".to_string()))?;
        let mut newest_first = posts.clone();
        newest_first.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        newest_first.truncate(limit as usize);
        Ok(newest_first)
    }
}
