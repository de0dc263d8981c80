// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer (Firestore, plus an in-memory store for tests and local runs).

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::models::{ActivityRecord, BlogPost};
use async_trait::async_trait;

/// Collection names as constants.
pub mod collections {
    /// Parent collection for per-user data
    pub const USERS: &str = "users";
    /// Activity records, a subcollection of `users/{user_id}`
    pub const ACTIVITIES: &str = "activities";
    pub const BLOGS: &str = "blogs";
}

/// Persistence operations the service needs.
#[async_trait]
pub trait Store: Send + Sync {
    /// Persist a new activity record for a user.
    async fn insert_activity(&self, user_id: &str, record: &ActivityRecord)
        -> Result<(), AppError>;

    /// Full current collection of a user's activity records, in no
    /// particular order. Undecodable documents are skipped.
    async fn list_activities(&self, user_id: &str) -> Result<Vec<ActivityRecord>, AppError>;

    async fn insert_blog_post(&self, post: &BlogPost) -> Result<(), AppError>;

    /// Most recent blog posts first.
    async fn list_blog_posts(&self, limit: u32) -> Result<Vec<BlogPost>, AppError>;
}
