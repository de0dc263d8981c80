// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Community blog posts.

use crate::db::Store;
use crate::error::{Result, ValidationError};
use crate::middleware::auth::AuthUser;
use crate::models::{BlogPost, NewBlogPost};
use crate::time_utils::format_utc_rfc3339;
use std::sync::Arc;
use validator::Validate;

/// Default and maximum number of posts returned by a listing.
pub const DEFAULT_POST_LIMIT: u32 = 50;

const ANONYMOUS_AUTHOR: &str = "Anonymous";

#[derive(Clone)]
pub struct BlogService {
    store: Arc<dyn Store>,
}

impl BlogService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Newest posts first.
    pub async fn list_posts(&self, limit: Option<u32>) -> Result<Vec<BlogPost>> {
        let limit = limit
            .unwrap_or(DEFAULT_POST_LIMIT)
            .clamp(1, DEFAULT_POST_LIMIT);
        self.store.list_blog_posts(limit).await
    }

    pub async fn create_post(&self, author: &AuthUser, post: NewBlogPost) -> Result<BlogPost> {
        let post = post.trimmed();
        post.validate().map_err(|e| {
            let message = e
                .field_errors()
                .values()
                .flat_map(|errors| errors.iter())
                .filter_map(|error| error.message.as_ref().map(|m| m.to_string()))
                .next()
                .unwrap_or_else(|| "Invalid blog post".to_string());
            ValidationError::Field(message)
        })?;

        let record = BlogPost {
            id: uuid::Uuid::new_v4().to_string(),
            title: post.title,
            content: post.content,
            author_name: author
                .display_name
                .clone()
                .unwrap_or_else(|| ANONYMOUS_AUTHOR.to_string()),
            author_id: author.user_id.clone(),
            created_at: format_utc_rfc3339(chrono::Utc::now()),
        };

        self.store.insert_blog_post(&record).await?;
        tracing::info!(post_id = %record.id, author_id = %record.author_id, "Blog post created");

        Ok(record)
    }
}
