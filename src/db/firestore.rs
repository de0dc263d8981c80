// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Activities (per-user subcollection under `users/{user_id}`)
//! - Blog posts (top-level collection)

use crate::db::{collections, Store};
use crate::error::AppError;
use crate::models::{ActivityRecord, BlogPost};
use async_trait::async_trait;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // The emulator accepts any bearer token; skip credential discovery.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a disconnected client (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Path of a user's document, the parent of their activity records.
    fn user_path(&self, user_id: &str) -> Result<firestore::ParentPathBuilder, AppError> {
        self.get_client()?
            .parent_path(collections::USERS, user_id)
            .map_err(|e| AppError::Database(format!("Invalid user path: {}", e)))
    }
}

#[async_trait]
impl Store for FirestoreDb {
    // ─── Activity Operations ─────────────────────────────────────

    async fn insert_activity(
        &self,
        user_id: &str,
        record: &ActivityRecord,
    ) -> Result<(), AppError> {
        let parent_path = self.user_path(user_id)?;

        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::ACTIVITIES)
            .document_id(&record.id)
            .parent(&parent_path)
            .object(record)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(user_id, activity_id = %record.id, "Stored activity");
        Ok(())
    }

    async fn list_activities(&self, user_id: &str) -> Result<Vec<ActivityRecord>, AppError> {
        let parent_path = self.user_path(user_id)?;

        let documents: Vec<firestore::FirestoreDocument> = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::ACTIVITIES)
            .parent(&parent_path)
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        // Decode one document at a time so a single malformed record
        // cannot take the whole snapshot down with it.
        let total = documents.len();
        let records: Vec<ActivityRecord> = documents
            .iter()
            .filter_map(|doc| {
                match firestore::FirestoreDb::deserialize_doc_to::<ActivityRecord>(doc) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        tracing::warn!(
                            user_id,
                            document = %doc.name,
                            error = %e,
                            "Skipping undecodable activity document"
                        );
                        None
                    }
                }
            })
            .collect();

        tracing::debug!(
            user_id,
            total,
            decoded = records.len(),
            "Loaded activity snapshot"
        );
        Ok(records)
    }

    // ─── Blog Operations ─────────────────────────────────────────

    async fn insert_blog_post(&self, post: &BlogPost) -> Result<(), AppError> {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collections::BLOGS)
            .document_id(&post.id)
            .object(post)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn list_blog_posts(&self, limit: u32) -> Result<Vec<BlogPost>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::BLOGS)
            .order_by([("createdAt", firestore::FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offline_client_fails_without_panicking() {
        let db = FirestoreDb::new_mock();

        let err = db.list_activities("user-1").await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
        assert!(db.list_blog_posts(10).await.is_err());
    }
}
