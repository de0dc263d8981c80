// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity submission service.
//!
//! Handles the core workflow:
//! 1. Validate the submission and look up its emission factor
//! 2. Compute CO₂e once, at creation
//! 3. Store the record in the user's collection
//! 4. Re-deliver the user's full snapshot to live dashboards

use crate::db::Store;
use crate::error::{AppError, Result, ValidationError};
use crate::middleware::auth::AuthUser;
use crate::models::{
    ActivityRecord, AggregateView, Category, CreatedAt, EmissionFactorTable, NewActivity,
};
use crate::services::aggregator::{aggregate, recent_activities};
use crate::services::record_source::SnapshotHub;
use crate::time_utils::{format_day_key, parse_activity_date};
use std::sync::Arc;

const MAX_SUBTYPE_LEN: usize = 64;

/// Turn a submission into a complete record, or reject it.
///
/// Pure: nothing is stored here, so a rejected submission leaves no trace.
pub fn prepare_record(
    factors: &EmissionFactorTable,
    submission: NewActivity,
    id: String,
    created_at: CreatedAt,
) -> Result<ActivityRecord> {
    let category = Category::parse(&submission.category)
        .ok_or_else(|| ValidationError::UnknownCategory(submission.category.clone()))?;

    let subtype = submission.subtype.trim();
    if subtype.is_empty() || subtype.chars().count() > MAX_SUBTYPE_LEN {
        return Err(ValidationError::InvalidSubtype.into());
    }

    let factor = factors.factor_for(category, subtype)?;
    let co2 = factor.co2(submission.quantity)?;

    let raw_date = submission
        .date
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .ok_or(ValidationError::MissingDate)?;
    let date = parse_activity_date(raw_date)
        .map_err(|_| ValidationError::InvalidDate(raw_date.to_string()))?;

    Ok(ActivityRecord {
        id,
        category: category.as_str().to_string(),
        subtype: subtype.to_string(),
        quantity: submission.quantity,
        co2,
        date: format_day_key(date),
        created_at: Some(created_at),
        description: Some(describe(category, subtype, submission.quantity)),
    })
}

/// Human-readable summary shown in activity lists.
fn describe(category: Category, subtype: &str, quantity: Option<f64>) -> String {
    match (category, quantity) {
        (Category::Travel, Some(km)) => format!("{} trip: {} km", subtype, km),
        (Category::Home, Some(kwh)) => format!("{}: {} kWh", capitalize(subtype), kwh),
        (Category::Food, _) | (_, None) => format!("Diet: {}", subtype),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Service for creating and reading a user's activities.
#[derive(Clone)]
pub struct ActivityService {
    store: Arc<dyn Store>,
    factors: Arc<EmissionFactorTable>,
    snapshots: SnapshotHub,
}

impl ActivityService {
    pub fn new(
        store: Arc<dyn Store>,
        factors: Arc<EmissionFactorTable>,
        snapshots: SnapshotHub,
    ) -> Self {
        Self {
            store,
            factors,
            snapshots,
        }
    }

    pub fn factors(&self) -> &EmissionFactorTable {
        &self.factors
    }

    /// Validate, compute, persist, then notify subscribers.
    pub async fn submit(
        &self,
        user: &AuthUser,
        submission: NewActivity,
    ) -> Result<ActivityRecord> {
        let record = prepare_record(
            &self.factors,
            submission,
            uuid::Uuid::new_v4().to_string(),
            CreatedAt::now(),
        )?;

        self.store.insert_activity(&user.user_id, &record).await?;

        tracing::info!(
            user_id = %user.user_id,
            activity_id = %record.id,
            category = %record.category,
            subtype = %record.subtype,
            co2 = record.co2,
            "Activity recorded"
        );

        self.snapshots.refresh(&user.user_id).await;
        Ok(record)
    }

    /// Dated activities, newest first.
    pub async fn list(&self, user: &AuthUser, limit: usize) -> Result<Vec<ActivityRecord>> {
        let records = self.load_snapshot(user).await?;
        Ok(recent_activities(&records, limit))
    }

    /// One-shot dashboard computed from the current collection.
    pub async fn dashboard(&self, user: &AuthUser) -> Result<AggregateView> {
        let records = self.load_snapshot(user).await?;
        Ok(aggregate(&records))
    }

    async fn load_snapshot(&self, user: &AuthUser) -> Result<Vec<ActivityRecord>> {
        self.store
            .list_activities(&user.user_id)
            .await
            .map_err(|e| AppError::SourceUnavailable(e.to_string()))
    }
}
