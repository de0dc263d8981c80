// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Activity record model for storage and API.

use crate::time_utils::parse_timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Stored activity record in Firestore.
///
/// Stored at: `users/{user_id}/activities/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    /// Opaque record ID (also used as document ID)
    pub id: String,
    /// Category name ("travel", "home", "food")
    pub category: String,
    /// Subtype key within the category ("car", "electricity", "mixed", ...)
    pub subtype: String,
    /// Logged amount in the category's unit (km, kWh, servings)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    /// Computed kg CO₂e, rounded to 2 decimals at creation
    pub co2: f64,
    /// Calendar date the activity happened (canonically `YYYY-MM-DD`)
    #[serde(default)]
    pub date: String,
    /// Server-assigned submission time, only used to order ties
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<CreatedAt>,
    /// Display text, e.g. "car trip: 10 km"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Submission timestamp as found in stored records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(untagged)]
pub enum CreatedAt {
    /// Milliseconds since the Unix epoch
    Millis(i64),
    /// RFC3339 timestamp
    Timestamp(String),
}

impl CreatedAt {
    pub fn now() -> Self {
        CreatedAt::Timestamp(crate::time_utils::format_utc_rfc3339(Utc::now()))
    }

    /// Resolve to a point in time; `None` if the stored text is unreadable.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            CreatedAt::Millis(ms) => DateTime::from_timestamp_millis(*ms),
            CreatedAt::Timestamp(raw) => parse_timestamp(raw),
        }
    }
}

/// User submission for a new activity.
#[derive(Debug, Clone, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NewActivity {
    pub category: String,
    pub subtype: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub date: Option<String>,
}
