// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Derived dashboard views. Recomputed from a full snapshot, never stored.

use crate::models::ActivityRecord;
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Summary of one user's activity log, ready for charting.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
#[serde(rename_all = "camelCase")]
pub struct AggregateView {
    pub category_totals: CategoryTotals,
    pub total_emissions: f64,
    /// Ascending by day
    pub daily_totals: Vec<DailyTotal>,
    /// Most recent first, at most five
    pub recent_activities: Vec<ActivityRecord>,
}

/// kg CO₂e per category.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CategoryTotals {
    pub travel: f64,
    pub home: f64,
    pub food: f64,
}

/// One point of the daily time series.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DailyTotal {
    /// `YYYY-MM-DD`
    pub day: String,
    pub total: f64,
}
