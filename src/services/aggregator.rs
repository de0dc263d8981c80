// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Aggregation of an activity log into dashboard views.
//!
//! Every call recomputes everything from the full snapshot. Sums run in
//! exact decimal arithmetic and ties are broken on record content, so the
//! result does not depend on the order records arrive in.

use crate::models::emission::{round2_decimal, to_decimal};
use crate::models::{ActivityRecord, AggregateView, Category, CategoryTotals, DailyTotal};
use crate::time_utils::{format_day_key, parse_activity_date};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Number of entries in the recent-activity list.
pub const RECENT_ACTIVITY_LIMIT: usize = 5;

/// Build every derived view from one snapshot of a user's records.
pub fn aggregate(records: &[ActivityRecord]) -> AggregateView {
    let (category_totals, total_emissions) = category_totals(records);

    AggregateView {
        category_totals,
        total_emissions,
        daily_totals: daily_totals(records),
        recent_activities: recent_activities(records, RECENT_ACTIVITY_LIMIT),
    }
}

/// Per-category totals and their sum.
///
/// Records in an unknown category are skipped here only; they still count
/// for the date-based views.
pub fn category_totals(records: &[ActivityRecord]) -> (CategoryTotals, f64) {
    let mut sums: BTreeMap<Category, Decimal> =
        Category::ALL.iter().map(|&c| (c, Decimal::ZERO)).collect();

    for record in records {
        let Some(category) = Category::parse(&record.category) else {
            continue;
        };
        let Some(co2) = saturating_decimal(record.co2) else {
            continue;
        };
        let sum = sums.entry(category).or_default();
        *sum = add(*sum, co2);
    }

    // Each bucket is rounded before summing so the total matches the
    // displayed per-category figures.
    let rounded = |category: Category| round2_decimal(sums[&category]);
    let travel = rounded(Category::Travel);
    let home = rounded(Category::Home);
    let food = rounded(Category::Food);
    let total = round2_decimal(add(add(travel, home), food));

    (
        CategoryTotals {
            travel: to_f64(travel),
            home: to_f64(home),
            food: to_f64(food),
        },
        to_f64(total),
    )
}

/// Daily CO₂e totals, ascending by day. Undated records are dropped.
pub fn daily_totals(records: &[ActivityRecord]) -> Vec<DailyTotal> {
    let mut days: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();

    for record in records {
        let Ok(day) = parse_activity_date(&record.date) else {
            tracing::trace!(id = %record.id, date = %record.date, "Skipping undated record");
            continue;
        };
        let sum = days.entry(day).or_default();
        if let Some(co2) = saturating_decimal(record.co2) {
            *sum = add(*sum, co2);
        }
    }

    days.into_iter()
        .map(|(day, sum)| DailyTotal {
            day: format_day_key(day),
            total: to_f64(round2_decimal(sum)),
        })
        .collect()
}

/// The `limit` most recent dated records, newest first.
///
/// Ordered by activity date, then submission time (records without one
/// sort last), then record content.
pub fn recent_activities(records: &[ActivityRecord], limit: usize) -> Vec<ActivityRecord> {
    let mut dated: Vec<(NaiveDate, Option<DateTime<Utc>>, &ActivityRecord)> = records
        .iter()
        .filter_map(|record| {
            let day = parse_activity_date(&record.date).ok()?;
            let created = record.created_at.as_ref().and_then(|c| c.instant());
            Some((day, created, record))
        })
        .collect();

    dated.sort_by(|a, b| {
        b.0.cmp(&a.0)
            .then_with(|| b.1.cmp(&a.1))
            .then_with(|| content_cmp(a.2, b.2))
    });

    dated
        .into_iter()
        .take(limit)
        .map(|(_, _, record)| record.clone())
        .collect()
}

/// Total order on record content, used as the last tie-break.
fn content_cmp(a: &ActivityRecord, b: &ActivityRecord) -> Ordering {
    a.id.cmp(&b.id)
        .then_with(|| a.date.cmp(&b.date))
        .then_with(|| a.category.cmp(&b.category))
        .then_with(|| a.subtype.cmp(&b.subtype))
        .then_with(|| a.co2.total_cmp(&b.co2))
        .then_with(|| {
            let qa = a.quantity.unwrap_or(f64::NEG_INFINITY);
            let qb = b.quantity.unwrap_or(f64::NEG_INFINITY);
            qa.total_cmp(&qb)
        })
}

/// Exact value of a stored `co2`, clamped to the decimal range.
///
/// Only non-finite values yield `None`; they carry no amount to add.
fn saturating_decimal(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Some(to_decimal(value).unwrap_or(if value < 0.0 {
        Decimal::MIN
    } else {
        Decimal::MAX
    }))
}

fn add(a: Decimal, b: Decimal) -> Decimal {
    a.checked_add(b).unwrap_or(if b.is_sign_negative() {
        Decimal::MIN
    } else {
        Decimal::MAX
    })
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}
