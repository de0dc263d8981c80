// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod activity;
pub mod aggregator;
pub mod blog;
pub mod dashboard;
pub mod news;
pub mod record_source;

pub use activity::ActivityService;
pub use aggregator::aggregate;
pub use blog::BlogService;
pub use dashboard::{DashboardSession, DashboardState};
pub use news::{NewsService, RetryPolicy};
pub use record_source::{SnapshotHub, SourceEvent, Subscription};
