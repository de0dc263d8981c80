// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod aggregate;
pub mod blog;
pub mod emission;
pub mod news;

pub use activity::{ActivityRecord, CreatedAt, NewActivity};
pub use aggregate::{AggregateView, CategoryTotals, DailyTotal};
pub use blog::{BlogPost, NewBlogPost};
pub use emission::{Category, EmissionFactorTable, Factor};
pub use news::NewsArticle;
