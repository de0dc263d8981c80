// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Carbon Tracker: personal carbon footprint logging.
//!
//! This crate provides the backend API for recording activities, converting
//! them to CO₂-equivalent emissions, and serving live dashboard views.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::Store;
use models::EmissionFactorTable;
use services::{ActivityService, BlogService, NewsService, SnapshotHub};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn Store>,
    pub snapshots: SnapshotHub,
    pub activity_service: ActivityService,
    pub blog_service: BlogService,
    /// `None` when no news API key is configured.
    pub news_service: Option<NewsService>,
}

impl AppState {
    /// Wire the services around one store and factor table.
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        factors: EmissionFactorTable,
        news_service: Option<NewsService>,
    ) -> Self {
        let snapshots = SnapshotHub::new(store.clone());
        let activity_service =
            ActivityService::new(store.clone(), Arc::new(factors), snapshots.clone());
        let blog_service = BlogService::new(store.clone());

        Self {
            config,
            store,
            snapshots,
            activity_service,
            blog_service,
            news_service,
        }
    }
}
