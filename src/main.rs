// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Carbon Tracker API Server
//!
//! Records user activities, converts them to CO₂e with a static factor
//! table, and serves aggregate dashboards over JSON and SSE.

use carbon_tracker::{
    config::{Config, StoreBackend},
    db::{FirestoreDb, MemoryStore, Store},
    models::EmissionFactorTable,
    services::NewsService,
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging for GCP
    init_logging()?;

    let config = Config::from_env()?;
    tracing::info!(port = config.port, "Starting Carbon Tracker API");

    let store: Arc<dyn Store> = match config.store_backend {
        StoreBackend::Firestore => Arc::new(FirestoreDb::new(&config.gcp_project_id).await?),
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; data will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    let factors = match &config.emission_factors_path {
        Some(path) => {
            tracing::info!(path = %path, "Loading emission factors");
            EmissionFactorTable::load_from_file(path)?
        }
        None => EmissionFactorTable::default(),
    };
    for category in carbon_tracker::models::Category::ALL {
        tracing::info!(
            category = %category,
            subtypes = factors.subtypes(category).count(),
            "Emission factors loaded"
        );
    }

    let news_service = match &config.news_api_key {
        Some(key) => Some(NewsService::new(config.news_api_url.clone(), key.clone())?),
        None => {
            tracing::warn!("NEWS_API_KEY not set; news feed disabled");
            None
        }
    };

    let state = Arc::new(AppState::new(config.clone(), store, factors, news_service));

    // Build router
    let app = carbon_tracker::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging (GCP-compliant).
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("carbon_tracker=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
