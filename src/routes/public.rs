// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Public read-only routes: emission factors, blog listing, news.

use crate::error::{AppError, Result};
use crate::models::{BlogPost, Category, Factor, NewsArticle};
use crate::AppState;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/factors", get(get_factors))
        .route("/blog/posts", get(get_blog_posts))
        .route("/news", get(get_news))
}

// ─── Emission Factors ────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CategoryFactors {
    pub category: Category,
    pub unit: String,
    pub subtypes: BTreeMap<String, Factor>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct FactorsResponse {
    pub categories: Vec<CategoryFactors>,
}

/// Factor table, so clients can offer only subtypes that will be accepted.
async fn get_factors(State(state): State<Arc<AppState>>) -> Json<FactorsResponse> {
    let factors = state.activity_service.factors();
    let categories = Category::ALL
        .into_iter()
        .map(|category| CategoryFactors {
            category,
            unit: category.unit().to_string(),
            subtypes: factors
                .subtypes(category)
                .map(|(name, factor)| (name.to_string(), factor))
                .collect(),
        })
        .collect();

    Json(FactorsResponse { categories })
}

// ─── Blog ────────────────────────────────────────────────────

#[derive(Deserialize)]
struct BlogQuery {
    limit: Option<u32>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BlogPostsResponse {
    pub posts: Vec<BlogPost>,
}

async fn get_blog_posts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BlogQuery>,
) -> Result<Json<BlogPostsResponse>> {
    let posts = state.blog_service.list_posts(params.limit).await?;
    Ok(Json(BlogPostsResponse { posts }))
}

// ─── News ────────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NewsResponse {
    pub articles: Vec<NewsArticle>,
}

async fn get_news(State(state): State<Arc<AppState>>) -> Result<Json<NewsResponse>> {
    let news = state.news_service.as_ref().ok_or(AppError::NewsUnavailable)?;
    let articles = news.fetch_articles().await?;
    Ok(Json(NewsResponse { articles }))
}
