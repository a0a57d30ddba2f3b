use actix_web::{web, HttpResponse, Responder};
use serde::{Deserialize, Serialize};

use super::require_store;
use crate::error::AppResult;
use crate::services::store::{StoredPullRequest, TrackerStore};
use crate::utils::config::Config;
use crate::utils::validators::validate_month_name;

#[derive(Debug, Deserialize)]
pub struct MonthsQuery {
    pub months: Option<String>, // Comma separated, e.g. "2025-09,2025-10"
}

#[derive(Debug, Deserialize)]
pub struct TrackPrsRequest {
    pub usernames: Vec<String>,
    pub month_name: String,
}

#[derive(Debug, Serialize)]
pub struct TrackedUserPrs {
    pub username: String,
    /// `null` when the user is not tracked or the month has no data
    pub prs: Option<Vec<StoredPullRequest>>,
}

/// Months named in the query, or the configured tracked months
fn requested_months(query: &MonthsQuery, config: &Config) -> AppResult<Vec<String>> {
    let months: Vec<String> = match query.months.as_deref() {
        Some(raw) if !raw.trim().is_empty() => raw
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect(),
        _ => config.tracked_months.clone(),
    };

    for month in &months {
        validate_month_name(month)?;
    }
    Ok(months)
}

/// GET /leaderboard?months=<YYYY-MM,...>
pub async fn leaderboard(
    store: Option<web::Data<TrackerStore>>,
    config: web::Data<Config>,
    query: web::Query<MonthsQuery>,
) -> AppResult<impl Responder> {
    let store = require_store(store)?;
    let months = requested_months(&query, &config)?;

    Ok(HttpResponse::Ok().json(store.leaderboard(&months).await?))
}

/// GET /admin-dashboard?months=<YYYY-MM,...>
pub async fn admin_dashboard(
    store: Option<web::Data<TrackerStore>>,
    config: web::Data<Config>,
    query: web::Query<MonthsQuery>,
) -> AppResult<impl Responder> {
    let store = require_store(store)?;
    let months = requested_months(&query, &config)?;

    Ok(HttpResponse::Ok().json(store.dashboard(&months).await?))
}

/// POST /track-prs
/// Stored pull requests of several tracked users for one month
pub async fn track_prs(
    store: Option<web::Data<TrackerStore>>,
    body: web::Json<TrackPrsRequest>,
) -> AppResult<impl Responder> {
    let store = require_store(store)?;
    let month = body.month_name.trim();
    validate_month_name(month)?;

    let mut results = Vec::with_capacity(body.usernames.len());
    for username in &body.usernames {
        let username = username.trim();
        results.push(TrackedUserPrs {
            username: username.to_string(),
            prs: store.user_month_pull_requests(username, month).await?,
        });
    }

    Ok(HttpResponse::Ok().json(results))
}
