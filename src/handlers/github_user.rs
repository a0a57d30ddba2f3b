use actix_web::{web, HttpResponse, Responder};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::services::aggregator::{ResourceAggregator, ResourceSelection};
use crate::services::mapper::{AggregationResult, CommitRecord, PullRequestRecord};
use crate::utils::config::Config;
use crate::utils::period::resolve_cutoff;
use crate::utils::validators::validate_username;

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub username: Option<String>,
    pub period: Option<String>, // e.g. "24h", "7d", "1m" or "all"
}

#[derive(Debug, Deserialize)]
pub struct UserBody {
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ActivityResponse {
    pub pull_requests: Vec<PullRequestRecord>,
    pub commits: Vec<CommitRecord>,
}

async fn aggregate_for(
    aggregator: &ResourceAggregator,
    config: &Config,
    username: Option<&str>,
    period: Option<&str>,
    selection: ResourceSelection,
) -> AppResult<AggregationResult> {
    let username = username.map(str::trim).unwrap_or_default();
    validate_username(username)?;

    let since = resolve_cutoff(period, &config.default_period, Utc::now())?;
    log::info!(
        "Aggregating GitHub activity for {} since {}",
        username,
        since.map_or_else(|| "the beginning".to_string(), |at| at.to_rfc3339())
    );

    aggregator.aggregate(username, selection, since).await
}

/// GET /user?username=<login>&period=<period>
/// Profile, repositories, followers, following and recent pull requests
pub async fn get_user(
    aggregator: web::Data<ResourceAggregator>,
    config: web::Data<Config>,
    query: web::Query<UserQuery>,
) -> AppResult<impl Responder> {
    let result = aggregate_for(
        &aggregator,
        &config,
        query.username.as_deref(),
        query.period.as_deref(),
        ResourceSelection::profile(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(result))
}

/// POST /user?period=<period>
/// Same as GET /user; the username may come from a JSON body instead
pub async fn post_user(
    aggregator: web::Data<ResourceAggregator>,
    config: web::Data<Config>,
    query: web::Query<UserQuery>,
    body: Option<web::Json<UserBody>>,
) -> AppResult<impl Responder> {
    let username = query
        .username
        .as_deref()
        .filter(|u| !u.trim().is_empty())
        .or_else(|| body.as_ref().and_then(|b| b.username.as_deref()));

    let result = aggregate_for(
        &aggregator,
        &config,
        username,
        query.period.as_deref(),
        ResourceSelection::profile(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(result))
}

/// GET /user/activity?username=<login>&period=<period>
/// Pull requests and commits authored by the user across their repositories
pub async fn get_user_activity(
    aggregator: web::Data<ResourceAggregator>,
    config: web::Data<Config>,
    query: web::Query<UserQuery>,
) -> AppResult<impl Responder> {
    let result = aggregate_for(
        &aggregator,
        &config,
        query.username.as_deref(),
        query.period.as_deref(),
        ResourceSelection::activity(),
    )
    .await?;

    Ok(HttpResponse::Ok().json(ActivityResponse {
        pull_requests: result.pull_requests.unwrap_or_default(),
        commits: result.commits.unwrap_or_default(),
    }))
}

/// GET /health
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::configure;
    use crate::services::github::stub::{alice, StubGitHub};
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;

    fn state(github: StubGitHub) -> (web::Data<ResourceAggregator>, web::Data<Config>) {
        let aggregator = ResourceAggregator::new(Arc::new(github), 4, Duration::from_secs(5));
        (web::Data::new(aggregator), web::Data::new(Config::default()))
    }

    macro_rules! app {
        ($github:expr) => {{
            let (aggregator, config) = state($github);
            test::init_service(
                App::new()
                    .app_data(aggregator)
                    .app_data(config)
                    .configure(configure),
            )
            .await
        }};
    }

    #[actix_web::test]
    async fn test_get_user_all_time() {
        let app = app!(alice());

        let req = test::TestRequest::get()
            .uri("/user?username=alice&period=all")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["user"]["login"], "alice");
        assert_eq!(body["repos"].as_array().unwrap().len(), 2);
        assert_eq!(body["followers"].as_array().unwrap().len(), 2);
        assert_eq!(body["following"][0]["login"], "dave");
        assert_eq!(body["pull_requests"].as_array().unwrap().len(), 3);
        assert!(body.get("commits").is_none());
    }

    #[actix_web::test]
    async fn test_missing_username_is_bad_request() {
        let app = app!(alice());

        let req = test::TestRequest::get().uri("/user").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("username"));
    }

    #[actix_web::test]
    async fn test_malformed_period_is_bad_request() {
        let app = app!(alice());

        let req = test::TestRequest::get()
            .uri("/user?username=alice&period=7x")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("'7x'"));
    }

    #[actix_web::test]
    async fn test_post_user_reads_json_body() {
        let app = app!(alice());

        let req = test::TestRequest::post()
            .uri("/user?period=all")
            .set_json(serde_json::json!({ "username": "alice" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["user"]["name"], "Alice");
    }

    #[actix_web::test]
    async fn test_post_user_without_body_is_bad_request() {
        let app = app!(alice());

        let req = test::TestRequest::post().uri("/user").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_unknown_user_is_not_found() {
        let app = app!(alice());

        let req = test::TestRequest::get()
            .uri("/user?username=ghost")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_upstream_failure_is_bad_gateway() {
        let app = app!(alice().fail("following:alice:1"));

        let req = test::TestRequest::get()
            .uri("/user?username=alice&period=all")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("following"));
    }

    #[actix_web::test]
    async fn test_activity_returns_pull_requests_and_commits() {
        let app = app!(alice());

        let req = test::TestRequest::get()
            .uri("/user/activity?username=alice&period=all")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["pull_requests"].as_array().unwrap().len(), 3);
        assert_eq!(body["commits"].as_array().unwrap().len(), 2);
        assert_eq!(body["commits"][0]["repo_name"], "alice/a");
    }

    #[actix_web::test]
    async fn test_health() {
        let app = app!(StubGitHub::default());

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "ok");
    }
}
