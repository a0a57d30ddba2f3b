use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use uuid::Uuid;

use super::require_store;
use crate::error::{AppError, AppResult};
use crate::services::store::TrackerStore;
use crate::services::tracker::{PullRequestTracker, Registration};
use crate::utils::config::Config;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub github_user: String,
    pub months: Option<Vec<String>>, // Defaults to the configured tracked months
}

/// POST /users
/// Track a GitHub user and ingest their pull requests for each month
pub async fn create_user(
    store: Option<web::Data<TrackerStore>>,
    tracker: web::Data<PullRequestTracker>,
    config: web::Data<Config>,
    body: web::Json<CreateUserRequest>,
) -> AppResult<impl Responder> {
    let store = require_store(store)?;
    let body = body.into_inner();
    let months = body.months.unwrap_or_else(|| config.tracked_months.clone());

    let report = tracker
        .register(
            &store,
            Registration {
                name: body.name,
                email: body.email,
                github_user: body.github_user.trim().to_string(),
            },
            &months,
        )
        .await?;

    Ok(HttpResponse::Created().json(report))
}

/// GET /users
pub async fn list_users(store: Option<web::Data<TrackerStore>>) -> AppResult<impl Responder> {
    let users = require_store(store)?.list_users().await?;
    Ok(HttpResponse::Ok().json(users))
}

/// GET /users/{github_user}
pub async fn get_user(
    store: Option<web::Data<TrackerStore>>,
    path: web::Path<String>,
) -> AppResult<impl Responder> {
    let github_user = path.into_inner();

    match require_store(store)?.find_user_by_github(&github_user).await? {
        Some(user) => Ok(HttpResponse::Ok().json(user)),
        None => Ok(HttpResponse::NotFound().json(serde_json::json!({
            "error": format!("'{}' is not tracked", github_user)
        }))),
    }
}

/// DELETE /users/{id}
pub async fn delete_user(
    store: Option<web::Data<TrackerStore>>,
    path: web::Path<String>,
) -> AppResult<impl Responder> {
    let store = require_store(store)?;
    let id = Uuid::parse_str(&path)
        .map_err(|e| AppError::invalid_input("id", format!("not a valid user id: {}", e)))?;

    if store.delete_user(id).await? {
        Ok(HttpResponse::NoContent().finish())
    } else {
        Ok(HttpResponse::NotFound().json(serde_json::json!({
            "error": format!("no tracked user with id {}", id)
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::configure;
    use crate::services::github::stub::{search_hit, StubGitHub};
    use crate::services::store::tests::memory_store;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn github() -> StubGitHub {
        let mut github = StubGitHub::default();
        github.searches.insert(
            "alice 2025-09".into(),
            vec![vec![search_hit("first", "rust-lang", "cargo", true)]],
        );
        github
    }

    macro_rules! app {
        ($store:expr) => {{
            let mut app = App::new()
                .app_data(web::Data::new(PullRequestTracker::new(Arc::new(github()))))
                .app_data(web::Data::new(Config::default()));
            if let Some(store) = $store {
                app = app.app_data(web::Data::new(store));
            }
            test::init_service(app.configure(configure)).await
        }};
    }

    fn alice() -> Value {
        json!({
            "name": "Alice",
            "email": "alice@example.com",
            "github_user": "alice",
            "months": ["2025-09"]
        })
    }

    #[actix_web::test]
    async fn test_without_database_is_unavailable() {
        let app = app!(None::<TrackerStore>);

        let req = test::TestRequest::get().uri("/users").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "database is not configured");
    }

    #[actix_web::test]
    async fn test_create_list_and_delete_user() {
        let app = app!(Some(memory_store().await));

        let req = test::TestRequest::post()
            .uri("/users")
            .set_json(alice())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let report: Value = test::read_body_json(resp).await;
        assert_eq!(report["months"][0]["pull_requests"], 1);
        let id = report["user"]["id"].as_str().unwrap().to_string();

        let req = test::TestRequest::get().uri("/users").to_request();
        let users: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(users.as_array().unwrap().len(), 1);

        let req = test::TestRequest::get().uri("/users/alice").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::delete()
            .uri(&format!("/users/{}", id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let req = test::TestRequest::get().uri("/users/alice").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_duplicate_registration_is_bad_request() {
        let app = app!(Some(memory_store().await));

        for expected in [StatusCode::CREATED, StatusCode::BAD_REQUEST] {
            let req = test::TestRequest::post()
                .uri("/users")
                .set_json(alice())
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), expected);
        }
    }

    #[actix_web::test]
    async fn test_malformed_body_is_json_error() {
        let app = app!(Some(memory_store().await));

        let req = test::TestRequest::post()
            .uri("/users")
            .insert_header(("content-type", "application/json"))
            .set_payload("{\"name\": ")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().starts_with("invalid body"));
    }

    #[actix_web::test]
    async fn test_delete_with_malformed_id() {
        let app = app!(Some(memory_store().await));

        let req = test::TestRequest::delete()
            .uri("/users/not-a-uuid")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
