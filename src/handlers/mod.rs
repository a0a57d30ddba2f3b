pub mod github_user;
pub mod tracking;
pub mod users;

use actix_web::web;

use crate::error::{AppError, AppResult};
use crate::services::store::TrackerStore;

/// The tracked-user endpoints need a database; without one they answer 503
fn require_store(store: Option<web::Data<TrackerStore>>) -> AppResult<web::Data<TrackerStore>> {
    store.ok_or(AppError::StoreUnavailable)
}

/// Malformed JSON bodies get the same `{"error": ..}` shape as every other failure
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| AppError::invalid_input("body", err.to_string()).into())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/health", web::get().to(github_user::health))
        // Live GitHub aggregation
        .route("/user", web::get().to(github_user::get_user))
        .route("/user", web::post().to(github_user::post_user))
        .route("/user/activity", web::get().to(github_user::get_user_activity))
        // Tracked users (database required)
        .service(
            web::scope("/users")
                .route("", web::get().to(users::list_users))
                .route("", web::post().to(users::create_user))
                .route("/{github_user}", web::get().to(users::get_user))
                .route("/{id}", web::delete().to(users::delete_user)),
        )
        .route("/leaderboard", web::get().to(tracking::leaderboard))
        .route("/admin-dashboard", web::get().to(tracking::admin_dashboard))
        .route("/track-prs", web::post().to(tracking::track_prs));
}
