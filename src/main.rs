mod error;
mod handlers;
mod models;
mod services;
mod utils;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;

use services::aggregator::ResourceAggregator;
use services::github::{GitHubApi, GitHubClient};
use services::store::TrackerStore;
use services::tracker::PullRequestTracker;
use utils::config::Config;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file FIRST before anything else
    dotenv::dotenv().ok();

    // Initialize logger with default level if RUST_LOG not set
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=================================================");
    println!("🚀 GitHub Activity Tracker");
    println!("=================================================");

    let config = Config::from_env().context("Failed to load configuration")?;
    let host = config.host.clone();
    let port = config.port;

    println!("📝 Configuration loaded:");
    println!("   - GitHub API: {}", config.github_api_url);
    println!("   - Host: {}", host);
    println!("   - Port: {}", port);
    println!("   - Default period: {}", config.default_period);
    println!("   - Tracked months: {}", config.tracked_months.join(", "));

    let github_client = GitHubClient::new(
        &config.github_api_url,
        config.github_token.clone(),
        config.http_timeout(),
    )
    .context("Failed to build GitHub client")?;
    if !github_client.is_authenticated() {
        log::warn!("GITHUB_TOKEN is not set, GitHub requests are unauthenticated and heavily rate limited");
    }
    let github: Arc<dyn GitHubApi> = Arc::new(github_client);

    let aggregator = web::Data::new(ResourceAggregator::new(
        github.clone(),
        config.max_concurrent_repo_fetches,
        config.aggregation_timeout(),
    ));
    let tracker = web::Data::new(PullRequestTracker::new(github));

    let store = match &config.database_url {
        Some(database_url) => {
            print!("🔌 Connecting to database... ");
            let store = TrackerStore::connect(database_url)
                .await
                .context("Failed to connect to database")?;
            println!("✅ Connected!");
            log::info!("Database connection established");
            Some(web::Data::new(store))
        }
        None => {
            log::warn!("DATABASE_URL is not set, tracked-user endpoints are disabled");
            None
        }
    };

    println!("🌐 Starting HTTP server at http://{}:{}", host, port);
    println!("📍 Available endpoints:");
    println!("   - GET  http://{}:{}/user?username=<login>&period=<period>", host, port);
    println!("   - POST http://{}:{}/user", host, port);
    println!("   - GET  http://{}:{}/user/activity?username=<login>&period=<period>", host, port);
    println!("   - GET  http://{}:{}/health", host, port);
    if store.is_some() {
        println!("   - GET/POST http://{}:{}/users", host, port);
        println!("   - GET  http://{}:{}/leaderboard", host, port);
        println!("   - GET  http://{}:{}/admin-dashboard", host, port);
        println!("   - POST http://{}:{}/track-prs", host, port);
    }
    println!("=================================================");

    let config = web::Data::new(config);
    let app_store = store.clone();

    HttpServer::new(move || {
        let app = App::new()
            .app_data(config.clone())
            .app_data(aggregator.clone())
            .app_data(tracker.clone());
        let app = match &app_store {
            Some(store) => app.app_data(store.clone()),
            None => app,
        };

        app.wrap(Logger::default())
            .wrap(Cors::permissive())
            .configure(handlers::configure)
    })
    .bind((host, port))?
    .run()
    .await?;

    if let Some(store) = store {
        store.close().await.context("Failed to close database connections")?;
        log::info!("Database connections closed");
    }

    Ok(())
}
