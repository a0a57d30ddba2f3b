use futures_util::future::try_join_all;
use serde::Serialize;
use std::sync::Arc;

use crate::error::{AppError, AppResult};
use crate::models::user;
use crate::services::github::GitHubApi;
use crate::services::mapper::{map_search_issue, TrackedPullRequest};
use crate::services::pagination::fetch_all;
use crate::services::store::TrackerStore;
use crate::utils::validators::{validate_month_name, validate_username};

#[derive(Clone, Debug)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub github_user: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct MonthIngest {
    pub month: String,
    pub pull_requests: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct RegistrationReport {
    pub user: user::Model,
    pub months: Vec<MonthIngest>,
}

/// Registers tracked users and ingests their pull requests month by month
pub struct PullRequestTracker {
    github: Arc<dyn GitHubApi>,
}

impl PullRequestTracker {
    pub fn new(github: Arc<dyn GitHubApi>) -> Self {
        Self { github }
    }

    /// Pull requests `github_user` opened during `month` (`YYYY-MM`)
    pub async fn search_month(
        &self,
        github_user: &str,
        month: &str,
    ) -> AppResult<Vec<TrackedPullRequest>> {
        let issues = fetch_all(|page| self.github.search_pull_requests(github_user, month, page))
            .await
            .map_err(|e| e.within(&format!("pull requests of {} in {}", github_user, month)))?;

        Ok(issues.iter().map(map_search_issue).collect())
    }

    /// Track a new user and store their pull requests for `months`.
    ///
    /// Every month is fetched from GitHub before anything is written, and the
    /// user is stored with all months in one transaction, so any failure
    /// leaves the store untouched.
    pub async fn register(
        &self,
        store: &TrackerStore,
        registration: Registration,
        months: &[String],
    ) -> AppResult<RegistrationReport> {
        validate_username(&registration.github_user)?;
        if registration.name.trim().is_empty() {
            return Err(AppError::invalid_input("name", "name is required"));
        }
        if registration.email.trim().is_empty() {
            return Err(AppError::invalid_input("email", "email is required"));
        }
        for month in months {
            validate_month_name(month)?;
        }

        if store
            .find_user_by_github(&registration.github_user)
            .await?
            .is_some()
        {
            return Err(AppError::invalid_input(
                "github_user",
                format!("'{}' is already tracked", registration.github_user),
            ));
        }

        let fetched = try_join_all(
            months
                .iter()
                .map(|month| self.search_month(&registration.github_user, month)),
        )
        .await?;

        let batches: Vec<(String, Vec<TrackedPullRequest>)> =
            months.iter().cloned().zip(fetched).collect();
        let (user, stored) = store
            .register_user(
                registration.name.trim(),
                registration.email.trim(),
                &registration.github_user,
                &batches,
            )
            .await?;

        let report: Vec<MonthIngest> = months
            .iter()
            .zip(stored)
            .map(|(month, pull_requests)| MonthIngest {
                month: month.clone(),
                pull_requests,
            })
            .collect();

        log::info!(
            "📥 Registered {} with {} tracked months",
            user.github_user,
            report.len()
        );

        Ok(RegistrationReport {
            user,
            months: report,
        })
    }
}
