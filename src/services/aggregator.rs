use chrono::{DateTime, Utc};
use futures_util::{stream, StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::services::github::{GitHubApi, GitHubRepo};
use crate::services::mapper::{
    map_commit, map_pull_request, map_repositories, map_user, map_users, AggregationResult,
    CommitRecord, PullRequestRecord,
};
use crate::services::pagination::fetch_all;
use crate::services::window::{include_commit, include_pull_request};

/// Which parts of a user's activity to collect besides profile and repositories
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceSelection {
    pub social: bool,
    pub pull_requests: bool,
    pub commits: bool,
}

impl ResourceSelection {
    /// Profile, repositories, followers, following and pull requests
    pub fn profile() -> Self {
        Self {
            social: true,
            pull_requests: true,
            commits: false,
        }
    }

    /// Pull requests and commits across the user's repositories
    pub fn activity() -> Self {
        Self {
            social: false,
            pull_requests: true,
            commits: true,
        }
    }
}

/// A repository we can address by owner and name
struct RepoRef {
    owner: String,
    name: String,
    full_name: String,
}

impl RepoRef {
    fn from_repo(repo: &GitHubRepo) -> Option<Self> {
        let owner = repo.owner.as_ref()?.login.clone()?;
        let name = repo.name.clone()?;
        let full_name = repo
            .full_name
            .clone()
            .unwrap_or_else(|| format!("{}/{}", owner, name));

        Some(Self {
            owner,
            name,
            full_name,
        })
    }
}

/// Collects a user's GitHub activity into one [`AggregationResult`].
///
/// The first failing fetch aborts the whole aggregation, and so does running
/// past the deadline.
pub struct ResourceAggregator {
    github: Arc<dyn GitHubApi>,
    max_concurrent_repo_fetches: usize,
    timeout: Duration,
}

impl ResourceAggregator {
    pub fn new(
        github: Arc<dyn GitHubApi>,
        max_concurrent_repo_fetches: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            github,
            max_concurrent_repo_fetches: max_concurrent_repo_fetches.max(1),
            timeout,
        }
    }

    pub async fn aggregate(
        &self,
        username: &str,
        selection: ResourceSelection,
        since: Option<DateTime<Utc>>,
    ) -> AppResult<AggregationResult> {
        match tokio::time::timeout(self.timeout, self.collect(username, selection, since)).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!(
                    "Aggregation for {} canceled after {:?}",
                    username,
                    self.timeout
                );
                Err(AppError::Canceled(format!(
                    "aggregation for '{}' exceeded {}s",
                    username,
                    self.timeout.as_secs_f64()
                )))
            }
        }
    }

    async fn collect(
        &self,
        username: &str,
        selection: ResourceSelection,
        since: Option<DateTime<Utc>>,
    ) -> AppResult<AggregationResult> {
        let github = self.github.as_ref();

        // Profile first: an unknown user stops everything with a not-found
        let profile = github.get_user(username).await?;

        let repos = async {
            fetch_all(|page| github.list_repositories(username, page))
                .await
                .map_err(|e| e.within("repositories"))
        };
        let followers = async {
            if !selection.social {
                return Ok(Vec::new());
            }
            fetch_all(|page| github.list_followers(username, page))
                .await
                .map_err(|e| e.within("followers"))
        };
        let following = async {
            if !selection.social {
                return Ok(Vec::new());
            }
            fetch_all(|page| github.list_following(username, page))
                .await
                .map_err(|e| e.within("following"))
        };

        let (repos, followers, following) =
            futures_util::try_join!(repos, followers, following)?;

        let targets: Vec<RepoRef> = repos.iter().filter_map(RepoRef::from_repo).collect();
        if targets.len() < repos.len() {
            log::debug!(
                "Skipping {} repositories without owner or name",
                repos.len() - targets.len()
            );
        }

        let pull_requests = async {
            if !selection.pull_requests {
                return Ok(None);
            }
            let batches: Vec<Vec<PullRequestRecord>> = stream::iter(&targets)
                .map(|target| self.repo_pull_requests(target, since))
                .buffered(self.max_concurrent_repo_fetches)
                .try_collect()
                .await?;
            Ok::<_, AppError>(Some(batches.into_iter().flatten().collect::<Vec<_>>()))
        };
        let commits = async {
            if !selection.commits {
                return Ok(None);
            }
            let batches: Vec<Vec<CommitRecord>> = stream::iter(&targets)
                .map(|target| self.repo_commits(target, username, since))
                .buffered(self.max_concurrent_repo_fetches)
                .try_collect()
                .await?;
            Ok::<_, AppError>(Some(batches.into_iter().flatten().collect::<Vec<_>>()))
        };

        let (pull_requests, commits) = futures_util::try_join!(pull_requests, commits)?;

        log::info!(
            "Aggregated {}: {} repos, {} followers, {} following, {} pull requests, {} commits",
            username,
            repos.len(),
            followers.len(),
            following.len(),
            pull_requests.as_ref().map_or(0, Vec::len),
            commits.as_ref().map_or(0, Vec::len)
        );

        Ok(AggregationResult {
            user: map_user(Some(&profile)),
            repos: map_repositories(&repos),
            followers: map_users(&followers),
            following: map_users(&following),
            pull_requests,
            commits,
        })
    }

    async fn repo_pull_requests(
        &self,
        target: &RepoRef,
        since: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<PullRequestRecord>> {
        let pulls = fetch_all(|page| {
            self.github
                .list_pull_requests(&target.owner, &target.name, page)
        })
        .await
        .map_err(|e| e.within(&format!("pull requests for {}", target.full_name)))?;

        Ok(pulls
            .iter()
            .filter(|pr| include_pull_request(pr, since))
            .map(|pr| map_pull_request(&target.full_name, pr))
            .collect())
    }

    async fn repo_commits(
        &self,
        target: &RepoRef,
        author: &str,
        since: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<CommitRecord>> {
        let commits = fetch_all(|page| {
            self.github
                .list_commits(&target.owner, &target.name, author, since, page)
        })
        .await
        .map_err(|e| e.within(&format!("commits for {}", target.full_name)))?;

        let filtered_upstream = self.github.filters_commits_by_since();

        Ok(commits
            .iter()
            .filter(|commit| filtered_upstream || include_commit(commit, since))
            .map(|commit| map_commit(&target.full_name, commit))
            .collect())
    }
}
