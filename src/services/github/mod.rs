pub mod client;
#[cfg(test)]
pub mod stub;

pub use client::GitHubClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::AppResult;

/// First page number of every GitHub listing
pub const FIRST_PAGE: u32 = 1;
/// Page size for user, repository and search listings
pub const LIST_PAGE_SIZE: u32 = 100;
/// Page size for pull request and commit listings
pub const ACTIVITY_PAGE_SIZE: u32 = 50;

/// One page of a paginated listing.
///
/// `next` is the cursor of the following page, `None` once the listing is exhausted.
#[derive(Clone, Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<u32>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

/// Read access to the GitHub REST API
#[async_trait]
pub trait GitHubApi: Send + Sync {
    /// Fetch a user profile by login
    async fn get_user(&self, username: &str) -> AppResult<GitHubUser>;

    /// Repositories owned by the user, most recently updated first
    async fn list_repositories(&self, username: &str, page: u32) -> AppResult<Page<GitHubRepo>>;

    async fn list_followers(&self, username: &str, page: u32) -> AppResult<Page<GitHubUser>>;

    async fn list_following(&self, username: &str, page: u32) -> AppResult<Page<GitHubUser>>;

    /// Pull requests of a repository in any state
    async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
    ) -> AppResult<Page<GitHubPullRequest>>;

    /// Commits of a repository authored by `author`, optionally only those since `since`
    async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        author: &str,
        since: Option<DateTime<Utc>>,
        page: u32,
    ) -> AppResult<Page<GitHubCommit>>;

    /// Pull requests opened by `author` during `month` (`YYYY-MM`), via issue search
    async fn search_pull_requests(
        &self,
        author: &str,
        month: &str,
        page: u32,
    ) -> AppResult<Page<GitHubSearchIssue>>;

    /// Whether `list_commits` applies `since` on the server
    fn filters_commits_by_since(&self) -> bool {
        true
    }
}

// GitHub API response types. Every field is optional: GitHub omits or nulls
// many of them depending on the endpoint and the viewer's permissions.

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GitHubUser {
    pub login: Option<String>,
    pub id: Option<i64>,
    pub name: Option<String>,
    pub company: Option<String>,
    pub blog: Option<String>,
    pub location: Option<String>,
    pub email: Option<String>,
    pub bio: Option<String>,
    pub followers: Option<i64>,
    pub following: Option<i64>,
    pub public_repos: Option<i64>,
    pub avatar_url: Option<String>,
    pub html_url: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GitHubOwner {
    pub login: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GitHubRepo {
    pub name: Option<String>,
    pub full_name: Option<String>,
    pub html_url: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub stargazers_count: Option<i64>,
    pub forks_count: Option<i64>,
    pub private: Option<bool>,
    pub owner: Option<GitHubOwner>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GitHubBranch {
    #[serde(rename = "ref")]
    pub ref_name: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GitHubPullRequest {
    pub title: Option<String>,
    pub html_url: Option<String>,
    pub state: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub base: Option<GitHubBranch>,
    pub head: Option<GitHubBranch>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GitHubCommitAuthor {
    pub name: Option<String>,
    pub email: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GitHubCommitDetail {
    pub message: Option<String>,
    pub author: Option<GitHubCommitAuthor>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GitHubCommit {
    pub sha: Option<String>,
    pub html_url: Option<String>,
    pub commit: Option<GitHubCommitDetail>,
}

impl GitHubCommit {
    pub fn authored_at(&self) -> Option<DateTime<Utc>> {
        self.commit.as_ref()?.author.as_ref()?.date
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GitHubIssuePullRequest {
    pub merged_at: Option<DateTime<Utc>>,
}

/// Item of `/search/issues`; pull requests carry a `pull_request` object
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GitHubSearchIssue {
    pub title: Option<String>,
    pub html_url: Option<String>,
    pub state: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub repository_url: Option<String>,
    pub pull_request: Option<GitHubIssuePullRequest>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GitHubSearchResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}
