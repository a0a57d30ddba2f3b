//! Mapping from GitHub API payloads to the records this service returns.
//!
//! Every function here is total: a missing upstream field becomes the zero
//! value of its output type (empty string, 0 or false).

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::services::github::{
    GitHubBranch, GitHubCommit, GitHubPullRequest, GitHubRepo, GitHubSearchIssue, GitHubUser,
};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActorSummary {
    pub login: String,
    pub id: i64,
    pub name: String,
    pub company: String,
    pub blog: String,
    pub location: String,
    pub email: String,
    pub bio: String,
    pub followers: i64,
    pub following: i64,
    pub public_repos: i64,
    pub avatar_url: String,
    pub html_url: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RepositorySummary {
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub language: String,
    pub stargazers_count: i64,
    pub forks_count: i64,
    pub private: bool,
}

/// Timestamps are RFC 3339 in UTC, or empty when GitHub has none
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PullRequestRecord {
    pub repo_name: String,
    pub title: String,
    pub url: String,
    pub state: String,
    pub merged: bool,
    pub created_at: String,
    pub closed_at: String,
    pub merged_at: String,
    pub base_branch: String,
    pub head_branch: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub repo_name: String,
    pub sha: String,
    pub message: String,
    pub url: String,
    pub author_name: String,
    pub author_email: String,
    pub authored_at: String,
}

/// Everything gathered about one GitHub user in a single request
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub user: ActorSummary,
    pub repos: Vec<RepositorySummary>,
    pub followers: Vec<ActorSummary>,
    pub following: Vec<ActorSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_requests: Option<Vec<PullRequestRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commits: Option<Vec<CommitRecord>>,
}

/// A pull request found by month search, ready to be stored
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackedPullRequest {
    pub title: String,
    pub state: String,
    pub url: String,
    pub merged: bool,
    /// Repository owner login
    pub org: String,
    pub org_url: String,
    /// Repository name
    pub project: String,
    pub opened_at: Option<DateTime<Utc>>,
}

fn text(value: Option<&String>) -> String {
    value.cloned().unwrap_or_default()
}

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

/// A merge timestamp at the Unix epoch is GitHub's zero value, not a merge
fn is_merged(merged_at: Option<DateTime<Utc>>) -> bool {
    merged_at.is_some_and(|at| at.timestamp() != 0)
}

pub fn map_user(user: Option<&GitHubUser>) -> ActorSummary {
    let Some(user) = user else {
        return ActorSummary::default();
    };

    ActorSummary {
        login: text(user.login.as_ref()),
        id: user.id.unwrap_or_default(),
        name: text(user.name.as_ref()),
        company: text(user.company.as_ref()),
        blog: text(user.blog.as_ref()),
        location: text(user.location.as_ref()),
        email: text(user.email.as_ref()),
        bio: text(user.bio.as_ref()),
        followers: user.followers.unwrap_or_default(),
        following: user.following.unwrap_or_default(),
        public_repos: user.public_repos.unwrap_or_default(),
        avatar_url: text(user.avatar_url.as_ref()),
        html_url: text(user.html_url.as_ref()),
    }
}

pub fn map_users(users: &[GitHubUser]) -> Vec<ActorSummary> {
    users.iter().map(|user| map_user(Some(user))).collect()
}

pub fn map_repository(repo: &GitHubRepo) -> RepositorySummary {
    RepositorySummary {
        name: text(repo.name.as_ref()),
        full_name: text(repo.full_name.as_ref()),
        html_url: text(repo.html_url.as_ref()),
        description: text(repo.description.as_ref()),
        language: text(repo.language.as_ref()),
        stargazers_count: repo.stargazers_count.unwrap_or_default(),
        forks_count: repo.forks_count.unwrap_or_default(),
        private: repo.private.unwrap_or_default(),
    }
}

pub fn map_repositories(repos: &[GitHubRepo]) -> Vec<RepositorySummary> {
    repos.iter().map(map_repository).collect()
}

pub fn map_pull_request(repo_name: &str, pr: &GitHubPullRequest) -> PullRequestRecord {
    let branch = |b: Option<&GitHubBranch>| b.and_then(|b| b.ref_name.clone()).unwrap_or_default();

    PullRequestRecord {
        repo_name: repo_name.to_string(),
        title: text(pr.title.as_ref()),
        url: text(pr.html_url.as_ref()),
        state: text(pr.state.as_ref()),
        merged: is_merged(pr.merged_at),
        created_at: timestamp(pr.created_at),
        closed_at: timestamp(pr.closed_at),
        merged_at: timestamp(pr.merged_at),
        base_branch: branch(pr.base.as_ref()),
        head_branch: branch(pr.head.as_ref()),
    }
}

pub fn map_commit(repo_name: &str, commit: &GitHubCommit) -> CommitRecord {
    let detail = commit.commit.as_ref();
    let author = detail.and_then(|d| d.author.as_ref());

    CommitRecord {
        repo_name: repo_name.to_string(),
        sha: text(commit.sha.as_ref()),
        message: text(detail.and_then(|d| d.message.as_ref())),
        url: text(commit.html_url.as_ref()),
        author_name: text(author.and_then(|a| a.name.as_ref())),
        author_email: text(author.and_then(|a| a.email.as_ref())),
        authored_at: timestamp(commit.authored_at()),
    }
}

/// Split `https://api.github.com/repos/{owner}/{repo}` into owner and repo
fn owner_and_repo(repository_url: &str) -> (String, String) {
    let Ok(url) = url::Url::parse(repository_url) else {
        return (String::new(), String::new());
    };

    let segments: Vec<&str> = url
        .path_segments()
        .map(|segments| segments.filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    match segments.as_slice() {
        [.., "repos", owner, repo] => (owner.to_string(), repo.to_string()),
        _ => (String::new(), String::new()),
    }
}

pub fn map_search_issue(issue: &GitHubSearchIssue) -> TrackedPullRequest {
    let (org, project) = issue
        .repository_url
        .as_deref()
        .map(owner_and_repo)
        .unwrap_or_default();
    let org_url = if org.is_empty() {
        String::new()
    } else {
        format!("https://github.com/{}", org)
    };

    TrackedPullRequest {
        title: text(issue.title.as_ref()),
        state: text(issue.state.as_ref()),
        url: text(issue.html_url.as_ref()),
        merged: is_merged(issue.pull_request.as_ref().and_then(|pr| pr.merged_at)),
        org,
        org_url,
        project,
        opened_at: issue.created_at,
    }
}
