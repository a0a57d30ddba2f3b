//! In-memory GitHub used by unit and handler tests.

use super::*;
use crate::error::AppError;
use chrono::TimeZone;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
pub struct StubGitHub {
    pub users: HashMap<String, GitHubUser>,
    pub repos: HashMap<String, Vec<Vec<GitHubRepo>>>,
    pub followers: HashMap<String, Vec<Vec<GitHubUser>>>,
    pub following: HashMap<String, Vec<Vec<GitHubUser>>>,
    /// Keyed by `owner/repo`
    pub pulls: HashMap<String, Vec<Vec<GitHubPullRequest>>>,
    /// Keyed by `owner/repo`
    pub commits: HashMap<String, Vec<Vec<GitHubCommit>>>,
    /// Keyed by `author month`
    pub searches: HashMap<String, Vec<Vec<GitHubSearchIssue>>>,
    /// Calls that fail, e.g. `followers:alice:1` or `pulls:alice/a:2`
    pub failures: HashSet<String>,
    /// Ignore `since` in `list_commits` and say so
    pub no_server_side_since: bool,
    pub latency: Option<Duration>,
    pub calls: Mutex<Vec<String>>,
}

impl StubGitHub {
    pub fn fail(mut self, call: &str) -> Self {
        self.failures.insert(call.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn enter(&self, call: String) -> AppResult<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.calls.lock().unwrap().push(call.clone());

        if self.failures.contains(&call) {
            return Err(AppError::upstream(
                format!("GET {}", call),
                "GitHub API request failed with status 500 Internal Server Error",
            ));
        }
        Ok(())
    }
}

fn page_of<T: Clone>(pages: Option<&Vec<Vec<T>>>, page: u32) -> Page<T> {
    let pages = match pages {
        Some(pages) => pages,
        None => return Page::last(Vec::new()),
    };

    let index = page.saturating_sub(1) as usize;
    let items = pages.get(index).cloned().unwrap_or_default();
    let next = if index + 1 < pages.len() {
        Some(page + 1)
    } else {
        None
    };

    Page { items, next }
}

#[async_trait]
impl GitHubApi for StubGitHub {
    async fn get_user(&self, username: &str) -> AppResult<GitHubUser> {
        self.enter(format!("user:{}", username)).await?;
        self.users
            .get(username)
            .cloned()
            .ok_or_else(|| AppError::UpstreamNotFound(format!("user '{}'", username)))
    }

    async fn list_repositories(&self, username: &str, page: u32) -> AppResult<Page<GitHubRepo>> {
        self.enter(format!("repos:{}:{}", username, page)).await?;
        Ok(page_of(self.repos.get(username), page))
    }

    async fn list_followers(&self, username: &str, page: u32) -> AppResult<Page<GitHubUser>> {
        self.enter(format!("followers:{}:{}", username, page)).await?;
        Ok(page_of(self.followers.get(username), page))
    }

    async fn list_following(&self, username: &str, page: u32) -> AppResult<Page<GitHubUser>> {
        self.enter(format!("following:{}:{}", username, page)).await?;
        Ok(page_of(self.following.get(username), page))
    }

    async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
    ) -> AppResult<Page<GitHubPullRequest>> {
        let key = format!("{}/{}", owner, repo);
        self.enter(format!("pulls:{}:{}", key, page)).await?;
        Ok(page_of(self.pulls.get(&key), page))
    }

    async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        _author: &str,
        since: Option<DateTime<Utc>>,
        page: u32,
    ) -> AppResult<Page<GitHubCommit>> {
        let key = format!("{}/{}", owner, repo);
        self.enter(format!("commits:{}:{}", key, page)).await?;

        let mut result = page_of(self.commits.get(&key), page);
        if let (Some(since), false) = (since, self.no_server_side_since) {
            result
                .items
                .retain(|c| c.authored_at().is_some_and(|at| at >= since));
        }
        Ok(result)
    }

    async fn search_pull_requests(
        &self,
        author: &str,
        month: &str,
        page: u32,
    ) -> AppResult<Page<GitHubSearchIssue>> {
        let key = format!("{} {}", author, month);
        self.enter(format!("search:{}:{}", key, page)).await?;
        Ok(page_of(self.searches.get(&key), page))
    }

    fn filters_commits_by_since(&self) -> bool {
        !self.no_server_side_since
    }
}

// Fixture builders

pub fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

pub fn user(login: &str) -> GitHubUser {
    GitHubUser {
        login: Some(login.to_string()),
        id: Some(login.len() as i64),
        ..Default::default()
    }
}

pub fn repo(owner: &str, name: &str) -> GitHubRepo {
    GitHubRepo {
        name: Some(name.to_string()),
        full_name: Some(format!("{}/{}", owner, name)),
        html_url: Some(format!("https://github.com/{}/{}", owner, name)),
        owner: Some(GitHubOwner {
            login: Some(owner.to_string()),
        }),
        ..Default::default()
    }
}

pub fn pull(
    title: &str,
    created_at: DateTime<Utc>,
    merged_at: Option<DateTime<Utc>>,
) -> GitHubPullRequest {
    GitHubPullRequest {
        title: Some(title.to_string()),
        html_url: Some(format!("https://github.com/pulls/{}", title)),
        state: Some(if merged_at.is_some() { "closed" } else { "open" }.to_string()),
        created_at: Some(created_at),
        closed_at: merged_at,
        merged_at,
        base: Some(GitHubBranch {
            ref_name: Some("main".to_string()),
        }),
        head: Some(GitHubBranch {
            ref_name: Some(title.to_string()),
        }),
    }
}

pub fn commit(sha: &str, authored_at: DateTime<Utc>) -> GitHubCommit {
    GitHubCommit {
        sha: Some(sha.to_string()),
        html_url: Some(format!("https://github.com/commit/{}", sha)),
        commit: Some(GitHubCommitDetail {
            message: Some(format!("commit {}", sha)),
            author: Some(GitHubCommitAuthor {
                name: Some("Alice".to_string()),
                email: Some("alice@example.com".to_string()),
                date: Some(authored_at),
            }),
        }),
    }
}

pub fn search_hit(title: &str, owner: &str, repo: &str, merged: bool) -> GitHubSearchIssue {
    GitHubSearchIssue {
        title: Some(title.to_string()),
        html_url: Some(format!("https://github.com/{}/{}/pull/1", owner, repo)),
        state: Some(if merged { "closed" } else { "open" }.to_string()),
        created_at: Some(at(2025, 9, 2)),
        repository_url: Some(format!("https://api.github.com/repos/{}/{}", owner, repo)),
        pull_request: Some(GitHubIssuePullRequest {
            merged_at: if merged { Some(at(2025, 9, 3)) } else { None },
        }),
    }
}

/// alice owns repos `a` and `b`; `a` has three pull requests, one opened
/// recently (2025-10-15), `b` has none. Two followers, one followee.
pub fn alice() -> StubGitHub {
    let mut github = StubGitHub::default();

    github.users.insert(
        "alice".to_string(),
        GitHubUser {
            name: Some("Alice".to_string()),
            followers: Some(2),
            following: Some(1),
            ..user("alice")
        },
    );
    github
        .repos
        .insert("alice".to_string(), vec![vec![repo("alice", "a"), repo("alice", "b")]]);
    github.followers.insert(
        "alice".to_string(),
        vec![vec![user("bob")], vec![user("carol")]],
    );
    github
        .following
        .insert("alice".to_string(), vec![vec![user("dave")]]);
    github.pulls.insert(
        "alice/a".to_string(),
        vec![
            vec![
                pull("recent", at(2025, 10, 15), None),
                pull("old", at(2025, 8, 1), None),
            ],
            vec![pull("old-merged", at(2025, 7, 1), Some(at(2025, 7, 2)))],
        ],
    );
    github.commits.insert(
        "alice/a".to_string(),
        vec![vec![commit("c1", at(2025, 10, 13)), commit("c0", at(2025, 6, 1))]],
    );

    github
}
