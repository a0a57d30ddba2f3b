use super::{
    GitHubApi, GitHubCommit, GitHubPullRequest, GitHubRepo, GitHubSearchIssue,
    GitHubSearchResponse, GitHubUser, Page, ACTIVITY_PAGE_SIZE, LIST_PAGE_SIZE,
};
use crate::error::{AppError, AppResult};
use crate::utils::http_client::create_http_client;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, LINK};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

/// GitHub REST client holding one pooled HTTP client for the whole process
pub struct GitHubClient {
    http: Client,
    api_base_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(
        api_base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        Ok(Self {
            http: create_http_client(timeout)?,
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> AppResult<Response> {
        let mut request = self
            .http
            .get(format!("{}{}", self.api_base_url, path))
            .query(query);

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        log::debug!("GET {} {:?}", path, query);

        request
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("GET {}", path), e))
    }

    /// Check the status, then decode the body and the `Link` pagination cursor
    async fn read<T: DeserializeOwned>(path: &str, response: Response) -> AppResult<(T, Option<u32>)> {
        let endpoint = format!("GET {}", path);
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(AppError::UpstreamNotFound(path.to_string()));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::upstream(
                endpoint,
                format!("GitHub API request failed with status {}: {}", status, body.trim()),
            ));
        }

        let next = next_page(response.headers());
        let body = response
            .json::<T>()
            .await
            .map_err(|e| AppError::upstream(endpoint, format!("invalid response body: {}", e)))?;

        Ok((body, next))
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> AppResult<Page<T>> {
        let response = self.get(path, query).await?;
        let (items, next) = Self::read::<Vec<T>>(path, response).await?;
        Ok(Page { items, next })
    }
}

fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

fn paging(per_page: u32, page: u32) -> [(&'static str, String); 2] {
    [("per_page", per_page.to_string()), ("page", page.to_string())]
}

/// Page number of the `rel="next"` entry of a `Link` header
pub(crate) fn next_page(headers: &HeaderMap) -> Option<u32> {
    let link = headers.get(LINK)?.to_str().ok()?;
    parse_next_link(link)
}

fn parse_next_link(link: &str) -> Option<u32> {
    link.split(',').find_map(|entry| {
        let mut parts = entry.split(';');
        let target = parts
            .next()?
            .trim()
            .strip_prefix('<')?
            .strip_suffix('>')?;

        if !parts.any(|p| p.trim() == r#"rel="next""#) {
            return None;
        }

        let url = Url::parse(target).ok()?;
        let page = url
            .query_pairs()
            .find(|(key, _)| key == "page")
            .and_then(|(_, value)| value.parse().ok());
        page
    })
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn get_user(&self, username: &str) -> AppResult<GitHubUser> {
        let path = format!("/users/{}", segment(username));
        let response = self.get(&path, &[]).await?;

        match Self::read::<GitHubUser>(&path, response).await {
            Ok((user, _)) => Ok(user),
            Err(AppError::UpstreamNotFound(_)) => {
                Err(AppError::UpstreamNotFound(format!("user '{}'", username)))
            }
            Err(e) => Err(e),
        }
    }

    async fn list_repositories(&self, username: &str, page: u32) -> AppResult<Page<GitHubRepo>> {
        let path = format!("/users/{}/repos", segment(username));
        let mut query = vec![
            ("type", "owner".to_string()),
            ("sort", "updated".to_string()),
            ("direction", "desc".to_string()),
        ];
        query.extend(paging(LIST_PAGE_SIZE, page));

        self.get_page(&path, &query).await
    }

    async fn list_followers(&self, username: &str, page: u32) -> AppResult<Page<GitHubUser>> {
        let path = format!("/users/{}/followers", segment(username));
        self.get_page(&path, &paging(LIST_PAGE_SIZE, page)).await
    }

    async fn list_following(&self, username: &str, page: u32) -> AppResult<Page<GitHubUser>> {
        let path = format!("/users/{}/following", segment(username));
        self.get_page(&path, &paging(LIST_PAGE_SIZE, page)).await
    }

    async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        page: u32,
    ) -> AppResult<Page<GitHubPullRequest>> {
        let path = format!("/repos/{}/{}/pulls", segment(owner), segment(repo));
        let mut query = vec![("state", "all".to_string())];
        query.extend(paging(ACTIVITY_PAGE_SIZE, page));

        self.get_page(&path, &query).await
    }

    async fn list_commits(
        &self,
        owner: &str,
        repo: &str,
        author: &str,
        since: Option<DateTime<Utc>>,
        page: u32,
    ) -> AppResult<Page<GitHubCommit>> {
        let path = format!("/repos/{}/{}/commits", segment(owner), segment(repo));
        let mut query = vec![("author", author.to_string())];
        if let Some(since) = since {
            query.push(("since", since.to_rfc3339_opts(SecondsFormat::Secs, true)));
        }
        query.extend(paging(ACTIVITY_PAGE_SIZE, page));

        let response = self.get(&path, &query).await?;

        // GitHub answers 409 for a repository without any commits
        if response.status() == StatusCode::CONFLICT {
            log::debug!("{} has no commits yet", path);
            return Ok(Page::last(Vec::new()));
        }

        let (items, next) = Self::read::<Vec<GitHubCommit>>(&path, response).await?;
        Ok(Page { items, next })
    }

    async fn search_pull_requests(
        &self,
        author: &str,
        month: &str,
        page: u32,
    ) -> AppResult<Page<GitHubSearchIssue>> {
        let path = "/search/issues";
        let mut query = vec![("q", format!("author:{} type:pr created:{}", author, month))];
        query.extend(paging(LIST_PAGE_SIZE, page));

        let response = self.get(path, &query).await?;
        let (body, next) = Self::read::<GitHubSearchResponse<GitHubSearchIssue>>(path, response).await?;

        Ok(Page {
            items: body.items,
            next,
        })
    }
}
