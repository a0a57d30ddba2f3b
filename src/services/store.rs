use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, LoaderTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{month, org, project, pull_request, user};
use crate::services::mapper::TrackedPullRequest;
use crate::utils::db::establish_connection;

/// A stored pull request with its org, project and month names resolved
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StoredPullRequest {
    pub id: Uuid,
    pub title: String,
    pub status: String,
    pub url: String,
    pub merged: bool,
    pub org: Option<String>,
    pub project: Option<String>,
    pub month: String,
    pub opened_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub github_user: String,
    pub pr_count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DashboardEntry {
    pub name: String,
    pub github_user: String,
    pub prs: Vec<StoredPullRequest>,
}

/// Tracked users and their monthly pull requests.
///
/// Owns the connection pool; one instance is created at startup and shared
/// by every request.
pub struct TrackerStore {
    db: DatabaseConnection,
}

impl TrackerStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn connect(database_url: &str) -> AppResult<Self> {
        Ok(Self::new(establish_connection(database_url).await?))
    }

    /// Close every pooled connection
    pub async fn close(&self) -> AppResult<()> {
        self.db.clone().close().await?;
        Ok(())
    }

    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        github_user: &str,
    ) -> AppResult<user::Model> {
        let created = insert_user(&self.db, name, email, github_user).await?;
        log::info!("Tracking GitHub user {}", github_user);
        Ok(created)
    }

    /// Create a tracked user together with their pull requests for each
    /// month, all in one transaction. Returns the user and how many pull
    /// requests were stored per month.
    pub async fn register_user(
        &self,
        name: &str,
        email: &str,
        github_user: &str,
        months: &[(String, Vec<TrackedPullRequest>)],
    ) -> AppResult<(user::Model, Vec<usize>)> {
        let txn = self.db.begin().await?;

        let created = insert_user(&txn, name, email, github_user).await?;
        let mut stored = Vec::with_capacity(months.len());
        for (month_name, prs) in months {
            stored.push(record_month(&txn, created.id, month_name, prs).await?.len());
        }

        txn.commit().await?;
        log::info!("Tracking GitHub user {}", github_user);
        Ok((created, stored))
    }

    pub async fn find_user_by_github(&self, github_user: &str) -> AppResult<Option<user::Model>> {
        Ok(user::Entity::find()
            .filter(user::Column::GithubUser.eq(github_user))
            .one(&self.db)
            .await?)
    }

    pub async fn list_users(&self) -> AppResult<Vec<user::Model>> {
        Ok(user::Entity::find()
            .order_by_asc(user::Column::Name)
            .all(&self.db)
            .await?)
    }

    /// Delete a tracked user with all of their pull requests.
    /// Returns false when no such user exists.
    pub async fn delete_user(&self, id: Uuid) -> AppResult<bool> {
        let txn = self.db.begin().await?;

        let Some(existing) = user::Entity::find_by_id(id).one(&txn).await? else {
            return Ok(false);
        };

        let affected_months: HashSet<Uuid> = pull_request::Entity::find()
            .filter(pull_request::Column::UserId.eq(id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|pr| pr.month_id)
            .collect();

        pull_request::Entity::delete_many()
            .filter(pull_request::Column::UserId.eq(id))
            .exec(&txn)
            .await?;
        user::Entity::delete_by_id(id).exec(&txn).await?;

        for month_id in affected_months {
            if let Some(month) = month::Entity::find_by_id(month_id).one(&txn).await? {
                refresh_month_stats(&txn, month).await?;
            }
        }

        txn.commit().await?;
        log::info!("Stopped tracking GitHub user {}", existing.github_user);
        Ok(true)
    }

    /// [`record_month`] in its own transaction
    pub async fn record_month_pull_requests(
        &self,
        user_id: Uuid,
        month_name: &str,
        prs: &[TrackedPullRequest],
    ) -> AppResult<Vec<pull_request::Model>> {
        let txn = self.db.begin().await?;
        let created = record_month(&txn, user_id, month_name, prs).await?;
        txn.commit().await?;
        Ok(created)
    }

    /// Pull request counts per tracked user across the given months
    pub async fn leaderboard(&self, months: &[String]) -> AppResult<Vec<LeaderboardEntry>> {
        let counts = self
            .pull_requests_by_user(months)
            .await?
            .into_iter()
            .map(|(id, prs)| (id, prs.len()))
            .collect::<HashMap<_, _>>();

        let mut entries: Vec<LeaderboardEntry> = self
            .list_users()
            .await?
            .into_iter()
            .map(|user| LeaderboardEntry {
                pr_count: counts.get(&user.id).copied().unwrap_or_default(),
                name: user.name,
                github_user: user.github_user,
            })
            .collect();

        entries.sort_by(|a, b| b.pr_count.cmp(&a.pr_count).then_with(|| a.name.cmp(&b.name)));
        Ok(entries)
    }

    /// Every tracked user with their pull requests in the given months
    pub async fn dashboard(&self, months: &[String]) -> AppResult<Vec<DashboardEntry>> {
        let mut by_user = self.pull_requests_by_user(months).await?;
        let mut entries = Vec::new();

        for user in self.list_users().await? {
            let prs = by_user.remove(&user.id).unwrap_or_default();
            entries.push(DashboardEntry {
                name: user.name,
                github_user: user.github_user,
                prs: hydrate(&self.db, prs).await?,
            });
        }

        Ok(entries)
    }

    /// Pull requests of one tracked user in one month, or `None` when either
    /// the user or the month is unknown
    pub async fn user_month_pull_requests(
        &self,
        github_user: &str,
        month_name: &str,
    ) -> AppResult<Option<Vec<StoredPullRequest>>> {
        let Some(user) = self.find_user_by_github(github_user).await? else {
            return Ok(None);
        };
        let Some(month) = self.find_month(month_name).await? else {
            return Ok(None);
        };

        let prs = pull_request::Entity::find()
            .filter(pull_request::Column::UserId.eq(user.id))
            .filter(pull_request::Column::MonthId.eq(month.id))
            .order_by_asc(pull_request::Column::OpenedAt)
            .all(&self.db)
            .await?;

        Ok(Some(hydrate(&self.db, prs).await?))
    }

    pub async fn find_month(&self, name: &str) -> AppResult<Option<month::Model>> {
        Ok(month::Entity::find()
            .filter(month::Column::Name.eq(name))
            .one(&self.db)
            .await?)
    }

    async fn pull_requests_by_user(
        &self,
        months: &[String],
    ) -> AppResult<HashMap<Uuid, Vec<pull_request::Model>>> {
        let month_ids: Vec<Uuid> = month::Entity::find()
            .filter(month::Column::Name.is_in(months.iter().cloned()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|m| m.id)
            .collect();

        if month_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut by_user: HashMap<Uuid, Vec<pull_request::Model>> = HashMap::new();
        for pr in pull_request::Entity::find()
            .filter(pull_request::Column::MonthId.is_in(month_ids))
            .order_by_asc(pull_request::Column::OpenedAt)
            .all(&self.db)
            .await?
        {
            by_user.entry(pr.user_id).or_default().push(pr);
        }

        Ok(by_user)
    }
}

pub async fn insert_user<C: ConnectionTrait>(
    conn: &C,
    name: &str,
    email: &str,
    github_user: &str,
) -> AppResult<user::Model> {
    let github_taken = user::Entity::find()
        .filter(user::Column::GithubUser.eq(github_user))
        .one(conn)
        .await?
        .is_some();
    if github_taken {
        return Err(AppError::invalid_input(
            "github_user",
            format!("'{}' is already tracked", github_user),
        ));
    }

    let email_taken = user::Entity::find()
        .filter(user::Column::Email.eq(email))
        .one(conn)
        .await?
        .is_some();
    if email_taken {
        return Err(AppError::invalid_input(
            "email",
            format!("'{}' is already registered", email),
        ));
    }

    let now = Utc::now();
    Ok(user::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        email: Set(email.to_string()),
        github_user: Set(github_user.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?)
}

/// Store one month of pull requests for a user, then refresh that month's
/// totals.
///
/// A pull request the user already has on record (same URL) is skipped,
/// including a repeat within `prs` itself.
pub async fn record_month<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    month_name: &str,
    prs: &[TrackedPullRequest],
) -> AppResult<Vec<pull_request::Model>> {
    let month = find_or_create_month(conn, month_name).await?;

    let mut known: HashSet<String> = pull_request::Entity::find()
        .filter(pull_request::Column::UserId.eq(user_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|pr| pr.url)
        .collect();

    let mut created = Vec::new();
    for pr in prs {
        if !known.insert(pr.url.clone()) {
            continue;
        }

        let org = if pr.org.is_empty() {
            None
        } else {
            Some(find_or_create_org(conn, &pr.org, &pr.org_url).await?)
        };
        let project = match &org {
            Some(org) if !pr.project.is_empty() => {
                Some(find_or_create_project(conn, org.id, &pr.project).await?)
            }
            _ => None,
        };

        let stored = create_pull_request(
            conn,
            user_id,
            month.id,
            org.map(|o| o.id),
            project.map(|p| p.id),
            pr,
        )
        .await?;
        created.push(stored);
    }

    refresh_month_stats(conn, month).await?;

    log::info!(
        "Recorded {} pull requests for {} ({} already known)",
        created.len(),
        month_name,
        prs.len() - created.len()
    );
    Ok(created)
}

pub async fn find_or_create_month<C: ConnectionTrait>(
    conn: &C,
    name: &str,
) -> AppResult<month::Model> {
    if let Some(existing) = month::Entity::find()
        .filter(month::Column::Name.eq(name))
        .one(conn)
        .await?
    {
        return Ok(existing);
    }

    let now = Utc::now();
    Ok(month::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        total_pr: Set(0),
        top_contributor: Set(None),
        highest_pr_on_org: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?)
}

pub async fn find_or_create_org<C: ConnectionTrait>(
    conn: &C,
    name: &str,
    url: &str,
) -> AppResult<org::Model> {
    if let Some(existing) = org::Entity::find()
        .filter(org::Column::Name.eq(name))
        .one(conn)
        .await?
    {
        return Ok(existing);
    }

    let now = Utc::now();
    Ok(org::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        url: Set(url.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?)
}

pub async fn find_or_create_project<C: ConnectionTrait>(
    conn: &C,
    org_id: Uuid,
    name: &str,
) -> AppResult<project::Model> {
    if let Some(existing) = project::Entity::find()
        .filter(project::Column::OrgId.eq(org_id))
        .filter(project::Column::Name.eq(name))
        .one(conn)
        .await?
    {
        return Ok(existing);
    }

    let now = Utc::now();
    Ok(project::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        org_id: Set(org_id),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?)
}

pub async fn create_pull_request<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    month_id: Uuid,
    org_id: Option<Uuid>,
    project_id: Option<Uuid>,
    pr: &TrackedPullRequest,
) -> AppResult<pull_request::Model> {
    let now = Utc::now();
    Ok(pull_request::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(pr.title.clone()),
        status: Set(pr.state.clone()),
        url: Set(pr.url.clone()),
        merged: Set(pr.merged),
        user_id: Set(user_id),
        month_id: Set(month_id),
        org_id: Set(org_id),
        project_id: Set(project_id),
        opened_at: Set(pr.opened_at),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?)
}

/// Recompute a month's total, its top contributor and its busiest org
async fn refresh_month_stats<C: ConnectionTrait>(conn: &C, month: month::Model) -> AppResult<()> {
    let prs = pull_request::Entity::find()
        .filter(pull_request::Column::MonthId.eq(month.id))
        .all(conn)
        .await?;

    let top_user = busiest(prs.iter().map(|pr| pr.user_id));
    let top_org = busiest(prs.iter().filter_map(|pr| pr.org_id));

    let top_contributor = match top_user {
        Some(id) => user::Entity::find_by_id(id)
            .one(conn)
            .await?
            .map(|u| u.github_user),
        None => None,
    };
    let highest_pr_on_org = match top_org {
        Some(id) => org::Entity::find_by_id(id).one(conn).await?.map(|o| o.name),
        None => None,
    };

    let mut active: month::ActiveModel = month.into();
    active.total_pr = Set(prs.len() as i32);
    active.top_contributor = Set(top_contributor);
    active.highest_pr_on_org = Set(highest_pr_on_org);
    active.updated_at = Set(Utc::now());
    active.update(conn).await?;

    Ok(())
}

/// Most frequent id; ties go to the smallest id so the result is stable
fn busiest(ids: impl Iterator<Item = Uuid>) -> Option<Uuid> {
    let mut counts: HashMap<Uuid, usize> = HashMap::new();
    for id in ids {
        *counts.entry(id).or_default() += 1;
    }

    counts
        .into_iter()
        .max_by(|(a_id, a), (b_id, b)| a.cmp(b).then_with(|| b_id.cmp(a_id)))
        .map(|(id, _)| id)
}

/// Resolve org, project and month names for a batch of pull requests
async fn hydrate<C: ConnectionTrait>(
    conn: &C,
    prs: Vec<pull_request::Model>,
) -> AppResult<Vec<StoredPullRequest>> {
    let orgs = prs.load_one(org::Entity, conn).await?;
    let projects = prs.load_one(project::Entity, conn).await?;
    let months = prs.load_one(month::Entity, conn).await?;

    Ok(prs
        .into_iter()
        .zip(orgs)
        .zip(projects)
        .zip(months)
        .map(|(((pr, org), project), month)| StoredPullRequest {
            id: pr.id,
            org: org.map(|o| o.name),
            project: project.map(|p| p.name),
            month: month.map(|m| m.name).unwrap_or_default(),
            title: pr.title,
            status: pr.status,
            url: pr.url,
            merged: pr.merged,
            opened_at: pr.opened_at,
        })
        .collect())
}
