//! Time-window filtering of pull requests and commits.
//!
//! Timestamps are compared in UTC at whole-second precision; a cutoff of
//! `None` means the window is unbounded and everything is kept.

use chrono::{DateTime, SubsecRound, Utc};

use crate::services::github::{GitHubCommit, GitHubPullRequest};

fn after(timestamp: DateTime<Utc>, cutoff: DateTime<Utc>) -> bool {
    timestamp.trunc_subsecs(0) > cutoff.trunc_subsecs(0)
}

/// Keep a pull request opened after the cutoff, or opened earlier but merged
/// after it.
pub fn include_pull_request(pr: &GitHubPullRequest, cutoff: Option<DateTime<Utc>>) -> bool {
    let Some(cutoff) = cutoff else {
        return true;
    };

    let created = pr.created_at.is_some_and(|at| after(at, cutoff));
    let merged = pr.merged_at.is_some_and(|at| after(at, cutoff));
    created || merged
}

/// Client-side commit check, for listings that ignore `since`.
///
/// GitHub's own `since` is inclusive, so a commit authored exactly at the
/// cutoff is kept. Commits without an author date are dropped.
pub fn include_commit(commit: &GitHubCommit, cutoff: Option<DateTime<Utc>>) -> bool {
    let Some(cutoff) = cutoff else {
        return true;
    };

    commit
        .authored_at()
        .is_some_and(|at| at.trunc_subsecs(0) >= cutoff.trunc_subsecs(0))
}
