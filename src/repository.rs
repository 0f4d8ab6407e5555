//! Advisory database checkouts managed with libgit2.
//!
//! A fresh clone is written to a temporary sibling directory and renamed into
//! place, so an interrupted clone never leaves a half-populated database
//! behind. Existing checkouts are updated by fetching the remote `HEAD` and
//! fast-forwarding the local branch.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use git2::{build::CheckoutBuilder, build::RepoBuilder, AutotagOption, FetchOptions, Repository};
use std::path::Path;
use tracing::{debug, info};

/// Default upstream advisory database.
pub const DEFAULT_URL: &str = "https://github.com/rustsec/advisory-db.git";

const REMOTE: &str = "origin";

/// The newest commit of a database checkout.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CommitInfo {
    pub hash: String,
    pub timestamp: DateTime<Utc>,
}

/// Clones `url` into `path`, or fast-forwards an existing checkout.
///
/// # Errors
///
/// Returns [`Error::Git`] when libgit2 fails, and [`Error::Repository`] when
/// `path` exists but is not a git checkout or the local branch has diverged
/// from the remote.
pub fn fetch(url: &str, path: &Path) -> Result<CommitInfo> {
    if path.join(".git").exists() {
        info!(path = %path.display(), "updating advisory database");
        let repo = Repository::open(path)?;
        fast_forward(&repo)?;
    } else if path.exists() {
        return Err(Error::Repository(format!(
            "{} exists but is not a git checkout",
            path.display()
        )));
    } else {
        info!(url, path = %path.display(), "cloning advisory database");
        let parent = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        std::fs::create_dir_all(parent)?;

        let staging = tempfile::Builder::new()
            .prefix(".advisory-db-")
            .tempdir_in(parent)?;
        let target = staging.path().join("checkout");
        RepoBuilder::new()
            .fetch_options(fetch_options())
            .clone(url, &target)?;
        std::fs::rename(&target, path)?;
    }

    last_commit(path)
}

fn fetch_options() -> FetchOptions<'static> {
    let mut options = FetchOptions::new();
    options.download_tags(AutotagOption::None);
    options.update_fetchhead(true);
    options
}

fn fast_forward(repo: &Repository) -> Result<()> {
    let mut remote = repo.find_remote(REMOTE)?;
    remote.fetch(&["HEAD"], Some(&mut fetch_options()), None)?;

    let fetch_head = repo.find_reference("FETCH_HEAD")?;
    let incoming = repo.reference_to_annotated_commit(&fetch_head)?;
    let (analysis, _) = repo.merge_analysis(&[&incoming])?;

    if analysis.is_up_to_date() {
        debug!("advisory database already up to date");
        return Ok(());
    }
    if !analysis.is_fast_forward() {
        return Err(Error::Repository(
            "local checkout has diverged from the remote; cannot fast-forward".to_string(),
        ));
    }

    let head = repo.head()?;
    let branch = head
        .name()
        .ok_or_else(|| Error::Repository("HEAD is not a valid UTF-8 reference".to_string()))?
        .to_string();
    repo.find_reference(&branch)?
        .set_target(incoming.id(), "fast-forward advisory database")?;
    repo.set_head(&branch)?;
    repo.checkout_head(Some(CheckoutBuilder::new().force()))?;
    debug!(commit = %incoming.id(), "fast-forwarded advisory database");
    Ok(())
}

/// Reads hash and commit time of `HEAD`.
pub fn last_commit(path: &Path) -> Result<CommitInfo> {
    if !path.join(".git").exists() {
        return Err(Error::Repository(format!(
            "{} is not a git checkout",
            path.display()
        )));
    }
    let repo = Repository::open(path)?;
    let commit = repo.head()?.peel_to_commit()?;
    let secs = commit.time().seconds();
    let timestamp = DateTime::<Utc>::from_timestamp(secs, 0)
        .ok_or_else(|| Error::Repository(format!("commit timestamp out of range: {secs}")))?;

    Ok(CommitInfo {
        hash: commit.id().to_string(),
        timestamp,
    })
}

/// Fails with [`Error::StaleDatabase`] when `commit` is older than `max_days`.
pub fn check_staleness(commit: &CommitInfo, max_days: u32, now: DateTime<Utc>) -> Result<()> {
    let age_days = (now - commit.timestamp).num_days();
    if age_days > i64::from(max_days) {
        Err(Error::StaleDatabase { age_days, max_days })
    } else {
        Ok(())
    }
}
