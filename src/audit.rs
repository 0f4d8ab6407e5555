//! Audit orchestration.
//!
//! [`run_audit`] is the main entry-point: it runs every enabled
//! [`Check`](crate::checks::Check) in parallel via [rayon] against an already
//! loaded lockfile and database, applies ignore rules, and produces a final
//! [`AuditReport`]. [`open_database`] prepares the database beforehand,
//! fetching and staleness-checking it according to the configuration.

use crate::checks::{self, AuditContext};
use crate::config::Config;
use crate::database::Database;
use crate::error::Result;
use crate::lockfile::Lockfile;
use crate::report::{AuditReport, CheckResult, DatabaseInfo, LockfileInfo};
use crate::repository;
use rayon::prelude::*;
use std::path::Path;
use tracing::{debug, warn};

/// Runs every enabled check against `lockfile`.
///
/// # Pipeline
///
/// 1. Loads every registered [`Check`](crate::checks::Check).
/// 2. Filters down to those enabled in [`Config::checks`](crate::config::Config::checks).
/// 3. Runs the active checks **in parallel** using [rayon].
///    Checks that are not available are recorded as *skipped*.
/// 4. Applies the configured ignore list and deny policy.
///
/// # Errors
///
/// Fails only when the `[output] deny` configuration is invalid.
///
/// # Examples
///
/// ```rust,no_run
/// use std::path::Path;
/// use oxidized_cargo_audit::{audit, config::Config, database::Database, lockfile::Lockfile};
///
/// let config = Config::load(None).unwrap();
/// let db = Database::open(Path::new("advisory-db")).unwrap();
/// let lockfile = Lockfile::load(Path::new("Cargo.lock")).unwrap();
/// let report = audit::run_audit(Path::new("Cargo.lock"), &lockfile, &db, &config).unwrap();
///
/// std::process::exit(if report.passed { 0 } else { 1 });
/// ```
pub fn run_audit(
    lockfile_path: &Path,
    lockfile: &Lockfile,
    database: &Database,
    config: &Config,
) -> Result<AuditReport> {
    let deny = config.deny_kinds()?;
    let ctx = AuditContext {
        lockfile,
        database,
        config,
    };

    let active: Vec<_> = checks::all_checks()
        .into_iter()
        .filter(|c| config.is_check_enabled(c.name()))
        .collect();

    let results: Vec<CheckResult> = active
        .par_iter()
        .map(|check| {
            if check.is_available(config) {
                debug!(check = check.name(), description = check.description(), "running check");
                check.run(&ctx)
            } else {
                CheckResult::skipped(check.name(), &format!("{} is not configured", check.name()))
            }
        })
        .collect();

    for result in results.iter().filter(|r| r.error.is_some()) {
        warn!(
            check = %result.check_name,
            error = result.error.as_deref().unwrap_or_default(),
            "check reported errors"
        );
    }

    let lockfile_info = LockfileInfo {
        path: lockfile_path.display().to_string(),
        dependency_count: lockfile.len(),
    };
    let database_info = DatabaseInfo {
        path: database.path().display().to_string(),
        advisory_count: database.len(),
        last_commit: database.last_commit().map(|c| c.hash.clone()),
        last_updated: database.last_commit().map(|c| c.timestamp.to_rfc3339()),
    };

    Ok(AuditReport::from_results(
        lockfile_info,
        database_info,
        results,
        &config.ignores(),
        &deny,
    ))
}

/// Opens the configured advisory database.
///
/// When `database.fetch` is set the checkout is cloned or updated first;
/// an existing directory that is not a git checkout is used as-is. When
/// `database.stale_days` is set and commit information is available, a
/// database older than the limit is rejected.
pub fn open_database(config: &Config) -> Result<Database> {
    let path = config.database_path();

    if config.database.fetch {
        if path.exists() && !path.join(".git").exists() {
            debug!(path = %path.display(), "database is not a git checkout; skipping fetch");
        } else {
            repository::fetch(&config.database.url, &path)?;
        }
    }

    let database = Database::open(&path)?;

    if let (Some(max_days), Some(commit)) = (config.database.stale_days, database.last_commit()) {
        repository::check_staleness(commit, max_days, chrono::Utc::now())?;
    }

    Ok(database)
}
