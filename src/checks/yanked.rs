//! Yanked release check.
//!
//! Looks up every crates.io package in a local crates.io index checkout
//! (`yanked.index_path`) through a [`CachedIndex`]. Yanked releases become
//! [`Severity::Warning`] findings; packages whose status cannot be determined
//! are summarized in [`CheckResult::error`].
//!
//! The check is unavailable, and therefore skipped, when no index path is
//! configured. A configured path that is not an index directory is reported
//! as a check error.

use crate::checks::{make_finding, AuditContext, Check};
use crate::config::Config;
use crate::registry::{CachedIndex, LocalIndex};
use crate::report::{CheckResult, FindingKind, Severity};
use std::time::Instant;

pub struct YankedCheck;

impl Check for YankedCheck {
    fn name(&self) -> &'static str {
        "yanked"
    }

    fn description(&self) -> &'static str {
        "Releases yanked from crates.io (requires a local index)"
    }

    fn is_available(&self, config: &Config) -> bool {
        config.yanked.index_path.is_some()
    }

    fn run(&self, ctx: &AuditContext<'_>) -> CheckResult {
        let start = Instant::now();

        let Some(index_path) = ctx.config.yanked.index_path.as_deref() else {
            return CheckResult::skipped(self.name(), "no crates.io index configured");
        };
        let index = match LocalIndex::new(index_path) {
            Ok(index) => index,
            Err(e) => {
                return CheckResult {
                    error: Some(e.to_string()),
                    duration_ms: start.elapsed().as_millis() as u64,
                    ..CheckResult::new(self.name())
                }
            }
        };

        let packages: Vec<_> = ctx
            .lockfile
            .packages()
            .iter()
            .filter(|p| p.is_from_crates_io())
            .collect();

        let mut cache = CachedIndex::new(index);
        let mut findings = Vec::new();
        let mut errors = Vec::new();

        for result in cache.find_yanked(packages.iter().copied()) {
            match result {
                Ok(package) => findings.push(make_finding(
                    ctx,
                    self.name(),
                    FindingKind::Yanked,
                    Severity::Warning,
                    package,
                    None,
                )),
                Err(e) => errors.push(e.to_string()),
            }
        }

        CheckResult {
            check_name: self.name().to_string(),
            findings,
            packages_checked: packages.len(),
            skipped: false,
            skip_reason: None,
            error: (!errors.is_empty()).then(|| errors.join("; ")),
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}
