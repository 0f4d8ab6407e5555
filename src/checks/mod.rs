//! Pluggable lockfile checks.
//!
//! Every check implements the [`Check`] trait and produces a
//! [`CheckResult`]. The built-in checks are:
//!
//! - [`vulnerabilities`]: packages matched by security advisories.
//! - [`informational`]: unmaintained, unsound and notice advisories.
//! - [`yanked`]: releases yanked from crates.io (needs a local index).
//!
//! Use [`all_checks`] to obtain all registered checks.

pub mod informational;
pub mod vulnerabilities;
pub mod yanked;

use crate::advisory::Advisory;
use crate::config::Config;
use crate::database::Database;
use crate::lockfile::Lockfile;
use crate::package::Package;
use crate::report::{AdvisoryRef, CheckResult, Finding, FindingKind, Severity};

/// Everything a check can look at.
pub struct AuditContext<'a> {
    pub lockfile: &'a Lockfile,
    pub database: &'a Database,
    pub config: &'a Config,
}

/// A pluggable lockfile check.
///
/// Implementers **must** be [`Send`] + [`Sync`] because
/// [`audit::run_audit`](crate::audit::run_audit) executes checks in parallel
/// via [rayon].
pub trait Check: Send + Sync {
    /// Unique identifier, also the key in the `[checks]` config table.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Returns `true` if everything the check needs is configured.
    fn is_available(&self, config: &Config) -> bool;

    fn run(&self, ctx: &AuditContext<'_>) -> CheckResult;
}

/// Returns every registered [`Check`] implementation.
pub fn all_checks() -> Vec<Box<dyn Check>> {
    vec![
        Box::new(vulnerabilities::VulnerabilityCheck),
        Box::new(informational::InformationalCheck),
        Box::new(yanked::YankedCheck),
    ]
}

/// Builds a finding for `package`, filling in its lockfile line and dependency path.
pub(crate) fn make_finding(
    ctx: &AuditContext<'_>,
    check: &str,
    kind: FindingKind,
    severity: Severity,
    package: &Package,
    advisory: Option<&Advisory>,
) -> Finding {
    let dependency_path = ctx
        .lockfile
        .dependency_path(package)
        .into_iter()
        .map(|p| p.to_string())
        .collect();

    Finding {
        kind,
        severity,
        package: package.clone(),
        advisory: advisory.map(AdvisoryRef::from),
        dependency_path,
        line: ctx.lockfile.line_of(package),
        check: check.to_string(),
        suppressed: false,
        suppression_reason: None,
    }
}
