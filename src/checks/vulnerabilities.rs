//! Security vulnerability check.
//!
//! Matches every crates.io package in the lockfile against the non-withdrawn,
//! non-informational advisories of the `crates` collection. Each match is a
//! [`Severity::Error`] finding.
//!
//! Two settings narrow the result:
//!
//! - `advisories.severity_threshold` drops advisories whose CVSS rating is
//!   lower (advisories without CVSS are always kept);
//! - `target.os` / `target.arch` drop advisories whose `[affected]` table
//!   restricts them to other platforms.

use crate::checks::{make_finding, AuditContext, Check};
use crate::database::Query;
use crate::report::{CheckResult, FindingKind, Severity};
use std::time::Instant;
use tracing::debug;

pub struct VulnerabilityCheck;

impl Check for VulnerabilityCheck {
    fn name(&self) -> &'static str {
        "vulnerabilities"
    }

    fn description(&self) -> &'static str {
        "Security advisories affecting locked package versions"
    }

    fn is_available(&self, _config: &crate::config::Config) -> bool {
        true
    }

    fn run(&self, ctx: &AuditContext<'_>) -> CheckResult {
        let start = Instant::now();
        let settings = &ctx.config;

        let mut query = Query::crate_scope().informational(false);
        if let Some(threshold) = settings.advisories.severity_threshold {
            query = query.severity(threshold);
        }

        let target_os = settings.target.os.as_deref();
        let target_arch = settings.target.arch.as_deref();

        let findings: Vec<_> = ctx
            .database
            .vulnerabilities(ctx.lockfile, &query)
            .into_iter()
            .filter(|vuln| {
                vuln.advisory
                    .affected
                    .as_ref()
                    .map_or(true, |affected| affected.applies_to(target_os, target_arch))
            })
            .map(|vuln| {
                debug!(
                    advisory = vuln.advisory.id(),
                    package = %vuln.package,
                    "vulnerable package"
                );
                make_finding(
                    ctx,
                    self.name(),
                    FindingKind::Vulnerability,
                    Severity::Error,
                    vuln.package,
                    Some(vuln.advisory),
                )
            })
            .collect();

        CheckResult {
            check_name: self.name().to_string(),
            findings,
            packages_checked: ctx.lockfile.len(),
            skipped: false,
            skip_reason: None,
            error: None,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }
}
