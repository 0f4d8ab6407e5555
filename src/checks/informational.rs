//! Informational advisory check.
//!
//! Reports packages covered by advisories that carry an `informational`
//! kind. Only kinds listed in `advisories.informational_warnings` are
//! reported; each becomes a [`Severity::Warning`] finding.

use crate::checks::{make_finding, AuditContext, Check};
use crate::database::Query;
use crate::report::{CheckResult, FindingKind, Severity};
use std::time::Instant;

pub struct InformationalCheck;

impl Check for InformationalCheck {
    fn name(&self) -> &'static str {
        "informational"
    }

    fn description(&self) -> &'static str {
        "Unmaintained, unsound and notice advisories"
    }

    fn is_available(&self, _config: &crate::config::Config) -> bool {
        true
    }

    fn run(&self, ctx: &AuditContext<'_>) -> CheckResult {
        let start = Instant::now();
        let enabled = &ctx.config.advisories.informational_warnings;
        let query = Query::crate_scope().informational(true);

        let mut findings = Vec::new();
        for vuln in ctx.database.vulnerabilities(ctx.lockfile, &query) {
            let Some(info) = vuln.advisory.metadata.informational.as_ref() else {
                continue;
            };
            let kind = FindingKind::from(info);
            if !enabled.contains(&kind) {
                continue;
            }
            findings.push(make_finding(
                ctx,
                self.name(),
                kind,
                Severity::Warning,
                vuln.package,
                Some(vuln.advisory),
            ));
        }

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
