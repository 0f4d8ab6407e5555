//! JSON output formatter.
//!
//! Produces a pretty-printed JSON document with database and lockfile
//! metadata, vulnerabilities, warnings grouped by kind, and suppressed
//! findings.

use crate::report::{AuditReport, AuditStatus, CheckResult, DatabaseInfo, Finding, LockfileInfo};
use std::collections::BTreeMap;

#[derive(serde::Serialize)]
struct JsonOutput<'a> {
    database: &'a DatabaseInfo,
    lockfile: &'a LockfileInfo,
    audit_timestamp: &'a str,
    status: AuditStatus,
    passed: bool,
    checks: Vec<CheckSummary<'a>>,
    vulnerabilities: Vulnerabilities<'a>,
    warnings: BTreeMap<&'static str, Vec<&'a Finding>>,
    suppressed: &'a [Finding],
}

#[derive(serde::Serialize)]
struct CheckSummary<'a> {
    name: &'a str,
    skipped: bool,
    skip_reason: Option<&'a str>,
    error: Option<&'a str>,
    findings: usize,
    packages_checked: usize,
    duration_ms: u64,
}

#[derive(serde::Serialize)]
struct Vulnerabilities<'a> {
    found: bool,
    count: usize,
    list: Vec<&'a Finding>,
}

impl<'a> From<&'a CheckResult> for CheckSummary<'a> {
    fn from(r: &'a CheckResult) -> Self {
        CheckSummary {
            name: &r.check_name,
            skipped: r.skipped,
            skip_reason: r.skip_reason.as_deref(),
            error: r.error.as_deref(),
            findings: r.findings.len(),
            packages_checked: r.packages_checked,
            duration_ms: r.duration_ms,
        }
    }
}

/// Formats an [`AuditReport`] as pretty-printed JSON.
///
/// # Panics
///
/// Panics if the report cannot be serialized (should not happen with valid data).
pub fn format(report: &AuditReport) -> String {
    let list: Vec<&Finding> = report.vulnerabilities().collect();

    let mut warnings: BTreeMap<&'static str, Vec<&Finding>> = BTreeMap::new();
    for finding in report.warnings() {
        warnings.entry(finding.kind.as_str()).or_default().push(finding);
    }

    let output = JsonOutput {
        database: &report.database,
        lockfile: &report.lockfile,
        audit_timestamp: &report.audit_timestamp,
        status: report.status,
        passed: report.passed,
        checks: report.check_results.iter().map(CheckSummary::from).collect(),
        vulnerabilities: Vulnerabilities {
            found: !list.is_empty(),
            count: list.len(),
            list,
        },
        warnings,
        suppressed: &report.suppressed,
    };

    serde_json::to_string_pretty(&output).expect("JSON serialization failed")
}
