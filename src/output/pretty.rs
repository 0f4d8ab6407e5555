//! Human-readable colored text formatter.
//!
//! Produces a terminal-friendly report with ANSI color codes, showing check
//! statuses, each finding with its advisory details and dependency tree,
//! suppressed items, and a one-line summary.

use crate::report::{AuditReport, AuditStatus, Finding, FindingKind, Severity};
use colored::Colorize;

/// Formats an [`AuditReport`] as human-readable, ANSI-colored text.
///
/// Sections rendered (in order):
/// 1. **Header**: lockfile, database and timestamp.
/// 2. **Checks**: per-check pass/fail/skip status.
/// 3. **Findings**: one block per finding with its dependency tree.
/// 4. **Suppressed**: ignored advisories with reasons.
/// 5. **Summary**: overall status and counts.
pub fn format(report: &AuditReport) -> String {
    let mut out = String::new();

    // Header
    out.push_str(&format!(
        "\n{}\n",
        format!("  Crate Audit: {}  ", report.lockfile.path)
            .bold()
            .on_blue()
            .white()
    ));
    out.push_str(&format!(
        "  Database:  {} advisories ({})\n",
        report.database.advisory_count, report.database.path
    ));
    if let Some(ref updated) = report.database.last_updated {
        out.push_str(&format!("  Updated:   {}\n", updated));
    }
    out.push_str(&format!(
        "  Scanned:   {} crate dependencies\n",
        report.lockfile.dependency_count
    ));
    out.push_str(&format!("  Timestamp: {}\n\n", report.audit_timestamp));

    out.push_str(&format!("{}\n", "Checks".bold().underline()));
    for result in &report.check_results {
        let icon = if result.skipped {
            "SKIP".dimmed().to_string()
        } else {
            let has = |severity: Severity| result.findings.iter().any(|f| f.severity == severity);
            if has(Severity::Error) {
                "FAIL".red().bold().to_string()
            } else if has(Severity::Warning) {
                "WARN".yellow().bold().to_string()
            } else {
                "PASS".green().bold().to_string()
            }
        };

        let detail = if result.skipped {
            result
                .skip_reason
                .as_deref()
                .unwrap_or("skipped")
                .dimmed()
                .to_string()
        } else {
            format!(
                "{} findings, {} packages checked",
                result.findings.len(),
                result.packages_checked
            )
        };

        out.push_str(&format!(
            "  [{icon}] {name:<16} {detail}\n",
            name = result.check_name,
        ));
        if let Some(ref err) = result.error {
            out.push_str(&format!("         {}\n", err.red()));
        }
    }
    out.push('\n');

    if !report.findings.is_empty() {
        out.push_str(&format!("{}\n", "Findings".bold().underline()));
        for finding in &report.findings {
            render_finding(&mut out, finding, report.is_denied(finding));
        }
    }

    if !report.suppressed.is_empty() {
        out.push_str(&format!(
            "{} ({} suppressed)\n",
            "Suppressed".bold().underline(),
            report.suppressed.len()
        ));
        for finding in &report.suppressed {
            let reason = finding
                .suppression_reason
                .as_deref()
                .unwrap_or("no reason given");
            out.push_str(&format!(
                "  [SKIP] {:<20} {:<24} {}\n",
                finding.rule_id().dimmed(),
                finding.package.to_string(),
                reason.dimmed(),
            ));
        }
        out.push('\n');
    }

    let status_str = match report.status {
        AuditStatus::Passed => "PASSED".green().bold().to_string(),
        AuditStatus::Warning => "WARNING".yellow().bold().to_string(),
        AuditStatus::Failed => "FAILED".red().bold().to_string(),
    };

    out.push_str(&format!(
        "Result: {status_str}  |  {} vulnerabilities, {} warnings, {} suppressed\n",
        report.vulnerability_count(),
        report.warning_count(),
        report.suppressed.len(),
    ));

    out
}

fn render_finding(out: &mut String, finding: &Finding, denied: bool) {
    let label = match (finding.kind, denied) {
        (FindingKind::Vulnerability, _) | (_, true) => "ERROR".red().bold().to_string(),
        (_, false) => " WARN".yellow().bold().to_string(),
    };

    out.push_str(&format!(
        "  [{label}] {:<20} {}\n",
        finding.rule_id().dimmed(),
        finding.title(),
    ));
    out.push_str(&format!("          Crate:     {}\n", finding.package.name));
    out.push_str(&format!("          Version:   {}\n", finding.package.version));
    out.push_str(&format!("          Kind:      {}\n", finding.kind));

    if let Some(ref advisory) = finding.advisory {
        let meta = &advisory.metadata;
        out.push_str(&format!("          Date:      {}\n", meta.date));
        if let Some(ref url) = meta.url {
            out.push_str(&format!("          URL:       {}\n", url));
        }
        if let Some(ref cvss) = meta.cvss {
            out.push_str(&format!(
                "          Severity:  {} ({})\n",
                cvss.score(),
                cvss.rating()
            ));
        }
    }
    if let Some(remediation) = finding.remediation() {
        out.push_str(&format!("          Solution:  {}\n", remediation));
    }

    if finding.dependency_path.len() > 1 {
        out.push_str("          Dependency tree:\n");
        for (depth, entry) in finding.dependency_path.iter().enumerate() {
            if depth == 0 {
                out.push_str(&format!("          {}\n", entry));
            } else {
                out.push_str(&format!(
                    "          {}└── {}\n",
                    "    ".repeat(depth - 1),
                    entry.dimmed()
                ));
            }
        }
    }
    out.push('\n');
}
