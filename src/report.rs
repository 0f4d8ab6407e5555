use crate::advisory::{Advisory, Informational, Metadata, Versions};
use crate::package::Package;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// What a finding reports.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FindingKind {
    Vulnerability,
    Unmaintained,
    Unsound,
    Notice,
    Yanked,
    /// An informational advisory of a kind this tool does not know.
    Informational,
}

impl FindingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingKind::Vulnerability => "vulnerability",
            FindingKind::Unmaintained => "unmaintained",
            FindingKind::Unsound => "unsound",
            FindingKind::Notice => "notice",
            FindingKind::Yanked => "yanked",
            FindingKind::Informational => "informational",
        }
    }

    pub fn is_warning(&self) -> bool {
        !matches!(self, FindingKind::Vulnerability)
    }
}

impl From<&Informational> for FindingKind {
    fn from(info: &Informational) -> Self {
        match info {
            Informational::Unmaintained => FindingKind::Unmaintained,
            Informational::Unsound => FindingKind::Unsound,
            Informational::Notice => FindingKind::Notice,
            Informational::Other(_) => FindingKind::Informational,
        }
    }
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FindingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vulnerability" => Ok(FindingKind::Vulnerability),
            "unmaintained" => Ok(FindingKind::Unmaintained),
            "unsound" => Ok(FindingKind::Unsound),
            "notice" => Ok(FindingKind::Notice),
            "yanked" => Ok(FindingKind::Yanked),
            "informational" => Ok(FindingKind::Informational),
            other => Err(format!("unknown finding kind: {other}")),
        }
    }
}

/// The advisory part of a finding.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AdvisoryRef {
    #[serde(flatten)]
    pub metadata: Metadata,
    pub versions: Versions,
}

impl From<&Advisory> for AdvisoryRef {
    fn from(advisory: &Advisory) -> Self {
        AdvisoryRef {
            metadata: advisory.metadata.clone(),
            versions: advisory.versions.clone(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Finding {
    pub kind: FindingKind,
    pub severity: Severity,
    pub package: Package,
    /// `None` only for yanked findings.
    pub advisory: Option<AdvisoryRef>,
    /// `name version` entries from a root package down to `package`.
    pub dependency_path: Vec<String>,
    /// Line of the package entry in `Cargo.lock`.
    pub line: Option<usize>,
    pub check: String,
    pub suppressed: bool,
    pub suppression_reason: Option<String>,
}

impl Finding {
    /// Rule identifier: the advisory id, or `yanked`.
    pub fn rule_id(&self) -> &str {
        match &self.advisory {
            Some(a) => &a.metadata.id,
            None => self.kind.as_str(),
        }
    }

    pub fn title(&self) -> String {
        match &self.advisory {
            Some(a) if !a.metadata.title.is_empty() => a.metadata.title.clone(),
            Some(a) => format!("{} advisory for {}", self.kind, a.metadata.package),
            None => format!("{} {} has been yanked", self.package.name, self.package.version),
        }
    }

    /// Suggested fix, derived from the patched versions.
    pub fn remediation(&self) -> Option<String> {
        match &self.advisory {
            Some(a) if !a.versions.patched.is_empty() => {
                let reqs: Vec<String> = a.versions.patched.iter().map(|r| r.to_string()).collect();
                Some(format!("Upgrade to {}", reqs.join(" OR ")))
            }
            Some(_) if self.kind == FindingKind::Vulnerability => {
                Some("No fixed upgrade is available".to_string())
            }
            Some(_) => None,
            None => Some(format!(
                "Update {} to a release that has not been yanked",
                self.package.name
            )),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct CheckResult {
    pub check_name: String,
    pub findings: Vec<Finding>,
    pub packages_checked: usize,
    pub skipped: bool,
    pub skip_reason: Option<String>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl CheckResult {
    /// An empty result for a check that ran.
    pub fn new(name: &str) -> Self {
        CheckResult {
            check_name: name.to_string(),
            findings: vec![],
            packages_checked: 0,
            skipped: false,
            skip_reason: None,
            error: None,
            duration_ms: 0,
        }
    }

    pub fn skipped(name: &str, reason: &str) -> Self {
        CheckResult {
            check_name: name.to_string(),
            findings: vec![],
            packages_checked: 0,
            skipped: true,
            skip_reason: Some(reason.to_string()),
            error: None,
            duration_ms: 0,
        }
    }
}

/// Database facts recorded in the report.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DatabaseInfo {
    pub path: String,
    pub advisory_count: usize,
    pub last_commit: Option<String>,
    pub last_updated: Option<String>,
}

/// Lockfile facts recorded in the report.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LockfileInfo {
    pub path: String,
    pub dependency_count: usize,
}

/// A lockfile-wide ignore entry with the reason it was accepted.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct Ignore {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, serde::Serialize)]
pub struct AuditReport {
    pub lockfile: LockfileInfo,
    pub database: DatabaseInfo,
    pub audit_timestamp: String,
    pub status: AuditStatus,
    pub check_results: Vec<CheckResult>,
    pub findings: Vec<Finding>,
    pub suppressed: Vec<Finding>,
    pub denied: Vec<FindingKind>,
    pub passed: bool,
}

impl AuditReport {
    /// Assembles the report: applies ignores, then computes the status.
    ///
    /// A vulnerability always fails the audit. A warning fails it only when its
    /// kind is listed in `deny`.
    pub fn from_results(
        lockfile: LockfileInfo,
        database: DatabaseInfo,
        results: Vec<CheckResult>,
        ignores: &[Ignore],
        deny: &[FindingKind],
    ) -> Self {
        let mut active = Vec::new();
        let mut suppressed = Vec::new();

        for result in &results {
            for finding in &result.findings {
                if finding.suppressed {
                    suppressed.push(finding.clone());
                } else if let Some(ignore) = find_ignore(finding, ignores) {
                    let mut f = finding.clone();
                    f.suppressed = true;
                    f.suppression_reason = Some(ignore.reason.clone());
                    suppressed.push(f);
                } else {
                    active.push(finding.clone());
                }
            }
        }

        active.sort_by(|a, b| {
            (a.kind, &a.package, a.rule_id()).cmp(&(b.kind, &b.package, b.rule_id()))
        });

        let status = compute_status(&active, deny);
        let passed = !matches!(status, AuditStatus::Failed);

        AuditReport {
            lockfile,
            database,
            audit_timestamp: chrono::Utc::now().to_rfc3339(),
            status,
            check_results: results,
            findings: active,
            suppressed,
            denied: deny.to_vec(),
            passed,
        }
    }

    pub fn vulnerabilities(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.kind == FindingKind::Vulnerability)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.kind.is_warning())
    }

    pub fn vulnerability_count(&self) -> usize {
        self.vulnerabilities().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    /// Whether `finding` is what made the audit fail.
    pub fn is_denied(&self, finding: &Finding) -> bool {
        finding.kind == FindingKind::Vulnerability || self.denied.contains(&finding.kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditStatus {
    Passed,
    Warning,
    Failed,
}

fn compute_status(findings: &[Finding], deny: &[FindingKind]) -> AuditStatus {
    let (has_failure, has_warnings) = findings.iter().fold((false, false), |(fail, warn), f| {
        let denied = f.kind == FindingKind::Vulnerability || deny.contains(&f.kind);
        (fail || denied, warn || f.kind.is_warning())
    });

    if has_failure {
        AuditStatus::Failed
    } else if has_warnings {
        AuditStatus::Warning
    } else {
        AuditStatus::Passed
    }
}

fn find_ignore<'a>(finding: &Finding, ignores: &'a [Ignore]) -> Option<&'a Ignore> {
    let advisory = finding.advisory.as_ref()?;
    ignores
        .iter()
        .find(|ignore| advisory.metadata.is_known_as(&ignore.id))
}
