//! Advisory database linting.
//!
//! [`lint_database`] checks every advisory file for problems the parser alone
//! does not catch: malformed identifiers, misplaced files, dates in the
//! future, unknown keys and categories, and missing prose.
//!
//! # Rules
//!
//! | Problem | Example |
//! |---------|---------|
//! | Parse failure | invalid TOML, bad semver requirement, bad CVSS vector |
//! | Id format | `RUSTSEC-21-1` instead of `RUSTSEC-2021-0001` |
//! | File name | `crates/foo/RUSTSEC-2021-0002.md` holding `RUSTSEC-2021-0001` |
//! | Directory | `crates/bar/…` holding an advisory for `foo` |
//! | Dates | `date` in the future, `withdrawn` before `date` |
//! | URL | `http://` instead of `https://` |
//! | Categories | not in [`KNOWN_CATEGORIES`] |
//! | Keywords | upper-case or punctuation |
//! | Aliases | not a CVE or GHSA identifier |
//! | Unknown keys | any key not part of the advisory format |
//! | Prose | empty title or description |

use crate::advisory::{self, Advisory, Collection};
use crate::database;
use crate::error::Result;
use chrono::NaiveDate;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

/// Categories an advisory may declare.
pub const KNOWN_CATEGORIES: &[&str] = &[
    "code-execution",
    "crypto-failure",
    "denial-of-service",
    "file-disclosure",
    "format-injection",
    "memory-corruption",
    "memory-exposure",
    "privilege-escalation",
    "thread-safety",
];

const ADVISORY_KEYS: &[&str] = &[
    "id",
    "package",
    "date",
    "url",
    "references",
    "categories",
    "keywords",
    "aliases",
    "related",
    "cvss",
    "informational",
    "withdrawn",
    "license",
];
const LEGACY_ADVISORY_KEYS: &[&str] = &["title", "description"];
const VERSIONS_KEYS: &[&str] = &["patched", "unaffected"];
const AFFECTED_KEYS: &[&str] = &["os", "arch", "functions"];
const TOP_LEVEL_KEYS: &[&str] = &["advisory", "versions", "affected"];

static RE_ADVISORY_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^RUSTSEC-\d{4}-\d{4}$").unwrap());

static RE_ALIAS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(CVE-\d{4}-\d{4,}|GHSA(-[23456789cfghjmpqrvwx]{4}){3})$").unwrap()
});

static RE_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9 \-]*$").unwrap());

/// One problem in one advisory file.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LintIssue {
    pub path: PathBuf,
    pub message: String,
}

/// Result of linting a whole database.
#[derive(Debug, Default, serde::Serialize)]
pub struct LintReport {
    pub files_checked: usize,
    pub issues: Vec<LintIssue>,
}

impl LintReport {
    pub fn passed(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Lints every advisory below `path`, treating `today` as the current date.
///
/// # Errors
///
/// Returns [`Error::NotFound`](crate::error::Error::NotFound) when `path` is
/// not a directory. Problems inside advisory files are reported as
/// [`LintIssue`]s, not errors.
pub fn lint_database(path: &Path, today: NaiveDate) -> Result<LintReport> {
    if !path.is_dir() {
        return Err(crate::error::Error::NotFound(format!(
            "advisory database directory {}",
            path.display()
        )));
    }

    let mut report = LintReport::default();
    for (file, collection) in database::advisory_files(path)? {
        report.files_checked += 1;
        for message in lint_advisory_file(&file, collection, today) {
            report.issues.push(LintIssue {
                path: file.clone(),
                message,
            });
        }
    }
    debug!(
        files = report.files_checked,
        issues = report.issues.len(),
        "lint finished"
    );
    Ok(report)
}

/// Lints a single advisory file, returning one message per problem.
///
/// The collection is taken from the path: files below a `rust` directory
/// belong to the toolchain collection, everything else to `crates`.
pub fn lint_file(path: &Path, today: NaiveDate) -> Vec<String> {
    let in_rust_dir = path
        .components()
        .any(|c| c.as_os_str() == Collection::Rust.dir_name());
    let collection = if in_rust_dir {
        Collection::Rust
    } else {
        Collection::Crates
    };
    lint_advisory_file(path, collection, today)
}

fn lint_advisory_file(path: &Path, collection: Collection, today: NaiveDate) -> Vec<String> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return vec![format!("unreadable: {e}")],
    };
    let legacy = path.extension().is_some_and(|ext| ext == "toml");

    let front = if legacy {
        content.as_str()
    } else {
        match advisory::split_front_matter(&content) {
            Ok((front, _)) => front,
            Err(e) => return vec![error_message(e)],
        }
    };

    let mut issues = Vec::new();

    match toml::from_str::<toml::Table>(front) {
        Ok(table) => check_keys(&table, legacy, &mut issues),
        Err(e) => return vec![format!("invalid TOML: {e}")],
    }

    let parsed = if legacy {
        Advisory::parse_toml(&content)
    } else {
        Advisory::parse(&content)
    };
    let advisory = match parsed {
        Ok(a) => a,
        Err(e) => {
            issues.push(error_message(e));
            return issues;
        }
    };

    check_advisory(path, &advisory, collection, today, &mut issues);
    issues
}

fn error_message(e: crate::error::Error) -> String {
    match e {
        crate::error::Error::Advisory { message, .. } => message,
        other => other.to_string(),
    }
}

fn check_keys(table: &toml::Table, legacy: bool, issues: &mut Vec<String>) {
    for key in table.keys() {
        if !TOP_LEVEL_KEYS.contains(&key.as_str()) {
            issues.push(format!("unknown table [{key}]"));
        }
    }

    let sections: [(&str, &[&str]); 3] = [
        ("advisory", ADVISORY_KEYS),
        ("versions", VERSIONS_KEYS),
        ("affected", AFFECTED_KEYS),
    ];
    for (section, allowed) in sections {
        let Some(toml::Value::Table(inner)) = table.get(section) else {
            continue;
        };
        for key in inner.keys() {
            let is_legacy_key =
                section == "advisory" && LEGACY_ADVISORY_KEYS.contains(&key.as_str());
            if is_legacy_key && !legacy {
                issues.push(format!(
                    "[advisory] {key} belongs in the Markdown body, not the front matter"
                ));
            } else if !allowed.contains(&key.as_str()) && !is_legacy_key {
                issues.push(format!("unknown key {key:?} in [{section}]"));
            }
        }
    }
}

fn check_advisory(
    path: &Path,
    advisory: &Advisory,
    collection: Collection,
    today: NaiveDate,
    issues: &mut Vec<String>,
) {
    let meta = &advisory.metadata;

    if !RE_ADVISORY_ID.is_match(&meta.id) {
        issues.push(format!("malformed advisory id {:?}", meta.id));
    }

    if path.file_stem().is_some_and(|stem| stem != meta.id.as_str()) {
        issues.push(format!("file name does not match advisory id {}", meta.id));
    }

    if collection == Collection::Crates {
        let dir_name = path
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().to_string());
        if dir_name.as_deref().is_some_and(|d| d != meta.package.as_str()) {
            issues.push(format!(
                "advisory for {} is stored in directory {:?}",
                meta.package,
                dir_name.unwrap_or_default()
            ));
        }
    }

    if meta.date > today {
        issues.push(format!("date {} is in the future", meta.date));
    }
    if let Some(withdrawn) = meta.withdrawn {
        if withdrawn < meta.date {
            issues.push(format!(
                "withdrawn date {} precedes advisory date {}",
                withdrawn, meta.date
            ));
        }
    }

    if let Some(ref url) = meta.url {
        if !url.starts_with("https://") {
            issues.push(format!("url must use https: {url}"));
        }
    }

    for category in &meta.categories {
        if !KNOWN_CATEGORIES.contains(&category.as_str()) {
            issues.push(format!("unknown category {category:?}"));
        }
    }

    for keyword in &meta.keywords {
        if !RE_KEYWORD.is_match(keyword) {
            issues.push(format!(
                "keyword {keyword:?} must be lower-case letters, digits, spaces or dashes"
            ));
        }
    }

    for alias in &meta.aliases {
        if !RE_ALIAS.is_match(alias) {
            issues.push(format!("alias {alias:?} is not a CVE or GHSA identifier"));
        }
    }

    if meta.title.trim().is_empty() {
        issues.push("missing title".to_string());
    }
    if meta.description.trim().is_empty() {
        issues.push("missing description".to_string());
    }
}
