//! Configuration loading and management.
//!
//! The configuration file uses TOML and is looked up at `.cargo/audit.toml`
//! relative to the current directory unless a path is given explicitly.
//! Every field has a default, so the file can be omitted entirely.
//!
//! ```toml
//! [advisories]
//! ignore = [
//!     "RUSTSEC-2020-0071",
//!     { id = "RUSTSEC-2021-0145", reason = "only affects Windows" },
//! ]
//! informational_warnings = ["unmaintained", "unsound"]
//! severity_threshold = "medium"
//!
//! [database]
//! path = "~/.cargo/advisory-db"
//! fetch = true
//! stale_days = 90
//!
//! [output]
//! deny = ["unsound", "yanked"]
//!
//! [yanked]
//! index_path = "/srv/crates.io-index"
//! ```

use crate::advisory::cvss::Rating;
use crate::error::{Error, Result};
use crate::output::OutputFormat;
use crate::report::{FindingKind, Ignore};
use crate::repository;
use std::path::{Path, PathBuf};

/// Location probed when no config path is given.
pub const DEFAULT_CONFIG_PATH: &str = ".cargo/audit.toml";

/// Main configuration for the auditor.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    pub advisories: AdvisoriesConfig,
    pub database: DatabaseConfig,
    pub output: OutputConfig,
    pub target: TargetConfig,
    pub yanked: YankedConfig,
    pub checks: ChecksConfig,
}

/// Which advisories are reported.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct AdvisoriesConfig {
    /// Advisory ids (or aliases) to ignore, optionally with a reason.
    pub ignore: Vec<IgnoreEntry>,
    /// Informational advisory kinds reported as warnings.
    pub informational_warnings: Vec<FindingKind>,
    /// Vulnerabilities rated below this are not reported.
    pub severity_threshold: Option<Rating>,
}

/// An `ignore` list item: a bare id or an `{ id, reason }` table.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(untagged)]
pub enum IgnoreEntry {
    Id(String),
    Detailed(Ignore),
}

impl IgnoreEntry {
    pub fn id(&self) -> &str {
        match self {
            IgnoreEntry::Id(id) => id,
            IgnoreEntry::Detailed(ignore) => &ignore.id,
        }
    }

    pub fn to_ignore(&self) -> Ignore {
        match self {
            IgnoreEntry::Id(id) => Ignore {
                id: id.clone(),
                reason: "ignored in configuration".to_string(),
            },
            IgnoreEntry::Detailed(ignore) => ignore.clone(),
        }
    }
}

/// Where the advisory database lives and how it is kept current.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Checkout directory; defaults to `$CARGO_HOME/advisory-db`.
    pub path: Option<PathBuf>,
    /// Git URL cloned when the checkout does not exist.
    pub url: String,
    /// Clone or pull the database before auditing.
    pub fetch: bool,
    /// Fail when the newest database commit is older than this many days.
    pub stale_days: Option<u32>,
}

/// Report rendering and failure policy.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Warning kinds that fail the audit. `"warnings"` denies all of them.
    pub deny: Vec<String>,
    pub format: Option<OutputFormat>,
}

/// Restricts platform-specific advisories to one target.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub os: Option<String>,
    pub arch: Option<String>,
}

/// Yanked-release detection.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(default)]
pub struct YankedConfig {
    /// Local crates.io index checkout. The yanked check is skipped without one.
    pub index_path: Option<PathBuf>,
}

/// Per-check on/off toggles. Every check defaults to enabled.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct ChecksConfig {
    pub vulnerabilities: bool,
    pub informational: bool,
    pub yanked: bool,
}

impl Default for AdvisoriesConfig {
    fn default() -> Self {
        AdvisoriesConfig {
            ignore: vec![],
            informational_warnings: vec![
                FindingKind::Unmaintained,
                FindingKind::Unsound,
                FindingKind::Notice,
            ],
            severity_threshold: None,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            path: None,
            url: repository::DEFAULT_URL.to_string(),
            fetch: true,
            stale_days: Some(90),
        }
    }
}

impl Default for ChecksConfig {
    fn default() -> Self {
        ChecksConfig {
            vulnerabilities: true,
            informational: true,
            yanked: true,
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// Resolution order:
    /// 1. If `path` is `Some`, load from that file (error if missing).
    /// 2. If `path` is `None`, try [`DEFAULT_CONFIG_PATH`].
    /// 3. If that file does not exist either, return [`Config::default()`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the explicit path does not exist, the
    /// file cannot be read or parsed, or a `deny` entry is unknown.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let config_path = if let Some(p) = path {
            if p.exists() {
                Some(p.to_path_buf())
            } else {
                return Err(Error::Config(format!(
                    "config file not found: {}",
                    p.display()
                )));
            }
        } else {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            default_path.exists().then(|| default_path.to_path_buf())
        };

        match config_path {
            Some(path) => {
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    Error::Config(format!("failed to read {}: {}", path.display(), e))
                })?;
                let config = Self::parse(&content).map_err(|e| match e {
                    Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
                    other => other,
                })?;
                tracing::debug!(path = %path.display(), "loaded configuration");
                Ok(config)
            }
            None => Ok(Config::default()),
        }
    }

    /// Parses configuration text and validates it.
    pub fn parse(content: &str) -> Result<Config> {
        let config: Config = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.deny_kinds()?;
        Ok(config)
    }

    /// Expands `output.deny` into finding kinds.
    pub fn deny_kinds(&self) -> Result<Vec<FindingKind>> {
        let mut kinds = Vec::new();
        for entry in &self.output.deny {
            if entry == "warnings" {
                kinds.extend([
                    FindingKind::Unmaintained,
                    FindingKind::Unsound,
                    FindingKind::Notice,
                    FindingKind::Yanked,
                    FindingKind::Informational,
                ]);
            } else {
                let kind: FindingKind = entry.parse().map_err(Error::Config)?;
                kinds.push(kind);
            }
        }
        kinds.sort();
        kinds.dedup();
        Ok(kinds)
    }

    /// All configured ignores with their reasons.
    pub fn ignores(&self) -> Vec<Ignore> {
        self.advisories
            .ignore
            .iter()
            .map(IgnoreEntry::to_ignore)
            .collect()
    }

    /// Resolved database directory.
    pub fn database_path(&self) -> PathBuf {
        self.database
            .path
            .clone()
            .unwrap_or_else(default_database_path)
    }

    /// Returns `true` if the named check is enabled.
    ///
    /// Unknown check names are considered enabled.
    ///
    /// # Examples
    ///
    /// ```
    /// use oxidized_cargo_audit::config::Config;
    ///
    /// let config = Config::default();
    /// assert!(config.is_check_enabled("vulnerabilities"));
    /// assert!(config.is_check_enabled("unknown_check"));
    /// ```
    pub fn is_check_enabled(&self, name: &str) -> bool {
        match name {
            "vulnerabilities" => self.checks.vulnerabilities,
            "informational" => self.checks.informational,
            "yanked" => self.checks.yanked,
            _ => true,
        }
    }
}

/// `$CARGO_HOME/advisory-db`, falling back to `$HOME/.cargo/advisory-db`.
pub fn default_database_path() -> PathBuf {
    let cargo_home = std::env::var_os("CARGO_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".cargo")))
        .unwrap_or_else(|| PathBuf::from(".cargo"));
    cargo_home.join("advisory-db")
}
