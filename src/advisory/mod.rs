//! RustSec-format security advisories.
//!
//! An advisory file is Markdown with a TOML front matter block:
//!
//! ````text
//! ```toml
//! [advisory]
//! id = "RUSTSEC-2021-0001"
//! package = "example"
//! date = "2021-01-04"
//! cvss = "CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:H"
//!
//! [versions]
//! patched = [">= 1.2.0"]
//! ```
//!
//! # Title of the advisory
//!
//! Free-text description.
//! ````
//!
//! Older databases store the same tables in a plain `.toml` file with
//! `title` and `description` keys inside `[advisory]`; [`Advisory::parse`]
//! accepts both.

pub mod cvss;
mod versions;

pub use versions::Versions;

use crate::error::{Error, Result};
use crate::package::Name;
use chrono::NaiveDate;
use cvss::{Cvss, Rating};
use semver::VersionReq;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

const FRONT_MATTER_START: &str = "```toml";
const FRONT_MATTER_END: &str = "```";

/// Which collection of the database an advisory belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Advisories about crates published on crates.io.
    #[default]
    Crates,
    /// Advisories about the Rust toolchain and standard library.
    Rust,
}

impl Collection {
    pub fn dir_name(&self) -> &'static str {
        match self {
            Collection::Crates => "crates",
            Collection::Rust => "rust",
        }
    }
}

/// Kind of an informational (non-vulnerability) advisory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Informational {
    Unmaintained,
    Unsound,
    Notice,
    Other(String),
}

impl Informational {
    pub fn as_str(&self) -> &str {
        match self {
            Informational::Unmaintained => "unmaintained",
            Informational::Unsound => "unsound",
            Informational::Notice => "notice",
            Informational::Other(s) => s,
        }
    }
}

impl From<&str> for Informational {
    fn from(s: &str) -> Self {
        match s {
            "unmaintained" => Informational::Unmaintained,
            "unsound" => Informational::Unsound,
            "notice" => Informational::Notice,
            other => Informational::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Informational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for Informational {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for Informational {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Informational::from(s.as_str()))
    }
}

/// The `[advisory]` table.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct Metadata {
    pub id: String,
    pub package: Name,
    pub date: NaiveDate,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub references: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub related: Vec<String>,
    #[serde(default)]
    pub cvss: Option<Cvss>,
    #[serde(default)]
    pub informational: Option<Informational>,
    #[serde(default)]
    pub withdrawn: Option<NaiveDate>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(skip_deserializing)]
    pub collection: Collection,
}

impl Metadata {
    pub fn rating(&self) -> Option<Rating> {
        self.cvss.as_ref().map(Cvss::rating)
    }

    /// Returns `true` if `id` is this advisory's id or one of its aliases.
    pub fn is_known_as(&self, id: &str) -> bool {
        self.id == id || self.aliases.iter().any(|a| a == id)
    }
}

/// The optional `[affected]` table.
#[derive(Debug, Clone, Default, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct Affected {
    pub os: Vec<String>,
    pub arch: Vec<String>,
    pub functions: BTreeMap<String, Vec<VersionReq>>,
}

impl Affected {
    /// Whether a build for `os`/`arch` can be affected. An empty list means any.
    pub fn applies_to(&self, os: Option<&str>, arch: Option<&str>) -> bool {
        let fits = |list: &[String], target: Option<&str>| match target {
            Some(t) if !list.is_empty() => list.iter().any(|item| item == t),
            _ => true,
        };
        fits(&self.os, os) && fits(&self.arch, arch)
    }
}

#[derive(serde::Deserialize)]
struct FrontMatter {
    advisory: Metadata,
    #[serde(default)]
    versions: Versions,
    #[serde(default)]
    affected: Option<Affected>,
}

/// A single parsed advisory.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Advisory {
    pub metadata: Metadata,
    pub versions: Versions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected: Option<Affected>,
}

impl Advisory {
    /// Reads and parses an advisory file; `.toml` files use the legacy layout.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::advisory(path, e))?;
        let parsed = if path.extension().is_some_and(|ext| ext == "toml") {
            Self::parse_toml(&content)
        } else {
            Self::parse(&content)
        };
        parsed.map_err(|e| match e {
            Error::Advisory { message, .. } => Error::advisory(path, message),
            other => Error::advisory(path, other),
        })
    }

    /// Parses a Markdown advisory with TOML front matter.
    pub fn parse(content: &str) -> Result<Self> {
        let (front, body) = split_front_matter(content)?;
        let mut advisory = Self::parse_toml(front)?;

        let (title, description) = split_title(body);
        if !title.is_empty() {
            advisory.metadata.title = title;
        }
        if !description.is_empty() {
            advisory.metadata.description = description;
        }
        Ok(advisory)
    }

    /// Parses the TOML tables alone.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let front: FrontMatter =
            toml::from_str(content).map_err(|e| Error::advisory("<front matter>", e))?;
        let id = &front.advisory.id;
        let id_is_plain = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !id_is_plain {
            return Err(Error::advisory(
                "<front matter>",
                format!("advisory id {id:?} may only contain ASCII letters, digits and dashes"),
            ));
        }
        Ok(Advisory {
            metadata: front.advisory,
            versions: front.versions,
            affected: front.affected,
        })
    }

    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    pub fn is_withdrawn(&self) -> bool {
        self.metadata.withdrawn.is_some()
    }

    pub fn is_informational(&self) -> bool {
        self.metadata.informational.is_some()
    }
}

/// Splits a Markdown advisory into its TOML front matter and Markdown body.
pub(crate) fn split_front_matter(content: &str) -> Result<(&str, &str)> {
    let rest = content
        .trim_start()
        .strip_prefix(FRONT_MATTER_START)
        .ok_or_else(|| Error::advisory("<markdown>", "missing ```toml front matter"))?;
    let end = rest
        .find(&format!("\n{FRONT_MATTER_END}"))
        .ok_or_else(|| Error::advisory("<markdown>", "unterminated front matter block"))?;
    let front = &rest[..end];
    let body = &rest[end + 1 + FRONT_MATTER_END.len()..];
    Ok((front, body))
}

/// Returns the first `# ` heading and the text that follows it.
fn split_title(body: &str) -> (String, String) {
    let body = body.trim();
    match body.strip_prefix("# ") {
        Some(rest) => {
            let (title, description) = rest.split_once('\n').unwrap_or((rest, ""));
            (title.trim().to_string(), description.trim().to_string())
        }
        None => (String::new(), body.to_string()),
    }
}
