//! Package identities as they appear in `Cargo.lock`.
//!
//! [`Name`] is a validated crate name, [`SourceId`] classifies the `source`
//! string of a lockfile entry, and [`Package`] ties both to a concrete
//! [`semver::Version`].

use crate::error::{Error, Result};
use semver::Version;
use std::fmt;
use std::str::FromStr;

/// Git index URL of crates.io.
pub const CRATES_IO_INDEX: &str = "https://github.com/rust-lang/crates.io-index";

/// Sparse index URL of crates.io.
pub const CRATES_IO_SPARSE_INDEX: &str = "https://index.crates.io/";

const MAX_NAME_LEN: usize = 64;

/// A crate name.
///
/// Accepts ASCII alphanumerics, `-` and `_`, up to 64 characters.
///
/// # Examples
///
/// ```
/// use oxidized_cargo_audit::package::Name;
///
/// let name: Name = "serde_json".parse().unwrap();
/// assert_eq!(name.as_str(), "serde_json");
/// assert!("not a crate".parse::<Name>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Name(String);

impl Name {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let valid = !s.is_empty()
            && s.len() <= MAX_NAME_LEN
            && s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if valid {
            Ok(Name(s.to_string()))
        } else {
            Err(Error::InvalidName(s.to_string()))
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Name {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for Name {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Name {
    fn deserialize<D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Kind of package source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SourceKind {
    /// `registry+<url>`: a git-backed registry index.
    Registry,
    /// `sparse+<url>`: an HTTP sparse registry index.
    SparseRegistry,
    /// `git+<url>`: a git repository dependency.
    Git,
    /// Anything else cargo may write.
    Other,
}

/// The `source` of a lockfile package.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId {
    pub kind: SourceKind,
    /// URL without the `kind+` prefix. For git sources the `#rev` fragment is kept.
    pub url: String,
}

impl SourceId {
    /// The crates.io source as written by current cargo versions.
    pub fn crates_io() -> Self {
        SourceId {
            kind: SourceKind::Registry,
            url: CRATES_IO_INDEX.to_string(),
        }
    }

    pub fn is_crates_io(&self) -> bool {
        match self.kind {
            SourceKind::Registry => self.url.trim_end_matches('/') == CRATES_IO_INDEX,
            SourceKind::SparseRegistry => {
                self.url.trim_end_matches('/') == CRATES_IO_SPARSE_INDEX.trim_end_matches('/')
            }
            _ => false,
        }
    }

    pub fn is_git(&self) -> bool {
        self.kind == SourceKind::Git
    }
}

impl FromStr for SourceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(Error::Lockfile("empty package source".to_string()));
        }
        let (kind, url) = match s.split_once('+') {
            Some(("registry", url)) => (SourceKind::Registry, url),
            Some(("sparse", url)) => (SourceKind::SparseRegistry, url),
            Some(("git", url)) => (SourceKind::Git, url),
            _ => (SourceKind::Other, s),
        };
        Ok(SourceId {
            kind,
            url: url.to_string(),
        })
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SourceKind::Registry => write!(f, "registry+{}", self.url),
            SourceKind::SparseRegistry => write!(f, "sparse+{}", self.url),
            SourceKind::Git => write!(f, "git+{}", self.url),
            SourceKind::Other => f.write_str(&self.url),
        }
    }
}

impl serde::Serialize for SourceId {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A dependency edge as written in a lockfile `dependencies` array.
///
/// Lockfiles write `"name"`, `"name version"` or `"name version (source)"`,
/// using the shortest form that is unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct Dependency {
    pub name: Name,
    pub version: Option<Version>,
    pub source: Option<SourceId>,
}

impl FromStr for Dependency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, ' ');
        let name = parts
            .next()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| Error::Lockfile(format!("empty dependency entry: {s:?}")))?
            .parse()?;
        let version = parts.next().map(Version::parse).transpose()?;
        let source = match parts.next() {
            Some(src) => {
                let inner = src
                    .strip_prefix('(')
                    .and_then(|r| r.strip_suffix(')'))
                    .ok_or_else(|| {
                        Error::Lockfile(format!("malformed dependency source in {s:?}"))
                    })?;
                Some(inner.parse()?)
            }
            None => None,
        };
        Ok(Dependency {
            name,
            version,
            source,
        })
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(v) = &self.version {
            write!(f, " {v}")?;
        }
        if let Some(src) = &self.source {
            write!(f, " ({src})")?;
        }
        Ok(())
    }
}

/// A resolved package from `Cargo.lock`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
pub struct Package {
    pub name: Name,
    pub version: Version,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
}

impl Package {
    /// Returns `true` when the package was downloaded from crates.io.
    pub fn is_from_crates_io(&self) -> bool {
        self.source.as_ref().is_some_and(SourceId::is_crates_io)
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

