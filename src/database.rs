//! Advisory database loading and querying.
//!
//! A database is a directory (usually a git checkout of the RustSec
//! `advisory-db`) laid out as:
//!
//! ```text
//! advisory-db/
//! ├── crates/<package>/RUSTSEC-YYYY-NNNN.md
//! └── rust/<component>/RUSTSEC-YYYY-NNNN.md
//! ```
//!
//! [`Database::open`] parses every advisory in parallel via [rayon] and keeps
//! a per-package index for fast lookups by [`Database::query`].

use crate::advisory::cvss::Rating;
use crate::advisory::{Advisory, Collection};
use crate::error::{Error, Result};
use crate::lockfile::Lockfile;
use crate::package::{Name, Package};
use crate::repository::{self, CommitInfo};
use chrono::Datelike;
use rayon::prelude::*;
use semver::Version;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// An in-memory advisory database.
#[derive(Debug)]
pub struct Database {
    path: PathBuf,
    advisories: Vec<Advisory>,
    by_package: HashMap<Name, Vec<usize>>,
    last_commit: Option<CommitInfo>,
}

/// A package matched by an advisory.
#[derive(Debug, Clone)]
pub struct Vulnerability<'a> {
    pub advisory: &'a Advisory,
    pub package: &'a Package,
}

impl Database {
    /// Loads every advisory found under `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when `path` is not a directory and
    /// [`Error::Advisory`] for the first advisory that fails to parse.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_dir() {
            return Err(Error::NotFound(format!(
                "advisory database directory {}",
                path.display()
            )));
        }

        let files = advisory_files(path)?;
        debug!(count = files.len(), path = %path.display(), "parsing advisory files");

        let mut advisories: Vec<Advisory> = files
            .par_iter()
            .map(|(file, collection)| {
                let mut advisory = Advisory::load(file)?;
                advisory.metadata.collection = *collection;
                Ok(advisory)
            })
            .collect::<Result<Vec<_>>>()?;

        advisories.sort_by(|a, b| a.id().cmp(b.id()));

        let mut by_package: HashMap<Name, Vec<usize>> = HashMap::new();
        for (idx, advisory) in advisories.iter().enumerate() {
            by_package
                .entry(advisory.metadata.package.clone())
                .or_default()
                .push(idx);
        }

        let last_commit = repository::last_commit(path).ok();
        info!(
            advisories = advisories.len(),
            path = %path.display(),
            "loaded advisory database"
        );

        Ok(Database {
            path: path.to_path_buf(),
            advisories,
            by_package,
            last_commit,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.advisories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.advisories.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Advisory> {
        self.advisories.iter()
    }

    /// Looks up an advisory by id or alias.
    pub fn get(&self, id: &str) -> Option<&Advisory> {
        self.advisories.iter().find(|a| a.metadata.is_known_as(id))
    }

    /// Newest commit of the checkout, when the database is a git repository.
    pub fn last_commit(&self) -> Option<&CommitInfo> {
        self.last_commit.as_ref()
    }

    /// Returns every advisory matching `query`, in id order.
    pub fn query(&self, query: &Query) -> Vec<&Advisory> {
        match &query.package_name {
            Some(name) => self
                .by_package
                .get(name)
                .map(|indices| {
                    indices
                        .iter()
                        .map(|&i| &self.advisories[i])
                        .filter(|a| query.matches(a))
                        .collect()
                })
                .unwrap_or_default(),
            None => self.advisories.iter().filter(|a| query.matches(a)).collect(),
        }
    }

    /// Finds every lockfile package affected by an advisory matching `query`.
    ///
    /// `query`'s package name and version are overridden per package.
    pub fn vulnerabilities<'a>(
        &'a self,
        lockfile: &'a Lockfile,
        query: &Query,
    ) -> Vec<Vulnerability<'a>> {
        let mut found = Vec::new();
        for package in lockfile.packages() {
            if query.crates_io_only && !package.is_from_crates_io() {
                continue;
            }
            let package_query = query
                .clone()
                .package_name(package.name.clone())
                .package_version(package.version.clone());
            for advisory in self.query(&package_query) {
                found.push(Vulnerability { advisory, package });
            }
        }
        found
    }
}

/// Collects `*.md` and `*.toml` files below the `crates` and `rust` directories.
///
/// An unreadable directory entry fails the whole walk.
pub(crate) fn advisory_files(root: &Path) -> Result<Vec<(PathBuf, Collection)>> {
    let mut files = Vec::new();
    for collection in [Collection::Crates, Collection::Rust] {
        let dir = root.join(collection.dir_name());
        if !dir.is_dir() {
            continue;
        }
        for entry in WalkDir::new(&dir).sort_by_file_name() {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let is_advisory = path
                .extension()
                .is_some_and(|ext| ext == "md" || ext == "toml");
            if is_advisory {
                files.push((path.to_path_buf(), collection));
            }
        }
    }
    Ok(files)
}

/// Filter over database advisories.
///
/// # Examples
///
/// ```rust,no_run
/// use std::path::Path;
/// use oxidized_cargo_audit::database::{Database, Query};
///
/// let db = Database::open(Path::new("advisory-db")).unwrap();
/// let recent = db.query(&Query::new().year(2024).withdrawn(false));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Query {
    collection: Option<Collection>,
    package_name: Option<Name>,
    package_version: Option<Version>,
    severity: Option<Rating>,
    year: Option<i32>,
    withdrawn: Option<bool>,
    informational: Option<bool>,
    crates_io_only: bool,
}

impl Query {
    /// A query matching every advisory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-withdrawn advisories about crates.io packages.
    pub fn crate_scope() -> Self {
        Query {
            collection: Some(Collection::Crates),
            withdrawn: Some(false),
            crates_io_only: true,
            ..Self::default()
        }
    }

    pub fn collection(mut self, collection: Collection) -> Self {
        self.collection = Some(collection);
        self
    }

    pub fn package_name(mut self, name: Name) -> Self {
        self.package_name = Some(name);
        self
    }

    /// Only advisories for which `version` is vulnerable.
    pub fn package_version(mut self, version: Version) -> Self {
        self.package_version = Some(version);
        self
    }

    /// Minimum CVSS rating. Advisories without a CVSS vector always pass.
    pub fn severity(mut self, rating: Rating) -> Self {
        self.severity = Some(rating);
        self
    }

    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn withdrawn(mut self, withdrawn: bool) -> Self {
        self.withdrawn = Some(withdrawn);
        self
    }

    pub fn informational(mut self, informational: bool) -> Self {
        self.informational = Some(informational);
        self
    }

    pub fn matches(&self, advisory: &Advisory) -> bool {
        let meta = &advisory.metadata;

        if self.collection.is_some_and(|c| c != meta.collection) {
            return false;
        }
        if self
            .package_name
            .as_ref()
            .is_some_and(|name| name != &meta.package)
        {
            return false;
        }
        if self
            .package_version
            .as_ref()
            .is_some_and(|v| !advisory.versions.is_vulnerable(v))
        {
            return false;
        }
        if let (Some(threshold), Some(rating)) = (self.severity, meta.rating()) {
            if rating < threshold {
                return false;
            }
        }
        if self.year.is_some_and(|y| y != meta.date.year()) {
            return false;
        }
        if self
            .withdrawn
            .is_some_and(|w| w != advisory.is_withdrawn())
        {
            return false;
        }
        if self
            .informational
            .is_some_and(|i| i != advisory.is_informational())
        {
            return false;
        }
        true
    }
}
