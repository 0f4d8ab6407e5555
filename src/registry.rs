//! Yanked-release detection against a crates.io index checkout.
//!
//! Index lookups are slow compared to the rest of an audit, so
//! [`CachedIndex`] looks each crate up only once and keeps every published
//! version's yanked flag in memory. [`CachedIndex::find_yanked`] should be
//! called with all packages at once: the cache is populated for every crate
//! name in parallel before any package is checked.

use crate::error::{Error, Result};
use crate::package::{Name, Package};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One published version from an index file.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct IndexVersion {
    pub name: String,
    /// Kept as a string: registries contain versions that are not valid semver.
    pub vers: String,
    #[serde(default)]
    pub yanked: bool,
}

/// All published versions of one crate.
#[derive(Debug, Clone)]
pub struct IndexKrate {
    pub versions: Vec<IndexVersion>,
}

/// Somewhere crate metadata can be read from.
pub trait IndexSource: Send + Sync {
    /// Returns `Ok(None)` when the index has no such crate.
    fn krate(&self, name: &Name) -> Result<Option<IndexKrate>>;
}

/// A crates.io-layout index directory on disk.
///
/// Every crate has a file of JSON lines, one per published version, at a path
/// derived from its lower-cased name (see [`LocalIndex::crate_path`]).
pub struct LocalIndex {
    root: PathBuf,
}

impl LocalIndex {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::Registry(format!(
                "index directory not found: {}",
                root.display()
            )));
        }
        Ok(LocalIndex { root })
    }

    /// Relative path of a crate's index file.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::PathBuf;
    /// use oxidized_cargo_audit::registry::LocalIndex;
    ///
    /// assert_eq!(LocalIndex::crate_path("a"), PathBuf::from("1/a"));
    /// assert_eq!(LocalIndex::crate_path("cc"), PathBuf::from("2/cc"));
    /// assert_eq!(LocalIndex::crate_path("syn"), PathBuf::from("3/s/syn"));
    /// assert_eq!(LocalIndex::crate_path("Serde"), PathBuf::from("se/rd/serde"));
    /// ```
    pub fn crate_path(name: &str) -> PathBuf {
        let name = name.to_lowercase();
        match name.len() {
            1 => Path::new("1").join(&name),
            2 => Path::new("2").join(&name),
            3 => Path::new("3").join(&name[..1]).join(&name),
            _ => Path::new(&name[..2]).join(&name[2..4]).join(&name),
        }
    }
}

impl IndexSource for LocalIndex {
    fn krate(&self, name: &Name) -> Result<Option<IndexKrate>> {
        let path = self.root.join(Self::crate_path(name.as_str()));
        let file = match std::fs::File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Registry(format!(
                    "failed to open {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let mut versions = Vec::new();
        for line in std::io::BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let version: IndexVersion = serde_json::from_str(&line).map_err(|e| {
                Error::Registry(format!("malformed index entry in {}: {}", path.display(), e))
            })?;
            versions.push(version);
        }
        Ok(Some(IndexKrate { versions }))
    }
}

type CacheEntry = Result<Option<HashMap<String, bool>>>;

/// Per-crate memoizing wrapper around an [`IndexSource`].
pub struct CachedIndex<S> {
    source: S,
    cache: HashMap<Name, CacheEntry>,
}

impl<S: IndexSource> CachedIndex<S> {
    pub fn new(source: S) -> Self {
        CachedIndex {
            source,
            cache: HashMap::new(),
        }
    }

    /// Looks up every not-yet-cached crate in parallel.
    fn populate_cache(&mut self, names: BTreeSet<&Name>) {
        let missing: Vec<&Name> = names
            .into_iter()
            .filter(|n| !self.cache.contains_key(*n))
            .collect();
        debug!(crates = missing.len(), "populating index cache");

        let source = &self.source;
        let fetched: Vec<(Name, Result<Option<IndexKrate>>)> = missing
            .par_iter()
            .map(|name| ((*name).clone(), source.krate(name)))
            .collect();

        for (name, res) in fetched {
            self.insert(name, res);
        }
    }

    fn insert(&mut self, name: Name, krate: Result<Option<IndexKrate>>) {
        let entry = krate.map(|ik| {
            ik.map(|ik| {
                ik.versions
                    .into_iter()
                    .map(|v| (v.vers, v.yanked))
                    .collect()
            })
        });
        self.cache.insert(name, entry);
    }

    /// Is the given package yanked?
    pub fn is_yanked(&mut self, package: &Package) -> Result<bool> {
        if !self.cache.contains_key(&package.name) {
            let res = self.source.krate(&package.name);
            self.insert(package.name.clone(), res);
        }

        match &self.cache[&package.name] {
            Ok(Some(versions)) => match versions.get(&package.version.to_string()) {
                Some(yanked) => Ok(*yanked),
                None => Err(Error::NotFound(format!(
                    "no such version in crates.io index: {} {}",
                    package.name, package.version
                ))),
            },
            Ok(None) => Err(Error::NotFound(format!(
                "no such crate in crates.io index: {}",
                package.name
            ))),
            Err(err) => Err(Error::Registry(format!(
                "failed to retrieve {} from crates.io index: {}",
                package.name, err
            ))),
        }
    }

    /// Returns the yanked packages among `packages`, plus one `Err` per
    /// package whose status could not be determined.
    pub fn find_yanked<'a, I>(&mut self, packages: I) -> Vec<Result<&'a Package>>
    where
        I: IntoIterator<Item = &'a Package>,
    {
        let unique: BTreeSet<&Package> = packages.into_iter().collect();
        let names: BTreeSet<&Name> = unique.iter().map(|p| &p.name).collect();
        self.populate_cache(names);

        let mut yanked = Vec::new();
        for package in unique {
            match self.is_yanked(package) {
                Ok(false) => {}
                Ok(true) => yanked.push(Ok(package)),
                Err(err) => {
                    warn!(package = %package, error = %err, "yanked status unknown");
                    yanked.push(Err(err));
                }
            }
        }
        yanked
    }
}
