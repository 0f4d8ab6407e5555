//! `Cargo.lock` parsing.
//!
//! Supports every lockfile layout cargo has written so far: the v1 format with
//! a `[metadata]` checksum table, the implicit v2 format, and the explicit
//! `version = 3` / `version = 4` formats. Only the `[[package]]` array is
//! interpreted; everything else is ignored.

use crate::error::{Error, Result};
use crate::package::{Dependency, Name, Package, SourceId};
use semver::Version;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

#[derive(serde::Deserialize)]
struct RawLockfile {
    version: Option<u32>,
    #[serde(default, rename = "package")]
    packages: Vec<RawPackage>,
}

#[derive(serde::Deserialize)]
struct RawPackage {
    name: String,
    version: String,
    source: Option<String>,
    checksum: Option<String>,
    #[serde(default)]
    dependencies: Vec<String>,
}

/// A parsed `Cargo.lock`.
#[derive(Debug, Clone)]
pub struct Lockfile {
    /// Format version; `None` for the implicit v1/v2 layouts.
    pub version: Option<u32>,
    packages: Vec<Package>,
    lines: HashMap<(Name, Version), usize>,
    /// For each package index, the indices of the packages depending on it.
    dependents: Vec<Vec<usize>>,
}

impl Lockfile {
    /// Reads and parses a lockfile from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Lockfile(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parses lockfile text.
    ///
    /// # Errors
    ///
    /// Fails on malformed TOML, unparsable names, versions or dependency
    /// entries, and on duplicate `(name, version, source)` triples.
    pub fn parse(content: &str) -> Result<Self> {
        let raw: RawLockfile =
            toml::from_str(content).map_err(|e| Error::Lockfile(e.to_string()))?;

        let mut packages = Vec::with_capacity(raw.packages.len());
        let mut seen = HashSet::new();

        for raw_pkg in raw.packages {
            let name: Name = raw_pkg.name.parse()?;
            let version = Version::parse(&raw_pkg.version).map_err(|e| {
                Error::Lockfile(format!(
                    "invalid version {:?} for package {}: {}",
                    raw_pkg.version, name, e
                ))
            })?;
            let source = raw_pkg.source.as_deref().map(str::parse::<SourceId>).transpose()?;
            let dependencies = raw_pkg
                .dependencies
                .iter()
                .map(|d| d.parse::<Dependency>())
                .collect::<Result<Vec<_>>>()?;

            if !seen.insert((name.clone(), version.clone(), source.clone())) {
                return Err(Error::Lockfile(format!(
                    "duplicate package entry: {} {}",
                    name, version
                )));
            }

            packages.push(Package {
                name,
                version,
                source,
                checksum: raw_pkg.checksum,
                dependencies,
            });
        }

        let dependents = reverse_edges(&packages);
        Ok(Lockfile {
            version: raw.version,
            packages,
            lines: index_package_lines(content),
            dependents,
        })
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Finds a package by name and exact version.
    pub fn find(&self, name: &str, version: &Version) -> Option<&Package> {
        self.packages
            .iter()
            .find(|p| p.name.as_str() == name && &p.version == version)
    }

    /// 1-based line of the package's `name = "..."` entry.
    pub fn line_of(&self, package: &Package) -> Option<usize> {
        self.lines
            .get(&(package.name.clone(), package.version.clone()))
            .copied()
    }

    /// Resolves a dependency edge to the package it refers to.
    ///
    /// Bare-name edges resolve only when exactly one package has that name.
    pub fn resolve(&self, dep: &Dependency) -> Option<&Package> {
        let mut candidates = self.packages.iter().filter(|p| satisfies(p, dep));
        let first = candidates.next()?;
        match candidates.next() {
            Some(_) => None,
            None => Some(first),
        }
    }

    /// Shortest dependency chain from a root package down to `package`.
    ///
    /// A root is a package nothing else depends on. The returned chain starts
    /// at the root and ends with `package`. When `package` itself has no
    /// dependents the chain is just `[package]`.
    pub fn dependency_path<'a>(&'a self, package: &'a Package) -> Vec<&'a Package> {
        let Some(start) = self.packages.iter().position(|p| p == package) else {
            return vec![package];
        };

        let mut previous: HashMap<usize, usize> = HashMap::new();
        let mut visited: HashSet<usize> = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            let parents = &self.dependents[current];
            if parents.is_empty() {
                let mut path = vec![&self.packages[current]];
                let mut node = current;
                while let Some(&next) = previous.get(&node) {
                    path.push(&self.packages[next]);
                    node = next;
                }
                path.reverse();
                return path;
            }
            for &parent in parents {
                if visited.insert(parent) {
                    previous.insert(parent, current);
                    queue.push_back(parent);
                }
            }
        }

        // Every ancestor sits on a cycle; report the package alone.
        vec![package]
    }
}

/// Whether `package` satisfies every part of the dependency edge `dep`.
fn satisfies(package: &Package, dep: &Dependency) -> bool {
    package.name == dep.name
        && dep.version.as_ref().map_or(true, |v| &package.version == v)
        && dep
            .source
            .as_ref()
            .map_or(true, |s| package.source.as_ref() == Some(s))
}

/// Resolves every dependency edge once, indexed by the depended-on package.
///
/// Ambiguous bare-name edges are left out, as in [`Lockfile::resolve`].
fn reverse_edges(packages: &[Package]) -> Vec<Vec<usize>> {
    let mut by_name: HashMap<&Name, Vec<usize>> = HashMap::new();
    for (idx, package) in packages.iter().enumerate() {
        by_name.entry(&package.name).or_default().push(idx);
    }

    let mut dependents = vec![Vec::new(); packages.len()];
    for (parent, package) in packages.iter().enumerate() {
        for dep in &package.dependencies {
            let Some(same_name) = by_name.get(&dep.name) else {
                continue;
            };
            let matching: Vec<usize> = same_name
                .iter()
                .copied()
                .filter(|&idx| satisfies(&packages[idx], dep))
                .collect();
            if let [child] = matching[..] {
                dependents[child].push(parent);
            }
        }
    }
    dependents
}

/// Maps `(name, version)` to the line of each `[[package]]` entry's `name` key.
fn index_package_lines(content: &str) -> HashMap<(Name, Version), usize> {
    let mut lines = HashMap::new();
    let mut pending: Option<(Name, usize)> = None;

    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') {
            pending = None;
            continue;
        }
        if let Some(value) = string_value(trimmed, "name") {
            pending = value.parse::<Name>().ok().map(|n| (n, idx + 1));
        } else if let Some(value) = string_value(trimmed, "version") {
            if let (Some((name, line_no)), Ok(version)) = (pending.take(), Version::parse(value)) {
                lines.entry((name, version)).or_insert(line_no);
            }
        }
    }

    lines
}

fn string_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(key)?.trim_start().strip_prefix('=')?.trim();
    rest.strip_prefix('"')?.strip_suffix('"')
}
