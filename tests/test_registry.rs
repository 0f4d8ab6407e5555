use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use oxidized_cargo_audit::error::{Error, Result};
use oxidized_cargo_audit::lockfile::Lockfile;
use oxidized_cargo_audit::package::{Name, Package};
use oxidized_cargo_audit::registry::{
    CachedIndex, IndexKrate, IndexSource, IndexVersion, LocalIndex,
};
use semver::Version;

/// In-memory index that counts lookups.
struct FakeIndex {
    lookups: AtomicUsize,
}

impl FakeIndex {
    fn new() -> Self {
        FakeIndex {
            lookups: AtomicUsize::new(0),
        }
    }
}

impl IndexSource for &FakeIndex {
    fn krate(&self, name: &Name) -> Result<Option<IndexKrate>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let version = |vers: &str, yanked: bool| IndexVersion {
            name: name.to_string(),
            vers: vers.to_string(),
            yanked,
        };
        match name.as_str() {
            "serde" => Ok(Some(IndexKrate {
                versions: vec![version("1.0.129", false), version("1.0.130", true)],
            })),
            "libc" => Ok(Some(IndexKrate {
                versions: vec![version("0.2.100", false)],
            })),
            "flaky" => Err(Error::Registry("connection reset".to_string())),
            _ => Ok(None),
        }
    }
}

fn package(name: &str, version: &str) -> Package {
    Package {
        name: name.parse().unwrap(),
        version: Version::parse(version).unwrap(),
        source: Some(oxidized_cargo_audit::package::SourceId::crates_io()),
        checksum: None,
        dependencies: vec![],
    }
}

#[test]
fn is_yanked_reads_version_flags() {
    let source = FakeIndex::new();
    let mut index = CachedIndex::new(&source);
    assert!(index.is_yanked(&package("serde", "1.0.130")).unwrap());
    assert!(!index.is_yanked(&package("serde", "1.0.129")).unwrap());
}

#[test]
fn is_yanked_caches_lookups() {
    let source = FakeIndex::new();
    let mut index = CachedIndex::new(&source);
    for _ in 0..3 {
        index.is_yanked(&package("serde", "1.0.130")).unwrap();
    }
    index.is_yanked(&package("serde", "1.0.129")).unwrap();
    index.is_yanked(&package("libc", "0.2.100")).unwrap();

    assert_eq!(source.lookups.load(Ordering::SeqCst), 2);
}

#[test]
fn find_yanked_looks_up_each_crate_once() {
    let source = FakeIndex::new();
    let packages = vec![
        package("serde", "1.0.129"),
        package("serde", "1.0.130"),
        package("libc", "0.2.100"),
    ];
    let mut index = CachedIndex::new(&source);
    index.find_yanked(packages.iter());
    index.find_yanked(packages.iter());

    assert_eq!(source.lookups.load(Ordering::SeqCst), 2);
}

#[test]
fn unknown_version_and_crate_are_not_found() {
    let source = FakeIndex::new();
    let mut index = CachedIndex::new(&source);

    let err = index.is_yanked(&package("serde", "9.9.9")).unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert!(err.to_string().contains("no such version"));

    let err = index.is_yanked(&package("left-pad", "1.0.0")).unwrap_err();
    assert!(err.to_string().contains("no such crate"));
}

#[test]
fn lookup_failures_are_registry_errors() {
    let source = FakeIndex::new();
    let mut index = CachedIndex::new(&source);
    let err = index.is_yanked(&package("flaky", "1.0.0")).unwrap_err();
    assert!(matches!(err, Error::Registry(_)));
    assert!(err.to_string().contains("connection reset"));
}

#[test]
fn find_yanked_deduplicates_and_reports_errors() {
    let packages = vec![
        package("serde", "1.0.130"),
        package("serde", "1.0.130"),
        package("libc", "0.2.100"),
        package("flaky", "1.0.0"),
    ];
    let source = FakeIndex::new();
    let mut index = CachedIndex::new(&source);
    let results = index.find_yanked(packages.iter());

    let yanked: Vec<String> = results
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .map(|p| p.to_string())
        .collect();
    let errors = results.iter().filter(|r| r.is_err()).count();

    assert_eq!(yanked, vec!["serde 1.0.130"]);
    assert_eq!(errors, 1);
}

// --- Local index layout ---

#[test]
fn crate_path_layout() {
    assert_eq!(LocalIndex::crate_path("a"), PathBuf::from("1/a"));
    assert_eq!(LocalIndex::crate_path("cc"), PathBuf::from("2/cc"));
    assert_eq!(LocalIndex::crate_path("syn"), PathBuf::from("3/s/syn"));
    assert_eq!(LocalIndex::crate_path("time"), PathBuf::from("ti/me/time"));
    assert_eq!(
        LocalIndex::crate_path("Parking_Lot"),
        PathBuf::from("pa/rk/parking_lot")
    );
}

#[test]
fn local_index_requires_directory() {
    assert!(LocalIndex::new("tests/fixtures/no-such-index").is_err());
}

#[test]
fn local_index_reads_fixture() {
    let index = LocalIndex::new("tests/fixtures/index").unwrap();
    let serde = index.krate(&"serde".parse().unwrap()).unwrap().unwrap();
    assert_eq!(serde.versions.len(), 3);
    assert!(serde.versions.iter().any(|v| v.vers == "1.0.130" && v.yanked));

    assert!(index.krate(&"missing".parse().unwrap()).unwrap().is_none());
}

#[test]
fn local_index_rejects_malformed_lines() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join(LocalIndex::crate_path("oops"));
    std::fs::create_dir_all(file.parent().unwrap()).unwrap();
    std::fs::write(&file, "not json\n").unwrap();

    let index = LocalIndex::new(dir.path()).unwrap();
    let err = index.krate(&"oops".parse().unwrap()).unwrap_err();
    assert!(err.to_string().contains("malformed index entry"));
}

#[test]
fn yanked_fixture_lockfile() {
    let lockfile = Lockfile::load(Path::new("tests/fixtures/yanked.lock")).unwrap();
    let index = LocalIndex::new("tests/fixtures/index").unwrap();
    let mut cache = CachedIndex::new(index);

    let crates_io = lockfile.packages().iter().filter(|p| p.is_from_crates_io());
    let results = cache.find_yanked(crates_io);

    let yanked: Vec<String> = results
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .map(|p| p.name.to_string())
        .collect();
    assert_eq!(yanked, vec!["serde"]);
    assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
}
