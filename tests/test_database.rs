use std::path::Path;

use oxidized_cargo_audit::advisory::cvss::Rating;
use oxidized_cargo_audit::advisory::Collection;
use oxidized_cargo_audit::database::{Database, Query};
use oxidized_cargo_audit::error::Error;
use oxidized_cargo_audit::lockfile::Lockfile;
use semver::Version;

fn database() -> Database {
    Database::open(Path::new("tests/fixtures/advisory-db")).expect("fixture database should load")
}

fn ids(advisories: &[&oxidized_cargo_audit::advisory::Advisory]) -> Vec<String> {
    advisories.iter().map(|a| a.id().to_string()).collect()
}

#[test]
fn opens_fixture_database() {
    let db = database();
    assert_eq!(db.len(), 6);
    assert!(!db.is_empty());
    assert!(db.last_commit().is_none(), "fixture is not a git checkout");

    let all: Vec<&str> = db.iter().map(|a| a.id()).collect();
    let mut sorted = all.clone();
    sorted.sort();
    assert_eq!(all, sorted, "advisories are kept in id order");
}

#[test]
fn assigns_collections_from_directories() {
    let db = database();
    let std_advisory = db.get("RUSTSEC-2021-0001").unwrap();
    assert_eq!(std_advisory.metadata.collection, Collection::Rust);
    let smallvec = db.get("RUSTSEC-2021-0003").unwrap();
    assert_eq!(smallvec.metadata.collection, Collection::Crates);
}

#[test]
fn open_missing_directory_fails() {
    let err = Database::open(Path::new("tests/fixtures/nope")).unwrap_err();
    assert!(err.to_string().contains("advisory database directory"));
}

#[test]
fn open_fails_on_broken_advisory() {
    let err = Database::open(Path::new("tests/fixtures/bad-advisory-db")).unwrap_err();
    assert!(err.to_string().contains("RUSTSEC-2020-0003.md"));
}

#[test]
fn get_by_alias() {
    let db = database();
    assert_eq!(db.get("CVE-2021-25900").unwrap().id(), "RUSTSEC-2021-0003");
    assert!(db.get("CVE-1999-0001").is_none());
}

// --- Queries ---

#[test]
fn query_by_package_and_version() {
    let db = database();
    let name = "smallvec".parse().unwrap();

    let vulnerable = db.query(
        &Query::new()
            .package_name(name)
            .package_version(Version::new(1, 6, 0)),
    );
    assert_eq!(ids(&vulnerable), vec!["RUSTSEC-2021-0003"]);

    let patched = db.query(
        &Query::new()
            .package_name("smallvec".parse().unwrap())
            .package_version(Version::new(1, 6, 1)),
    );
    assert!(patched.is_empty());

    let unaffected = db.query(
        &Query::new()
            .package_name("smallvec".parse().unwrap())
            .package_version(Version::new(0, 6, 14)),
    );
    assert!(unaffected.is_empty());
}

#[test]
fn query_by_collection() {
    let db = database();
    let rust = db.query(&Query::new().collection(Collection::Rust));
    assert_eq!(ids(&rust), vec!["RUSTSEC-2021-0001"]);
}

#[test]
fn query_by_year() {
    let db = database();
    let found = db.query(&Query::new().year(2020));
    assert_eq!(ids(&found), vec!["RUSTSEC-2020-0071"]);
}

#[test]
fn query_severity_keeps_unscored_advisories() {
    let db = database();
    let found = db.query(&Query::new().severity(Rating::High));
    let found = ids(&found);

    assert!(found.contains(&"RUSTSEC-2021-0003".to_string()));
    assert!(!found.contains(&"RUSTSEC-2020-0071".to_string()), "medium is below high");
    assert!(found.contains(&"RUSTSEC-2021-0139".to_string()), "no CVSS score");
}

#[test]
fn query_withdrawn_and_informational() {
    let db = database();
    let withdrawn = db.query(&Query::new().withdrawn(true));
    assert_eq!(ids(&withdrawn), vec!["RUSTSEC-2019-0033"]);

    let informational = db.query(&Query::new().informational(true));
    assert_eq!(
        ids(&informational),
        vec!["RUSTSEC-2021-0139", "RUSTSEC-2021-0145"]
    );
}

#[test]
fn crate_scope_excludes_withdrawn_and_rust_collection() {
    let db = database();
    let found = ids(&db.query(&Query::crate_scope()));
    assert_eq!(found.len(), 4);
    assert!(!found.contains(&"RUSTSEC-2019-0033".to_string()));
    assert!(!found.contains(&"RUSTSEC-2021-0001".to_string()));
}

// --- Lockfile matching ---

#[test]
fn vulnerabilities_in_lockfile() {
    let db = database();
    let lockfile = Lockfile::load(Path::new("tests/fixtures/vulnerable.lock")).unwrap();

    let found = db.vulnerabilities(&lockfile, &Query::crate_scope().informational(false));
    let mut pairs: Vec<(String, String)> = found
        .iter()
        .map(|v| (v.advisory.id().to_string(), v.package.to_string()))
        .collect();
    pairs.sort();

    assert_eq!(
        pairs,
        vec![
            ("RUSTSEC-2020-0071".to_string(), "time 0.2.22".to_string()),
            ("RUSTSEC-2021-0003".to_string(), "smallvec 1.6.0".to_string()),
        ]
    );
}

#[test]
fn git_dependencies_are_skipped_for_crate_scope() {
    let db = database();
    let lockfile = Lockfile::load(Path::new("tests/fixtures/git-source.lock")).unwrap();

    assert!(db.vulnerabilities(&lockfile, &Query::crate_scope()).is_empty());
    assert_eq!(db.vulnerabilities(&lockfile, &Query::new()).len(), 1);
}

#[cfg(unix)]
#[test]
fn unreadable_directories_fail_the_open() {
    use std::os::unix::fs::PermissionsExt;

    let root = tempfile::tempdir().unwrap();
    let locked = root.path().join("crates").join("locked");
    std::fs::create_dir_all(&locked).unwrap();
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

    // Permission bits do not restrict a privileged user.
    let readable = std::fs::read_dir(&locked).is_ok();
    let result = Database::open(root.path());
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

    if !readable {
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
