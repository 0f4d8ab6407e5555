use std::path::Path;

use chrono::{Duration, TimeZone, Utc};
use git2::{Oid, Repository, Signature, Time};
use oxidized_cargo_audit::audit::open_database;
use oxidized_cargo_audit::config::Config;
use oxidized_cargo_audit::error::Error;
use oxidized_cargo_audit::repository::{check_staleness, fetch, last_commit, CommitInfo};

const ADVISORY: &str = "tests/fixtures/advisory-db/crates/smallvec/RUSTSEC-2021-0003.md";

/// Commits `files` to `repo` at `secs` seconds after the epoch.
fn commit(repo: &Repository, files: &[(&str, &str)], secs: i64) -> Oid {
    let workdir = repo.workdir().unwrap().to_path_buf();
    let mut index = repo.index().unwrap();
    for (rel, content) in files {
        let path = workdir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        index.add_path(Path::new(rel)).unwrap();
    }
    index.write().unwrap();
    let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
    let sig = Signature::new("Advisory Bot", "bot@example.com", &Time::new(secs, 0)).unwrap();
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<_> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, "update advisories", &tree, &parents)
        .unwrap()
}

/// An upstream database with one advisory, committed at `secs`.
fn upstream(secs: i64) -> (tempfile::TempDir, Repository, Oid) {
    let dir = tempfile::tempdir().unwrap();
    let repo = Repository::init(dir.path()).unwrap();
    let advisory = std::fs::read_to_string(ADVISORY).unwrap();
    let oid = commit(
        &repo,
        &[("crates/smallvec/RUSTSEC-2021-0003.md", advisory.as_str())],
        secs,
    );
    (dir, repo, oid)
}

fn url(dir: &tempfile::TempDir) -> String {
    dir.path().to_string_lossy().to_string()
}

fn commit_days_ago(days: i64) -> (CommitInfo, chrono::DateTime<Utc>) {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let commit = CommitInfo {
        hash: "0123456789abcdef0123456789abcdef01234567".to_string(),
        timestamp: now - Duration::days(days),
    };
    (commit, now)
}

#[test]
fn fresh_database_is_accepted() {
    let (commit, now) = commit_days_ago(3);
    assert!(check_staleness(&commit, 90, now).is_ok());
}

#[test]
fn database_at_the_limit_is_accepted() {
    let (commit, now) = commit_days_ago(90);
    assert!(check_staleness(&commit, 90, now).is_ok());
}

#[test]
fn stale_database_is_rejected() {
    let (commit, now) = commit_days_ago(120);
    let err = check_staleness(&commit, 90, now).unwrap_err();
    assert!(matches!(
        err,
        Error::StaleDatabase {
            age_days: 120,
            max_days: 90
        }
    ));
    assert!(err.to_string().contains("120 days ago"));
}

#[test]
fn last_commit_requires_a_checkout() {
    let dir = tempfile::tempdir().unwrap();
    let err = last_commit(dir.path()).unwrap_err();
    assert!(err.to_string().contains("not a git checkout"));
}

#[test]
fn fetch_refuses_to_overwrite_a_plain_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("README.md"), "hello").unwrap();

    let err = fetch("https://invalid.example/advisory-db.git", dir.path()).unwrap_err();
    assert!(matches!(err, Error::Repository(_)));
}

#[test]
fn fetch_clones_into_place() {
    let (origin, _repo, oid) = upstream(1_700_000_000);
    let work = tempfile::tempdir().unwrap();
    let target = work.path().join("advisory-db");

    let info = fetch(&url(&origin), &target).unwrap();
    assert_eq!(info.hash, oid.to_string());
    assert_eq!(info.timestamp.timestamp(), 1_700_000_000);
    assert!(target.join("crates/smallvec/RUSTSEC-2021-0003.md").is_file());

    let staging_left: Vec<_> = std::fs::read_dir(work.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with(".advisory-db-"))
        .collect();
    assert!(staging_left.is_empty());
}

#[test]
fn last_commit_reads_the_checkout_head() {
    let (origin, _repo, oid) = upstream(1_650_000_000);
    let info = last_commit(origin.path()).unwrap();
    assert_eq!(info.hash, oid.to_string());
    assert_eq!(info.timestamp, Utc.timestamp_opt(1_650_000_000, 0).unwrap());
}

#[test]
fn fetch_fast_forwards_an_existing_checkout() {
    let (origin, repo, _) = upstream(1_700_000_000);
    let work = tempfile::tempdir().unwrap();
    let target = work.path().join("advisory-db");
    fetch(&url(&origin), &target).unwrap();

    let newer = commit(&repo, &[("crates/demo/README.md", "placeholder\n")], 1_700_100_000);
    let info = fetch(&url(&origin), &target).unwrap();
    assert_eq!(info.hash, newer.to_string());
    assert!(target.join("crates/demo/README.md").is_file());

    let again = fetch(&url(&origin), &target).unwrap();
    assert_eq!(again.hash, newer.to_string());
}

#[test]
fn open_database_rejects_a_stale_clone() {
    let old = (Utc::now() - Duration::days(200)).timestamp();
    let (origin, _repo, _) = upstream(old);
    let work = tempfile::tempdir().unwrap();

    let mut config = Config::default();
    config.database.url = url(&origin);
    config.database.path = Some(work.path().join("advisory-db"));
    config.database.stale_days = Some(90);

    let err = open_database(&config).unwrap_err();
    assert!(matches!(err, Error::StaleDatabase { max_days: 90, .. }), "{err}");

    config.database.stale_days = Some(365);
    let db = open_database(&config).unwrap();
    assert_eq!(db.len(), 1);
    assert!(db.last_commit().is_some());
}
