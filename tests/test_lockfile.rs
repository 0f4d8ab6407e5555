use std::path::Path;

use oxidized_cargo_audit::lockfile::Lockfile;
use oxidized_cargo_audit::package::{Dependency, Name, SourceKind};
use semver::Version;

fn vulnerable() -> Lockfile {
    Lockfile::load(Path::new("tests/fixtures/vulnerable.lock")).expect("fixture should parse")
}

// --- Package names and sources ---

#[test]
fn package_name_accepts_crate_names() {
    for name in ["serde", "parking_lot_core", "tokio-util", "a"] {
        assert!(name.parse::<Name>().is_ok(), "{name} should be valid");
    }
}

#[test]
fn package_name_rejects_invalid_names() {
    let too_long = "x".repeat(65);
    for name in ["", "has space", "semi;colon", "ünïcode", too_long.as_str()] {
        assert!(name.parse::<Name>().is_err(), "{name:?} should be rejected");
    }
}

#[test]
fn source_id_recognizes_crates_io() {
    let registry: oxidized_cargo_audit::package::SourceId =
        "registry+https://github.com/rust-lang/crates.io-index".parse().unwrap();
    assert_eq!(registry.kind, SourceKind::Registry);
    assert!(registry.is_crates_io());

    let sparse: oxidized_cargo_audit::package::SourceId =
        "sparse+https://index.crates.io/".parse().unwrap();
    assert!(sparse.is_crates_io());

    let git: oxidized_cargo_audit::package::SourceId =
        "git+https://github.com/servo/rust-smallvec#abc".parse().unwrap();
    assert!(git.is_git());
    assert!(!git.is_crates_io());
    assert_eq!(git.to_string(), "git+https://github.com/servo/rust-smallvec#abc");
}

#[test]
fn dependency_forms() {
    let bare: Dependency = "libc".parse().unwrap();
    assert_eq!(bare.name.as_str(), "libc");
    assert!(bare.version.is_none());

    let versioned: Dependency = "libc 0.2.100".parse().unwrap();
    assert_eq!(versioned.version, Some(Version::new(0, 2, 100)));
    assert!(versioned.source.is_none());

    let sourced: Dependency =
        "libc 0.2.100 (registry+https://github.com/rust-lang/crates.io-index)"
            .parse()
            .unwrap();
    assert!(sourced.source.unwrap().is_crates_io());
}

// --- Lockfile parsing ---

#[test]
fn parses_v3_lockfile() {
    let lockfile = vulnerable();
    assert_eq!(lockfile.version, Some(3));
    assert_eq!(lockfile.len(), 9);

    let smallvec = lockfile
        .find("smallvec", &Version::new(1, 6, 0))
        .expect("smallvec should be locked");
    assert!(smallvec.is_from_crates_io());

    let root = lockfile.find("myapp", &Version::new(0, 1, 0)).unwrap();
    assert!(root.source.is_none());
    assert!(!root.is_from_crates_io());
    assert_eq!(root.dependencies.len(), 6);
}

#[test]
fn parses_v1_lockfile_with_metadata_table() {
    let content = r#"
[[package]]
name = "app"
version = "0.1.0"
dependencies = [
 "itoa 0.4.8 (registry+https://github.com/rust-lang/crates.io-index)",
]

[[package]]
name = "itoa"
version = "0.4.8"
source = "registry+https://github.com/rust-lang/crates.io-index"

[metadata]
"checksum itoa 0.4.8 (registry+https://github.com/rust-lang/crates.io-index)" = "b71991ff56294aa922b450139ee08b3bfc70982c6b2c7562771375cf73542dd4"
"#;
    let lockfile = Lockfile::parse(content).unwrap();
    assert_eq!(lockfile.version, None);
    assert_eq!(lockfile.len(), 2);

    let app = lockfile.find("app", &Version::new(0, 1, 0)).unwrap();
    let itoa = lockfile.resolve(&app.dependencies[0]).unwrap();
    assert_eq!(itoa.version, Version::new(0, 4, 8));
}

#[test]
fn rejects_duplicate_packages() {
    let content = r#"
version = 3

[[package]]
name = "dup"
version = "1.0.0"

[[package]]
name = "dup"
version = "1.0.0"
"#;
    let err = Lockfile::parse(content).unwrap_err();
    assert!(err.to_string().contains("duplicate package entry"));
}

#[test]
fn rejects_invalid_versions() {
    let content = "[[package]]\nname = \"bad\"\nversion = \"one\"\n";
    assert!(Lockfile::parse(content).is_err());
}

#[test]
fn records_package_lines() {
    let lockfile = vulnerable();
    let ansi_term = lockfile.find("ansi_term", &Version::new(0, 12, 1)).unwrap();
    // Two comment lines, `version = 3`, a blank line and `[[package]]`.
    assert_eq!(lockfile.line_of(ansi_term), Some(6));
}

#[test]
fn bare_dependency_is_ambiguous_with_two_versions() {
    let content = r#"
version = 3

[[package]]
name = "app"
version = "0.1.0"
dependencies = ["rand"]

[[package]]
name = "rand"
version = "0.7.3"

[[package]]
name = "rand"
version = "0.8.5"
"#;
    let lockfile = Lockfile::parse(content).unwrap();
    let app = lockfile.find("app", &Version::new(0, 1, 0)).unwrap();
    assert!(lockfile.resolve(&app.dependencies[0]).is_none());
}

// --- Dependency paths ---

#[test]
fn dependency_path_starts_at_root() {
    let lockfile = vulnerable();
    let smallvec = lockfile.find("smallvec", &Version::new(1, 6, 0)).unwrap();

    let path: Vec<String> = lockfile
        .dependency_path(smallvec)
        .into_iter()
        .map(|p| p.to_string())
        .collect();
    assert_eq!(
        path,
        vec!["myapp 0.1.0", "parking_lot_core 0.8.0", "smallvec 1.6.0"]
    );
}

#[test]
fn dependency_path_of_root_is_itself() {
    let lockfile = vulnerable();
    let root = lockfile.find("myapp", &Version::new(0, 1, 0)).unwrap();
    assert_eq!(lockfile.dependency_path(root), vec![root]);
}

#[test]
fn dependency_path_takes_the_shortest_route() {
    let lockfile = Lockfile::parse(
        r#"
version = 3

[[package]]
name = "app"
version = "1.0.0"
dependencies = ["deep", "leaf"]

[[package]]
name = "deep"
version = "1.0.0"
dependencies = ["middle"]

[[package]]
name = "middle"
version = "1.0.0"
dependencies = ["leaf"]

[[package]]
name = "leaf"
version = "1.0.0"
"#,
    )
    .unwrap();
    let leaf = lockfile.find("leaf", &Version::new(1, 0, 0)).unwrap();

    let path: Vec<&str> = lockfile
        .dependency_path(leaf)
        .into_iter()
        .map(|p| p.name.as_str())
        .collect();
    assert_eq!(path, vec!["app", "leaf"]);
}

#[test]
fn dependency_path_of_a_foreign_package_is_itself() {
    let lockfile = vulnerable();
    let other = Lockfile::load(Path::new("tests/fixtures/clean.lock")).unwrap();
    let smallvec = other.find("smallvec", &Version::new(1, 6, 1)).unwrap();
    assert_eq!(lockfile.dependency_path(smallvec), vec![smallvec]);
}
