use oxidized_cargo_audit::config::Config;
use oxidized_cargo_audit::database::Database;
use oxidized_cargo_audit::lockfile::Lockfile;
use oxidized_cargo_audit::output;
use oxidized_cargo_audit::output::OutputFormat;
use oxidized_cargo_audit::report::AuditReport;
use std::path::Path;

fn report_for(lockfile: &str) -> AuditReport {
    let config = Config::default();
    let db = Database::open(Path::new("tests/fixtures/advisory-db")).unwrap();
    let path = Path::new(lockfile);
    let lockfile = Lockfile::load(path).unwrap();
    oxidized_cargo_audit::audit::run_audit(path, &lockfile, &db, &config).unwrap()
}

fn get_vulnerable_report() -> AuditReport {
    report_for("tests/fixtures/vulnerable.lock")
}

fn get_clean_report() -> AuditReport {
    report_for("tests/fixtures/clean.lock")
}

#[test]
fn json_output_is_valid() {
    let report = get_vulnerable_report();
    let json = output::format_report(&report, &OutputFormat::Json);

    let parsed: serde_json::Value = serde_json::from_str(&json).expect("JSON should be valid");
    assert_eq!(parsed["lockfile"]["dependency_count"], 9);
    assert_eq!(parsed["database"]["advisory_count"], 6);
    assert!(parsed["vulnerabilities"]["list"].is_array());
    assert_eq!(parsed["status"], "failed");
    assert!(!parsed["passed"].as_bool().unwrap());
}

#[test]
fn json_vulnerability_entries() {
    let report = get_vulnerable_report();
    let json = output::format_report(&report, &OutputFormat::Json);
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

    let list = parsed["vulnerabilities"]["list"].as_array().unwrap();
    let smallvec = list
        .iter()
        .find(|v| v["advisory"]["id"] == "RUSTSEC-2021-0003")
        .expect("smallvec advisory should be listed");
    assert_eq!(smallvec["package"]["version"], "1.6.0");
    assert_eq!(smallvec["advisory"]["cvss"], "CVSS:3.1/AV:N/AC:L/PR:N/UI:N/S:U/C:H/I:H/A:H");
    assert_eq!(smallvec["advisory"]["versions"]["patched"][0], ">=1.6.1");
    assert_eq!(smallvec["dependency_path"][0], "myapp 0.1.0");
    assert_eq!(smallvec["severity"], "error");
}

#[test]
fn json_clean_lockfile_passes() {
    let report = get_clean_report();
    let json = output::format_report(&report, &OutputFormat::Json);

    let parsed: serde_json::Value = serde_json::from_str(&json).expect("JSON should be valid");
    assert!(parsed["passed"].as_bool().unwrap());
    assert_eq!(parsed["vulnerabilities"]["found"], false);
    assert!(parsed["warnings"].as_object().unwrap().is_empty());
}

#[test]
fn json_lists_checks() {
    let report = get_clean_report();
    let json = output::format_report(&report, &OutputFormat::Json);
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();

    let checks = parsed["checks"].as_array().unwrap();
    assert_eq!(checks.len(), 3);
    let yanked = checks.iter().find(|c| c["name"] == "yanked").unwrap();
    assert_eq!(yanked["skipped"], true);
}

#[test]
fn sarif_output_is_valid() {
    let report = get_vulnerable_report();
    let sarif = output::format_report(&report, &OutputFormat::Sarif);

    let parsed: serde_json::Value =
        serde_json::from_str(&sarif).expect("SARIF JSON should be valid");
    assert_eq!(parsed["version"], "2.1.0");
    assert!(parsed["runs"].is_array());
    assert!(parsed["runs"][0]["tool"]["driver"]["name"] == "oxidized-cargo-audit");
    assert_eq!(parsed["runs"][0]["results"].as_array().unwrap().len(), 4);
}

#[test]
fn sarif_points_at_lockfile_lines() {
    let report = get_vulnerable_report();
    let sarif = output::format_report(&report, &OutputFormat::Sarif);
    let parsed: serde_json::Value = serde_json::from_str(&sarif).unwrap();

    let results = parsed["runs"][0]["results"].as_array().unwrap();
    let smallvec = results
        .iter()
        .find(|r| r["ruleId"] == "RUSTSEC-2021-0003")
        .unwrap();
    assert_eq!(smallvec["level"], "error");
    let location = &smallvec["locations"][0]["physicalLocation"];
    assert_eq!(
        location["artifactLocation"]["uri"],
        "tests/fixtures/vulnerable.lock"
    );
    assert!(location["region"]["startLine"].as_i64().unwrap() > 0);

    let unmaintained = results
        .iter()
        .find(|r| r["ruleId"] == "RUSTSEC-2021-0139")
        .unwrap();
    assert_eq!(unmaintained["level"], "warning");
}

#[test]
fn pretty_output_contains_findings() {
    let report = get_vulnerable_report();
    let pretty = output::format_report(&report, &OutputFormat::Pretty);

    assert!(pretty.contains("vulnerable.lock"));
    assert!(pretty.contains("FAIL") || pretty.contains("ERROR"));
    assert!(pretty.contains("RUSTSEC-2021-0003"));
    assert!(pretty.contains("Dependency tree"));
}

#[test]
fn pretty_output_clean_passes() {
    let report = get_clean_report();
    let pretty = output::format_report(&report, &OutputFormat::Pretty);

    assert!(pretty.contains("clean.lock"));
    assert!(pretty.contains("PASS"));
}
