//! # oxidized-cargo-audit
//!
//! Audits `Cargo.lock` files against the RustSec advisory database.
//!
//! `oxidized-cargo-audit` loads an advisory database checkout, matches every
//! locked package against the advisories for that package, flags
//! informational advisories (unmaintained, unsound, notices) and yanked
//! releases, and produces reports in human-readable, JSON, or [SARIF] formats.
//! It also lints an advisory database and renders it as a static website.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use oxidized_cargo_audit::{audit, config::Config, lockfile::Lockfile, output};
//!
//! let config = Config::load(None).expect("failed to load config");
//! let database = audit::open_database(&config).expect("failed to open database");
//! let lockfile = Lockfile::load(Path::new("Cargo.lock")).expect("failed to read lockfile");
//! let report = audit::run_audit(Path::new("Cargo.lock"), &lockfile, &database, &config)
//!     .expect("invalid configuration");
//!
//! if !report.passed {
//!     let text = output::format_report(&report, &output::OutputFormat::Pretty);
//!     print!("{text}");
//! }
//! ```
//!
//! ## Architecture
//!
//! 1. **[`package`]** and **[`lockfile`]**: validated package names, source
//!    ids and the parsed dependency graph of a `Cargo.lock`.
//! 2. **[`advisory`]** and **[`database`]**: advisory documents (TOML front
//!    matter plus Markdown), CVSS scoring, and a queryable collection.
//! 3. **[`repository`]** and **[`registry`]**: the git checkout of the
//!    database and a cached view of a crates.io index for yanked releases.
//! 4. **[`checks`]**: pluggable [`checks::Check`] trait with the
//!    vulnerability, informational and yanked checks.
//! 5. **[`audit`]**: orchestrate checks in parallel into a
//!    [`report::AuditReport`].
//! 6. **[`output`]**: format reports as pretty text, JSON, or SARIF.
//! 7. **[`lint`]** and **[`web`]**: maintenance tools for the database itself.
//!
//! [SARIF]: https://sarifweb.azurewebsites.net/

pub mod advisory;
pub mod audit;
pub mod checks;
pub mod config;
pub mod database;
pub mod error;
pub mod lint;
pub mod lockfile;
pub mod output;
pub mod package;
pub mod registry;
pub mod report;
pub mod repository;
pub mod web;

pub use error::{Error, Result};
