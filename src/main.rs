mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use colored::Colorize;
use oxidized_cargo_audit::config::{Config, IgnoreEntry};
use oxidized_cargo_audit::database::{Database, Query};
use oxidized_cargo_audit::lockfile::Lockfile;
use oxidized_cargo_audit::output::{self, OutputFormat};
use oxidized_cargo_audit::{audit, lint, repository, web, Error};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "oxidized_cargo_audit=warn",
        1 => "oxidized_cargo_audit=info",
        2 => "oxidized_cargo_audit=debug",
        _ => "oxidized_cargo_audit=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load(cli.config.as_deref()).unwrap_or_else(|e| fail(e));
    if let Some(db) = cli.db {
        config.database.path = Some(db);
    }

    match cli.command {
        Commands::Audit {
            file,
            format,
            output: output_path,
            ignore,
            deny,
            no_fetch,
            index,
            target_os,
            target_arch,
            severity_threshold,
        } => {
            config
                .advisories
                .ignore
                .extend(ignore.into_iter().map(IgnoreEntry::Id));
            config.output.deny.extend(deny);
            if no_fetch {
                config.database.fetch = false;
            }
            if index.is_some() {
                config.yanked.index_path = index;
            }
            if target_os.is_some() {
                config.target.os = target_os;
            }
            if target_arch.is_some() {
                config.target.arch = target_arch;
            }
            if severity_threshold.is_some() {
                config.advisories.severity_threshold = severity_threshold;
            }
            let format = format
                .or(config.output.format)
                .unwrap_or(OutputFormat::Pretty);

            let lockfile = Lockfile::load(&file).unwrap_or_else(|e| fail(e));
            let database = audit::open_database(&config).unwrap_or_else(|e| fail(e));
            let report =
                audit::run_audit(&file, &lockfile, &database, &config).unwrap_or_else(|e| fail(e));
            let formatted = output::format_report(&report, &format);

            if let Some(out_path) = output_path {
                std::fs::write(&out_path, &formatted).unwrap_or_else(|e| {
                    eprintln!("Error writing output: {e}");
                    std::process::exit(2);
                });
                eprintln!("Output written to {}", out_path.display());
            } else {
                print!("{formatted}");
            }

            std::process::exit(if report.passed { 0 } else { 1 });
        }

        Commands::Fetch { url } => {
            let url = url.unwrap_or_else(|| config.database.url.clone());
            let path = config.database_path();
            let commit = repository::fetch(&url, &path).unwrap_or_else(|e| fail(e));
            println!(
                "{} advisory database at {} (commit {}, {})",
                "Fetched".green().bold(),
                path.display(),
                &commit.hash[..commit.hash.len().min(12)],
                commit.timestamp.format("%Y-%m-%d"),
            );
        }

        Commands::Lint => {
            let path = config.database_path();
            let today = chrono::Utc::now().date_naive();
            let report = lint::lint_database(&path, today).unwrap_or_else(|e| fail(e));

            println!("{}", "Advisory Lint".bold().underline());
            println!();
            for issue in &report.issues {
                println!(
                    "  [{}] {}: {}",
                    "ERROR".red().bold(),
                    relative(&path, &issue.path).display(),
                    issue.message
                );
            }
            if !report.issues.is_empty() {
                println!();
            }

            let status = if report.passed() {
                "PASSED".green().bold().to_string()
            } else {
                "FAILED".red().bold().to_string()
            };
            println!(
                "Result: {status}  |  {} files checked, {} issues",
                report.files_checked,
                report.issues.len()
            );
            std::process::exit(if report.passed() { 0 } else { 1 });
        }

        Commands::Web { out } => {
            let database = Database::open(&config.database_path()).unwrap_or_else(|e| fail(e));
            let pages = web::render_site(&database, &out).unwrap_or_else(|e| fail(e));
            println!("Wrote {pages} pages to {}", out.display());
        }

        Commands::List {
            package,
            year,
            severity,
            informational,
        } => {
            let database = Database::open(&config.database_path()).unwrap_or_else(|e| fail(e));

            let mut query = Query::new();
            if let Some(name) = package {
                query = query.package_name(name.parse().unwrap_or_else(|e| fail(e)));
            }
            if let Some(year) = year {
                query = query.year(year);
            }
            if let Some(rating) = severity {
                query = query.severity(rating);
            }
            if informational {
                query = query.informational(true);
            }

            let advisories = database.query(&query);
            for advisory in &advisories {
                let meta = &advisory.metadata;
                let kind = match (&meta.informational, meta.rating()) {
                    (Some(info), _) => info.to_string().blue().to_string(),
                    (None, Some(rating)) => rating.to_string(),
                    (None, None) => "unrated".dimmed().to_string(),
                };
                let withdrawn = if advisory.is_withdrawn() {
                    " (withdrawn)".dimmed().to_string()
                } else {
                    String::new()
                };
                println!(
                    "  {id:<18} {package:<24} {date}  {kind:<12} {title}{withdrawn}",
                    id = meta.id.bold(),
                    package = meta.package.as_str(),
                    date = meta.date,
                    title = meta.title,
                );
            }
            println!();
            println!("  Total: {} advisories", advisories.len());
        }

        Commands::Explain { id } => {
            let database = Database::open(&config.database_path()).unwrap_or_else(|e| fail(e));
            match database.get(&id) {
                Some(advisory) => {
                    let meta = &advisory.metadata;
                    println!("{}", meta.id.bold());
                    println!();
                    println!("  Title:        {}", meta.title);
                    println!("  Package:      {}", meta.package);
                    println!("  Date:         {}", meta.date);
                    if let Some(ref info) = meta.informational {
                        println!("  Type:         {info}");
                    }
                    if let Some(ref cvss) = meta.cvss {
                        println!(
                            "  Severity:     {} ({})  {}",
                            cvss.score(),
                            cvss.rating(),
                            cvss.vector()
                        );
                    }
                    if !meta.aliases.is_empty() {
                        println!("  Aliases:      {}", meta.aliases.join(", "));
                    }
                    if let Some(ref url) = meta.url {
                        println!("  URL:          {url}");
                    }
                    if let Some(withdrawn) = meta.withdrawn {
                        println!("  Withdrawn:    {withdrawn}");
                    }
                    let patched: Vec<String> =
                        advisory.versions.patched.iter().map(|r| r.to_string()).collect();
                    if patched.is_empty() {
                        println!("  Patched:      none");
                    } else {
                        println!("  Patched:      {}", patched.join(" OR "));
                    }
                    println!();
                    for line in meta.description.lines() {
                        println!("  {line}");
                    }
                }
                None => {
                    eprintln!("Unknown advisory: {id}");
                    eprintln!("Use 'oxidized-cargo-audit list' to see all advisories.");
                    std::process::exit(2);
                }
            }
        }
    }
}

/// Prints `err` and exits with status 2.
fn fail<T>(err: impl Into<Error>) -> T {
    let err = err.into();
    eprintln!("Error: {err}");
    std::process::exit(2);
}

fn relative(base: &std::path::Path, path: &std::path::Path) -> PathBuf {
    path.strip_prefix(base).unwrap_or(path).to_path_buf()
}
