use clap::{Parser, Subcommand};
use oxidized_cargo_audit::advisory::cvss::Rating;
use oxidized_cargo_audit::output::OutputFormat;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "oxidized-cargo-audit",
    version,
    about = "Audit Cargo.lock files for crates with security advisories"
)]
pub struct Cli {
    /// Custom config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Advisory database directory
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Audit a Cargo.lock for vulnerable, unmaintained and yanked crates
    Audit {
        /// Path to the lockfile
        #[arg(long, short = 'f', default_value = "Cargo.lock")]
        file: PathBuf,

        /// Output format [default: pretty]
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Write output to file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Advisory id to ignore (repeatable)
        #[arg(long, value_name = "ID")]
        ignore: Vec<String>,

        /// Warning kind that fails the audit: unmaintained, unsound, notice,
        /// yanked, informational or warnings (repeatable)
        #[arg(long, short = 'D', value_name = "KIND")]
        deny: Vec<String>,

        /// Do not clone or update the advisory database
        #[arg(long, short = 'n')]
        no_fetch: bool,

        /// Local crates.io index checkout used for the yanked check
        #[arg(long, value_name = "DIR")]
        index: Option<PathBuf>,

        /// Only report advisories affecting this operating system
        #[arg(long)]
        target_os: Option<String>,

        /// Only report advisories affecting this CPU architecture
        #[arg(long)]
        target_arch: Option<String>,

        /// Ignore vulnerabilities rated below this severity
        #[arg(long)]
        severity_threshold: Option<Rating>,
    },

    /// Clone or update the advisory database
    Fetch {
        /// Git URL of the advisory database
        #[arg(long)]
        url: Option<String>,
    },

    /// Check advisory files for format and consistency problems
    Lint,

    /// Render the advisory database as a static website
    Web {
        /// Output directory
        #[arg(long, default_value = "site")]
        out: PathBuf,
    },

    /// List advisories in the database
    List {
        /// Only advisories for this package
        #[arg(long)]
        package: Option<String>,

        /// Only advisories published in this year
        #[arg(long)]
        year: Option<i32>,

        /// Minimum severity
        #[arg(long)]
        severity: Option<Rating>,

        /// Only informational advisories
        #[arg(long)]
        informational: bool,
    },

    /// Show full details for an advisory
    Explain {
        /// Advisory id or alias (e.g., "RUSTSEC-2021-0001" or a CVE id)
        id: String,
    },
}
