//! apidiff CLI - exported-API extraction, diffs and changelogs for Go packages
//!
//! Built for the generated Azure SDK for Go packages: `exports` lists a
//! package's exported API, `diff` compares two versions and `changelog`
//! renders the result as release notes.

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;

use commands::*;
use config::ApidiffConfig;
use output::{OutputConfig, OutputFormat};

/// Exported-API diffs and changelogs for Go packages.
///
/// Sources are Go package directories or JSON snapshots written by
/// `apidiff snapshot`.
#[derive(Parser)]
#[command(name = "apidiff")]
#[command(author, version)]
#[command(about = "Exported-API diffs and changelogs for Go packages")]
#[command(propagate_version = true)]
#[command(next_help_heading = "Options")]
#[command(after_help = "Examples:
  apidiff exports ./sdk/storage/armstorage
  apidiff snapshot ./armstorage -o v1.json
  apidiff diff v1.json ./armstorage --fail-on-breaking
  apidiff changelog ./old/armstorage ./armstorage")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format (overrides config default)
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Show long table cells in full
    #[arg(long, global = true)]
    no_truncate: bool,

    /// Table width in columns (default: terminal width)
    #[arg(long, global = true, value_name = "N")]
    width: Option<usize>,

    /// Compact output: borderless tables, single-line JSON
    #[arg(long, global = true)]
    compact: bool,

    /// Extra glob for source files to leave out (repeatable)
    #[arg(long, global = true)]
    exclude: Vec<String>,

    /// Show detailed version information
    #[arg(long = "version-verbose")]
    version_verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the exported API of a package directory or snapshot
    #[command(visible_alias = "x")]
    Exports {
        /// Package directory or `.json` snapshot
        #[arg(default_value = ".")]
        source: String,
    },

    /// Write a package's exports as a JSON snapshot
    Snapshot {
        /// Package directory
        #[arg(default_value = ".")]
        dir: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Show additive and breaking changes between two versions
    #[command(visible_alias = "d")]
    Diff {
        /// Old package directory or snapshot
        old: String,

        /// New package directory or snapshot
        new: String,

        /// Exit with status 1 when breaking changes are found
        #[arg(long)]
        fail_on_breaking: bool,
    },

    /// Render release notes between two versions
    #[command(visible_alias = "cl")]
    Changelog {
        /// Old package directory or snapshot (may not exist)
        old: String,

        /// New package directory or snapshot (may not exist)
        new: String,

        /// Report the raw delta without changelog filters
        #[arg(long)]
        no_filters: bool,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

/// Print verbose version information
fn print_verbose_version() {
    use colored::Colorize;

    let cli_version = env!("CARGO_PKG_VERSION");
    let platform = format!("{}-{}", std::env::consts::ARCH, std::env::consts::OS);

    println!("apidiff {}", cli_version);
    println!("  {:<14} {}", "apidiff-cli:".cyan(), cli_version);
    println!("  {:<14} {}", "apidiff-core:".cyan(), apidiff_core::version());
    println!("  {:<14} {}", "Platform:".cyan(), platform);
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.version_verbose {
        print_verbose_version();
        return Ok(());
    }

    setup_logging(cli.verbose, cli.quiet);

    // Load configuration from .apidiff.toml
    let config = ApidiffConfig::load(std::path::Path::new("."));

    // Resolve output format: CLI flag > config default > per-command default
    let format = cli.format.or_else(|| {
        config.default_format().and_then(|f| match f.parse() {
            Ok(format) => Some(format),
            Err(e) => {
                tracing::warn!("{} in {}", e, config::CONFIG_FILE);
                None
            }
        })
    });

    // Color: --no-color > config > TTY detection
    let color_override = if cli.no_color {
        Some(false)
    } else {
        config.use_color()
    };
    if let Some(use_color) = color_override {
        colored::control::set_override(use_color);
    }

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            let _ = Cli::command().print_help();
            println!();
            return Ok(());
        }
    };

    let scan_options = config.scan_options(&cli.exclude);
    let output_config = |default: OutputFormat| {
        let mut output =
            OutputConfig::auto_detect_with_color_override(format.unwrap_or(default), color_override);
        if cli.no_truncate {
            output = output.without_truncation();
        }
        if let Some(width) = cli.width {
            output = output.with_width(width);
        }
        if cli.compact {
            output = output.compact();
        }
        output
    };

    match command {
        Commands::Exports { source } => {
            exports::run(&source, &scan_options, output_config(OutputFormat::Table))
        }
        Commands::Snapshot { dir, output } => snapshot::run(
            &dir,
            output.as_deref(),
            &scan_options,
            output_config(OutputFormat::Table),
        ),
        Commands::Diff {
            old,
            new,
            fail_on_breaking,
        } => {
            let has_breaking =
                diff::run(&old, &new, &scan_options, output_config(OutputFormat::Table))?;
            if fail_on_breaking && has_breaking {
                tracing::debug!("Breaking changes found, exiting with status 1");
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Changelog {
            old,
            new,
            no_filters,
        } => {
            let filters = if no_filters {
                Vec::new()
            } else {
                config.filters()
            };
            changelog::run(
                &old,
                &new,
                &filters,
                &scan_options,
                output_config(OutputFormat::Markdown),
            )
        }
    }
}
