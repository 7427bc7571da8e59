//! Snapshot command - save a package's exports as JSON
//!
//! Snapshots can stand in for a package directory on either side of
//! `diff` and `changelog`, which is how an unreleased tree is compared
//! against a published version.

use std::path::Path;

use anyhow::{Context, Result};
use apidiff_core::exports;
use apidiff_core::scanner::ScanOptions;
use colored::Colorize;
use serde::Serialize;

use crate::output::{Output, OutputConfig, Outputter};

/// Result of writing a snapshot file.
#[derive(Debug, Serialize)]
pub struct SnapshotResult {
    pub package: String,
    pub output: String,
    pub symbols: usize,
}

impl Outputter for SnapshotResult {
    fn to_table(&self, _config: &OutputConfig) -> String {
        format!(
            "{} Wrote {} exported symbols from {} to {}",
            "SUCCESS:".green().bold(),
            self.symbols,
            self.package.cyan(),
            self.output.bold()
        )
    }
}

/// Run the snapshot command.
///
/// Without `output` the snapshot JSON goes to stdout unchanged.
pub fn run(
    dir: &str,
    output: Option<&str>,
    options: &ScanOptions,
    config: OutputConfig,
) -> Result<()> {
    let content = exports::get_with_options(Path::new(dir), options)
        .with_context(|| format!("Failed to extract exports from {}", dir))?;
    let json = content.to_json()?;

    let Some(path) = output else {
        println!("{}", json);
        return Ok(());
    };

    std::fs::write(path, &json).with_context(|| format!("Failed to write {}", path))?;
    tracing::info!("Snapshot written to {}", path);

    let result = SnapshotResult {
        package: dir.to_string(),
        output: path.to_string(),
        symbols: content.symbol_count(),
    };
    Output::with_config(result, config).render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    #[test]
    fn test_snapshot_written_and_reloadable() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("a.go"),
            "package p\n\nfunc Do(s string) error { return nil }\n",
        )
        .unwrap();
        let out = dir.path().join("snapshot.json");

        run(
            dir.path().to_str().unwrap(),
            out.to_str(),
            &ScanOptions::default(),
            OutputConfig::new(OutputFormat::Json),
        )
        .unwrap();

        let loaded = exports::load_snapshot(&out).unwrap();
        assert_eq!(loaded.funcs["Do"].params.as_deref(), Some("string"));
    }

    #[test]
    fn test_missing_package_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let result = run(
            missing.to_str().unwrap(),
            None,
            &ScanOptions::default(),
            OutputConfig::new(OutputFormat::Table),
        );
        assert!(result.is_err());
    }
}
