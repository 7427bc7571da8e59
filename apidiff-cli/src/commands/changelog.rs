//! Changelog command - release notes for one package
//!
//! A package missing on the old side is reported as an initial release,
//! one missing on the new side as removed. The configured filters run
//! before rendering unless `--no-filters` is given.

use anyhow::{Context, Result};
use apidiff_core::changelog::{Changelog, Filter};
use apidiff_core::scanner::ScanOptions;
use colored::Colorize;
use serde::Serialize;

use crate::output::{JsonOutput, Output, OutputConfig, Outputter};

/// Changelog result
#[derive(Debug, Serialize)]
pub struct ChangelogResult {
    pub old: String,
    pub new: String,
    pub filters: Vec<&'static str>,
    pub changelog: Changelog,
}

impl Outputter for ChangelogResult {
    fn to_table(&self, _config: &OutputConfig) -> String {
        let mut output = format!(
            "{} {} -> {}\n",
            "CHANGELOG:".cyan().bold(),
            self.old.yellow(),
            self.new.green()
        );
        if !self.filters.is_empty() {
            output.push_str(&format!(
                "{}\n",
                format!("filters: {}", self.filters.join(", ")).dimmed()
            ));
        }
        output.push('\n');

        if self.changelog.is_empty() {
            output.push_str(&format!("{}", "No changelog entries".dimmed()));
            return output;
        }

        for line in self.changelog.to_markdown().lines() {
            if let Some(heading) = line.strip_prefix("### ") {
                let heading = if heading.starts_with("Breaking") {
                    heading.red().bold()
                } else {
                    heading.green().bold()
                };
                output.push_str(&format!("{}\n", heading));
            } else if let Some(entry) = line.strip_prefix("- ") {
                output.push_str(&format!("  * {}\n", entry));
            }
        }
        output
    }

    fn to_json(&self, config: &OutputConfig) -> String {
        JsonOutput::format(&self.changelog, config)
    }

    fn to_markdown(&self, _config: &OutputConfig) -> String {
        self.changelog.to_markdown()
    }
}

/// Run the changelog command.
pub fn run(
    old: &str,
    new: &str,
    filters: &[Filter],
    options: &ScanOptions,
    config: OutputConfig,
) -> Result<()> {
    let mut changelog = Changelog::for_directories(old, new, options)
        .with_context(|| format!("Failed to build changelog for {} -> {}", old, new))?;
    changelog.apply_filters(filters);

    let result = ChangelogResult {
        old: old.to_string(),
        new: new.to_string(),
        filters: filters.iter().map(Filter::name).collect(),
        changelog,
    };
    Output::with_config(result, config).render()
}
