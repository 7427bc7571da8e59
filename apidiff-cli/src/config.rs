//! apidiff configuration loading from `.apidiff.toml`.
//!
//! Configuration is optional; apidiff uses defaults when no config file
//! exists. Command-line flags override anything set here.
//!
//! # Example Configuration
//!
//! ```toml
//! [extractor]
//! exclude = ["zz_generated_*.go", "fake_*.go"]
//!
//! [changelog]
//! filters = ["non_exported", "marshal_unmarshal", "lro", "pageable"]
//!
//! [output]
//! format = "markdown"
//! color = false
//! ```

use apidiff_core::changelog::Filter;
use apidiff_core::scanner::ScanOptions;
use serde::Deserialize;
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = ".apidiff.toml";

/// Root configuration structure loaded from `.apidiff.toml`.
///
/// All sections are optional and will use defaults if not specified.
#[derive(Debug, Deserialize, Default)]
pub struct ApidiffConfig {
    /// Package source selection.
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Changelog filter selection.
    #[serde(default)]
    pub changelog: ChangelogConfig,

    /// Output formatting preferences.
    #[serde(default)]
    pub output: OutputSettings,
}

/// Extractor configuration controlling which files make up a package.
#[derive(Debug, Deserialize, Default)]
pub struct ExtractorConfig {
    /// Glob patterns for source files to leave out, on top of the Go
    /// toolchain's own rules (`_test.go`, `_*.go`, `.*.go`).
    ///
    /// # Example
    /// ```toml
    /// exclude = ["zz_generated_*.go"]
    /// ```
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Changelog configuration.
#[derive(Debug, Deserialize, Default)]
pub struct ChangelogConfig {
    /// Filters to run, by name. All filters run when unset.
    ///
    /// Known names: `non_exported`, `marshal_unmarshal`, `enum`, `func`,
    /// `lro`, `pageable`, `interface_to_any`, `type_to_any`
    #[serde(default)]
    pub filters: Option<Vec<String>>,
}

/// Output formatting preferences.
///
/// Distinct from the runtime `OutputConfig` in the output module, which
/// handles actual rendering.
#[derive(Debug, Deserialize, Default)]
pub struct OutputSettings {
    /// Default output format: `table`, `json` or `markdown`.
    #[serde(default)]
    pub format: Option<String>,

    /// Whether to use colored output. Defaults to TTY detection.
    #[serde(default)]
    pub color: Option<bool>,
}

impl ApidiffConfig {
    /// Load configuration from `.apidiff.toml` in the given directory.
    ///
    /// If the config file doesn't exist or can't be parsed, returns defaults.
    /// Parse errors are logged as warnings but don't cause failures.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse {}: {}", CONFIG_FILE, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", CONFIG_FILE, e);
                }
            }
        }
        Self::default()
    }

    /// Scan options from `[extractor]`, plus extra excludes from the command line.
    pub fn scan_options(&self, extra_exclude: &[String]) -> ScanOptions {
        ScanOptions::default()
            .with_exclude(self.extractor.exclude.iter().cloned())
            .with_exclude(extra_exclude.iter().cloned())
    }

    /// Filters to apply, in their default order.
    ///
    /// Unknown names are skipped with a warning.
    pub fn filters(&self) -> Vec<Filter> {
        let Some(names) = &self.changelog.filters else {
            return Filter::ALL.to_vec();
        };

        let mut selected = Vec::new();
        for name in names {
            match Filter::from_name(name) {
                Some(filter) => selected.push(filter),
                None => tracing::warn!("Unknown changelog filter '{}' in {}", name, CONFIG_FILE),
            }
        }
        Filter::ALL
            .into_iter()
            .filter(|f| selected.contains(f))
            .collect()
    }

    /// Get the default output format, if configured.
    pub fn default_format(&self) -> Option<&str> {
        self.output.format.as_deref()
    }

    /// Check if colored output should be used.
    ///
    /// Returns the configured value, or `None` to use auto-detection.
    pub fn use_color(&self) -> Option<bool> {
        self.output.color
    }
}
