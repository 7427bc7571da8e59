//! Package source discovery using the `ignore` crate.
//!
//! A Go package is one directory, so the walk is limited to depth 1. The
//! Go toolchain's own file rules apply (test files and files starting with
//! `_` or `.` are not part of the package), plus any exclude globs from the
//! user's configuration.

use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

use crate::error::{ExtractError, Result};

/// Options for package scanning.
#[derive(Clone, Debug, Default)]
pub struct ScanOptions {
    /// Extra glob patterns for files to leave out of the package.
    pub exclude: Vec<String>,
}

impl ScanOptions {
    /// Builder: add exclude globs.
    pub fn with_exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(patterns.into_iter().map(Into::into));
        self
    }
}

/// Whether a file name belongs to the package's non-test sources.
pub fn is_package_source(file_name: &str) -> bool {
    file_name.ends_with(".go")
        && !file_name.ends_with("_test.go")
        && !file_name.starts_with('_')
        && !file_name.starts_with('.')
}

/// List the non-test Go source files of a package directory.
///
/// Paths come back sorted by file name so that per-file results can be
/// merged in a stable order.
pub fn scan_package(dir: &Path, options: &ScanOptions) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ExtractError::PackageNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut builder = WalkBuilder::new(dir);
    builder
        .max_depth(Some(1))
        .standard_filters(false) // the go tool does not read .gitignore
        .follow_links(true);

    if !options.exclude.is_empty() {
        let mut override_builder = OverrideBuilder::new(dir);
        for pattern in &options.exclude {
            // ! turns the whitelist glob into an ignore glob
            override_builder
                .add(&format!("!{}", pattern))
                .map_err(|e| ExtractError::InvalidPattern {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })?;
        }
        let overrides = override_builder
            .build()
            .map_err(|e| ExtractError::InvalidPattern {
                pattern: options.exclude.join(", "),
                message: e.to_string(),
            })?;
        builder.overrides(overrides);
    }

    let mut files = Vec::new();
    for entry in builder.build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
            continue;
        }
        let keep = entry
            .file_name()
            .to_str()
            .map(is_package_source)
            .unwrap_or(false);
        if keep {
            files.push(entry.into_path());
        }
    }

    if files.is_empty() {
        return Err(ExtractError::NoSourceFiles {
            path: dir.to_path_buf(),
        });
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    tracing::debug!("Found {} source files in {}", files.len(), dir.display());
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_dir() -> TempDir {
        let dir = TempDir::new().unwrap();

        for name in [
            "client.go",
            "models.go",
            "client_test.go",
            "_scratch.go",
            ".hidden.go",
            "README.md",
        ] {
            File::create(dir.path().join(name))
                .unwrap()
                .write_all(b"package armfoo\n")
                .unwrap();
        }

        // Nested packages are separate packages
        fs::create_dir(dir.path().join("fake")).unwrap();
        File::create(dir.path().join("fake/server.go"))
            .unwrap()
            .write_all(b"package fake\n")
            .unwrap();

        dir
    }

    fn names(files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_is_package_source() {
        assert!(is_package_source("client.go"));
        assert!(!is_package_source("client_test.go"));
        assert!(!is_package_source("_gen.go"));
        assert!(!is_package_source(".swp.go"));
        assert!(!is_package_source("client.rs"));
    }

    #[test]
    fn test_scan_package_basic() {
        let dir = create_test_dir();
        let files = scan_package(dir.path(), &ScanOptions::default()).unwrap();

        assert_eq!(names(&files), vec!["client.go", "models.go"]);
    }

    #[test]
    fn test_scan_package_exclude() {
        let dir = create_test_dir();
        let options = ScanOptions::default().with_exclude(["models.go"]);
        let files = scan_package(dir.path(), &options).unwrap();

        assert_eq!(names(&files), vec!["client.go"]);
    }

    #[test]
    fn test_scan_package_nonexistent() {
        let err = scan_package(
            Path::new("/nonexistent/path/that/does/not/exist"),
            &ScanOptions::default(),
        )
        .unwrap_err();

        assert!(err.is_not_found());
    }

    #[test]
    fn test_scan_package_only_tests() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("a_test.go"))
            .unwrap()
            .write_all(b"package a\n")
            .unwrap();

        let err = scan_package(dir.path(), &ScanOptions::default()).unwrap_err();
        assert!(matches!(err, ExtractError::NoSourceFiles { .. }));
    }
}
