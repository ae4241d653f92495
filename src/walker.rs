use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};

use crate::error::{Error, Result};

/// A discovered data file.
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Path relative to the search root.
    pub relative_path: PathBuf,
    /// Fully resolved absolute path.
    pub absolute_path: PathBuf,
}

/// Default file-name pattern for search event partitions.
pub const DEFAULT_PATTERN: &str = "*.parquet";

/// Compile a file-name glob such as `*.parquet`.
pub fn file_matcher(pattern: &str) -> Result<GlobMatcher> {
    Glob::new(pattern)
        .map(|glob| glob.compile_matcher())
        .map_err(|e| Error::Config(format!("invalid file pattern: {e}")))
}

/// Recursively walk a directory and discover files whose name matches
/// `pattern`.
///
/// Skips hidden entries (names starting with `.`) and writer bookkeeping
/// entries (names starting with `_`, e.g. `_SUCCESS`, `_temporary/`).
/// Results are sorted by relative path.
pub fn discover_files(
    root: &Path,
    pattern: &GlobMatcher,
) -> Result<Vec<DiscoveredFile>> {
    let canonical_root = root.canonicalize()?;
    let mut results = Vec::new();
    walk_dir(&canonical_root, &canonical_root, pattern, &mut results)?;
    results.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(results)
}

fn walk_dir(
    root: &Path,
    current: &Path,
    pattern: &GlobMatcher,
    results: &mut Vec<DiscoveredFile>,
) -> Result<()> {
    for entry in std::fs::read_dir(current)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();

        if name.starts_with('.') || name.starts_with('_') {
            continue;
        }

        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            walk_dir(root, &path, pattern, results)?;
        } else if file_type.is_symlink() {
            let resolved = match path.canonicalize() {
                Ok(p) => p,
                Err(_) => continue, // broken symlink
            };
            // Linked directories are not followed (cycle prevention).
            if resolved.is_file() && pattern.is_match(&file_name) {
                results.push(make_discovered(root, &path, resolved));
            }
        } else if file_type.is_file() && pattern.is_match(&file_name) {
            let abs = path.canonicalize()?;
            results.push(make_discovered(root, &path, abs));
        }
    }

    Ok(())
}

fn make_discovered(
    root: &Path,
    original_path: &Path,
    absolute_path: PathBuf,
) -> DiscoveredFile {
    let relative_path = original_path
        .strip_prefix(root)
        .unwrap_or(original_path)
        .to_path_buf();

    DiscoveredFile {
        relative_path,
        absolute_path,
    }
}
