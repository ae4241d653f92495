use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const OUTPUT_DIR_ENV_VAR: &str = "LOGSEARCH_OUTPUT_DIR";
pub const DEFAULT_OUTPUT_DIR: &str = "outputs";

/// Name of the single CSV written inside each output directory.
pub const PART_FILE: &str = "part-00000.csv";

#[derive(Debug, Clone)]
pub struct OutputDir {
    root: PathBuf,
}

impl OutputDir {
    /// Resolve the output directory from, in order of priority:
    /// 1. An explicit path (from --output-dir)
    /// 2. The LOGSEARCH_OUTPUT_DIR environment variable
    /// 3. `./outputs`
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let root = if let Some(path) = explicit {
            path.to_path_buf()
        } else if let Ok(val) = std::env::var(OUTPUT_DIR_ENV_VAR) {
            PathBuf::from(val)
        } else {
            PathBuf::from(DEFAULT_OUTPUT_DIR)
        };

        std::fs::create_dir_all(&root).map_err(|_| {
            Error::Config(format!(
                "output directory could not be created: {}",
                root.display()
            ))
        })?;

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn top_keywords_dir(&self) -> PathBuf {
        self.root.join("top3_keywords")
    }

    pub fn top1_keywords_dir(&self) -> PathBuf {
        self.root.join("top1_keywords")
    }

    pub fn monthly_dir(&self) -> PathBuf {
        self.root.join("top_keyword_by_month")
    }

    /// The top-1 CSV consumed by `classify` when no input is given.
    pub fn top1_csv(&self) -> PathBuf {
        self.top1_keywords_dir().join(PART_FILE)
    }

    pub fn classified_csv(&self) -> PathBuf {
        self.root.join("keyword_classified.csv")
    }
}
