use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Directories the platform allocates to this step of the staging run.
#[derive(Debug, Clone, Serialize)]
pub struct Stager {
    build_dir: PathBuf,
    cache_dir: PathBuf,
    deps_dir: PathBuf,
    deps_idx: String,
}

impl Stager {
    /// Validates `deps_idx`, which ends up verbatim in generated shell text.
    pub fn new(
        build_dir: impl Into<PathBuf>,
        cache_dir: impl Into<PathBuf>,
        deps_dir: impl Into<PathBuf>,
        deps_idx: impl Into<String>,
    ) -> Result<Self> {
        let deps_idx = deps_idx.into();
        validate_deps_idx(&deps_idx)?;

        Ok(Self {
            build_dir: build_dir.into(),
            cache_dir: cache_dir.into(),
            deps_dir: deps_dir.into(),
            deps_idx,
        })
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn deps_dir(&self) -> &Path {
        &self.deps_dir
    }

    pub fn deps_idx(&self) -> &str {
        &self.deps_idx
    }

    /// This step's writable dependency directory, `<deps_dir>/<deps_idx>`.
    pub fn dep_dir(&self) -> PathBuf {
        self.deps_dir.join(&self.deps_idx)
    }
}

fn validate_deps_idx(deps_idx: &str) -> Result<()> {
    if deps_idx.is_empty() {
        return Err(Error::validation_invalid_argument(
            "deps_idx",
            "dependency index must not be empty",
            None,
        ));
    }

    let allowed = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.';
    if deps_idx == "." || deps_idx == ".." || !deps_idx.chars().all(allowed) {
        return Err(Error::validation_invalid_argument(
            "deps_idx",
            "dependency index must be a single path segment of letters, digits, '-', '_' or '.'",
            Some(deps_idx.to_string()),
        ));
    }

    Ok(())
}
