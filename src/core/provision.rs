//! Staging the profiler agent into the dependency directory.
//!
//! Layout produced under `<dep dir>`:
//!
//! ```text
//! riverbed_appinternals_agent/   extracted agent payload
//! profile.d/                     launch fragments (see `environment`)
//! ```
//!
//! The transient archive `dn.profiler.linux.zip` is removed once extracted.
//! Steps are not transactional: a failure leaves whatever earlier steps produced.

use serde::Serialize;
use std::path::PathBuf;

use crate::download::{self, Downloader};
use crate::error::Result;
use crate::utils::{archive, io};

pub const AGENT_FOLDER: &str = "riverbed_appinternals_agent";
pub const ARCHIVE_NAME: &str = "dn.profiler.linux.zip";
pub const PROFILE_DIR: &str = "profile.d";

#[derive(Debug, Clone, Serialize)]
pub struct ProvisionReport {
    pub agent_dir: PathBuf,
    pub profile_dir: PathBuf,
    pub archive_bytes: u64,
    pub entries: usize,
}

pub struct ArtifactProvisioner<'a> {
    downloader: &'a dyn Downloader,
    dep_dir: PathBuf,
}

impl<'a> ArtifactProvisioner<'a> {
    pub fn new(downloader: &'a dyn Downloader, dep_dir: impl Into<PathBuf>) -> Self {
        Self {
            downloader,
            dep_dir: dep_dir.into(),
        }
    }

    pub fn agent_dir(&self) -> PathBuf {
        self.dep_dir.join(AGENT_FOLDER)
    }

    pub fn archive_path(&self) -> PathBuf {
        self.dep_dir.join(ARCHIVE_NAME)
    }

    pub fn profile_dir(&self) -> PathBuf {
        self.dep_dir.join(PROFILE_DIR)
    }

    /// Download, extract and clean up, then prepare `profile.d`.
    ///
    /// Re-running over a previous result re-downloads and re-extracts.
    pub fn provision(&self, url: &str) -> Result<ProvisionReport> {
        let archive_path = self.archive_path();
        let agent_dir = self.agent_dir();
        let profile_dir = self.profile_dir();

        let archive_bytes = download::download_file(self.downloader, &archive_path, url)
            .map_err(|e| e.with_context(format!("Failed to download {} from {}", ARCHIVE_NAME, url)))?;

        io::create_dir_all(&agent_dir)
            .map_err(|e| e.with_context("Failed to create agent directory"))?;

        let entries = archive::extract_zip(&archive_path, &agent_dir)
            .map_err(|e| e.with_context("Failed to extract agent archive"))?;

        io::remove_file(&archive_path)
            .map_err(|e| e.with_context("Failed to remove agent archive"))?;

        io::create_dir_all(&profile_dir)
            .map_err(|e| e.with_context("Failed to create profile.d"))?;

        Ok(ProvisionReport {
            agent_dir,
            profile_dir,
            archive_bytes,
            entries,
        })
    }
}
