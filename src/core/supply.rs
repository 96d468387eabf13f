//! The supply step: check bindings, stage the agent, write the launch environment.

use serde::Serialize;
use std::path::PathBuf;

use crate::bindings::{BindingInspector, DOWNLOAD_URL_MARKER};
use crate::download::Downloader;
use crate::environment;
use crate::error::Result;
use crate::logger::Logger;
use crate::provision::ArtifactProvisioner;
use crate::stager::Stager;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SupplyOutcome {
    /// No binding carries the AppInternals tag.
    NotBound,
    /// Bound, but the broker did not hand out a profiler URL.
    NoDownloadUrl,
    Provisioned {
        agent_dir: PathBuf,
        launch_script: PathBuf,
        archive_bytes: u64,
    },
}

pub struct Supplier<'a> {
    pub stager: &'a Stager,
    pub inspector: &'a BindingInspector,
    pub downloader: &'a dyn Downloader,
    pub log: &'a mut Logger,
}

impl Supplier<'_> {
    pub fn run(&mut self) -> Result<SupplyOutcome> {
        self.log
            .begin_step("Supplying Riverbed AppInternals Buildpack for .NET Core");
        self.log.info(format!(
            "Build dir: {}, cache dir: {}, deps dir: {}",
            self.stager.build_dir().display(),
            self.stager.cache_dir().display(),
            self.stager.deps_dir().display()
        ));
        self.log
            .begin_step("Checking if the app is bound to AppInternals service...");

        let supported = self.inspector.is_supported().map_err(|e| {
            e.with_context("Failed to check if App is bound to AppInternals service")
        })?;

        if !supported {
            self.log.info("The app is not bound to AppInternals service");
            return Ok(SupplyOutcome::NotBound);
        }

        let names = self
            .inspector
            .bound_services()
            .map_err(|e| e.with_context("Failed to list bound AppInternals services"))?;
        self.log
            .info(format!("Bound AppInternals services: {}", names.join(", ")));

        self.log
            .begin_step("Downloading .NET Core artifacts from Service Broker...");

        let url = self
            .inspector
            .download_url()
            .map_err(|e| e.with_context("Failed to get the download URL from credentials"))?;

        let Some(url) = url else {
            self.log.warning(format!(
                "No credential matching '{}' found; skipping profiler setup",
                DOWNLOAD_URL_MARKER
            ));
            return Ok(SupplyOutcome::NoDownloadUrl);
        };

        let dep_dir = self.stager.dep_dir();
        self.log
            .begin_step(format!("Download to DepDir: {}", dep_dir.display()));

        let report = ArtifactProvisioner::new(self.downloader, &dep_dir).provision(&url)?;
        self.log.info(format!(
            "Extracted {} entries ({} bytes) into {}",
            report.entries,
            report.archive_bytes,
            report.agent_dir.display()
        ));

        self.log
            .begin_step("Setting Environment Variables for Instrumentation...");
        self.log.info(format!(
            "Using {} as Panorama Home Directory",
            environment::launch_home(self.stager.deps_idx())
        ));

        let launch_script = environment::write_launch_environment(&dep_dir, self.stager.deps_idx())
            .map_err(|e| e.with_context("Failed to write launch environment"))?;

        Ok(SupplyOutcome::Provisioned {
            agent_dir: report.agent_dir,
            launch_script,
            archive_bytes: report.archive_bytes,
        })
    }
}
