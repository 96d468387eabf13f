use clap::Args;
use riverbed_supply::bindings::BindingInspector;
use riverbed_supply::defaults;
use riverbed_supply::download::HttpDownloader;
use riverbed_supply::logger::Logger;
use riverbed_supply::stager::Stager;
use riverbed_supply::supply::{Supplier, SupplyOutcome};
use std::path::PathBuf;

use crate::commands::CmdResult;

#[derive(Args, Debug)]
pub struct SupplyArgs {
    /// Application build directory
    pub build_dir: PathBuf,

    /// Buildpack cache directory
    pub cache_dir: PathBuf,

    /// Root of the per-buildpack dependency directories
    pub deps_dir: PathBuf,

    /// Index of this buildpack's dependency directory
    pub deps_idx: String,

    /// JSON file overriding download settings
    #[arg(long, env = defaults::CONFIG_ENV)]
    pub config: Option<PathBuf>,
}

pub fn run(args: SupplyArgs, log: &mut Logger) -> CmdResult<SupplyOutcome> {
    let config = defaults::load_config(args.config.as_deref())?;
    let stager = Stager::new(args.build_dir, args.cache_dir, args.deps_dir, args.deps_idx)?;
    let inspector = BindingInspector::from_env();
    let downloader = HttpDownloader::new(&config.download)?;

    let outcome = Supplier {
        stager: &stager,
        inspector: &inspector,
        downloader: &downloader,
        log,
    }
    .run()?;

    Ok((outcome, 0))
}
