//! Launch environment for the CoreCLR profiler.
//!
//! At launch the platform sources every `*.sh` under `<dep dir>/profile.d`.
//! Paths in the fragment are written relative to `$DEPS_DIR`, which only the
//! launch shell can resolve, so the variable stays unexpanded in the text.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::provision::{AGENT_FOLDER, PROFILE_DIR};
use crate::utils::io;

pub const SCRIPT_NAME: &str = "riverbed.sh";

/// CLSID the CoreCLR runtime uses to locate the AppInternals profiler.
pub const PROFILER_GUID: &str = "{cf0d821e-299b-5307-a3d8-b283c03916dd}";

const DEPS_DIR_VAR: &str = "$DEPS_DIR";

/// Agent directory as seen by the launch shell.
pub fn launch_home(deps_idx: &str) -> String {
    format!("{}/{}/{}", DEPS_DIR_VAR, deps_idx, AGENT_FOLDER)
}

/// Ordered `(name, value)` pairs exported at launch.
pub fn launch_variables(deps_idx: &str) -> Vec<(&'static str, String)> {
    let home = launch_home(deps_idx);

    vec![
        ("CORECLR_PROFILER", PROFILER_GUID.to_string()),
        ("CORECLR_ENABLE_PROFILING", "1".to_string()),
        (
            "CORECLR_PROFILER_PATH",
            format!("{}/lib/libAwDotNetProf64.so", home),
        ),
        (
            "DOTNET_SHARED_STORE",
            format!("{}/install/dotnet/store", home),
        ),
        (
            "DOTNET_ADDITIONAL_DEPS",
            format!(
                "{}/install/dotnet/additionalDeps/Riverbed.AppInternals.DotNetCore",
                home
            ),
        ),
        ("AIX_INSTRUMENT_ALL", "1".to_string()),
        ("RVBD_IN_PCF", "1".to_string()),
        ("RVBD_AGENT_FILES", "1".to_string()),
    ]
}

pub fn launch_script(deps_idx: &str) -> String {
    launch_variables(deps_idx)
        .into_iter()
        .map(|(name, value)| format!("export {}={}\n", name, value))
        .collect()
}

/// Write the fragment into `<dep_dir>/profile.d`, which must already exist.
pub fn write_launch_environment(dep_dir: &Path, deps_idx: &str) -> Result<PathBuf> {
    let path = dep_dir.join(PROFILE_DIR).join(SCRIPT_NAME);
    io::write_script(&path, &launch_script(deps_idx))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn script_is_byte_exact() {
        let expected = "\
export CORECLR_PROFILER={cf0d821e-299b-5307-a3d8-b283c03916dd}
export CORECLR_ENABLE_PROFILING=1
export CORECLR_PROFILER_PATH=$DEPS_DIR/3/riverbed_appinternals_agent/lib/libAwDotNetProf64.so
export DOTNET_SHARED_STORE=$DEPS_DIR/3/riverbed_appinternals_agent/install/dotnet/store
export DOTNET_ADDITIONAL_DEPS=$DEPS_DIR/3/riverbed_appinternals_agent/install/dotnet/additionalDeps/Riverbed.AppInternals.DotNetCore
export AIX_INSTRUMENT_ALL=1
export RVBD_IN_PCF=1
export RVBD_AGENT_FILES=1
";

        assert_eq!(launch_script("3"), expected);
    }

    #[test]
    fn deps_dir_is_left_for_the_launch_shell() {
        let script = launch_script("0");
        assert!(script.contains("$DEPS_DIR/0/"));
        assert!(!script.contains("${"));
    }

    #[test]
    fn writes_into_profile_d() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join(PROFILE_DIR)).unwrap();

        let path = write_launch_environment(dir.path(), "1").unwrap();

        assert_eq!(path, dir.path().join("profile.d").join("riverbed.sh"));
        assert_eq!(fs::read_to_string(&path).unwrap(), launch_script("1"));
    }

    #[test]
    fn missing_profile_d_is_write_error() {
        let dir = TempDir::new().unwrap();

        let err = write_launch_environment(dir.path(), "1").unwrap_err();
        assert_eq!(err.code, ErrorCode::FsWriteFailed);
    }
}
