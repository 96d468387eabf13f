//! File system primitives with consistent error handling.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Mode for directories created during staging (before umask).
pub const DIR_MODE: u32 = 0o777;

/// Mode for the generated launch fragment.
pub const SCRIPT_MODE: u32 = 0o755;

/// Create `path` and any missing parents. An existing directory is not an error.
pub fn create_dir_all(path: &Path) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }

    builder
        .create(path)
        .map_err(|e| Error::directory_create(path.display().to_string(), e.to_string()))
}

/// Write `content` to `path` and mark it executable on unix.
pub fn write_script(path: &Path, content: &str) -> Result<()> {
    let fail = |e: std::io::Error| Error::write_failed(path.display().to_string(), e.to_string());

    fs::write(path, content).map_err(fail)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(SCRIPT_MODE)).map_err(fail)?;
    }

    Ok(())
}

/// Remove a file, reporting failure as a cleanup error.
pub fn remove_file(path: &Path) -> Result<()> {
    fs::remove_file(path)
        .map_err(|e| Error::cleanup_failed(path.display().to_string(), e.to_string()))
}
