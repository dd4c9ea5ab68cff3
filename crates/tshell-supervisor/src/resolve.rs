//! Backend executable resolution
//!
//! The backend binary ships under a fixed `resources/` directory. In
//! development that directory lives under the working directory; in a
//! packaged install it lives under the bundle's resources root. Both
//! resolve to the same filename.

use std::path::{Path, PathBuf};

use tshell_core::prelude::*;

/// File name of the packaged backend binary
#[cfg(not(windows))]
pub const BACKEND_EXECUTABLE: &str = "twitter_alert_tool";
#[cfg(windows)]
pub const BACKEND_EXECUTABLE: &str = "twitter_alert_tool.exe";

/// Directory (relative to the deployment root) holding the backend
pub const RESOURCES_DIR: &str = "resources";

/// Where the shell is running from
#[derive(Debug, Clone)]
pub enum Deployment {
    /// Source checkout: resources live under the working directory
    Development,
    /// Installed bundle: resources live under the given root
    Packaged { resources_root: PathBuf },
}

/// Resolve the backend executable path for the given deployment.
pub fn backend_executable(deployment: &Deployment) -> Result<PathBuf> {
    let root = match deployment {
        Deployment::Development => std::env::current_dir()?,
        Deployment::Packaged { resources_root } => resources_root.clone(),
    };
    Ok(root.join(RESOURCES_DIR).join(BACKEND_EXECUTABLE))
}

/// Mark the backend binary executable (mode 755). No-op on Windows.
///
/// Packaging tends to strip the execute bit, so this runs before every
/// spawn. A failure here is a spawn-failure class error.
pub fn ensure_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).map_err(|e| {
            Error::Chmod {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;
    }

    #[cfg(not(unix))]
    let _ = path;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_resolution_is_cwd_relative() {
        let path = backend_executable(&Deployment::Development).unwrap();
        let cwd = std::env::current_dir().unwrap();

        assert_eq!(path, cwd.join(RESOURCES_DIR).join(BACKEND_EXECUTABLE));
    }

    #[test]
    fn test_packaged_resolution_uses_resources_root() {
        let deployment = Deployment::Packaged {
            resources_root: PathBuf::from("/opt/tracker"),
        };
        let path = backend_executable(&deployment).unwrap();

        assert_eq!(
            path,
            PathBuf::from("/opt/tracker")
                .join(RESOURCES_DIR)
                .join(BACKEND_EXECUTABLE)
        );
    }

    #[test]
    fn test_both_deployments_resolve_same_filename() {
        let dev = backend_executable(&Deployment::Development).unwrap();
        let packaged = backend_executable(&Deployment::Packaged {
            resources_root: PathBuf::from("/opt/tracker"),
        })
        .unwrap();

        assert_eq!(dev.file_name(), packaged.file_name());
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_executable_sets_execute_bits() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("backend");
        std::fs::write(&path, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        ensure_executable(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[cfg(unix)]
    #[test]
    fn test_ensure_executable_missing_file_is_chmod_error() {
        let result = ensure_executable(Path::new("/nonexistent/backend"));
        assert!(matches!(result, Err(Error::Chmod { .. })));
    }
}
