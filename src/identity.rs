//! Who this host is answering for.
//!
//! The identity is fixed for the life of the process. It comes from the
//! config file, from an `info.json` manifest, or from the manifest that sits
//! next to the browser engine that launched us.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::IdentityConfig;
use crate::error::IdentityError;

/// Read-only identity of the app this host belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityInfo {
    pub app_version: String,
    pub app_id: String,
    pub app_display_name: String,
    pub app_short_name: String,
}

/// On-disk `info.json` layout written by the app builder.
#[derive(Debug, Deserialize)]
struct ManifestInfo {
    version: String,
    #[serde(rename = "appID")]
    app_id: String,
    #[serde(rename = "appName")]
    app_name: String,
    #[serde(rename = "appDisplayName")]
    app_display_name: String,
}

impl From<ManifestInfo> for IdentityInfo {
    fn from(m: ManifestInfo) -> Self {
        IdentityInfo {
            app_version: m.version,
            app_id: m.app_id,
            app_display_name: m.app_display_name,
            app_short_name: m.app_name,
        }
    }
}

impl IdentityInfo {
    /// Parse an `info.json` manifest.
    pub fn from_manifest(path: &Path) -> Result<Self, IdentityError> {
        let raw = fs::read_to_string(path).map_err(|source| IdentityError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let info: ManifestInfo =
            serde_json::from_str(&raw).map_err(|source| IdentityError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(info.into())
    }

    /// Resolve identity in priority order: inline config, configured
    /// manifest, then the manifest of the engine that launched us.
    pub fn load(config: &IdentityConfig) -> Result<Self, IdentityError> {
        if let Some(app_id) = &config.app_id {
            debug!(app_id = %app_id, "identity from config");
            return Ok(IdentityInfo {
                app_version: config
                    .version
                    .clone()
                    .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
                app_id: app_id.clone(),
                app_display_name: config
                    .display_name
                    .clone()
                    .unwrap_or_else(|| app_id.clone()),
                app_short_name: config.short_name.clone().unwrap_or_else(|| app_id.clone()),
            });
        }

        if let Some(path) = &config.manifest {
            debug!(path = %path.display(), "identity from manifest");
            return Self::from_manifest(path);
        }

        let manifest = parent_engine_manifest()?;
        debug!(path = %manifest.display(), "identity from parent engine manifest");
        Self::from_manifest(&manifest)
    }
}

/// `info.json` three levels above the parent engine's executable directory.
pub fn engine_manifest_path(engine_exe: &Path) -> PathBuf {
    engine_exe
        .parent()
        .unwrap_or_else(|| Path::new("/"))
        .join("../../../info.json")
}

#[cfg(unix)]
fn parent_engine_manifest() -> Result<PathBuf, IdentityError> {
    use std::process::Command;

    let ppid = std::os::unix::process::parent_id();
    let output = Command::new("/bin/ps")
        .args(["-o", "comm=", "-p", &ppid.to_string()])
        .output()
        .map_err(|e| IdentityError::ParentEngine(e.to_string()))?;
    if !output.status.success() {
        return Err(IdentityError::ParentEngine(format!(
            "ps exited with {}",
            output.status
        )));
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let exe = stdout.trim();
    if exe.is_empty() {
        return Err(IdentityError::ParentEngine(format!(
            "no command for pid {ppid}"
        )));
    }
    Ok(engine_manifest_path(Path::new(exe)))
}

#[cfg(not(unix))]
fn parent_engine_manifest() -> Result<PathBuf, IdentityError> {
    Err(IdentityError::Unavailable)
}
