//! Host configuration (TOML).
//!
//! Everything has a default, so running without a config file is valid as
//! long as an identity can be found some other way.

use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Env var naming a config file when `--config` is not given.
pub const CONFIG_ENV: &str = "SSB_HOST_CONFIG";

const DATA_ROOT: &str = "~/Library/Application Support/Epichrome/Apps";
const BOOTSTRAP_LOG: &str =
    "~/Library/Application Support/Epichrome/Logs/epichrome_log_nativemessaginghost.txt";

const LAUNCH_SERVICES_PLIST: &str =
    "~/Library/Preferences/com.apple.LaunchServices/com.apple.launchservices.secure.plist";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    pub identity: IdentityConfig,
    pub log: LogConfig,
    pub browser: BrowserConfig,
    pub transport: TransportConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdentityConfig {
    pub version: Option<String>,
    pub app_id: Option<String>,
    pub display_name: Option<String>,
    pub short_name: Option<String>,
    /// `info.json` to read the identity from.
    pub manifest: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `"info"` or `"ssb_runtime_host=debug"`.
    pub filter: Option<String>,
    pub debug: bool,
    /// Fixed log file; skips all discovery below.
    pub file: Option<PathBuf>,
    /// App lock file carrying a `lockLogFile='...'` line. Defaults to
    /// `<data_root>/<app_id>/lock`.
    pub lock_file: Option<PathBuf>,
    /// Parent of the per-app data directories.
    pub data_root: PathBuf,
    /// Where to log until the app identity is known.
    pub bootstrap_file: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            filter: None,
            debug: false,
            file: None,
            lock_file: None,
            data_root: PathBuf::from(DATA_ROOT),
            bootstrap_file: PathBuf::from(BOOTSTRAP_LOG),
        }
    }
}

impl LogConfig {
    /// `<data_root>/<app_id>`.
    pub fn app_data_dir(&self, app_id: &str) -> PathBuf {
        self.data_root.join(app_id)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrowserConfig {
    /// LaunchServices preference file listing URL-scheme handlers.
    pub launch_services: PathBuf,
    pub plutil: PathBuf,
    pub open: PathBuf,
    pub scheme: String,
    /// Handlers that must be named explicitly when opening a URL.
    pub explicit_handlers: Vec<String>,
    /// OS versions whose generic open routine is broken.
    pub defective_os_versions: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        BrowserConfig {
            launch_services: PathBuf::from(LAUNCH_SERVICES_PLIST),
            plutil: PathBuf::from("/usr/bin/plutil"),
            open: PathBuf::from("/usr/bin/open"),
            scheme: "http".to_string(),
            explicit_handlers: vec!["com.google.chrome".to_string()],
            defective_os_versions: vec!["10.12.5".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportConfig {
    /// Consecutive failed sends after which the host gives up.
    pub max_send_failures: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            max_send_failures: 3,
        }
    }
}

impl HostConfig {
    pub fn from_toml(raw: &str, origin: &Path) -> Result<Self, ConfigError> {
        let mut cfg: HostConfig = toml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        cfg.expand_paths();
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw, path)
    }

    /// Load from `explicit`, else [`CONFIG_ENV`], else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => Self::from_file(Path::new(&path)),
            _ => {
                let mut cfg = HostConfig::default();
                cfg.expand_paths();
                Ok(cfg)
            }
        }
    }

    fn expand_paths(&mut self) {
        let paths = [
            self.identity.manifest.as_mut(),
            self.log.file.as_mut(),
            self.log.lock_file.as_mut(),
            Some(&mut self.log.data_root),
            Some(&mut self.log.bootstrap_file),
            Some(&mut self.browser.launch_services),
        ];
        for p in paths.into_iter().flatten() {
            *p = expand_home(p);
        }
    }
}

/// Expand a leading `~/` against `$HOME`. Other paths are returned as-is.
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_all_defaults() {
        let cfg = HostConfig::from_toml("", Path::new("mem")).unwrap();
        assert_eq!(cfg.browser.scheme, "http");
        assert_eq!(cfg.browser.explicit_handlers, vec!["com.google.chrome"]);
        assert_eq!(cfg.browser.defective_os_versions, vec!["10.12.5"]);
        assert_eq!(cfg.transport.max_send_failures, 3);
        assert!(cfg.identity.app_id.is_none());
        assert!(!cfg.log.debug);
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let cfg = HostConfig::from_toml(
            r#"
            [browser]
            explicit_handlers = ["org.chromium.chromium"]

            [log]
            debug = true
            "#,
            Path::new("mem"),
        )
        .unwrap();
        assert_eq!(cfg.browser.explicit_handlers, vec!["org.chromium.chromium"]);
        assert_eq!(cfg.browser.open, PathBuf::from("/usr/bin/open"));
        assert!(cfg.log.debug);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = HostConfig::from_toml("[browser]\nshceme = \"http\"\n", Path::new("mem"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn non_tilde_paths_are_untouched() {
        assert_eq!(
            expand_home(Path::new("/etc/host.toml")),
            PathBuf::from("/etc/host.toml")
        );
        assert_eq!(expand_home(Path::new("rel/x")), PathBuf::from("rel/x"));
    }
}
