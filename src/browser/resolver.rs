//! Default URL-scheme handler lookup.
//!
//! On macOS the handler list lives in the LaunchServices preference file.
//! It is a binary plist, so `plutil` converts it to JSON on stdout and the
//! `LSHandlers` array is scanned for the entry whose `LSHandlerURLScheme`
//! matches.

use once_cell::unsync::OnceCell;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Command;
use tracing::{debug, warn};

use crate::config::BrowserConfig;
use crate::error::ResolutionError;

/// Something that can tell which app handles the configured URL scheme.
///
/// `None` means "no handler registered" or "could not tell"; both make the
/// opener fall through to its generic strategy.
pub trait HandlerResolver {
    fn resolve(&self) -> Option<String>;
}

#[derive(Debug, Default, Deserialize)]
struct LaunchServicesPrefs {
    #[serde(rename = "LSHandlers", default)]
    handlers: Vec<LsHandler>,
}

#[derive(Debug, Deserialize)]
struct LsHandler {
    #[serde(rename = "LSHandlerURLScheme")]
    url_scheme: Option<String>,
    #[serde(rename = "LSHandlerRoleAll")]
    role_all: Option<String>,
}

/// Find the all-roles handler for `scheme` in a JSON rendering of the
/// LaunchServices preferences.
pub fn find_handler(prefs_json: &[u8], scheme: &str) -> Result<Option<String>, ResolutionError> {
    let prefs: LaunchServicesPrefs = serde_json::from_slice(prefs_json)?;
    Ok(prefs
        .handlers
        .into_iter()
        .find(|h| {
            h.url_scheme
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case(scheme))
        })
        .and_then(|h| h.role_all))
}

/// Reads the LaunchServices preferences through `plutil`.
#[derive(Debug, Clone)]
pub struct LaunchServicesResolver {
    prefs: PathBuf,
    plutil: PathBuf,
    scheme: String,
}

impl LaunchServicesResolver {
    pub fn new(config: &BrowserConfig) -> Self {
        LaunchServicesResolver {
            prefs: config.launch_services.clone(),
            plutil: config.plutil.clone(),
            scheme: config.scheme.clone(),
        }
    }

    fn lookup(&self) -> Result<Option<String>, ResolutionError> {
        if !self.prefs.is_file() {
            debug!(path = %self.prefs.display(), "no LaunchServices preferences");
            return Ok(None);
        }

        let output = Command::new(&self.plutil)
            .arg("-convert")
            .arg("json")
            .arg("-o")
            .arg("-")
            .arg(&self.prefs)
            .output()
            .map_err(|source| ResolutionError::Spawn {
                program: self.plutil.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ResolutionError::Status {
                program: self.plutil.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        find_handler(&output.stdout, &self.scheme)
    }
}

impl HandlerResolver for LaunchServicesResolver {
    fn resolve(&self) -> Option<String> {
        match self.lookup() {
            Ok(handler) => {
                debug!(scheme = %self.scheme, handler = ?handler, "resolved default handler");
                handler
            }
            Err(e) => {
                warn!(error = %e, "error getting default browser, using generic open");
                None
            }
        }
    }
}

/// Asks the inner resolver once, on first use, and remembers the answer
/// (including "absent") for the rest of the process.
#[derive(Debug)]
pub struct CachedResolver<R> {
    inner: R,
    cached: OnceCell<Option<String>>,
}

impl<R: HandlerResolver> CachedResolver<R> {
    pub fn new(inner: R) -> Self {
        CachedResolver {
            inner,
            cached: OnceCell::new(),
        }
    }

    pub fn handler(&self) -> Option<&str> {
        self.cached.get_or_init(|| self.inner.resolve()).as_deref()
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R: HandlerResolver> HandlerResolver for CachedResolver<R> {
    fn resolve(&self) -> Option<String> {
        self.handler().map(str::to_owned)
    }
}
