//! Per-OS bits: the product version and the generic URL opener.

use crate::error::OpenError;

use super::opener::Invocation;

/// Which generic opener family applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Windows,
    /// Linux, the BSDs and other freedesktop systems.
    Unix,
    Unsupported,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(windows) {
            Platform::Windows
        } else if cfg!(unix) {
            Platform::Unix
        } else {
            Platform::Unsupported
        }
    }
}

/// The OS product version (`sw_vers -productVersion`), macOS only.
#[cfg(target_os = "macos")]
pub fn os_version() -> Option<String> {
    let output = std::process::Command::new("/usr/bin/sw_vers")
        .arg("-productVersion")
        .output()
        .map_err(|e| tracing::warn!(error = %e, "unable to query OS version"))
        .ok()?;
    let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (output.status.success() && !version.is_empty()).then_some(version)
}

#[cfg(not(target_os = "macos"))]
pub fn os_version() -> Option<String> {
    None
}

/// The running platform's "open this URL in the default app" command.
pub fn default_open(url: &str) -> Result<Invocation, OpenError> {
    default_open_on(Platform::current(), url)
}

/// The generic open command for `platform`. The URL is always passed as one
/// argument to a program that does no shell parsing of its own.
pub fn default_open_on(platform: Platform, url: &str) -> Result<Invocation, OpenError> {
    match platform {
        Platform::MacOs => {
            // `open location` goes through the user's default browser setting
            // rather than the launching app's own bundle.
            let script = format!("open location \"{}\"", applescript_escape(url));
            Ok(Invocation::new("/usr/bin/osascript", ["-e".to_string(), script]))
        }
        // Not `cmd /C start`: cmd re-parses the line and splits on `&`, `|`, ...
        Platform::Windows => Ok(Invocation::new(
            "rundll32.exe",
            ["url.dll,FileProtocolHandler", url],
        )),
        Platform::Unix => Ok(Invocation::new("xdg-open", [url])),
        Platform::Unsupported => Err(OpenError::Unsupported),
    }
}

fn applescript_escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}
