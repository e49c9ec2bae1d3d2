//! Logging setup.
//!
//! stdout carries protocol frames, so logs go to stderr and, when one is
//! known, to the app's log file as well. The file can only be picked once the
//! app identity is known, so the subscriber starts on a bootstrap file and
//! [`Telemetry::follow_app`] moves it over afterwards.

use regex::Regex;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::warn;
use tracing_subscriber::fmt::writer::{MakeWriter, MakeWriterExt};
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;
use crate::error::TelemetryError;

/// Env var that overrides the configured log filter.
pub const LOG_ENV: &str = "SSB_HOST_LOG";

const APP_LOG: &str = "Logs/epichrome_app_log.txt";
const FALLBACK_FILTER: &str = "info";

/// Pull the log file path out of an app lock file
/// (a line like `lockLogFile='/path/to/log.txt'`).
pub fn log_path_from_lock(contents: &str) -> Option<PathBuf> {
    let re = Regex::new(r"(?m)^\s*lockLogFile='([^\n]*)'[ \t]*$").ok()?;
    re.captures(contents)
        .and_then(|c| c.get(1))
        .map(|m| PathBuf::from(m.as_str()))
        .filter(|p| !p.as_os_str().is_empty())
}

/// The log file to write to.
///
/// In order: `[log].file`; the path named by the app lock file
/// (`[log].lock_file`, else `<data_root>/<app_id>/lock`); the app's default
/// log under `<data_root>/<app_id>`; and with no app ID, `[log].bootstrap_file`.
///
/// Also returns any problem hit while reading the lock file, so it can be
/// logged once the subscriber is up.
pub fn resolve_log_file(config: &LogConfig, app_id: Option<&str>) -> (PathBuf, Option<String>) {
    if let Some(file) = &config.file {
        return (file.clone(), None);
    }

    let fallback = match app_id {
        Some(id) => config.app_data_dir(id).join(APP_LOG),
        None => config.bootstrap_file.clone(),
    };
    let (lock, derived) = match (&config.lock_file, app_id) {
        (Some(lock), _) => (lock.clone(), false),
        (None, Some(id)) => (config.app_data_dir(id).join("lock"), true),
        (None, None) => return (fallback, None),
    };

    match fs::read_to_string(&lock) {
        Ok(contents) => (log_path_from_lock(&contents).unwrap_or(fallback), None),
        // Apps that are not running have no lock; that is not worth a warning.
        Err(e) if derived && e.kind() == io::ErrorKind::NotFound => (fallback, None),
        Err(e) => (
            fallback,
            Some(format!("unable to read app lock {}: {e}", lock.display())),
        ),
    }
}

/// Filter directive: env var, then config, then `debug`/`info`.
pub fn filter_directive(config: &LogConfig) -> String {
    if let Ok(env) = std::env::var(LOG_ENV) {
        if !env.trim().is_empty() {
            return env;
        }
    }
    match &config.filter {
        Some(f) => f.clone(),
        None if config.debug => "debug".to_string(),
        None => FALLBACK_FILTER.to_string(),
    }
}

/// Parse `directive`, falling back to `info` when it does not parse.
pub fn parse_filter(directive: &str) -> (EnvFilter, Option<TelemetryError>) {
    match EnvFilter::try_new(directive) {
        Ok(filter) => (filter, None),
        Err(e) => (
            EnvFilter::new(FALLBACK_FILTER),
            Some(TelemetryError::Filter(format!("{directive:?}: {e}"))),
        ),
    }
}

fn open_log_file(path: &Path) -> Result<File, TelemetryError> {
    let err = |source| TelemetryError::LogFile {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).map_err(err)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path).map_err(err)
}

/// File sink the subscriber writes to; the file behind it can be swapped.
/// Writes are dropped while no file is attached.
#[derive(Debug, Clone, Default)]
struct LogFile {
    file: Arc<Mutex<Option<File>>>,
}

impl LogFile {
    fn lock(&self) -> MutexGuard<'_, Option<File>> {
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

struct LogFileWriter<'a>(MutexGuard<'a, Option<File>>);

impl Write for LogFileWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.0.as_mut() {
            Some(f) => f.write(buf),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.0.as_mut() {
            Some(f) => f.flush(),
            None => Ok(()),
        }
    }
}

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = LogFileWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LogFileWriter(self.lock())
    }
}

/// Handle on the installed subscriber's log file.
#[derive(Debug)]
pub struct Telemetry {
    sink: LogFile,
    path: Option<PathBuf>,
}

impl Telemetry {
    fn detached() -> Self {
        Telemetry {
            sink: LogFile::default(),
            path: None,
        }
    }

    /// The log file currently written to, if any.
    pub fn log_file(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Send file output to `path` from now on. On error the previous file
    /// stays attached.
    pub fn attach(&mut self, path: &Path) -> Result<(), TelemetryError> {
        if self.path.as_deref() == Some(path) {
            return Ok(());
        }
        let file = open_log_file(path)?;
        *self.sink.lock() = Some(file);
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    /// Resolve the log file for `app_id` and attach it, logging problems
    /// instead of failing.
    pub fn follow_app(&mut self, config: &LogConfig, app_id: Option<&str>) {
        let (path, lock_problem) = resolve_log_file(config, app_id);
        if let Some(msg) = lock_problem {
            warn!("{msg}");
        }
        if let Err(e) = self.attach(&path) {
            match self.log_file() {
                Some(current) => warn!("{e}; still logging to {}", current.display()),
                None => warn!("{e}; logging to stderr only"),
            }
        }
    }
}

/// Install the global subscriber and attach the first log file: the
/// configured one, else the one for `app_id`, else the bootstrap file.
pub fn init(config: &LogConfig, app_id: Option<&str>) -> Result<Telemetry, TelemetryError> {
    let (filter, filter_problem) = parse_filter(&filter_directive(config));
    let mut telemetry = Telemetry::detached();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr.and(telemetry.sink.clone()))
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| TelemetryError::Subscriber(e.to_string()))?;

    if let Some(e) = filter_problem {
        warn!("{e}; using \"{FALLBACK_FILTER}\"");
    }
    telemetry.follow_app(config, app_id);
    Ok(telemetry)
}
