//! Error types for the host.
//!
//! Each component returns its own error enum. Only the dispatcher decides
//! what happens next (log and continue, or answer with an error result), so
//! none of these are caught anywhere else.
//!
//! | Component | Error | What the dispatcher does |
//! |-----------|-------|--------------------------|
//! | framing (read) | [`FrameError`] | log, drop the message, keep reading |
//! | framing (write) | [`TransportError`] | log, stop after repeated failures |
//! | default-handler lookup | [`ResolutionError`] | log, treat handler as absent |
//! | opening a URL | [`OpenError`] | reply `{"result": "error"}` |

use std::io;
use std::path::PathBuf;
use std::string::FromUtf8Error;

use thiserror::Error;

/// Failure to decode one inbound frame.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The stream closed after 1..=3 bytes of the length prefix.
    #[error("truncated length prefix: got {got} of 4 bytes")]
    TruncatedLength { got: usize },

    /// The stream closed before the full payload arrived.
    #[error("truncated payload: expected {expected} bytes, got {got}")]
    TruncatedPayload { expected: usize, got: usize },

    /// The length prefix is above the accepted maximum. The payload has been
    /// drained from the stream.
    #[error("incoming message too large: {len} bytes (max {max})")]
    TooLarge { len: usize, max: usize },

    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),

    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The input stream itself failed (not a clean EOF).
    #[error("failed to read from input stream: {0}")]
    Io(#[from] io::Error),
}

impl FrameError {
    /// Whether the input stream can still be read after this error.
    ///
    /// A truncated frame means the stream hit EOF, so the next read reports
    /// end of stream on its own. An I/O error means the stream is unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FrameError::Io(_))
    }
}

/// Failure to send one outbound frame.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to serialize outgoing message: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("outgoing message too large: {len} bytes (max {max})")]
    TooLarge { len: usize, max: usize },

    #[error("failed to write to output stream: {0}")]
    Io(#[from] io::Error),
}

/// Failure to look up the OS default handler for a URL scheme.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Status {
        program: PathBuf,
        status: String,
        stderr: String,
    },

    #[error("malformed handler list: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Failure of the chosen URL-open strategy.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {status}")]
    Status { program: PathBuf, status: String },

    /// No generic "open URL" command is known for this platform.
    #[error("no URL opener available on this platform")]
    Unsupported,
}

/// Failure to load the host configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Failure to establish who this host is answering for.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("failed to read identity manifest {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid identity manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unable to find the parent engine path: {0}")]
    ParentEngine(String),

    #[error("no identity source available (set [identity] in the config)")]
    Unavailable,
}

/// Failure to install the logging subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter: {0}")]
    Filter(String),

    #[error("failed to open log file {path}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(String),
}
