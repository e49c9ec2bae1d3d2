//! # ssb_runtime_host
//!
//! The native messaging host for site-specific browser (SSB) apps.
//!
//! An SSB app's runtime extension launches this host and talks to it over
//! **stdin/stdout**. The host does two things:
//!
//! - tells the extension which app it belongs to (`{"version": ...}`), and
//! - opens links in the user's *real* default browser (`{"url": "..."}`),
//!   rather than in the SSB app itself.
//!
//! ---
//!
//! ## Wire protocol
//!
//! 1. The sender writes a **4-byte length prefix** (`u32`), **little-endian**.
//! 2. Then writes **that many bytes** of UTF-8 JSON.
//!
//! | Direction | Shape |
//! |-----------|-------|
//! | in  | `{"version": <anything>}` |
//! | in  | `{"url": "<string>"}` |
//! | out | `{"version": "...", "ssbID": "...", "ssbName": "...", "ssbShortName": "..."}` |
//! | out | `{"result": "success" \| "error", "url": "..."}` |
//!
//! A message with both keys gets the identity reply first. A message with
//! neither gets no reply.
//!
//! ### Gotchas
//!
//! - **Disconnect is normal:** when the browser closes stdin the loop ends
//!   with [`dispatch::RunOutcome::EndOfStream`] and the process exits 0.
//! - **Never log to stdout:** stdout is reserved for frames. [`telemetry`]
//!   writes to stderr and the app's log file.
//! - **Bad input never kills the host:** a malformed frame is logged and
//!   dropped; a URL that cannot be opened gets an `"error"` result.
//!
//! ---
//!
//! ## Opening links
//!
//! [`browser::UrlOpener`] tries, in order:
//!
//! 1. if the default `http` handler is one that must be named explicitly
//!    (Chrome, by default), `open -b <handler> <url>`;
//! 2. if the OS version is one with a broken generic opener, `open <url>`;
//! 3. the platform's generic "open URL" command.
//!
//! The default handler is looked up once, on the first link, and cached.
//!
//! ---
//!
//! ## Pure framing
//!
//! ```rust
//! use ssb_runtime_host::host::{encode_message, read_frame, MAX_FROM_BROWSER};
//! use serde_json::json;
//! use std::io::Cursor;
//!
//! let msg = json!({"url": "https://example.com"});
//! let frame = encode_message(&msg).unwrap();
//!
//! let mut cur = Cursor::new(frame);
//! assert_eq!(read_frame(&mut cur, MAX_FROM_BROWSER).unwrap(), Some(msg));
//! assert_eq!(read_frame(&mut cur, MAX_FROM_BROWSER).unwrap(), None);
//! ```
//!
//! ## Running the loop against in-memory streams
//!
//! ```rust
//! use ssb_runtime_host::browser::Opener;
//! use ssb_runtime_host::dispatch::{Dispatcher, RunOutcome};
//! use ssb_runtime_host::error::OpenError;
//! use ssb_runtime_host::host::encode_message;
//! use ssb_runtime_host::identity::IdentityInfo;
//! use std::io::Cursor;
//!
//! struct NoBrowser;
//! impl Opener for NoBrowser {
//!     fn open(&self, _url: &str) -> Result<(), OpenError> {
//!         Err(OpenError::Unsupported)
//!     }
//! }
//!
//! let identity = IdentityInfo {
//!     app_version: "1.2.3".into(),
//!     app_id: "com.example.app".into(),
//!     app_display_name: "Example".into(),
//!     app_short_name: "Ex".into(),
//! };
//!
//! let input = encode_message(&serde_json::json!({"version": true})).unwrap();
//! let mut output = Vec::new();
//! let outcome = Dispatcher::new(identity, NoBrowser).run(&mut Cursor::new(input), &mut output);
//! assert_eq!(outcome, RunOutcome::EndOfStream);
//! assert!(!output.is_empty());
//! ```

pub mod browser;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod identity;
pub mod message;
pub mod telemetry;

// -------- Re-exports --------

#[doc(inline)]
pub use host::{decode_message, encode_message, read_frame, write_frame};

#[doc(inline)]
pub use dispatch::{Dispatcher, RunOutcome};

#[doc(inline)]
pub use config::HostConfig;
#[doc(inline)]
pub use identity::IdentityInfo;
