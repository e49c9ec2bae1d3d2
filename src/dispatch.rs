//! The host's main loop.
//!
//! Reads one frame, answers it, reads the next. Nothing but a closed input
//! stream (or an output stream that keeps failing) stops it.

use serde_json::Value;
use std::io::{Read, Write};
use tracing::{debug, error, info, warn};

use crate::browser::Opener;
use crate::host::{read_frame, write_frame, MAX_FROM_BROWSER};
use crate::identity::IdentityInfo;
use crate::message::{requests, IdentityReply, OpenResult, Reply, Request};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Running,
    Stopped,
}

/// Why [`Dispatcher::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The browser closed our stdin. Exit code 0.
    EndOfStream,
    /// Too many consecutive replies could not be written.
    TransportLost { failures: u32 },
}

impl RunOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            RunOutcome::EndOfStream => 0,
            RunOutcome::TransportLost { .. } => 1,
        }
    }
}

pub struct Dispatcher<O> {
    identity: IdentityInfo,
    opener: O,
    max_send_failures: u32,
    send_failures: u32,
    state: State,
}

impl<O: Opener> Dispatcher<O> {
    pub fn new(identity: IdentityInfo, opener: O) -> Self {
        Dispatcher {
            identity,
            opener,
            max_send_failures: 3,
            send_failures: 0,
            state: State::Running,
        }
    }

    /// Give up after `n` consecutive failed sends (minimum 1).
    pub fn with_max_send_failures(mut self, n: u32) -> Self {
        self.max_send_failures = n.max(1);
        self
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn opener(&self) -> &O {
        &self.opener
    }

    /// Replies for one decoded message, in the order they must be sent.
    ///
    /// Opening a URL happens here; a failure becomes an error result.
    pub fn handle(&self, message: &Value) -> Vec<Reply> {
        requests(message)
            .into_iter()
            .map(|req| match req {
                Request::Identity => Reply::Identity(IdentityReply::from(&self.identity)),
                Request::OpenUrl(url) => match self.opener.open(&url) {
                    Ok(()) => Reply::Open(OpenResult::success(url)),
                    Err(e) => {
                        warn!(url = %url, error = %e, "unable to open url");
                        Reply::Open(OpenResult::error(url))
                    }
                },
                Request::InvalidUrl(raw) => {
                    warn!(url = %raw, "url is not a string");
                    Reply::Open(OpenResult::error(raw))
                }
            })
            .collect()
    }

    /// Run until the input stream closes.
    pub fn run<R: Read, W: Write>(&mut self, reader: &mut R, writer: &mut W) -> RunOutcome {
        info!("native messaging host running");
        self.state = State::Running;

        let outcome = loop {
            let message = match read_frame(reader, MAX_FROM_BROWSER) {
                Ok(Some(message)) => message,
                Ok(None) => break RunOutcome::EndOfStream,
                Err(e) if e.is_fatal() => {
                    error!(error = %e, "input stream failed");
                    break RunOutcome::EndOfStream;
                }
                Err(e) => {
                    warn!(error = %e, "error receiving message");
                    continue;
                }
            };
            debug!(message = %message, "received message");

            let replies = self.handle(&message);
            if replies.is_empty() {
                debug!("message has no recognized keys, ignoring");
            }
            if let Some(outcome) = self.send_all(writer, &replies) {
                break outcome;
            }
        };

        self.state = State::Stopped;
        info!(?outcome, "native messaging host stopped");
        outcome
    }

    fn send_all<W: Write>(&mut self, writer: &mut W, replies: &[Reply]) -> Option<RunOutcome> {
        for reply in replies {
            match write_frame(writer, reply) {
                Ok(()) => {
                    self.send_failures = 0;
                    debug!(reply = ?reply, "sent message");
                }
                Err(e) => {
                    self.send_failures += 1;
                    error!(error = %e, failures = self.send_failures, "error sending message");
                    if self.send_failures >= self.max_send_failures {
                        return Some(RunOutcome::TransportLost {
                            failures: self.send_failures,
                        });
                    }
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OpenError;
    use crate::host::encode_message;
    use serde_json::json;
    use std::io::{self, Cursor};

    struct Always(bool);

    impl Opener for Always {
        fn open(&self, _url: &str) -> Result<(), OpenError> {
            if self.0 {
                Ok(())
            } else {
                Err(OpenError::Unsupported)
            }
        }
    }

    fn identity() -> IdentityInfo {
        IdentityInfo {
            app_version: "1.0".into(),
            app_id: "id".into(),
            app_display_name: "Name".into(),
            app_short_name: "N".into(),
        }
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn both_keys_answer_identity_first() {
        let d = Dispatcher::new(identity(), Always(true));
        let replies = d.handle(&json!({"url": "u", "version": true}));
        assert!(matches!(replies[0], Reply::Identity(_)));
        assert_eq!(replies[1], Reply::Open(OpenResult::success("u")));
    }

    #[test]
    fn repeated_send_failures_stop_the_loop() {
        let mut input = Vec::new();
        for _ in 0..10 {
            input.extend(encode_message(&json!({"version": 1})).unwrap());
        }
        let mut d = Dispatcher::new(identity(), Always(true)).with_max_send_failures(3);
        let outcome = d.run(&mut Cursor::new(input), &mut BrokenPipe);
        assert_eq!(outcome, RunOutcome::TransportLost { failures: 3 });
        assert_eq!(outcome.exit_code(), 1);
        assert_eq!(d.state(), State::Stopped);
    }

    #[test]
    fn single_send_failure_is_tolerated() {
        let mut input = Vec::new();
        input.extend(encode_message(&json!({"version": 1})).unwrap());
        let mut d = Dispatcher::new(identity(), Always(true)).with_max_send_failures(2);
        let outcome = d.run(&mut Cursor::new(input), &mut BrokenPipe);
        assert_eq!(outcome, RunOutcome::EndOfStream);
    }
}
