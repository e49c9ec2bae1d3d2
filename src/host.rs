//! Native messaging framing over any `Read`/`Write`.
//!
//! Every frame is a 4-byte **little-endian** `u32` length followed by that
//! many bytes of UTF-8 JSON. The same framing is used in both directions.

use serde::Serialize;
use serde_json::Value;
use std::io::{self, Read, Write};

use crate::error::{FrameError, TransportError};

/// Largest payload the host will send (host -> browser).
pub const MAX_TO_BROWSER: usize = 1_048_576;
/// Largest payload the host will accept (browser -> host).
pub const MAX_FROM_BROWSER: usize = 64 * 1_048_576;

/// Reads until `buf` is full or the stream ends. Returns the number of bytes
/// actually read; short reads and `Interrupted` are retried.
fn read_full<R: Read + ?Sized>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Reads the length prefix. `None` means the stream was already closed.
fn read_len<R: Read + ?Sized>(r: &mut R) -> Result<Option<usize>, FrameError> {
    let mut len_buf = [0u8; 4];
    match read_full(r, &mut len_buf)? {
        0 => Ok(None),
        4 => Ok(Some(u32::from_le_bytes(len_buf) as usize)),
        got => Err(FrameError::TruncatedLength { got }),
    }
}

/// Encode any serde-serializable value into a frame:
/// 4-byte little-endian length + JSON bytes.
pub fn encode_message<T: Serialize + ?Sized>(msg: &T) -> Result<Vec<u8>, TransportError> {
    let json = serde_json::to_vec(msg)?;
    if json.len() > MAX_TO_BROWSER {
        return Err(TransportError::TooLarge {
            len: json.len(),
            max: MAX_TO_BROWSER,
        });
    }
    let mut out = Vec::with_capacity(4 + json.len());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(&json);
    Ok(out)
}

/// Decode one frame's payload as text.
///
/// Returns `Ok(None)` when the stream is closed before any byte of the next
/// frame, which is the normal way a browser disconnects.
pub fn decode_message<R: Read + ?Sized>(
    reader: &mut R,
    max_size: usize,
) -> Result<Option<String>, FrameError> {
    let Some(len) = read_len(reader)? else {
        return Ok(None);
    };

    let cap = max_size.min(MAX_FROM_BROWSER);
    if len > cap {
        // Drain the payload so the next read starts on a frame boundary.
        io::copy(&mut Read::take(&mut *reader, len as u64), &mut io::sink())?;
        return Err(FrameError::TooLarge { len, max: cap });
    }

    let mut buf = vec![0u8; len];
    let got = read_full(reader, &mut buf)?;
    if got < len {
        return Err(FrameError::TruncatedPayload { expected: len, got });
    }
    Ok(Some(String::from_utf8(buf)?))
}

/// Decode one frame into a JSON value. `Ok(None)` is end of stream.
///
/// A payload that is not valid JSON is reported as [`FrameError::Json`] and
/// is consumed; nothing from it is kept for the next call.
pub fn read_frame<R: Read + ?Sized>(
    reader: &mut R,
    max_size: usize,
) -> Result<Option<Value>, FrameError> {
    match decode_message(reader, max_size)? {
        Some(text) => Ok(Some(serde_json::from_str(&text)?)),
        None => Ok(None),
    }
}

/// Encode `msg`, write it as one frame and flush immediately.
pub fn write_frame<W: Write + ?Sized, T: Serialize + ?Sized>(
    writer: &mut W,
    msg: &T,
) -> Result<(), TransportError> {
    let frame = encode_message(msg)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}
