//! Binary record format
//!
//! ```text
//! ┌──────────────┬─────────┬─────────┬──────────────────────┐
//! │ Sequence (8) │ CRC (4) │ Len (4) │ Payload (Len bytes)  │
//! └──────────────┴─────────┴─────────┴──────────────────────┘
//! ```
//!
//! All integers are big endian. The payload is the bincode encoding of
//! `(kind, key, value)` and the CRC32 covers the payload only.

use std::io::{ErrorKind as IoErrorKind, Read};

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::{KvError, Result};
use super::{Event, EventKind};

/// Frame header size: sequence (8) + crc (4) + len (4)
pub const FRAME_HEADER_SIZE: usize = 16;

/// Maximum payload size (16 MB)
pub const MAX_FRAME_PAYLOAD: u32 = 16 * 1024 * 1024;

#[derive(Serialize)]
struct PayloadRef<'a> {
    kind: u8,
    key: &'a str,
    value: &'a str,
}

#[derive(Deserialize)]
struct Payload {
    kind: u8,
    key: String,
    value: String,
}

/// Encode an event as one frame
pub fn encode_frame(event: &Event) -> Result<Bytes> {
    let value = match event.kind {
        EventKind::Put => event.value.as_str(),
        EventKind::Delete => "",
    };
    let payload = bincode::serialize(&PayloadRef {
        kind: event.kind.code(),
        key: &event.key,
        value,
    })
    .map_err(|e| KvError::WriteFailure(format!("cannot encode event: {}", e)))?;

    if payload.len() > MAX_FRAME_PAYLOAD as usize {
        return Err(KvError::InvalidInput(format!(
            "event payload too large: {} bytes (max {})",
            payload.len(),
            MAX_FRAME_PAYLOAD
        )));
    }

    let mut frame = BytesMut::with_capacity(FRAME_HEADER_SIZE + payload.len());
    frame.put_u64(event.sequence);
    frame.put_u32(crc32fast::hash(&payload));
    frame.put_u32(payload.len() as u32);
    frame.put_slice(&payload);

    Ok(frame.freeze())
}

/// Read the next frame starting at byte `offset`
///
/// Returns the event and the size of the frame, or `Ok(None)` on a clean
/// end of input. A partial frame is a parse error: the log is append only,
/// so a short tail means the medium was damaged.
pub fn read_frame<R: Read>(reader: &mut R, offset: u64) -> Result<Option<(Event, u64)>> {
    let mut header = [0u8; FRAME_HEADER_SIZE];
    let got = read_full(reader, &mut header)?;
    if got == 0 {
        return Ok(None);
    }
    if got < FRAME_HEADER_SIZE {
        return Err(KvError::parse_at_offset(
            offset,
            format!("truncated frame header ({} of {} bytes)", got, FRAME_HEADER_SIZE),
        ));
    }

    let sequence = u64::from_be_bytes([
        header[0], header[1], header[2], header[3], header[4], header[5], header[6], header[7],
    ]);
    let crc = u32::from_be_bytes([header[8], header[9], header[10], header[11]]);
    let len = u32::from_be_bytes([header[12], header[13], header[14], header[15]]);

    if len > MAX_FRAME_PAYLOAD {
        return Err(KvError::parse_at_offset(
            offset,
            format!("frame payload too large: {} bytes (max {})", len, MAX_FRAME_PAYLOAD),
        ));
    }

    let mut payload = vec![0u8; len as usize];
    let got = read_full(reader, &mut payload)?;
    if got < payload.len() {
        return Err(KvError::parse_at_offset(
            offset,
            format!("truncated frame payload ({} of {} bytes)", got, len),
        ));
    }

    let actual = crc32fast::hash(&payload);
    if actual != crc {
        return Err(KvError::parse_at_offset(
            offset,
            format!("checksum mismatch (stored {:08x}, computed {:08x})", crc, actual),
        ));
    }

    let decoded: Payload = bincode::deserialize(&payload)
        .map_err(|e| KvError::parse_at_offset(offset, format!("undecodable payload: {}", e)))?;

    let kind = EventKind::from_code(decoded.kind).ok_or_else(|| {
        KvError::parse_at_offset(offset, format!("unknown event kind {}", decoded.kind))
    })?;

    let event = Event {
        sequence,
        kind,
        key: decoded.key,
        value: match kind {
            EventKind::Put => decoded.value,
            EventKind::Delete => String::new(),
        },
    };

    Ok(Some((event, (FRAME_HEADER_SIZE + len as usize) as u64)))
}

/// Fill `buf` as far as the input allows, returning how many bytes were read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == IoErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
