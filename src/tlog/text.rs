//! Text record format
//!
//! One event per line: `sequence \t kind \t key \t value \n`.
//!
//! Keys and values are escaped so that any string fits on one line:
//!
//! | char | written as |
//! |------|------------|
//! | `\`  | `\\`       |
//! | TAB  | `\t`       |
//! | LF   | `\n`       |
//! | CR   | `\r`       |

use std::io::{BufRead, ErrorKind as IoErrorKind};

use crate::error::{KvError, Result};
use super::{Event, EventKind};

/// Encode an event as a single newline-terminated line
pub fn encode_line(event: &Event) -> String {
    let mut line = String::with_capacity(24 + event.key.len() + event.value.len());
    line.push_str(&event.sequence.to_string());
    line.push('\t');
    line.push_str(&event.kind.code().to_string());
    line.push('\t');
    escape_into(&mut line, &event.key);
    line.push('\t');
    if event.kind == EventKind::Put {
        escape_into(&mut line, &event.value);
    }
    line.push('\n');
    line
}

/// Decode one line (without its trailing newline)
///
/// `line_no` is 1-based and only used for error reporting.
pub fn decode_line(line: &str, line_no: usize) -> Result<Event> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != 4 {
        return Err(KvError::parse_at_line(
            line_no,
            format!("expected 4 tab separated fields, found {}", fields.len()),
        ));
    }

    let sequence = fields[0].parse::<u64>().map_err(|e| {
        KvError::parse_at_line(line_no, format!("bad sequence {:?}: {}", fields[0], e))
    })?;

    let kind = fields[1]
        .parse::<u8>()
        .ok()
        .and_then(EventKind::from_code)
        .ok_or_else(|| {
            KvError::parse_at_line(line_no, format!("unknown event kind {:?}", fields[1]))
        })?;

    let key = unescape(fields[2]).map_err(|reason| KvError::parse_at_line(line_no, reason))?;
    let value = match kind {
        EventKind::Put => {
            unescape(fields[3]).map_err(|reason| KvError::parse_at_line(line_no, reason))?
        }
        EventKind::Delete => String::new(),
    };

    Ok(Event {
        sequence,
        kind,
        key,
        value,
    })
}

/// Read the next event from a line oriented source
///
/// Returns `Ok(None)` at end of input. A last line without a trailing
/// newline is accepted as long as it parses.
pub fn read_event<R: BufRead>(reader: &mut R, line_no: usize) -> Result<Option<Event>> {
    let mut line = String::new();
    let read = match reader.read_line(&mut line) {
        Ok(n) => n,
        Err(e) if e.kind() == IoErrorKind::InvalidData => {
            return Err(KvError::parse_at_line(line_no, "line is not valid UTF-8"));
        }
        Err(e) => return Err(e.into()),
    };

    if read == 0 {
        return Ok(None);
    }

    let trimmed = line.strip_suffix('\n').unwrap_or(line.as_str());
    decode_line(trimmed, line_no).map(Some)
}

fn escape_into(out: &mut String, field: &str) {
    for c in field.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
}

fn unescape(field: &str) -> std::result::Result<String, String> {
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => return Err(format!("invalid escape sequence \\{}", other)),
            None => return Err("dangling escape at end of field".to_string()),
        }
    }

    Ok(out)
}
