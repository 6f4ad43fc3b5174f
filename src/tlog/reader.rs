//! Transaction log reader
//!
//! Reads events back from the log medium in append order and checks that
//! sequence numbers keep increasing.

use std::io::{BufReader, Read};

use crate::config::LoggerKind;
use crate::error::{KvError, Result};
use super::{binary, text, Event};

/// Sequential reader over a log medium
pub struct EventReader<R: Read> {
    source: BufReader<R>,
    kind: LoggerKind,

    /// Line number (text) or byte offset (binary) of the next record
    position: u64,

    /// Highest sequence seen so far
    last_sequence: u64,

    /// Set after the first error or end of input
    finished: bool,
}

impl<R: Read> EventReader<R> {
    /// Read `source` from its current position, expecting sequences above `last_sequence`
    pub fn new(source: R, kind: LoggerKind, last_sequence: u64) -> Self {
        let position = match kind {
            LoggerKind::File => 1,
            LoggerKind::Binary => 0,
        };
        Self {
            source: BufReader::new(source),
            kind,
            position,
            last_sequence,
            finished: false,
        }
    }

    /// Read the next event, or `Ok(None)` at end of input
    pub fn next_event(&mut self) -> Result<Option<Event>> {
        if self.finished {
            return Ok(None);
        }

        let result = self.read_record().and_then(|event| match event {
            Some(event) if event.sequence <= self.last_sequence => Err(KvError::Sequence {
                last: self.last_sequence,
                found: event.sequence,
            }),
            other => Ok(other),
        });

        match &result {
            Ok(Some(event)) => self.last_sequence = event.sequence,
            Ok(None) | Err(_) => self.finished = true,
        }
        result
    }

    fn read_record(&mut self) -> Result<Option<Event>> {
        match self.kind {
            LoggerKind::File => {
                let event = text::read_event(&mut self.source, self.position as usize)?;
                self.position += 1;
                Ok(event)
            }
            LoggerKind::Binary => match binary::read_frame(&mut self.source, self.position)? {
                Some((event, size)) => {
                    self.position += size;
                    Ok(Some(event))
                }
                None => Ok(None),
            },
        }
    }

    /// Highest sequence number read so far
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }
}

impl<R: Read> Iterator for EventReader<R> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_event().transpose()
    }
}
