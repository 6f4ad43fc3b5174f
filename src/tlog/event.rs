//! Transaction log event definitions
//!
//! Defines the structure of individual log records.

/// Kind of mutation recorded by an [`Event`]
///
/// The discriminants are the on-disk codes; `0` is reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EventKind {
    Put = 1,
    Delete = 2,
}

impl EventKind {
    /// On-disk code
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Parse an on-disk code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(EventKind::Put),
            2 => Some(EventKind::Delete),
            _ => None,
        }
    }
}

/// A single record in the transaction log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Sequence number, strictly increasing across the log.
    /// Zero until the writer assigns one.
    pub sequence: u64,

    /// The mutation performed
    pub kind: EventKind,

    pub key: String,

    /// Empty for deletes
    pub value: String,
}

impl Event {
    /// A put event with no sequence assigned yet
    pub fn put(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            sequence: 0,
            kind: EventKind::Put,
            key: key.into(),
            value: value.into(),
        }
    }

    /// A delete event with no sequence assigned yet
    pub fn delete(key: impl Into<String>) -> Self {
        Self {
            sequence: 0,
            kind: EventKind::Delete,
            key: key.into(),
            value: String::new(),
        }
    }

    /// Same event carrying the given sequence number
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }
}
