//! Response definitions
//!
//! Status codes follow the REST frontend so both frontends report the same
//! outcome for the same request.

use crate::error::{ErrorKind, KvError};

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    /// Value returned (GET, PING)
    Ok = 0x00,
    /// Value stored (PUT)
    Created = 0x01,
    /// Key removed (DELETE)
    NoContent = 0x02,
    NotFound = 0x03,
    BadRequest = 0x04,
    Error = 0x05,
}

impl Status {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(Status::Ok),
            0x01 => Some(Status::Created),
            0x02 => Some(Status::NoContent),
            0x03 => Some(Status::NotFound),
            0x04 => Some(Status::BadRequest),
            0x05 => Some(Status::Error),
            _ => None,
        }
    }

    /// Whether the request succeeded
    pub fn is_success(self) -> bool {
        matches!(self, Status::Ok | Status::Created | Status::NoContent)
    }
}

/// A response to send to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Value for GET, error message for failures
    pub payload: Option<String>,
}

impl Response {
    /// Create an OK response with optional payload
    pub fn ok(payload: Option<String>) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    pub fn created() -> Self {
        Self {
            status: Status::Created,
            payload: None,
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: Status::NoContent,
            payload: None,
        }
    }

    /// Create a NOT_FOUND response
    pub fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            payload: None,
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self {
            status: Status::BadRequest,
            payload: Some(message.to_string()),
        }
    }

    /// Create an ERROR response
    pub fn error(message: &str) -> Self {
        Self {
            status: Status::Error,
            payload: Some(message.to_string()),
        }
    }

    /// Map a failed request to its response
    pub fn from_error(err: &KvError) -> Self {
        match err.kind() {
            ErrorKind::NotFound => Response::not_found(),
            ErrorKind::InvalidInput | ErrorKind::Protocol => Response::bad_request(&err.to_string()),
            _ => Response::error(&err.to_string()),
        }
    }
}
