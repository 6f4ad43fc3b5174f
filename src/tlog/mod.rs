//! Transaction Log Module
//!
//! Durable, ordered, append-only record of every mutation, used to rebuild
//! the store after a restart.
//!
//! ## Responsibilities
//! - Queue mutations for asynchronous append by a single writer thread
//! - Assign strictly increasing sequence numbers in append order
//! - Replay the log at startup, rejecting out-of-order or damaged records
//! - Drain and sync on shutdown
//!
//! ## File Formats
//!
//! `file` (text, one record per line):
//! ```text
//! <sequence>\t<kind>\t<escaped key>\t<escaped value>\n
//! ```
//!
//! `binary` (framed, checksummed):
//! ```text
//! ┌─────────┬─────────┬────────┬──────────────────────────┐
//! │ Seq (8) │ CRC (4) │Len (4) │ bincode(kind, key, value)│
//! └─────────┴─────────┴────────┴──────────────────────────┘
//! ```
//!
//! Kind codes: `1` = put, `2` = delete, `0` reserved.

mod event;
mod logger;
mod reader;
mod writer;

pub mod binary;
pub mod text;

pub use event::{Event, EventKind};
pub use logger::{LoggerOptions, TransactionLogger};
pub use reader::EventReader;
pub use writer::{LogSink, LogWriter};
