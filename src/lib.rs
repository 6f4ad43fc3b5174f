//! # tlogkv
//!
//! A single-node key-value store with:
//! - An append-only transaction log for crash recovery
//! - Asynchronous appends through a single writer thread
//! - Sequence-checked replay on startup
//! - REST and TCP frontends
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              Frontend (REST or TCP, many clients)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ put / get / delete
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      KvService                               │
//! │        (store mutation first, then log enqueue)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌──────────────────┐
//!   │    Store    │          │ TransactionLogger│
//!   │  (RwLock)   │          │ queue ─► writer  │
//!   └─────────────┘          └────────┬─────────┘
//!                                     ▼
//!                              transaction log file
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod tlog;
pub mod store;
pub mod service;
pub mod protocol;
pub mod network;
pub mod frontend;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ErrorKind, KvError, Result};
pub use config::{Config, FrontendKind, LoggerKind, SyncStrategy};
pub use service::KvService;
pub use store::Store;
pub use tlog::{Event, EventKind, TransactionLogger};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of tlogkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
