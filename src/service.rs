//! Key-Value Service
//!
//! Binds the store and the transaction log into a crash-consistent service.
//!
//! ## Responsibilities
//! - Rebuild the store from the log on startup
//! - Start the live log writer once replay is clean
//! - Apply each mutation to the store, then record it in the log
//! - Drain the log on shutdown

use std::fmt;

use crossbeam::channel::Receiver;
use crossbeam::select;

use crate::config::Config;
use crate::error::{KvError, Result};
use crate::protocol::Command;
use crate::store::Store;
use crate::tlog::{Event, EventKind, TransactionLogger, binary::MAX_FRAME_PAYLOAD};

/// Upper bound on key + value bytes accepted from clients
///
/// Leaves room for the record header so every accepted write can be encoded.
pub const MAX_ENTRY_SIZE: usize = MAX_FRAME_PAYLOAD as usize - 64;

/// Lifecycle of a [`KvService`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Initializing,
    Replaying,
    Live,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceState::Initializing => "initializing",
            ServiceState::Replaying => "replaying",
            ServiceState::Live => "live",
        };
        f.write_str(name)
    }
}

/// The key-value service
///
/// ## Concurrency Model
///
/// - **Reads** (get): shared lock on the store only, never touch the log
/// - **Writes** (put/delete): exclusive lock on the store held across the
///   mutation and the hand-off to the log writer's queue
///
/// The log writer thread owns the file; nothing here writes to it directly.
pub struct KvService {
    store: Store,
    logger: TransactionLogger,
    state: ServiceState,
}

impl KvService {
    /// Open the log named by `config` and build a live service from it
    pub fn open(config: &Config) -> Result<Self> {
        let logger = TransactionLogger::open(config)?;
        let store = match config.max_keys {
            Some(limit) => Store::with_max_keys(limit),
            None => Store::new(),
        };
        Self::with_store(store, logger)
    }

    /// Build a live service over an already opened logger
    pub fn new(logger: TransactionLogger) -> Result<Self> {
        Self::with_store(Store::new(), logger)
    }

    /// Replay `logger` into `store`, then start the writer
    ///
    /// Any replay failure aborts construction; the logger is dropped and no
    /// service is returned.
    pub fn with_store(store: Store, logger: TransactionLogger) -> Result<Self> {
        let mut service = Self {
            store,
            logger,
            state: ServiceState::Initializing,
        };

        service.transition(ServiceState::Replaying);
        let (events, errors) = service.logger.read_events();
        let applied = service.replay(events, errors)?;
        tracing::info!(
            applied,
            keys = service.store.len(),
            "store rebuilt from transaction log"
        );

        service.logger.run()?;
        service.transition(ServiceState::Live);

        Ok(service)
    }

    /// Drain both replay channels, applying events in order
    fn replay(&self, events: Receiver<Event>, errors: Receiver<KvError>) -> Result<u64> {
        let mut applied = 0u64;
        loop {
            select! {
                recv(errors) -> msg => match msg {
                    Ok(err) => return Err(err),
                    // Reader finished cleanly; whatever is still buffered is valid.
                    Err(_) => {
                        for event in events.iter() {
                            self.apply(event);
                            applied += 1;
                        }
                        return Ok(applied);
                    }
                },
                recv(events) -> msg => match msg {
                    Ok(event) => {
                        self.apply(event);
                        applied += 1;
                    }
                    Err(_) => {
                        return match errors.recv() {
                            Ok(err) => Err(err),
                            Err(_) => Ok(applied),
                        };
                    }
                },
            }
        }
    }

    fn apply(&self, event: Event) {
        match event.kind {
            EventKind::Put => self.store.restore(event.key, event.value),
            EventKind::Delete => {
                self.store.remove(&event.key);
            }
        }
    }

    fn transition(&mut self, next: ServiceState) {
        tracing::debug!(from = %self.state, to = %next, "service state change");
        self.state = next;
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Store a value
    ///
    /// The log record is enqueued only once the store has accepted the key,
    /// under the store's write lock, so log order matches store order. If the
    /// record cannot be enqueued the store is left unchanged.
    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        if value.is_empty() {
            return Err(KvError::InvalidInput("value must not be empty".to_string()));
        }
        if key.len() + value.len() > MAX_ENTRY_SIZE {
            return Err(KvError::InvalidInput(format!(
                "entry too large: {} bytes (max {})",
                key.len() + value.len(),
                MAX_ENTRY_SIZE
            )));
        }

        self.store
            .put_with(key.to_string(), value.to_string(), || self.logger.write_put(key, value))
    }

    /// Get the current value of a key
    pub fn get(&self, key: &str) -> Result<String> {
        validate_key(key)?;
        self.store.get(key)
    }

    /// Remove a key; absent keys succeed
    ///
    /// Succeeds once the store is updated, whether or not the log record
    /// could be queued. A dead writer is reported through [`KvService::err`].
    pub fn delete(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let recorded = self.store.delete_with(key, || self.logger.write_delete(key));

        if let Err(e) = recorded {
            tracing::warn!(key, "delete not recorded in transaction log: {}", e);
        }
        Ok(())
    }

    /// Execute a protocol command
    ///
    /// Returns the value for GET, `PONG` for PING and nothing for mutations.
    pub fn execute(&self, command: Command) -> Result<Option<String>> {
        match command {
            Command::Get { key } => self.get(&key).map(Some),
            Command::Put { key, value } => {
                self.put(&key, &value)?;
                Ok(None)
            }
            Command::Delete { key } => {
                self.delete(&key)?;
                Ok(None)
            }
            Command::Ping => Ok(Some("PONG".to_string())),
        }
    }

    /// Drain the log writer and sync the log
    pub fn close(self) -> Result<()> {
        tracing::info!(keys = self.store.len(), "closing service");
        self.logger.close()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Channel carrying the log writer's fatal failure
    pub fn err(&self) -> Receiver<KvError> {
        self.logger.err()
    }

    /// The log writer's fatal failure, if any
    pub fn writer_error(&self) -> Option<KvError> {
        self.logger.last_error()
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    /// Highest sequence number written or replayed
    pub fn last_sequence(&self) -> u64 {
        self.logger.last_sequence()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(KvError::InvalidInput("key must not be empty".to_string()));
    }
    Ok(())
}
