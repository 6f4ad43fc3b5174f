//! Transaction Logger
//!
//! Public face of the log: asynchronous appends through a bounded queue
//! drained by one writer thread, and a one-shot replay of the existing
//! medium.
//!
//! ## Lifecycle
//! ```text
//! open ──► read_events() ──► (drain both channels) ──► run() ──► write_* ... ──► close()
//! ```

use std::fs::OpenOptions;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Mutex, RwLock};

use crate::config::{Config, LoggerKind, SyncStrategy};
use crate::error::{KvError, Result};
use super::reader::EventReader;
use super::writer::{LogSink, LogWriter};
use super::Event;

/// Tunables for the writer side of a logger
#[derive(Debug, Clone, Copy)]
pub struct LoggerOptions {
    pub sync_strategy: SyncStrategy,

    /// Capacity of the pending-event queue (and of the replay channel)
    pub queue_capacity: usize,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        let config = Config::default();
        Self::from(&config)
    }
}

impl From<&Config> for LoggerOptions {
    fn from(config: &Config) -> Self {
        Self {
            sync_strategy: config.sync_strategy,
            queue_capacity: config.queue_capacity.max(1),
        }
    }
}

enum ReplayState {
    /// `read_events` not called yet; holds the source to read from
    Pending(Box<dyn Read + Send>),

    /// Reader thread spawned; yields whether the replay was clean
    Running(JoinHandle<bool>),

    /// Replay joined and clean
    Done,

    /// Replay joined and failed, or was never possible
    Failed,
}

/// Durable, ordered, append-only record of mutations
pub struct TransactionLogger {
    kind: LoggerKind,
    options: LoggerOptions,

    /// Highest sequence written or replayed
    last_sequence: Arc<AtomicU64>,

    replay: Mutex<ReplayState>,

    /// Medium handed to the writer thread by `run`
    sink: Mutex<Option<Box<dyn LogSink>>>,

    /// Producer side of the writer queue; `None` before `run` and after `close`
    events: RwLock<Option<Sender<Event>>>,

    writer: Mutex<Option<JoinHandle<Result<()>>>>,

    errors_tx: Sender<KvError>,
    errors_rx: Receiver<KvError>,

    /// Message of the writer's fatal failure, kept after the channel is drained
    failure: Arc<Mutex<Option<String>>>,
}

impl TransactionLogger {
    /// Open the log described by `config`
    pub fn open(config: &Config) -> Result<Self> {
        Self::open_path(config.logger_kind, &config.log_path, LoggerOptions::from(config))
    }

    /// Open or create a log file at `path`
    pub fn open_path(kind: LoggerKind, path: &Path, options: LoggerOptions) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)
            .map_err(|e| {
                KvError::Io(std::io::Error::new(
                    e.kind(),
                    format!("cannot open transaction log {}: {}", path.display(), e),
                ))
            })?;
        let source = file.try_clone()?;

        tracing::debug!(path = %path.display(), kind = %kind, "transaction log opened");

        Ok(Self::with_medium(kind, Box::new(source), Box::new(file), options))
    }

    /// Build a logger over an arbitrary medium
    ///
    /// `source` is read once by `read_events`; `sink` receives every append
    /// after `run`.
    pub fn with_medium(
        kind: LoggerKind,
        source: Box<dyn Read + Send>,
        sink: Box<dyn LogSink>,
        options: LoggerOptions,
    ) -> Self {
        let (errors_tx, errors_rx) = channel::bounded(1);
        Self {
            kind,
            options,
            last_sequence: Arc::new(AtomicU64::new(0)),
            replay: Mutex::new(ReplayState::Pending(source)),
            sink: Mutex::new(Some(sink)),
            events: RwLock::new(None),
            writer: Mutex::new(None),
            errors_tx,
            errors_rx,
            failure: Arc::new(Mutex::new(None)),
        }
    }

    // =========================================================================
    // Replay
    // =========================================================================

    /// Replay the medium from the beginning
    ///
    /// Events arrive on the first channel in append order; it closes at end
    /// of input. The first failure (I/O, parse or sequence) arrives on the
    /// second channel and ends the replay. The caller must drain both before
    /// calling [`run`](Self::run).
    pub fn read_events(&self) -> (Receiver<Event>, Receiver<KvError>) {
        let (events_tx, events_rx) = channel::bounded(self.options.queue_capacity);
        let (errors_tx, errors_rx) = channel::bounded(1);

        let mut replay = self.replay.lock();
        let source = match std::mem::replace(&mut *replay, ReplayState::Failed) {
            ReplayState::Pending(source) => source,
            previous => {
                *replay = previous;
                let _ = errors_tx.send(KvError::InvalidInput(
                    "transaction log has already been replayed".to_string(),
                ));
                return (events_rx, errors_rx);
            }
        };

        let kind = self.kind;
        let watermark = Arc::clone(&self.last_sequence);
        let start = watermark.load(Ordering::SeqCst);

        let handle = thread::Builder::new()
            .name("tlog-replay".to_string())
            .spawn(move || {
                let mut reader = EventReader::new(source, kind, start);
                let mut count = 0u64;
                loop {
                    match reader.next_event() {
                        Ok(Some(event)) => {
                            watermark.store(event.sequence, Ordering::SeqCst);
                            count += 1;
                            if events_tx.send(event).is_err() {
                                tracing::warn!("replay consumer went away after {} events", count);
                                return false;
                            }
                        }
                        Ok(None) => {
                            tracing::info!(
                                events = count,
                                last_sequence = reader.last_sequence(),
                                "transaction log replay finished"
                            );
                            return true;
                        }
                        Err(e) => {
                            tracing::error!("transaction log replay failed: {}", e);
                            let _ = errors_tx.send(e);
                            return false;
                        }
                    }
                }
            });

        match handle {
            Ok(handle) => *replay = ReplayState::Running(handle),
            Err(e) => {
                // Both senders were moved into the failed closure and dropped,
                // so report through a fresh pair.
                let (events_tx, events_rx) = channel::bounded(0);
                let (errors_tx, errors_rx) = channel::bounded(1);
                drop(events_tx);
                let _ = errors_tx.send(KvError::Io(e));
                return (events_rx, errors_rx);
            }
        }

        (events_rx, errors_rx)
    }

    // =========================================================================
    // Live writer
    // =========================================================================

    /// Start the live writer thread
    ///
    /// Waits for the replay thread to finish first, so the two never touch
    /// the medium at the same time. Fails if the replay never happened or
    /// did not complete cleanly, or if the writer was already started.
    pub fn run(&self) -> Result<()> {
        {
            let mut replay = self.replay.lock();
            match std::mem::replace(&mut *replay, ReplayState::Failed) {
                ReplayState::Running(handle) => {
                    if matches!(handle.join(), Ok(true)) {
                        *replay = ReplayState::Done;
                    }
                }
                ReplayState::Done => *replay = ReplayState::Done,
                ReplayState::Pending(source) => {
                    *replay = ReplayState::Pending(source);
                    return Err(KvError::WriteFailure(
                        "transaction log must be replayed before the writer starts".to_string(),
                    ));
                }
                ReplayState::Failed => {}
            }
            if !matches!(*replay, ReplayState::Done) {
                return Err(KvError::WriteFailure(
                    "transaction log replay did not complete".to_string(),
                ));
            }
        }

        let sink = self.sink.lock().take().ok_or_else(|| {
            KvError::WriteFailure("transaction log writer already started".to_string())
        })?;

        let (events_tx, events_rx) = channel::bounded(self.options.queue_capacity);
        let writer = LogWriter::new(sink, self.kind, self.options.sync_strategy);
        let last_sequence = Arc::clone(&self.last_sequence);
        let errors = self.errors_tx.clone();
        let failure = Arc::clone(&self.failure);

        let handle = thread::Builder::new()
            .name("tlog-writer".to_string())
            .spawn(move || writer_loop(writer, events_rx, last_sequence, errors, failure))?;

        *self.events.write() = Some(events_tx);
        *self.writer.lock() = Some(handle);

        tracing::info!(
            last_sequence = self.last_sequence(),
            "transaction log writer running"
        );
        Ok(())
    }

    /// Enqueue a put event
    ///
    /// Returns once the event is queued, not once it is durable. Blocks only
    /// while the queue is full.
    pub fn write_put(&self, key: &str, value: &str) -> Result<()> {
        self.enqueue(Event::put(key, value))
    }

    /// Enqueue a delete event
    pub fn write_delete(&self, key: &str) -> Result<()> {
        self.enqueue(Event::delete(key))
    }

    fn enqueue(&self, event: Event) -> Result<()> {
        if let Some(message) = self.failure.lock().clone() {
            return Err(KvError::WriteFailure(message));
        }

        let events = self.events.read();
        let sender = events.as_ref().ok_or_else(|| {
            KvError::WriteFailure("transaction log writer is not running".to_string())
        })?;

        sender.send(event).map_err(|_| {
            KvError::WriteFailure(
                self.failure
                    .lock()
                    .clone()
                    .unwrap_or_else(|| "transaction log writer has stopped".to_string()),
            )
        })
    }

    // =========================================================================
    // Errors
    // =========================================================================

    /// Channel carrying the writer's fatal failure (delivered at most once)
    pub fn err(&self) -> Receiver<KvError> {
        self.errors_rx.clone()
    }

    /// The writer's fatal failure, if it has happened
    pub fn last_error(&self) -> Option<KvError> {
        self.failure.lock().clone().map(KvError::WriteFailure)
    }

    // =========================================================================
    // Shutdown
    // =========================================================================

    /// Stop accepting events, drain the queue, sync the medium and join the writer
    ///
    /// Returns the writer's failure if it died. Calling it again is a no-op.
    pub fn close(&self) -> Result<()> {
        // Dropping the only sender lets the writer finish the backlog and exit.
        drop(self.events.write().take());

        let handle = match self.writer.lock().take() {
            Some(handle) => handle,
            None => return Ok(()),
        };

        let result = handle.join().unwrap_or_else(|_| {
            Err(KvError::WriteFailure(
                "transaction log writer panicked".to_string(),
            ))
        });

        if result.is_ok() {
            tracing::info!(
                last_sequence = self.last_sequence(),
                "transaction log closed"
            );
        }
        result
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Highest sequence number written or replayed
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence.load(Ordering::SeqCst)
    }

    /// Record format of this log
    pub fn kind(&self) -> LoggerKind {
        self.kind
    }

    /// Whether the writer thread has been started and not closed
    pub fn is_running(&self) -> bool {
        self.events.read().is_some()
    }
}

impl Drop for TransactionLogger {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::warn!("transaction log did not close cleanly: {}", e);
        }
    }
}

/// Body of the writer thread
///
/// Numbers each event as it is appended, in queue order. Exits when every
/// sender is gone (after draining) or on the first append failure.
fn writer_loop(
    mut writer: LogWriter,
    events: Receiver<Event>,
    last_sequence: Arc<AtomicU64>,
    errors: Sender<KvError>,
    failure: Arc<Mutex<Option<String>>>,
) -> Result<()> {
    let fail = |e: KvError| {
        let message = e.to_string();
        tracing::error!("transaction log writer stopped: {}", message);
        *failure.lock() = Some(message.clone());
        let _ = errors.try_send(KvError::WriteFailure(message.clone()));
        KvError::WriteFailure(message)
    };

    for event in events.iter() {
        let sequence = last_sequence.load(Ordering::SeqCst) + 1;
        let event = event.with_sequence(sequence);

        if let Err(e) = writer.append(&event) {
            return Err(fail(e));
        }
        last_sequence.store(sequence, Ordering::SeqCst);
        tracing::trace!(sequence, key = %event.key, kind = ?event.kind, "appended");

        // Sync batched appends once the burst is over.
        if events.is_empty() {
            if let Err(e) = writer.sync() {
                return Err(fail(e));
            }
        }
    }

    writer.sync().map_err(fail)
}
