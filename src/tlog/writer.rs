//! Transaction log writer
//!
//! Appends encoded events to the log medium. Owned by the single writer
//! thread once the logger is live.

use std::fs::File;
use std::io::{self, BufWriter, Write};

use crate::config::{LoggerKind, SyncStrategy};
use crate::error::Result;
use super::{binary, text, Event};

/// Destination the writer appends to
pub trait LogSink: Write + Send + 'static {
    /// Make everything written so far durable
    fn sync(&mut self) -> io::Result<()>;
}

impl LogSink for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

/// Appends events to a sink
pub struct LogWriter {
    sink: BufWriter<Box<dyn LogSink>>,
    kind: LoggerKind,
    sync_strategy: SyncStrategy,

    /// Appends since the last sync
    unsynced: usize,
}

impl LogWriter {
    pub fn new(sink: Box<dyn LogSink>, kind: LoggerKind, sync_strategy: SyncStrategy) -> Self {
        Self {
            sink: BufWriter::new(sink),
            kind,
            sync_strategy,
            unsynced: 0,
        }
    }

    /// Append one event and push it to the sink
    ///
    /// The event must already carry its sequence number.
    pub fn append(&mut self, event: &Event) -> Result<()> {
        match self.kind {
            LoggerKind::File => self.sink.write_all(text::encode_line(event).as_bytes())?,
            LoggerKind::Binary => self.sink.write_all(&binary::encode_frame(event)?)?,
        }
        self.sink.flush()?;
        self.unsynced += 1;

        let due = match self.sync_strategy {
            SyncStrategy::EveryWrite => true,
            SyncStrategy::EveryNEntries { count } => self.unsynced >= count,
        };
        if due {
            self.sync()?;
        }
        Ok(())
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        if self.unsynced == 0 {
            return Ok(());
        }
        self.sink.flush()?;
        self.sink.get_mut().sync()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Appends not yet synced
    pub fn unsynced(&self) -> usize {
        self.unsynced
    }
}
