//! TCP Server
//!
//! Accepts connections and hands each one to its own thread.

use std::io::{BufWriter, ErrorKind as IoErrorKind};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::error::Result;
use crate::frontend::TcpFrontend;
use crate::protocol::{write_response, Response};
use crate::service::KvService;
use super::Connection;

/// How long the acceptor sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// TCP server for the binary protocol
pub struct Server {
    settings: TcpFrontend,
    service: Arc<KvService>,
    listener: TcpListener,
    shutdown: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
}

/// Cloneable handle that stops a running [`Server`]
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

impl Server {
    /// Bind the listen address from `settings`
    pub fn bind(settings: TcpFrontend, service: Arc<KvService>) -> Result<Self> {
        let listener = TcpListener::bind(&settings.listen_addr)?;
        listener.set_nonblocking(true)?;

        Ok(Self {
            settings,
            service,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            flag: Arc::clone(&self.shutdown),
        }
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Accept connections until shutdown (blocking)
    ///
    /// Waits for open connections to finish before returning.
    pub fn run(&self) -> Result<()> {
        tracing::info!("TCP server listening on {}", self.local_addr()?);
        let mut workers: Vec<JoinHandle<()>> = Vec::new();

        while !self.shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    workers.retain(|w| !w.is_finished());
                    if let Some(worker) = self.dispatch(stream, addr) {
                        workers.push(worker);
                    }
                }
                Err(e) if e.kind() == IoErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) if e.kind() == IoErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::warn!("accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        tracing::info!("TCP server stopping, waiting for {} connections", workers.len());
        for worker in workers {
            let _ = worker.join();
        }
        Ok(())
    }

    fn dispatch(&self, stream: TcpStream, addr: SocketAddr) -> Option<JoinHandle<()>> {
        if let Err(e) = stream.set_nonblocking(false) {
            tracing::warn!("cannot configure connection from {}: {}", addr, e);
            return None;
        }

        if self.active.load(Ordering::SeqCst) >= self.settings.max_connections {
            tracing::warn!("rejecting {}: connection limit reached", addr);
            let mut writer = BufWriter::new(stream);
            let _ = write_response(&mut writer, &Response::error("too many connections"));
            return None;
        }

        let service = Arc::clone(&self.service);
        let active = Arc::clone(&self.active);
        let (read_ms, write_ms) = (self.settings.read_timeout_ms, self.settings.write_timeout_ms);

        active.fetch_add(1, Ordering::SeqCst);
        let spawned = thread::Builder::new()
            .name(format!("conn-{}", addr))
            .spawn(move || {
                let result = Connection::new(stream, service).and_then(|mut conn| {
                    conn.set_timeouts(read_ms, write_ms)?;
                    conn.handle()
                });
                if let Err(e) = result {
                    tracing::debug!("connection {} ended with error: {}", addr, e);
                }
                active.fetch_sub(1, Ordering::SeqCst);
            });

        match spawned {
            Ok(handle) => Some(handle),
            Err(e) => {
                self.active.fetch_sub(1, Ordering::SeqCst);
                tracing::error!("cannot spawn connection thread for {}: {}", addr, e);
                None
            }
        }
    }

    /// Number of connections currently being served
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}
