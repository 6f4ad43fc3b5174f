//! TCP frontend
//!
//! Settings for the binary-protocol server and the glue that runs its
//! blocking accept loop under the async shutdown signal.

use std::future::Future;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{KvError, Result};
use crate::network::Server;
use crate::service::KvService;

/// Binary-protocol frontend bound to `listen_addr`
#[derive(Debug, Clone)]
pub struct TcpFrontend {
    pub listen_addr: String,

    /// Connections served at once; further clients get an error response
    pub max_connections: usize,

    /// Read timeout per connection in milliseconds (0 = none)
    pub read_timeout_ms: u64,

    /// Write timeout per connection in milliseconds (0 = none)
    pub write_timeout_ms: u64,
}

impl TcpFrontend {
    pub fn new(config: &Config) -> Self {
        Self {
            listen_addr: config.listen_addr.clone(),
            max_connections: config.max_connections,
            read_timeout_ms: config.read_timeout_ms,
            write_timeout_ms: config.write_timeout_ms,
        }
    }

    /// Serve until `shutdown` resolves, then wait for open connections
    pub async fn serve<S>(self, service: Arc<KvService>, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let server = Server::bind(self, service)?;
        let handle = server.shutdown_handle();
        tokio::spawn(async move {
            shutdown.await;
            handle.shutdown();
        });

        tokio::task::spawn_blocking(move || server.run())
            .await
            .map_err(|e| KvError::Io(std::io::Error::other(e)))?
    }
}
