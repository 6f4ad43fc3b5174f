//! Frontend Module
//!
//! Network adapters translating requests into service calls. The kind is
//! chosen by configuration from a closed set.

pub mod rest;
pub mod tcp;

use std::future::Future;
use std::sync::Arc;

use crate::config::{Config, FrontendKind};
use crate::error::Result;
use crate::service::KvService;

pub use rest::RestFrontend;
pub use tcp::TcpFrontend;

/// A configured frontend, ready to start
pub enum Frontend {
    Rest(RestFrontend),
    Tcp(TcpFrontend),
}

impl Frontend {
    /// Pick the frontend named by `config.frontend_kind`
    pub fn new(config: &Config) -> Self {
        match config.frontend_kind {
            FrontendKind::Rest => Frontend::Rest(RestFrontend::new(config.listen_addr.clone())),
            FrontendKind::Tcp => Frontend::Tcp(TcpFrontend::new(config)),
        }
    }

    pub fn kind(&self) -> FrontendKind {
        match self {
            Frontend::Rest(_) => FrontendKind::Rest,
            Frontend::Tcp(_) => FrontendKind::Tcp,
        }
    }

    /// Serve requests until `shutdown` resolves
    pub async fn start<S>(self, service: Arc<KvService>, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        match self {
            Frontend::Rest(rest) => rest.serve(service, shutdown).await,
            Frontend::Tcp(tcp) => tcp.serve(service, shutdown).await,
        }
    }
}
