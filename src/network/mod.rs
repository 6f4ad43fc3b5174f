//! Network Module
//!
//! TCP frontend and client.
//!
//! ## Architecture
//! - Single acceptor thread polling for shutdown
//! - One thread per connection, capped by `max_connections`
//! - Commands routed through the service

mod server;
mod connection;
mod client;

pub use server::{Server, ShutdownHandle};
pub use connection::Connection;
pub use client::Client;
