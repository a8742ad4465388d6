//! The broadcast server.
//!
//! - **`listener`**: drains pending accepts into the connection table
//! - **`reactor`**: the single-threaded readiness loop
//!
//! # Example
//!
//! ```ignore
//! use quorumcast::config::Config;
//! use quorumcast::server::Server;
//!
//! fn main() -> anyhow::Result<()> {
//!     let cfg = Config::load(9000, 3)?;
//!     let summary = Server::bind(&cfg)?.run()?;
//!     println!("shut down by {:?}", summary.trigger);
//!     Ok(())
//! }
//! ```

pub mod listener;
pub mod reactor;

use std::net::SocketAddr;

use anyhow::Context;
use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token};

use crate::config::{Config, Tuning};
use crate::connection::ConnectionTable;
use crate::shutdown::ShutdownCoordinator;

/// Poll token reserved for the listening socket; slot ids never reach it.
pub const LISTENER: Token = Token(usize::MAX);

const EVENT_CAPACITY: usize = 1024;

#[derive(Debug)]
pub struct Server {
    poll: Poll,
    events: Events,
    listener: TcpListener,
    local_addr: SocketAddr,
    table: ConnectionTable,
    coordinator: ShutdownCoordinator,
    tuning: Tuning,
}

impl Server {
    /// Creates the poll instance and binds the listening socket.
    ///
    /// Every failure here is a setup failure and fatal to the caller.
    pub fn bind(cfg: &Config) -> anyhow::Result<Self> {
        cfg.validate()?;

        let poll = Poll::new().context("failed to create poll instance")?;
        let mut listener = TcpListener::bind(cfg.listen_addr)
            .with_context(|| format!("failed to bind {}", cfg.listen_addr))?;
        let local_addr = listener.local_addr().context("failed to read listener address")?;

        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)
            .context("failed to register listener")?;

        tracing::info!(
            addr = %local_addr,
            expected = cfg.expected_clients,
            max_connections = cfg.tuning.max_connections,
            "Listening"
        );

        Ok(Self {
            poll,
            events: Events::with_capacity(EVENT_CAPACITY),
            listener,
            local_addr,
            table: ConnectionTable::new(cfg.tuning.max_connections),
            coordinator: ShutdownCoordinator::new(cfg.expected_clients, cfg.tuning.grace_period),
            tuning: cfg.tuning.clone(),
        })
    }

    /// Address actually bound, useful when the configured port is 0.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}
