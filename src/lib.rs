//! Quorumcast - group chat broadcast server
//!
//! Clients send newline-framed chat and done lines; every chat line is
//! fanned out to all connected clients, and the group is shut down
//! together once enough clients are done.

pub mod broadcast;
pub mod config;
pub mod connection;
pub mod error;
pub mod protocol;
pub mod server;
pub mod shutdown;
