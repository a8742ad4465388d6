//! Connection-local failure reasons.
//!
//! None of these are fatal to the server: the reactor logs the reason and
//! releases the slot. Setup failures (bind, listen, poll creation) are
//! reported through `anyhow` instead and end the process.

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CloseReason {
    /// The peer shut down its side of the stream.
    #[error("peer closed the connection")]
    PeerClosed,

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    /// A line grew to fill the inbound buffer without a terminating newline.
    #[error("line exceeds {buffered} bytes without a newline")]
    ProtocolViolation { buffered: usize },

    /// The outbound buffer could not absorb a message even after compaction.
    #[error("outbound buffer overflow: needed {needed} bytes, {free} free")]
    Backpressure { needed: usize, free: usize },
}

impl CloseReason {
    /// Peer closes are routine; everything else deserves a warning.
    pub fn is_routine(&self) -> bool {
        matches!(self, CloseReason::PeerClosed)
    }
}
