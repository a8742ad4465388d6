//! Per-connection state.
//!
//! - **`inbound`**: accumulates bytes until newlines close frames
//! - **`outbound`**: queues bytes for non-blocking transmission
//! - **`table`**: slot arena owning every open connection
//!
//! # Lifecycle
//!
//! ```text
//!   accept ──► Open (alive, READABLE)
//!                │  enqueue:  + WRITABLE while output is queued
//!                │  flush:    − WRITABLE once drained
//!                ▼
//!   EOF / I/O error / overlong line / overflow
//!                │
//!                ▼
//!   Released (deregistered, socket and buffers dropped, slot reusable)
//! ```

pub mod inbound;
pub mod outbound;
pub mod table;

use std::net::SocketAddrV4;

use mio::net::TcpStream;
use mio::{Interest, Registry, Token};

use crate::config::Tuning;
use crate::error::CloseReason;
use crate::protocol::Frame;

pub use inbound::{InboundBuffer, ReadOutcome};
pub use outbound::{OutboundBuffer, SendOutcome};
pub use table::{ConnectionTable, SlotId};

/// Whether more input may be waiting after a [`Connection::read_batch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// The read returned data; read again on the next pass.
    More,
    /// The socket has nothing more for now.
    Drained,
    /// The peer closed; release after handling the frames.
    Eof,
}

#[derive(Debug)]
pub struct ReadBatch {
    pub frames: Vec<Frame>,
    pub status: ReadStatus,
}

#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    token: Token,
    peer: SocketAddrV4,
    inbound: InboundBuffer,
    outbound: OutboundBuffer,
    alive: bool,
    done_signaled: bool,
    write_interest: bool,
    registered: bool,
    draining: bool,
}

impl Connection {
    pub(crate) fn new(stream: TcpStream, token: Token, peer: SocketAddrV4, tuning: &Tuning) -> Self {
        Self {
            stream,
            token,
            peer,
            inbound: InboundBuffer::new(tuning.inbound_capacity),
            outbound: OutboundBuffer::new(tuning.outbound_capacity),
            alive: true,
            done_signaled: false,
            write_interest: false,
            registered: true,
            draining: false,
        }
    }

    pub fn slot(&self) -> SlotId {
        self.token.0
    }

    pub fn peer(&self) -> SocketAddrV4 {
        self.peer
    }

    /// Alive connections receive chat broadcasts.
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn has_signaled_done(&self) -> bool {
        self.done_signaled
    }

    /// Records this connection's done signal.
    ///
    /// Returns `true` only the first time, so the caller counts each
    /// connection at most once.
    pub fn mark_done(&mut self) -> bool {
        !std::mem::replace(&mut self.done_signaled, true)
    }

    /// Excludes the connection from further routing ahead of its release.
    pub fn retire(&mut self) {
        self.alive = false;
    }

    pub fn pending_output(&self) -> usize {
        self.outbound.pending()
    }

    /// One read followed by frame extraction.
    pub fn read_batch(&mut self, max_payload: usize) -> Result<ReadBatch, CloseReason> {
        let outcome = self.inbound.fill_from(&mut self.stream)?;
        let frames = self.inbound.take_frames(max_payload);

        if self.inbound.is_full() {
            return Err(CloseReason::ProtocolViolation {
                buffered: self.inbound.len(),
            });
        }

        let status = match outcome {
            ReadOutcome::Data(_) => ReadStatus::More,
            ReadOutcome::WouldBlock => ReadStatus::Drained,
            ReadOutcome::Eof => ReadStatus::Eof,
        };

        Ok(ReadBatch { frames, status })
    }

    /// Queues `bytes` and arms write readiness if the queue was empty.
    pub fn enqueue(&mut self, registry: &Registry, bytes: &[u8]) -> Result<(), CloseReason> {
        if self.outbound.enqueue(bytes)? {
            self.set_write_interest(registry, true)?;
        }

        Ok(())
    }

    /// Whether the connection is registered for write readiness.
    pub fn wants_write(&self) -> bool {
        self.write_interest
    }

    /// Sends as much queued output as the socket accepts.
    ///
    /// Returns the number of bytes transmitted.
    pub fn flush(&mut self, registry: &Registry) -> Result<usize, CloseReason> {
        let (outcome, sent) = self.outbound.flush_to(&mut self.stream)?;

        if outcome == SendOutcome::Drained && self.write_interest {
            self.set_write_interest(registry, false)?;
        }

        Ok(sent)
    }

    /// Switches to write-only interest for the final drain. Once its
    /// output is drained the connection leaves the poll set entirely.
    pub(crate) fn watch_writes_only(&mut self, registry: &Registry) -> Result<(), CloseReason> {
        self.draining = true;
        if self.outbound.is_empty() {
            self.deregister(registry);
            return Ok(());
        }

        registry.reregister(&mut self.stream, self.token, Interest::WRITABLE)?;
        self.write_interest = true;
        Ok(())
    }

    pub(crate) fn deregister(&mut self, registry: &Registry) {
        if !std::mem::replace(&mut self.registered, false) {
            return;
        }
        if let Err(e) = registry.deregister(&mut self.stream) {
            tracing::debug!(slot = self.slot(), error = %e, "Deregister failed");
        }
    }

    fn set_write_interest(&mut self, registry: &Registry, on: bool) -> Result<(), CloseReason> {
        if self.draining && !on {
            self.write_interest = false;
            self.deregister(registry);
            return Ok(());
        }

        let interest = if on {
            Interest::READABLE | Interest::WRITABLE
        } else {
            Interest::READABLE
        };

        registry.reregister(&mut self.stream, self.token, interest)?;
        self.write_interest = on;
        Ok(())
    }
}
