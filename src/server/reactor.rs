//! The event loop.
//!
//! Each iteration waits for readiness with a short timeout, checks the
//! grace timer, then services sockets in a fixed order:
//!
//! ```text
//!   poll(timeout) ──► grace check ──► flush writable ──► accept ──► read/frame/route
//!        ▲                                                               │
//!        └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each connection gets at most one read per iteration. mio reports edges
//! only, so a connection whose last read returned data is read again on the
//! next iteration without a new event, and the wait does not block while any
//! such connection is pending.
//!
//! Quorum or grace expiry hands control to the shutdown coordinator, which
//! drains and closes everything; `run` then returns.

use std::io::ErrorKind;
use std::time::{Duration, Instant};

use anyhow::Context;

use super::{LISTENER, Server, listener};
use crate::broadcast;
use crate::connection::{ReadStatus, SlotId};
use crate::error::CloseReason;
use crate::protocol::Frame;
use crate::shutdown::{ShutdownSummary, Trigger};

/// What one read left behind on a connection.
enum Serviced {
    /// Nothing more to read until the next readiness event, or the
    /// connection is gone.
    Idle,
    /// The read returned data; read again next iteration.
    MoreInput,
    /// A done signal completed the group.
    Finished(Trigger),
}

impl Server {
    /// Runs until the group shuts down.
    ///
    /// Only a failure of the readiness wait itself is returned as an error;
    /// per-connection failures just release that connection.
    pub fn run(mut self) -> anyhow::Result<ShutdownSummary> {
        let mut readable: Vec<SlotId> = Vec::new();
        let mut writable: Vec<SlotId> = Vec::new();
        let mut read_pending: Vec<SlotId> = Vec::new();

        loop {
            let timeout = if read_pending.is_empty() {
                self.tuning.poll_interval
            } else {
                Duration::ZERO
            };

            match self.poll.poll(&mut self.events, Some(timeout)) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).context("readiness wait failed"),
            }

            if let Some(trigger) = self.coordinator.check_grace(Instant::now()) {
                return self.finalize(trigger);
            }

            if self.events.is_empty() && read_pending.is_empty() {
                continue;
            }

            readable.clear();
            writable.clear();
            readable.append(&mut read_pending);
            let mut accept_ready = false;

            for event in self.events.iter() {
                let token = event.token();
                if token == LISTENER {
                    accept_ready = true;
                    continue;
                }
                if event.is_writable() {
                    writable.push(token.0);
                }
                if event.is_readable() || event.is_read_closed() || event.is_error() {
                    readable.push(token.0);
                }
            }
            readable.sort_unstable();
            readable.dedup();

            for &slot in &writable {
                self.service_writable(slot);
            }

            if accept_ready {
                listener::accept_pending(&self.listener, &mut self.table, self.poll.registry(), &self.tuning);
            }

            for &slot in &readable {
                match self.service_readable(slot) {
                    Serviced::Idle => {}
                    Serviced::MoreInput => read_pending.push(slot),
                    Serviced::Finished(trigger) => return self.finalize(trigger),
                }
            }
        }
    }

    fn service_writable(&mut self, slot: SlotId) {
        let registry = self.poll.registry();
        let Some(conn) = self.table.get_mut(slot) else {
            return;
        };

        if let Err(reason) = conn.flush(registry) {
            self.table.release(registry, slot, &reason);
        }
    }

    /// Performs one read and handles the frames it completed.
    ///
    /// Frames after a done signal that completes the group are not
    /// processed.
    fn service_readable(&mut self, slot: SlotId) -> Serviced {
        let registry = self.poll.registry();
        let Some(conn) = self.table.get_mut(slot) else {
            return Serviced::Idle;
        };

        let batch = match conn.read_batch(self.tuning.max_payload) {
            Ok(batch) => batch,
            Err(reason) => {
                self.table.release(registry, slot, &reason);
                return Serviced::Idle;
            }
        };

        for frame in batch.frames {
            match frame {
                Frame::Chat(payload) => {
                    broadcast::route_chat(&mut self.table, registry, slot, &payload);
                    // the sender itself may have overflowed during the fan-out
                    if !self.table.contains(slot) {
                        return Serviced::Idle;
                    }
                }
                Frame::Done => {
                    let Some(conn) = self.table.get_mut(slot) else {
                        return Serviced::Idle;
                    };
                    if !conn.mark_done() {
                        tracing::debug!(slot, "Repeated done signal ignored");
                        continue;
                    }
                    tracing::info!(slot, peer = %conn.peer(), "Client finished");
                    if let Some(trigger) = self.coordinator.record_done(Instant::now()) {
                        return Serviced::Finished(trigger);
                    }
                }
                Frame::Unknown(tag) => {
                    tracing::debug!(slot, tag, "Ignoring frame with unknown type");
                }
            }
        }

        match batch.status {
            ReadStatus::More => Serviced::MoreInput,
            ReadStatus::Drained => Serviced::Idle,
            ReadStatus::Eof => {
                self.table.release(registry, slot, &CloseReason::PeerClosed);
                Serviced::Idle
            }
        }
    }

    /// Stops accepting, then hands everything to the coordinator.
    fn finalize(mut self, trigger: Trigger) -> anyhow::Result<ShutdownSummary> {
        if let Err(e) = self.poll.registry().deregister(&mut self.listener) {
            tracing::debug!(error = %e, "Failed to deregister listener");
        }

        let summary = self
            .coordinator
            .finalize(
                trigger,
                &mut self.table,
                &mut self.poll,
                &mut self.events,
                self.tuning.drain_timeout,
            )
            .context("shutdown already finalized")?;

        tracing::info!(
            trigger = ?summary.trigger,
            done = summary.done_count,
            expected = summary.expected,
            "Server shut down"
        );

        // listener and poll close on drop
        Ok(summary)
    }
}
