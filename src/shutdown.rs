//! Group shutdown coordination.
//!
//! # States
//!
//! ```text
//!   ┌──────────────┐  done count reaches expected   ┌──────────────┐
//!   │  Collecting  │ ─────────────────────────────► │  Finalizing  │
//!   │              │  grace interval elapsed since  │              │
//!   │              │  first done, count < expected  │              │
//!   └──────────────┘ ─────────────────────────────► └──────┬───────┘
//!                                                          │ done frame enqueued
//!                                                          │ to every open connection,
//!                                                          │ bounded drain, close all
//!                                                          ▼
//!                                                   ┌──────────────┐
//!                                                   │  Terminated  │
//!                                                   └──────────────┘
//! ```
//!
//! Finalization runs at most once: [`ShutdownCoordinator::finalize`] does
//! nothing unless the coordinator is still collecting.

use std::io::ErrorKind;
use std::time::{Duration, Instant};

use mio::{Events, Poll};

use crate::broadcast::{Audience, fan_out};
use crate::connection::{ConnectionTable, SlotId};
use crate::error::CloseReason;
use crate::protocol::DONE_FRAME;

/// Which rule ended the collection phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Every expected client signalled done.
    Quorum,
    /// The grace interval ran out before quorum.
    GraceExpired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Collecting,
    Finalizing(Trigger),
    Terminated(Trigger),
}

/// Outcome of a completed shutdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownSummary {
    pub trigger: Trigger,
    pub done_count: usize,
    pub expected: usize,
    /// Connections the done frame was enqueued to.
    pub notified: usize,
    /// Connections that still had queued output when the drain gave up.
    pub undelivered: usize,
}

#[derive(Debug)]
pub struct ShutdownCoordinator {
    expected: usize,
    grace: Duration,
    done_count: usize,
    first_done_at: Option<Instant>,
    phase: Phase,
}

impl ShutdownCoordinator {
    pub fn new(expected: usize, grace: Duration) -> Self {
        Self {
            expected,
            grace,
            done_count: 0,
            first_done_at: None,
            phase: Phase::Collecting,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_collecting(&self) -> bool {
        self.phase == Phase::Collecting
    }

    pub fn done_count(&self) -> usize {
        self.done_count
    }

    pub fn first_done_at(&self) -> Option<Instant> {
        self.first_done_at
    }

    /// Counts one distinct done signal received at `now`.
    ///
    /// Callers pass each connection through here at most once (see
    /// `Connection::mark_done`). Returns [`Trigger::Quorum`] when this
    /// signal completes the group.
    pub fn record_done(&mut self, now: Instant) -> Option<Trigger> {
        if !self.is_collecting() {
            return None;
        }

        self.done_count += 1;
        self.first_done_at.get_or_insert(now);

        tracing::info!(done = self.done_count, expected = self.expected, "Done signal received");

        (self.done_count >= self.expected).then_some(Trigger::Quorum)
    }

    /// Fires once the grace interval has passed since the first done
    /// signal without reaching quorum.
    pub fn check_grace(&self, now: Instant) -> Option<Trigger> {
        if !self.is_collecting() || self.done_count >= self.expected {
            return None;
        }

        let first = self.first_done_at?;
        (now.saturating_duration_since(first) >= self.grace).then_some(Trigger::GraceExpired)
    }

    /// Sends the done frame to every open connection, drains output for
    /// at most `drain_timeout` per wait, then closes every connection.
    ///
    /// Returns `None` if finalization already happened.
    pub fn finalize(
        &mut self,
        trigger: Trigger,
        table: &mut ConnectionTable,
        poll: &mut Poll,
        events: &mut Events,
        drain_timeout: Duration,
    ) -> Option<ShutdownSummary> {
        if !self.is_collecting() {
            return None;
        }
        self.phase = Phase::Finalizing(trigger);

        match trigger {
            Trigger::Quorum => tracing::info!(
                done = self.done_count,
                expected = self.expected,
                "Quorum reached, broadcasting shutdown"
            ),
            Trigger::GraceExpired => tracing::warn!(
                done = self.done_count,
                expected = self.expected,
                grace_ms = self.grace.as_millis() as u64,
                "Grace period expired, forcing shutdown"
            ),
        }

        let fanout = fan_out(table, poll.registry(), &DONE_FRAME, Audience::Open);
        tracing::info!(
            notified = fanout.delivered,
            dropped = fanout.dropped,
            "Shutdown frame enqueued"
        );

        let undelivered = drain(table, poll, events, drain_timeout);
        let closed = table.close_all(poll.registry());
        tracing::info!(closed, undelivered, "All connections closed");

        self.phase = Phase::Terminated(trigger);

        Some(ShutdownSummary {
            trigger,
            done_count: self.done_count,
            expected: self.expected,
            notified: fanout.delivered,
            undelivered,
        })
    }
}

/// Flushes every pending buffer until all are empty or a wait for write
/// readiness times out.
///
/// Returns how many connections still had output queued at the end.
fn drain(table: &mut ConnectionTable, poll: &mut Poll, events: &mut Events, timeout: Duration) -> usize {
    let mut failed: Vec<(SlotId, CloseReason)> = Vec::new();

    for (slot, conn) in table.iter_mut() {
        if let Err(reason) = conn.watch_writes_only(poll.registry()) {
            failed.push((slot, reason));
        }
    }

    loop {
        let mut sent = 0;

        for (slot, conn) in table.iter_mut() {
            if conn.pending_output() == 0 {
                continue;
            }
            match conn.flush(poll.registry()) {
                Ok(n) => sent += n,
                Err(reason) => failed.push((slot, reason)),
            }
        }

        for (slot, reason) in failed.drain(..) {
            table.release(poll.registry(), slot, &reason);
        }

        let pending = table.iter().filter(|(_, c)| c.pending_output() > 0).count();
        if pending == 0 {
            tracing::debug!("Drain complete");
            return 0;
        }

        match poll.poll(events, Some(timeout)) {
            Ok(()) if events.is_empty() => {
                tracing::warn!(pending, sent, "Drain timed out");
                return pending;
            }
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => {
                tracing::warn!(error = %e, pending, "Readiness wait failed during drain");
                return pending;
            }
        }
    }
}
