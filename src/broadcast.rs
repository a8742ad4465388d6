//! Fan-out of encoded messages into connection outbound buffers.

use mio::Registry;

use crate::connection::{ConnectionTable, SlotId};
use crate::error::CloseReason;
use crate::protocol::chat_envelope;

/// Which connections a fan-out targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// Connections still taking part in chat routing.
    Alive,
    /// Every open connection, alive or not.
    Open,
}

/// Tally of a single fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fanout {
    pub delivered: usize,
    pub dropped: usize,
}

/// Enqueues `bytes` into every connection in `audience`.
///
/// A connection that cannot absorb the bytes is released on the spot; the
/// others are unaffected and nothing is retried.
pub fn fan_out(table: &mut ConnectionTable, registry: &Registry, bytes: &[u8], audience: Audience) -> Fanout {
    let mut fanout = Fanout::default();
    let mut victims: Vec<(SlotId, CloseReason)> = Vec::new();

    for (slot, conn) in table.iter_mut() {
        if audience == Audience::Alive && !conn.is_alive() {
            continue;
        }

        match conn.enqueue(registry, bytes) {
            Ok(()) => fanout.delivered += 1,
            Err(reason) => {
                conn.retire();
                victims.push((slot, reason));
            }
        }
    }

    fanout.dropped = victims.len();
    for (slot, reason) in victims {
        table.release(registry, slot, &reason);
    }

    fanout
}

/// Broadcasts a chat payload from `sender` to every alive connection,
/// the sender included.
///
/// Returns `None` if `sender` is no longer in the table.
pub fn route_chat(table: &mut ConnectionTable, registry: &Registry, sender: SlotId, payload: &[u8]) -> Option<Fanout> {
    let peer = table.get(sender)?.peer();
    let envelope = chat_envelope(peer, payload);

    let fanout = fan_out(table, registry, &envelope, Audience::Alive);
    tracing::trace!(
        slot = sender,
        peer = %peer,
        bytes = envelope.len(),
        delivered = fanout.delivered,
        dropped = fanout.dropped,
        "Chat broadcast"
    );

    Some(fanout)
}
