use std::io;
use std::net::SocketAddrV4;

use mio::net::TcpStream;
use mio::{Interest, Registry, Token};
use slab::Slab;

use super::Connection;
use crate::config::Tuning;
use crate::error::CloseReason;

/// Stable identifier of a table slot; doubles as the connection's poll token.
pub type SlotId = usize;

/// Fixed-capacity arena of open connections.
///
/// Slot ids come from the arena's free list, never from socket handles, so
/// a slot is handed out again only after [`ConnectionTable::release`].
#[derive(Debug)]
pub struct ConnectionTable {
    slots: Slab<Connection>,
    max_connections: usize,
}

impl ConnectionTable {
    pub fn new(max_connections: usize) -> Self {
        Self {
            slots: Slab::with_capacity(max_connections.min(1024)),
            max_connections,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() >= self.max_connections
    }

    pub fn contains(&self, slot: SlotId) -> bool {
        self.slots.contains(slot)
    }

    pub fn get(&self, slot: SlotId) -> Option<&Connection> {
        self.slots.get(slot)
    }

    pub fn get_mut(&mut self, slot: SlotId) -> Option<&mut Connection> {
        self.slots.get_mut(slot)
    }

    /// Registers `stream` for read readiness and stores it in a free slot.
    ///
    /// The caller checks [`ConnectionTable::is_full`] first; on a
    /// registration failure the stream is dropped and no slot is taken.
    pub fn insert(
        &mut self,
        registry: &Registry,
        mut stream: TcpStream,
        peer: SocketAddrV4,
        tuning: &Tuning,
    ) -> io::Result<SlotId> {
        let entry = self.slots.vacant_entry();
        let token = Token(entry.key());

        registry.register(&mut stream, token, Interest::READABLE)?;
        entry.insert(Connection::new(stream, token, peer, tuning));

        Ok(token.0)
    }

    /// Removes the connection in `slot`, deregistering and closing it.
    ///
    /// Returns `None` if the slot was already free, so a second release of
    /// the same slot is a no-op.
    pub fn release(&mut self, registry: &Registry, slot: SlotId, reason: &CloseReason) -> Option<Connection> {
        let mut conn = self.slots.try_remove(slot)?;
        conn.retire();
        conn.deregister(registry);

        if reason.is_routine() {
            tracing::debug!(slot, peer = %conn.peer(), reason = %reason, "Connection released");
        } else {
            tracing::warn!(slot, peer = %conn.peer(), reason = %reason, "Connection dropped");
        }

        Some(conn)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &Connection)> {
        self.slots.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SlotId, &mut Connection)> {
        self.slots.iter_mut()
    }

    /// Total bytes queued across all connections.
    pub fn pending_output(&self) -> usize {
        self.slots.iter().map(|(_, c)| c.pending_output()).sum()
    }

    /// Deregisters and drops every connection.
    pub fn close_all(&mut self, registry: &Registry) -> usize {
        let closed = self.slots.len();
        for (_, conn) in self.slots.iter_mut() {
            conn.retire();
            conn.deregister(registry);
        }
        self.slots.clear();
        closed
    }
}
