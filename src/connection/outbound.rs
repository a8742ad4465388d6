use std::io::{self, ErrorKind, Write};

use crate::error::CloseReason;

/// Result of a send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Everything queued has been transmitted; offsets are back at 0.
    Drained,
    /// Some bytes remain queued.
    Pending,
}

/// Per-connection FIFO of bytes awaiting transmission.
///
/// Bytes `[head, tail)` are queued, where `tail == data.len()`. Appends go
/// at `tail`, sends consume from `head`. Space before `head` is reclaimed
/// by compaction only when an append would not otherwise fit, and
/// `tail` never exceeds `capacity`.
#[derive(Debug)]
pub struct OutboundBuffer {
    data: Vec<u8>,
    head: usize,
    capacity: usize,
}

impl OutboundBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: Vec::new(),
            head: 0,
            capacity,
        }
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn tail(&self) -> usize {
        self.data.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes queued but not yet sent.
    pub fn pending(&self) -> usize {
        self.tail() - self.head
    }

    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }

    /// Appends `bytes` to the queue.
    ///
    /// Returns `true` if the buffer was empty beforehand, i.e. the caller
    /// needs to start watching for write readiness. Fails with
    /// [`CloseReason::Backpressure`] when the bytes don't fit even after
    /// compaction; the buffer is left untouched apart from the compaction.
    pub fn enqueue(&mut self, bytes: &[u8]) -> Result<bool, CloseReason> {
        let was_empty = self.is_empty();

        if self.free() < bytes.len() && self.head > 0 {
            self.compact();
        }

        let free = self.free();
        if free < bytes.len() {
            return Err(CloseReason::Backpressure {
                needed: bytes.len(),
                free,
            });
        }

        self.data.extend_from_slice(bytes);
        Ok(was_empty)
    }

    /// One write of the queued region to `dst`.
    pub fn send_once<W: Write>(&mut self, dst: &mut W) -> io::Result<SendOutcome> {
        if self.is_empty() {
            self.reset();
            return Ok(SendOutcome::Drained);
        }

        let n = loop {
            match dst.write(&self.data[self.head..]) {
                Ok(0) => return Err(io::Error::from(ErrorKind::WriteZero)),
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(SendOutcome::Pending),
                Err(e) => return Err(e),
            }
        };

        self.head += n;
        if self.is_empty() {
            self.reset();
            Ok(SendOutcome::Drained)
        } else {
            Ok(SendOutcome::Pending)
        }
    }

    /// Sends until the queue is empty or the writer would block.
    ///
    /// Returns the outcome and the number of bytes transmitted.
    pub fn flush_to<W: Write>(&mut self, dst: &mut W) -> io::Result<(SendOutcome, usize)> {
        let mut sent = 0;

        loop {
            let before = self.pending();
            let outcome = self.send_once(dst)?;
            let progress = before - self.pending();
            sent += progress;

            if outcome == SendOutcome::Drained || progress == 0 {
                return Ok((outcome, sent));
            }
        }
    }

    fn free(&self) -> usize {
        self.capacity - self.tail()
    }

    fn compact(&mut self) {
        self.data.drain(..self.head);
        self.head = 0;
    }

    fn reset(&mut self) {
        self.data.clear();
        self.head = 0;
    }
}
