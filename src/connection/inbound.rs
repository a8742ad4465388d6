use std::io::{self, ErrorKind, Read};

use crate::protocol::{Frame, parse_frame};

/// Result of a single non-blocking read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// This many bytes were appended; more may be waiting.
    Data(usize),
    /// Nothing available right now.
    WouldBlock,
    /// The peer closed its write side.
    Eof,
}

/// Fixed-capacity accumulation buffer for newline-framed input.
///
/// `buf[..len]` holds bytes read but not yet consumed as frames. After
/// every call to [`InboundBuffer::take_frames`] that region starts at
/// offset 0 and contains at most one partial line.
#[derive(Debug)]
pub struct InboundBuffer {
    buf: Box<[u8]>,
    len: usize,
}

impl InboundBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// A full buffer after frame extraction means a line longer than the
    /// buffer itself.
    pub fn is_full(&self) -> bool {
        self.len == self.buf.len()
    }

    /// Performs one read into the free tail of the buffer.
    ///
    /// Interrupted reads are retried; `WouldBlock` is reported as an
    /// outcome rather than an error. Must not be called on a full buffer,
    /// since a zero-length read is indistinguishable from EOF.
    pub fn fill_from<R: Read>(&mut self, src: &mut R) -> io::Result<ReadOutcome> {
        debug_assert!(!self.is_full(), "read into a full inbound buffer");

        loop {
            match src.read(&mut self.buf[self.len..]) {
                Ok(0) => return Ok(ReadOutcome::Eof),
                Ok(n) => {
                    self.len += n;
                    return Ok(ReadOutcome::Data(n));
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(ReadOutcome::WouldBlock),
                Err(e) => return Err(e),
            }
        }
    }

    /// Extracts every complete line and moves the trailing partial line
    /// to the front of the buffer.
    pub fn take_frames(&mut self, max_payload: usize) -> Vec<Frame> {
        let mut frames = Vec::new();
        let mut processed = 0;

        while let Ok((frame, consumed)) = parse_frame(&self.buf[processed..self.len], max_payload) {
            frames.push(frame);
            processed += consumed;
        }

        if processed > 0 {
            self.buf.copy_within(processed..self.len, 0);
            self.len -= processed;
        }

        frames
    }

    /// Bytes of the pending partial line.
    pub fn pending(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}
