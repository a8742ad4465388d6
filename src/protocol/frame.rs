use bytes::Bytes;

use super::{NEWLINE, TYPE_CHAT, TYPE_DONE};

/// One complete inbound line, classified by its leading type byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Chat message; payload excludes the newline and is already truncated.
    Chat(Bytes),
    /// The sender has finished.
    Done,
    /// Any other leading byte, including an empty line. Consumed and ignored.
    Unknown(u8),
}

#[derive(Debug, PartialEq, Eq)]
pub enum FrameError {
    /// No newline yet; wait for more bytes.
    Incomplete,
}

/// Parses the first line in `buf`.
///
/// Returns the frame and the number of bytes it occupied, newline
/// included, so the caller can advance past it.
pub fn parse_frame(buf: &[u8], max_payload: usize) -> Result<(Frame, usize), FrameError> {
    let end = buf
        .iter()
        .position(|&b| b == NEWLINE)
        .ok_or(FrameError::Incomplete)?;
    let consumed = end + 1;

    let frame = match buf[0] {
        TYPE_CHAT => {
            let payload = &buf[1..end];
            let len = payload.len().min(max_payload);
            Frame::Chat(Bytes::copy_from_slice(&payload[..len]))
        }
        TYPE_DONE => Frame::Done,
        other => Frame::Unknown(other),
    };

    Ok((frame, consumed))
}
