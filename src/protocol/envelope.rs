use std::net::{Ipv4Addr, SocketAddrV4};

use bytes::{BufMut, Bytes, BytesMut};

use super::{NEWLINE, TYPE_CHAT, TYPE_DONE};

/// Type byte + IPv4 address + port.
pub const ENVELOPE_HEADER_LEN: usize = 1 + 4 + 2;

/// Sent once to every open connection when the group shuts down.
pub const DONE_FRAME: [u8; 2] = [TYPE_DONE, NEWLINE];

/// Builds the broadcast envelope for a chat line from `sender`.
///
/// Address and port go out in network byte order; the payload follows
/// unframed.
pub fn chat_envelope(sender: SocketAddrV4, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(ENVELOPE_HEADER_LEN + payload.len());

    buf.put_u8(TYPE_CHAT);
    buf.put_slice(&sender.ip().octets());
    buf.put_u16(sender.port());
    buf.put_slice(payload);

    buf.freeze()
}

/// Splits a single chat envelope into sender and payload.
///
/// `buf` must hold exactly one envelope; the payload is whatever follows
/// the header.
pub fn split_envelope(buf: &[u8]) -> Option<(SocketAddrV4, &[u8])> {
    if buf.len() < ENVELOPE_HEADER_LEN || buf[0] != TYPE_CHAT {
        return None;
    }

    let ip = Ipv4Addr::new(buf[1], buf[2], buf[3], buf[4]);
    let port = u16::from_be_bytes([buf[5], buf[6]]);

    Some((SocketAddrV4::new(ip, port), &buf[ENVELOPE_HEADER_LEN..]))
}
