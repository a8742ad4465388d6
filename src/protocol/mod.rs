//! Wire protocol.
//!
//! Clients speak newline-terminated lines; the server answers with
//! fixed-header broadcast envelopes.
//!
//! - **`frame`**: splits inbound bytes into typed frames
//! - **`envelope`**: encodes outbound chat envelopes and the shutdown frame
//!
//! # Inbound (client → server)
//!
//! ```text
//! ┌──────────┬──────────────────────┬──────┐
//! │ type (1) │ payload (0..N bytes) │ '\n' │
//! └──────────┴──────────────────────┴──────┘
//!   0x00 = chat, payload is the message (truncated to max_payload)
//!   0x01 = done, payload ignored; counted once per connection
//! ```
//!
//! # Outbound (server → client)
//!
//! ```text
//! chat:  ┌──────┬──────────────┬──────────────┬─────────┐
//!        │ 0x00 │ IPv4 (4, BE) │ port (2, BE) │ payload │   no delimiter
//!        └──────┴──────────────┴──────────────┴─────────┘
//! done:  ┌──────┬──────┐
//!        │ 0x01 │ 0x0A │
//!        └──────┴──────┘
//! ```
//!
//! Chat envelopes carry no length and no terminator. A receiver can only
//! recover the payload length as `bytes_read - 7`, which holds when its
//! reads happen to line up with envelopes.

pub mod envelope;
pub mod frame;

pub use envelope::{DONE_FRAME, ENVELOPE_HEADER_LEN, chat_envelope, split_envelope};
pub use frame::{Frame, FrameError, parse_frame};

/// Type tag of a chat line and of a chat envelope.
pub const TYPE_CHAT: u8 = 0x00;

/// Type tag of a done signal and of the shutdown frame.
pub const TYPE_DONE: u8 = 0x01;

/// Line terminator for inbound frames.
pub const NEWLINE: u8 = b'\n';
