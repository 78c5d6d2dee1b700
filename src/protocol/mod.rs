// ABOUTME: SNTP wire protocol module
// ABOUTME: Re-exports the 48-byte packet codec

/// Fixed 48-byte request/reply packet codec
pub mod packet;

pub use packet::{decode_reply, encode_request, NTP_PORT, PACKET_SIZE};
