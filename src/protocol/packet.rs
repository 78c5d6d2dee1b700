// ABOUTME: SNTP packet codec
// ABOUTME: Encodes the fixed 48-byte request and decodes reply transmit timestamps

use crate::error::Error;
use crate::Result;

/// Size of an SNTP request/reply packet in bytes.
pub const PACKET_SIZE: usize = 48;

/// Default NTP port.
pub const NTP_PORT: u16 = 123;

/// First request byte: leap indicator 0, version 3, mode 3 (client).
pub const REQUEST_HEADER: u8 = 0x1B;

/// Seconds between the NTP prime epoch (1900-01-01) and the Unix epoch (1970-01-01).
pub const NTP_UNIX_EPOCH_DELTA: f64 = 2_208_988_800.0;

/// Byte offset of the transmit timestamp within a reply.
const TRANSMIT_TIMESTAMP_OFFSET: usize = 40;

/// Build the fixed 48-byte client request.
///
/// Byte 0 carries the version/mode marker, every other byte is zero.
pub fn encode_request() -> [u8; PACKET_SIZE] {
    let mut request = [0u8; PACKET_SIZE];
    request[0] = REQUEST_HEADER;
    request
}

/// Decode a server reply into a Unix-epoch timestamp in seconds.
///
/// Reads the 64-bit fixed-point transmit timestamp (two 32-bit big-endian
/// words at byte offset 40) and rebases it from the 1900 epoch to the Unix
/// epoch. Fails with [`Error::MalformedReply`] if the reply is shorter than
/// the fixed packet size.
pub fn decode_reply(reply: &[u8]) -> Result<f64> {
    if reply.len() < PACKET_SIZE {
        return Err(Error::MalformedReply(format!(
            "reply too short: {} bytes, expected at least {}",
            reply.len(),
            PACKET_SIZE
        )));
    }

    let seconds = read_u32_be(reply, TRANSMIT_TIMESTAMP_OFFSET);
    let fraction = read_u32_be(reply, TRANSMIT_TIMESTAMP_OFFSET + 4);

    let ntp_seconds = seconds as f64 + fraction as f64 / (1u64 << 32) as f64;
    Ok(ntp_seconds - NTP_UNIX_EPOCH_DELTA)
}

fn read_u32_be(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([buf[offset], buf[offset + 1], buf[offset + 2], buf[offset + 3]])
}
