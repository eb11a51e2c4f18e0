//! Minimal SNTPv4 client codec (RFC 4330)
//!
//! Only the transmit timestamp of the server answer is used; round-trip
//! compensation is not worth it for second-resolution log entries.

use thiserror_no_std::Error;

pub const NTP_PORT: u16 = 123;
pub const NTP_PACKET_LEN: usize = 48;

/// Servers tried in order
pub const NTP_SERVERS: [&str; 2] = ["pool.ntp.org", "time.nist.gov"];

/// Seconds from 1900-01-01 (NTP epoch) to 1970-01-01 (Unix epoch)
pub const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

const NTP_ERA_SECONDS: u64 = 1 << 32;

const LI_UNSYNCHRONIZED: u8 = 3;
const VERSION: u8 = 4;
const MODE_CLIENT: u8 = 3;
const MODE_SERVER: u8 = 4;

const TRANSMIT_OFFSET: usize = 40;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SntpError {
    #[error("NTP answer is {0} bytes, expected 48")]
    TooShort(usize),
    #[error("NTP answer is not from a server (mode {0})")]
    NotServer(u8),
    #[error("NTP server is not synchronized")]
    Unsynchronized,
    #[error("NTP server sent kiss-of-death")]
    KissOfDeath,
    #[error("NTP answer has no transmit timestamp")]
    NoTimestamp,
}

/// Client request: LI = 0, VN = 4, Mode = 3, everything else zero.
pub fn request_packet() -> [u8; NTP_PACKET_LEN] {
    let mut packet = [0u8; NTP_PACKET_LEN];
    packet[0] = (VERSION << 3) | MODE_CLIENT;
    packet
}

/// Extract the server transmit time as Unix seconds.
pub fn parse_response(packet: &[u8]) -> Result<u64, SntpError> {
    if packet.len() < NTP_PACKET_LEN {
        return Err(SntpError::TooShort(packet.len()));
    }

    let leap = packet[0] >> 6;
    let mode = packet[0] & 0x07;
    let stratum = packet[1];

    if mode != MODE_SERVER {
        return Err(SntpError::NotServer(mode));
    }
    if stratum == 0 {
        return Err(SntpError::KissOfDeath);
    }
    if leap == LI_UNSYNCHRONIZED {
        return Err(SntpError::Unsynchronized);
    }

    let mut secs = [0u8; 4];
    secs.copy_from_slice(&packet[TRANSMIT_OFFSET..TRANSMIT_OFFSET + 4]);
    let secs = u64::from(u32::from_be_bytes(secs));
    if secs == 0 {
        return Err(SntpError::NoTimestamp);
    }

    // Era 0 ends in 2036; anything "before 1970" is read as era 1.
    let ntp = if secs < NTP_UNIX_OFFSET {
        secs + NTP_ERA_SECONDS
    } else {
        secs
    };

    Ok(ntp - NTP_UNIX_OFFSET)
}
