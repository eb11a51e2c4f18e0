//! Tag identifiers as read from ISO 14443A cards
//!
//! A UID is 4, 7 or 10 bytes long (single, double and triple size). On the
//! wire it always travels as an uppercase hex string with two digits per byte
//! and no separators, e.g. `0AB304FF`.

use core::fmt::{self, Write as _};

use thiserror_no_std::Error;

/// Longest UID defined by ISO 14443-3 (triple size)
pub const MAX_UID_LEN: usize = 10;

/// Length of the hex rendering of the longest UID
pub const UID_HEX_LEN: usize = MAX_UID_LEN * 2;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UidError {
    #[error("UID must be 4, 7 or 10 bytes, got {0}")]
    InvalidLength(usize),
    #[error("UID is not a hex string")]
    InvalidHex,
}

/// Unique identifier of an RFID tag
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Uid {
    bytes: [u8; MAX_UID_LEN],
    len: u8,
}

impl Uid {
    /// Build a UID from raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, UidError> {
        match bytes.len() {
            4 | 7 | 10 => {}
            n => return Err(UidError::InvalidLength(n)),
        }

        let mut buf = [0u8; MAX_UID_LEN];
        buf[..bytes.len()].copy_from_slice(bytes);

        Ok(Self {
            bytes: buf,
            len: bytes.len() as u8,
        })
    }

    /// Parse a hex rendering such as `0ab304ff` (case-insensitive).
    pub fn parse_hex(hex: &str) -> Result<Self, UidError> {
        let hex = hex.trim();
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) || hex.len() % 2 != 0 {
            return Err(UidError::InvalidHex);
        }

        let count = hex.len() / 2;
        if count > MAX_UID_LEN {
            return Err(UidError::InvalidLength(count));
        }

        let mut buf = [0u8; MAX_UID_LEN];
        for (i, byte) in buf.iter_mut().take(count).enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| UidError::InvalidHex)?;
        }

        Self::from_bytes(&buf[..count])
    }

    /// The raw UID bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Uppercase hex rendering used in URLs and log entries.
    pub fn to_hex(&self) -> heapless::String<UID_HEX_LEN> {
        let mut out = heapless::String::new();
        // Capacity is exactly two characters per byte of the longest UID.
        let _ = write!(out, "{}", self);
        out
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.as_bytes() {
            write!(f, "{:02X}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uid({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_is_uppercase_and_zero_padded() {
        let uid = Uid::from_bytes(&[0x0A, 0xB3, 0x04, 0xFF]).unwrap();
        assert_eq!(uid.to_hex().as_str(), "0AB304FF");
    }

    #[test]
    fn test_seven_byte_uid() {
        let uid = Uid::from_bytes(&[0x04, 0x1C, 0x5A, 0x02, 0x8B, 0x61, 0x80]).unwrap();
        assert_eq!(uid.as_bytes().len(), 7);
        assert_eq!(uid.to_hex().as_str(), "041C5A028B6180");
    }

    #[test]
    fn test_rejects_unsupported_lengths() {
        assert_eq!(Uid::from_bytes(&[]), Err(UidError::InvalidLength(0)));
        assert_eq!(
            Uid::from_bytes(&[1, 2, 3, 4, 5]),
            Err(UidError::InvalidLength(5))
        );
    }

    #[test]
    fn test_parse_hex_accepts_lowercase() {
        let uid = Uid::parse_hex("deadbeef\n").unwrap();
        assert_eq!(uid.as_bytes(), &[0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(uid.to_hex().as_str(), "DEADBEEF");
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert_eq!(Uid::parse_hex("0AB"), Err(UidError::InvalidHex));
        assert_eq!(Uid::parse_hex("ZZZZZZZZ"), Err(UidError::InvalidHex));
        assert_eq!(
            Uid::parse_hex("00112233445566778899AABB"),
            Err(UidError::InvalidLength(12))
        );
    }

    #[test]
    fn test_parse_hex_rejects_signs() {
        assert_eq!(Uid::parse_hex("+F+F+F+F"), Err(UidError::InvalidHex));
        assert_eq!(Uid::parse_hex("-1020304"), Err(UidError::InvalidHex));
    }
}
