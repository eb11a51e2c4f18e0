mod mfrc522;

pub use mfrc522::*;

use core::future::Future;

use thiserror_no_std::Error;

use crate::uid::Uid;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderError {
    #[error("reader bus communication failed")]
    Bus,
    #[error("card did not answer in time")]
    Timeout,
    #[error("several cards answered at once")]
    Collision,
    #[error("CRC or BCC check failed")]
    Checksum,
    #[error("unexpected answer from card: {0}")]
    Protocol(&'static str),
    #[error("card returned an invalid UID")]
    InvalidUid,
}

/// Source of tag-read events
pub trait TagReader {
    /// Return the UID of a newly presented card, or `None` when the field is empty.
    fn poll(&mut self) -> impl Future<Output = Result<Option<Uid>, ReaderError>>;

    /// Put the card that was just read to sleep so it is not read again while
    /// it stays on the antenna.
    fn halt(&mut self) -> impl Future<Output = Result<(), ReaderError>>;
}
