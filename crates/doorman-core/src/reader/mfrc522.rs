//! MFRC522 13.56 MHz reader driver with async SPI interface
//!
//! Covers what an access terminal needs from ISO 14443A cards: wake the
//! field with REQA, run anticollision/select through up to three cascade
//! levels to obtain the full UID, and send HLTA afterwards. Collisions
//! between several cards are reported rather than resolved bit by bit.

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::spi::{Operation, SpiDevice};
use log::{debug, info, warn};

use super::{ReaderError, TagReader};
use crate::uid::{MAX_UID_LEN, Uid};

// =============================================================================
// Register Addresses
// =============================================================================

pub const COMMAND_REG: u8 = 0x01;
pub const COM_IRQ_REG: u8 = 0x04;
pub const ERROR_REG: u8 = 0x06;
pub const FIFO_DATA_REG: u8 = 0x09;
pub const FIFO_LEVEL_REG: u8 = 0x0A;
pub const CONTROL_REG: u8 = 0x0C;
pub const BIT_FRAMING_REG: u8 = 0x0D;
pub const COLL_REG: u8 = 0x0E;
pub const MODE_REG: u8 = 0x11;
pub const TX_MODE_REG: u8 = 0x12;
pub const RX_MODE_REG: u8 = 0x13;
pub const TX_CONTROL_REG: u8 = 0x14;
pub const TX_ASK_REG: u8 = 0x15;
pub const MOD_WIDTH_REG: u8 = 0x24;
pub const T_MODE_REG: u8 = 0x2A;
pub const T_PRESCALER_REG: u8 = 0x2B;
pub const T_RELOAD_REG_H: u8 = 0x2C;
pub const T_RELOAD_REG_L: u8 = 0x2D;
pub const VERSION_REG: u8 = 0x37;

// =============================================================================
// Reader Commands and Flags
// =============================================================================

const CMD_IDLE: u8 = 0x00;
const CMD_TRANSCEIVE: u8 = 0x0C;
const CMD_SOFT_RESET: u8 = 0x0F;

const POWER_DOWN: u8 = 0x10;
const START_SEND: u8 = 0x80;
const FLUSH_BUFFER: u8 = 0x80;
const VALUES_AFTER_COLL: u8 = 0x80;
const ANTENNA_ON: u8 = 0x03;

const IRQ_RX: u8 = 0x20;
const IRQ_IDLE: u8 = 0x10;
const IRQ_TIMER: u8 = 0x01;
const CLEAR_ALL_IRQ: u8 = 0x7F;

const ERR_BUFFER_OVFL: u8 = 0x10;
const ERR_COLL: u8 = 0x08;
const ERR_PARITY: u8 = 0x02;
const ERR_PROTOCOL: u8 = 0x01;

// =============================================================================
// Card (PICC) Commands
// =============================================================================

const PICC_REQA: u8 = 0x26;
const PICC_HLTA: u8 = 0x50;
const PICC_SEL_CL1: u8 = 0x93;
const PICC_SEL_CL2: u8 = 0x95;
const PICC_SEL_CL3: u8 = 0x97;
const PICC_CASCADE_TAG: u8 = 0x88;

const NVB_ANTICOLLISION: u8 = 0x20;
const NVB_SELECT: u8 = 0x70;
const SAK_UID_NOT_COMPLETE: u8 = 0x04;

/// REQA is a short frame of 7 bits
const SHORT_FRAME_BITS: u8 = 7;

/// The internal timer aborts a transceive after 25 ms; poll a bit longer.
const TRANSCEIVE_POLLS: u32 = 30;
const TRANSCEIVE_POLL_US: u32 = 1000;

const RESET_SETTLE_MS: u32 = 50;
const RESET_POLLS: u32 = 3;

/// Errors that can occur during MFRC522 operations
#[derive(Debug)]
pub enum Error<E> {
    /// SPI communication error
    Spi(E),
    /// No answer before the reader timer expired
    Timeout,
    /// The reader flagged a bit collision
    Collision,
    /// BCC or CRC_A did not match
    Checksum,
    /// The answer did not have the expected shape
    Protocol(&'static str),
    /// Assembled UID has a length ISO 14443 does not define
    InvalidUid,
}

impl<E> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Self::Spi(e)
    }
}

impl<E> From<Error<E>> for ReaderError {
    fn from(e: Error<E>) -> Self {
        match e {
            Error::Spi(_) => Self::Bus,
            Error::Timeout => Self::Timeout,
            Error::Collision => Self::Collision,
            Error::Checksum => Self::Checksum,
            Error::Protocol(what) => Self::Protocol(what),
            Error::InvalidUid => Self::InvalidUid,
        }
    }
}

/// Address byte for reading `reg`
pub const fn read_address(reg: u8) -> u8 {
    0x80 | ((reg << 1) & 0x7E)
}

/// Address byte for writing `reg`
pub const fn write_address(reg: u8) -> u8 {
    (reg << 1) & 0x7E
}

/// CRC_A from ISO/IEC 14443-3, least significant byte first
pub fn crc_a(data: &[u8]) -> [u8; 2] {
    let mut crc: u16 = 0x6363;
    for &byte in data {
        let mut ch = byte ^ (crc as u8);
        ch ^= ch << 4;
        let ch = u16::from(ch);
        crc = (crc >> 8) ^ (ch << 8) ^ (ch << 3) ^ (ch >> 4);
    }
    [crc as u8, (crc >> 8) as u8]
}

/// Block check character of a UID fragment
pub fn bcc(fragment: &[u8]) -> u8 {
    fragment.iter().fold(0, |acc, b| acc ^ b)
}

/// MFRC522 reader on an SPI device (chip select handled by the device)
pub struct Mfrc522<SPI, D> {
    spi: SPI,
    delay: D,
}

impl<SPI, D> Mfrc522<SPI, D>
where
    SPI: SpiDevice,
    D: DelayNs,
{
    pub fn new(spi: SPI, delay: D) -> Self {
        Self { spi, delay }
    }

    // =========================================================================
    // Private SPI Helper Methods
    // =========================================================================

    async fn read_register(&mut self, reg: u8) -> Result<u8, Error<SPI::Error>> {
        let mut buf = [read_address(reg), 0];
        self.spi.transfer_in_place(&mut buf).await?;
        Ok(buf[1])
    }

    async fn write_register(&mut self, reg: u8, value: u8) -> Result<(), Error<SPI::Error>> {
        self.spi.write(&[write_address(reg), value]).await?;
        Ok(())
    }

    async fn set_bits(&mut self, reg: u8, mask: u8) -> Result<(), Error<SPI::Error>> {
        let value = self.read_register(reg).await?;
        self.write_register(reg, value | mask).await
    }

    async fn clear_bits(&mut self, reg: u8, mask: u8) -> Result<(), Error<SPI::Error>> {
        let value = self.read_register(reg).await?;
        self.write_register(reg, value & !mask).await
    }

    /// Push `data` into the FIFO in a single SPI transaction.
    async fn write_fifo(&mut self, data: &[u8]) -> Result<(), Error<SPI::Error>> {
        let address = [write_address(FIFO_DATA_REG)];
        self.spi
            .transaction(&mut [Operation::Write(&address), Operation::Write(data)])
            .await?;
        Ok(())
    }

    // =========================================================================
    // Setup
    // =========================================================================

    /// Soft-reset the chip and configure it for ISO 14443A at 106 kBd.
    ///
    /// # Returns
    /// The content of the version register (0x91/0x92 for genuine parts)
    pub async fn init(&mut self) -> Result<u8, Error<SPI::Error>> {
        self.write_register(COMMAND_REG, CMD_SOFT_RESET).await?;
        self.delay.delay_ms(RESET_SETTLE_MS).await;

        let mut awake = false;
        for _ in 0..RESET_POLLS {
            if self.read_register(COMMAND_REG).await? & POWER_DOWN == 0 {
                awake = true;
                break;
            }
            self.delay.delay_ms(10).await;
        }
        if !awake {
            return Err(Error::Timeout);
        }

        self.write_register(TX_MODE_REG, 0x00).await?;
        self.write_register(RX_MODE_REG, 0x00).await?;
        self.write_register(MOD_WIDTH_REG, 0x26).await?;

        // TAuto, 40 kHz timer tick, reload 1000 -> 25 ms receive timeout
        self.write_register(T_MODE_REG, 0x80).await?;
        self.write_register(T_PRESCALER_REG, 0xA9).await?;
        self.write_register(T_RELOAD_REG_H, 0x03).await?;
        self.write_register(T_RELOAD_REG_L, 0xE8).await?;

        // 100% ASK modulation, CRC preset 0x6363
        self.write_register(TX_ASK_REG, 0x40).await?;
        self.write_register(MODE_REG, 0x3D).await?;

        self.antenna_on().await?;

        let version = self.version().await?;
        match version {
            0x00 | 0xFF => return Err(Error::Protocol("no MFRC522 answering on SPI")),
            0x88 | 0x91 | 0x92 | 0xB2 => info!("MFRC522 ready (version 0x{:02X})", version),
            other => warn!("MFRC522 answered with unknown version 0x{:02X}", other),
        }

        Ok(version)
    }

    pub async fn version(&mut self) -> Result<u8, Error<SPI::Error>> {
        self.read_register(VERSION_REG).await
    }

    pub async fn antenna_on(&mut self) -> Result<(), Error<SPI::Error>> {
        let value = self.read_register(TX_CONTROL_REG).await?;
        if value & ANTENNA_ON != ANTENNA_ON {
            self.write_register(TX_CONTROL_REG, value | ANTENNA_ON)
                .await?;
        }
        Ok(())
    }

    // =========================================================================
    // Card Communication
    // =========================================================================

    /// Send `data` to the card and read its answer into `answer`.
    ///
    /// `tx_last_bits` is the number of valid bits in the last byte sent
    /// (0 means all eight).
    ///
    /// # Returns
    /// Number of bytes received
    async fn transceive(
        &mut self,
        data: &[u8],
        tx_last_bits: u8,
        answer: &mut [u8],
    ) -> Result<usize, Error<SPI::Error>> {
        self.write_register(COMMAND_REG, CMD_IDLE).await?;
        self.write_register(COM_IRQ_REG, CLEAR_ALL_IRQ).await?;
        self.write_register(FIFO_LEVEL_REG, FLUSH_BUFFER).await?;
        self.write_fifo(data).await?;
        self.write_register(BIT_FRAMING_REG, tx_last_bits & 0x07)
            .await?;
        self.write_register(COMMAND_REG, CMD_TRANSCEIVE).await?;
        self.set_bits(BIT_FRAMING_REG, START_SEND).await?;

        let mut done = false;
        for _ in 0..TRANSCEIVE_POLLS {
            let irq = self.read_register(COM_IRQ_REG).await?;
            if irq & (IRQ_RX | IRQ_IDLE) != 0 {
                done = true;
                break;
            }
            if irq & IRQ_TIMER != 0 {
                break;
            }
            self.delay.delay_us(TRANSCEIVE_POLL_US).await;
        }
        self.clear_bits(BIT_FRAMING_REG, START_SEND).await?;

        if !done {
            return Err(Error::Timeout);
        }

        let error = self.read_register(ERROR_REG).await?;
        if error & (ERR_BUFFER_OVFL | ERR_PARITY | ERR_PROTOCOL) != 0 {
            return Err(Error::Protocol("transmission error"));
        }
        if error & ERR_COLL != 0 {
            return Err(Error::Collision);
        }

        let level = usize::from(self.read_register(FIFO_LEVEL_REG).await? & 0x7F);
        if level > answer.len() {
            return Err(Error::Protocol("answer longer than expected"));
        }
        for slot in answer.iter_mut().take(level) {
            *slot = self.read_register(FIFO_DATA_REG).await?;
        }

        Ok(level)
    }

    /// Send REQA and report whether a card in idle state answered.
    pub async fn request_a(&mut self) -> Result<bool, Error<SPI::Error>> {
        self.clear_bits(COLL_REG, VALUES_AFTER_COLL).await?;

        let mut atqa = [0u8; 2];
        match self
            .transceive(&[PICC_REQA], SHORT_FRAME_BITS, &mut atqa)
            .await
        {
            Ok(2) => Ok(true),
            Ok(_) => Err(Error::Protocol("ATQA must be 2 bytes")),
            // Several cards answering still means a card is present.
            Err(Error::Collision) => Ok(true),
            Err(Error::Timeout) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Run anticollision and select through the cascade levels.
    pub async fn select(&mut self) -> Result<Uid, Error<SPI::Error>> {
        let mut uid = [0u8; MAX_UID_LEN];
        let mut len = 0;

        for level in [PICC_SEL_CL1, PICC_SEL_CL2, PICC_SEL_CL3] {
            self.clear_bits(COLL_REG, VALUES_AFTER_COLL).await?;

            let mut fragment = [0u8; 5];
            let received = self
                .transceive(&[level, NVB_ANTICOLLISION], 0, &mut fragment)
                .await?;
            if received != 5 {
                return Err(Error::Protocol("anticollision answer must be 5 bytes"));
            }
            if bcc(&fragment[..4]) != fragment[4] {
                return Err(Error::Checksum);
            }

            let mut frame = [0u8; 9];
            frame[0] = level;
            frame[1] = NVB_SELECT;
            frame[2..7].copy_from_slice(&fragment);
            let crc = crc_a(&frame[..7]);
            frame[7..9].copy_from_slice(&crc);

            let mut sak = [0u8; 3];
            let received = self.transceive(&frame, 0, &mut sak).await?;
            if received != 3 {
                return Err(Error::Protocol("SAK must be 3 bytes"));
            }
            if crc_a(&sak[..1]) != [sak[1], sak[2]] {
                return Err(Error::Checksum);
            }

            let complete = sak[0] & SAK_UID_NOT_COMPLETE == 0;
            let part = if complete {
                &fragment[..4]
            } else {
                if fragment[0] != PICC_CASCADE_TAG {
                    return Err(Error::Protocol("missing cascade tag"));
                }
                &fragment[1..4]
            };

            if len + part.len() > MAX_UID_LEN {
                break;
            }
            uid[len..len + part.len()].copy_from_slice(part);
            len += part.len();

            if complete {
                debug!("Card selected, SAK 0x{:02X}", sak[0]);
                return Uid::from_bytes(&uid[..len]).map_err(|_| Error::InvalidUid);
            }
        }

        Err(Error::Protocol("UID longer than three cascade levels"))
    }

    /// Send HLTA. A halted card does not answer, so a timeout is success.
    pub async fn halt_a(&mut self) -> Result<(), Error<SPI::Error>> {
        let mut frame = [PICC_HLTA, 0x00, 0x00, 0x00];
        let crc = crc_a(&frame[..2]);
        frame[2..4].copy_from_slice(&crc);

        let mut answer = [0u8; 2];
        match self.transceive(&frame, 0, &mut answer).await {
            Err(Error::Timeout) => Ok(()),
            Ok(_) => Err(Error::Protocol("card answered HLTA")),
            Err(e) => Err(e),
        }
    }
}

impl<SPI, D> TagReader for Mfrc522<SPI, D>
where
    SPI: SpiDevice,
    D: DelayNs,
{
    async fn poll(&mut self) -> Result<Option<Uid>, ReaderError> {
        if !self.request_a().await? {
            return Ok(None);
        }
        let uid = self.select().await?;
        Ok(Some(uid))
    }

    async fn halt(&mut self) -> Result<(), ReaderError> {
        self.halt_a().await.map_err(ReaderError::from)
    }
}
