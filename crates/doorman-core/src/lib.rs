//! Hardware-independent core library for doorman
//!
//! This crate contains all platform-agnostic logic for the doorman RFID access
//! terminal: tag identifiers, the MFRC522 reader driver, the HTTP client used
//! to talk to the access server, the access decision, LED/buzzer feedback
//! patterns, SNTP time handling and the polling loop that ties them together.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets (ESP32-S3) and desktop hosts (for the simulator and tests).

#![no_std]

extern crate alloc;

pub mod api;
pub mod app_state;
pub mod client;
pub mod clock;
pub mod config;
pub mod decision;
pub mod feedback;
pub mod http;
pub mod link;
pub mod reader;
pub mod terminal;
pub mod uid;

#[cfg(test)]
pub(crate) mod testing;
