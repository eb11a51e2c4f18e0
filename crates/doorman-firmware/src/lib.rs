//! ESP32-S3 firmware-specific modules for doorman
//!
//! This crate contains hardware-specific code that cannot compile on desktop
//! targets: the Wi-Fi station task, embassy-net TCP/UDP plumbing behind the
//! core traits, and the compile-time configuration.

#![no_std]

extern crate alloc;

pub mod clock;
pub mod net;
pub mod secrets;
pub mod sntp;
pub mod wifi;
