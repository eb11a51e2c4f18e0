//! Network link supervision
//!
//! Before each server round trip the terminal makes sure the station is
//! associated. A dropped link gets exactly one bounded reconnect attempt.

use embedded_hal_async::delay::DelayNs;
use log::{info, warn};

/// Number of link checks after a reconnect request
pub const RECONNECT_ATTEMPTS: u32 = 10;
/// Pause between link checks
pub const RECONNECT_INTERVAL_MS: u32 = 500;

/// A network link that can report its state and be asked to come back.
pub trait Link {
    fn is_up(&self) -> bool;

    /// Ask the link owner to reconnect. Must not block.
    fn begin_reconnect(&mut self);
}

/// Link for hosts where the network is managed by the OS
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysUp;

impl Link for AlwaysUp {
    fn is_up(&self) -> bool {
        true
    }

    fn begin_reconnect(&mut self) {}
}

/// Returns whether the link is up, reconnecting once if it is not.
pub async fn ensure_link<L: Link, D: DelayNs>(link: &mut L, delay: &mut D) -> bool {
    if link.is_up() {
        return true;
    }

    warn!("WiFi disconnected, reconnecting...");
    link.begin_reconnect();

    for _ in 0..RECONNECT_ATTEMPTS {
        delay.delay_ms(RECONNECT_INTERVAL_MS).await;
        if link.is_up() {
            info!("WiFi reconnected");
            return true;
        }
    }

    warn!("WiFi still down after {} checks", RECONNECT_ATTEMPTS);
    false
}
