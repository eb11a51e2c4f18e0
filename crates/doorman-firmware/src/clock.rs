use doorman_core::clock::{Clock, WallClock};
use embassy_time::Instant;

/// Wall clock carried forward from embassy's monotonic timer
#[derive(Debug, Clone, Copy, Default)]
pub struct UptimeClock {
    wall: WallClock,
}

impl UptimeClock {
    pub const fn new() -> Self {
        Self {
            wall: WallClock::new(),
        }
    }

    /// Anchor the clock to `unix` seconds as of now.
    pub fn set(&mut self, unix: u64) -> bool {
        self.wall.set(unix, Instant::now().as_millis())
    }
}

impl Clock for UptimeClock {
    fn now_unix(&self) -> Option<u64> {
        self.wall.now_at(Instant::now().as_millis())
    }
}
