//! LED and buzzer feedback for access decisions
//!
//! The buzzer is a passive piezo, so tones are square waves produced by
//! toggling its pin.

use core::future::Future;

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use thiserror_no_std::Error;

pub const GRANTED_TONE_HZ: u32 = 1000;
pub const GRANTED_TONE_MS: u32 = 200;
/// How long the LED stays lit after a grant, tone included
pub const GRANTED_LED_MS: u32 = 1000;

pub const DENIED_TONE_HZ: u32 = 500;
pub const DENIED_TONE_MS: u32 = 200;
pub const DENIED_GAP_MS: u32 = 100;
pub const DENIED_BEEPS: u32 = 3;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackError {
    #[error("could not drive the LED pin")]
    Led,
    #[error("could not drive the buzzer pin")]
    Buzzer,
}

/// Signals the outcome of a tag read to the person at the door.
pub trait Feedback {
    fn granted(&mut self) -> impl Future<Output = Result<(), FeedbackError>>;
    fn denied(&mut self) -> impl Future<Output = Result<(), FeedbackError>>;
}

/// Status LED plus passive buzzer on two GPIO outputs
pub struct Indicator<LED, BUZZER, D> {
    led: LED,
    buzzer: BUZZER,
    delay: D,
}

impl<LED, BUZZER, D> Indicator<LED, BUZZER, D>
where
    LED: OutputPin,
    BUZZER: OutputPin,
    D: DelayNs,
{
    /// Take the pins and drive both low.
    pub fn new(mut led: LED, mut buzzer: BUZZER, delay: D) -> Result<Self, FeedbackError> {
        led.set_low().map_err(|_| FeedbackError::Led)?;
        buzzer.set_low().map_err(|_| FeedbackError::Buzzer)?;
        Ok(Self { led, buzzer, delay })
    }

    fn set_led(&mut self, on: bool) -> Result<(), FeedbackError> {
        let result = if on {
            self.led.set_high()
        } else {
            self.led.set_low()
        };
        result.map_err(|_| FeedbackError::Led)
    }

    /// Play a square wave of `frequency_hz` for `duration_ms`, ending low.
    pub async fn tone(&mut self, frequency_hz: u32, duration_ms: u32) -> Result<(), FeedbackError> {
        if frequency_hz == 0 {
            self.delay.delay_ms(duration_ms).await;
            return Ok(());
        }

        let half_period_us = 500_000 / frequency_hz;
        let cycles = frequency_hz * duration_ms / 1000;

        for _ in 0..cycles {
            self.buzzer.set_high().map_err(|_| FeedbackError::Buzzer)?;
            self.delay.delay_us(half_period_us).await;
            self.buzzer.set_low().map_err(|_| FeedbackError::Buzzer)?;
            self.delay.delay_us(half_period_us).await;
        }

        Ok(())
    }
}

impl<LED, BUZZER, D> Feedback for Indicator<LED, BUZZER, D>
where
    LED: OutputPin,
    BUZZER: OutputPin,
    D: DelayNs,
{
    async fn granted(&mut self) -> Result<(), FeedbackError> {
        self.set_led(true)?;
        self.tone(GRANTED_TONE_HZ, GRANTED_TONE_MS).await?;
        self.delay
            .delay_ms(GRANTED_LED_MS - GRANTED_TONE_MS)
            .await;
        self.set_led(false)
    }

    async fn denied(&mut self) -> Result<(), FeedbackError> {
        for _ in 0..DENIED_BEEPS {
            self.tone(DENIED_TONE_HZ, DENIED_TONE_MS).await?;
            self.delay.delay_ms(DENIED_GAP_MS).await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockPin, RecordingDelay};
    use embassy_futures::block_on;

    fn indicator() -> (Indicator<MockPin, MockPin, RecordingDelay>, MockPin, MockPin, RecordingDelay) {
        let led = MockPin::default();
        let buzzer = MockPin::default();
        let delay = RecordingDelay::default();
        let indicator = Indicator::new(led.clone(), buzzer.clone(), delay.clone()).unwrap();
        (indicator, led, buzzer, delay)
    }

    #[test]
    fn test_new_drives_pins_low() {
        let (_indicator, led, buzzer, _) = indicator();
        assert_eq!(led.history(), [false]);
        assert_eq!(buzzer.history(), [false]);
    }

    #[test]
    fn test_granted_pattern() {
        let (mut indicator, led, buzzer, delay) = indicator();
        block_on(indicator.granted()).unwrap();

        assert_eq!(led.history(), [false, true, false]);
        assert_eq!(buzzer.rising_edges(), 200);
        assert!(!buzzer.is_high());
        assert_eq!(delay.elapsed_ms(), 1000);
    }

    #[test]
    fn test_denied_pattern() {
        let (mut indicator, led, buzzer, delay) = indicator();
        block_on(indicator.denied()).unwrap();

        assert_eq!(led.history(), [false]);
        assert_eq!(buzzer.rising_edges(), 300);
        assert!(!buzzer.is_high());
        assert_eq!(delay.elapsed_ms(), 900);
    }

    #[test]
    fn test_silent_tone_only_waits() {
        let (mut indicator, _led, buzzer, delay) = indicator();
        block_on(indicator.tone(0, 50)).unwrap();

        assert_eq!(buzzer.rising_edges(), 0);
        assert_eq!(delay.elapsed_ms(), 50);
    }
}
