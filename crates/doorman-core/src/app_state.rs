//! Application-wide run state and error types for the terminal

use core::fmt;

use log::info;
use thiserror_no_std::Error;

pub const ERROR_MESSAGE_LEN: usize = 64;

pub type ErrorMessage = heapless::String<ERROR_MESSAGE_LEN>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppRunState {
    Uninitialized,
    WifiConnecting,
    WifiConnected,
    TimeSyncing,
    TimeKnown,
    Polling,
    Error,
}

impl fmt::Display for AppRunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::WifiConnecting => "wifi connecting",
            Self::WifiConnected => "wifi connected",
            Self::TimeSyncing => "time syncing",
            Self::TimeKnown => "time known",
            Self::Polling => "polling",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Boot progress of the terminal
#[derive(Debug)]
pub struct AppState {
    run_state: AppRunState,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub const fn new() -> Self {
        Self {
            run_state: AppRunState::Uninitialized,
        }
    }

    pub fn run_state(&self) -> AppRunState {
        self.run_state
    }

    pub fn transition(&mut self, next: AppRunState) {
        if self.run_state == next {
            return;
        }
        info!("State: {} -> {}", self.run_state, next);
        self.run_state = next;
    }

    /// Enter the error state and hand the error back for reporting.
    pub fn fail(&mut self, error: AppError) -> AppError {
        self.transition(AppRunState::Error);
        error
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("WiFi connection failed: {0}")]
    Wifi(ErrorMessage),
    #[error("Time sync failed: {0}")]
    TimeSync(ErrorMessage),
    #[error("RFID reader error: {0}")]
    Reader(ErrorMessage),
    #[error("Invalid configuration: {0}")]
    Config(ErrorMessage),
}

/// Render any `Display` value into an error message, truncating silently.
pub fn display_message<T: fmt::Display>(value: T) -> ErrorMessage {
    struct Truncating(ErrorMessage);

    impl fmt::Write for Truncating {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            let room = ERROR_MESSAGE_LEN - self.0.len();
            let mut end = s.len().min(room);
            while !s.is_char_boundary(end) {
                end -= 1;
            }
            let _ = self.0.push_str(&s[..end]);
            Ok(())
        }
    }

    let mut out = Truncating(ErrorMessage::new());
    let _ = fmt::write(&mut out, format_args!("{}", value));
    out.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_boot_sequence_transitions() {
        let mut state = AppState::new();
        assert_eq!(state.run_state(), AppRunState::Uninitialized);

        state.transition(AppRunState::WifiConnecting);
        state.transition(AppRunState::WifiConnected);
        state.transition(AppRunState::TimeSyncing);
        state.transition(AppRunState::TimeKnown);
        state.transition(AppRunState::Polling);

        assert_eq!(state.run_state(), AppRunState::Polling);

        state.transition(AppRunState::Polling);
        assert_eq!(state.run_state(), AppRunState::Polling);
    }

    #[test]
    fn test_fail_enters_error_state() {
        let mut state = AppState::new();
        let error = state.fail(AppError::Reader(display_message("no answer on SPI")));

        assert_eq!(state.run_state(), AppRunState::Error);
        assert_eq!(error.to_string(), "RFID reader error: no answer on SPI");
    }

    #[test]
    fn test_messages_are_truncated() {
        let long = "é".repeat(40);
        let message = display_message(&long);
        assert_eq!(message.len(), 64);
        assert!(message.chars().all(|c| c == 'é'));

        let rendered = display_message(format_args!("{}{}", long, long));
        assert_eq!(rendered.len(), 64);

        // Split across writes, the cut still lands on a character boundary.
        let odd = display_message(format_args!("a{}", long));
        assert_eq!(odd.len(), 63);
    }
}
