//! Host-side implementations of the doorman terminal traits
//!
//! Lets the terminal loop run on a desktop against a real access server:
//! UIDs are typed on stdin instead of read from a card, feedback is logged
//! instead of blinked and beeped, and the OS owns the network.

use std::io::{self, BufRead, Read as _, Write as _};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use doorman_core::api::AccessType;
use doorman_core::clock::Clock;
use doorman_core::config::{
    Config, DEFAULT_ACCESS_POINT, DEFAULT_SERVER_URL, InternetConfig, ServerConfig,
    TerminalConfig,
};
use doorman_core::feedback::{
    DENIED_BEEPS, DENIED_TONE_HZ, DENIED_TONE_MS, Feedback, FeedbackError, GRANTED_TONE_HZ,
    GRANTED_TONE_MS,
};
use doorman_core::http::Connector;
use doorman_core::reader::{ReaderError, TagReader};
use doorman_core::uid::Uid;
use embedded_hal_async::delay::DelayNs;
use embedded_io::{ErrorKind, ErrorType};
use embedded_io_async::{Read, Write};
use log::{info, warn};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Runtime settings, read from the same variables the firmware bakes in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub access_point: String,
    pub access_type: AccessType,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let access_type = match non_empty("DOORMAN_ACCESS_TYPE") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                warn!("Unknown access type {:?}, using entry", raw);
                AccessType::Entry
            }),
            None => AccessType::Entry,
        };

        Self {
            server_url: non_empty("DOORMAN_SERVER_URL")
                .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string()),
            access_point: non_empty("DOORMAN_ACCESS_POINT")
                .unwrap_or_else(|| DEFAULT_ACCESS_POINT.to_string()),
            access_type,
        }
    }

    /// Borrow the settings as a terminal `Config`. The host needs no Wi-Fi credentials.
    pub fn config(&self) -> Config<'_> {
        Config {
            internet: InternetConfig::default(),
            server: ServerConfig {
                base_url: &self.server_url,
            },
            terminal: TerminalConfig {
                access_point: &self.access_point,
                access_type: self.access_type,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

fn error_kind(e: &io::Error) -> ErrorKind {
    match e.kind() {
        io::ErrorKind::NotFound => ErrorKind::NotFound,
        io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
        io::ErrorKind::ConnectionRefused => ErrorKind::ConnectionRefused,
        io::ErrorKind::ConnectionReset => ErrorKind::ConnectionReset,
        io::ErrorKind::ConnectionAborted => ErrorKind::ConnectionAborted,
        io::ErrorKind::NotConnected => ErrorKind::NotConnected,
        io::ErrorKind::AddrInUse => ErrorKind::AddrInUse,
        io::ErrorKind::AddrNotAvailable => ErrorKind::AddrNotAvailable,
        io::ErrorKind::BrokenPipe => ErrorKind::BrokenPipe,
        io::ErrorKind::InvalidInput => ErrorKind::InvalidInput,
        io::ErrorKind::InvalidData => ErrorKind::InvalidData,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => ErrorKind::TimedOut,
        io::ErrorKind::Interrupted => ErrorKind::Interrupted,
        io::ErrorKind::WriteZero => ErrorKind::WriteZero,
        _ => ErrorKind::Other,
    }
}

/// Blocking `std::net` connections; the terminal awaits them one at a time.
#[derive(Debug, Clone, Copy)]
pub struct StdConnector {
    timeout: Duration,
}

impl StdConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for StdConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl Connector for StdConnector {
    type Connection<'a>
        = StdConnection
    where
        Self: 'a;

    async fn connect<'a>(&'a mut self, host: &str, port: u16) -> Result<StdConnection, ErrorKind> {
        let address = (host, port)
            .to_socket_addrs()
            .map_err(|e| error_kind(&e))?
            .next()
            .ok_or(ErrorKind::NotFound)?;

        let stream =
            TcpStream::connect_timeout(&address, self.timeout).map_err(|e| error_kind(&e))?;
        stream
            .set_read_timeout(Some(self.timeout))
            .map_err(|e| error_kind(&e))?;
        stream
            .set_write_timeout(Some(self.timeout))
            .map_err(|e| error_kind(&e))?;

        Ok(StdConnection { stream })
    }
}

pub struct StdConnection {
    stream: TcpStream,
}

impl ErrorType for StdConnection {
    type Error = ErrorKind;
}

impl Read for StdConnection {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
        self.stream.read(buf).map_err(|e| error_kind(&e))
    }
}

impl Write for StdConnection {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, ErrorKind> {
        self.stream.write(buf).map_err(|e| error_kind(&e))
    }

    async fn flush(&mut self) -> Result<(), ErrorKind> {
        self.stream.flush().map_err(|e| error_kind(&e))
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Takes one UID per input line in place of an RFID reader.
///
/// Blank lines and lines starting with `#` read as an empty field.
pub struct ScriptedReader<B> {
    input: B,
    exhausted: bool,
}

impl<B: BufRead> ScriptedReader<B> {
    pub fn new(input: B) -> Self {
        Self {
            input,
            exhausted: false,
        }
    }

    /// True once the input has hit end of file.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

impl<B: BufRead> TagReader for ScriptedReader<B> {
    async fn poll(&mut self) -> Result<Option<Uid>, ReaderError> {
        if self.exhausted {
            return Ok(None);
        }

        let mut line = String::new();
        match self.input.read_line(&mut line) {
            Ok(0) => {
                self.exhausted = true;
                return Ok(None);
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Reading input failed: {}", e);
                self.exhausted = true;
                return Err(ReaderError::Bus);
            }
        }

        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        Uid::parse_hex(line).map(Some).map_err(|e| {
            warn!("Ignoring {:?}: {}", line, e);
            ReaderError::InvalidUid
        })
    }

    async fn halt(&mut self) -> Result<(), ReaderError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Feedback, time and delays
// ---------------------------------------------------------------------------

/// Logs the LED/buzzer pattern the hardware would play.
#[derive(Debug, Default)]
pub struct ConsoleIndicator {
    pub granted: usize,
    pub denied: usize,
}

impl Feedback for ConsoleIndicator {
    async fn granted(&mut self) -> Result<(), FeedbackError> {
        self.granted += 1;
        info!(
            "[LED on] beep {} Hz for {} ms [LED off]",
            GRANTED_TONE_HZ, GRANTED_TONE_MS
        );
        Ok(())
    }

    async fn denied(&mut self) -> Result<(), FeedbackError> {
        self.denied += 1;
        info!(
            "beep {} Hz for {} ms, {} times",
            DENIED_TONE_HZ, DENIED_TONE_MS, DENIED_BEEPS
        );
        Ok(())
    }
}

/// Host system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> Option<u64> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .map(|elapsed| elapsed.as_secs())
    }
}

/// Delay that blocks the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    async fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use std::collections::HashMap;
    use std::io::Cursor;

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::from_lookup(|_| None);
        assert_eq!(settings.server_url, "http://192.168.100.4:3000");
        assert_eq!(settings.access_point, "Main Entrance");
        assert_eq!(settings.access_type, AccessType::Entry);
    }

    #[test]
    fn test_settings_from_variables() {
        let vars: HashMap<&str, &str> = [
            ("DOORMAN_SERVER_URL", "http://127.0.0.1:3000"),
            ("DOORMAN_ACCESS_POINT", "Library"),
            ("DOORMAN_ACCESS_TYPE", "EXIT"),
        ]
        .into_iter()
        .collect();
        let settings = Settings::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        let config = settings.config();
        assert_eq!(config.server.base_url, "http://127.0.0.1:3000");
        assert_eq!(config.terminal.access_point, "Library");
        assert_eq!(config.terminal.access_type, AccessType::Exit);
        assert_eq!(config.endpoint().unwrap().port(), 3000);
    }

    #[test]
    fn test_scripted_reader_lines() {
        let input = Cursor::new("0ab304ff\n\n# comment\nnot-a-uid\n");
        let mut reader = ScriptedReader::new(input);

        let uid = block_on(reader.poll()).unwrap().unwrap();
        assert_eq!(uid.to_string(), "0AB304FF");
        assert_eq!(block_on(reader.poll()), Ok(None));
        assert_eq!(block_on(reader.poll()), Ok(None));
        assert_eq!(block_on(reader.poll()), Err(ReaderError::InvalidUid));
        assert!(!reader.is_exhausted());
        assert_eq!(block_on(reader.poll()), Ok(None));
        assert!(reader.is_exhausted());
    }

    #[test]
    fn test_system_clock_is_set() {
        assert!(SystemClock.now_unix().unwrap() > doorman_core::clock::MIN_VALID_UNIX);
    }
}
