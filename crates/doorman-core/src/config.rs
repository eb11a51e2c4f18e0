//! Terminal configuration
//!
//! All strings are borrowed: the firmware builds its `Config` from
//! compile-time constants, the simulator from its environment.

use serde::{Deserialize, Serialize};

use crate::api::AccessType;
use crate::http::{ServerEndpoint, UrlError};

pub const DEFAULT_SERVER_URL: &str = "http://192.168.100.4:3000";
pub const DEFAULT_ACCESS_POINT: &str = "Main Entrance";

#[derive(Serialize, Deserialize, Debug, Default)]
#[serde(bound(deserialize = "'de: 'a"))]
pub struct Config<'a> {
    pub internet: InternetConfig<'a>,
    pub server: ServerConfig<'a>,
    pub terminal: TerminalConfig<'a>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct InternetConfig<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ServerConfig<'a> {
    /// e.g. `http://192.168.100.4:3000`
    pub base_url: &'a str,
}

impl Default for ServerConfig<'_> {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVER_URL,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TerminalConfig<'a> {
    /// Name of the door this terminal guards, sent with every log entry
    pub access_point: &'a str,
    #[serde(default)]
    pub access_type: AccessType,
}

impl Default for TerminalConfig<'_> {
    fn default() -> Self {
        Self {
            access_point: DEFAULT_ACCESS_POINT,
            access_type: AccessType::Entry,
        }
    }
}

impl Config<'_> {
    /// Parse the server URL into a connectable endpoint.
    pub fn endpoint(&self) -> Result<ServerEndpoint, UrlError> {
        ServerEndpoint::parse(self.server.base_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.base_url, "http://192.168.100.4:3000");
        assert_eq!(config.terminal.access_point, "Main Entrance");
        assert_eq!(config.terminal.access_type, AccessType::Entry);

        let endpoint = config.endpoint().unwrap();
        assert_eq!(endpoint.host(), "192.168.100.4");
        assert_eq!(endpoint.port(), 3000);
    }

    #[test]
    fn test_deserialize_borrowed() {
        let raw = r#"{
            "internet": { "ssid": "lab", "password": "hunter22" },
            "server": { "base_url": "http://doors.local" },
            "terminal": { "access_point": "Library", "access_type": "exit" }
        }"#;

        let config: Config = serde_json::from_str(raw).unwrap();
        assert_eq!(config.internet.ssid, "lab");
        assert_eq!(config.internet.password, "hunter22");
        assert_eq!(config.terminal.access_point, "Library");
        assert_eq!(config.terminal.access_type, AccessType::Exit);
        assert_eq!(config.endpoint().unwrap().port(), 80);
    }

    #[test]
    fn test_bad_server_url() {
        let config = Config {
            server: ServerConfig {
                base_url: "https://doors.local",
            },
            ..Default::default()
        };
        assert_eq!(config.endpoint(), Err(UrlError::UnsupportedScheme));
    }
}
