//! Wire contracts of the access server
//!
//! | Endpoint              | Body                                                        |
//! |-----------------------|-------------------------------------------------------------|
//! | `GET /api/user/{uid}` | response `{ "name", "authorized"? }`                        |
//! | `POST /api/log`       | request `{ "uid", "accessGranted", "timestamp", "accessPoint", "accessType" }` |
//! | `GET /api/test`       | response `{ "message" }`                                    |

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

use serde::de::Unexpected;
use serde::{Deserialize, Serialize};

/// Prefix of the user lookup path, followed by the hex UID
pub const USER_PATH_PREFIX: &str = "/api/user/";

/// Access log endpoint
pub const LOG_PATH: &str = "/api/log";

/// Diagnostic endpoint answering `{ "message": ... }`
pub const TEST_PATH: &str = "/api/test";

/// User record returned by the lookup endpoint.
///
/// Servers that predate the `authorized` flag only return `name`; a missing
/// flag means the user is allowed in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserRecord {
    pub name: String,
    #[serde(default)]
    pub authorized: Option<bool>,
}

impl UserRecord {
    /// Parse a lookup response body.
    ///
    /// Only a JSON object carrying `name` is accepted. Arrays are rejected even
    /// though serde would otherwise read them as the struct's fields in order.
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_slice(body)?;
        if !value.is_object() {
            return Err(serde::de::Error::invalid_type(
                Unexpected::Other("non-object JSON"),
                &"a user record object",
            ));
        }
        serde_json::from_value(value)
    }
}

/// Direction recorded for an access attempt at this terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    #[default]
    Entry,
    Exit,
}

impl AccessType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Entry => "entry",
            Self::Exit => "exit",
        }
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("entry") {
            Ok(Self::Entry)
        } else if s.eq_ignore_ascii_case("exit") {
            Ok(Self::Exit)
        } else {
            Err(())
        }
    }
}

/// Access log entry posted after every decided tag read
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessLogEntry<'a> {
    pub uid: &'a str,
    pub access_granted: bool,
    pub timestamp: &'a str,
    pub access_point: &'a str,
    pub access_type: AccessType,
}

impl AccessLogEntry<'_> {
    /// Encode the entry as the JSON request body.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Answer of the diagnostic endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerInfo {
    #[serde(default)]
    pub message: String,
}
