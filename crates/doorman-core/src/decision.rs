//! Access decision from the user lookup response
//!
//! Anything other than a well-formed `200` for an authorized user is a denial.
//! The reason is kept so the console and the tests can tell the branches apart.

use alloc::string::String;
use core::fmt;

use log::warn;

use crate::api::UserRecord;

pub const HTTP_OK: u16 = 200;
pub const HTTP_NOT_FOUND: u16 = 404;

/// Outcome of an access check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Granted { name: String },
    Denied(DenialReason),
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }
}

/// Why access was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// The server knows the tag but its user is not authorized
    NotAuthorized,
    /// The server answered 404
    UnknownTag,
    /// The server answered with an unexpected status code
    ServerStatus(u16),
    /// The server answered 200 with a body that is not a user record
    MalformedResponse,
    /// The request never produced an HTTP response
    Transport,
    /// The Wi-Fi link was down and could not be restored
    Offline,
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAuthorized => f.write_str("user not authorized"),
            Self::UnknownTag => f.write_str("user not found"),
            Self::ServerStatus(code) => write!(f, "server returned code {}", code),
            Self::MalformedResponse => f.write_str("malformed server response"),
            Self::Transport => f.write_str("request failed"),
            Self::Offline => f.write_str("Wi-Fi not connected"),
        }
    }
}

/// Map a user lookup response to a decision.
pub fn decide(status: u16, body: &[u8]) -> AccessDecision {
    match status {
        HTTP_OK => match UserRecord::from_json(body) {
            Ok(UserRecord {
                authorized: Some(false),
                ..
            }) => AccessDecision::Denied(DenialReason::NotAuthorized),
            Ok(user) => AccessDecision::Granted { name: user.name },
            Err(e) => {
                warn!("Could not parse user record: {}", e);
                AccessDecision::Denied(DenialReason::MalformedResponse)
            }
        },
        HTTP_NOT_FOUND => AccessDecision::Denied(DenialReason::UnknownTag),
        other => AccessDecision::Denied(DenialReason::ServerStatus(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_with_name_is_granted() {
        let decision = decide(200, br#"{"name":"Ada"}"#);
        assert_eq!(
            decision,
            AccessDecision::Granted {
                name: String::from("Ada")
            }
        );
    }

    #[test]
    fn test_ok_with_authorized_true_is_granted() {
        assert!(decide(200, br#"{"name":"Ada","authorized":true}"#).is_granted());
    }

    #[test]
    fn test_ok_with_authorized_false_is_denied() {
        assert_eq!(
            decide(200, br#"{"name":"Ada","authorized":false}"#),
            AccessDecision::Denied(DenialReason::NotAuthorized)
        );
    }

    #[test]
    fn test_not_found_is_unknown_tag() {
        assert_eq!(
            decide(404, br#"{"error":"User not found"}"#),
            AccessDecision::Denied(DenialReason::UnknownTag)
        );
    }

    #[test]
    fn test_other_status_is_denied_with_code() {
        assert_eq!(
            decide(500, br#"{"error":"Database error"}"#),
            AccessDecision::Denied(DenialReason::ServerStatus(500))
        );
        assert_eq!(
            decide(302, b""),
            AccessDecision::Denied(DenialReason::ServerStatus(302))
        );
    }

    #[test]
    fn test_malformed_json_is_denied() {
        assert_eq!(
            decide(200, b"<html>oops</html>"),
            AccessDecision::Denied(DenialReason::MalformedResponse)
        );
        assert_eq!(
            decide(200, b""),
            AccessDecision::Denied(DenialReason::MalformedResponse)
        );
        assert_eq!(
            decide(200, b"null"),
            AccessDecision::Denied(DenialReason::MalformedResponse)
        );
    }

    #[test]
    fn test_ok_without_user_record_is_denied() {
        for body in [
            &b"{}"[..],
            b"[]",
            br#"{"error":"User not found"}"#,
            br#"["Eve", true]"#,
        ] {
            assert_eq!(
                decide(200, body),
                AccessDecision::Denied(DenialReason::MalformedResponse),
                "body {:?}",
                core::str::from_utf8(body)
            );
        }
    }
}
