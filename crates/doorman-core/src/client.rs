//! Access server client
//!
//! Wraps the HTTP client with the two calls the terminal makes for every tag
//! (user lookup, access log) plus the diagnostic check used at boot.
//! Failures are reported, never retried.

use core::fmt::Write as _;

use log::{error, info, warn};
use thiserror_no_std::Error;

use crate::api::{AccessLogEntry, LOG_PATH, ServerInfo, TEST_PATH, USER_PATH_PREFIX};
use crate::decision::{AccessDecision, DenialReason, HTTP_OK, decide};
use crate::http::{Connector, HttpClient, HttpError, MAX_PATH_LEN, ServerEndpoint};
use crate::uid::Uid;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(HttpError),
    #[error("could not encode request body")]
    Encode,
    #[error("could not decode response body")]
    Decode,
    #[error("server returned code {0}")]
    Status(u16),
}

impl From<HttpError> for ClientError {
    fn from(e: HttpError) -> Self {
        Self::Http(e)
    }
}

pub struct AccessClient<C> {
    http: HttpClient<C>,
}

impl<C: Connector> AccessClient<C> {
    pub fn new(connector: C, endpoint: ServerEndpoint) -> Self {
        Self {
            http: HttpClient::new(connector, endpoint),
        }
    }

    pub fn endpoint(&self) -> &ServerEndpoint {
        self.http.endpoint()
    }

    /// Look the tag up on the server and decide whether to open.
    pub async fn check_access(&mut self, uid: &Uid) -> AccessDecision {
        let mut path = heapless::String::<MAX_PATH_LEN>::new();
        if write!(path, "{}{}", USER_PATH_PREFIX, uid).is_err() {
            // A 10 byte UID always fits; keep the branch total anyway.
            return AccessDecision::Denied(DenialReason::Transport);
        }

        info!("Sending GET request to: http://{}{}", self.http.endpoint(), path);

        match self.http.get(&path).await {
            Ok(response) => {
                info!("HTTP response code: {}", response.status);
                let decision = decide(response.status, response.body);
                match &decision {
                    AccessDecision::Granted { .. } => {
                        if let Ok(body) = core::str::from_utf8(response.body) {
                            info!("Response: {}", body);
                        }
                    }
                    AccessDecision::Denied(reason) => warn!("Lookup denied: {}", reason),
                }
                decision
            }
            Err(e) => {
                error!("HTTP GET failed: {}", e);
                AccessDecision::Denied(DenialReason::Transport)
            }
        }
    }

    /// Post one access log entry. Returns the status code the server answered.
    pub async fn log_access(&mut self, entry: &AccessLogEntry<'_>) -> Result<u16, ClientError> {
        let body = entry.to_json().map_err(|_| ClientError::Encode)?;

        info!("Sending POST request to: http://{}{}", self.http.endpoint(), LOG_PATH);
        if let Ok(json) = core::str::from_utf8(&body) {
            info!("JSON data: {}", json);
        }

        let response = self.http.post_json(LOG_PATH, &body).await?;
        info!("HTTP response code: {}", response.status);

        if response.is_success() {
            if let Ok(text) = core::str::from_utf8(response.body) {
                info!("Log response: {}", text);
            }
        } else {
            warn!("Server returned code: {}", response.status);
        }

        Ok(response.status)
    }

    /// Ask the diagnostic endpoint whether the server is up.
    pub async fn server_info(&mut self) -> Result<ServerInfo, ClientError> {
        let response = self.http.get(TEST_PATH).await?;
        if response.status != HTTP_OK {
            return Err(ClientError::Status(response.status));
        }
        serde_json::from_slice(response.body).map_err(|_| ClientError::Decode)
    }
}
