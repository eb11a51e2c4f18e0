//! The access terminal polling loop
//!
//! One pass: read a tag, make sure the link is up, ask the server, log the
//! attempt, give feedback, halt the tag. Everything runs in sequence; a
//! failure anywhere after the read ends in a denial.

use embedded_hal_async::delay::DelayNs;
use log::{debug, error, info, warn};

use crate::api::{AccessLogEntry, AccessType};
use crate::client::AccessClient;
use crate::clock::{Clock, current_timestamp};
use crate::config::TerminalConfig;
use crate::decision::{AccessDecision, DenialReason};
use crate::feedback::Feedback;
use crate::http::Connector;
use crate::link::{Link, ensure_link};
use crate::reader::TagReader;
use crate::uid::Uid;

/// Pause after a handled tag so it is not read twice
pub const READ_COOLDOWN_MS: u32 = 1000;
/// Pause between polls of an empty field
pub const IDLE_POLL_MS: u32 = 50;

/// Where this terminal sits, as reported in access log entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalIdentity<'a> {
    pub access_point: &'a str,
    pub access_type: AccessType,
}

impl<'a> From<&TerminalConfig<'a>> for TerminalIdentity<'a> {
    fn from(config: &TerminalConfig<'a>) -> Self {
        Self {
            access_point: config.access_point,
            access_type: config.access_type,
        }
    }
}

/// Result of one handled tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessOutcome {
    pub uid: Uid,
    pub decision: AccessDecision,
    /// Status code the log endpoint answered, `None` if nothing was logged
    pub logged: Option<u16>,
}

pub struct AccessTerminal<'a, R, C, F, L, K, D> {
    reader: R,
    client: AccessClient<C>,
    feedback: F,
    link: L,
    clock: K,
    delay: D,
    identity: TerminalIdentity<'a>,
}

impl<'a, R, C, F, L, K, D> AccessTerminal<'a, R, C, F, L, K, D>
where
    R: TagReader,
    C: Connector,
    F: Feedback,
    L: Link,
    K: Clock,
    D: DelayNs,
{
    pub fn new(
        reader: R,
        client: AccessClient<C>,
        feedback: F,
        link: L,
        clock: K,
        delay: D,
        identity: TerminalIdentity<'a>,
    ) -> Self {
        Self {
            reader,
            client,
            feedback,
            link,
            clock,
            delay,
            identity,
        }
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn client(&self) -> &AccessClient<C> {
        &self.client
    }

    pub fn feedback(&self) -> &F {
        &self.feedback
    }

    pub fn identity(&self) -> TerminalIdentity<'a> {
        self.identity
    }

    /// Handle at most one tag. Returns `None` when no tag was read.
    pub async fn poll_once(&mut self) -> Option<AccessOutcome> {
        let uid = match self.reader.poll().await {
            Ok(Some(uid)) => uid,
            Ok(None) => {
                debug!("No card present");
                return None;
            }
            Err(e) => {
                warn!("Failed to read card: {}", e);
                return None;
            }
        };
        info!("Card UID: {}", uid);

        let (decision, logged) = if ensure_link(&mut self.link, &mut self.delay).await {
            let decision = self.client.check_access(&uid).await;
            let logged = self.log(&uid, decision.is_granted()).await;
            (decision, logged)
        } else {
            error!("WiFi not connected");
            (AccessDecision::Denied(DenialReason::Offline), None)
        };

        let signalled = match &decision {
            AccessDecision::Granted { name } => {
                info!("Access granted for: {}", name);
                self.feedback.granted().await
            }
            AccessDecision::Denied(reason) => {
                warn!("Access denied: {}", reason);
                self.feedback.denied().await
            }
        };
        if let Err(e) = signalled {
            warn!("Feedback failed: {}", e);
        }

        if let Err(e) = self.reader.halt().await {
            debug!("Halting card failed: {}", e);
        }

        Some(AccessOutcome {
            uid,
            decision,
            logged,
        })
    }

    /// Post the access log entry. Failures are reported and dropped.
    async fn log(&mut self, uid: &Uid, granted: bool) -> Option<u16> {
        let hex = uid.to_hex();
        let timestamp = current_timestamp(&self.clock);
        if timestamp.is_empty() {
            warn!("Time not known, logging without timestamp");
        }

        let entry = AccessLogEntry {
            uid: &hex,
            access_granted: granted,
            timestamp: &timestamp,
            access_point: self.identity.access_point,
            access_type: self.identity.access_type,
        };

        match self.client.log_access(&entry).await {
            Ok(status) => Some(status),
            Err(e) => {
                error!("Error sending access log: {}", e);
                None
            }
        }
    }

    /// Poll forever.
    pub async fn run(&mut self) -> ! {
        info!(
            "Ready, scan an RFID card ({} / {})",
            self.identity.access_point, self.identity.access_type
        );
        loop {
            let pause = match self.poll_once().await {
                Some(_) => READ_COOLDOWN_MS,
                None => IDLE_POLL_MS,
            };
            self.delay.delay_ms(pause).await;
        }
    }
}
