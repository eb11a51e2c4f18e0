//! Boot-time clock sync over embassy-net UDP

use doorman_core::app_state::{AppError, display_message};
use doorman_core::clock::{MIN_VALID_UNIX, NTP_PACKET_LEN, NTP_PORT, NTP_SERVERS};
use doorman_core::clock::{SntpError, parse_response, request_packet};
use embassy_net::dns::DnsQueryType;
use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::Stack;
use embassy_time::{Duration, Timer, with_timeout};
use log::{debug, info, warn};
use thiserror_no_std::Error;

use crate::clock::UptimeClock;

const LOCAL_PORT: u16 = 50123;
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(2);
const RETRY_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("could not open UDP socket")]
    Bind,
    #[error("no NTP server answered")]
    NoAnswer,
    #[error("invalid NTP answer: {0}")]
    Invalid(SntpError),
}

async fn query(socket: &mut UdpSocket<'_>, stack: Stack<'static>, server: &str) -> Result<u64, SyncError> {
    let addresses = stack
        .dns_query(server, DnsQueryType::A)
        .await
        .map_err(|_| SyncError::NoAnswer)?;
    let address = addresses.first().copied().ok_or(SyncError::NoAnswer)?;

    socket
        .send_to(&request_packet(), (address, NTP_PORT))
        .await
        .map_err(|_| SyncError::NoAnswer)?;

    let mut answer = [0u8; NTP_PACKET_LEN];
    let (len, _) = with_timeout(RESPONSE_TIMEOUT, socket.recv_from(&mut answer))
        .await
        .map_err(|_| SyncError::NoAnswer)?
        .map_err(|_| SyncError::NoAnswer)?;

    parse_response(&answer[..len]).map_err(SyncError::Invalid)
}

/// Ask each configured server in turn for the current Unix time.
pub async fn sync_time(stack: Stack<'static>) -> Result<u64, SyncError> {
    let mut rx_meta = [PacketMetadata::EMPTY; 2];
    let mut tx_meta = [PacketMetadata::EMPTY; 2];
    let mut rx_buffer = [0u8; 128];
    let mut tx_buffer = [0u8; 128];

    let mut socket = UdpSocket::new(
        stack,
        &mut rx_meta,
        &mut rx_buffer,
        &mut tx_meta,
        &mut tx_buffer,
    );
    socket.bind(LOCAL_PORT).map_err(|_| SyncError::Bind)?;

    let mut last = SyncError::NoAnswer;
    for server in NTP_SERVERS {
        match query(&mut socket, stack, server).await {
            Ok(unix) => return Ok(unix),
            Err(e) => {
                debug!("NTP server {} failed: {}", server, e);
                last = e;
            }
        }
    }
    Err(last)
}

/// Retry until a plausible time is known.
pub async fn wait_for_time(stack: Stack<'static>) -> UptimeClock {
    info!("Waiting for NTP time sync");
    let mut clock = UptimeClock::new();

    loop {
        match sync_time(stack).await {
            Ok(unix) if unix > MIN_VALID_UNIX && clock.set(unix) => break,
            Ok(unix) => debug!("Ignoring implausible time {}", unix),
            Err(e) => warn!("{}", AppError::TimeSync(display_message(e))),
        }
        Timer::after(RETRY_INTERVAL).await;
    }

    info!("Time synchronized");
    clock
}
