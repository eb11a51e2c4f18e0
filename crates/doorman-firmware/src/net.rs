//! TCP connections to the access server over embassy-net

use core::net::Ipv4Addr;

use doorman_core::http::Connector;
use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::{self, ConnectError, TcpSocket};
use embassy_net::{IpAddress, Stack};
use embassy_time::Duration;
use embedded_io::{ErrorKind, ErrorType};
use embedded_io_async::{Read, Write};
use log::debug;

pub const SOCKET_BUFFER_LEN: usize = 1024;
/// Inactivity timeout for a single request
const SOCKET_TIMEOUT: Duration = Duration::from_secs(10);

fn connect_error_kind(e: ConnectError) -> ErrorKind {
    match e {
        ConnectError::TimedOut => ErrorKind::TimedOut,
        ConnectError::ConnectionReset => ErrorKind::ConnectionReset,
        ConnectError::NoRoute => ErrorKind::NotConnected,
        #[allow(unreachable_patterns)]
        _ => ErrorKind::Other,
    }
}

fn socket_error_kind(e: tcp::Error) -> ErrorKind {
    match e {
        tcp::Error::ConnectionReset => ErrorKind::ConnectionReset,
        #[allow(unreachable_patterns)]
        _ => ErrorKind::Other,
    }
}

/// Opens one TCP socket at a time on the shared stack
pub struct TcpConnector {
    stack: Stack<'static>,
    rx_buffer: [u8; SOCKET_BUFFER_LEN],
    tx_buffer: [u8; SOCKET_BUFFER_LEN],
}

impl TcpConnector {
    pub fn new(stack: Stack<'static>) -> Self {
        Self {
            stack,
            rx_buffer: [0; SOCKET_BUFFER_LEN],
            tx_buffer: [0; SOCKET_BUFFER_LEN],
        }
    }

    async fn resolve(&self, host: &str) -> Result<IpAddress, ErrorKind> {
        if let Ok(ip) = host.parse::<Ipv4Addr>() {
            return Ok(IpAddress::Ipv4(ip));
        }

        let addresses = self
            .stack
            .dns_query(host, DnsQueryType::A)
            .await
            .map_err(|e| {
                debug!("DNS lookup for {} failed: {:?}", host, e);
                ErrorKind::NotFound
            })?;
        addresses.first().copied().ok_or(ErrorKind::NotFound)
    }
}

impl Connector for TcpConnector {
    type Connection<'a>
        = TcpConnection<'a>
    where
        Self: 'a;

    async fn connect<'a>(
        &'a mut self,
        host: &str,
        port: u16,
    ) -> Result<TcpConnection<'a>, ErrorKind> {
        let address = self.resolve(host).await?;

        let mut socket = TcpSocket::new(self.stack, &mut self.rx_buffer, &mut self.tx_buffer);
        socket.set_timeout(Some(SOCKET_TIMEOUT));
        socket
            .connect((address, port))
            .await
            .map_err(connect_error_kind)?;

        Ok(TcpConnection { socket })
    }
}

/// An open TCP connection; aborted when dropped
pub struct TcpConnection<'a> {
    socket: TcpSocket<'a>,
}

impl Drop for TcpConnection<'_> {
    fn drop(&mut self) {
        self.socket.abort();
    }
}

impl ErrorType for TcpConnection<'_> {
    type Error = ErrorKind;
}

impl Read for TcpConnection<'_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
        self.socket.read(buf).await.map_err(socket_error_kind)
    }
}

impl Write for TcpConnection<'_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, ErrorKind> {
        self.socket.write(buf).await.map_err(socket_error_kind)
    }

    async fn flush(&mut self) -> Result<(), ErrorKind> {
        self.socket.flush().await.map_err(socket_error_kind)
    }
}
