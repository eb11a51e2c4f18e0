//! Minimal HTTP/1.1 client
//!
//! Only what the access server needs: one request per connection
//! (`Connection: close`), `GET` and `POST` with a JSON body, and responses
//! framed by `Content-Length` or by the server closing the connection.
//! The whole response is read into a fixed buffer owned by the client.

mod endpoint;
mod response;

pub use endpoint::*;
pub use response::*;

use core::fmt::Write as _;
use core::future::Future;

use embedded_io::{Error as _, ErrorKind};
use embedded_io_async::{Read, Write};
use thiserror_no_std::Error;

/// Size of the buffer holding the response head and body
pub const RESPONSE_BUFFER_LEN: usize = 1024;

/// Capacity of the request head (request line plus headers)
pub const REQUEST_HEAD_LEN: usize = 320;

/// Longest request path the client builds
pub const MAX_PATH_LEN: usize = 96;

const USER_AGENT: &str = concat!("doorman/", env!("CARGO_PKG_VERSION"));

/// Opens a byte stream to the server.
///
/// The firmware implements this over an embassy-net TCP socket, the simulator
/// over `std::net::TcpStream`.
pub trait Connector {
    type Connection<'a>: Read + Write
    where
        Self: 'a;

    /// Resolve `host` and open a connection to `host:port`.
    fn connect<'a>(
        &'a mut self,
        host: &str,
        port: u16,
    ) -> impl Future<Output = Result<Self::Connection<'a>, ErrorKind>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpError {
    #[error("connection failed: {0:?}")]
    Connect(ErrorKind),
    #[error("sending request failed: {0:?}")]
    Write(ErrorKind),
    #[error("reading response failed: {0:?}")]
    Read(ErrorKind),
    #[error("request does not fit the request buffer")]
    RequestTooLarge,
    #[error("response does not fit the response buffer")]
    ResponseTooLarge,
    #[error("malformed HTTP response")]
    Malformed,
    #[error("response ended before the announced body length")]
    Truncated,
    #[error("chunked transfer encoding is not supported")]
    UnsupportedEncoding,
}

/// A response whose body borrows the client's buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response<'b> {
    pub status: u16,
    pub body: &'b [u8],
}

impl Response<'_> {
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

pub struct HttpClient<C> {
    connector: C,
    endpoint: ServerEndpoint,
    buffer: [u8; RESPONSE_BUFFER_LEN],
}

impl<C: Connector> HttpClient<C> {
    pub fn new(connector: C, endpoint: ServerEndpoint) -> Self {
        Self {
            connector,
            endpoint,
            buffer: [0; RESPONSE_BUFFER_LEN],
        }
    }

    pub fn endpoint(&self) -> &ServerEndpoint {
        &self.endpoint
    }

    pub async fn get(&mut self, path: &str) -> Result<Response<'_>, HttpError> {
        self.request(Method::Get, path, None).await
    }

    pub async fn post_json(&mut self, path: &str, body: &[u8]) -> Result<Response<'_>, HttpError> {
        self.request(Method::Post, path, Some(body)).await
    }

    /// Send one request on a fresh connection and read the full response.
    pub async fn request(
        &mut self,
        method: Method,
        path: &str,
        body: Option<&[u8]>,
    ) -> Result<Response<'_>, HttpError> {
        let mut head = heapless::String::<REQUEST_HEAD_LEN>::new();
        write_request_head(&mut head, method, path, &self.endpoint, body.map(<[u8]>::len))?;

        let mut conn = self
            .connector
            .connect(self.endpoint.host(), self.endpoint.port())
            .await
            .map_err(HttpError::Connect)?;

        send(&mut conn, head.as_bytes()).await?;
        if let Some(body) = body {
            send(&mut conn, body).await?;
        }
        conn.flush().await.map_err(|e| HttpError::Write(e.kind()))?;

        let (status, body_range) = read_response(&mut conn, &mut self.buffer).await?;
        drop(conn);

        Ok(Response {
            status,
            body: &self.buffer[body_range],
        })
    }
}

async fn send<W: Write>(conn: &mut W, mut data: &[u8]) -> Result<(), HttpError> {
    while !data.is_empty() {
        let n = conn
            .write(data)
            .await
            .map_err(|e| HttpError::Write(e.kind()))?;
        if n == 0 {
            return Err(HttpError::Write(ErrorKind::WriteZero));
        }
        data = &data[n..];
    }
    Ok(())
}

fn write_request_head<const N: usize>(
    head: &mut heapless::String<N>,
    method: Method,
    path: &str,
    endpoint: &ServerEndpoint,
    content_length: Option<usize>,
) -> Result<(), HttpError> {
    write!(
        head,
        "{} {} HTTP/1.1\r\nHost: {}\r\nUser-Agent: {}\r\nAccept: application/json\r\nConnection: close\r\n",
        method.as_str(),
        path,
        endpoint,
        USER_AGENT
    )
    .map_err(|_| HttpError::RequestTooLarge)?;

    if let Some(len) = content_length {
        write!(
            head,
            "Content-Type: application/json\r\nContent-Length: {}\r\n",
            len
        )
        .map_err(|_| HttpError::RequestTooLarge)?;
    }

    head.push_str("\r\n")
        .map_err(|_| HttpError::RequestTooLarge)
}
