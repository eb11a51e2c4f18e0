use core::fmt;

use thiserror_no_std::Error;

/// Longest host name accepted in the server URL
pub const MAX_HOST_LEN: usize = 64;

const DEFAULT_HTTP_PORT: u16 = 80;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlError {
    #[error("only http:// server URLs are supported")]
    UnsupportedScheme,
    #[error("server URL has no host")]
    MissingHost,
    #[error("server host is longer than 64 characters")]
    HostTooLong,
    #[error("server port is not a number between 1 and 65535")]
    InvalidPort,
    #[error("server URL must not contain a path")]
    UnexpectedPath,
}

/// Base URL of the access server, e.g. `http://192.168.100.4:3000`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEndpoint {
    host: heapless::String<MAX_HOST_LEN>,
    port: u16,
}

impl ServerEndpoint {
    /// Parse a base URL. A single trailing slash is tolerated.
    pub fn parse(url: &str) -> Result<Self, UrlError> {
        let rest = url
            .trim()
            .strip_prefix("http://")
            .ok_or(UrlError::UnsupportedScheme)?;
        let rest = rest.strip_suffix('/').unwrap_or(rest);

        if rest.contains('/') {
            return Err(UrlError::UnexpectedPath);
        }

        let (host, port) = match rest.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| UrlError::InvalidPort)?;
                (host, port)
            }
            None => (rest, DEFAULT_HTTP_PORT),
        };

        if host.is_empty() {
            return Err(UrlError::MissingHost);
        }
        if port == 0 {
            return Err(UrlError::InvalidPort);
        }

        let host = heapless::String::try_from(host).map_err(|_| UrlError::HostTooLong)?;

        Ok(Self { host, port })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub const fn port(&self) -> u16 {
        self.port
    }
}

/// Renders the value of the `Host` header (port omitted when it is 80).
impl fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.port == DEFAULT_HTTP_PORT {
            f.write_str(&self.host)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
