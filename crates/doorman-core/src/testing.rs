//! Test doubles shared by the unit tests

use alloc::collections::VecDeque;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::convert::Infallible;

use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use embedded_hal_async::delay::DelayNs;
use embedded_io::{ErrorKind, ErrorType};
use embedded_io_async::{Read, Write};

use crate::http::Connector;

/// Build a response the way Express answers `res.json(...)`.
pub fn http_response(status: u16, body: &str) -> Vec<u8> {
    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    };
    format!(
        "HTTP/1.1 {} {}\r\nX-Powered-By: Express\r\nContent-Type: application/json; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    )
    .into_bytes()
}

#[derive(Default)]
struct ConnectorState {
    responses: VecDeque<Vec<u8>>,
    requests: Vec<Vec<u8>>,
    connected_to: Vec<(String, u16)>,
    refuse: bool,
}

/// Serves canned responses, one per connection, and records what was sent.
///
/// Clones share state so a test can keep a handle after moving one into a client.
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Rc<RefCell<ConnectorState>>,
}

impl MockConnector {
    pub fn new(responses: Vec<Vec<u8>>) -> Self {
        let connector = Self::default();
        connector.state.borrow_mut().responses = responses.into();
        connector
    }

    pub fn refusing() -> Self {
        let connector = Self::default();
        connector.state.borrow_mut().refuse = true;
        connector
    }

    pub fn requests(&self) -> Vec<Vec<u8>> {
        self.state.borrow().requests.clone()
    }

    pub fn connected_to(&self) -> Vec<(String, u16)> {
        self.state.borrow().connected_to.clone()
    }
}

impl Connector for MockConnector {
    type Connection<'a>
        = MockConnection
    where
        Self: 'a;

    async fn connect<'a>(&'a mut self, host: &str, port: u16) -> Result<MockConnection, ErrorKind> {
        let mut state = self.state.borrow_mut();
        if state.refuse {
            return Err(ErrorKind::ConnectionRefused);
        }
        state.connected_to.push((String::from(host), port));

        let response = state
            .responses
            .pop_front()
            .ok_or(ErrorKind::ConnectionRefused)?;
        let index = state.requests.len();
        state.requests.push(Vec::new());

        Ok(MockConnection {
            state: self.state.clone(),
            index,
            response,
            pos: 0,
        })
    }
}

pub struct MockConnection {
    state: Rc<RefCell<ConnectorState>>,
    index: usize,
    response: Vec<u8>,
    pos: usize,
}

impl ErrorType for MockConnection {
    type Error = ErrorKind;
}

impl Read for MockConnection {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
        let remaining = &self.response[self.pos..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }
}

impl Write for MockConnection {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, ErrorKind> {
        self.state.borrow_mut().requests[self.index].extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), ErrorKind> {
        Ok(())
    }
}

/// Hands out a fixed byte string a few bytes at a time.
pub struct ChunkedReader {
    data: Vec<u8>,
    pos: usize,
    chunk: usize,
    fail: Option<ErrorKind>,
}

impl ChunkedReader {
    pub fn new(data: &[u8], chunk: usize) -> Self {
        Self {
            data: data.to_vec(),
            pos: 0,
            chunk,
            fail: None,
        }
    }

    pub fn failing(kind: ErrorKind) -> Self {
        Self {
            data: Vec::new(),
            pos: 0,
            chunk: 0,
            fail: Some(kind),
        }
    }
}

impl ErrorType for ChunkedReader {
    type Error = ErrorKind;
}

impl Read for ChunkedReader {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
        if let Some(kind) = self.fail {
            return Err(kind);
        }
        let n = (self.data.len() - self.pos).min(self.chunk).min(buf.len());
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Delay that returns immediately and adds up the requested time.
#[derive(Clone, Default)]
pub struct RecordingDelay {
    elapsed_ns: Rc<Cell<u64>>,
}

impl RecordingDelay {
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns.get() / 1_000_000
    }
}

impl DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns.set(self.elapsed_ns.get() + u64::from(ns));
    }
}

/// Output pin that records every level it was driven to.
#[derive(Clone, Default)]
pub struct MockPin {
    history: Rc<RefCell<Vec<bool>>>,
}

impl MockPin {
    pub fn history(&self) -> Vec<bool> {
        self.history.borrow().clone()
    }

    pub fn is_high(&self) -> bool {
        self.history.borrow().last().copied().unwrap_or(false)
    }

    /// Number of low-to-high edges.
    pub fn rising_edges(&self) -> usize {
        let history = self.history.borrow();
        let mut level = false;
        let mut edges = 0;
        for &next in history.iter() {
            if next && !level {
                edges += 1;
            }
            level = next;
        }
        edges
    }
}

impl PinErrorType for MockPin {
    type Error = Infallible;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.history.borrow_mut().push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.history.borrow_mut().push(true);
        Ok(())
    }
}
