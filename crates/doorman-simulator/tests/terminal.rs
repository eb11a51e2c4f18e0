//! Runs the terminal loop against an in-process fake access server.

use std::io::{BufRead, BufReader, Cursor, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use doorman_core::api::AccessType;
use doorman_core::client::AccessClient;
use doorman_core::decision::{AccessDecision, DenialReason};
use doorman_core::http::ServerEndpoint;
use doorman_core::link::AlwaysUp;
use doorman_core::terminal::{AccessTerminal, TerminalIdentity};
use doorman_simulator::{ConsoleIndicator, ScriptedReader, StdConnector, StdDelay, SystemClock};
use embassy_futures::block_on;

#[derive(Debug, Clone)]
struct Request {
    method: String,
    path: String,
    body: String,
}

fn read_request(stream: &mut TcpStream) -> Request {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).unwrap();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap();
            }
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).unwrap();

    Request {
        method,
        path,
        body: String::from_utf8(body).unwrap(),
    }
}

/// Answers the way the Express access server does.
fn route(request: &Request) -> (u16, &'static str) {
    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/api/user/0AB304FF") => (200, r#"{"name":"Ada Lovelace"}"#),
        ("GET", "/api/user/11223344") => (200, r#"{"name":"Blocked","authorized":false}"#),
        ("GET", "/api/user/CAFEBABE") => (500, r#"{"error":"Database error"}"#),
        ("GET", "/api/user/01020304") => (200, "<html>oops</html>"),
        ("GET", path) if path.starts_with("/api/user/") => (404, r#"{"error":"User not found"}"#),
        ("POST", "/api/log") => (200, r#"{"status":"success","id":1}"#),
        _ => (404, r#"{"error":"Not found"}"#),
    }
}

/// Serve `connections` requests, then return everything that was received.
fn spawn_server(connections: usize) -> (ServerEndpoint, JoinHandle<Vec<Request>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let endpoint = ServerEndpoint::parse(&format!("http://127.0.0.1:{port}")).unwrap();

    let received = Arc::new(Mutex::new(Vec::new()));
    let handle = {
        let received = received.clone();
        thread::spawn(move || {
            for stream in listener.incoming().take(connections) {
                let mut stream = stream.unwrap();
                let request = read_request(&mut stream);
                let (status, body) = route(&request);
                let reason = match status {
                    200 => "OK",
                    404 => "Not Found",
                    _ => "Internal Server Error",
                };
                write!(
                    stream,
                    "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                )
                .unwrap();
                received.lock().unwrap().push(request);
            }
            received.lock().unwrap().clone()
        })
    };

    (endpoint, handle)
}

type Terminal = AccessTerminal<
    'static,
    ScriptedReader<Cursor<&'static str>>,
    StdConnector,
    ConsoleIndicator,
    AlwaysUp,
    SystemClock,
    StdDelay,
>;

fn terminal(input: &'static str, endpoint: ServerEndpoint) -> Terminal {
    AccessTerminal::new(
        ScriptedReader::new(Cursor::new(input)),
        AccessClient::new(StdConnector::default(), endpoint),
        ConsoleIndicator::default(),
        AlwaysUp,
        SystemClock,
        StdDelay,
        TerminalIdentity {
            access_point: "Main Entrance",
            access_type: AccessType::Entry,
        },
    )
}

#[test]
fn decisions_for_each_server_answer() {
    // Five lookups plus five log entries.
    let (endpoint, server) = spawn_server(10);
    let mut terminal = terminal(
        "0AB304FF\n11223344\nDEADBEEF\nCAFEBABE\n01020304\n",
        endpoint,
    );

    let mut decisions = Vec::new();
    while let Some(outcome) = block_on(terminal.poll_once()) {
        assert_eq!(outcome.logged, Some(200));
        decisions.push(outcome.decision);
    }

    assert_eq!(
        decisions,
        vec![
            AccessDecision::Granted {
                name: "Ada Lovelace".to_string()
            },
            AccessDecision::Denied(DenialReason::NotAuthorized),
            AccessDecision::Denied(DenialReason::UnknownTag),
            AccessDecision::Denied(DenialReason::ServerStatus(500)),
            AccessDecision::Denied(DenialReason::MalformedResponse),
        ]
    );
    assert_eq!(terminal.feedback().granted, 1);
    assert_eq!(terminal.feedback().denied, 4);

    let requests = server.join().unwrap();
    let logs: Vec<&Request> = requests.iter().filter(|r| r.method == "POST").collect();
    assert_eq!(logs.len(), 5);
    assert!(logs.iter().all(|r| r.path == "/api/log"));
    assert!(logs[0].body.starts_with(r#"{"uid":"0AB304FF","accessGranted":true,"timestamp":""#));
    assert!(logs[0].body.ends_with(r#"","accessPoint":"Main Entrance","accessType":"entry"}"#));
    assert!(logs[2].body.contains(r#""uid":"DEADBEEF","accessGranted":false"#));
}

#[test]
fn unreachable_server_denies_without_logging() {
    // Bind and drop a listener so the port is closed.
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let endpoint = ServerEndpoint::parse(&format!("http://127.0.0.1:{port}")).unwrap();
    let mut terminal = terminal("0AB304FF\n", endpoint);

    let outcome = block_on(terminal.poll_once()).unwrap();
    assert_eq!(
        outcome.decision,
        AccessDecision::Denied(DenialReason::Transport)
    );
    assert_eq!(outcome.logged, None);
    assert_eq!(terminal.feedback().denied, 1);
}
