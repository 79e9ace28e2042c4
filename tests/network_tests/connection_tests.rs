//! Tests for Connection
//!
//! These tests verify:
//! - Connection lifecycle (connect, close, idempotence)
//! - Writes are rejected while disconnected
//! - Read timeouts and server hang-ups drop the connection

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use hlld_client::network::{Connection, ConnectionState, Transport};
use hlld_client::{Config, HlldError, ServerAddr};

// =============================================================================
// Helper Functions
// =============================================================================

fn config_for(port: u16) -> Config {
    Config::builder()
        .addr(ServerAddr::new("127.0.0.1", port))
        .connect_timeout_ms(1000)
        .read_timeout_ms(200)
        .write_timeout_ms(1000)
        .build()
}

/// Accepts one connection, echoes each request line back prefixed with
/// `got `, then hangs up after `replies` lines.
fn spawn_echo_server(replies: usize) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();

    thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        let mut writer = stream.try_clone().expect("clone");
        let mut reader = BufReader::new(stream);
        for _ in 0..replies {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap_or(0) == 0 {
                return;
            }
            let _ = writer.write_all(format!("got {}", line).as_bytes());
        }
    });

    port
}

/// Accepts one connection and never answers
fn spawn_silent_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();

    thread::spawn(move || {
        let (_stream, _) = listener.accept().expect("accept");
        thread::sleep(Duration::from_secs(2));
    });

    port
}

fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("addr").port()
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_new_connection_is_disconnected() {
    let conn = Connection::new(config_for(unused_port()));
    assert_eq!(conn.state(), ConnectionState::Disconnected);
    assert!(!conn.is_connected());
}

#[test]
fn test_connect_is_idempotent() {
    let port = spawn_echo_server(1);
    let mut conn = Connection::new(config_for(port));

    conn.connect().unwrap();
    conn.connect().unwrap();
    assert_eq!(conn.state(), ConnectionState::Connected);

    conn.write_all(b"list\n").unwrap();
    assert_eq!(conn.read_line().unwrap(), "got list");
}

#[test]
fn test_connect_refused() {
    let mut conn = Connection::new(config_for(unused_port()));

    let result = conn.connect();
    assert!(matches!(result, Err(HlldError::Connection(_))));
    assert_eq!(conn.state(), ConnectionState::Disconnected);
}

#[test]
fn test_close_is_idempotent() {
    let port = spawn_echo_server(0);
    let mut conn = Connection::new(config_for(port));
    conn.connect().unwrap();

    conn.close();
    assert_eq!(conn.state(), ConnectionState::Disconnected);
    conn.close();
    assert_eq!(conn.state(), ConnectionState::Disconnected);
}

// =============================================================================
// I/O Tests
// =============================================================================

#[test]
fn test_write_rejected_while_disconnected() {
    let mut conn = Connection::new(config_for(unused_port()));

    let result = conn.write_all(b"list\n");
    assert!(matches!(result, Err(HlldError::Connection(_))));
    assert!(matches!(conn.read_line(), Err(HlldError::Connection(_))));
}

#[test]
fn test_batch_write_then_read_in_order() {
    let port = spawn_echo_server(3);
    let mut conn = Connection::new(config_for(port));
    conn.connect().unwrap();

    conn.write_all(b"set s a\nset s b\nset s c\n").unwrap();
    assert_eq!(conn.read_line().unwrap(), "got set s a");
    assert_eq!(conn.read_line().unwrap(), "got set s b");
    assert_eq!(conn.read_line().unwrap(), "got set s c");
}

#[test]
fn test_read_timeout_disconnects() {
    let port = spawn_silent_server();
    let mut conn = Connection::new(config_for(port));
    conn.connect().unwrap();

    conn.write_all(b"info s\n").unwrap();
    let result = conn.read_line();
    assert!(matches!(result, Err(HlldError::Timeout(_))));
    assert_eq!(conn.state(), ConnectionState::Disconnected);
}

#[test]
fn test_server_hangup_disconnects() {
    let port = spawn_echo_server(1);
    let mut conn = Connection::new(config_for(port));
    conn.connect().unwrap();

    conn.write_all(b"flush\n").unwrap();
    assert_eq!(conn.read_line().unwrap(), "got flush");

    let result = conn.read_line();
    assert!(matches!(result, Err(HlldError::Connection(_))));
    assert_eq!(conn.state(), ConnectionState::Disconnected);
}
