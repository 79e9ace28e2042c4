//! Connection
//!
//! Owns the TCP stream to one hlld server and tracks its lifecycle.

use std::io::{BufReader, BufWriter, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};

use super::Transport;
use crate::config::Config;
use crate::error::{HlldError, Result};
use crate::protocol::{read_line, LineSource};

/// Lifecycle of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

/// Buffered halves of one socket
struct Stream {
    /// TCP stream reader (buffered so replies are split into lines cheaply)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered so a batch goes out in as few writes as possible)
    writer: BufWriter<TcpStream>,
}

/// Line-oriented connection to the server
///
/// Any I/O failure drops the socket and moves the connection to
/// `Disconnected`; bytes already in flight can no longer be matched to a
/// request once that happens.
pub struct Connection {
    config: Config,
    state: ConnectionState,
    stream: Option<Stream>,
}

impl Connection {
    /// Create a connection handle. No socket is opened until `connect`.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: ConnectionState::Disconnected,
            stream: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open the socket. Idempotent while connected.
    pub fn connect(&mut self) -> Result<()> {
        if self.state == ConnectionState::Connected {
            return Ok(());
        }

        self.state = ConnectionState::Connecting;
        match self.open_stream() {
            Ok(stream) => {
                self.stream = Some(stream);
                self.state = ConnectionState::Connected;
                tracing::debug!("Connected to {}", self.config.addr);
                Ok(())
            }
            Err(e) => {
                self.stream = None;
                self.state = ConnectionState::Disconnected;
                tracing::warn!("Failed to connect to {}: {}", self.config.addr, e);
                Err(e)
            }
        }
    }

    fn open_stream(&self) -> Result<Stream> {
        let addrs: Vec<SocketAddr> = (self.config.addr.host.as_str(), self.config.addr.port)
            .to_socket_addrs()
            .map_err(|e| {
                HlldError::Connection(format!("cannot resolve {}: {}", self.config.addr, e))
            })?
            .collect();

        let mut last_err =
            HlldError::Connection(format!("no addresses found for {}", self.config.addr));
        for addr in addrs {
            match self.connect_addr(&addr) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = e,
            }
        }
        Err(last_err)
    }

    fn connect_addr(&self, addr: &SocketAddr) -> Result<Stream> {
        let stream = match self.config.connect_timeout() {
            Some(timeout) => TcpStream::connect_timeout(addr, timeout),
            None => TcpStream::connect(addr),
        }
        .map_err(|e| match HlldError::from(e) {
            HlldError::Timeout(msg) => HlldError::Timeout(format!("connect to {}: {}", addr, msg)),
            other => HlldError::Connection(format!("connect to {}: {}", addr, other)),
        })?;

        stream.set_read_timeout(self.config.read_timeout())?;
        stream.set_write_timeout(self.config.write_timeout())?;
        // Disable Nagle's algorithm; pipelined batches are flushed explicitly
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        Ok(Stream {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    fn stream_mut(&mut self) -> Result<&mut Stream> {
        match (self.state, self.stream.as_mut()) {
            (ConnectionState::Connected, Some(stream)) => Ok(stream),
            (state, _) => Err(HlldError::Connection(format!(
                "not connected (state {:?})",
                state
            ))),
        }
    }

    /// Write a batch of encoded request lines and flush it
    pub fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let stream = self.stream_mut()?;
        let outcome = stream
            .writer
            .write_all(bytes)
            .and_then(|()| stream.writer.flush());

        if let Err(e) = outcome {
            tracing::warn!("Write to {} failed: {}", self.config.addr, e);
            self.drop_stream();
            return Err(e.into());
        }
        tracing::trace!("Wrote {} bytes to {}", bytes.len(), self.config.addr);
        Ok(())
    }

    /// Read the next reply line, terminator stripped
    pub fn read_line(&mut self) -> Result<String> {
        let stream = self.stream_mut()?;
        match read_line(&mut stream.reader) {
            Ok(line) => Ok(line),
            Err(e) => {
                if e.is_fatal() {
                    tracing::warn!("Read from {} failed: {}", self.config.addr, e);
                    self.drop_stream();
                }
                Err(e)
            }
        }
    }

    /// Shut the socket down. Idempotent.
    pub fn close(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }

        self.state = ConnectionState::Closing;
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.writer.flush();
            let _ = stream.writer.get_ref().shutdown(Shutdown::Both);
        }
        self.state = ConnectionState::Disconnected;
        tracing::debug!("Closed connection to {}", self.config.addr);
    }

    fn drop_stream(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.reader.get_ref().shutdown(Shutdown::Both);
        }
        self.state = ConnectionState::Disconnected;
    }
}

impl LineSource for Connection {
    fn next_line(&mut self) -> Result<String> {
        self.read_line()
    }
}

impl Transport for Connection {
    fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    fn connect(&mut self) -> Result<()> {
        Connection::connect(self)
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        Connection::write_all(self, bytes)
    }

    fn close(&mut self) {
        Connection::close(self)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}
