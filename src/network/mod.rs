//! Network Module
//!
//! Line I/O to the server.
//!
//! ## Architecture
//! - `Connection` owns one TCP stream and its lifecycle state
//! - `Transport` is the seam the pipeline executes batches against

mod connection;

pub use connection::{Connection, ConnectionState};

use crate::error::Result;
use crate::protocol::LineSource;

/// Byte-stream collaborator used by the pipeline
///
/// Implementations must fail writes while disconnected instead of
/// dropping them.
pub trait Transport: LineSource {
    fn is_connected(&self) -> bool;

    /// Open the stream if it is not already open
    fn connect(&mut self) -> Result<()>;

    /// Write a whole batch of encoded request lines
    fn write_all(&mut self, bytes: &[u8]) -> Result<()>;

    /// Tear the stream down; the next batch reconnects
    fn close(&mut self);
}
