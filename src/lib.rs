//! # hlld-client
//!
//! A blocking client for the hlld set-cardinality server with:
//! - Typed encoding/decoding of the line-oriented text protocol
//! - Command pipelining with strict in-order reply correlation
//! - Reconnect-on-failure connection handling
//! - Named set handles for per-set calls
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              SetHandle / SetPipeline                         │
//! │                (name-bound facade)                           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 Client / Pipeline                            │
//! │        (batch builder, mutex spans write + read-all)         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │    Codec    │          │ Connection  │
//!   │ (encode /   │◄─lines───│ (TCP, state │
//!   │  decoders)  │          │  machine)   │
//!   └─────────────┘          └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use hlld_client::{Client, CreateOptions};
//!
//! let client = Client::connect("127.0.0.1:4553")?;
//! let visitors = client.get_or_create_set("visitors", &CreateOptions::default())?;
//! visitors.add("alice")?;
//!
//! let results = visitors.pipeline().add("bob").add("carol").info().execute();
//! assert_eq!(results.len(), 3);
//! # Ok::<(), hlld_client::HlldError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod network;
pub mod pipeline;
pub mod client;
pub mod set;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{HlldError, Result, ServiceErrorKind};
pub use config::{Config, ServerAddr, DEFAULT_PORT};
pub use protocol::{Command, CommandKind, CreateOptions, Value};
pub use network::{Connection, ConnectionState};
pub use pipeline::{BatchResults, Pipeline, Slot};
pub use client::Client;
pub use set::{hash_key, SetHandle, SetPipeline};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the client library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
