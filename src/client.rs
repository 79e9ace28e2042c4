//! Client
//!
//! Entry point for talking to an hlld server.
//!
//! ## Concurrency Model
//!
//! One `Connection` per client, shared by all clones behind a mutex. The
//! lock is held for a whole batch (every write, then every read), never per
//! line: interleaving two batches on one stream would pair replies with the
//! wrong requests.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::{Config, ServerAddr};
use crate::error::{HlldError, Result, ServiceErrorKind};
use crate::network::{Connection, ConnectionState};
use crate::pipeline::{execute_batch, Pipeline};
use crate::protocol::{Command, CreateOptions, Value};
use crate::set::SetHandle;

/// Handle to one hlld server. Cheap to clone; clones share the connection.
#[derive(Clone)]
pub struct Client {
    connection: Arc<Mutex<Connection>>,
    max_attempts: usize,
    hash_keys: bool,
}

impl Client {
    /// Create a client for `"host"` or `"host:port"` with default settings
    /// and connect right away.
    pub fn connect(server: &str) -> Result<Self> {
        let addr: ServerAddr = server.parse()?;
        let client = Self::with_config(Config::builder().addr(addr).build());
        client.ensure_connected()?;
        Ok(client)
    }

    /// Create a client with a custom configuration. The connection is
    /// opened lazily by the first command.
    pub fn with_config(config: Config) -> Self {
        let max_attempts = config.max_attempts;
        let hash_keys = config.hash_keys;
        Self {
            connection: Arc::new(Mutex::new(Connection::new(config))),
            max_attempts,
            hash_keys,
        }
    }

    /// Open the connection now instead of on first use
    pub fn ensure_connected(&self) -> Result<()> {
        self.connection.lock().connect()
    }

    /// Whether set handles send SHA-1 digests instead of raw keys
    pub fn hash_keys(&self) -> bool {
        self.hash_keys
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.lock().state()
    }

    /// Close the connection. The next command reconnects.
    pub fn close(&self) {
        self.connection.lock().close();
    }

    // =========================================================================
    // Execution
    // =========================================================================

    /// Run a single command and return its result
    pub fn execute(&self, command: Command) -> Result<Value> {
        let mut results = self.execute_all(std::slice::from_ref(&command));
        results
            .pop()
            .unwrap_or_else(|| Err(HlldError::Protocol("no result for command".to_string())))
    }

    /// Run a batch as one pipelined burst; one result per command, in order
    pub fn execute_all(&self, commands: &[Command]) -> Vec<Result<Value>> {
        if commands.is_empty() {
            return Vec::new();
        }
        let mut connection = self.connection.lock();
        execute_batch(&mut *connection, commands, self.max_attempts)
    }

    /// Start an empty pipeline on this client
    pub fn pipeline(&self) -> Pipeline {
        Pipeline::new(self.clone())
    }

    // =========================================================================
    // Server-wide operations
    // =========================================================================

    /// Create a set and return a handle to it
    pub fn create_set(&self, name: &str, options: &CreateOptions) -> Result<SetHandle> {
        self.execute(Command::create(name, options))?.into_unit()?;
        Ok(self.set(name))
    }

    /// Like `create_set`, but an already existing set is not an error
    pub fn get_or_create_set(&self, name: &str, options: &CreateOptions) -> Result<SetHandle> {
        match self.create_set(name, options) {
            Err(e) if e.service_kind() == Some(ServiceErrorKind::SetExists) => {
                tracing::debug!("Set {} already exists", name);
                Ok(self.set(name))
            }
            other => other,
        }
    }

    /// Handle for an existing set. Does not contact the server.
    pub fn set(&self, name: &str) -> SetHandle {
        SetHandle::new(self.clone(), name)
    }

    pub fn drop_set(&self, name: &str) -> Result<()> {
        self.execute(Command::drop(name))?.into_unit()
    }

    /// Names of every set on the server
    pub fn list_sets(&self) -> Result<Vec<String>> {
        self.execute(Command::list(None))?.into_list()
    }

    /// Names of sets starting with `prefix`
    pub fn list_sets_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.execute(Command::list(Some(prefix)))?.into_list()
    }

    pub fn set_exists(&self, name: &str) -> Result<bool> {
        let names = self.list_sets_with_prefix(name)?;
        Ok(names.iter().any(|n| n == name))
    }

    /// Flush every set to disk
    pub fn flush_all(&self) -> Result<()> {
        self.execute(Command::flush(None))?.into_unit()
    }
}
