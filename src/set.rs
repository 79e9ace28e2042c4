//! Set handles
//!
//! A set name bound to a client, so per-set calls don't repeat the name.
//! When the client hashes keys, every key passing through a handle is
//! replaced by its SHA-1 hex digest before the command is built.

use std::borrow::Cow;
use std::collections::BTreeMap;

use sha1::{Digest, Sha1};

use crate::client::Client;
use crate::error::{HlldError, Result};
use crate::pipeline::{BatchResults, Pipeline, Slot};
use crate::protocol::Command;

/// SHA-1 hex digest of `key`, as sent when key hashing is enabled
pub fn hash_key(key: &str) -> String {
    hex::encode(Sha1::digest(key.as_bytes()))
}

fn wire_key(hash_keys: bool, key: &str) -> Cow<'_, str> {
    if hash_keys {
        Cow::Owned(hash_key(key))
    } else {
        Cow::Borrowed(key)
    }
}

/// One named set on the server
#[derive(Clone)]
pub struct SetHandle {
    client: Client,
    name: String,
}

impl SetHandle {
    pub(crate) fn new(client: Client, name: &str) -> Self {
        Self {
            client,
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn key<'a>(&self, key: &'a str) -> Cow<'a, str> {
        wire_key(self.client.hash_keys(), key)
    }

    pub fn add(&self, key: &str) -> Result<()> {
        self.client
            .execute(Command::add(&*self.name, self.key(key)))?
            .into_unit()
    }

    /// Add several keys; one flag per key, in input order
    pub fn bulk_add<K: AsRef<str>>(&self, keys: &[K]) -> Result<Vec<bool>> {
        let command = Command::bulk_add(&*self.name, keys.iter().map(|k| self.key(k.as_ref())));
        self.client.execute(command)?.into_bools()
    }

    pub fn check(&self, key: &str) -> Result<bool> {
        self.client
            .execute(Command::check(&*self.name, self.key(key)))?
            .into_bool()
    }

    /// Check several keys; one flag per key, in input order
    pub fn bulk_check<K: AsRef<str>>(&self, keys: &[K]) -> Result<Vec<bool>> {
        let command = Command::bulk_check(&*self.name, keys.iter().map(|k| self.key(k.as_ref())));
        self.client.execute(command)?.into_bools()
    }

    pub fn info(&self) -> Result<BTreeMap<String, String>> {
        self.client.execute(Command::info(&*self.name))?.into_info()
    }

    /// Estimated cardinality, from the `size` info field
    pub fn size(&self) -> Result<u64> {
        let info = self.info()?;
        let size = info
            .get("size")
            .ok_or_else(|| HlldError::Protocol("info block has no size field".to_string()))?;
        size.parse()
            .map_err(|_| HlldError::Protocol(format!("size '{}' is not a number", size)))
    }

    pub fn flush(&self) -> Result<()> {
        self.client.execute(Command::flush(Some(self.name.as_str())))?.into_unit()
    }

    /// Delete the set permanently
    pub fn drop(&self) -> Result<()> {
        self.client.execute(Command::drop(&*self.name))?.into_unit()
    }

    pub fn close(&self) -> Result<()> {
        self.client.execute(Command::close(&*self.name))?.into_unit()
    }

    pub fn clear(&self) -> Result<()> {
        self.client.execute(Command::clear(&*self.name))?.into_unit()
    }

    /// Start a pipeline bound to this set
    pub fn pipeline(&self) -> SetPipeline {
        SetPipeline {
            name: self.name.clone(),
            hash_keys: self.client.hash_keys(),
            inner: self.client.pipeline(),
        }
    }
}

/// Chainable pipeline whose commands all target one set
pub struct SetPipeline {
    name: String,
    hash_keys: bool,
    inner: Pipeline,
}

impl SetPipeline {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add(&mut self, key: &str) -> &mut Self {
        let key = wire_key(self.hash_keys, key);
        self.inner.add(&self.name, &key);
        self
    }

    pub fn bulk_add<K: AsRef<str>>(&mut self, keys: &[K]) -> &mut Self {
        let hash_keys = self.hash_keys;
        let keys = keys.iter().map(|k| wire_key(hash_keys, k.as_ref()));
        self.inner.enqueue(Command::bulk_add(&*self.name, keys));
        self
    }

    pub fn check(&mut self, key: &str) -> &mut Self {
        let key = wire_key(self.hash_keys, key);
        self.inner.check(&self.name, &key);
        self
    }

    pub fn bulk_check<K: AsRef<str>>(&mut self, keys: &[K]) -> &mut Self {
        let hash_keys = self.hash_keys;
        let keys = keys.iter().map(|k| wire_key(hash_keys, k.as_ref()));
        self.inner.enqueue(Command::bulk_check(&*self.name, keys));
        self
    }

    pub fn info(&mut self) -> &mut Self {
        self.inner.info(&self.name);
        self
    }

    pub fn flush(&mut self) -> &mut Self {
        self.inner.flush(Some(self.name.as_str()));
        self
    }

    pub fn drop(&mut self) -> &mut Self {
        self.inner.drop_set(&self.name);
        self
    }

    pub fn close(&mut self) -> &mut Self {
        self.inner.close(&self.name);
        self
    }

    pub fn clear(&mut self) -> &mut Self {
        self.inner.clear(&self.name);
        self
    }

    /// Queue an arbitrary command, which may target another set. Keys are
    /// sent exactly as given.
    pub fn enqueue(&mut self, command: Command) -> Slot {
        self.inner.enqueue(command)
    }

    /// Append another set pipeline's commands after this one's
    pub fn merge(&mut self, other: SetPipeline) -> &mut Self {
        self.inner.merge(other.inner);
        self
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Send every queued command; one result per command, in queue order
    pub fn execute(&mut self) -> BatchResults {
        self.inner.execute()
    }
}
