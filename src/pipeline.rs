//! Pipeline Module
//!
//! Batches commands, writes them in one burst, then reads the replies back
//! in the order the commands were queued.
//!
//! ## Batch Execution
//!
//! ```text
//!   queued:   [c0, c1, c2]
//!   encode:   "create a\nset a k\ninfo a\n"   (one write, one flush)
//!   backlog:  [Ack, Ack, Info]                (FIFO)
//!   read:     Done | Done | START .. END      (one reply per backlog entry)
//!   results:  [r0, r1, r2]
//! ```
//!
//! Nothing on the wire tags a reply with its request, so the backlog order
//! is the only correlation. Once a reply fails to parse, the position in
//! the stream is lost: the connection is closed and every unresolved
//! command in the batch fails with the same error kind.

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::BytesMut;

use crate::client::Client;
use crate::error::{HlldError, Result};
use crate::network::Transport;
use crate::protocol::{encode_command, Command, CreateOptions, Decoder, Value};

static NEXT_BATCH_ID: AtomicU64 = AtomicU64::new(1);

fn next_batch_id() -> u64 {
    NEXT_BATCH_ID.fetch_add(1, Ordering::Relaxed)
}

/// Handle to one queued command's result
///
/// Remains valid when its pipeline is merged into another one: the slot is
/// resolved through the batch it was queued in, not a raw position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Slot {
    batch: u64,
    index: usize,
}

impl Slot {
    /// Position within the pipeline the command was queued on
    pub fn index(&self) -> usize {
        self.index
    }

    /// Take this slot's outcome out of a batch's results
    pub fn take(&self, results: &mut BatchResults) -> Result<Value> {
        let position = results.position(self).ok_or_else(|| {
            HlldError::InvalidArgument(format!(
                "slot {} is not part of this batch",
                self.index
            ))
        })?;
        std::mem::replace(
            &mut results.results[position],
            Err(HlldError::ResultTaken(position)),
        )
    }
}

/// Results of one executed pipeline, in queue order
///
/// Dereferences to the underlying `Vec`; `Slot::take` maps handles from
/// merged pipelines to their position.
#[derive(Debug)]
pub struct BatchResults {
    results: Vec<Result<Value>>,
    /// (batch id, offset of that batch's first command)
    segments: Vec<(u64, usize)>,
}

impl BatchResults {
    fn position(&self, slot: &Slot) -> Option<usize> {
        let (_, offset) = self.segments.iter().find(|(id, _)| *id == slot.batch)?;
        let position = offset + slot.index;
        (position < self.results.len()).then_some(position)
    }

    pub fn into_vec(self) -> Vec<Result<Value>> {
        self.results
    }
}

impl Deref for BatchResults {
    type Target = Vec<Result<Value>>;

    fn deref(&self) -> &Self::Target {
        &self.results
    }
}

impl DerefMut for BatchResults {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.results
    }
}

impl IntoIterator for BatchResults {
    type Item = Result<Value>;
    type IntoIter = std::vec::IntoIter<Result<Value>>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

/// Builder accumulating commands for a single `execute`
///
/// Queuing never touches the network. All commands go out together when
/// `execute` is called.
pub struct Pipeline {
    client: Client,
    commands: Vec<Command>,
    batch: u64,
    /// Every batch merged into this one, own batch first at offset 0
    segments: Vec<(u64, usize)>,
}

impl Pipeline {
    pub(crate) fn new(client: Client) -> Self {
        let batch = next_batch_id();
        Self {
            client,
            commands: Vec::new(),
            batch,
            segments: vec![(batch, 0)],
        }
    }

    /// Queue a command, returning the handle its result is taken with
    pub fn enqueue(&mut self, command: Command) -> Slot {
        self.commands.push(command);
        Slot {
            batch: self.batch,
            index: self.commands.len() - 1,
        }
    }

    pub fn create(&mut self, name: &str, options: &CreateOptions) -> &mut Self {
        self.enqueue(Command::create(name, options));
        self
    }

    pub fn drop_set(&mut self, name: &str) -> &mut Self {
        self.enqueue(Command::drop(name));
        self
    }

    pub fn close(&mut self, name: &str) -> &mut Self {
        self.enqueue(Command::close(name));
        self
    }

    pub fn clear(&mut self, name: &str) -> &mut Self {
        self.enqueue(Command::clear(name));
        self
    }

    pub fn add(&mut self, name: &str, key: &str) -> &mut Self {
        self.enqueue(Command::add(name, key));
        self
    }

    pub fn bulk_add<K: AsRef<str>>(&mut self, name: &str, keys: &[K]) -> &mut Self {
        self.enqueue(Command::bulk_add(name, keys.iter().map(AsRef::<str>::as_ref)));
        self
    }

    pub fn check(&mut self, name: &str, key: &str) -> &mut Self {
        self.enqueue(Command::check(name, key));
        self
    }

    pub fn bulk_check<K: AsRef<str>>(&mut self, name: &str, keys: &[K]) -> &mut Self {
        self.enqueue(Command::bulk_check(name, keys.iter().map(AsRef::<str>::as_ref)));
        self
    }

    pub fn info(&mut self, name: &str) -> &mut Self {
        self.enqueue(Command::info(name));
        self
    }

    pub fn list(&mut self, prefix: Option<&str>) -> &mut Self {
        self.enqueue(Command::list(prefix));
        self
    }

    pub fn flush(&mut self, name: Option<&str>) -> &mut Self {
        self.enqueue(Command::flush(name));
        self
    }

    /// Append another pipeline's queued commands after this one's
    ///
    /// Slots handed out by `other` keep resolving to their own commands.
    pub fn merge(&mut self, mut other: Pipeline) -> &mut Self {
        let base = self.commands.len();
        self.segments.extend(
            other
                .segments
                .iter()
                .map(|(batch, offset)| (*batch, base + offset)),
        );
        self.commands.append(&mut other.commands);
        self
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Send every queued command and collect one result per command, in
    /// queue order. The pipeline is empty afterwards and can be reused;
    /// slots from before the reuse do not resolve against later results.
    pub fn execute(&mut self) -> BatchResults {
        let commands = std::mem::take(&mut self.commands);
        let segments = std::mem::take(&mut self.segments);
        self.batch = next_batch_id();
        self.segments.push((self.batch, 0));

        BatchResults {
            results: self.client.execute_all(&commands),
            segments,
        }
    }
}

// =============================================================================
// Batch Execution
// =============================================================================

/// Run one batch against `transport`
///
/// Returns exactly `commands.len()` results, result *i* belonging to
/// command *i*. Commands that fail to encode are resolved locally and
/// never written.
pub fn execute_batch<T: Transport + ?Sized>(
    transport: &mut T,
    commands: &[Command],
    max_attempts: usize,
) -> Vec<Result<Value>> {
    let mut results: Vec<Option<Result<Value>>> = (0..commands.len()).map(|_| None).collect();
    let mut buf = BytesMut::with_capacity(commands.len() * 32);
    let mut backlog: VecDeque<(usize, Decoder)> = VecDeque::with_capacity(commands.len());

    for (idx, command) in commands.iter().enumerate() {
        match encode_command(command) {
            Ok(line) => {
                buf.extend_from_slice(line.as_bytes());
                backlog.push_back((idx, Decoder::for_command(command)));
            }
            Err(e) => {
                tracing::debug!("Command {} ({:?}) rejected: {}", idx, command.kind(), e);
                results[idx] = Some(Err(e));
            }
        }
    }

    if !backlog.is_empty() {
        tracing::debug!(
            "Flushing batch of {} commands ({} bytes)",
            backlog.len(),
            buf.len()
        );

        match send_batch(transport, &buf, max_attempts) {
            Ok(()) => drain_backlog(transport, &mut backlog, &mut results),
            Err(e) => {
                tracing::warn!("Batch of {} commands not sent: {}", backlog.len(), e);
                for (idx, _) in backlog.drain(..) {
                    results[idx] = Some(Err(e.clone()));
                }
            }
        }
    }

    results
        .into_iter()
        .map(|outcome| {
            outcome.unwrap_or_else(|| Err(HlldError::Protocol("command left unresolved".to_string())))
        })
        .collect()
}

/// Connect if needed, then write the encoded batch once
///
/// Only connecting is retried, up to `max_attempts`. A write that fails may
/// already have delivered part of the batch, so it is never replayed.
fn send_batch<T: Transport + ?Sized>(transport: &mut T, buf: &[u8], max_attempts: usize) -> Result<()> {
    let attempts = max_attempts.max(1);
    let mut attempt = 0;

    while !transport.is_connected() {
        attempt += 1;
        match transport.connect() {
            Ok(()) => break,
            Err(e) => {
                tracing::warn!("Connect attempt {}/{} failed: {}", attempt, attempts, e);
                if attempt >= attempts {
                    return Err(e);
                }
            }
        }
    }

    transport.write_all(buf).map_err(|e| {
        tracing::warn!("Write of {} bytes failed: {}", buf.len(), e);
        transport.close();
        e
    })
}

/// Resolve backlog entries in FIFO order until empty or a fatal error
fn drain_backlog<T: Transport + ?Sized>(
    transport: &mut T,
    backlog: &mut VecDeque<(usize, Decoder)>,
    results: &mut [Option<Result<Value>>],
) {
    while let Some((idx, decoder)) = backlog.pop_front() {
        match decoder.decode(transport) {
            Err(e) if e.is_fatal() => {
                tracing::warn!(
                    "Reply {} unusable, aborting {} pending commands: {}",
                    idx,
                    backlog.len(),
                    e
                );
                transport.close();
                let aborted = e.aborted();
                results[idx] = Some(Err(e));
                for (pending, _) in backlog.drain(..) {
                    results[pending] = Some(Err(aborted.clone()));
                }
                return;
            }
            outcome => results[idx] = Some(outcome),
        }
    }
}
