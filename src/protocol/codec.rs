//! Protocol codec
//!
//! Encoding of commands into request lines and decoding of reply lines
//! into typed values.
//!
//! ## Wire Format
//!
//! ### Request
//! ```text
//! <verb> [<set>] [<arg> ...]\n
//! ```
//!
//! ### Replies
//! ```text
//! Done\n                         acknowledgement
//! Yes\n | No\n                   single check
//! Yes No Yes\n                   bulk results, one token per key
//! START\n<line>\n...END\n        info / list block
//! Set does not exist\n           error line
//! ```

use std::collections::BTreeMap;
use std::io::BufRead;

use super::response::{self, service_error, Value};
use super::{Command, CommandKind};
use crate::error::{HlldError, Result};

// =============================================================================
// Command Encoding
// =============================================================================

/// Encode a command into its request line, newline included
///
/// Fails with `InvalidArgument` when a name or key would break the line
/// framing, or when the command was built from conflicting options.
pub fn encode_command(command: &Command) -> Result<String> {
    if let Some(reason) = command.invalid_reason() {
        return Err(HlldError::InvalidArgument(reason.to_string()));
    }

    let kind = command.kind();
    let mut line = String::with_capacity(64);
    line.push_str(kind.verb());

    match (kind, command.target()) {
        (_, Some(target)) => {
            check_token("set name", target)?;
            line.push(' ');
            line.push_str(target);
        }
        (CommandKind::List, None) | (CommandKind::Flush, None) => {}
        (_, None) => {
            return Err(HlldError::InvalidArgument(format!(
                "{} requires a set name",
                kind.verb()
            )))
        }
    }

    if command.args().is_empty() && matches!(kind, CommandKind::BulkAdd | CommandKind::BulkCheck) {
        return Err(HlldError::InvalidArgument(format!(
            "{} requires at least one key",
            kind.verb()
        )));
    }

    for arg in command.args() {
        check_token("argument", arg)?;
        line.push(' ');
        line.push_str(arg);
    }

    line.push('\n');
    Ok(line)
}

/// Names and keys travel space-separated on a single line
fn check_token(what: &str, token: &str) -> Result<()> {
    if token.is_empty() {
        return Err(HlldError::InvalidArgument(format!("empty {}", what)));
    }
    if token.chars().any(char::is_whitespace) {
        return Err(HlldError::InvalidArgument(format!(
            "{} '{}' contains whitespace",
            what,
            token.escape_debug()
        )));
    }
    Ok(())
}

// =============================================================================
// Line Sources
// =============================================================================

/// Anything replies can be pulled from one line at a time
pub trait LineSource {
    /// Next line with its terminator stripped
    fn next_line(&mut self) -> Result<String>;
}

impl<R: BufRead> LineSource for R {
    fn next_line(&mut self) -> Result<String> {
        read_line(self)
    }
}

/// Read one `\n`-terminated line, stripping `\n` or `\r\n`
pub fn read_line<R: BufRead + ?Sized>(reader: &mut R) -> Result<String> {
    let mut buf = Vec::with_capacity(64);
    let bytes = reader.read_until(b'\n', &mut buf)?;
    if bytes == 0 {
        return Err(HlldError::Connection("connection closed by server".to_string()));
    }
    if buf.last() != Some(&b'\n') {
        return Err(HlldError::Connection(
            "connection closed in the middle of a reply".to_string(),
        ));
    }
    buf.pop();
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }

    String::from_utf8(buf).map_err(|_| HlldError::Protocol("reply is not valid UTF-8".to_string()))
}

// =============================================================================
// Response Decoding
// =============================================================================

/// How to read the reply to one command
///
/// Chosen from the command kind when the command is queued, so the reply
/// shape is never guessed from the bytes on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
    /// One `Done` line
    Ack,
    /// One line of per-key tokens, or `Done`
    BulkAck { keys: usize },
    /// One `Yes`/`No` line
    Check,
    /// One line of `Yes`/`No` tokens
    BulkCheck { keys: usize },
    /// `key value` block ending in `END`
    Info,
    /// Set listing block ending in `END`
    List,
}

impl Decoder {
    pub fn for_command(command: &Command) -> Self {
        match command.kind() {
            CommandKind::Create
            | CommandKind::Drop
            | CommandKind::Close
            | CommandKind::Clear
            | CommandKind::Add
            | CommandKind::Flush => Decoder::Ack,
            CommandKind::BulkAdd => Decoder::BulkAck {
                keys: command.key_count(),
            },
            CommandKind::Check => Decoder::Check,
            CommandKind::BulkCheck => Decoder::BulkCheck {
                keys: command.key_count(),
            },
            CommandKind::Info => Decoder::Info,
            CommandKind::List => Decoder::List,
        }
    }

    /// Consume exactly one reply from `source`
    ///
    /// Service errors come back as `Err(HlldError::Service { .. })` with the
    /// stream still aligned; any error for which `is_fatal()` holds means
    /// the stream can no longer be trusted.
    pub fn decode<S: LineSource + ?Sized>(&self, source: &mut S) -> Result<Value> {
        let first = source.next_line()?;
        tracing::trace!(decoder = ?self, line = %first, "reply line");

        match self {
            Decoder::Ack => decode_ack(&first),
            Decoder::BulkAck { keys } => decode_bulk_ack(&first, *keys),
            Decoder::Check => decode_check(&first),
            Decoder::BulkCheck { keys } => decode_flags(&first, *keys, false),
            Decoder::Info => {
                let info = read_block(source, first, parse_info_line)?;
                Ok(Value::Info(info.into_iter().collect::<BTreeMap<_, _>>()))
            }
            Decoder::List => Ok(Value::List(read_block(source, first, parse_list_line)?)),
        }
    }
}

/// Decode the reply to `command` from `source`
pub fn decode_response<S: LineSource + ?Sized>(command: &Command, source: &mut S) -> Result<Value> {
    Decoder::for_command(command).decode(source)
}

fn unexpected(line: &str, wanted: &str) -> HlldError {
    HlldError::Protocol(format!("expected {}, got '{}'", wanted, line.escape_debug()))
}

fn decode_ack(line: &str) -> Result<Value> {
    if line == response::DONE {
        return Ok(Value::Unit);
    }
    Err(service_error(line).unwrap_or_else(|| unexpected(line, "'Done'")))
}

fn decode_check(line: &str) -> Result<Value> {
    match line {
        response::YES => Ok(Value::Bool(true)),
        response::NO => Ok(Value::Bool(false)),
        _ => Err(service_error(line).unwrap_or_else(|| unexpected(line, "'Yes' or 'No'"))),
    }
}

fn decode_bulk_ack(line: &str, keys: usize) -> Result<Value> {
    if line == response::DONE {
        return Ok(Value::Bools(vec![true; keys]));
    }
    decode_flags(line, keys, true)
}

/// Space-separated per-key tokens; `Exists` is accepted only for adds
fn decode_flags(line: &str, keys: usize, allow_exists: bool) -> Result<Value> {
    let parsed: Option<Vec<bool>> = line
        .split(' ')
        .map(|token| match token {
            response::YES => Some(true),
            response::NO => Some(false),
            response::EXISTS if allow_exists => Some(false),
            _ => None,
        })
        .collect();

    match parsed {
        Some(flags) if flags.len() == keys => Ok(Value::Bools(flags)),
        Some(flags) => Err(HlldError::Protocol(format!(
            "expected {} result tokens, got {}",
            keys,
            flags.len()
        ))),
        None => Err(service_error(line).unwrap_or_else(|| unexpected(line, "per-key result tokens"))),
    }
}

/// Parse the lines of a block, given its already-read first line
///
/// Accepts an optional leading `START`. Each line is parsed as soon as it
/// is read, so a reply of the wrong shape fails before later replies are
/// consumed. Running out of input before `END` is a protocol error: the
/// reply's extent is unknown.
fn read_block<S, T, F>(source: &mut S, first: String, parse: F) -> Result<Vec<T>>
where
    S: LineSource + ?Sized,
    F: Fn(&str) -> Result<T>,
{
    if let Some(err) = service_error(&first) {
        return Err(err);
    }

    let mut entries = Vec::new();
    let mut line = first;
    if line == response::BLOCK_START {
        line = next_block_line(source)?;
    }

    while line != response::BLOCK_END {
        if line.is_empty() {
            return Err(HlldError::Protocol("blank line inside block".to_string()));
        }
        if line == response::BLOCK_START {
            return Err(HlldError::Protocol("START inside block".to_string()));
        }
        entries.push(parse(&line)?);
        line = next_block_line(source)?;
    }

    Ok(entries)
}

fn next_block_line<S: LineSource + ?Sized>(source: &mut S) -> Result<String> {
    let line = source.next_line().map_err(|err| match err {
        HlldError::Connection(_) | HlldError::Timeout(_) => {
            HlldError::Protocol(format!("block not terminated by END ({})", err))
        }
        other => other,
    })?;
    tracing::trace!(line = %line, "block line");
    Ok(line)
}

fn parse_info_line(line: &str) -> Result<(String, String)> {
    match line.split_once(' ') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(unexpected(line, "'key value' info line")),
    }
}

/// `name eps precision bytes size`; only the name is kept
fn parse_list_line(line: &str) -> Result<String> {
    let fields: Vec<&str> = line.split(' ').collect();
    let well_formed = match fields.as_slice() {
        [name, eps, precision, bytes, size] => {
            !name.is_empty()
                && eps.parse::<f64>().is_ok()
                && precision.parse::<u8>().is_ok()
                && bytes.parse::<u64>().is_ok()
                && size.parse::<u64>().is_ok()
        }
        _ => false,
    };

    if !well_formed {
        return Err(unexpected(line, "'name eps precision bytes size' listing line"));
    }
    Ok(fields[0].to_string())
}
