//! Response definitions
//!
//! Typed values decoded from server replies, plus the table of error
//! lines the server is known to send.

use std::collections::BTreeMap;

use crate::error::{HlldError, Result, ServiceErrorKind};

/// A successfully decoded reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// `Done` acknowledgement
    Unit,

    /// Single `Yes`/`No`
    Bool(bool),

    /// Per-key flags, positionally matching the request's keys
    Bools(Vec<bool>),

    /// `key value` lines of an info block
    Info(BTreeMap<String, String>),

    /// Set names from a list block
    List(Vec<String>),
}

impl Value {
    fn kind_name(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Bool(_) => "bool",
            Value::Bools(_) => "bools",
            Value::Info(_) => "info",
            Value::List(_) => "list",
        }
    }

    fn mismatch(&self, wanted: &str) -> HlldError {
        HlldError::Protocol(format!("expected {} reply, got {}", wanted, self.kind_name()))
    }

    pub fn into_unit(self) -> Result<()> {
        match self {
            Value::Unit => Ok(()),
            other => Err(other.mismatch("unit")),
        }
    }

    pub fn into_bool(self) -> Result<bool> {
        match self {
            Value::Bool(flag) => Ok(flag),
            other => Err(other.mismatch("bool")),
        }
    }

    pub fn into_bools(self) -> Result<Vec<bool>> {
        match self {
            Value::Bools(flags) => Ok(flags),
            other => Err(other.mismatch("bools")),
        }
    }

    pub fn into_info(self) -> Result<BTreeMap<String, String>> {
        match self {
            Value::Info(info) => Ok(info),
            other => Err(other.mismatch("info")),
        }
    }

    pub fn into_list(self) -> Result<Vec<String>> {
        match self {
            Value::List(names) => Ok(names),
            other => Err(other.mismatch("list")),
        }
    }
}

// =============================================================================
// Reply tokens
// =============================================================================

pub const DONE: &str = "Done";
pub const YES: &str = "Yes";
pub const NO: &str = "No";
pub const EXISTS: &str = "Exists";
pub const BLOCK_START: &str = "START";
pub const BLOCK_END: &str = "END";

/// Exact error lines
const ERROR_LINES: &[(&str, ServiceErrorKind)] = &[
    ("Set does not exist", ServiceErrorKind::SetNotExist),
    ("Set already exists", ServiceErrorKind::SetExists),
    ("Exists", ServiceErrorKind::SetExists),
    ("Delete in progress", ServiceErrorKind::SetDeleted),
    ("Set is not enabled", ServiceErrorKind::SetDisabled),
    ("Set is not proxied. Close it first.", ServiceErrorKind::SetDisabled),
];

/// Error lines that carry a free-form detail after the prefix
const ERROR_PREFIXES: &[(&str, ServiceErrorKind)] = &[
    ("Client Error", ServiceErrorKind::UnknownCommand),
    ("Internal Error", ServiceErrorKind::InternalError),
];

/// Classifies a reply line as a server error, if it is one.
///
/// `Exists` is only an error for commands that cannot legitimately answer
/// with it; callers that accept `Exists` as a token check for it first.
pub fn service_error(line: &str) -> Option<HlldError> {
    if let Some((_, kind)) = ERROR_LINES.iter().find(|(text, _)| *text == line) {
        return Some(HlldError::service(*kind, line));
    }
    ERROR_PREFIXES
        .iter()
        .find(|(prefix, _)| line.starts_with(prefix))
        .map(|(_, kind)| HlldError::service(*kind, line))
}
