//! Protocol Module
//!
//! Defines the line-oriented text protocol spoken by hlld.
//!
//! ## Request Format
//! ```text
//! <verb> [<set name>] [<args> ...]\n
//! ```
//!
//! ### Commands
//! - create <set> [precision=N] [eps=F] [in_memory=1]
//! - drop / close / clear / info <set>
//! - set <set> <key>         (add)
//! - bulk <set> <key> ...    (bulk add)
//! - check <set> <key>
//! - multi <set> <key> ...   (bulk check)
//! - list [prefix]
//! - flush [set]
//!
//! ## Response Format
//! Single-line tokens (`Done`, `Yes`, `No`), a line of per-key tokens, or a
//! block of lines terminated by `END`. Error replies are plain text lines
//! such as `Set does not exist`.

mod command;
mod response;
mod codec;

pub use command::{Command, CommandKind, CreateOptions};
pub use response::{service_error, Value};
pub use codec::{decode_response, encode_command, read_line, Decoder, LineSource};
