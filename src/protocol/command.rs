//! Command definitions
//!
//! Represents requests sent to the server. A `Command` is immutable once
//! built; validation of names and keys happens when it is encoded.

/// Command kinds understood by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Create,
    Drop,
    Close,
    Clear,
    Add,
    BulkAdd,
    Check,
    BulkCheck,
    Info,
    List,
    Flush,
}

impl CommandKind {
    /// Verb written on the wire
    pub fn verb(&self) -> &'static str {
        match self {
            CommandKind::Create => "create",
            CommandKind::Drop => "drop",
            CommandKind::Close => "close",
            CommandKind::Clear => "clear",
            CommandKind::Add => "set",
            CommandKind::BulkAdd => "bulk",
            CommandKind::Check => "check",
            CommandKind::BulkCheck => "multi",
            CommandKind::Info => "info",
            CommandKind::List => "list",
            CommandKind::Flush => "flush",
        }
    }
}

/// Optional tuning passed to `create`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateOptions {
    /// HyperLogLog precision (register bits)
    pub precision: Option<u8>,

    /// Upper bound on the estimate's variance. Mutually exclusive with
    /// `precision`.
    pub eps: Option<f64>,

    /// Keep the set in memory only
    pub in_memory: bool,
}

impl CreateOptions {
    pub fn precision(mut self, precision: u8) -> Self {
        self.precision = Some(precision);
        self
    }

    pub fn eps(mut self, eps: f64) -> Self {
        self.eps = Some(eps);
        self
    }

    pub fn in_memory(mut self, in_memory: bool) -> Self {
        self.in_memory = in_memory;
        self
    }

    fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(precision) = self.precision {
            args.push(format!("precision={}", precision));
        }
        if let Some(eps) = self.eps {
            args.push(format!("eps={}", eps));
        }
        if self.in_memory {
            args.push("in_memory=1".to_string());
        }
        args
    }
}

/// A single request
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    kind: CommandKind,
    target: Option<String>,
    args: Vec<String>,
    /// Set when the command was built from inconsistent options
    invalid: Option<String>,
}

impl Command {
    fn new(kind: CommandKind, target: Option<String>, args: Vec<String>) -> Self {
        Self {
            kind,
            target,
            args,
            invalid: None,
        }
    }

    /// Create a set
    pub fn create(name: impl Into<String>, options: &CreateOptions) -> Self {
        let mut command = Self::new(CommandKind::Create, Some(name.into()), options.to_args());
        if options.precision.is_some() && options.eps.is_some() {
            command.invalid = Some("cannot provide both precision and eps".to_string());
        }
        command
    }

    /// Permanently delete a set
    pub fn drop(name: impl Into<String>) -> Self {
        Self::new(CommandKind::Drop, Some(name.into()), Vec::new())
    }

    /// Unload a set from server memory
    pub fn close(name: impl Into<String>) -> Self {
        Self::new(CommandKind::Close, Some(name.into()), Vec::new())
    }

    /// Remove a closed set from the server's set list without deleting data
    pub fn clear(name: impl Into<String>) -> Self {
        Self::new(CommandKind::Clear, Some(name.into()), Vec::new())
    }

    /// Add one key
    pub fn add(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(CommandKind::Add, Some(name.into()), vec![key.into()])
    }

    /// Add several keys in one request
    pub fn bulk_add<I, K>(name: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let keys = keys.into_iter().map(Into::into).collect();
        Self::new(CommandKind::BulkAdd, Some(name.into()), keys)
    }

    /// Check membership of one key
    pub fn check(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self::new(CommandKind::Check, Some(name.into()), vec![key.into()])
    }

    /// Check membership of several keys in one request
    pub fn bulk_check<I, K>(name: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let keys = keys.into_iter().map(Into::into).collect();
        Self::new(CommandKind::BulkCheck, Some(name.into()), keys)
    }

    /// Fetch the key/value info block of a set
    pub fn info(name: impl Into<String>) -> Self {
        Self::new(CommandKind::Info, Some(name.into()), Vec::new())
    }

    /// List sets, optionally restricted to names starting with `prefix`
    pub fn list(prefix: Option<&str>) -> Self {
        let args = prefix.map(|p| vec![p.to_string()]).unwrap_or_default();
        Self::new(CommandKind::List, None, args)
    }

    /// Flush one set to disk, or every set when `name` is `None`
    pub fn flush(name: Option<&str>) -> Self {
        Self::new(CommandKind::Flush, name.map(str::to_string), Vec::new())
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub(crate) fn invalid_reason(&self) -> Option<&str> {
        self.invalid.as_deref()
    }

    /// Number of keys carried by an add/check style command
    pub fn key_count(&self) -> usize {
        match self.kind {
            CommandKind::Add | CommandKind::BulkAdd | CommandKind::Check | CommandKind::BulkCheck => {
                self.args.len()
            }
            _ => 0,
        }
    }
}
