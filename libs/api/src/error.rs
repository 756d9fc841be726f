/// Category of a store error. Lets the browsing engine decide how a
/// failure surfaces to its caller (not found, unavailable, timed out).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Topic (or partition) does not exist in the store.
    NotFound,
    /// Broker, network or backend failure. Usually transient.
    Unavailable,
    /// The store gave up waiting on a read.
    Timeout,
    /// Request rejected by the store (bad arguments, topic already exists).
    Invalid,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::NotFound => f.write_str("not_found"),
            ErrorKind::Unavailable => f.write_str("unavailable"),
            ErrorKind::Timeout => f.write_str("timeout"),
            ErrorKind::Invalid => f.write_str("invalid"),
        }
    }
}

/// Unified error type for all [`LogStore`](crate::LogStore) methods.
///
/// Carries an `ErrorKind` for categorization and a human-readable message.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreError {
    kind: ErrorKind,
    message: String,
}

impl StoreError {
    /// Topic is unknown to the store.
    pub fn topic_not_found(topic: &str) -> Self {
        Self { kind: ErrorKind::NotFound, message: format!("topic '{topic}' not found") }
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Unavailable, message: msg.into() }
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Timeout, message: msg.into() }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Invalid, message: msg.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Add context to the error, keeping its ErrorKind.
    ///
    /// Produces: `"context: message"`.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        Self {
            kind: self.kind,
            message: format!("{ctx}: {}", self.message),
        }
    }
}

impl std::fmt::Debug for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for StoreError {}
