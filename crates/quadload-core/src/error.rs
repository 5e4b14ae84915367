//! Error types for serialization, store access and loader bootstrap

/// Error turning a single statement into a document.
///
/// Both variants are recovered locally: the statement is logged and skipped,
/// the rest of the batch is unaffected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SerializeError {
    /// Literal typed as a WKT geometry whose text cannot be decoded
    Geometry { statement: String, message: String },
    /// Object value of an unexpected shape
    InvalidObject { statement: String, message: String },
}

impl std::fmt::Display for SerializeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Geometry { statement, message } => {
                write!(f, "failed to parse geo statement {statement}: {message}")
            }
            Self::InvalidObject { statement, message } => {
                write!(f, "cannot serialize {statement}: {message}")
            }
        }
    }
}

impl std::error::Error for SerializeError {}

/// Batch-level error reported by a [`DocumentStore`](crate::store::DocumentStore).
///
/// Per-document failures (duplicate keys and the like) are not errors; they
/// come back inside a [`BulkWriteResult`](crate::store::BulkWriteResult).
#[derive(Debug)]
pub enum StoreError {
    /// Store unreachable or connection dropped mid-call
    Unavailable(String),
    /// The store refused the whole request
    Rejected(String),
    /// Store connection already closed
    Closed,
    /// Local I/O failure
    Io(std::io::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "store unavailable: {msg}"),
            Self::Rejected(msg) => write!(f, "store rejected request: {msg}"),
            Self::Closed => write!(f, "store connection closed"),
            Self::Io(e) => write!(f, "IO: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl StoreError {
    /// Whether resubmitting the same batch may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable(_) => true,
            Self::Rejected(_) | Self::Closed => false,
            Self::Io(e) => e.kind() != std::io::ErrorKind::StorageFull,
        }
    }
}

/// Fatal error raised before any statement is accepted.
#[derive(Debug)]
pub enum LoadError {
    /// Could not reach the document store at startup
    Connect(StoreError),
    /// Invalid loader configuration
    Config(String),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect(e) => write!(f, "cannot connect to document store: {e}"),
            Self::Config(msg) => write!(f, "invalid loader config: {msg}"),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Connect(e) => Some(e),
            Self::Config(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn unavailable_is_retryable() {
        assert!(StoreError::Unavailable("reset".to_string()).is_retryable());
    }

    #[test]
    fn rejected_not_retryable() {
        assert!(!StoreError::Rejected("bad request".to_string()).is_retryable());
        assert!(!StoreError::Closed.is_retryable());
    }

    #[test]
    fn io_storage_full_not_retryable() {
        let err = StoreError::Io(std::io::Error::new(ErrorKind::StorageFull, "disk full"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn io_other_retryable() {
        let err = StoreError::from(std::io::Error::new(ErrorKind::BrokenPipe, "pipe"));
        assert!(err.is_retryable());
    }

    #[test]
    fn load_error_display_connect() {
        let err = LoadError::Connect(StoreError::Unavailable("refused".to_string()));
        let msg = format!("{err}");
        assert!(msg.contains("cannot connect"));
        assert!(msg.contains("refused"));
    }

    #[test]
    fn serialize_error_display_geometry() {
        let err = SerializeError::Geometry {
            statement: "<s> <p> \"POINT (\"".to_string(),
            message: "unexpected end".to_string(),
        };
        assert!(err.to_string().starts_with("failed to parse geo statement"));
    }
}
