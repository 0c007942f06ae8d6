use thiserror::Error;

/// Storefront client errors
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Configuration file errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors (file name, size, path)
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Network-layer HTTP failures (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-2xx status
    #[error("Request to {endpoint} failed with status {status}: {body}")]
    Transport {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// Server answered 2xx but the payload breaks the client contract
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    /// Upload was cancelled by the caller
    #[error("Upload {upload_id} cancelled after {chunks_sent} chunk(s)")]
    Cancelled { upload_id: String, chunks_sent: u64 },

    /// Mutex poison error
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl StorefrontError {
    /// True for network failures and non-2xx responses.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            StorefrontError::Http(_) | StorefrontError::Transport { .. }
        )
    }

    pub fn is_contract_violation(&self) -> bool {
        matches!(self, StorefrontError::ContractViolation(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, StorefrontError::Cancelled { .. })
    }
}

/// Callers that surface errors to users show the message as-is
impl From<StorefrontError> for String {
    fn from(err: StorefrontError) -> String {
        err.to_string()
    }
}

pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    fn context(self, msg: &str) -> Result<T>;
}

impl<T, E: Into<StorefrontError>> ErrorContext<T> for std::result::Result<T, E> {
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| {
            let err: StorefrontError = e.into();
            match err {
                StorefrontError::Config(s) => StorefrontError::Config(format!("{}: {}", msg, s)),
                StorefrontError::Validation(s) => {
                    StorefrontError::Validation(format!("{}: {}", msg, s))
                }
                StorefrontError::ContractViolation(s) => {
                    StorefrontError::ContractViolation(format!("{}: {}", msg, s))
                }
                StorefrontError::Other(s) => StorefrontError::Other(format!("{}: {}", msg, s)),
                // Typed variants keep their source so callers can still classify them
                other => other,
            }
        })
    }
}
