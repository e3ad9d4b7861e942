use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BilledError {
    #[error("Config directory not found at {0}. Run 'billed init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Unknown store backend '{0}'. Use 'local' or 'http'.")]
    UnknownBackend(String),

    #[error("Store backend 'http' requires store.base_url in config.toml")]
    MissingBaseUrl,

    #[error("Unknown expense type '{0}'. Run 'billed types' to see the accepted values.")]
    InvalidExpenseType(String),

    #[error("Invalid file extension for '{0}'. Only jpg, jpeg and png receipts are accepted.")]
    InvalidFileExtension(String),

    #[error("No receipt file selected")]
    NoFileSelected,

    #[error("Receipt has not been uploaded yet")]
    NotStaged,

    #[error("This bill has already been submitted")]
    AlreadySubmitted,

    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    #[error("New bills must be pending, not '{0}'")]
    NotPending(String),

    #[error("Invalid date '{0}'. Expected YYYY-MM-DD.")]
    InvalidDate(String),

    #[error("Bill '{0}' not found")]
    BillNotFound(String),

    #[error("Bill '{0}' has no receipt attached")]
    NoReceipt(String),

    #[error("Receipt '{0}' is not a previewable image")]
    UnsupportedReceipt(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Submit(#[from] SubmitError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BilledError>;

/// Rejection reported by a [`BillsStore`](crate::store::BillsStore).
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct StoreError {
    pub status: Option<u16>,
    pub message: String,
}

impl StoreError {
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::classify(self)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::other(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::other(format!("malformed store payload: {e}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    ServerError,
    Unknown,
}

impl ErrorKind {
    /// An explicit status code wins over whatever the message says.
    pub fn classify(err: &StoreError) -> Self {
        match err.status {
            Some(404) => ErrorKind::NotFound,
            Some(500) => ErrorKind::ServerError,
            Some(_) => ErrorKind::Unknown,
            None if err.message.contains("404") => ErrorKind::NotFound,
            None if err.message.contains("500") => ErrorKind::ServerError,
            None => ErrorKind::Unknown,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::NotFound => write!(f, "Erreur 404"),
            ErrorKind::ServerError => write!(f, "Erreur 500"),
            ErrorKind::Unknown => write!(f, "Erreur"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Failed to fetch bills ({kind}): {message}")]
pub struct FetchError {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Failed to upload receipt ({kind}): {message}")]
pub struct UploadError {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Failed to submit bill ({kind}): {message}")]
pub struct SubmitError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<StoreError> for FetchError {
    fn from(e: StoreError) -> Self {
        Self {
            kind: e.kind(),
            message: e.message,
        }
    }
}

impl From<StoreError> for UploadError {
    fn from(e: StoreError) -> Self {
        Self {
            kind: e.kind(),
            message: e.message,
        }
    }
}

impl From<StoreError> for SubmitError {
    fn from(e: StoreError) -> Self {
        Self {
            kind: e.kind(),
            message: e.message,
        }
    }
}
