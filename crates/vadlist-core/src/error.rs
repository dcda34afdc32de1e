use strum::IntoStaticStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid process ID: {0}")]
    InvalidProcessId(u32),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Failed to open process: {0}")]
    ProcessOpenFailed(String),

    #[error("Insufficient capacity: {required} bytes required, {available} available")]
    InsufficientCapacity { required: u64, available: u64 },

    #[error("Failed to read memory at address {address:#x}: {message}")]
    MemoryReadFailed { address: u64, message: String },

    #[error("Out of sequence: {0}")]
    Sequencing(String),

    #[error("Corrupt region list: {0}")]
    CorruptBuffer(String),

    #[error("Layout parse error: {0}")]
    LayoutParseError(String),

    #[error("Memory image error: {0}")]
    ImageError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse failure reason reported to callers of the two request operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    InsufficientCapacity,
    UnreadableSource,
    Sequencing,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidProcessId(_)
            | Error::InvalidInput(_)
            | Error::CorruptBuffer(_)
            | Error::LayoutParseError(_)
            | Error::ImageError(_)
            | Error::Json(_) => ErrorKind::InvalidInput,
            Error::ProcessNotFound(_) | Error::ProcessOpenFailed(_) => ErrorKind::NotFound,
            Error::InsufficientCapacity { .. } => ErrorKind::InsufficientCapacity,
            Error::MemoryReadFailed { .. } | Error::Io(_) => ErrorKind::UnreadableSource,
            Error::Sequencing(_) => ErrorKind::Sequencing,
        }
    }

    /// Whether the walker may drop the offending node and keep going.
    pub fn is_unreadable(&self) -> bool {
        matches!(self, Error::MemoryReadFailed { .. })
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name: &'static str = self.into();
        write!(f, "{}", name)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
