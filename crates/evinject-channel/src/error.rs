use std::path::PathBuf;

/// Errors that can occur while creating or opening event channels.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Failed to create the FIFO at the specified path.
    #[error("failed to create fifo at {path}: {source}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to open the FIFO after creating it.
    #[error("failed to open fifo at {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The path contains an interior NUL byte.
    #[error("fifo path is not representable as a C string: {path}")]
    InvalidPath { path: PathBuf },

    /// An I/O error occurred on an open channel.
    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ChannelError>;
