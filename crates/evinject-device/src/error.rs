use std::path::PathBuf;

use crate::lifecycle::DeviceState;

/// Errors raised while validating or loading device options.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required option was not provided.
    #[error("missing required option {0}")]
    MissingOption(&'static str),

    /// The emulated type is not one of the supported names.
    #[error("unsupported emulated type {0:?}")]
    UnsupportedType(String),

    /// The read batch must hold at least one record.
    #[error("batch size must be at least one record")]
    EmptyBatch,

    /// The options file could not be read.
    #[error("failed to read options from {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The options file is not valid JSON for [`crate::DeviceOptions`].
    #[error("invalid options: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors that can occur in device operations.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Channel setup failed.
    #[error("channel error: {0}")]
    Channel(#[from] evinject_channel::ChannelError),

    /// The operation is not valid in the device's current state.
    #[error("cannot {operation} a device that is {state}")]
    InvalidTransition {
        state: DeviceState,
        operation: &'static str,
    },

    /// The host refused to watch the inbound channel.
    #[error("failed to register inbound channel: {0}")]
    Register(std::io::Error),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
