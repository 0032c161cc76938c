/// Errors that can occur while encoding, decoding or writing records.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// A single record was decoded from a slice of the wrong length.
    #[error("record must be exactly {expected} bytes, got {actual}")]
    RecordSize { expected: usize, actual: usize },

    /// A valuator axis index outside the wire format's range.
    #[error("valuator axis {axis} out of range (max {max})")]
    AxisOutOfRange { axis: usize, max: usize },

    /// An I/O error occurred while writing records.
    #[error("record I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The reading end went away before all records were written.
    #[error("channel closed (incomplete write)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, WireError>;
