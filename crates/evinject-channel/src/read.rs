use std::io::{ErrorKind, Read};

/// Outcome of a single non-blocking read attempt.
#[derive(Debug)]
pub enum ReadStatus {
    /// `n` bytes were read into the buffer.
    Data(usize),
    /// Nothing is available right now.
    WouldBlock,
    /// The producer closed its end (zero-byte read).
    Closed,
    /// A hard I/O error other than would-block.
    Failed(std::io::Error),
}

/// Read whatever is immediately available without blocking the caller.
///
/// Implemented for every [`Read`]; interrupted reads are retried, all other
/// outcomes are classified into a [`ReadStatus`].
pub trait ReadAvailable {
    fn read_available(&mut self, buf: &mut [u8]) -> ReadStatus;
}

impl<T: Read + ?Sized> ReadAvailable for T {
    fn read_available(&mut self, buf: &mut [u8]) -> ReadStatus {
        loop {
            return match self.read(buf) {
                Ok(0) => ReadStatus::Closed,
                Ok(n) => ReadStatus::Data(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => ReadStatus::WouldBlock,
                Err(err) => ReadStatus::Failed(err),
            };
        }
    }
}
