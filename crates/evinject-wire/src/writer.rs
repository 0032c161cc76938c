use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_event, RECORD_SIZE};
use crate::error::{Result, WireError};
use crate::record::Event;

/// Largest write the kernel guarantees to deliver atomically into a pipe.
const PIPE_BUF: usize = libc::PIPE_BUF;

/// Writes records to a producer-side stream.
///
/// Batches are split so every `write` carries whole records and stays within
/// the platform's `PIPE_BUF` (4096 on Linux), so a reader never observes a
/// torn record. Where `PIPE_BUF` is smaller than one record (512 on macOS),
/// each write carries a single record and is not guaranteed to be atomic.
pub struct RecordWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Write> RecordWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(Self::records_per_write() * RECORD_SIZE),
        }
    }

    /// Encode and write one record.
    pub fn send(&mut self, event: &Event) -> Result<()> {
        self.send_all(std::slice::from_ref(event))
    }

    /// Encode and write `events` in order.
    pub fn send_all(&mut self, events: &[Event]) -> Result<()> {
        for batch in events.chunks(Self::records_per_write()) {
            self.buf.clear();
            for event in batch {
                encode_event(event, &mut self.buf);
            }
            write_fully(&mut self.inner, &self.buf)?;
        }
        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(WireError::Io(err)),
            }
        }
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    fn records_per_write() -> usize {
        (PIPE_BUF / RECORD_SIZE).max(1)
    }
}

fn write_fully(inner: &mut impl Write, bytes: &[u8]) -> Result<()> {
    let mut offset = 0usize;
    while offset < bytes.len() {
        match inner.write(&bytes[offset..]) {
            Ok(0) => return Err(WireError::ConnectionClosed),
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::BrokenPipe => {
                return Err(WireError::ConnectionClosed)
            }
            Err(err) => return Err(WireError::Io(err)),
        }
    }
    Ok(())
}
