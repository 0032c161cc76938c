use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{ChannelError, Result};
use crate::fifo::Fifo;

/// The byte written to the outbound channel for each satisfied sync request.
pub const SYNC_ACK: u8 = b's';

/// Producer → device channel, opened read-only and non-blocking.
///
/// Opening succeeds even when no producer has the FIFO open for writing yet.
#[derive(Debug)]
pub struct InboundChannel {
    // Field order matters: the descriptor is closed before the path is removed.
    file: File,
    fifo: Fifo,
}

impl InboundChannel {
    /// Create a fresh FIFO at `path` and open it for non-blocking reads.
    pub fn open(path: impl AsRef<Path>, mode: u32) -> Result<Self> {
        let fifo = Fifo::create(path, mode)?;

        let mut options = OpenOptions::new();
        options.read(true).custom_flags(libc::O_NONBLOCK);
        let file = open_retrying(fifo.path(), &options)?;

        debug!(path = ?fifo.path(), "opened inbound channel");
        Ok(Self { file, fifo })
    }

    /// Path of the backing FIFO.
    pub fn path(&self) -> &Path {
        self.fifo.path()
    }
}

impl Read for InboundChannel {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl AsRawFd for InboundChannel {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

impl AsFd for InboundChannel {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.file.as_fd()
    }
}

/// Device → producer channel, opened read-write and non-blocking.
///
/// Read-write access keeps the open from blocking while no producer is
/// listening and leaves room for control data flowing back in later. Writes
/// never block: once unread acknowledgments fill the pipe, `write_ack` fails
/// with [`ErrorKind::WouldBlock`].
#[derive(Debug)]
pub struct OutboundChannel {
    file: File,
    fifo: Fifo,
}

impl OutboundChannel {
    /// Create a fresh FIFO at `path` and open it read-write.
    pub fn open(path: impl AsRef<Path>, mode: u32) -> Result<Self> {
        let fifo = Fifo::create(path, mode)?;

        let mut options = OpenOptions::new();
        options
            .read(true)
            .write(true)
            .custom_flags(libc::O_NONBLOCK);
        let file = open_retrying(fifo.path(), &options)?;

        debug!(path = ?fifo.path(), "opened outbound channel");
        Ok(Self { file, fifo })
    }

    /// Write exactly one [`SYNC_ACK`] byte.
    pub fn write_ack(&self) -> std::io::Result<()> {
        loop {
            return match (&self.file).write(&[SYNC_ACK]) {
                Ok(0) => Err(std::io::Error::new(
                    ErrorKind::WriteZero,
                    "acknowledgment byte not written",
                )),
                Ok(_) => Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => Err(err),
            };
        }
    }

    /// Path of the backing FIFO.
    pub fn path(&self) -> &Path {
        self.fifo.path()
    }
}

impl AsRawFd for OutboundChannel {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

/// Both channels of one device.
///
/// Construction is all-or-nothing: if the outbound channel cannot be created,
/// the already created inbound channel is closed and removed again.
#[derive(Debug)]
pub struct EventChannels {
    pub inbound: InboundChannel,
    pub outbound: OutboundChannel,
}

impl EventChannels {
    /// Create and open the inbound and outbound FIFOs.
    pub fn create(
        inbound_path: impl AsRef<Path>,
        outbound_path: impl AsRef<Path>,
        mode: u32,
    ) -> Result<Self> {
        let inbound = InboundChannel::open(inbound_path, mode)?;
        let outbound = OutboundChannel::open(outbound_path, mode)?;

        info!(
            inbound = ?inbound.path(),
            outbound = ?outbound.path(),
            "event channels ready"
        );
        Ok(Self { inbound, outbound })
    }

    /// Split into the inbound and outbound halves.
    pub fn into_parts(self) -> (InboundChannel, OutboundChannel) {
        (self.inbound, self.outbound)
    }
}

fn open_retrying(path: &Path, options: &OpenOptions) -> Result<File> {
    loop {
        match options.open(path) {
            Ok(file) => return Ok(file),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(ChannelError::Open {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::read::{ReadAvailable, ReadStatus};

    fn test_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "evinject-channels-{tag}-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn inbound_reads_without_blocking() {
        let dir = test_dir("inbound");
        let path = dir.join("in.fifo");
        let mut inbound = InboundChannel::open(&path, Fifo::DEFAULT_MODE).unwrap();

        let mut producer = OpenOptions::new().write(true).open(&path).unwrap();
        let mut buf = [0u8; 16];
        assert!(matches!(
            inbound.read_available(&mut buf),
            ReadStatus::WouldBlock
        ));

        producer.write_all(b"abc").unwrap();
        assert!(matches!(inbound.read_available(&mut buf), ReadStatus::Data(3)));
        assert_eq!(&buf[..3], b"abc");

        drop(producer);
        assert!(matches!(inbound.read_available(&mut buf), ReadStatus::Closed));

        drop(inbound);
        assert!(!path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn outbound_writes_single_ack_byte() {
        let dir = test_dir("outbound");
        let path = dir.join("out.fifo");
        let outbound = OutboundChannel::open(&path, Fifo::DEFAULT_MODE).unwrap();

        // The outbound side holds a writer, so a blocking reader open returns immediately.
        let mut producer = File::open(&path).unwrap();
        outbound.write_ack().unwrap();
        outbound.write_ack().unwrap();

        let mut buf = [0u8; 2];
        producer.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [SYNC_ACK, SYNC_ACK]);

        drop(outbound);
        assert!(!path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn full_outbound_pipe_fails_instead_of_blocking() {
        let dir = test_dir("full");
        let path = dir.join("out.fifo");
        let outbound = OutboundChannel::open(&path, Fifo::DEFAULT_MODE).unwrap();

        let mut written = 0usize;
        let err = loop {
            match outbound.write_ack() {
                Ok(()) => written += 1,
                Err(err) => break err,
            }
            assert!(written <= 1 << 22, "pipe never filled up");
        };
        assert_eq!(err.kind(), ErrorKind::WouldBlock);
        assert!(written > 0);

        // Draining one byte makes room for the next acknowledgment.
        let mut producer = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(&path)
            .unwrap();
        let mut buf = [0u8; 4096];
        let drained = producer.read(&mut buf).unwrap();
        assert!(drained > 0);
        assert!(buf[..drained].iter().all(|&b| b == SYNC_ACK));
        outbound.write_ack().unwrap();

        drop(outbound);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn create_pair_and_split() {
        let dir = test_dir("pair");
        let in_path = dir.join("in.fifo");
        let out_path = dir.join("out.fifo");

        let channels = EventChannels::create(&in_path, &out_path, Fifo::DEFAULT_MODE).unwrap();
        assert!(in_path.exists());
        assert!(out_path.exists());

        let (inbound, outbound) = channels.into_parts();
        assert_eq!(inbound.path(), in_path.as_path());
        assert_eq!(outbound.path(), out_path.as_path());
        assert_ne!(inbound.as_raw_fd(), outbound.as_raw_fd());

        drop(inbound);
        drop(outbound);
        assert!(!in_path.exists());
        assert!(!out_path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn failed_outbound_unwinds_inbound() {
        let dir = test_dir("unwind");
        let in_path = dir.join("in.fifo");
        let out_path = dir.join("missing").join("out.fifo");

        let result = EventChannels::create(&in_path, &out_path, Fifo::DEFAULT_MODE);
        assert!(matches!(result, Err(ChannelError::Create { .. })));
        assert!(
            !in_path.exists(),
            "inbound fifo must be removed when setup fails"
        );
        let _ = std::fs::remove_dir_all(&dir);
    }
}
