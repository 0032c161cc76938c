//! Named FIFO channel pair for input event injection.
//!
//! This is the lowest layer of evinject. A device owns two FIFOs:
//! - an inbound FIFO the producer writes event records into, read without blocking
//! - an outbound FIFO the device writes synchronization acknowledgments to
//!
//! Both are created fresh when the device is set up and removed again when
//! the owning values are dropped.

#![cfg(unix)]

pub mod channels;
pub mod error;
pub mod fifo;
pub mod read;

pub use channels::{EventChannels, InboundChannel, OutboundChannel, SYNC_ACK};
pub use error::{ChannelError, Result};
pub use fifo::Fifo;
pub use read::{ReadAvailable, ReadStatus};
