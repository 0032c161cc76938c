//! Inject input events into an emulated device through named FIFOs.
//!
//! A producer writes fixed-size event records into one FIFO; the device
//! decodes them, forwards them to a live input consumer, and answers sync
//! requests on a second FIFO once every earlier record has been applied.
//!
//! # Crate Structure
//!
//! - [`channel`] — FIFO pair creation, non-blocking reads, acknowledgment writes
//! - [`wire`] — Record layout, codec and batch decoding
//! - [`device`] — Dispatch, sync coordination and lifecycle (behind `device` feature)

/// Re-export channel types.
pub mod channel {
    pub use evinject_channel::*;
}

/// Re-export wire types.
pub mod wire {
    pub use evinject_wire::*;
}

/// Re-export device types (requires `device` feature).
#[cfg(feature = "device")]
pub mod device {
    pub use evinject_device::*;
}
