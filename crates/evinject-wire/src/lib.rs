//! Fixed-size input event records.
//!
//! Every record on the inbound channel has the same size, [`RECORD_SIZE`],
//! and starts with a native-endian `u32` tag selecting the variant. The
//! layout mirrors the C definitions producers are built against:
//! - no length prefix, records are sliced at fixed offsets
//! - native byte order, no version negotiation
//! - unused bytes are padding and ignored on decode
//!
//! A read that does not contain a whole number of records is a framing
//! error; partial records are never carried over into the next read.

#![cfg(unix)]

pub mod codec;
pub mod error;
pub mod reader;
pub mod record;
pub mod valuator;
pub mod writer;

pub use codec::{decode_record, encode_event, RECORD_SIZE};
pub use error::{Result, WireError};
pub use evinject_channel::SYNC_ACK;
pub use reader::{DrainEnd, DrainReport, RecordReader, DEFAULT_BATCH_RECORDS};
pub use record::{
    Button, Event, EventKind, GesturePinch, GestureSwipe, Key, Motion, Proximity, Touch,
};
pub use valuator::{ValuatorSet, MAX_VALUATORS};
pub use writer::RecordWriter;
