use bytes::BytesMut;
use evinject_channel::{ReadAvailable, ReadStatus};
use tracing::{error, trace};

use crate::codec::{decode_exact, RECORD_SIZE};
use crate::record::Event;

/// Records read per attempt unless configured otherwise.
pub const DEFAULT_BATCH_RECORDS: usize = 32;

/// Why a drain pass stopped.
#[derive(Debug)]
pub enum DrainEnd {
    /// The channel has nothing more to read right now.
    WouldBlock,
    /// The producer closed its write end.
    Closed,
    /// A hard read error; the channel stays open.
    ReadError(std::io::Error),
    /// A read returned a byte count that is not a whole number of records.
    /// Nothing from that read was dispatched.
    Framing {
        remainder: usize,
        record_size: usize,
        read: usize,
    },
}

/// Summary of one drain pass.
#[derive(Debug)]
pub struct DrainReport {
    /// Records decoded and handed to the callback.
    pub records: usize,
    pub end: DrainEnd,
}

impl DrainReport {
    /// Whether the pass ended without a framing or read error.
    pub fn is_clean(&self) -> bool {
        matches!(self.end, DrainEnd::WouldBlock | DrainEnd::Closed)
    }
}

/// Decodes batches of fixed-size records from a non-blocking source.
///
/// Records are never reassembled across reads: each read must return a whole
/// number of records or the read is discarded.
pub struct RecordReader<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: ReadAvailable> RecordReader<T> {
    /// Reader with room for [`DEFAULT_BATCH_RECORDS`] records per read.
    pub fn new(inner: T) -> Self {
        Self::with_batch(inner, DEFAULT_BATCH_RECORDS)
    }

    /// Reader with room for `batch_records` records per read (at least one).
    pub fn with_batch(inner: T, batch_records: usize) -> Self {
        Self {
            inner,
            buf: BytesMut::zeroed(batch_records.max(1) * RECORD_SIZE),
        }
    }

    /// Read until the source would block, closes, or fails, handing every
    /// decoded record to `on_event` in arrival order.
    pub fn drain(&mut self, mut on_event: impl FnMut(Event)) -> DrainReport {
        let mut records = 0usize;

        loop {
            let read = match self.inner.read_available(&mut self.buf) {
                ReadStatus::Data(n) => n,
                ReadStatus::WouldBlock => {
                    return DrainReport {
                        records,
                        end: DrainEnd::WouldBlock,
                    }
                }
                ReadStatus::Closed => {
                    trace!(records, "producer closed inbound channel");
                    return DrainReport {
                        records,
                        end: DrainEnd::Closed,
                    };
                }
                ReadStatus::Failed(err) => {
                    error!(error = %err, "failed to read event records");
                    return DrainReport {
                        records,
                        end: DrainEnd::ReadError(err),
                    };
                }
            };

            let remainder = read % RECORD_SIZE;
            if remainder != 0 {
                error!(
                    remainder,
                    record_size = RECORD_SIZE,
                    read,
                    "unexpected read size, discarding records"
                );
                return DrainReport {
                    records,
                    end: DrainEnd::Framing {
                        remainder,
                        record_size: RECORD_SIZE,
                        read,
                    },
                };
            }

            for chunk in self.buf[..read].chunks_exact(RECORD_SIZE) {
                on_event(decode_exact(chunk));
                records += 1;
            }
        }
    }

    /// Maximum number of records consumed by one read.
    pub fn batch_records(&self) -> usize {
        self.buf.len() / RECORD_SIZE
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::{ErrorKind, Read};

    use bytes::BytesMut;

    use super::*;
    use crate::codec::encode_event;
    use crate::record::{Key, Motion};
    use crate::valuator::ValuatorSet;

    /// Hands out one scripted chunk per read, then reports would-block.
    struct Chunks(Vec<std::io::Result<Vec<u8>>>);

    impl Read for Chunks {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.0.is_empty() {
                return Err(ErrorKind::WouldBlock.into());
            }
            let bytes = self.0.remove(0)?;
            buf[..bytes.len()].copy_from_slice(&bytes);
            Ok(bytes.len())
        }
    }

    fn key(code: i32) -> Event {
        Event::Key(Key {
            key_code: code,
            is_down: true,
        })
    }

    fn wire(events: &[Event]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for event in events {
            encode_event(event, &mut buf);
        }
        buf.to_vec()
    }

    #[test]
    fn decodes_records_in_order() {
        let events: Vec<Event> = (1..=5).map(key).collect();
        let mut reader = RecordReader::new(Chunks(vec![Ok(wire(&events))]));

        let mut seen = Vec::new();
        let report = reader.drain(|event| seen.push(event));

        assert_eq!(report.records, 5);
        assert!(matches!(report.end, DrainEnd::WouldBlock));
        assert_eq!(seen, events);
    }

    #[test]
    fn drains_across_multiple_reads() {
        let events: Vec<Event> = (1..=5).map(key).collect();
        let mut reader = RecordReader::with_batch(
            Chunks(vec![
                Ok(wire(&events[..2])),
                Err(ErrorKind::Interrupted.into()),
                Ok(wire(&events[2..4])),
                Ok(wire(&events[4..])),
            ]),
            2,
        );
        assert_eq!(reader.batch_records(), 2);

        let mut seen = Vec::new();
        let report = reader.drain(|event| seen.push(event));

        assert_eq!(report.records, 5);
        assert!(report.is_clean());
        assert_eq!(seen, events);
    }

    #[test]
    fn framing_error_discards_whole_read() {
        let mut bytes = wire(&[key(1), key(2)]);
        bytes.truncate(2 * RECORD_SIZE - 1);
        let mut reader = RecordReader::new(Chunks(vec![Ok(bytes), Ok(wire(&[key(3)]))]));

        let mut seen = Vec::new();
        let report = reader.drain(|event| seen.push(event));

        assert!(seen.is_empty());
        assert_eq!(report.records, 0);
        match report.end {
            DrainEnd::Framing {
                remainder,
                record_size,
                read,
            } => {
                assert_eq!(remainder, RECORD_SIZE - 1);
                assert_eq!(record_size, RECORD_SIZE);
                assert_eq!(read, 2 * RECORD_SIZE - 1);
            }
            other => panic!("expected framing error, got {other:?}"),
        }

        // The next pass starts fresh at a record boundary.
        let report = reader.drain(|event| seen.push(event));
        assert_eq!(report.records, 1);
        assert_eq!(seen, vec![key(3)]);
    }

    #[test]
    fn closed_producer_ends_pass_without_error() {
        let mut reader = RecordReader::new(std::io::Cursor::new(wire(&[key(30)])));

        let mut seen = Vec::new();
        let report = reader.drain(|event| seen.push(event));

        assert_eq!(report.records, 1);
        assert!(matches!(report.end, DrainEnd::Closed));
        assert!(report.is_clean());
    }

    #[test]
    fn read_error_keeps_earlier_records() {
        let mut reader = RecordReader::new(Chunks(vec![
            Ok(wire(&[key(1)])),
            Err(std::io::Error::other("device gone")),
        ]));

        let mut seen = Vec::new();
        let report = reader.drain(|event| seen.push(event));

        assert_eq!(seen, vec![key(1)]);
        assert!(matches!(report.end, DrainEnd::ReadError(_)));
        assert!(!report.is_clean());
    }

    #[test]
    fn three_motion_records_in_one_read() {
        let events: Vec<Event> = [(1.0, 2.0), (3.0, 4.0), (5.0, 6.0)]
            .into_iter()
            .map(|(x, y)| {
                let mut valuators = ValuatorSet::new();
                valuators.set(0, x).unwrap();
                valuators.set(1, y).unwrap();
                Event::Motion(Motion {
                    is_absolute: false,
                    valuators,
                })
            })
            .collect();
        let mut reader = RecordReader::new(Chunks(vec![Ok(wire(&events))]));

        let mut xs = Vec::new();
        reader.drain(|event| {
            if let Some(valuators) = event.valuators() {
                xs.push(valuators.get(0));
            }
        });

        assert_eq!(xs, vec![Some(1.0), Some(3.0), Some(5.0)]);
    }
}
