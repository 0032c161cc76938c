use std::os::fd::{AsRawFd, RawFd};
use std::path::Path;
use std::sync::Arc;

use evinject_channel::{EventChannels, InboundChannel, OutboundChannel};
use evinject_wire::{DrainEnd, RecordReader};
use tracing::{debug, info};

use crate::config::DeviceConfig;
use crate::dispatch::{Dispatch, Dispatcher};
use crate::error::{DeviceError, Result};
use crate::lifecycle::{DeviceState, ReadinessRegistry};
use crate::sink::InputSink;
use crate::sync::{InputLock, SyncCoordinator};
use crate::work::WorkQueue;

/// Outcome of one [`Device::on_readable`] pass.
#[derive(Debug)]
pub struct PassSummary {
    /// Records decoded in this pass.
    pub records: usize,
    pub forwarded: usize,
    pub suppressed: usize,
    pub sync_requests: usize,
    pub ignored: usize,
    /// Why the pass stopped reading.
    pub end: DrainEnd,
}

impl PassSummary {
    fn new(end: DrainEnd) -> Self {
        Self {
            records: 0,
            forwarded: 0,
            suppressed: 0,
            sync_requests: 0,
            ignored: 0,
            end,
        }
    }

    fn count(&mut self, outcome: Dispatch) {
        match outcome {
            Dispatch::Forwarded => self.forwarded += 1,
            Dispatch::Suppressed => self.suppressed += 1,
            Dispatch::SyncRequested => self.sync_requests += 1,
            Dispatch::Ignored => self.ignored += 1,
        }
    }
}

/// One emulated input device.
///
/// Owns its channel pair, decoder, sync state and consumer. Hosts drive it
/// through the lifecycle operations and two callbacks:
/// [`Device::on_readable`] when the inbound channel is readable and
/// [`Device::input_drained`] after the consumer finished a processing pass.
pub struct Device<S> {
    config: DeviceConfig,
    state: DeviceState,
    sink: S,
    queue: Arc<dyn WorkQueue>,
    lock: Arc<InputLock>,
    dispatcher: Dispatcher,
    sync: SyncCoordinator,
    reader: Option<RecordReader<InboundChannel>>,
    outbound: Option<Arc<OutboundChannel>>,
}

impl<S: InputSink> Device<S> {
    pub fn new(
        config: DeviceConfig,
        sink: S,
        queue: Arc<dyn WorkQueue>,
        lock: Arc<InputLock>,
    ) -> Self {
        Self {
            config,
            state: DeviceState::Uninitialized,
            sink,
            queue,
            lock,
            dispatcher: Dispatcher::new(),
            sync: SyncCoordinator::new(),
            reader: None,
            outbound: None,
        }
    }

    /// Create the channel pair. `Uninitialized → Off`.
    ///
    /// On failure nothing is left behind and the device stays uninitialized.
    pub fn setup(&mut self) -> Result<()> {
        self.expect_state(&[DeviceState::Uninitialized], "set up")?;

        let channels = EventChannels::create(
            &self.config.events_in,
            &self.config.events_out,
            self.config.fifo_mode,
        )?;
        let (inbound, outbound) = channels.into_parts();

        self.reader = Some(RecordReader::with_batch(inbound, self.config.batch_records));
        self.outbound = Some(Arc::new(outbound));
        self.state = DeviceState::Off;

        info!(
            device = %self.config.name,
            device_type = %self.config.device_type,
            class = self.config.device_type.type_name(),
            "device initialized"
        );
        Ok(())
    }

    /// Start delivering input. `Off → On`.
    pub fn enable(&mut self, registry: &mut dyn ReadinessRegistry) -> Result<()> {
        self.expect_state(&[DeviceState::Off], "enable")?;

        if let Some(fd) = self.inbound_fd() {
            registry.watch(fd).map_err(DeviceError::Register)?;
        }
        self.dispatcher.set_deliverable(true);
        self.sync.arm();
        self.state = DeviceState::On;

        debug!(device = %self.config.name, "device enabled");
        Ok(())
    }

    /// Stop delivering input. `On → Off`; a no-op when already off.
    ///
    /// An outstanding sync request is abandoned.
    pub fn disable(&mut self, registry: &mut dyn ReadinessRegistry) -> Result<()> {
        match self.state {
            DeviceState::Off => return Ok(()),
            DeviceState::On => {}
            state => {
                return Err(DeviceError::InvalidTransition {
                    state,
                    operation: "disable",
                })
            }
        }

        if let Some(fd) = self.inbound_fd() {
            registry.unwatch(fd);
        }
        self.dispatcher.set_deliverable(false);
        if self.sync.disarm() {
            debug!(device = %self.config.name, "abandoned pending sync request");
        }
        self.state = DeviceState::Off;

        debug!(device = %self.config.name, "device disabled");
        Ok(())
    }

    /// Release every channel resource. `Uninitialized | Off → Closed`.
    pub fn close(&mut self) -> Result<()> {
        self.expect_state(&[DeviceState::Uninitialized, DeviceState::Off], "close")?;
        self.release();
        self.state = DeviceState::Closed;

        debug!(device = %self.config.name, "device closed");
        Ok(())
    }

    /// Drain the inbound channel while holding the input lock.
    ///
    /// Valid while `Off` or `On`; records read while off are dropped, sync
    /// markers are still recorded.
    pub fn on_readable(&mut self) -> Result<PassSummary> {
        self.expect_state(&[DeviceState::Off, DeviceState::On], "read")?;
        let Some(reader) = self.reader.as_mut() else {
            return Ok(PassSummary::new(DrainEnd::WouldBlock));
        };

        let lock = Arc::clone(&self.lock);
        let _guard = lock.lock();

        let mut counts = PassSummary::new(DrainEnd::WouldBlock);
        let report = reader.drain(|event| {
            let outcome = self
                .dispatcher
                .dispatch(event, &mut self.sink, &mut self.sync);
            counts.count(outcome);
        });
        counts.records = report.records;
        counts.end = report.end;

        if counts.records > 0 {
            debug!(
                device = %self.config.name,
                records = counts.records,
                forwarded = counts.forwarded,
                suppressed = counts.suppressed,
                sync_requests = counts.sync_requests,
                "processed inbound records"
            );
        }
        Ok(counts)
    }

    /// Drain check, called once the consumer has applied everything read so
    /// far. Posts an acknowledgment task when a sync request is pending.
    ///
    /// Returns whether a task was posted; always `false` unless `On`.
    pub fn input_drained(&mut self) -> bool {
        if self.state != DeviceState::On {
            return false;
        }
        let Some(outbound) = self.outbound.as_ref() else {
            return false;
        };
        self.sync
            .drained(&self.config.name, outbound, &self.lock, self.queue.as_ref())
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Whether a sync request is waiting for the next drain check.
    pub fn sync_pending(&self) -> bool {
        self.sync.is_pending()
    }

    /// Descriptor of the inbound channel while it is open.
    pub fn inbound_fd(&self) -> Option<RawFd> {
        self.reader.as_ref().map(|reader| reader.get_ref().as_raw_fd())
    }

    pub fn inbound_path(&self) -> &Path {
        &self.config.events_in
    }

    pub fn outbound_path(&self) -> &Path {
        &self.config.events_out
    }

    fn expect_state(&self, allowed: &[DeviceState], operation: &'static str) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(DeviceError::InvalidTransition {
                state: self.state,
                operation,
            })
        }
    }
}

impl<S> Device<S> {
    fn release(&mut self) {
        self.reader = None;
        self.outbound = None;
        self.dispatcher.set_deliverable(false);
        self.sync.disarm();
    }
}

impl<S> Drop for Device<S> {
    fn drop(&mut self) {
        if self.state == DeviceState::On {
            debug!(device = %self.config.name, "dropping enabled device");
        }
        self.release();
    }
}

impl<S> std::fmt::Debug for Device<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.config.name)
            .field("state", &self.state)
            .field("sync_pending", &self.sync.is_pending())
            .finish()
    }
}
