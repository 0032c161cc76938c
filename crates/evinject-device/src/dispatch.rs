use evinject_wire::Event;
use tracing::trace;

use crate::sink::{AxisMode, InputSink, ValuatorMask};
use crate::sync::SyncCoordinator;

/// What happened to one decoded record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Handed to the consumer.
    Forwarded,
    /// A sync marker; recorded with the coordinator.
    SyncRequested,
    /// Decoded while the device is not deliverable and dropped.
    Suppressed,
    /// Unknown record, nothing to do.
    Ignored,
}

/// Turns decoded records into consumer operations.
#[derive(Debug, Default)]
pub struct Dispatcher {
    mask: ValuatorMask,
    deliverable: bool,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gate forwarding; records dispatched while closed are suppressed.
    pub fn set_deliverable(&mut self, deliverable: bool) {
        self.deliverable = deliverable;
    }

    /// Route one record. Sync markers reach `sync` regardless of the gate.
    pub fn dispatch<S: InputSink + ?Sized>(
        &mut self,
        event: Event,
        sink: &mut S,
        sync: &mut SyncCoordinator,
    ) -> Dispatch {
        let kind = event.kind();
        let limit = sink.max_valuators();
        match &event {
            Event::WaitForSync => {
                trace!("sync requested");
                sync.request();
                return Dispatch::SyncRequested;
            }
            Event::Unknown(tag) => {
                trace!(tag, "ignoring unknown record");
                return Dispatch::Ignored;
            }
            _ if !self.deliverable => {
                trace!(kind = kind.name(), "device off, dropping record");
                return Dispatch::Suppressed;
            }
            Event::Motion(motion) => {
                self.mask.fill_from(&motion.valuators, limit);
                sink.motion(AxisMode::from_absolute(motion.is_absolute), &self.mask);
            }
            Event::Proximity(proximity) => {
                self.mask.fill_from(&proximity.valuators, limit);
                sink.proximity(proximity.is_in, &self.mask);
            }
            Event::Button(button) => {
                self.mask.fill_from(&button.valuators, limit);
                sink.button(
                    AxisMode::from_absolute(button.is_absolute),
                    button.button,
                    button.is_down,
                    &self.mask,
                );
            }
            Event::Key(key) => sink.key(key.key_code, key.is_down),
            Event::Touch(touch) => {
                self.mask.fill_from(&touch.valuators, limit);
                sink.touch(touch.touch_id, touch.phase, touch.flags, &self.mask);
            }
            Event::GestureSwipe(swipe) => sink.gesture_swipe(swipe),
            Event::GesturePinch(pinch) => sink.gesture_pinch(pinch),
        }
        trace!(kind = kind.name(), "forwarded record");
        Dispatch::Forwarded
    }
}
