use evinject_wire::{GesturePinch, GestureSwipe, ValuatorSet};
use serde::Serialize;

/// Axis count of a typical consumer; axes at or above it are dropped.
pub const DEFAULT_MAX_VALUATORS: usize = 36;

/// Whether pointer coordinates are absolute positions or relative deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisMode {
    Relative,
    Absolute,
}

impl AxisMode {
    pub fn from_absolute(is_absolute: bool) -> Self {
        if is_absolute {
            AxisMode::Absolute
        } else {
            AxisMode::Relative
        }
    }
}

/// One present axis as handed to the consumer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Valuator {
    pub axis: usize,
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unaccelerated: Option<f64>,
}

/// Consumer-side valuator mask, reused across records.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValuatorMask {
    entries: Vec<Valuator>,
}

impl ValuatorMask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with every axis of `set` below `limit`.
    ///
    /// Entries carry the unaccelerated value only when the set is flagged
    /// as carrying unaccelerated data.
    pub fn fill_from(&mut self, set: &ValuatorSet, limit: usize) {
        self.entries.clear();
        self.entries.extend(
            set.iter()
                .take_while(|(axis, _, _)| *axis < limit)
                .map(|(axis, value, unaccelerated)| Valuator {
                    axis,
                    value,
                    unaccelerated,
                }),
        );
    }

    /// Value of `axis`, if present.
    pub fn get(&self, axis: usize) -> Option<f64> {
        self.entries
            .iter()
            .find(|entry| entry.axis == axis)
            .map(|entry| entry.value)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Valuator> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The live input consumer records are forwarded to.
///
/// Called only while the device is enabled, with the host's input lock held.
pub trait InputSink {
    /// Number of axes the consumer accepts.
    fn max_valuators(&self) -> usize {
        DEFAULT_MAX_VALUATORS
    }

    fn motion(&mut self, mode: AxisMode, valuators: &ValuatorMask);

    fn proximity(&mut self, is_in: bool, valuators: &ValuatorMask);

    fn button(&mut self, mode: AxisMode, button: i32, is_down: bool, valuators: &ValuatorMask);

    fn key(&mut self, key_code: i32, is_down: bool);

    fn touch(&mut self, touch_id: u32, phase: u16, flags: u32, valuators: &ValuatorMask);

    fn gesture_swipe(&mut self, swipe: &GestureSwipe);

    fn gesture_pinch(&mut self, pinch: &GesturePinch);
}

/// A forwarded consumer operation, captured by value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Motion {
        mode: AxisMode,
        valuators: ValuatorMask,
    },
    Proximity {
        is_in: bool,
        valuators: ValuatorMask,
    },
    Button {
        mode: AxisMode,
        button: i32,
        is_down: bool,
        valuators: ValuatorMask,
    },
    Key {
        key_code: i32,
        is_down: bool,
    },
    Touch {
        touch_id: u32,
        phase: u16,
        flags: u32,
        valuators: ValuatorMask,
    },
    GestureSwipe {
        kind: u16,
        num_touches: u16,
        flags: u32,
        delta_x: f64,
        delta_y: f64,
        delta_unaccel_x: f64,
        delta_unaccel_y: f64,
    },
    GesturePinch {
        kind: u16,
        num_touches: u16,
        flags: u32,
        delta_x: f64,
        delta_y: f64,
        delta_unaccel_x: f64,
        delta_unaccel_y: f64,
        scale: f64,
        delta_angle: f64,
    },
}

impl Operation {
    /// Short name of the operation.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Motion { .. } => "motion",
            Operation::Proximity { .. } => "proximity",
            Operation::Button { .. } => "button",
            Operation::Key { .. } => "key",
            Operation::Touch { .. } => "touch",
            Operation::GestureSwipe { .. } => "gesture_swipe",
            Operation::GesturePinch { .. } => "gesture_pinch",
        }
    }

    /// Valuators carried by the operation, if any.
    pub fn valuators(&self) -> Option<&ValuatorMask> {
        match self {
            Operation::Motion { valuators, .. }
            | Operation::Proximity { valuators, .. }
            | Operation::Button { valuators, .. }
            | Operation::Touch { valuators, .. } => Some(valuators),
            _ => None,
        }
    }
}

impl From<&GestureSwipe> for Operation {
    fn from(swipe: &GestureSwipe) -> Self {
        Operation::GestureSwipe {
            kind: swipe.kind,
            num_touches: swipe.num_touches,
            flags: swipe.flags,
            delta_x: swipe.delta_x,
            delta_y: swipe.delta_y,
            delta_unaccel_x: swipe.delta_unaccel_x,
            delta_unaccel_y: swipe.delta_unaccel_y,
        }
    }
}

impl From<&GesturePinch> for Operation {
    fn from(pinch: &GesturePinch) -> Self {
        Operation::GesturePinch {
            kind: pinch.kind,
            num_touches: pinch.num_touches,
            flags: pinch.flags,
            delta_x: pinch.delta_x,
            delta_y: pinch.delta_y,
            delta_unaccel_x: pinch.delta_unaccel_x,
            delta_unaccel_y: pinch.delta_unaccel_y,
            scale: pinch.scale,
            delta_angle: pinch.delta_angle,
        }
    }
}

/// Records every operation in order.
impl InputSink for Vec<Operation> {
    fn motion(&mut self, mode: AxisMode, valuators: &ValuatorMask) {
        self.push(Operation::Motion {
            mode,
            valuators: valuators.clone(),
        });
    }

    fn proximity(&mut self, is_in: bool, valuators: &ValuatorMask) {
        self.push(Operation::Proximity {
            is_in,
            valuators: valuators.clone(),
        });
    }

    fn button(&mut self, mode: AxisMode, button: i32, is_down: bool, valuators: &ValuatorMask) {
        self.push(Operation::Button {
            mode,
            button,
            is_down,
            valuators: valuators.clone(),
        });
    }

    fn key(&mut self, key_code: i32, is_down: bool) {
        self.push(Operation::Key { key_code, is_down });
    }

    fn touch(&mut self, touch_id: u32, phase: u16, flags: u32, valuators: &ValuatorMask) {
        self.push(Operation::Touch {
            touch_id,
            phase,
            flags,
            valuators: valuators.clone(),
        });
    }

    fn gesture_swipe(&mut self, swipe: &GestureSwipe) {
        self.push(swipe.into());
    }

    fn gesture_pinch(&mut self, pinch: &GesturePinch) {
        self.push(pinch.into());
    }
}
