//! Decoded record variants.

use crate::valuator::ValuatorSet;

/// Record variant as identified by the leading tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum EventKind {
    Unknown = 0,
    WaitForSync = 1,
    Motion = 2,
    Proximity = 3,
    Button = 4,
    Key = 5,
    Touch = 6,
    GestureSwipe = 7,
    GesturePinch = 8,
}

impl EventKind {
    /// Map a wire tag to its kind; `None` for tags this version does not know.
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(Self::Unknown),
            1 => Some(Self::WaitForSync),
            2 => Some(Self::Motion),
            3 => Some(Self::Proximity),
            4 => Some(Self::Button),
            5 => Some(Self::Key),
            6 => Some(Self::Touch),
            7 => Some(Self::GestureSwipe),
            8 => Some(Self::GesturePinch),
            _ => None,
        }
    }

    pub fn tag(self) -> u32 {
        self as u32
    }

    /// Human-readable name for logs and CLI output.
    pub fn name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::WaitForSync => "wait_for_sync",
            Self::Motion => "motion",
            Self::Proximity => "proximity",
            Self::Button => "button",
            Self::Key => "key",
            Self::Touch => "touch",
            Self::GestureSwipe => "gesture_swipe",
            Self::GesturePinch => "gesture_pinch",
        }
    }
}

/// Pointer movement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Motion {
    pub is_absolute: bool,
    pub valuators: ValuatorSet,
}

/// Proximity in/out, as reported by tablets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Proximity {
    pub is_in: bool,
    pub valuators: ValuatorSet,
}

/// Button press or release.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Button {
    pub is_absolute: bool,
    pub button: i32,
    pub is_down: bool,
    pub valuators: ValuatorSet,
}

/// Key press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Key {
    pub key_code: i32,
    pub is_down: bool,
}

/// Touch point update. `phase` and `flags` are passed through untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Touch {
    pub touch_id: u32,
    pub phase: u16,
    pub flags: u32,
    pub valuators: ValuatorSet,
}

/// Swipe gesture step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GestureSwipe {
    pub kind: u16,
    pub num_touches: u16,
    pub flags: u32,
    pub delta_x: f64,
    pub delta_y: f64,
    pub delta_unaccel_x: f64,
    pub delta_unaccel_y: f64,
}

/// Pinch gesture step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GesturePinch {
    pub kind: u16,
    pub num_touches: u16,
    pub flags: u32,
    pub delta_x: f64,
    pub delta_y: f64,
    pub delta_unaccel_x: f64,
    pub delta_unaccel_y: f64,
    pub scale: f64,
    pub delta_angle: f64,
}

/// One decoded record.
#[allow(clippy::large_enum_variant)]
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Tag 0 or a tag this version does not recognise; carries the raw tag.
    Unknown(u32),
    /// Marker asking for an acknowledgment once everything before it is applied.
    WaitForSync,
    Motion(Motion),
    Proximity(Proximity),
    Button(Button),
    Key(Key),
    Touch(Touch),
    GestureSwipe(GestureSwipe),
    GesturePinch(GesturePinch),
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Unknown(_) => EventKind::Unknown,
            Self::WaitForSync => EventKind::WaitForSync,
            Self::Motion(_) => EventKind::Motion,
            Self::Proximity(_) => EventKind::Proximity,
            Self::Button(_) => EventKind::Button,
            Self::Key(_) => EventKind::Key,
            Self::Touch(_) => EventKind::Touch,
            Self::GestureSwipe(_) => EventKind::GestureSwipe,
            Self::GesturePinch(_) => EventKind::GesturePinch,
        }
    }

    /// The tag written on the wire for this record.
    pub fn tag(&self) -> u32 {
        match self {
            Self::Unknown(tag) => *tag,
            other => other.kind().tag(),
        }
    }

    /// Valuator set carried by this record, if the variant has one.
    pub fn valuators(&self) -> Option<&ValuatorSet> {
        match self {
            Self::Motion(Motion { valuators, .. })
            | Self::Proximity(Proximity { valuators, .. })
            | Self::Button(Button { valuators, .. })
            | Self::Touch(Touch { valuators, .. }) => Some(valuators),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip_through_kind() {
        for tag in 0..=8u32 {
            let kind = EventKind::from_tag(tag).unwrap();
            assert_eq!(kind.tag(), tag);
        }
        assert_eq!(EventKind::from_tag(9), None);
        assert_eq!(EventKind::from_tag(u32::MAX), None);
    }

    #[test]
    fn unknown_keeps_raw_tag() {
        let event = Event::Unknown(42);
        assert_eq!(event.kind(), EventKind::Unknown);
        assert_eq!(event.tag(), 42);
        assert_eq!(Event::WaitForSync.tag(), 1);
    }

    #[test]
    fn valuators_only_on_pointer_like_records() {
        let mut valuators = ValuatorSet::new();
        valuators.set(0, 1.0).unwrap();
        let motion = Event::Motion(Motion {
            is_absolute: true,
            valuators: valuators.clone(),
        });

        assert_eq!(motion.valuators(), Some(&valuators));
        assert_eq!(Event::Key(Key::default()).valuators(), None);
        assert_eq!(
            Event::GestureSwipe(GestureSwipe::default()).valuators(),
            None
        );
    }
}
