use std::mem::{offset_of, size_of};

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Result, WireError};
use crate::record::{
    Button, Event, EventKind, GesturePinch, GestureSwipe, Key, Motion, Proximity, Touch,
};
use crate::valuator::{ValuatorSet, MAX_VALUATORS};

/// C layout of every record variant. Only used for sizes and offsets; the
/// codec never reinterprets bytes as these types.
#[allow(dead_code)]
mod layout {
    use super::MAX_VALUATORS;

    /// Byte length of the presence mask. Producers declare it as
    /// `MAX + 7 / 8`, which is `MAX` bytes; only the leading bytes carry bits.
    pub const MASK_LEN: usize = MAX_VALUATORS;

    #[derive(Clone, Copy)]
    #[repr(C)]
    pub struct Valuators {
        pub has_unaccelerated: u8,
        pub mask: [u8; MASK_LEN],
        pub values: [f64; MAX_VALUATORS],
        pub unaccelerated: [f64; MAX_VALUATORS],
    }

    /// Motion and proximity share this layout.
    #[derive(Clone, Copy)]
    #[repr(C)]
    pub struct Pointer {
        pub tag: u32,
        pub flag: i32,
        pub valuators: Valuators,
    }

    #[derive(Clone, Copy)]
    #[repr(C)]
    pub struct Button {
        pub tag: u32,
        pub is_absolute: i32,
        pub button: i32,
        pub is_down: i32,
        pub valuators: Valuators,
    }

    #[derive(Clone, Copy)]
    #[repr(C)]
    pub struct Key {
        pub tag: u32,
        pub key_code: i32,
        pub is_down: i32,
    }

    #[derive(Clone, Copy)]
    #[repr(C)]
    pub struct Touch {
        pub tag: u32,
        pub touch_id: u32,
        pub phase: u16,
        pub flags: u32,
        pub valuators: Valuators,
    }

    /// Swipe is the leading part of this layout.
    #[derive(Clone, Copy)]
    #[repr(C)]
    pub struct Gesture {
        pub tag: u32,
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

    #[repr(C)]
    pub union Record {
        pub tag: u32,
        pub pointer: Pointer,
        pub button: Button,
        pub key: Key,
        pub touch: Touch,
        pub gesture: Gesture,
    }
}

/// Size in bytes of every record on the wire.
pub const RECORD_SIZE: usize = size_of::<layout::Record>();

const MASK_BITS_LEN: usize = MAX_VALUATORS.div_ceil(8);

const V_HAS_UNACCEL: usize = offset_of!(layout::Valuators, has_unaccelerated);
const V_MASK: usize = offset_of!(layout::Valuators, mask);
const V_VALUES: usize = offset_of!(layout::Valuators, values);
const V_UNACCEL: usize = offset_of!(layout::Valuators, unaccelerated);

const POINTER_FLAG: usize = offset_of!(layout::Pointer, flag);
const POINTER_VALUATORS: usize = offset_of!(layout::Pointer, valuators);

const BUTTON_ABSOLUTE: usize = offset_of!(layout::Button, is_absolute);
const BUTTON_BUTTON: usize = offset_of!(layout::Button, button);
const BUTTON_DOWN: usize = offset_of!(layout::Button, is_down);
const BUTTON_VALUATORS: usize = offset_of!(layout::Button, valuators);

const KEY_CODE: usize = offset_of!(layout::Key, key_code);
const KEY_DOWN: usize = offset_of!(layout::Key, is_down);

const TOUCH_ID: usize = offset_of!(layout::Touch, touch_id);
const TOUCH_PHASE: usize = offset_of!(layout::Touch, phase);
const TOUCH_FLAGS: usize = offset_of!(layout::Touch, flags);
const TOUCH_VALUATORS: usize = offset_of!(layout::Touch, valuators);

const GESTURE_KIND: usize = offset_of!(layout::Gesture, kind);
const GESTURE_TOUCHES: usize = offset_of!(layout::Gesture, num_touches);
const GESTURE_FLAGS: usize = offset_of!(layout::Gesture, flags);
const GESTURE_DX: usize = offset_of!(layout::Gesture, delta_x);
const GESTURE_DY: usize = offset_of!(layout::Gesture, delta_y);
const GESTURE_UDX: usize = offset_of!(layout::Gesture, delta_unaccel_x);
const GESTURE_UDY: usize = offset_of!(layout::Gesture, delta_unaccel_y);
const GESTURE_SCALE: usize = offset_of!(layout::Gesture, scale);
const GESTURE_ANGLE: usize = offset_of!(layout::Gesture, delta_angle);

/// Decode exactly one record.
///
/// Returns [`WireError::RecordSize`] unless `src` is exactly [`RECORD_SIZE`]
/// bytes. Unrecognised tags decode as [`Event::Unknown`].
pub fn decode_record(src: &[u8]) -> Result<Event> {
    if src.len() != RECORD_SIZE {
        return Err(WireError::RecordSize {
            expected: RECORD_SIZE,
            actual: src.len(),
        });
    }
    Ok(decode_exact(src))
}

/// Decode a slice already known to be `RECORD_SIZE` bytes long.
pub(crate) fn decode_exact(src: &[u8]) -> Event {
    debug_assert_eq!(src.len(), RECORD_SIZE);

    let tag = get_u32(src, 0);
    let Some(kind) = EventKind::from_tag(tag) else {
        return Event::Unknown(tag);
    };

    match kind {
        EventKind::Unknown => Event::Unknown(tag),
        EventKind::WaitForSync => Event::WaitForSync,
        EventKind::Motion => Event::Motion(Motion {
            is_absolute: get_i32(src, POINTER_FLAG) != 0,
            valuators: get_valuators(&src[POINTER_VALUATORS..]),
        }),
        EventKind::Proximity => Event::Proximity(Proximity {
            is_in: get_i32(src, POINTER_FLAG) != 0,
            valuators: get_valuators(&src[POINTER_VALUATORS..]),
        }),
        EventKind::Button => Event::Button(Button {
            is_absolute: get_i32(src, BUTTON_ABSOLUTE) != 0,
            button: get_i32(src, BUTTON_BUTTON),
            is_down: get_i32(src, BUTTON_DOWN) != 0,
            valuators: get_valuators(&src[BUTTON_VALUATORS..]),
        }),
        EventKind::Key => Event::Key(Key {
            key_code: get_i32(src, KEY_CODE),
            is_down: get_i32(src, KEY_DOWN) != 0,
        }),
        EventKind::Touch => Event::Touch(Touch {
            touch_id: get_u32(src, TOUCH_ID),
            phase: get_u16(src, TOUCH_PHASE),
            flags: get_u32(src, TOUCH_FLAGS),
            valuators: get_valuators(&src[TOUCH_VALUATORS..]),
        }),
        EventKind::GestureSwipe => Event::GestureSwipe(GestureSwipe {
            kind: get_u16(src, GESTURE_KIND),
            num_touches: get_u16(src, GESTURE_TOUCHES),
            flags: get_u32(src, GESTURE_FLAGS),
            delta_x: get_f64(src, GESTURE_DX),
            delta_y: get_f64(src, GESTURE_DY),
            delta_unaccel_x: get_f64(src, GESTURE_UDX),
            delta_unaccel_y: get_f64(src, GESTURE_UDY),
        }),
        EventKind::GesturePinch => Event::GesturePinch(GesturePinch {
            kind: get_u16(src, GESTURE_KIND),
            num_touches: get_u16(src, GESTURE_TOUCHES),
            flags: get_u32(src, GESTURE_FLAGS),
            delta_x: get_f64(src, GESTURE_DX),
            delta_y: get_f64(src, GESTURE_DY),
            delta_unaccel_x: get_f64(src, GESTURE_UDX),
            delta_unaccel_y: get_f64(src, GESTURE_UDY),
            scale: get_f64(src, GESTURE_SCALE),
            delta_angle: get_f64(src, GESTURE_ANGLE),
        }),
    }
}

/// Append one zero-padded record for `event` to `dst`.
pub fn encode_event(event: &Event, dst: &mut BytesMut) {
    let start = dst.len();
    dst.resize(start + RECORD_SIZE, 0);
    let rec = &mut dst[start..];

    put_u32(rec, 0, event.tag());
    match event {
        Event::Unknown(_) | Event::WaitForSync => {}
        Event::Motion(motion) => {
            put_i32(rec, POINTER_FLAG, motion.is_absolute as i32);
            put_valuators(&mut rec[POINTER_VALUATORS..], &motion.valuators);
        }
        Event::Proximity(proximity) => {
            put_i32(rec, POINTER_FLAG, proximity.is_in as i32);
            put_valuators(&mut rec[POINTER_VALUATORS..], &proximity.valuators);
        }
        Event::Button(button) => {
            put_i32(rec, BUTTON_ABSOLUTE, button.is_absolute as i32);
            put_i32(rec, BUTTON_BUTTON, button.button);
            put_i32(rec, BUTTON_DOWN, button.is_down as i32);
            put_valuators(&mut rec[BUTTON_VALUATORS..], &button.valuators);
        }
        Event::Key(key) => {
            put_i32(rec, KEY_CODE, key.key_code);
            put_i32(rec, KEY_DOWN, key.is_down as i32);
        }
        Event::Touch(touch) => {
            put_u32(rec, TOUCH_ID, touch.touch_id);
            put_u16(rec, TOUCH_PHASE, touch.phase);
            put_u32(rec, TOUCH_FLAGS, touch.flags);
            put_valuators(&mut rec[TOUCH_VALUATORS..], &touch.valuators);
        }
        Event::GestureSwipe(swipe) => {
            put_u16(rec, GESTURE_KIND, swipe.kind);
            put_u16(rec, GESTURE_TOUCHES, swipe.num_touches);
            put_u32(rec, GESTURE_FLAGS, swipe.flags);
            put_f64(rec, GESTURE_DX, swipe.delta_x);
            put_f64(rec, GESTURE_DY, swipe.delta_y);
            put_f64(rec, GESTURE_UDX, swipe.delta_unaccel_x);
            put_f64(rec, GESTURE_UDY, swipe.delta_unaccel_y);
        }
        Event::GesturePinch(pinch) => {
            put_u16(rec, GESTURE_KIND, pinch.kind);
            put_u16(rec, GESTURE_TOUCHES, pinch.num_touches);
            put_u32(rec, GESTURE_FLAGS, pinch.flags);
            put_f64(rec, GESTURE_DX, pinch.delta_x);
            put_f64(rec, GESTURE_DY, pinch.delta_y);
            put_f64(rec, GESTURE_UDX, pinch.delta_unaccel_x);
            put_f64(rec, GESTURE_UDY, pinch.delta_unaccel_y);
            put_f64(rec, GESTURE_SCALE, pinch.scale);
            put_f64(rec, GESTURE_ANGLE, pinch.delta_angle);
        }
    }
}

fn get_valuators(src: &[u8]) -> ValuatorSet {
    let mut mask = 0u64;
    for (i, byte) in src[V_MASK..V_MASK + MASK_BITS_LEN].iter().enumerate() {
        mask |= u64::from(*byte) << (i * 8);
    }

    let mut values = [0.0; MAX_VALUATORS];
    let mut unaccelerated = [0.0; MAX_VALUATORS];
    let mut raw = &src[V_VALUES..];
    for value in values.iter_mut() {
        *value = raw.get_f64_ne();
    }
    let mut raw = &src[V_UNACCEL..];
    for value in unaccelerated.iter_mut() {
        *value = raw.get_f64_ne();
    }

    ValuatorSet::from_raw_parts(mask, src[V_HAS_UNACCEL] != 0, values, unaccelerated)
}

fn put_valuators(dst: &mut [u8], set: &ValuatorSet) {
    dst[V_HAS_UNACCEL] = set.has_unaccelerated() as u8;
    let mask = set.mask();
    for (i, byte) in dst[V_MASK..V_MASK + MASK_BITS_LEN].iter_mut().enumerate() {
        *byte = (mask >> (i * 8)) as u8;
    }

    let mut raw = &mut dst[V_VALUES..];
    for value in set.raw_values() {
        raw.put_f64_ne(*value);
    }
    let mut raw = &mut dst[V_UNACCEL..];
    for value in set.raw_unaccelerated() {
        raw.put_f64_ne(*value);
    }
}

fn get_u16(src: &[u8], offset: usize) -> u16 {
    (&src[offset..]).get_u16_ne()
}

fn get_u32(src: &[u8], offset: usize) -> u32 {
    (&src[offset..]).get_u32_ne()
}

fn get_i32(src: &[u8], offset: usize) -> i32 {
    (&src[offset..]).get_i32_ne()
}

fn get_f64(src: &[u8], offset: usize) -> f64 {
    (&src[offset..]).get_f64_ne()
}

fn put_u16(dst: &mut [u8], offset: usize, value: u16) {
    (&mut dst[offset..]).put_u16_ne(value);
}

fn put_u32(dst: &mut [u8], offset: usize, value: u32) {
    (&mut dst[offset..]).put_u32_ne(value);
}

fn put_i32(dst: &mut [u8], offset: usize, value: i32) {
    (&mut dst[offset..]).put_i32_ne(value);
}

fn put_f64(dst: &mut [u8], offset: usize, value: f64) {
    (&mut dst[offset..]).put_f64_ne(value);
}
