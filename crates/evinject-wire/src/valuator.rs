use std::fmt;

use crate::error::{Result, WireError};

/// Number of valuator axes a record can carry.
///
/// Deliberately larger than any consumer's axis count so the record layout
/// never has to change when consumers grow more axes.
pub const MAX_VALUATORS: usize = 50;

/// Sparse set of axis values carried by pointer-like records.
///
/// A set bit in the mask marks the axis value as present. The unaccelerated
/// value of a present axis is only meaningful when the set as a whole is
/// flagged as carrying unaccelerated data.
#[derive(Clone)]
pub struct ValuatorSet {
    mask: u64,
    has_unaccelerated: bool,
    values: [f64; MAX_VALUATORS],
    unaccelerated: [f64; MAX_VALUATORS],
}

impl ValuatorSet {
    /// An empty set.
    pub fn new() -> Self {
        Self {
            mask: 0,
            has_unaccelerated: false,
            values: [0.0; MAX_VALUATORS],
            unaccelerated: [0.0; MAX_VALUATORS],
        }
    }

    /// Mark `axis` present with `value`.
    ///
    /// The unaccelerated slot mirrors `value` until overridden through
    /// [`ValuatorSet::set_unaccelerated`].
    pub fn set(&mut self, axis: usize, value: f64) -> Result<()> {
        check_axis(axis)?;
        self.mask |= 1u64 << axis;
        self.values[axis] = value;
        self.unaccelerated[axis] = value;
        Ok(())
    }

    /// Mark `axis` present with both an accelerated and an unaccelerated value.
    pub fn set_unaccelerated(&mut self, axis: usize, value: f64, unaccelerated: f64) -> Result<()> {
        check_axis(axis)?;
        self.mask |= 1u64 << axis;
        self.values[axis] = value;
        self.unaccelerated[axis] = unaccelerated;
        self.has_unaccelerated = true;
        Ok(())
    }

    /// Remove `axis` from the set. Out-of-range axes are ignored.
    pub fn unset(&mut self, axis: usize) {
        if axis < MAX_VALUATORS {
            self.mask &= !(1u64 << axis);
            self.values[axis] = 0.0;
            self.unaccelerated[axis] = 0.0;
        }
    }

    /// Remove every axis and the unaccelerated flag.
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    pub fn is_set(&self, axis: usize) -> bool {
        axis < MAX_VALUATORS && self.mask & (1u64 << axis) != 0
    }

    /// Value of `axis`, if present.
    pub fn get(&self, axis: usize) -> Option<f64> {
        self.is_set(axis).then(|| self.values[axis])
    }

    /// Unaccelerated value of `axis`, if present and the set carries unaccelerated data.
    pub fn unaccelerated(&self, axis: usize) -> Option<f64> {
        (self.has_unaccelerated && self.is_set(axis)).then(|| self.unaccelerated[axis])
    }

    pub fn has_unaccelerated(&self) -> bool {
        self.has_unaccelerated
    }

    /// Presence bitmask; bit `i` is axis `i`.
    pub fn mask(&self) -> u64 {
        self.mask
    }

    /// Number of present axes.
    pub fn len(&self) -> usize {
        self.mask.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.mask == 0
    }

    /// Present axes in ascending order as `(axis, value, unaccelerated)`.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64, Option<f64>)> + '_ {
        (0..MAX_VALUATORS)
            .filter(|&axis| self.is_set(axis))
            .map(|axis| (axis, self.values[axis], self.unaccelerated(axis)))
    }

    pub(crate) fn from_raw_parts(
        mask: u64,
        has_unaccelerated: bool,
        values: [f64; MAX_VALUATORS],
        unaccelerated: [f64; MAX_VALUATORS],
    ) -> Self {
        Self {
            mask: mask & ((1u64 << MAX_VALUATORS) - 1),
            has_unaccelerated,
            values,
            unaccelerated,
        }
    }

    pub(crate) fn raw_values(&self) -> &[f64; MAX_VALUATORS] {
        &self.values
    }

    pub(crate) fn raw_unaccelerated(&self) -> &[f64; MAX_VALUATORS] {
        &self.unaccelerated
    }
}

impl Default for ValuatorSet {
    fn default() -> Self {
        Self::new()
    }
}

// Slots of absent axes carry no meaning and are excluded from equality.
impl PartialEq for ValuatorSet {
    fn eq(&self, other: &Self) -> bool {
        self.mask == other.mask
            && self.has_unaccelerated == other.has_unaccelerated
            && self.iter().eq(other.iter())
    }
}

impl fmt::Debug for ValuatorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (axis, value, unaccelerated) in self.iter() {
            match unaccelerated {
                Some(raw) => map.entry(&axis, &(value, raw)),
                None => map.entry(&axis, &value),
            };
        }
        map.finish()
    }
}

fn check_axis(axis: usize) -> Result<()> {
    if axis >= MAX_VALUATORS {
        return Err(WireError::AxisOutOfRange {
            axis,
            max: MAX_VALUATORS - 1,
        });
    }
    Ok(())
}
