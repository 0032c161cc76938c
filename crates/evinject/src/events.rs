//! JSON description of events for the `send` command.
//!
//! ```json
//! [
//!   {"type": "motion", "absolute": true, "valuators": {"0": 10.5, "1": -3.25}},
//!   {"type": "key", "code": 30, "down": true},
//!   {"type": "sync"}
//! ]
//! ```

use std::collections::BTreeMap;

use evinject_wire::{
    Button, Event, GesturePinch, GestureSwipe, Key, Motion, Proximity, Touch, ValuatorSet,
    WireError,
};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

type Axes = BTreeMap<usize, f64>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum EventSpec {
    Motion {
        #[serde(default)]
        absolute: bool,
        #[serde(default, deserialize_with = "axes")]
        valuators: Axes,
        #[serde(default, deserialize_with = "axes")]
        unaccelerated: Axes,
    },
    Proximity {
        #[serde(rename = "in")]
        is_in: bool,
        #[serde(default, deserialize_with = "axes")]
        valuators: Axes,
        #[serde(default, deserialize_with = "axes")]
        unaccelerated: Axes,
    },
    Button {
        #[serde(default)]
        absolute: bool,
        button: i32,
        down: bool,
        #[serde(default, deserialize_with = "axes")]
        valuators: Axes,
        #[serde(default, deserialize_with = "axes")]
        unaccelerated: Axes,
    },
    Key {
        code: i32,
        down: bool,
    },
    Touch {
        id: u32,
        phase: u16,
        #[serde(default)]
        flags: u32,
        #[serde(default, deserialize_with = "axes")]
        valuators: Axes,
        #[serde(default, deserialize_with = "axes")]
        unaccelerated: Axes,
    },
    Swipe {
        #[serde(default)]
        kind: u16,
        touches: u16,
        #[serde(default)]
        flags: u32,
        #[serde(default)]
        dx: f64,
        #[serde(default)]
        dy: f64,
        dx_unaccel: Option<f64>,
        dy_unaccel: Option<f64>,
    },
    Pinch {
        #[serde(default)]
        kind: u16,
        touches: u16,
        #[serde(default)]
        flags: u32,
        #[serde(default)]
        dx: f64,
        #[serde(default)]
        dy: f64,
        dx_unaccel: Option<f64>,
        dy_unaccel: Option<f64>,
        #[serde(default = "unit_scale")]
        scale: f64,
        #[serde(default)]
        angle: f64,
    },
    Sync,
}

fn unit_scale() -> f64 {
    1.0
}

/// Axis maps arrive with string keys ("0", "1", ...).
fn axes<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Axes, D::Error> {
    BTreeMap::<String, f64>::deserialize(deserializer)?
        .into_iter()
        .map(|(key, value)| {
            key.trim()
                .parse::<usize>()
                .map(|axis| (axis, value))
                .map_err(|_| D::Error::custom(format!("invalid axis index {key:?}")))
        })
        .collect()
}

/// Parse a JSON array of events, or a single event object.
pub fn parse_events(json: &str) -> Result<Vec<EventSpec>, serde_json::Error> {
    match serde_json::from_str::<serde_json::Value>(json)? {
        value @ serde_json::Value::Array(_) => serde_json::from_value(value),
        value => Ok(vec![serde_json::from_value(value)?]),
    }
}

impl EventSpec {
    /// Build the wire record. Unaccelerated entries for axes without a value
    /// are ignored.
    pub fn into_event(self) -> Result<Event, WireError> {
        Ok(match self {
            EventSpec::Motion {
                absolute,
                valuators,
                unaccelerated,
            } => Event::Motion(Motion {
                is_absolute: absolute,
                valuators: valuator_set(&valuators, &unaccelerated)?,
            }),
            EventSpec::Proximity {
                is_in,
                valuators,
                unaccelerated,
            } => Event::Proximity(Proximity {
                is_in,
                valuators: valuator_set(&valuators, &unaccelerated)?,
            }),
            EventSpec::Button {
                absolute,
                button,
                down,
                valuators,
                unaccelerated,
            } => Event::Button(Button {
                is_absolute: absolute,
                button,
                is_down: down,
                valuators: valuator_set(&valuators, &unaccelerated)?,
            }),
            EventSpec::Key { code, down } => Event::Key(Key {
                key_code: code,
                is_down: down,
            }),
            EventSpec::Touch {
                id,
                phase,
                flags,
                valuators,
                unaccelerated,
            } => Event::Touch(Touch {
                touch_id: id,
                phase,
                flags,
                valuators: valuator_set(&valuators, &unaccelerated)?,
            }),
            EventSpec::Swipe {
                kind,
                touches,
                flags,
                dx,
                dy,
                dx_unaccel,
                dy_unaccel,
            } => Event::GestureSwipe(GestureSwipe {
                kind,
                num_touches: touches,
                flags,
                delta_x: dx,
                delta_y: dy,
                delta_unaccel_x: dx_unaccel.unwrap_or(dx),
                delta_unaccel_y: dy_unaccel.unwrap_or(dy),
            }),
            EventSpec::Pinch {
                kind,
                touches,
                flags,
                dx,
                dy,
                dx_unaccel,
                dy_unaccel,
                scale,
                angle,
            } => Event::GesturePinch(GesturePinch {
                kind,
                num_touches: touches,
                flags,
                delta_x: dx,
                delta_y: dy,
                delta_unaccel_x: dx_unaccel.unwrap_or(dx),
                delta_unaccel_y: dy_unaccel.unwrap_or(dy),
                scale,
                delta_angle: angle,
            }),
            EventSpec::Sync => Event::WaitForSync,
        })
    }
}

fn valuator_set(values: &Axes, unaccelerated: &Axes) -> Result<ValuatorSet, WireError> {
    let mut set = ValuatorSet::new();
    for (&axis, &value) in values {
        match unaccelerated.get(&axis) {
            Some(&raw) => set.set_unaccelerated(axis, value, raw)?,
            None => set.set(axis, value)?,
        }
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_motion_with_string_axis_keys() {
        let specs =
            parse_events(r#"[{"type":"motion","absolute":true,"valuators":{"0":10.5,"1":-3.25}}]"#)
                .unwrap();
        let event = specs.into_iter().next().unwrap().into_event().unwrap();

        let Event::Motion(motion) = event else {
            panic!("expected motion");
        };
        assert!(motion.is_absolute);
        assert_eq!(motion.valuators.get(0), Some(10.5));
        assert_eq!(motion.valuators.get(1), Some(-3.25));
        assert!(!motion.valuators.has_unaccelerated());
    }

    #[test]
    fn single_object_is_accepted() {
        let specs = parse_events(r#"{"type":"key","code":30,"down":true}"#).unwrap();
        assert_eq!(
            specs,
            vec![EventSpec::Key {
                code: 30,
                down: true
            }]
        );
    }

    #[test]
    fn sync_maps_to_wait_for_sync() {
        let specs = parse_events(r#"[{"type":"sync"}]"#).unwrap();
        assert_eq!(specs[0].clone().into_event().unwrap(), Event::WaitForSync);
    }

    #[test]
    fn unaccelerated_pairs_with_values() {
        let spec = EventSpec::Motion {
            absolute: false,
            valuators: Axes::from([(0, 4.0), (1, 1.0)]),
            unaccelerated: Axes::from([(0, 2.0), (7, 9.0)]),
        };
        let Event::Motion(motion) = spec.into_event().unwrap() else {
            panic!("expected motion");
        };
        assert_eq!(motion.valuators.unaccelerated(0), Some(2.0));
        assert_eq!(motion.valuators.unaccelerated(1), Some(1.0));
        assert!(!motion.valuators.is_set(7));
    }

    #[test]
    fn out_of_range_axis_is_rejected() {
        let specs = parse_events(r#"[{"type":"motion","valuators":{"50":1.0}}]"#).unwrap();
        let err = specs[0].clone().into_event().unwrap_err();
        assert!(matches!(err, WireError::AxisOutOfRange { axis: 50, .. }));
    }

    #[test]
    fn non_numeric_axis_fails() {
        let err = parse_events(r#"[{"type":"motion","valuators":{"x":1.0}}]"#).unwrap_err();
        assert!(err.to_string().contains("invalid axis index"));
    }

    #[test]
    fn unknown_type_and_fields_fail() {
        assert!(parse_events(r#"[{"type":"scroll"}]"#).is_err());
        assert!(parse_events(r#"[{"type":"key","code":1,"down":true,"extra":1}]"#).is_err());
    }

    #[test]
    fn gesture_defaults() {
        let specs = parse_events(r#"[{"type":"pinch","touches":2,"dx":1.5}]"#).unwrap();
        let Event::GesturePinch(pinch) = specs[0].clone().into_event().unwrap() else {
            panic!("expected pinch");
        };
        assert_eq!(pinch.num_touches, 2);
        assert_eq!(pinch.scale, 1.0);
        assert_eq!(pinch.delta_unaccel_x, 1.5);
    }
}
