use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use evinject_channel::Fifo;
use evinject_wire::DEFAULT_BATCH_RECORDS;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Device name used when no identifier is configured.
pub const DEFAULT_IDENTIFIER: &str = "emulated";

/// Kind of input device being emulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    Keyboard,
    Pointer,
    PointerGesture,
    PointerAbsolute,
    PointerAbsoluteProximity,
    Touch,
}

impl DeviceType {
    pub const ALL: [DeviceType; 6] = [
        DeviceType::Keyboard,
        DeviceType::Pointer,
        DeviceType::PointerGesture,
        DeviceType::PointerAbsolute,
        DeviceType::PointerAbsoluteProximity,
        DeviceType::Touch,
    ];

    /// Option value naming this type.
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceType::Keyboard => "Keyboard",
            DeviceType::Pointer => "Pointer",
            DeviceType::PointerGesture => "PointerGesture",
            DeviceType::PointerAbsolute => "PointerAbsolute",
            DeviceType::PointerAbsoluteProximity => "PointerAbsoluteProximity",
            DeviceType::Touch => "Touch",
        }
    }

    /// Input class the device is registered as.
    pub fn type_name(self) -> &'static str {
        match self {
            DeviceType::PointerGesture => "TOUCHPAD",
            DeviceType::Touch => "TOUCHSCREEN",
            DeviceType::Pointer | DeviceType::PointerAbsolute => "MOUSE",
            DeviceType::PointerAbsoluteProximity => "TABLET",
            DeviceType::Keyboard => "KEYBOARD",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = ConfigError;

    /// Names are case-sensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeviceType::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| ConfigError::UnsupportedType(s.to_string()))
    }
}

/// Raw device options, keyed like the host's configuration entries.
///
/// Every field is optional here; [`DeviceOptions::into_config`] enforces
/// which ones are required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeviceOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events_in_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events_out_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emulated_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fifo_mode: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_records: Option<usize>,
}

impl DeviceOptions {
    /// Load options from a JSON object on disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Fill every option unset in `self` from `fallback`.
    pub fn or(self, fallback: DeviceOptions) -> Self {
        Self {
            identifier: self.identifier.or(fallback.identifier),
            events_in_path: self.events_in_path.or(fallback.events_in_path),
            events_out_path: self.events_out_path.or(fallback.events_out_path),
            emulated_type: self.emulated_type.or(fallback.emulated_type),
            fifo_mode: self.fifo_mode.or(fallback.fifo_mode),
            batch_records: self.batch_records.or(fallback.batch_records),
        }
    }

    /// Validate the options.
    pub fn into_config(self) -> Result<DeviceConfig, ConfigError> {
        let events_in = self
            .events_in_path
            .ok_or(ConfigError::MissingOption("EventsInPath"))?;
        let events_out = self
            .events_out_path
            .ok_or(ConfigError::MissingOption("EventsOutPath"))?;
        let device_type = self
            .emulated_type
            .ok_or(ConfigError::MissingOption("EmulatedType"))?
            .parse()?;

        let batch_records = self.batch_records.unwrap_or(DEFAULT_BATCH_RECORDS);
        if batch_records == 0 {
            return Err(ConfigError::EmptyBatch);
        }

        Ok(DeviceConfig {
            name: self
                .identifier
                .unwrap_or_else(|| DEFAULT_IDENTIFIER.to_string()),
            device_type,
            events_in,
            events_out,
            fifo_mode: self.fifo_mode.unwrap_or(Fifo::DEFAULT_MODE),
            batch_records,
        })
    }
}

/// Validated configuration of one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// Name used in logs.
    pub name: String,
    pub device_type: DeviceType,
    /// Inbound (producer → device) FIFO path.
    pub events_in: PathBuf,
    /// Outbound (device → producer) FIFO path.
    pub events_out: PathBuf,
    /// Permission bits applied to both FIFOs.
    pub fifo_mode: u32,
    /// Records consumed per read.
    pub batch_records: usize,
}

impl DeviceConfig {
    /// Configuration with default name, mode and batch size.
    pub fn new(
        device_type: DeviceType,
        events_in: impl Into<PathBuf>,
        events_out: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: DEFAULT_IDENTIFIER.to_string(),
            device_type,
            events_in: events_in.into(),
            events_out: events_out.into(),
            fifo_mode: Fifo::DEFAULT_MODE,
            batch_records: DEFAULT_BATCH_RECORDS,
        }
    }

    /// Set the name used in logs.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> DeviceOptions {
        DeviceOptions {
            events_in_path: Some("/tmp/in".into()),
            events_out_path: Some("/tmp/out".into()),
            emulated_type: Some("Pointer".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn type_names() {
        assert_eq!(DeviceType::PointerGesture.type_name(), "TOUCHPAD");
        assert_eq!(DeviceType::Touch.type_name(), "TOUCHSCREEN");
        assert_eq!(DeviceType::Pointer.type_name(), "MOUSE");
        assert_eq!(DeviceType::PointerAbsolute.type_name(), "MOUSE");
        assert_eq!(DeviceType::PointerAbsoluteProximity.type_name(), "TABLET");
        assert_eq!(DeviceType::Keyboard.type_name(), "KEYBOARD");
    }

    #[test]
    fn parses_type_names_case_sensitively() {
        for ty in DeviceType::ALL {
            assert_eq!(ty.as_str().parse::<DeviceType>().unwrap(), ty);
        }
        let err = "pointer".parse::<DeviceType>().unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedType(name) if name == "pointer"));
    }

    #[test]
    fn applies_defaults() {
        let config = full().into_config().unwrap();
        assert_eq!(config.name, DEFAULT_IDENTIFIER);
        assert_eq!(config.device_type, DeviceType::Pointer);
        assert_eq!(config.fifo_mode, 0o600);
        assert_eq!(config.batch_records, DEFAULT_BATCH_RECORDS);
    }

    #[test]
    fn reports_first_missing_option() {
        let mut options = full();
        options.events_out_path = None;
        assert!(matches!(
            options.into_config(),
            Err(ConfigError::MissingOption("EventsOutPath"))
        ));

        let mut options = full();
        options.emulated_type = None;
        assert!(matches!(
            options.into_config(),
            Err(ConfigError::MissingOption("EmulatedType"))
        ));
    }

    #[test]
    fn rejects_empty_batch() {
        let mut options = full();
        options.batch_records = Some(0);
        assert!(matches!(options.into_config(), Err(ConfigError::EmptyBatch)));
    }

    #[test]
    fn deserializes_pascal_case_keys() {
        let options: DeviceOptions = serde_json::from_str(
            r#"{
                "Identifier": "touch0",
                "EventsInPath": "/run/touch0.in",
                "EventsOutPath": "/run/touch0.out",
                "EmulatedType": "Touch",
                "FifoMode": 432
            }"#,
        )
        .unwrap();

        let config = options.into_config().unwrap();
        assert_eq!(config.name, "touch0");
        assert_eq!(config.device_type, DeviceType::Touch);
        assert_eq!(config.events_in, PathBuf::from("/run/touch0.in"));
        assert_eq!(config.fifo_mode, 0o660);
    }

    #[test]
    fn explicit_options_win_over_fallback() {
        let explicit = DeviceOptions {
            emulated_type: Some("Keyboard".to_string()),
            ..Default::default()
        };
        let merged = explicit.or(full());
        assert_eq!(merged.emulated_type.as_deref(), Some("Keyboard"));
        assert_eq!(merged.events_in_path, Some(PathBuf::from("/tmp/in")));
    }

    #[test]
    fn loads_options_file() {
        let path = std::env::temp_dir().join(format!(
            "evinject-options-{}.json",
            std::process::id()
        ));
        std::fs::write(
            &path,
            r#"{"EventsInPath":"a","EventsOutPath":"b","EmulatedType":"Keyboard"}"#,
        )
        .unwrap();

        let options = DeviceOptions::from_json_file(&path).unwrap();
        assert_eq!(options.emulated_type.as_deref(), Some("Keyboard"));
        let _ = std::fs::remove_file(&path);

        let err = DeviceOptions::from_json_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
