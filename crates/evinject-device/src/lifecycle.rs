use std::fmt;
use std::os::fd::RawFd;

/// Lifecycle state of a [`crate::Device`].
///
/// ```text
/// Uninitialized --setup--> Off --enable--> On --disable--> Off --close--> Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceState {
    /// Created, no channels yet.
    Uninitialized,
    /// Channels exist; records are read but not forwarded.
    Off,
    /// Registered with the host; records are forwarded.
    On,
    /// Resources released. Terminal.
    Closed,
}

impl DeviceState {
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceState::Uninitialized => "uninitialized",
            DeviceState::Off => "off",
            DeviceState::On => "on",
            DeviceState::Closed => "closed",
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host facility that reports when a descriptor becomes readable.
pub trait ReadinessRegistry {
    /// Start watching `fd` for readability.
    fn watch(&mut self, fd: RawFd) -> std::io::Result<()>;

    /// Stop watching `fd`. Unknown descriptors are ignored.
    fn unwatch(&mut self, fd: RawFd);
}
