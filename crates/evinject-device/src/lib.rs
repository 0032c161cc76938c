//! Emulated input device driven by records from a producer.
//!
//! A [`Device`] owns one channel pair, decodes records when the host reports
//! the inbound channel readable, forwards them to an [`InputSink`] while
//! enabled and answers sync requests once the host has drained its input.
//! Hosts plug in through three seams: [`InputSink`], [`ReadinessRegistry`]
//! and [`WorkQueue`].

#![cfg(unix)]

pub mod config;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod sink;
pub mod sync;
pub mod work;

pub use config::{DeviceConfig, DeviceOptions, DeviceType, DEFAULT_IDENTIFIER};
pub use device::{Device, PassSummary};
pub use dispatch::{Dispatch, Dispatcher};
pub use error::{ConfigError, DeviceError, Result};
pub use lifecycle::{DeviceState, ReadinessRegistry};
pub use sink::{AxisMode, InputSink, Operation, Valuator, ValuatorMask, DEFAULT_MAX_VALUATORS};
pub use sync::{AckChannel, AckTask, InputGuard, InputLock, SyncCoordinator};
pub use work::{LocalWorkQueue, WorkQueue, WorkStatus, WorkTask};
