use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use evinject_device::{
    AxisMode, Device, DeviceConfig, DeviceOptions, InputLock, InputSink, LocalWorkQueue,
    Operation, ValuatorMask, WorkQueue, DEFAULT_MAX_VALUATORS,
};
use evinject_wire::{DrainEnd, GesturePinch, GestureSwipe};
use tracing::info;

use crate::cmd::ServeArgs;
use crate::exit::{config_error, device_error, io_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::host::PollRegistry;
use crate::output::{print_operation, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
// POLLHUP stays raised after the last producer leaves.
const HANGUP_BACKOFF: Duration = Duration::from_millis(20);

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let config = resolve_config(&args)?;

    let queue = Arc::new(LocalWorkQueue::new());
    let lock = Arc::new(InputLock::new());
    let shared_queue: Arc<dyn WorkQueue> = queue.clone();
    let sink = PrintingSink::new(&config.name, format, args.count);

    let mut device = Device::new(config, sink, shared_queue, lock);
    let mut registry = PollRegistry::new();
    device
        .setup()
        .map_err(|err| device_error("setup failed", err))?;
    device
        .enable(&mut registry)
        .map_err(|err| device_error("enable failed", err))?;

    info!(
        device = device.name(),
        events_in = ?device.inbound_path(),
        events_out = ?device.outbound_path(),
        "serving"
    );

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    while running.load(Ordering::SeqCst) && !device.sink().is_finished() {
        let ready = registry
            .wait(POLL_INTERVAL)
            .map_err(|err| io_error("wait failed", err))?;

        let mut hung_up = false;
        if ready.iter().any(|r| r.readable || r.hangup) {
            let pass = device
                .on_readable()
                .map_err(|err| device_error("read failed", err))?;
            hung_up = needs_backoff(&pass.end);
        }

        device.input_drained();
        queue.run_pending();

        if hung_up {
            std::thread::sleep(HANGUP_BACKOFF);
        }
    }

    // Answer a sync request that arrived with the final records.
    device.input_drained();
    queue.run_pending();

    device
        .disable(&mut registry)
        .map_err(|err| device_error("disable failed", err))?;
    device
        .close()
        .map_err(|err| device_error("close failed", err))?;
    Ok(SUCCESS)
}

/// Only a hang-up warrants backing off. Read and framing errors are already
/// logged by the reader and the channel stays watched.
fn needs_backoff(end: &DrainEnd) -> bool {
    matches!(end, DrainEnd::Closed)
}

fn resolve_config(args: &ServeArgs) -> CliResult<DeviceConfig> {
    let overrides = DeviceOptions {
        identifier: args.name.clone(),
        events_in_path: args.events_in.clone(),
        events_out_path: args.events_out.clone(),
        emulated_type: args.device_type.clone(),
        fifo_mode: args.mode,
        batch_records: None,
    };

    let options = match &args.config {
        Some(path) => {
            let file = DeviceOptions::from_json_file(path)
                .map_err(|err| config_error("failed loading options", err))?;
            overrides.or(file)
        }
        None => overrides,
    };
    options
        .into_config()
        .map_err(|err| config_error("invalid options", err))
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

/// Consumer that prints each operation as it arrives.
struct PrintingSink {
    device: String,
    format: OutputFormat,
    limit: Option<usize>,
    printed: usize,
    pending: Vec<Operation>,
}

impl PrintingSink {
    fn new(device: &str, format: OutputFormat, limit: Option<usize>) -> Self {
        Self {
            device: device.to_string(),
            format,
            limit,
            printed: 0,
            pending: Vec::new(),
        }
    }

    fn is_finished(&self) -> bool {
        self.limit.is_some_and(|limit| self.printed >= limit)
    }

    fn emit(&mut self) {
        for operation in self.pending.drain(..) {
            if self.limit.is_some_and(|limit| self.printed >= limit) {
                continue;
            }
            self.printed += 1;
            print_operation(self.printed, &self.device, &operation, self.format);
        }
    }
}

impl InputSink for PrintingSink {
    fn max_valuators(&self) -> usize {
        DEFAULT_MAX_VALUATORS
    }

    fn motion(&mut self, mode: AxisMode, valuators: &ValuatorMask) {
        self.pending.motion(mode, valuators);
        self.emit();
    }

    fn proximity(&mut self, is_in: bool, valuators: &ValuatorMask) {
        self.pending.proximity(is_in, valuators);
        self.emit();
    }

    fn button(&mut self, mode: AxisMode, button: i32, is_down: bool, valuators: &ValuatorMask) {
        self.pending.button(mode, button, is_down, valuators);
        self.emit();
    }

    fn key(&mut self, key_code: i32, is_down: bool) {
        self.pending.key(key_code, is_down);
        self.emit();
    }

    fn touch(&mut self, touch_id: u32, phase: u16, flags: u32, valuators: &ValuatorMask) {
        self.pending.touch(touch_id, phase, flags, valuators);
        self.emit();
    }

    fn gesture_swipe(&mut self, swipe: &GestureSwipe) {
        self.pending.gesture_swipe(swipe);
        self.emit();
    }

    fn gesture_pinch(&mut self, pinch: &GesturePinch) {
        self.pending.gesture_pinch(pinch);
        self.emit();
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use evinject_device::DeviceType;

    use super::*;

    fn serve_args() -> ServeArgs {
        ServeArgs {
            events_in: Some(PathBuf::from("/tmp/in.fifo")),
            events_out: Some(PathBuf::from("/tmp/out.fifo")),
            device_type: Some("Keyboard".to_string()),
            name: None,
            config: None,
            mode: None,
            count: None,
        }
    }

    #[test]
    fn cli_arguments_build_config() {
        let config = resolve_config(&serve_args()).unwrap();
        assert_eq!(config.device_type, DeviceType::Keyboard);
        assert_eq!(config.events_in, PathBuf::from("/tmp/in.fifo"));
        assert_eq!(config.fifo_mode, 0o600);
    }

    #[test]
    fn missing_type_is_a_config_error() {
        let mut args = serve_args();
        args.device_type = None;
        let err = resolve_config(&args).unwrap_err();
        assert_eq!(err.code, crate::exit::CONFIG);
        assert!(err.message.contains("EmulatedType"));
    }

    #[test]
    fn cli_arguments_override_options_file() {
        let dir = std::env::temp_dir().join(format!("evinject-serve-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("options.json");
        std::fs::write(
            &file,
            r#"{"Identifier":"pad","EventsInPath":"/tmp/a","EventsOutPath":"/tmp/b","EmulatedType":"Pointer"}"#,
        )
        .unwrap();

        let mut args = serve_args();
        args.events_out = None;
        args.config = Some(file);
        let config = resolve_config(&args).unwrap();
        assert_eq!(config.name, "pad");
        assert_eq!(config.device_type, DeviceType::Keyboard);
        assert_eq!(config.events_in, PathBuf::from("/tmp/in.fifo"));
        assert_eq!(config.events_out, PathBuf::from("/tmp/b"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn only_hangup_backs_off() {
        assert!(needs_backoff(&DrainEnd::Closed));
        assert!(!needs_backoff(&DrainEnd::WouldBlock));
        assert!(!needs_backoff(&DrainEnd::ReadError(std::io::Error::other(
            "device gone"
        ))));
    }

    #[test]
    fn sink_stops_printing_at_limit() {
        let mut sink = PrintingSink::new("test", OutputFormat::Pretty, Some(2));
        sink.key(30, true);
        assert!(!sink.is_finished());
        sink.key(30, false);
        sink.key(31, true);
        assert!(sink.is_finished());
        assert_eq!(sink.printed, 2);
        assert!(sink.pending.is_empty());
    }
}
