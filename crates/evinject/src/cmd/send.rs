use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Read};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::time::{Duration, Instant};

use evinject_channel::SYNC_ACK;
use evinject_wire::{Event, RecordWriter};
use tracing::{debug, warn};

use crate::cmd::{parse_duration, SendArgs};
use crate::events::parse_events;
use crate::exit::{
    io_error, wire_error, CliError, CliResult, DATA_INVALID, FAILURE, SUCCESS, TIMEOUT, USAGE,
};
use crate::output::{print_send_report, OutputFormat, SendReport};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let mut events = resolve_events(&args)?;

    // The ack reader must exist before the sync marker is written.
    let mut ack_reader = match (&args.out, args.sync) {
        (Some(out), true) => {
            let mut reader = open_ack_reader(out)?;
            let stale = discard_stale(&mut reader)
                .map_err(|err| io_error(&format!("failed reading {}", out.display()), err))?;
            if stale > 0 {
                debug!(bytes = stale, "discarded stale acknowledgments");
            }
            Some(reader)
        }
        _ => None,
    };

    if ack_reader.is_some() {
        events.push(Event::WaitForSync);
    }

    let inbound = open_inbound(&args.path)?;
    let mut writer = RecordWriter::new(inbound);
    writer
        .send_all(&events)
        .map_err(|err| wire_error("send failed", err))?;

    if let Some(reader) = ack_reader.as_mut() {
        wait_for_ack(reader, timeout)?;
    }

    let path = args.path.display().to_string();
    print_send_report(
        &SendReport {
            path: &path,
            records: events.len(),
            synced: ack_reader.is_some(),
        },
        format,
    );
    Ok(SUCCESS)
}

fn resolve_events(args: &SendArgs) -> CliResult<Vec<Event>> {
    let json = match (&args.json, &args.file) {
        (Some(json), _) => json.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?,
        (None, None) => return Err(CliError::new(USAGE, "one of --json or --file is required")),
    };

    let specs = parse_events(&json)
        .map_err(|err| CliError::new(DATA_INVALID, format!("invalid events: {err}")))?;
    specs
        .into_iter()
        .map(|spec| {
            spec.into_event()
                .map_err(|err| wire_error("invalid event", err))
        })
        .collect()
}

fn open_ack_reader(path: &Path) -> CliResult<File> {
    OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
        .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))
}

/// Read and drop acknowledgments left over from earlier producers.
fn discard_stale(reader: &mut impl Read) -> io::Result<usize> {
    let mut buf = [0u8; 64];
    let mut total = 0usize;
    loop {
        match reader.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => total += n,
            Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(total),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
}

/// Open the inbound FIFO for writing without hanging when no device is
/// reading it, then switch the descriptor back to blocking writes.
fn open_inbound(path: &Path) -> CliResult<File> {
    let file = OpenOptions::new()
        .write(true)
        .custom_flags(libc::O_NONBLOCK)
        .open(path)
        .map_err(|err| {
            if err.raw_os_error() == Some(libc::ENXIO) {
                CliError::new(FAILURE, format!("no device is reading {}", path.display()))
            } else {
                io_error(&format!("failed opening {}", path.display()), err)
            }
        })?;

    let fd = file.as_raw_fd();
    // SAFETY: `fd` is owned by `file`, which outlives both calls.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io_error("fcntl failed", io::Error::last_os_error()));
    }
    // SAFETY: as above; only the status flags of our own descriptor change.
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags & !libc::O_NONBLOCK) } < 0 {
        return Err(io_error("fcntl failed", io::Error::last_os_error()));
    }
    Ok(file)
}

fn wait_for_ack(reader: &mut File, timeout: Duration) -> CliResult<()> {
    let deadline = Instant::now() + timeout;
    loop {
        let mut byte = [0u8; 1];
        match reader.read(&mut byte) {
            Ok(1) if byte[0] == SYNC_ACK => return Ok(()),
            Ok(1) => warn!(byte = byte[0], "unexpected byte on outbound channel"),
            Ok(_) => {
                return Err(CliError::new(
                    FAILURE,
                    "outbound channel closed before acknowledgment",
                ))
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => {}
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(io_error("failed reading acknowledgment", err)),
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(CliError::new(
                TIMEOUT,
                format!("no acknowledgment within {timeout:?}"),
            ));
        }
        poll_readable(reader, remaining)?;
    }
}

fn poll_readable(reader: &File, timeout: Duration) -> CliResult<()> {
    let mut pollfd = libc::pollfd {
        fd: reader.as_raw_fd(),
        events: libc::POLLIN,
        revents: 0,
    };
    let timeout_ms = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);
    // SAFETY: `pollfd` is a single valid entry borrowed for the call.
    let rc = unsafe { libc::poll(&mut pollfd, 1, timeout_ms) };
    if rc < 0 {
        let err = io::Error::last_os_error();
        if err.kind() != ErrorKind::Interrupted {
            return Err(io_error("poll failed", err));
        }
    }
    Ok(())
}
