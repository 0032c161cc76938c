use std::io;
use std::os::fd::RawFd;
use std::time::Duration;

use evinject_device::ReadinessRegistry;

/// A watched descriptor that reported activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Readiness {
    pub fd: RawFd,
    pub readable: bool,
    /// Every writer went away; the descriptor stays ready until one returns.
    pub hangup: bool,
}

/// `poll(2)`-backed readiness registry for the CLI host loop.
#[derive(Debug, Default)]
pub struct PollRegistry {
    fds: Vec<RawFd>,
}

impl PollRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait up to `timeout` for watched descriptors to become ready.
    ///
    /// An interrupted wait reports nothing ready.
    pub fn wait(&self, timeout: Duration) -> io::Result<Vec<Readiness>> {
        if self.fds.is_empty() {
            std::thread::sleep(timeout);
            return Ok(Vec::new());
        }

        let mut pollfds: Vec<libc::pollfd> = self
            .fds
            .iter()
            .map(|&fd| libc::pollfd {
                fd,
                events: libc::POLLIN,
                revents: 0,
            })
            .collect();
        let timeout_ms = libc::c_int::try_from(timeout.as_millis()).unwrap_or(libc::c_int::MAX);

        // SAFETY: `pollfds` is a valid, exclusively borrowed array of `len` entries
        // for the duration of the call.
        let rc = unsafe {
            libc::poll(
                pollfds.as_mut_ptr(),
                pollfds.len() as libc::nfds_t,
                timeout_ms,
            )
        };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(Vec::new());
            }
            return Err(err);
        }

        Ok(pollfds
            .iter()
            .filter(|p| p.revents != 0)
            .map(|p| Readiness {
                fd: p.fd,
                readable: p.revents & libc::POLLIN != 0,
                hangup: p.revents & libc::POLLHUP != 0,
            })
            .collect())
    }
}

impl ReadinessRegistry for PollRegistry {
    fn watch(&mut self, fd: RawFd) -> io::Result<()> {
        if fd < 0 {
            return Err(io::Error::from_raw_os_error(libc::EBADF));
        }
        if !self.fds.contains(&fd) {
            self.fds.push(fd);
        }
        Ok(())
    }

    fn unwatch(&mut self, fd: RawFd) {
        self.fds.retain(|&watched| watched != fd);
    }
}
