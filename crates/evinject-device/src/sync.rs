use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError, Weak};

use evinject_channel::OutboundChannel;
use tracing::{debug, trace, warn};

use crate::work::{WorkQueue, WorkStatus, WorkTask};

/// Exclusion domain held while records are applied to the consumer.
///
/// Shared between the device and the acknowledgment tasks it posts. A
/// poisoned lock is recovered rather than propagated.
#[derive(Debug, Default)]
pub struct InputLock {
    inner: Mutex<()>,
}

/// Proof that the [`InputLock`] is held.
#[derive(Debug)]
pub struct InputGuard<'a> {
    _guard: MutexGuard<'a, ()>,
}

impl InputLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the lock is held.
    pub fn lock(&self) -> InputGuard<'_> {
        InputGuard {
            _guard: self.inner.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Take the lock only if nobody holds it.
    pub fn try_lock(&self) -> Option<InputGuard<'_>> {
        match self.inner.try_lock() {
            Ok(guard) => Some(InputGuard { _guard: guard }),
            Err(TryLockError::Poisoned(poisoned)) => Some(InputGuard {
                _guard: poisoned.into_inner(),
            }),
            Err(TryLockError::WouldBlock) => None,
        }
    }
}

/// Destination of acknowledgment bytes.
pub trait AckChannel: Send + Sync {
    fn write_ack(&self) -> std::io::Result<()>;
}

impl AckChannel for OutboundChannel {
    fn write_ack(&self) -> std::io::Result<()> {
        OutboundChannel::write_ack(self)
    }
}

/// Deferred write of one acknowledgment byte.
///
/// Runs only once the input lock is free, so every record applied before the
/// sync request has taken effect. The channel is referenced weakly: a task
/// that outlives its device completes without writing.
pub struct AckTask<C: AckChannel = OutboundChannel> {
    device: String,
    channel: Weak<C>,
    lock: Arc<InputLock>,
}

impl<C: AckChannel> AckTask<C> {
    pub fn new(device: impl Into<String>, channel: Weak<C>, lock: Arc<InputLock>) -> Self {
        Self {
            device: device.into(),
            channel,
            lock,
        }
    }
}

impl<C: AckChannel> WorkTask for AckTask<C> {
    fn run(&mut self) -> WorkStatus {
        let Some(_guard) = self.lock.try_lock() else {
            trace!(device = %self.device, "input lock busy, retrying acknowledgment");
            return WorkStatus::Retry;
        };

        let Some(channel) = self.channel.upgrade() else {
            debug!(device = %self.device, "outbound channel gone, dropping acknowledgment");
            return WorkStatus::Done;
        };

        match channel.write_ack() {
            Ok(()) => trace!(device = %self.device, "acknowledgment written"),
            Err(err) => warn!(
                device = %self.device,
                error = %err,
                "failed to write acknowledgment"
            ),
        }
        WorkStatus::Done
    }
}

/// Tracks whether the producer is waiting for an acknowledgment.
///
/// Requests are a flag, not a counter: any number of sync markers received
/// before the next drain check are answered by a single acknowledgment.
#[derive(Debug, Default)]
pub struct SyncCoordinator {
    pending: bool,
    armed: bool,
}

impl SyncCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sync request.
    pub fn request(&mut self) {
        self.pending = true;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Enable the drain check.
    pub fn arm(&mut self) {
        self.armed = true;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Disable the drain check and abandon an outstanding request.
    ///
    /// Returns whether a request was abandoned.
    pub fn disarm(&mut self) -> bool {
        self.armed = false;
        std::mem::take(&mut self.pending)
    }

    /// Drain check: when armed with a pending request, clear it and post an
    /// [`AckTask`] for `channel` to `queue`.
    ///
    /// Returns whether a task was posted.
    pub fn drained<C: AckChannel + 'static>(
        &mut self,
        device: &str,
        channel: &Arc<C>,
        lock: &Arc<InputLock>,
        queue: &dyn WorkQueue,
    ) -> bool {
        if !(self.armed && self.pending) {
            return false;
        }

        self.pending = false;
        queue.queue(Box::new(AckTask::new(
            device,
            Arc::downgrade(channel),
            Arc::clone(lock),
        )));
        debug!(device, "synchronization finished");
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::work::LocalWorkQueue;

    #[derive(Default)]
    struct Counting {
        acks: AtomicUsize,
        fail: bool,
    }

    impl AckChannel for Counting {
        fn write_ack(&self) -> std::io::Result<()> {
            if self.fail {
                return Err(std::io::ErrorKind::BrokenPipe.into());
            }
            self.acks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn armed() -> SyncCoordinator {
        let mut sync = SyncCoordinator::new();
        sync.arm();
        sync
    }

    #[test]
    fn many_requests_yield_one_ack() {
        let channel = Arc::new(Counting::default());
        let lock = Arc::new(InputLock::new());
        let queue = LocalWorkQueue::new();
        let mut sync = armed();

        sync.request();
        sync.request();
        sync.request();
        assert!(sync.drained("dev", &channel, &lock, &queue));
        assert!(!sync.drained("dev", &channel, &lock, &queue));

        assert_eq!(queue.run_pending(), 1);
        assert_eq!(channel.acks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drain_without_request_posts_nothing() {
        let channel = Arc::new(Counting::default());
        let lock = Arc::new(InputLock::new());
        let queue = LocalWorkQueue::new();
        let mut sync = armed();

        assert!(!sync.drained("dev", &channel, &lock, &queue));
        assert!(queue.is_empty());
    }

    #[test]
    fn unarmed_check_keeps_request() {
        let channel = Arc::new(Counting::default());
        let lock = Arc::new(InputLock::new());
        let queue = LocalWorkQueue::new();
        let mut sync = SyncCoordinator::new();

        sync.request();
        assert!(!sync.drained("dev", &channel, &lock, &queue));
        assert!(sync.is_pending());

        sync.arm();
        assert!(sync.drained("dev", &channel, &lock, &queue));
    }

    #[test]
    fn disarm_abandons_request() {
        let mut sync = armed();
        sync.request();
        assert!(sync.disarm());
        assert!(!sync.is_pending());
        assert!(!sync.is_armed());
        assert!(!sync.disarm());
    }

    #[test]
    fn ack_waits_for_input_lock() {
        let channel = Arc::new(Counting::default());
        let lock = Arc::new(InputLock::new());
        let queue = LocalWorkQueue::new();
        let mut sync = armed();
        sync.request();
        sync.drained("dev", &channel, &lock, &queue);

        {
            let _held = lock.lock();
            assert_eq!(queue.run_pending(), 0);
            assert_eq!(queue.len(), 1);
            assert_eq!(channel.acks.load(Ordering::SeqCst), 0);
        }

        assert_eq!(queue.run_pending(), 1);
        assert_eq!(channel.acks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn ack_after_channel_dropped_completes_silently() {
        let channel = Arc::new(Counting::default());
        let lock = Arc::new(InputLock::new());
        let mut task = AckTask::new("dev", Arc::downgrade(&channel), lock);

        drop(channel);
        assert_eq!(task.run(), WorkStatus::Done);
    }

    #[test]
    fn failed_write_still_completes() {
        let channel = Arc::new(Counting {
            fail: true,
            ..Default::default()
        });
        let mut task = AckTask::new("dev", Arc::downgrade(&channel), Arc::new(InputLock::new()));
        assert_eq!(task.run(), WorkStatus::Done);
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let lock = Arc::new(InputLock::new());
        let poisoner = Arc::clone(&lock);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock();
            panic!("poison the input lock");
        })
        .join();

        assert!(lock.try_lock().is_some());
        drop(lock.lock());
    }
}
