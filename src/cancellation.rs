use crate::PingError;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Interrupt state shared between the signal handler and the ping loop.
///
/// Counts interrupts rather than flagging them: the first one ends probing,
/// a second one abandons the drain wait.
#[derive(Clone, Default)]
pub struct Cancellation {
    condition: Arc<(Mutex<u32>, Condvar)>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes SIGINT (Ctrl-C) to [`Cancellation::interrupt`]. Only one
    /// handler can be installed per process.
    pub fn install_interrupt_handler(&self) -> Result<(), PingError> {
        let cancellation = self.clone();
        ctrlc::set_handler(move || cancellation.interrupt())?;
        Ok(())
    }

    pub fn interrupt(&self) {
        let (_, cvar) = &*self.condition;
        let mut interrupts = self.lock();
        *interrupts += 1;
        tracing::trace!("interrupt {} received", *interrupts);
        cvar.notify_all();
    }

    pub fn interrupts(&self) -> u32 {
        *self.lock()
    }

    pub fn is_cancelled(&self) -> bool {
        self.interrupts() > 0
    }

    /// Sleeps for `timeout` unless cancelled first. Returns whether the
    /// session is cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let (_, cvar) = &*self.condition;
        let guard = self.lock();
        let (interrupts, _) = cvar
            .wait_timeout_while(guard, timeout, |interrupts| *interrupts == 0)
            .unwrap_or_else(PoisonError::into_inner);
        *interrupts > 0
    }

    fn lock(&self) -> MutexGuard<'_, u32> {
        let (lock, _) = &*self.condition;
        lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
