//! Cooperative cancellation: timeouts and interrupts
//!
//! Checked at rule-dispatch boundaries only, never mid-rule. Expiry
//! surfaces as an error distinct from a clash, so backtracking can
//! never swallow it.

use mimizuku_core::ReasonerError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared flag aborting a running check from another thread.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle(Arc<AtomicBool>);

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_interrupted(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Wall-clock timer for one satisfiability check.
#[derive(Debug, Clone)]
pub struct Timer {
    started: Option<Instant>,
    timeout: Option<Duration>,
    interrupt: InterruptHandle,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    pub fn new() -> Self {
        Self {
            started: None,
            timeout: None,
            interrupt: InterruptHandle::new(),
        }
    }

    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    pub fn elapsed(&self) -> Duration {
        self.started.map(|s| s.elapsed()).unwrap_or_default()
    }

    /// Dispatch-boundary check.
    pub fn check(&self) -> Result<(), ReasonerError> {
        if self.interrupt.is_interrupted() {
            return Err(ReasonerError::Interrupted);
        }
        if let (Some(started), Some(timeout)) = (self.started, self.timeout) {
            if started.elapsed() > timeout {
                return Err(ReasonerError::Timeout(timeout));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unstarted_timer_passes() {
        let timer = Timer::new();
        assert!(timer.check().is_ok());
    }

    #[test]
    fn test_zero_timeout_expires() {
        let mut timer = Timer::new();
        timer.set_timeout(Some(Duration::ZERO));
        timer.start();
        std::thread::sleep(Duration::from_millis(2));
        assert!(matches!(timer.check(), Err(ReasonerError::Timeout(_))));
    }

    #[test]
    fn test_interrupt_wins_over_everything() {
        let timer = Timer::new();
        let handle = timer.interrupt_handle();
        assert!(timer.check().is_ok());

        handle.interrupt();
        assert!(matches!(timer.check(), Err(ReasonerError::Interrupted)));

        handle.reset();
        assert!(timer.check().is_ok());
    }
}
