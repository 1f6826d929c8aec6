use std::time::{Duration, Instant};

/// Default quiet window before a request is sent.
pub const DEBOUNCE_MS: u64 = 300;

/// Keeps only the latest value until the quiet window has passed.
///
/// Pure timing; the caller decides what to do with the value.
pub struct Coalescer<T> {
    pending: Option<T>,
    last_push: Option<Instant>,
    quiet: Duration,
}

impl<T> Coalescer<T> {
    pub fn new(quiet: Duration) -> Self {
        Self {
            pending: None,
            last_push: None,
            quiet,
        }
    }

    /// Replace the pending value and restart the window.
    pub fn push(&mut self, value: T) {
        self.pending = Some(value);
        self.last_push = Some(Instant::now());
    }

    pub fn is_ready(&self) -> bool {
        match self.last_push {
            Some(at) => self.pending.is_some() && at.elapsed() >= self.quiet,
            None => false,
        }
    }

    /// Take the pending value if the window has passed.
    pub fn take_if_ready(&mut self) -> Option<T> {
        if !self.is_ready() {
            return None;
        }
        self.last_push = None;
        self.pending.take()
    }

    /// Time until the pending value becomes ready.
    pub fn sleep_duration(&self) -> Duration {
        let Some(at) = self.last_push else {
            return Duration::from_secs(86400);
        };
        self.quiet
            .saturating_sub(at.elapsed())
            .max(Duration::from_millis(1))
    }
}

impl<T> Default for Coalescer<T> {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEBOUNCE_MS))
    }
}
