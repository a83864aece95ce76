// Autosave debounce timer.
//
// Every edit pushes the deadline out by the full window; the save fires once
// the document has been quiet for that long.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct SaveDebounce {
    window: Duration,
    deadline: Option<Instant>,
}

impl SaveDebounce {
    pub fn new(window: Duration) -> Self {
        Self { window, deadline: None }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Restart the timer from now.
    pub fn arm(&mut self) {
        self.arm_at(Instant::now());
    }

    /// Like `arm` but with a specific timestamp (for testing).
    fn arm_at(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Disarm and return true if the deadline has passed.
    pub fn take_ready(&mut self) -> bool {
        self.take_ready_at(Instant::now())
    }

    /// Like `take_ready` but with a specific timestamp (for testing).
    fn take_ready_at(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
