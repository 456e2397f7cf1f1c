//! Animation loop state machine.
//!
//! The loop itself is driven externally (by winit redraw events, or by a test
//! harness stepping a fake clock); this type only decides whether a scheduled
//! tick is allowed to run. Separating the decision from the scheduling makes
//! shutdown exact: after [`stop`](FrameLoop::stop), a redraw that is already
//! queued in the event loop arrives but its work is cancelled, not merely
//! ignored after the fact.

/// Lifecycle state of the animation loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Running,
}

/// Gates per-tick work on an explicit Start/Stop lifecycle.
///
/// Owned by the host; never a global. One tick executes at a time and ticks
/// never overlap, because the driver only schedules the next tick from within
/// the current one.
pub struct FrameLoop {
    state: LoopState,
}

impl FrameLoop {
    /// Creates a loop in the `Stopped` state.
    pub fn new() -> Self {
        Self {
            state: LoopState::Stopped,
        }
    }

    /// Transition to `Running`. Idempotent.
    pub fn start(&mut self) {
        self.state = LoopState::Running;
    }

    /// Transition to `Stopped`. Any tick that fires after this call is
    /// cancelled before its work runs.
    pub fn stop(&mut self) {
        self.state = LoopState::Stopped;
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    /// Run one tick's work if the loop is running.
    ///
    /// Returns `true` if `work` executed. Callers schedule the next tick
    /// themselves; a `false` return means the loop is stopped and nothing
    /// further should be scheduled.
    pub fn tick<F: FnOnce()>(&self, work: F) -> bool {
        match self.state {
            LoopState::Running => {
                work();
                true
            }
            LoopState::Stopped => false,
        }
    }
}

impl Default for FrameLoop {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_stopped() {
        let frame_loop = FrameLoop::new();
        assert!(!frame_loop.is_running());

        let mut ran = false;
        assert!(!frame_loop.tick(|| ran = true));
        assert!(!ran);
    }

    #[test]
    fn ticks_only_while_running() {
        let mut frame_loop = FrameLoop::new();
        frame_loop.start();

        let mut count = 0;
        for _ in 0..3 {
            frame_loop.tick(|| count += 1);
        }
        assert_eq!(count, 3);
    }

    #[test]
    fn stop_cancels_already_scheduled_ticks() {
        let mut frame_loop = FrameLoop::new();
        frame_loop.start();

        let mut count = 0;
        frame_loop.tick(|| count += 1);
        frame_loop.stop();

        // Simulate a fake refresh clock firing ticks that were queued before
        // the stop: none of their work may execute.
        for _ in 0..10 {
            assert!(!frame_loop.tick(|| count += 1));
        }
        assert_eq!(count, 1);
        assert!(!frame_loop.is_running());
    }
}
