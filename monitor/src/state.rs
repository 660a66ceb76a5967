//! Scheduler state definitions.

/// Scheduler operational state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Created, loop not entered yet.
    Starting,
    /// Running cycles on the interval.
    Running,
    /// Shutdown requested, finishing the in-flight cycle.
    ShuttingDown,
    /// Loop exited.
    Stopped,
}

impl SchedulerState {
    /// Check if new cycles may start.
    pub fn accepts_cycles(&self) -> bool {
        matches!(self, SchedulerState::Running)
    }

    /// Check if the scheduler is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SchedulerState::Stopped)
    }
}
