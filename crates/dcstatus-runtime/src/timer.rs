//! Single-occupancy task slot
//!
//! Each timer kind (countdown, debounce, snapshot fetch) owns one slot.
//! Arming a slot aborts whatever it held.

use tokio::task::JoinHandle;

#[derive(Debug, Default)]
pub enum TimerSlot {
    #[default]
    Idle,
    Active(JoinHandle<()>),
}

impl TimerSlot {
    /// Replace the current task, aborting it
    pub fn arm(&mut self, task: JoinHandle<()>) {
        self.cancel();
        *self = TimerSlot::Active(task);
    }

    /// Abort the current task. Returns whether it was still running.
    pub fn cancel(&mut self) -> bool {
        match std::mem::take(self) {
            TimerSlot::Active(task) => {
                let running = !task.is_finished();
                task.abort();
                running
            }
            TimerSlot::Idle => false,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, TimerSlot::Active(task) if !task.is_finished())
    }
}
