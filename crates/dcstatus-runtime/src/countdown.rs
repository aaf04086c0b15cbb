//! Reload countdown state machine
//!
//! `Idle → Counting(n) → … → Counting(1) → Triggering → Idle`
//!
//! The machine is clock-free; the engine feeds it ticks. Every `start`
//! opens a new epoch so ticks from a superseded timer are ignored.

/// Gauge divisor. Fixed at 5 even when the countdown length differs.
pub const GAUGE_DIVISOR: u32 = 5;

/// Percent shown by the "time remaining" gauge with `remaining` ticks left
pub fn gauge_percent(remaining: u32) -> u32 {
    remaining.saturating_mul(100) / GAUGE_DIVISOR
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CountdownPhase {
    Idle,
    Counting(u32),
    Triggering,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still counting, with this many ticks left
    Remaining(u32),
    /// Reached zero, the reload must fire
    Expired,
    /// Tick from a cancelled or superseded countdown
    Stopped,
}

#[derive(Debug)]
pub struct Countdown {
    length: u32,
    phase: CountdownPhase,
    epoch: u64,
}

impl Countdown {
    pub fn new(length: u32) -> Self {
        Countdown {
            length,
            phase: CountdownPhase::Idle,
            epoch: 0,
        }
    }

    /// Restart from the full length. Returns the new epoch.
    pub fn start(&mut self) -> u64 {
        self.epoch += 1;
        self.phase = CountdownPhase::Counting(self.length);
        self.epoch
    }

    /// Advance one tick of the countdown opened at `epoch`
    pub fn tick(&mut self, epoch: u64) -> TickOutcome {
        if epoch != self.epoch {
            return TickOutcome::Stopped;
        }
        match self.phase {
            CountdownPhase::Counting(n) if n > 1 => {
                self.phase = CountdownPhase::Counting(n - 1);
                TickOutcome::Remaining(n - 1)
            }
            CountdownPhase::Counting(_) => {
                self.phase = CountdownPhase::Triggering;
                TickOutcome::Expired
            }
            CountdownPhase::Idle | CountdownPhase::Triggering => TickOutcome::Stopped,
        }
    }

    /// Back to idle; pending ticks of the current epoch become stale
    pub fn cancel(&mut self) {
        self.epoch += 1;
        self.phase = CountdownPhase::Idle;
    }

    pub fn phase(&self) -> CountdownPhase {
        self.phase
    }

    pub fn length(&self) -> u32 {
        self.length
    }
}
