use std::f64::consts::PI;

pub const RING_RADIUS: f64 = 88.0;
pub const MAX_SUGGESTION_REFRESH: u32 = 5;

pub fn ring_circumference() -> f64 {
    2.0 * PI * RING_RADIUS
}

/// `mm:ss`; minutes are not wrapped into hours.
pub fn format_countdown(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    Paused,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionKind {
    QuickStart,
    Completion,
}

/// Focus-mode countdown driven by one-second ticks from the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusTimer {
    total_seconds: u32,
    remaining_seconds: u32,
    state: TimerState,
    quick_start_refreshes: u32,
    completion_refreshes: u32,
}

impl FocusTimer {
    pub fn new(duration_minutes: u32) -> Self {
        let total_seconds = duration_minutes.saturating_mul(60);
        Self {
            total_seconds,
            remaining_seconds: total_seconds,
            state: if total_seconds == 0 {
                TimerState::Finished
            } else {
                TimerState::Idle
            },
            quick_start_refreshes: 0,
            completion_refreshes: 0,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    /// Start or pause. A finished timer stays finished.
    pub fn toggle(&mut self) -> TimerState {
        self.state = match self.state {
            TimerState::Idle | TimerState::Paused => TimerState::Running,
            TimerState::Running => TimerState::Paused,
            TimerState::Finished => TimerState::Finished,
        };
        self.state
    }

    /// Advance one second. Returns `true` on the tick that reaches zero.
    pub fn tick(&mut self) -> bool {
        if self.state != TimerState::Running {
            return false;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            self.state = TimerState::Finished;
            return true;
        }
        false
    }

    pub fn display(&self) -> String {
        format_countdown(self.remaining_seconds)
    }

    /// `stroke-dashoffset` of the progress ring: 0 at the start, the full
    /// circumference when time is up.
    pub fn ring_offset(&self) -> f64 {
        if self.total_seconds == 0 {
            return ring_circumference();
        }
        let left = f64::from(self.remaining_seconds) / f64::from(self.total_seconds);
        ring_circumference() * (1.0 - left)
    }

    pub fn refreshes_left(&self, kind: SuggestionKind) -> u32 {
        MAX_SUGGESTION_REFRESH.saturating_sub(self.refreshes_used(kind))
    }

    /// Spend one refresh of `kind`; `false` once the budget is gone.
    pub fn try_refresh(&mut self, kind: SuggestionKind) -> bool {
        let used = match kind {
            SuggestionKind::QuickStart => &mut self.quick_start_refreshes,
            SuggestionKind::Completion => &mut self.completion_refreshes,
        };
        if *used >= MAX_SUGGESTION_REFRESH {
            return false;
        }
        *used += 1;
        true
    }

    fn refreshes_used(&self, kind: SuggestionKind) -> u32 {
        match kind {
            SuggestionKind::QuickStart => self.quick_start_refreshes,
            SuggestionKind::Completion => self.completion_refreshes,
        }
    }
}
