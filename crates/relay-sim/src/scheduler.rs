//! Tick scheduling
//!
//! The chain never times itself. [`TickGate`] decides, frame by frame,
//! whether the next chain tick is due, and holds the pause flag.

#[derive(Debug, Clone)]
pub struct TickGate {
    period: f64,
    next_action: f64,
    paused: bool,
}

impl TickGate {
    /// Gate firing every `period` simulated seconds. Starts paused, like the
    /// input screen before a run begins.
    pub fn new(period: f64) -> Self {
        Self {
            period,
            next_action: 0.0,
            paused: true,
        }
    }

    /// True at most once per call while running and `now` has passed the
    /// next action time. Each firing moves the action time on by one period.
    pub fn due(&mut self, now: f64) -> bool {
        if self.paused || now <= self.next_action {
            return false;
        }
        self.next_action += self.period;
        true
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Returns the new paused state.
    pub fn toggle(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn period(&self) -> f64 {
        self.period
    }
}
