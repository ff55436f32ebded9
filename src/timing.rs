//! Millisecond timers. Nothing here reads the wall clock; every call takes
//! the caller's `now`.

/// Decides when the active piece falls one row.
#[derive(Clone, Debug)]
pub struct GravityClock {
    base_interval_ms: u64,
    soft_drop_interval_ms: u64,
    last_fall_ms: u64,
    soft_drop: bool,
}

impl GravityClock {
    pub fn new(base_interval_ms: u64, soft_drop_interval_ms: u64, now_ms: u64) -> Self {
        Self {
            base_interval_ms,
            soft_drop_interval_ms,
            last_fall_ms: now_ms,
            soft_drop: false,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        if self.soft_drop {
            self.soft_drop_interval_ms
        } else {
            self.base_interval_ms
        }
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_fall_ms) >= self.interval_ms()
    }

    pub fn mark(&mut self, now_ms: u64) {
        self.last_fall_ms = now_ms;
    }

    pub fn set_soft_drop(&mut self, active: bool) {
        self.soft_drop = active;
    }

    pub fn is_soft_dropping(&self) -> bool {
        self.soft_drop
    }
}

/// Minimum spacing between repeats of one input so a held key repeats at
/// a controlled rate.
#[derive(Clone, Debug)]
pub struct RepeatGate {
    interval_ms: u64,
    last_fired_ms: Option<u64>,
}

impl RepeatGate {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_fired_ms: None,
        }
    }

    /// Fires (and records `now_ms`) if the gate has never fired or the
    /// interval has elapsed since it last did.
    pub fn try_fire(&mut self, now_ms: u64) -> bool {
        let ready = match self.last_fired_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.interval_ms,
        };
        if ready {
            self.last_fired_ms = Some(now_ms);
        }
        ready
    }
}
