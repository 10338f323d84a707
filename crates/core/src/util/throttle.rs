//! Throttle and debounce state machines.
//!
//! Both are driven by caller-supplied timestamps so behavior is deterministic
//! under a manual clock. Collectors pair them with host timers: `call`
//! decides, the timer's `poll` drains.

/// Outcome of a throttled call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// Quota available: fire now.
    Fire,
    /// Within the window: a trailing call is armed for the given deadline.
    Trailing(i64),
}

/// Leading+trailing throttle: fires immediately when quota is available,
/// otherwise arms one trailing invocation at the end of the window.
#[derive(Debug)]
pub struct Throttle {
    interval_ms: i64,
    last_fire: Option<i64>,
    trailing_deadline: Option<i64>,
}

impl Throttle {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms: interval_ms.max(1) as i64,
            last_fire: None,
            trailing_deadline: None,
        }
    }

    /// Records a call at `now` and decides whether it fires.
    pub fn call(&mut self, now: i64) -> ThrottleDecision {
        match self.last_fire {
            Some(last) if now - last < self.interval_ms => {
                let deadline = last + self.interval_ms;
                self.trailing_deadline = Some(deadline);
                ThrottleDecision::Trailing(deadline)
            }
            _ => {
                self.last_fire = Some(now);
                self.trailing_deadline = None;
                ThrottleDecision::Fire
            }
        }
    }

    /// Fires an armed trailing call once its deadline has passed.
    pub fn poll(&mut self, now: i64) -> bool {
        match self.trailing_deadline {
            Some(deadline) if now >= deadline => {
                self.last_fire = Some(now);
                self.trailing_deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn trailing_deadline(&self) -> Option<i64> {
        self.trailing_deadline
    }

    /// Drops any armed trailing call and resets the window.
    pub fn cancel(&mut self) {
        self.trailing_deadline = None;
        self.last_fire = None;
    }
}

/// Debounce: only the last call within the window survives. `flush` runs the
/// pending invocation immediately; `cancel` drops it.
#[derive(Debug)]
pub struct Debounce<T> {
    delay_ms: i64,
    pending: Option<(i64, T)>,
}

impl<T> Debounce<T> {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms: delay_ms as i64,
            pending: None,
        }
    }

    /// Schedules `value`, replacing any pending one and restarting the window.
    pub fn call(&mut self, now: i64, value: T) {
        self.pending = Some((now + self.delay_ms, value));
    }

    /// Takes the pending value once its deadline has passed.
    pub fn poll(&mut self, now: i64) -> Option<T> {
        match &self.pending {
            Some((deadline, _)) if now >= *deadline => self.pending.take().map(|(_, v)| v),
            _ => None,
        }
    }

    /// Takes the pending value immediately, deadline or not.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(_, v)| v)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn deadline(&self) -> Option<i64> {
        self.pending.as_ref().map(|(d, _)| *d)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
