//! Monotonic-clock rate limiter for periodic work.
//!
//! Every periodic job in a task's `run_cycle` gates itself on one of
//! these instead of busy-working each tick. The caller supplies the
//! current monotonic millisecond timestamp (same convention as the
//! rest of the main loop), so the limiter is trivially testable.

/// Returns `true` from [`check_due`](Rate::check_due) at most once per
/// period, and always on the very first call.
///
/// Uses wraparound-safe unsigned subtraction, so behaviour holds across
/// the u32 millisecond counter's overflow (~49.7 days). The zero value
/// doubles as the "never fired" sentinel; if the clock happens to read
/// exactly 0 on a fire, the limiter re-arms immediately. One spurious
/// extra fire every 49.7 days is acceptable for this class of work.
#[derive(Debug, Clone)]
pub struct Rate {
    last_fired_ms: u32,
    period_ms: u32,
}

impl Rate {
    pub fn new(period_ms: u32) -> Self {
        Self {
            last_fired_ms: 0,
            period_ms,
        }
    }

    /// Check whether the period has elapsed; re-arms when it has.
    pub fn check_due(&mut self, now_ms: u32) -> bool {
        if self.last_fired_ms == 0 || now_ms.wrapping_sub(self.last_fired_ms) >= self.period_ms {
            self.last_fired_ms = now_ms;
            return true;
        }
        false
    }
}
