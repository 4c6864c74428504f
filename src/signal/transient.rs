//! Debounced transient-event detection over a boolean sample window.

/// Converts a noisy boolean signal into a stable logical state:
/// [`is_triggered`](Self::is_triggered) reports whether at least
/// `THRESHOLD` of the most recent `WINDOW` samples were `true` —
/// e.g. "5 of the last 8 motion-pin samples were high" declares
/// sustained motion while filtering single-sample glitches.
///
/// The window is treated as always-full from construction: un-written
/// slots count as `false`, so early readings are biased toward
/// "not triggered" until `WINDOW` real samples have arrived.
#[derive(Debug, Clone)]
pub struct TransientEvent<const THRESHOLD: usize, const WINDOW: usize> {
    window: [bool; WINDOW],
    next_in: usize,
    count: usize,
}

impl<const THRESHOLD: usize, const WINDOW: usize> TransientEvent<THRESHOLD, WINDOW> {
    pub fn new() -> Self {
        const {
            assert!(WINDOW > 0, "window must be non-empty");
            assert!(THRESHOLD <= WINDOW, "threshold out of bounds");
        }
        Self {
            window: [false; WINDOW],
            next_in: 0,
            count: 0,
        }
    }

    /// Admit one sample, evicting the oldest slot's contribution.
    pub fn sample(&mut self, state: bool) {
        if self.window[self.next_in] {
            self.count -= 1;
        }
        self.window[self.next_in] = state;
        if state {
            self.count += 1;
        }
        self.next_in = (self.next_in + 1) % WINDOW;
    }

    /// Whether the trigger threshold is currently met.
    pub fn is_triggered(&self) -> bool {
        self.count >= THRESHOLD
    }
}

impl<const THRESHOLD: usize, const WINDOW: usize> Default for TransientEvent<THRESHOLD, WINDOW> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_threshold_triggers_immediately() {
        let e: TransientEvent<0, 4> = TransientEvent::new();
        assert!(e.is_triggered());
    }

    #[test]
    fn single_glitch_does_not_trigger() {
        let mut e: TransientEvent<2, 4> = TransientEvent::new();
        e.sample(true);
        assert!(!e.is_triggered());
        e.sample(false);
        e.sample(false);
        assert!(!e.is_triggered());
    }

    #[test]
    fn sustained_signal_triggers_and_decays() {
        let mut e: TransientEvent<3, 4> = TransientEvent::new();
        for _ in 0..3 {
            e.sample(true);
        }
        assert!(e.is_triggered());
        // Signal drops; trigger holds until enough true samples age out.
        e.sample(false);
        assert!(e.is_triggered()); // window: T T T F
        e.sample(false);
        assert!(!e.is_triggered()); // window: T T F F
    }

    /// Exhaustive check against a count-based model: for every 8-sample
    /// boolean sequence, after each sample `is_triggered()` must equal
    /// "at least 2 of the last 4 samples (pre-fill counting as false)
    /// were true".
    #[test]
    fn matches_model_exhaustively_w4_t2() {
        for bits in 0u16..(1 << 8) {
            let samples: Vec<bool> = (0..8).map(|i| bits & (1 << i) != 0).collect();

            let mut e: TransientEvent<2, 4> = TransientEvent::new();
            let mut seen: Vec<bool> = Vec::new();

            for &s in &samples {
                e.sample(s);
                seen.push(s);

                let recent_true = seen
                    .iter()
                    .rev()
                    .take(4)
                    .filter(|&&x| x)
                    .count();
                assert_eq!(
                    e.is_triggered(),
                    recent_true >= 2,
                    "sequence {bits:#010b} diverged after {} samples",
                    seen.len()
                );
            }
        }
    }
}
