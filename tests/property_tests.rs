//! Property tests for the signal-conditioning primitives.
//!
//! Runs on host (x86_64) only — proptest is not available for ESP32
//! targets. On ESP32, these tests are compiled out.

#![cfg(not(target_os = "espidf"))]

use homenode::signal::{MedianFilter, Rate, TransientEvent};
use proptest::prelude::*;

proptest! {
    /// A rate limiter never fires twice within one period, no matter
    /// how the clock advances (wraparound included).
    #[test]
    fn rate_never_fires_twice_within_period(
        start in any::<u32>(),
        steps in proptest::collection::vec(0u32..5_000, 1..100),
    ) {
        let period = 1_000;
        let mut rate = Rate::new(period);
        let mut now = start;
        let mut last_fired: Option<u32> = None;

        for step in steps {
            now = now.wrapping_add(step);
            if rate.check_due(now) {
                // A fire at exactly 0 re-arms immediately (documented
                // sentinel quirk); the guarantee applies to all others.
                if let Some(prev) = last_fired.filter(|&p| p != 0) {
                    prop_assert!(
                        now.wrapping_sub(prev) >= period,
                        "fired {} ms after previous firing",
                        now.wrapping_sub(prev)
                    );
                }
                last_fired = Some(now);
            }
        }
    }

    /// The median filter always reports the middle element of the last
    /// N samples, with unfilled slots reading as zero.
    #[test]
    fn median_matches_sorted_model(
        samples in proptest::collection::vec(any::<u32>(), 0..40),
    ) {
        let mut filter: MedianFilter<u32, 5> = MedianFilter::new();
        let mut window = [0u32; 5];

        for (i, &s) in samples.iter().enumerate() {
            filter.sample(s);
            window[i % 5] = s;

            let mut model = window;
            model.sort_unstable();
            prop_assert_eq!(filter.get(), model[2]);
        }
    }

    /// The median never reports a value outside the range of the
    /// current window contents.
    #[test]
    fn median_is_bounded_by_window(
        samples in proptest::collection::vec(any::<u32>(), 5..40),
    ) {
        let mut filter: MedianFilter<u32, 5> = MedianFilter::new();
        for (i, &s) in samples.iter().enumerate() {
            filter.sample(s);
            if i >= 4 {
                let window = &samples[i - 4..=i];
                let min = *window.iter().min().unwrap();
                let max = *window.iter().max().unwrap();
                prop_assert!(filter.get() >= min && filter.get() <= max);
            }
        }
    }

    /// The transient detector triggers exactly when the count of set
    /// samples in the last WINDOW observations reaches THRESHOLD.
    #[test]
    fn transient_matches_counting_model(
        samples in proptest::collection::vec(any::<bool>(), 0..64),
    ) {
        let mut detector: TransientEvent<3, 6> = TransientEvent::new();
        let mut history: Vec<bool> = Vec::new();

        for &s in &samples {
            detector.sample(s);
            history.push(s);

            let recent = history.iter().rev().take(6).filter(|&&b| b).count();
            prop_assert_eq!(
                detector.is_triggered(),
                recent >= 3,
                "history tail disagrees with detector"
            );
        }
    }
}
