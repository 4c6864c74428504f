//! Sonar ranging task.
//!
//! The rangefinder reports distance as the width of a HIGH pulse,
//! 147 µs per inch (MaxBotix MB-series scaling). Single readings are
//! noisy near the edges of the beam, so every sample goes through a
//! 5-point median filter and only the filtered value is published.

use core::fmt::Write as _;

use crate::hw;
use crate::mqtt::NodeServices;
use crate::pins;
use crate::runtime::Task;
use crate::signal::{MedianFilter, Rate};

use super::TOPIC_SONAR_STATE;

/// µs of HIGH time per inch of range.
const US_PER_INCH: u32 = 147;
/// Longest pulse worth waiting for (~2× the sensor's max range).
const PULSE_TIMEOUT_US: u32 = 50_000;

const SAMPLE_PERIOD_MS: u32 = 500;
const PUBLISH_PERIOD_MS: u32 = 1_000;

pub struct SonarTask {
    sample_rate: Rate,
    publish_rate: Rate,
    filter: MedianFilter<u32, 5>,
}

impl SonarTask {
    pub fn new() -> Self {
        Self {
            sample_rate: Rate::new(SAMPLE_PERIOD_MS),
            publish_rate: Rate::new(PUBLISH_PERIOD_MS),
            filter: MedianFilter::new(),
        }
    }

    /// Current filtered range in inches.
    pub fn range_in(&self) -> u32 {
        self.filter.get()
    }
}

impl Default for SonarTask {
    fn default() -> Self {
        Self::new()
    }
}

impl Task for SonarTask {
    fn run_cycle(&mut self, now_ms: u32, node: &mut dyn NodeServices) {
        if self.sample_rate.check_due(now_ms) {
            let pulse_us = hw::pulse_in_us(pins::SONAR_PULSE_GPIO, PULSE_TIMEOUT_US);
            self.filter.sample(pulse_us / US_PER_INCH);
        }

        if self.publish_rate.check_due(now_ms) {
            let mut value: heapless::String<12> = heapless::String::new();
            // u32 decimal always fits 12 bytes
            let _ = write!(value, "{}", self.filter.get());
            node.publish(TOPIC_SONAR_STATE, value.as_bytes());
        }
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;
    use crate::tasks::testutil::RecordingNode;

    #[test]
    fn publishes_filtered_range_as_decimal() {
        let mut task = SonarTask::new();
        let mut node = RecordingNode::new();

        // 147 µs/inch → 100 inches; fill the whole window
        hw::sim::set_pulse_width_us(100 * US_PER_INCH);
        let mut now = 1_000;
        for _ in 0..5 {
            task.run_cycle(now, &mut node);
            now += SAMPLE_PERIOD_MS;
        }

        assert_eq!(task.range_in(), 100);
        let published = node.published_on(TOPIC_SONAR_STATE);
        assert_eq!(published.last(), Some(&(b"100" as &[u8])));
    }

    #[test]
    fn outlier_reading_is_suppressed() {
        let mut task = SonarTask::new();
        let mut node = RecordingNode::new();

        hw::sim::set_pulse_width_us(100 * US_PER_INCH);
        let mut now = 1_000;
        for _ in 0..5 {
            task.run_cycle(now, &mut node);
            now += SAMPLE_PERIOD_MS;
        }

        // one glitch reading does not move the median
        hw::sim::set_pulse_width_us(5 * US_PER_INCH);
        task.run_cycle(now, &mut node);
        assert_eq!(task.range_in(), 100);
    }

    #[test]
    fn timed_out_pulse_reads_as_zero_range() {
        let mut task = SonarTask::new();
        let mut node = RecordingNode::new();

        hw::sim::set_pulse_width_us(0);
        let mut now = 1_000;
        for _ in 0..5 {
            task.run_cycle(now, &mut node);
            now += SAMPLE_PERIOD_MS;
        }
        assert_eq!(task.range_in(), 0);
    }
}
