//! PIR motion task.
//!
//! The PIR output is edge-triggered: an ISR increments an atomic
//! counter on each rising edge, and the task samples-and-resets it on
//! its own cadence. A single edge is noise; motion is declared only
//! when enough recent sample windows saw at least one edge, debounced
//! through the transient-event detector.

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicU32, Ordering};

use serde::Serialize;

use crate::mqtt::NodeServices;
use crate::runtime::Task;
use crate::signal::{Rate, TransientEvent};

use super::TOPIC_MOTION_STATE;

/// Windows with an edge out of the last 8 needed to declare motion.
const MOTION_THRESHOLD: usize = 5;
const MOTION_WINDOW: usize = 8;

const SAMPLE_PERIOD_MS: u32 = 500;
const PUBLISH_PERIOD_MS: u32 = 1_000;

/// Global atomic counter incremented by the GPIO ISR.
/// `static` because ISR callbacks in ESP-IDF cannot capture closures.
#[cfg(target_os = "espidf")]
static PIR_TRIGGER_COUNT: AtomicU32 = AtomicU32::new(0);

/// Called from the GPIO ISR on each rising edge.
#[cfg(target_os = "espidf")]
pub fn pir_isr_handler() {
    PIR_TRIGGER_COUNT.fetch_add(1, Ordering::Relaxed);
}

#[cfg(target_os = "espidf")]
fn take_edges() -> u32 {
    PIR_TRIGGER_COUNT.swap(0, Ordering::Relaxed)
}

// Host builds have no ISR; edges are injected per test thread so
// parallel tests stay independent.
#[cfg(not(target_os = "espidf"))]
std::thread_local! {
    static PIR_TRIGGER_COUNT: core::cell::Cell<u32> = const { core::cell::Cell::new(0) };
}

/// Host-side stand-in for a PIR edge.
#[cfg(not(target_os = "espidf"))]
pub fn sim_trigger() {
    PIR_TRIGGER_COUNT.with(|c| c.set(c.get() + 1));
}

#[cfg(not(target_os = "espidf"))]
fn take_edges() -> u32 {
    PIR_TRIGGER_COUNT.with(|c| c.replace(0))
}

#[derive(Serialize)]
struct MotionState {
    active: bool,
}

pub struct PirTask {
    sample_rate: Rate,
    publish_rate: Rate,
    motion: TransientEvent<MOTION_THRESHOLD, MOTION_WINDOW>,
}

impl PirTask {
    pub fn new() -> Self {
        Self {
            sample_rate: Rate::new(SAMPLE_PERIOD_MS),
            publish_rate: Rate::new(PUBLISH_PERIOD_MS),
            motion: TransientEvent::new(),
        }
    }

    pub fn is_motion_active(&self) -> bool {
        self.motion.is_triggered()
    }
}

impl Default for PirTask {
    fn default() -> Self {
        Self::new()
    }
}

impl Task for PirTask {
    fn run_cycle(&mut self, now_ms: u32, node: &mut dyn NodeServices) {
        if self.sample_rate.check_due(now_ms) {
            self.motion.sample(take_edges() > 0);
        }

        if self.publish_rate.check_due(now_ms) {
            let state = MotionState {
                active: self.motion.is_triggered(),
            };
            match serde_json::to_vec(&state) {
                Ok(payload) => {
                    node.publish(TOPIC_MOTION_STATE, &payload);
                }
                Err(_) => node.log(format_args!("motion state serialization failed")),
            }
        }
    }
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;
    use crate::tasks::testutil::RecordingNode;

    /// Drive one sample window ending at `now`, with or without an edge.
    fn sample(task: &mut PirTask, node: &mut RecordingNode, now: u32, edge: bool) {
        if edge {
            sim_trigger();
        }
        task.run_cycle(now, node);
    }

    #[test]
    fn single_edge_does_not_declare_motion() {
        let mut task = PirTask::new();
        let mut node = RecordingNode::new();

        sample(&mut task, &mut node, 1_000, true);
        assert!(!task.is_motion_active());
    }

    #[test]
    fn sustained_edges_declare_motion() {
        let mut task = PirTask::new();
        let mut node = RecordingNode::new();

        let mut now = 1_000;
        for _ in 0..MOTION_THRESHOLD {
            sample(&mut task, &mut node, now, true);
            now += SAMPLE_PERIOD_MS;
        }
        assert!(task.is_motion_active());
    }

    #[test]
    fn motion_decays_after_quiet_windows() {
        let mut task = PirTask::new();
        let mut node = RecordingNode::new();

        let mut now = 1_000;
        for _ in 0..MOTION_WINDOW {
            sample(&mut task, &mut node, now, true);
            now += SAMPLE_PERIOD_MS;
        }
        assert!(task.is_motion_active());

        for _ in 0..MOTION_WINDOW {
            sample(&mut task, &mut node, now, false);
            now += SAMPLE_PERIOD_MS;
        }
        assert!(!task.is_motion_active());
    }

    #[test]
    fn publishes_motion_state_json() {
        let mut task = PirTask::new();
        let mut node = RecordingNode::new();

        task.run_cycle(1_000, &mut node);
        let published = node.published_on(TOPIC_MOTION_STATE);
        assert_eq!(published, vec![br#"{"active":false}"# as &[u8]]);
    }

    #[test]
    fn publish_rate_is_honoured() {
        let mut task = PirTask::new();
        let mut node = RecordingNode::new();

        task.run_cycle(1_000, &mut node);
        task.run_cycle(1_400, &mut node); // within the publish period
        assert_eq!(node.published_on(TOPIC_MOTION_STATE).len(), 1);

        task.run_cycle(2_000, &mut node);
        assert_eq!(node.published_on(TOPIC_MOTION_STATE).len(), 2);
    }
}
