//! Potentiometer dimmer task for the LED-driver node.
//!
//! Local-only control loop: sample the pot at 10 Hz, map the 10-bit
//! reading onto an 8-bit duty, and drive the white strip channel. The
//! bottom of the pot travel snaps to fully off so the strip does not
//! glow at the end stop.

use crate::hw;
use crate::mqtt::NodeServices;
use crate::runtime::Task;
use crate::signal::Rate;

const SAMPLE_PERIOD_MS: u32 = 100;

/// Readings mapping below this duty clamp to zero.
const OFF_SNAP_THRESHOLD: u8 = 8;

/// 10-bit ADC reading → 8-bit duty.
fn map_level(raw: u16) -> u8 {
    let duty = (u32::from(raw) * 255 / 1024).min(255) as u8;
    if duty < OFF_SNAP_THRESHOLD {
        0
    } else {
        duty
    }
}

pub struct DimmerTask {
    sample_rate: Rate,
    level: u8,
}

impl DimmerTask {
    pub fn new() -> Self {
        Self {
            sample_rate: Rate::new(SAMPLE_PERIOD_MS),
            level: 0,
        }
    }

    pub fn level(&self) -> u8 {
        self.level
    }
}

impl Default for DimmerTask {
    fn default() -> Self {
        Self::new()
    }
}

impl Task for DimmerTask {
    fn run_cycle(&mut self, now_ms: u32, _node: &mut dyn NodeServices) {
        if self.sample_rate.check_due(now_ms) {
            self.level = map_level(hw::adc1_read(hw::ADC1_CH_DIMMER));
            hw::ledc_set(hw::LEDC_CH_DIMMER, self.level);
        }
    }
}
