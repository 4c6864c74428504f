//! Door relay task.
//!
//! Any payload on `door/config` toggles the opener; the relay contact
//! stands in for the wall button, so there is no open/close semantics
//! at this level, only a pulse.

use crate::hw;
use crate::mqtt::NodeServices;
use crate::pins;
use crate::runtime::Task;

pub struct DoorTask;

impl DoorTask {
    pub fn new() -> Self {
        Self
    }

    pub fn on_command(&mut self, _payload: &[u8], node: &mut dyn NodeServices) {
        node.log(format_args!("door toggle"));
        hw::relay_pulse(pins::DOOR_RELAY_GPIO, pins::DOOR_RELAY_PULSE_MS);
    }
}

impl Default for DoorTask {
    fn default() -> Self {
        Self::new()
    }
}

impl Task for DoorTask {
    fn run_cycle(&mut self, _now_ms: u32, _node: &mut dyn NodeServices) {}
}
