//! Strip light task.
//!
//! Driven entirely by `light/config` commands; the run cycle has
//! nothing to do. A config selects one of four named colours or turns
//! the strip off, and the applied state is echoed on `light/state` so
//! the hub can reconcile.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::hw;
use crate::mqtt::NodeServices;
use crate::runtime::Task;

use super::TOPIC_LIGHT_STATE;

const SATURATION: u8 = 255;

#[derive(Deserialize)]
struct LightConfig<'a> {
    enabled: bool,
    #[serde(borrow)]
    color: Option<&'a str>,
}

#[derive(Serialize)]
struct LightState<'a> {
    enabled: bool,
    color: &'a str,
}

fn named_colour(name: &str) -> Option<(u8, u8, u8)> {
    match name {
        "white" => Some((SATURATION, SATURATION, SATURATION)),
        "red" => Some((SATURATION, 0, 0)),
        "green" => Some((0, SATURATION, 0)),
        "blue" => Some((0, 0, SATURATION)),
        _ => None,
    }
}

pub struct LightTask {
    enabled: bool,
    colour_name: heapless::String<8>,
    current: (u8, u8, u8),
}

impl LightTask {
    pub fn new() -> Self {
        Self {
            enabled: false,
            colour_name: heapless::String::new(),
            current: (0, 0, 0),
        }
    }

    pub fn current_colour(&self) -> (u8, u8, u8) {
        self.current
    }

    fn apply(&mut self, rgb: (u8, u8, u8)) {
        hw::ledc_set(hw::LEDC_CH_LIGHT_R, rgb.0);
        hw::ledc_set(hw::LEDC_CH_LIGHT_G, rgb.1);
        hw::ledc_set(hw::LEDC_CH_LIGHT_B, rgb.2);
        self.current = rgb;
    }

    /// Handle one `light/config` command. A malformed payload is logged
    /// and dropped; the strip keeps its previous state.
    pub fn on_config(&mut self, payload: &[u8], node: &mut dyn NodeServices) {
        let text = core::str::from_utf8(payload).unwrap_or("<invalid utf8>");
        node.log(format_args!("light config ({}): {}", payload.len(), text));

        let config: LightConfig<'_> = match serde_json::from_slice(payload) {
            Ok(config) => config,
            Err(_) => {
                node.log(format_args!("failed to parse light config"));
                return;
            }
        };

        if config.enabled {
            let Some(rgb) = config.color.and_then(named_colour) else {
                node.log(format_args!("unknown light color"));
                return;
            };
            self.enabled = true;
            self.colour_name.clear();
            // named colours all fit the 8-byte buffer
            let _ = self.colour_name.push_str(config.color.unwrap_or(""));
            self.apply(rgb);
        } else {
            self.enabled = false;
            self.apply((0, 0, 0));
        }

        let state = LightState {
            enabled: self.enabled,
            color: &self.colour_name,
        };
        if let Ok(echo) = serde_json::to_vec(&state) {
            node.publish(TOPIC_LIGHT_STATE, &echo);
        }
    }
}

impl Default for LightTask {
    fn default() -> Self {
        Self::new()
    }
}

impl Task for LightTask {
    fn init(&mut self) -> Result<()> {
        // start dark until the hub says otherwise
        self.apply((0, 0, 0));
        Ok(())
    }

    fn run_cycle(&mut self, _now_ms: u32, _node: &mut dyn NodeServices) {}
}

#[cfg(all(test, not(target_os = "espidf")))]
mod tests {
    use super::*;
    use crate::tasks::testutil::RecordingNode;

    #[test]
    fn enabling_with_named_colour_drives_strip() {
        let mut task = LightTask::new();
        let mut node = RecordingNode::new();

        task.on_config(br#"{"enabled": true, "color": "red"}"#, &mut node);
        assert_eq!(task.current_colour(), (255, 0, 0));

        let echoed = node.published_on(TOPIC_LIGHT_STATE);
        assert_eq!(echoed, vec![br#"{"enabled":true,"color":"red"}"# as &[u8]]);
    }

    #[test]
    fn disabling_blanks_strip() {
        let mut task = LightTask::new();
        let mut node = RecordingNode::new();

        task.on_config(br#"{"enabled": true, "color": "white"}"#, &mut node);
        task.on_config(br#"{"enabled": false}"#, &mut node);
        assert_eq!(task.current_colour(), (0, 0, 0));
    }

    #[test]
    fn malformed_payload_keeps_previous_state() {
        let mut task = LightTask::new();
        let mut node = RecordingNode::new();

        task.on_config(br#"{"enabled": true, "color": "blue"}"#, &mut node);
        task.on_config(b"not json", &mut node);

        assert_eq!(task.current_colour(), (0, 0, 255));
        assert!(node
            .logged
            .iter()
            .any(|l| l.contains("failed to parse light config")));
        // no state echo for the bad payload
        assert_eq!(node.published_on(TOPIC_LIGHT_STATE).len(), 1);
    }

    #[test]
    fn unknown_colour_is_rejected() {
        let mut task = LightTask::new();
        let mut node = RecordingNode::new();

        task.on_config(br#"{"enabled": true, "color": "mauve"}"#, &mut node);
        assert_eq!(task.current_colour(), (0, 0, 0));
        assert!(node.logged.iter().any(|l| l.contains("unknown light color")));
    }
}
