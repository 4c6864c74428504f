//! Fuzz target: light config command handling
//!
//! `light/config` payloads arrive from the network; the handler must
//! survive arbitrary bytes (invalid UTF-8, truncated JSON, surprise
//! types) without panicking, and must never apply a colour it did not
//! recognise.
//!
//! cargo fuzz run fuzz_light_config

#![no_main]

use homenode::mqtt::NodeServices;
use homenode::tasks::light::LightTask;
use libfuzzer_sys::fuzz_target;

struct NullNode;

impl NodeServices for NullNode {
    fn publish(&mut self, _topic: &str, _payload: &[u8]) -> bool {
        true
    }

    fn log(&mut self, _args: core::fmt::Arguments<'_>) {}
}

fuzz_target!(|data: &[u8]| {
    let mut task = LightTask::new();
    let mut node = NullNode;
    task.on_config(data, &mut node);

    // Only the four named colours (or off) are ever applied.
    let known = [
        (0, 0, 0),
        (255, 255, 255),
        (255, 0, 0),
        (0, 255, 0),
        (0, 0, 255),
    ];
    assert!(known.contains(&task.current_colour()));
});
