//! Node tasks — the per-board behaviour driven by the main loop.
//!
//! Two board profiles share the firmware image. The garage node runs
//! the PIR, sonar, light, and door tasks; the LED-driver node runs the
//! potentiometer dimmer. Inbound commands are routed to tasks through
//! handler tokens: the registry stores a token per topic and the
//! profile's delegate maps the token back to the owning task.

use crate::mqtt::{MessageDelegate, NodeServices};
use crate::runtime::Task;

pub mod dimmer;
pub mod door;
pub mod light;
pub mod pir;
pub mod sonar;

/// Commands.
pub const TOPIC_DOOR_CONFIG: &str = "door/config";
pub const TOPIC_LIGHT_CONFIG: &str = "light/config";

/// Properties.
pub const TOPIC_LIGHT_STATE: &str = "light/state";
pub const TOPIC_MOTION_STATE: &str = "motion/state";
pub const TOPIC_SONAR_STATE: &str = "sonar/state";

/// Routing token stored in the topic registry. Tokens are plain data;
/// the profile delegate owns the dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    DoorCommand,
    LightCommand,
}

/// Garage node profile: motion, sonar ranging, strip light, door relay.
pub struct GarageTasks {
    pub pir: pir::PirTask,
    pub sonar: sonar::SonarTask,
    pub light: light::LightTask,
    pub door: door::DoorTask,
}

impl GarageTasks {
    pub fn new() -> Self {
        Self {
            pir: pir::PirTask::new(),
            sonar: sonar::SonarTask::new(),
            light: light::LightTask::new(),
            door: door::DoorTask::new(),
        }
    }

    /// Topic bindings this profile needs; call before the first cycle.
    pub fn bindings() -> [(&'static str, Handler); 2] {
        [
            (TOPIC_DOOR_CONFIG, Handler::DoorCommand),
            (TOPIC_LIGHT_CONFIG, Handler::LightCommand),
        ]
    }

    pub fn init(&mut self) -> crate::error::Result<()> {
        self.pir.init()?;
        self.sonar.init()?;
        self.light.init()?;
        self.door.init()
    }

    pub fn run_cycle(&mut self, now_ms: u32, node: &mut dyn NodeServices) {
        self.sonar.run_cycle(now_ms, node);
        self.pir.run_cycle(now_ms, node);
        self.light.run_cycle(now_ms, node);
        self.door.run_cycle(now_ms, node);
    }
}

impl Default for GarageTasks {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageDelegate<Handler> for GarageTasks {
    fn on_message(
        &mut self,
        handler: Handler,
        _topic: &str,
        payload: &[u8],
        node: &mut dyn NodeServices,
    ) {
        match handler {
            Handler::DoorCommand => self.door.on_command(payload, node),
            Handler::LightCommand => self.light.on_config(payload, node),
        }
    }
}

/// LED-driver node profile: local potentiometer dimmer, no commands.
pub struct LedDriverTasks {
    pub dimmer: dimmer::DimmerTask,
}

impl LedDriverTasks {
    pub fn new() -> Self {
        Self {
            dimmer: dimmer::DimmerTask::new(),
        }
    }

    pub fn init(&mut self) -> crate::error::Result<()> {
        self.dimmer.init()
    }

    pub fn run_cycle(&mut self, now_ms: u32, node: &mut dyn NodeServices) {
        self.dimmer.run_cycle(now_ms, node);
    }
}

impl Default for LedDriverTasks {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageDelegate<Handler> for LedDriverTasks {
    fn on_message(
        &mut self,
        _handler: Handler,
        topic: &str,
        _payload: &[u8],
        node: &mut dyn NodeServices,
    ) {
        node.log(format_args!("no handler for {topic} on this profile"));
    }
}

/// In-memory node services for task-level tests.
#[cfg(all(test, not(target_os = "espidf")))]
pub(crate) mod testutil {
    use super::*;

    pub struct RecordingNode {
        pub published: Vec<(String, Vec<u8>)>,
        pub logged: Vec<String>,
    }

    impl RecordingNode {
        pub fn new() -> Self {
            Self {
                published: Vec::new(),
                logged: Vec::new(),
            }
        }

        pub fn published_on(&self, topic: &str) -> Vec<&[u8]> {
            self.published
                .iter()
                .filter(|(t, _)| t == topic)
                .map(|(_, p)| p.as_slice())
                .collect()
        }
    }

    impl NodeServices for RecordingNode {
        fn publish(&mut self, topic: &str, payload: &[u8]) -> bool {
            self.published.push((topic.to_string(), payload.to_vec()));
            true
        }

        fn log(&mut self, args: core::fmt::Arguments<'_>) {
            self.logged.push(args.to_string());
        }
    }
}
