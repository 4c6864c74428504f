//! HomeNode firmware — main entry point.
//!
//! One image serves both board profiles; the provisioned hostname
//! selects which task set runs. Bring-up is strictly ordered (storage,
//! WiFi, time sync, update channel, broker session) and any failure
//! halts for the watchdog — a node that cannot reach its broker has no
//! useful degraded mode.

#![deny(unused_must_use)]

use anyhow::Result;
use log::{error, info, warn};

use homenode::adapters::ota;
use homenode::adapters::storage::nvs::{NvsAnchorSource, NvsConfigSource};
use homenode::diagnostics;
use homenode::error::Error;
use homenode::hw;
use homenode::mqtt::esp_impl::EspBroker;
use homenode::runtime::{NodeRuntime, RuntimeOptions};
use homenode::tasks::{GarageTasks, Handler, LedDriverTasks};

/// Main-loop pacing. Short enough that 100 ms task cadences hold,
/// long enough to leave the radio task plenty of air.
const CYCLE_SLEEP_MS: u64 = 20;

fn main() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("HomeNode v{}", env!("CARGO_PKG_VERSION"));

    ota::check_rollback();
    diagnostics::install_panic_handler();

    if let Err(e) = hw::init_peripherals() {
        error!("peripheral init failed: {e}");
        diagnostics::halt(&Error::Init("peripheral init"));
    }
    if let Err(e) = hw::init_isr_service() {
        warn!("ISR service init failed: {e} — continuing without interrupts");
    }

    let runtime = match NodeRuntime::init(
        RuntimeOptions::default(),
        &NvsConfigSource,
        &NvsAnchorSource,
        EspBroker::new(),
    ) {
        Ok(rt) => rt,
        Err(e) => {
            error!("bring-up failed: {e}");
            diagnostics::halt(&e);
        }
    };

    // The provisioned hostname doubles as the board profile selector.
    if runtime.config().hostname.contains("leddriver") {
        run_leddriver(runtime)
    } else {
        run_garage(runtime)
    }
}

fn run_garage(mut runtime: NodeRuntime<EspBroker, Handler>) -> ! {
    let mut tasks = GarageTasks::new();
    for (topic, handler) in GarageTasks::bindings() {
        if let Err(e) = runtime.subscribe(topic, handler) {
            error!("binding {topic} failed: {e}");
            diagnostics::halt(&e);
        }
    }
    if let Err(e) = tasks.init() {
        error!("task init failed: {e}");
        diagnostics::halt(&e);
    }

    info!("garage profile ready, entering node loop");
    loop {
        runtime.run_cycle(&mut tasks);
        let now_ms = runtime.now_ms();
        tasks.run_cycle(now_ms, &mut runtime);
        std::thread::sleep(std::time::Duration::from_millis(CYCLE_SLEEP_MS));
    }
}

fn run_leddriver(mut runtime: NodeRuntime<EspBroker, Handler>) -> ! {
    let mut tasks = LedDriverTasks::new();
    if let Err(e) = tasks.init() {
        error!("task init failed: {e}");
        diagnostics::halt(&e);
    }

    info!("leddriver profile ready, entering node loop");
    loop {
        runtime.run_cycle(&mut tasks);
        let now_ms = runtime.now_ms();
        tasks.run_cycle(now_ms, &mut runtime);
        std::thread::sleep(std::time::Duration::from_millis(CYCLE_SLEEP_MS));
    }
}
