//! One-shot hardware peripheral initialization and pin-level access.
//!
//! Configures ADC channels, GPIO directions, and LEDC timers/channels
//! using raw ESP-IDF sys calls. Called once from `main()` before the
//! node loop starts. Host builds replace every access with in-memory
//! simulation state so tasks can be tested without hardware.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::pins;

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={rc})"),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={rc})"),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={rc})"),
        }
    }
}

pub const LEDC_CH_LIGHT_R: u32 = 0;
pub const LEDC_CH_LIGHT_G: u32 = 1;
pub const LEDC_CH_LIGHT_B: u32 = 2;
pub const LEDC_CH_DIMMER: u32 = 3;

pub const ADC1_CH_DIMMER: u32 = 5;

/// Host-side simulation state: scripted inputs, recorded outputs.
/// Thread-local so parallel tests stay independent.
#[cfg(not(target_os = "espidf"))]
pub mod sim {
    use core::cell::Cell;

    std::thread_local! {
        pub(super) static ADC_VALUE: Cell<u16> = const { Cell::new(0) };
        pub(super) static PULSE_WIDTH_US: Cell<u32> = const { Cell::new(0) };
        pub(super) static RELAY_PULSES: Cell<u32> = const { Cell::new(0) };
    }

    pub fn set_adc_value(raw: u16) {
        ADC_VALUE.with(|c| c.set(raw));
    }

    pub fn set_pulse_width_us(us: u32) {
        PULSE_WIDTH_US.with(|c| c.set(us));
    }

    pub fn relay_pulses() -> u32 {
        RELAY_PULSES.with(Cell::get)
    }

    pub fn reset() {
        ADC_VALUE.with(|c| c.set(0));
        PULSE_WIDTH_US.with(|c| c.set(0));
        RELAY_PULSES.with(|c| c.set(0));
    }
}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the node loop; single-threaded.
    unsafe {
        init_adc()?;
        init_gpio()?;
        init_ledc();
    }
    info!("hw: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw(sim): peripheral init skipped");
    Ok(())
}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: `ADC1_HANDLE` is written once in `init_adc` before the node
/// loop starts; every later access is from the single main task.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_10,
    };
    let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), ADC1_CH_DIMMER, &chan_cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    info!("hw: ADC1 configured (CH{}=dimmer pot)", ADC1_CH_DIMMER);
    Ok(())
}

/// 10-bit oneshot read (0..1024).
#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u32) -> u16 {
    let mut raw: i32 = 0;
    // SAFETY: adc1_handle() contract — single-threaded main-loop access only.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), channel, &mut raw) };
    if ret != ESP_OK as i32 {
        return 0;
    }
    raw.max(0) as u16
}

#[cfg(not(target_os = "espidf"))]
pub fn adc1_read(_channel: u32) -> u16 {
    sim::ADC_VALUE.with(core::cell::Cell::get)
}

// ── GPIO ──────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio() -> Result<(), HwInitError> {
    for &pin in &[pins::PIR_GPIO, pins::SONAR_PULSE_GPIO] {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_ENABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
    }

    let relay_cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::DOOR_RELAY_GPIO,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&relay_cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    // Relay idles HIGH; the opener triggers on the LOW pulse.
    unsafe { gpio_set_level(pins::DOOR_RELAY_GPIO, 1) };

    info!("hw: GPIO configured");
    Ok(())
}

/// Pulse the door relay LOW for `pulse_ms`, then return it HIGH.
/// Blocking by design; one opener toggle takes well under a tick.
#[cfg(target_os = "espidf")]
pub fn relay_pulse(pin: i32, pulse_ms: u32) {
    // SAFETY: pin was configured as output in init_gpio(); main loop only.
    unsafe {
        gpio_set_level(pin, 0);
    }
    std::thread::sleep(std::time::Duration::from_millis(u64::from(pulse_ms)));
    unsafe {
        gpio_set_level(pin, 1);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn relay_pulse(_pin: i32, _pulse_ms: u32) {
    sim::RELAY_PULSES.with(|c| c.set(c.get() + 1));
}

/// Measure one HIGH pulse on `pin` in microseconds, bounded by
/// `timeout_us`. Returns 0 when no pulse arrives in time.
#[cfg(target_os = "espidf")]
pub fn pulse_in_us(pin: i32, timeout_us: u32) -> u32 {
    // SAFETY: gpio_get_level / esp_timer_get_time are read-only register
    // accesses on a configured input pin; main loop only.
    unsafe {
        let deadline = esp_timer_get_time() + i64::from(timeout_us);
        while gpio_get_level(pin) != 0 {
            if esp_timer_get_time() > deadline {
                return 0;
            }
        }
        while gpio_get_level(pin) == 0 {
            if esp_timer_get_time() > deadline {
                return 0;
            }
        }
        let start = esp_timer_get_time();
        while gpio_get_level(pin) != 0 {
            if esp_timer_get_time() > deadline {
                return 0;
            }
        }
        (esp_timer_get_time() - start) as u32
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn pulse_in_us(_pin: i32, _timeout_us: u32) -> u32 {
    sim::PULSE_WIDTH_US.with(core::cell::Cell::get)
}

// ── LEDC PWM ─────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_ledc() {
    // SAFETY: Called from the single main-task context via init_peripherals().
    let timer0 = ledc_timer_config_t {
        speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
        timer_num: ledc_timer_t_LEDC_TIMER_0,
        duty_resolution: ledc_timer_bit_t_LEDC_TIMER_8_BIT,
        freq_hz: pins::STRIP_PWM_FREQ_HZ,
        clk_cfg: soc_periph_ledc_clk_src_legacy_t_LEDC_AUTO_CLK,
        ..Default::default()
    };
    unsafe {
        ledc_timer_config(&timer0);
    }

    let channels = [
        (LEDC_CH_LIGHT_R, pins::LIGHT_R_GPIO),
        (LEDC_CH_LIGHT_G, pins::LIGHT_G_GPIO),
        (LEDC_CH_LIGHT_B, pins::LIGHT_B_GPIO),
        (LEDC_CH_DIMMER, pins::DIMMER_PWM_GPIO),
    ];
    for (channel, gpio) in channels {
        unsafe {
            ledc_channel_config(&ledc_channel_config_t {
                speed_mode: ledc_mode_t_LEDC_LOW_SPEED_MODE,
                channel,
                timer_sel: ledc_timer_t_LEDC_TIMER_0,
                gpio_num: gpio,
                duty: 0,
                hpoint: 0,
                ..Default::default()
            });
        }
    }

    info!("hw: LEDC configured (light=CH0-2, dimmer=CH3)");
}

#[cfg(target_os = "espidf")]
pub fn ledc_set(channel: u32, duty: u8) {
    // SAFETY: LEDC channels were configured in init_ledc(); duty register
    // writes are race-free since only the main loop calls this function.
    unsafe {
        ledc_set_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel, duty as u32);
        ledc_update_duty(ledc_mode_t_LEDC_LOW_SPEED_MODE, channel);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn ledc_set(_channel: u32, _duty: u8) {}

// ── GPIO ISR Service ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn pir_gpio_isr(_arg: *mut core::ffi::c_void) {
    crate::tasks::pir::pir_isr_handler();
}

/// Install the GPIO ISR service and register the PIR rising-edge
/// handler. Call after `init_peripherals` and before the node loop.
#[cfg(target_os = "espidf")]
pub fn init_isr_service() -> Result<(), HwInitError> {
    // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
    // means it was already installed (acceptable). The registered handler
    // only touches an atomic counter.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
            return Err(HwInitError::IsrInstallFailed(ret));
        }

        gpio_set_intr_type(pins::PIR_GPIO, gpio_int_type_t_GPIO_INTR_POSEDGE);
        gpio_isr_handler_add(pins::PIR_GPIO, Some(pir_gpio_isr), core::ptr::null_mut());
        gpio_intr_enable(pins::PIR_GPIO);

        info!("hw: ISR service installed (pir)");
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_isr_service() -> Result<(), HwInitError> {
    log::info!("hw(sim): ISR service skipped");
    Ok(())
}
