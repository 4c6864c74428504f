//! GPIO / peripheral pin assignments for the node boards.
//!
//! Single source of truth — every task references this module rather than
//! hard-coding pin numbers. Two board profiles share the firmware image;
//! which pins are actually driven depends on the node's hostname.

// ---------------------------------------------------------------------------
// Garage node
// ---------------------------------------------------------------------------

/// PIR motion sensor — digital output, interrupt on rising edge.
pub const PIR_GPIO: i32 = 4;

/// Ultrasonic rangefinder pulse-width output (µs HIGH time ∝ distance).
pub const SONAR_PULSE_GPIO: i32 = 5;

/// Door relay — idles HIGH, pulsed LOW to toggle the opener.
pub const DOOR_RELAY_GPIO: i32 = 12;
/// Relay pulse width for one opener toggle.
pub const DOOR_RELAY_PULSE_MS: u32 = 400;

/// Analog RGB strip, one MOSFET per colour rail, LEDC PWM per channel.
pub const LIGHT_R_GPIO: i32 = 13;
pub const LIGHT_G_GPIO: i32 = 14;
pub const LIGHT_B_GPIO: i32 = 15;

// ---------------------------------------------------------------------------
// LED-driver node
// ---------------------------------------------------------------------------

/// Dimmer potentiometer wiper — ADC1 channel 5 (GPIO 6 on ESP32-S3).
pub const DIMMER_ADC_GPIO: i32 = 6;

/// PWM output driving the white strip MOSFET.
pub const DIMMER_PWM_GPIO: i32 = 7;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC timer resolution (bits). 8-bit gives 0 – 255 duty levels.
pub const PWM_RESOLUTION_BITS: u32 = 8;
/// LEDC base frequency for every strip channel (1 kHz).
pub const STRIP_PWM_FREQ_HZ: u32 = 1_000;
