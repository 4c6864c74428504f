//! Diagnostic sink plumbing: bounded log-line formatting, panic hook,
//! and the fatal-halt path.
//!
//! Every log line that may leave the device (via the per-node log topic)
//! is formatted into a fixed buffer first; anything past the buffer is
//! silently dropped. Callers must not assume arbitrarily long log lines
//! survive intact.

use core::fmt::{self, Write};

/// Fixed outbound log-line buffer size. Lines are truncated, never split.
pub const LOG_LINE_CAPACITY: usize = 96;

/// A fixed-capacity line buffer whose `fmt::Write` impl never errors:
/// bytes past capacity are dropped at the last char boundary that fits.
#[derive(Debug, Default)]
pub struct LineBuf {
    buf: heapless::String<LOG_LINE_CAPACITY>,
}

impl LineBuf {
    pub fn new() -> Self {
        Self::default()
    }

    /// Format `args` into a fresh buffer, truncating silently.
    pub fn format(args: fmt::Arguments<'_>) -> Self {
        let mut line = Self::new();
        // Truncation is absorbed by the Write impl; formatting itself
        // cannot fail for the argument types used in this crate.
        let _ = line.write_fmt(args);
        line
    }

    pub fn as_str(&self) -> &str {
        self.buf.as_str()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buf.as_bytes()
    }
}

impl Write for LineBuf {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for ch in s.chars() {
            if self.buf.push(ch).is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// Install a panic hook that logs the panic reason before the system
/// panic handler aborts. Called once during bootstrap.
pub fn install_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        let reason = if let Some(msg) = info.payload().downcast_ref::<&str>() {
            *msg
        } else if let Some(msg) = info.payload().downcast_ref::<String>() {
            msg.as_str()
        } else {
            "unknown panic"
        };
        log::error!("PANIC: {}", reason);
    }));
}

/// Fatal halt: log the cause and spin forever.
///
/// The external hardware watchdog is the only recovery mechanism — it
/// resets the device after its timeout. No partial startup is attempted.
pub fn halt(cause: &crate::error::Error) -> ! {
    log::error!("FATAL: {} — halting for watchdog reset", cause);
    loop {
        #[cfg(target_os = "espidf")]
        unsafe {
            esp_idf_svc::sys::vTaskDelay(100);
        }
        #[cfg(not(target_os = "espidf"))]
        std::thread::sleep(std::time::Duration::from_millis(100));
    }
}
