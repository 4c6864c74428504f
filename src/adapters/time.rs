//! Monotonic tick source and wall-clock synchronization.
//!
//! All rate limiting and scheduling in the runtime works off a 32-bit
//! monotonic millisecond counter that is allowed to wrap (the signal
//! primitives use wrapping arithmetic). Wall-clock time is only needed
//! once, before the first TLS handshake, so certificate validity
//! windows can be checked.

use crate::error::CommsError;

/// Wall clock is considered synced once the epoch passes this point.
/// Anything earlier is the device default (1970 plus a few seconds).
#[cfg(target_os = "espidf")]
const EPOCH_SANITY_SECS: u64 = 8 * 3600 * 2;

/// How often the sync loop re-checks the clock while waiting.
#[cfg(target_os = "espidf")]
const SYNC_POLL_STEP_MS: u32 = 500;

pub struct NodeClock {
    #[cfg(not(target_os = "espidf"))]
    origin: std::time::Instant,
}

impl NodeClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            origin: std::time::Instant::now(),
        }
    }

    /// Monotonic milliseconds since boot, wrapping at `u32::MAX`.
    pub fn now_ms(&self) -> u32 {
        #[cfg(target_os = "espidf")]
        {
            let us = unsafe { esp_idf_sys::esp_timer_get_time() };
            (us / 1000) as u32
        }
        #[cfg(not(target_os = "espidf"))]
        {
            self.origin.elapsed().as_millis() as u32
        }
    }

    pub fn uptime_secs(&self) -> u32 {
        self.now_ms() / 1000
    }

    /// Block until the wall clock has been set via SNTP or the deadline
    /// passes. Must complete before the first TLS connect; an unsynced
    /// clock makes every certificate look expired or not yet valid.
    pub fn sync_wall_clock(&self, timeout_ms: u32) -> Result<(), CommsError> {
        #[cfg(target_os = "espidf")]
        {
            use esp_idf_svc::sntp::EspSntp;

            let _sntp = EspSntp::new_default().map_err(|_| CommsError::TimeSyncTimeout)?;
            let deadline = self.now_ms().wrapping_add(timeout_ms);
            loop {
                let now = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0);
                if now > EPOCH_SANITY_SECS {
                    return Ok(());
                }
                if deadline.wrapping_sub(self.now_ms()) > timeout_ms {
                    return Err(CommsError::TimeSyncTimeout);
                }
                std::thread::sleep(std::time::Duration::from_millis(SYNC_POLL_STEP_MS as u64));
            }
        }
        #[cfg(not(target_os = "espidf"))]
        {
            let _ = timeout_ms;
            Ok(())
        }
    }
}

impl Default for NodeClock {
    fn default() -> Self {
        Self::new()
    }
}
