//! WiFi station bring-up.
//!
//! Association is blocking with an explicit deadline: the node is
//! useless without a link, but an infinite wait would defeat the
//! watchdog. Credential validation happens before any driver call so a
//! corrupt config fails fast with a typed error instead of an opaque
//! driver rejection mid-handshake.

use log::info;

use crate::error::CommsError;

const SSID_MAX: usize = 32;
const PASSWORD_MAX: usize = 64;
/// Minimum WPA2 passphrase length; empty means an open network.
const PASSWORD_MIN: usize = 8;

#[cfg(target_os = "espidf")]
const ASSOCIATE_POLL_STEP_MS: u32 = 500;
#[cfg(not(target_os = "espidf"))]
const ASSOCIATE_POLL_STEP_MS: u32 = 1;

#[cfg(not(target_os = "espidf"))]
pub mod sim {
    //! Host-side observation points for bring-up tests. Thread-local so
    //! parallel tests stay independent.
    use core::cell::Cell;

    std::thread_local! {
        pub(super) static ASSOCIATE_ATTEMPTS: Cell<u32> = const { Cell::new(0) };
        pub(super) static ASSOCIATE_OK: Cell<bool> = const { Cell::new(true) };
    }

    /// Number of `associate_blocking` calls since the last reset.
    pub fn associate_attempts() -> u32 {
        ASSOCIATE_ATTEMPTS.with(Cell::get)
    }

    /// Script whether the next associations succeed.
    pub fn set_associate_ok(ok: bool) {
        ASSOCIATE_OK.with(|c| c.set(ok));
    }

    pub fn reset() {
        ASSOCIATE_ATTEMPTS.with(|c| c.set(0));
        ASSOCIATE_OK.with(|c| c.set(true));
    }
}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7e).contains(&b))
}

pub struct WifiAdapter {
    ssid: heapless::String<SSID_MAX>,
    password: heapless::String<PASSWORD_MAX>,
    hostname: heapless::String<32>,
}

impl WifiAdapter {
    pub fn new() -> Self {
        Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            hostname: heapless::String::new(),
        }
    }

    /// Validate and store station credentials. The hostname doubles as
    /// the DHCP hostname and the mDNS name for update discovery.
    pub fn set_credentials(
        &mut self,
        ssid: &str,
        password: &str,
        hostname: &str,
    ) -> Result<(), CommsError> {
        if ssid.is_empty() || ssid.len() > SSID_MAX || !is_printable_ascii(ssid) {
            return Err(CommsError::WifiConfigRejected);
        }
        if !password.is_empty() && (password.len() < PASSWORD_MIN || password.len() > PASSWORD_MAX)
        {
            return Err(CommsError::WifiConfigRejected);
        }
        self.ssid.clear();
        self.password.clear();
        self.hostname.clear();
        // Lengths checked above; hostname is truncated by config parsing.
        let _ = self.ssid.push_str(ssid);
        let _ = self.password.push_str(password);
        let _ = self.hostname.push_str(hostname);
        Ok(())
    }

    /// Start the station and block until it has an IP address or the
    /// deadline passes.
    pub fn associate_blocking(&mut self, timeout_ms: u32) -> Result<(), CommsError> {
        info!("connecting to WiFi network {}", self.ssid);

        #[cfg(target_os = "espidf")]
        {
            self.associate_device(timeout_ms)
        }
        #[cfg(not(target_os = "espidf"))]
        {
            let _ = timeout_ms;
            let _ = ASSOCIATE_POLL_STEP_MS;
            sim::ASSOCIATE_ATTEMPTS.with(|c| c.set(c.get() + 1));
            if sim::ASSOCIATE_OK.with(core::cell::Cell::get) {
                info!("WiFi connected (sim)");
                Ok(())
            } else {
                Err(CommsError::WifiAssociateTimeout)
            }
        }
    }

    #[cfg(target_os = "espidf")]
    fn associate_device(&mut self, timeout_ms: u32) -> Result<(), CommsError> {
        use esp_idf_svc::eventloop::EspSystemEventLoop;
        use esp_idf_svc::hal::peripherals::Peripherals;
        use esp_idf_svc::nvs::EspDefaultNvsPartition;
        use esp_idf_svc::wifi::{BlockingWifi, ClientConfiguration, Configuration, EspWifi};

        let peripherals = Peripherals::take().map_err(|_| CommsError::WifiConfigRejected)?;
        let sysloop = EspSystemEventLoop::take().map_err(|_| CommsError::WifiConfigRejected)?;
        let nvs = EspDefaultNvsPartition::take().map_err(|_| CommsError::WifiConfigRejected)?;

        let mut wifi = BlockingWifi::wrap(
            EspWifi::new(peripherals.modem, sysloop.clone(), Some(nvs))
                .map_err(|_| CommsError::WifiConfigRejected)?,
            sysloop,
        )
        .map_err(|_| CommsError::WifiConfigRejected)?;

        let conf = Configuration::Client(ClientConfiguration {
            ssid: self.ssid.as_str().try_into().map_err(|_| CommsError::WifiConfigRejected)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| CommsError::WifiConfigRejected)?,
            ..Default::default()
        });
        wifi.set_configuration(&conf)
            .map_err(|_| CommsError::WifiConfigRejected)?;

        wifi.start().map_err(|_| CommsError::WifiConfigRejected)?;
        wifi.connect().map_err(|_| CommsError::WifiAssociateTimeout)?;

        let mut waited_ms: u32 = 0;
        while !wifi.is_connected().unwrap_or(false) || wifi.wifi().sta_netif().get_ip_info().is_err()
        {
            if waited_ms >= timeout_ms {
                return Err(CommsError::WifiAssociateTimeout);
            }
            std::thread::sleep(std::time::Duration::from_millis(
                ASSOCIATE_POLL_STEP_MS as u64,
            ));
            waited_ms = waited_ms.saturating_add(ASSOCIATE_POLL_STEP_MS);
        }

        info!("WiFi connected, hostname {}", self.hostname);
        // Driver handle must outlive the session; leak it for the boot
        // lifetime like the other singletons.
        std::mem::forget(wifi);
        Ok(())
    }
}

impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}
