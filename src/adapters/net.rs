//! WiFi station-mode adapter and link-quality reporting.
//!
//! The dashboard shows signal strength as a percentage, so the raw dBm
//! value from the radio is mapped onto a fixed 0–100 scale
//! (−105 dBm = 0 %, −30 dBm = 100 %).
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: RSSI via `esp_wifi_sta_get_ap_info`,
//!   IP via `esp_netif_get_ip_info` on the default STA interface.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## Reconnection policy
//!
//! On disconnect the adapter waits an exponential backoff (2 s → 4 s →
//! 8 s … capped at 60 s) before retrying.

use core::fmt;
use log::{error, info, warn};

use crate::pins;

// ───────────────────────────────────────────────────────────────
// RSSI mapping
// ───────────────────────────────────────────────────────────────

/// Map raw RSSI (dBm) to the dashboard's 0–100 % scale.
pub fn rssi_to_percent(dbm: i8) -> u8 {
    let lo = pins::RSSI_0_PERCENT_DBM as i32;
    let hi = pins::RSSI_100_PERCENT_DBM as i32;
    let clamped = (dbm as i32).clamp(lo, hi);
    (((clamped - lo) * 100) / (hi - lo)) as u8
}

/// Coarse link quality buckets used in log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalQuality {
    Weak,
    Ok,
    Strong,
}

impl SignalQuality {
    pub fn from_dbm(dbm: i8) -> Self {
        if dbm < pins::RSSI_WEAK_DBM {
            Self::Weak
        } else if dbm < pins::RSSI_OK_DBM {
            Self::Ok
        } else {
            Self::Strong
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Link info
// ───────────────────────────────────────────────────────────────

/// Snapshot of the network link, published alongside telemetry.
#[derive(Debug, Clone, Default)]
pub struct LinkInfo {
    pub connected: bool,
    pub rssi_dbm: Option<i8>,
    /// Dotted-quad IPv4 address; empty when not connected.
    pub ip: heapless::String<16>,
}

impl LinkInfo {
    pub fn rssi_percent(&self) -> Option<u8> {
        self.rssi_dbm.map(rssi_to_percent)
    }
}

// ───────────────────────────────────────────────────────────────
// Errors and state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
    AlreadyConnected,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
            Self::AlreadyConnected => write!(f, "already connected to AP"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
}

const MAX_BACKOFF_SECS: u32 = 60;

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 {
        return Err(ConnectivityError::InvalidSsid);
    }
    if !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    state: WifiState,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    backoff_secs: u32,
    link: LinkInfo,
    /// Owned ESP-IDF STA driver; created lazily on the first connect so
    /// the device can run fully offline when no credentials are baked in.
    #[cfg(target_os = "espidf")]
    driver: Option<esp_idf_svc::wifi::EspWifi<'static>>,
    /// Simulation: counts platform_connect() calls for deterministic failures.
    #[cfg(not(target_os = "espidf"))]
    sim_connect_counter: u32,
}

impl WifiAdapter {
    pub fn new() -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            backoff_secs: 2,
            link: LinkInfo::default(),
            #[cfg(target_os = "espidf")]
            driver: None,
            #[cfg(not(target_os = "espidf"))]
            sim_connect_counter: 0,
        }
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid
            .push_str(ssid)
            .map_err(|_| ConnectivityError::InvalidSsid)?;
        self.password.clear();
        self.password
            .push_str(password)
            .map_err(|_| ConnectivityError::InvalidPassword)?;
        info!("WiFi: credentials updated (SSID='{}')", self.ssid);
        Ok(())
    }

    pub fn connect(&mut self) -> Result<(), ConnectivityError> {
        if self.ssid.is_empty() {
            return Err(ConnectivityError::NoCredentials);
        }
        if self.state == WifiState::Connected {
            return Err(ConnectivityError::AlreadyConnected);
        }

        info!("WiFi: connecting to '{}'", self.ssid);
        self.state = WifiState::Connecting;

        match self.platform_connect() {
            Ok(()) => {
                self.state = WifiState::Connected;
                self.backoff_secs = 2;
                self.refresh_link();
                info!(
                    "WiFi: connected (RSSI={:?} dBm, IP={})",
                    self.link.rssi_dbm, self.link.ip
                );
                Ok(())
            }
            Err(e) => {
                error!("WiFi: connection failed — {}", e);
                self.state = WifiState::Reconnecting { attempt: 0 };
                Err(e)
            }
        }
    }

    pub fn disconnect(&mut self) {
        self.platform_disconnect();
        self.state = WifiState::Disconnected;
        self.link = LinkInfo::default();
        info!("WiFi: disconnected");
    }

    pub fn is_connected(&self) -> bool {
        self.state == WifiState::Connected
    }

    /// Call once per control tick to maintain the link and refresh RSSI/IP.
    pub fn poll(&mut self) {
        match self.state {
            WifiState::Reconnecting { attempt } => {
                info!(
                    "WiFi: reconnect attempt {} (backoff {}s)",
                    attempt, self.backoff_secs
                );
                match self.platform_connect() {
                    Ok(()) => {
                        self.state = WifiState::Connected;
                        self.backoff_secs = 2;
                        self.refresh_link();
                        info!("WiFi: reconnected (RSSI={:?} dBm)", self.link.rssi_dbm);
                    }
                    Err(_) => {
                        self.backoff_secs = (self.backoff_secs * 2).min(MAX_BACKOFF_SECS);
                        self.state = WifiState::Reconnecting {
                            attempt: attempt + 1,
                        };
                    }
                }
            }
            WifiState::Connected => {
                if !self.platform_is_connected() {
                    warn!("WiFi: connection lost, entering reconnect");
                    self.state = WifiState::Reconnecting { attempt: 0 };
                    self.link = LinkInfo::default();
                } else {
                    self.refresh_link();
                }
            }
            _ => {}
        }
    }

    /// Current link snapshot for telemetry.
    pub fn link_info(&self) -> LinkInfo {
        self.link.clone()
    }

    fn refresh_link(&mut self) {
        self.link.connected = true;
        self.link.rssi_dbm = self.platform_rssi();
        self.link.ip = self.platform_ip();
        if let Some(dbm) = self.link.rssi_dbm {
            if SignalQuality::from_dbm(dbm) == SignalQuality::Weak {
                warn!("WiFi: weak signal ({} dBm)", dbm);
            }
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<(), ConnectivityError> {
        use esp_idf_svc::eventloop::EspSystemEventLoop;
        use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi};

        if self.driver.is_none() {
            // SAFETY: the modem peripheral is owned by this adapter alone;
            // nothing else in the firmware touches the radio.
            let modem = unsafe { esp_idf_hal::modem::Modem::new() };
            let sysloop = EspSystemEventLoop::take().map_err(|e| {
                error!("WiFi: system event loop unavailable ({})", e);
                ConnectivityError::ConnectionFailed
            })?;
            // NVS is already initialised by NvsAdapter; the driver keeps
            // its calibration data in RAM only (None partition).
            let wifi = EspWifi::new(modem, sysloop, None).map_err(|e| {
                error!("WiFi: driver init failed ({})", e);
                ConnectivityError::ConnectionFailed
            })?;
            self.driver = Some(wifi);
        }
        let Some(wifi) = self.driver.as_mut() else {
            return Err(ConnectivityError::ConnectionFailed);
        };

        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let sta = Configuration::Client(ClientConfiguration {
            ssid: self
                .ssid
                .as_str()
                .try_into()
                .map_err(|()| ConnectivityError::InvalidSsid)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|()| ConnectivityError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });

        let fail = |e: esp_idf_svc::sys::EspError| {
            error!("WiFi: STA connect failed ({})", e);
            ConnectivityError::ConnectionFailed
        };
        wifi.set_configuration(&sta).map_err(fail)?;
        wifi.start().map_err(fail)?;
        wifi.connect().map_err(fail)?;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<(), ConnectivityError> {
        self.sim_connect_counter = self.sim_connect_counter.wrapping_add(1);
        // Every 10th attempt fails, to exercise the backoff path.
        if self.sim_connect_counter % 10 == 3 {
            warn!(
                "WiFi(sim): simulated failure (attempt {})",
                self.sim_connect_counter
            );
            return Err(ConnectivityError::ConnectionFailed);
        }
        info!(
            "WiFi(sim): connected to '{}' (attempt {})",
            self.ssid, self.sim_connect_counter
        );
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_disconnect(&mut self) {
        if let Some(wifi) = self.driver.as_mut() {
            if let Err(e) = wifi.disconnect() {
                warn!("WiFi: disconnect failed ({})", e);
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_disconnect(&mut self) {
        info!("WiFi(sim): disconnected");
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        let mut ap_info: esp_idf_svc::sys::wifi_ap_record_t = unsafe { core::mem::zeroed() };
        let ret = unsafe { esp_idf_svc::sys::esp_wifi_sta_get_ap_info(&mut ap_info) };
        ret == esp_idf_svc::sys::ESP_OK
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.state == WifiState::Connected
    }

    #[cfg(target_os = "espidf")]
    fn platform_rssi(&self) -> Option<i8> {
        let mut ap_info: esp_idf_svc::sys::wifi_ap_record_t = unsafe { core::mem::zeroed() };
        let ret = unsafe { esp_idf_svc::sys::esp_wifi_sta_get_ap_info(&mut ap_info) };
        if ret == esp_idf_svc::sys::ESP_OK {
            Some(ap_info.rssi)
        } else {
            None
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_rssi(&self) -> Option<i8> {
        if self.state != WifiState::Connected && self.state != WifiState::Connecting {
            return None;
        }
        // Oscillate between roughly -66 and -54 dBm.
        let oscillation = ((self.sim_connect_counter % 12) as i8) - 6;
        Some((-60_i8).saturating_add(oscillation))
    }

    #[cfg(target_os = "espidf")]
    fn platform_ip(&self) -> heapless::String<16> {
        use esp_idf_svc::sys::*;
        let mut out = heapless::String::new();
        // SAFETY: the default STA netif is created by the EspWifi driver in
        // platform_connect(); the null check covers the never-connected case.
        unsafe {
            let netif = esp_netif_get_handle_from_ifkey(b"WIFI_STA_DEF\0".as_ptr() as *const _);
            if netif.is_null() {
                return out;
            }
            let mut ip_info: esp_netif_ip_info_t = core::mem::zeroed();
            if esp_netif_get_ip_info(netif, &mut ip_info) != ESP_OK {
                return out;
            }
            let octets = ip_info.ip.addr.to_le_bytes();
            let _ = core::fmt::write(
                &mut out,
                format_args!("{}.{}.{}.{}", octets[0], octets[1], octets[2], octets[3]),
            );
        }
        out
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_ip(&self) -> heapless::String<16> {
        let mut out = heapless::String::new();
        if self.state == WifiState::Connected || self.state == WifiState::Connecting {
            let _ = out.push_str("192.168.1.42");
        }
        out
    }
}

impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rssi_endpoints_map_to_scale_ends() {
        assert_eq!(rssi_to_percent(-105), 0);
        assert_eq!(rssi_to_percent(-30), 100);
    }

    #[test]
    fn rssi_clamps_outside_range() {
        assert_eq!(rssi_to_percent(-120), 0);
        assert_eq!(rssi_to_percent(-10), 100);
    }

    #[test]
    fn rssi_midpoint_is_linear() {
        // Midpoint of [-105, -30] is -67.5; -67 maps just above 50 %.
        let pct = rssi_to_percent(-67);
        assert!((49..=52).contains(&pct), "got {pct}");
    }

    #[test]
    fn signal_quality_buckets() {
        assert_eq!(SignalQuality::from_dbm(-90), SignalQuality::Weak);
        assert_eq!(SignalQuality::from_dbm(-81), SignalQuality::Ok);
        assert_eq!(SignalQuality::from_dbm(-75), SignalQuality::Ok);
        assert_eq!(SignalQuality::from_dbm(-71), SignalQuality::Strong);
        assert_eq!(SignalQuality::from_dbm(-40), SignalQuality::Strong);
    }

    #[test]
    fn rejects_empty_ssid() {
        let mut a = WifiAdapter::new();
        assert_eq!(
            a.set_credentials("", "password123"),
            Err(ConnectivityError::InvalidSsid)
        );
    }

    #[test]
    fn rejects_short_password() {
        let mut a = WifiAdapter::new();
        assert_eq!(
            a.set_credentials("MyNet", "short"),
            Err(ConnectivityError::InvalidPassword)
        );
    }

    #[test]
    fn accepts_open_network() {
        let mut a = WifiAdapter::new();
        assert!(a.set_credentials("OpenCafe", "").is_ok());
    }

    #[test]
    fn connect_without_credentials_fails() {
        let mut a = WifiAdapter::new();
        assert_eq!(a.connect(), Err(ConnectivityError::NoCredentials));
    }

    #[test]
    fn connect_populates_link_info() {
        let mut a = WifiAdapter::new();
        a.set_credentials("TestNet", "password1").unwrap();
        a.connect().unwrap();
        let link = a.link_info();
        assert!(link.connected);
        assert!(link.rssi_dbm.is_some());
        assert!(!link.ip.is_empty());
        assert!(link.rssi_percent().is_some());

        a.disconnect();
        let link = a.link_info();
        assert!(!link.connected);
        assert!(link.rssi_dbm.is_none());
        assert!(link.ip.is_empty());
    }

    #[test]
    fn double_connect_fails() {
        let mut a = WifiAdapter::new();
        a.set_credentials("Net", "password1").unwrap();
        a.connect().unwrap();
        assert_eq!(a.connect(), Err(ConnectivityError::AlreadyConnected));
    }
}
