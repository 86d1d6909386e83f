use crate::domain::error::{CtrlComError, CtrlComResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Fixed read timeout applied to every link on open
pub const READ_TIMEOUT: Duration = Duration::from_millis(500);
/// Fixed write timeout applied to every link on open
pub const WRITE_TIMEOUT: Duration = Duration::from_millis(500);

/// CtrlCom configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CtrlComConfig {
    /// Global configuration
    #[serde(default)]
    pub global: GlobalConfig,
    /// Controller configurations
    #[serde(default)]
    pub controllers: Vec<ControllerConfig>,
}

/// Global configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Default log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// One controller entry: pool identifier, remote address and link settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Pool identifier
    pub id: String,
    /// Remote controller address
    pub remote_address: String,
    /// Serial link settings
    #[serde(default)]
    pub link: LinkSettings,
    /// Framing mode for this controller
    #[serde(default)]
    pub transmission: TransmissionMode,
}

/// Serial link settings as they arrive at the boundary.
///
/// All fields are strings; `validate` parses them into their semantic types
/// before a port is touched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSettings {
    /// OS port name, e.g. "COM3" or "/dev/ttyUSB0"
    #[serde(default)]
    pub port_name: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: String,
    #[serde(default = "default_parity")]
    pub parity: String,
    #[serde(default = "default_stop_bits")]
    pub stop_bits: String,
    #[serde(default = "default_data_bits")]
    pub data_bits: String,
}

/// Link settings after validation, ready to apply to a port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedLinkSettings {
    pub port_name: String,
    pub baud_rate: u32,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub data_bits: DataBits,
}

/// Parity setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

/// Stop bits setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

/// Data bits setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

/// Framing mode for payloads crossing the link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransmissionMode {
    Text,
    Hex,
}

impl LinkSettings {
    /// Create settings for the given port with default line parameters
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            ..Self::default()
        }
    }

    /// Parse every field into its semantic type.
    ///
    /// Fails with `InvalidConfiguration` naming the offending field; no port
    /// state is touched here.
    pub fn validate(&self) -> CtrlComResult<ValidatedLinkSettings> {
        let baud_rate = self.baud_rate.trim().parse::<u32>().map_err(|_| {
            CtrlComError::InvalidConfiguration(format!("bad baud rate '{}'", self.baud_rate))
        })?;
        let parity = self.parity.parse::<Parity>()?;
        let stop_bits = self.stop_bits.parse::<StopBits>()?;
        let data_bits = self.data_bits.parse::<DataBits>()?;

        Ok(ValidatedLinkSettings {
            port_name: self.port_name.clone(),
            baud_rate,
            parity,
            stop_bits,
            data_bits,
        })
    }
}

impl FromStr for Parity {
    type Err = CtrlComError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Parity::None),
            "odd" => Ok(Parity::Odd),
            "even" => Ok(Parity::Even),
            _ => Err(CtrlComError::InvalidConfiguration(format!(
                "bad parity '{}'",
                s
            ))),
        }
    }
}

impl FromStr for StopBits {
    type Err = CtrlComError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "one" | "1" => Ok(StopBits::One),
            "two" | "2" => Ok(StopBits::Two),
            _ => Err(CtrlComError::InvalidConfiguration(format!(
                "bad stop bits '{}'",
                s
            ))),
        }
    }
}

impl FromStr for DataBits {
    type Err = CtrlComError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "five" | "5" => Ok(DataBits::Five),
            "six" | "6" => Ok(DataBits::Six),
            "seven" | "7" => Ok(DataBits::Seven),
            "eight" | "8" => Ok(DataBits::Eight),
            _ => Err(CtrlComError::InvalidConfiguration(format!(
                "bad data bits '{}'",
                s
            ))),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_baud_rate() -> String {
    "9600".to_string()
}

fn default_parity() -> String {
    "None".to_string()
}

fn default_stop_bits() -> String {
    "One".to_string()
}

fn default_data_bits() -> String {
    "8".to_string()
}

impl Default for CtrlComConfig {
    fn default() -> Self {
        Self {
            global: GlobalConfig::default(),
            controllers: Vec::new(),
        }
    }
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: default_baud_rate(),
            parity: default_parity(),
            stop_bits: default_stop_bits(),
            data_bits: default_data_bits(),
        }
    }
}

impl Default for TransmissionMode {
    fn default() -> Self {
        TransmissionMode::Text
    }
}
