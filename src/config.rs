use crate::throttle::ThrottlePolicy;
use crate::types::DeviceId;

#[derive(serde::Deserialize, Debug, PartialEq)]
pub struct ApplicationConfig {
    #[serde(default)]
    pub gpsd: GpsdConfig,
    pub reporting: ReportingConfig,
    pub destination: DestinationConfig,
    pub rendezvous: Option<RendezvousConfig>,
}

impl ApplicationConfig {
    pub fn construct_from_path(
        path: &std::path::PathBuf,
    ) -> Result<ApplicationConfig, errors::ApplicationConfigError> {
        let string =
            std::fs::read_to_string(path).map_err(|error| errors::ApplicationConfigError::Io {
                source: error,
                path: path.clone(),
            })?;

        let config: ApplicationConfig =
            toml::from_str(&string).map_err(|error| errors::ApplicationConfigError::Parse {
                source: error,
                path: path.clone(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), errors::ApplicationConfigError> {
        let reporting = &self.reporting;
        if reporting.max_interval_seconds == 0 {
            return Err(errors::ApplicationConfigError::Validation(String::from(
                "reporting.max_interval_seconds must be greater than zero",
            )));
        }
        if reporting.interval_seconds > reporting.max_interval_seconds {
            return Err(errors::ApplicationConfigError::Validation(format!(
                "reporting.interval_seconds ({0}) exceeds reporting.max_interval_seconds ({1})",
                reporting.interval_seconds, reporting.max_interval_seconds
            )));
        }
        if reporting.min_distance_meters.is_nan() || reporting.min_distance_meters < 0.0 {
            return Err(errors::ApplicationConfigError::Validation(String::from(
                "reporting.min_distance_meters must be a non-negative number",
            )));
        }
        reporting
            .device_id()
            .map_err(|error| errors::ApplicationConfigError::Validation(error.to_string()))?;
        Ok(())
    }
}

#[derive(serde::Deserialize, Debug, PartialEq)]
pub struct GpsdConfig {
    #[serde(default = "default_gpsd_host")]
    pub host: String,
    #[serde(default = "default_gpsd_port")]
    pub port: u16,
    #[serde(default = "default_reconnect_delay_seconds")]
    pub reconnect_delay_seconds: u64,
}

impl Default for GpsdConfig {
    fn default() -> Self {
        GpsdConfig {
            host: default_gpsd_host(),
            port: default_gpsd_port(),
            reconnect_delay_seconds: default_reconnect_delay_seconds(),
        }
    }
}

impl GpsdConfig {
    #[must_use]
    pub fn reconnect_delay(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.reconnect_delay_seconds)
    }
}

fn default_gpsd_host() -> String {
    String::from("localhost")
}
fn default_gpsd_port() -> u16 {
    2947
}
fn default_reconnect_delay_seconds() -> u64 {
    30
}

#[derive(serde::Deserialize, Debug, PartialEq)]
pub struct ReportingConfig {
    pub interval_seconds: u32,
    pub max_interval_seconds: u32,
    pub min_distance_meters: f64,
    pub device_id: String,
}

impl ReportingConfig {
    #[must_use]
    pub fn throttle_policy(&self) -> ThrottlePolicy {
        ThrottlePolicy {
            report_interval: chrono::TimeDelta::seconds(self.interval_seconds.into()),
            max_report_interval: chrono::TimeDelta::seconds(self.max_interval_seconds.into()),
            min_distance_meters: self.min_distance_meters,
        }
    }

    pub fn device_id(&self) -> Result<DeviceId, crate::types::DeviceIdError> {
        DeviceId::new(&self.device_id)
    }
}

#[derive(serde::Deserialize, Debug, PartialEq)]
pub struct DestinationConfig {
    pub host: String,
    pub port: u16,
}

#[derive(serde::Deserialize, Debug, PartialEq)]
pub struct RendezvousConfig {
    pub path: std::path::PathBuf,
}

pub mod errors {

    #[derive(Debug)]
    pub enum ApplicationConfigError {
        Parse {
            source: toml::de::Error,
            path: std::path::PathBuf,
        },
        Io {
            source: std::io::Error,
            path: std::path::PathBuf,
        },
        Validation(String),
    }
    impl std::fmt::Display for ApplicationConfigError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                ApplicationConfigError::Io {
                    source: error,
                    path,
                } => {
                    write!(
                        f,
                        "Failed to read config file '{}': {}",
                        path.display(),
                        error
                    )
                }
                ApplicationConfigError::Parse {
                    source: error,
                    path,
                } => {
                    write!(
                        f,
                        "Failed to parse config file '{}': {}",
                        path.display(),
                        error
                    )
                }
                ApplicationConfigError::Validation(message) => {
                    write!(f, "Invalid configuration: {message}")
                }
            }
        }
    }
    impl std::error::Error for ApplicationConfigError {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            match self {
                ApplicationConfigError::Io { source: error, .. } => Some(error),
                ApplicationConfigError::Parse { source: error, .. } => Some(error),
                ApplicationConfigError::Validation(_) => None,
            }
        }
    }
}
