use crate::config_parser::parse_properties_file;
use crate::pricing::DEFAULT_TAX_RATE;
use crate::{BookingError, Result};
use config::{Config, Environment, File, FileFormat};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const ENV_PREFIX: &str = "BOOKING";
pub const DEFAULT_CANCELLATION_WINDOW_MIN: i64 = 30;
/// One year.
pub const MAX_CANCELLATION_WINDOW_MIN: i64 = 60 * 24 * 365;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub ticket_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub tax_rate: Decimal,
    pub cancellation_window_min: i64,
    #[serde(default)]
    pub additional_properties: HashMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            ticket_dir: PathBuf::from("tickets"),
            backup_dir: PathBuf::from("backups"),
            tax_rate: DEFAULT_TAX_RATE,
            cancellation_window_min: DEFAULT_CANCELLATION_WINDOW_MIN,
            additional_properties: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from defaults, then the optional properties file,
    /// then `BOOKING_*` environment variables.
    pub fn load(properties_path: Option<&Path>) -> Result<Self> {
        let defaults = AppConfig::default();
        let mut builder = Config::builder()
            .set_default("data_dir", defaults.data_dir.to_string_lossy().to_string())?
            .set_default("ticket_dir", defaults.ticket_dir.to_string_lossy().to_string())?
            .set_default("backup_dir", defaults.backup_dir.to_string_lossy().to_string())?
            .set_default("tax_rate", defaults.tax_rate.to_string())?
            .set_default("cancellation_window_min", defaults.cancellation_window_min)?;

        let mut additional_properties = HashMap::new();
        if let Some(path) = properties_path {
            info!("Loading config from: {:?}", path);
            let parsed = parse_properties_file(path)?;
            let settings = serde_json::Value::Object(parsed.settings).to_string();
            builder = builder.add_source(File::from_str(&settings, FileFormat::Json));
            additional_properties = parsed.additional_properties;
        }

        let mut config: AppConfig = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;
        config.additional_properties = additional_properties;
        config.validate()?;

        debug!(?config, "Configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tax_rate.is_sign_negative() {
            return Err(BookingError::Validation(format!(
                "tax rate must not be negative, got {}",
                self.tax_rate
            )));
        }
        if self.cancellation_window_min < 0 {
            return Err(BookingError::Validation(format!(
                "cancellation window must not be negative, got {}",
                self.cancellation_window_min
            )));
        }
        if self.cancellation_window_min > MAX_CANCELLATION_WINDOW_MIN {
            return Err(BookingError::Validation(format!(
                "cancellation window must be at most {} minutes, got {}",
                MAX_CANCELLATION_WINDOW_MIN, self.cancellation_window_min
            )));
        }
        Ok(())
    }
}
