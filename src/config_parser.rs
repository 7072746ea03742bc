use crate::Result;
use config::ConfigError;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Properties file keys and the config fields they set.
const PROPERTY_FIELDS: [(&str, &str); 5] = [
    ("data.dir", "data_dir"),
    ("ticket.dir", "ticket_dir"),
    ("backup.dir", "backup_dir"),
    ("tax.rate", "tax_rate"),
    ("cancellation.window.minutes", "cancellation_window_min"),
];

/// Properties split into recognised settings and everything else.
#[derive(Debug, Default)]
pub struct ParsedProperties {
    pub settings: serde_json::Map<String, serde_json::Value>,
    pub additional_properties: HashMap<String, String>,
}

/// Parse a Java properties file into config field overrides
pub fn parse_properties_file<P: AsRef<Path>>(path: P) -> Result<ParsedProperties> {
    let file = File::open(&path).map_err(|e| {
        ConfigError::Message(format!("Failed to open config file {:?}: {}", path.as_ref(), e))
    })?;

    let reader = BufReader::new(file);
    let properties: HashMap<String, String> = java_properties::read(reader)
        .map_err(|e| ConfigError::Message(format!("Failed to parse properties: {}", e)))?;

    Ok(split_properties(properties))
}

pub fn split_properties(properties: HashMap<String, String>) -> ParsedProperties {
    let mut parsed = ParsedProperties::default();

    for (key, value) in properties {
        match PROPERTY_FIELDS.iter().find(|(property, _)| *property == key) {
            Some((_, field)) => {
                parsed
                    .settings
                    .insert(field.to_string(), serde_json::Value::String(value.trim().to_string()));
            }
            None => {
                parsed.additional_properties.insert(key, value);
            }
        }
    }

    parsed
}
