use super::seat::{ScreenConfig, SeatZone};
use crate::{BookingError, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Canonical on-disk and display format for showtime date-times.
pub const SHOWTIME_FORMAT: &str = "%Y-%m-%d %H:%M";

const ACCEPTED_FORMATS: [&str; 4] = [
    SHOWTIME_FORMAT,
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Parses `YYYY-MM-DD HH:MM`, also accepting a `T` separator and seconds.
pub fn parse_showtime_datetime(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    ACCEPTED_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .ok_or_else(|| {
            BookingError::Validation(format!(
                "invalid date/time '{}', expected YYYY-MM-DD HH:MM",
                value
            ))
        })
}

pub fn format_showtime_datetime(value: &NaiveDateTime) -> String {
    value.format(SHOWTIME_FORMAT).to_string()
}

pub(crate) mod showtime_datetime {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_showtime_datetime(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_showtime_datetime(&raw).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: String,
    pub title: String,
    pub genre: String,
    pub duration_min: u32,
    pub rating: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

/// Unit price per zone name. `standard` is the fallback for every zone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct PriceTable(BTreeMap<String, Decimal>);

impl PriceTable {
    pub fn new(standard: Decimal, premium: Decimal) -> Self {
        let mut prices = BTreeMap::new();
        prices.insert(SeatZone::Standard.as_str().to_string(), standard);
        prices.insert(SeatZone::Premium.as_str().to_string(), premium);
        Self(prices)
    }

    pub fn standard_only(standard: Decimal) -> Self {
        let mut prices = BTreeMap::new();
        prices.insert(SeatZone::Standard.as_str().to_string(), standard);
        Self(prices)
    }

    pub fn get(&self, zone: &str) -> Option<Decimal> {
        self.0.get(zone).copied()
    }

    pub fn set(&mut self, zone: SeatZone, price: Decimal) {
        self.0.insert(zone.as_str().to_string(), price);
    }

    /// Zone price, falling back to `standard`, then zero.
    pub fn unit_price(&self, zone: SeatZone) -> Decimal {
        self.get(zone.as_str())
            .or_else(|| self.get(SeatZone::Standard.as_str()))
            .unwrap_or(Decimal::ZERO)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Showtime {
    pub id: String,
    pub movie_id: String,
    pub screen: String,
    #[serde(with = "showtime_datetime")]
    pub datetime: NaiveDateTime,
    pub language: String,
    pub pricing: PriceTable,
    #[serde(default)]
    pub screen_config: ScreenConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Showtime facts frozen into a booking when it is issued.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShowtimeSnapshot {
    pub movie_id: String,
    pub screen: String,
    #[serde(with = "showtime_datetime")]
    pub datetime: NaiveDateTime,
    pub language: String,
}

impl From<&Showtime> for ShowtimeSnapshot {
    fn from(showtime: &Showtime) -> Self {
        Self {
            movie_id: showtime.movie_id.clone(),
            screen: showtime.screen.clone(),
            datetime: showtime.datetime,
            language: showtime.language.clone(),
        }
    }
}
