use crate::{BookingError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

const DEFAULT_ROWS: [&str; 8] = ["A", "B", "C", "D", "E", "F", "G", "H"];
const DEFAULT_SEATS_PER_ROW: u32 = 12;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum SeatZone {
    Standard,
    Premium,
}

impl SeatZone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Premium => "premium",
        }
    }
}

impl fmt::Display for SeatZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SeatStatus {
    #[default]
    Available,
    Reserved,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Seat {
    pub row: String,
    pub number: u32,
    pub zone: SeatZone,
    pub status: SeatStatus,
}

impl Seat {
    pub fn code(&self) -> String {
        seat_code(&self.row, self.number)
    }

    pub fn is_available(&self) -> bool {
        self.status == SeatStatus::Available
    }
}

pub fn seat_code(row: &str, number: u32) -> String {
    format!("{}{}", row, number)
}

/// Physical layout of a screen. Missing fields fall back to an 8x12 room
/// with no premium rows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScreenConfig {
    #[serde(default = "default_rows")]
    pub rows: Vec<String>,
    #[serde(default = "default_seats_per_row")]
    pub seats_per_row: u32,
    #[serde(default)]
    pub premium_rows: Vec<String>,
}

fn default_rows() -> Vec<String> {
    DEFAULT_ROWS.iter().map(|r| r.to_string()).collect()
}

fn default_seats_per_row() -> u32 {
    DEFAULT_SEATS_PER_ROW
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            seats_per_row: DEFAULT_SEATS_PER_ROW,
            premium_rows: Vec::new(),
        }
    }
}

impl ScreenConfig {
    pub fn new(rows: &[&str], seats_per_row: u32, premium_rows: &[&str]) -> Self {
        Self {
            rows: rows.iter().map(|r| r.to_string()).collect(),
            seats_per_row,
            premium_rows: premium_rows.iter().map(|r| r.to_string()).collect(),
        }
    }

    /// Builds a config from compact row strings such as `"ABCDEF"` and `"AB"`,
    /// one label per character.
    pub fn from_row_letters(rows: &str, seats_per_row: u32, premium_rows: &str) -> Self {
        Self {
            rows: rows.chars().filter(|c| !c.is_whitespace()).map(String::from).collect(),
            seats_per_row,
            premium_rows: premium_rows
                .chars()
                .filter(|c| !c.is_whitespace())
                .map(String::from)
                .collect(),
        }
    }
}

/// Seat inventory of a single showtime, keyed by seat code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct SeatMap {
    seats: BTreeMap<String, Seat>,
}

impl SeatMap {
    /// Builds the full grid for `config`; every seat starts available.
    pub fn initialize(config: &ScreenConfig) -> Self {
        let rows = if config.rows.is_empty() {
            default_rows()
        } else {
            config.rows.clone()
        };
        let premium: BTreeSet<&str> = config.premium_rows.iter().map(String::as_str).collect();

        let mut seats = BTreeMap::new();
        for row in &rows {
            let zone = if premium.contains(row.as_str()) {
                SeatZone::Premium
            } else {
                SeatZone::Standard
            };
            for number in 1..=config.seats_per_row {
                let seat = Seat {
                    row: row.clone(),
                    number,
                    zone,
                    status: SeatStatus::Available,
                };
                seats.insert(seat.code(), seat);
            }
        }

        Self { seats }
    }

    pub fn get(&self, code: &str) -> Option<&Seat> {
        self.seats.get(code)
    }

    pub fn zone_of(&self, code: &str) -> Option<SeatZone> {
        self.seats.get(code).map(|seat| seat.zone)
    }

    /// Unknown codes are reported as unavailable.
    pub fn is_available(&self, code: &str) -> bool {
        self.seats.get(code).is_some_and(Seat::is_available)
    }

    pub fn reserve(&mut self, code: &str) -> Result<()> {
        match self.seats.get_mut(code) {
            Some(seat) if seat.is_available() => {
                seat.status = SeatStatus::Reserved;
                Ok(())
            }
            _ => Err(BookingError::InvalidSeat(code.to_string())),
        }
    }

    /// Releasing an unknown code is a no-op.
    pub fn release(&mut self, code: &str) {
        if let Some(seat) = self.seats.get_mut(code) {
            seat.status = SeatStatus::Available;
        }
    }

    pub fn render(&self) -> String {
        let mut rows: BTreeMap<&str, BTreeMap<u32, SeatStatus>> = BTreeMap::new();
        for seat in self.seats.values() {
            rows.entry(seat.row.as_str())
                .or_default()
                .insert(seat.number, seat.status);
        }

        rows.into_iter()
            .map(|(row, seats)| {
                let markers: Vec<&str> = seats
                    .values()
                    .map(|status| match status {
                        SeatStatus::Available => "O",
                        SeatStatus::Reserved => "X",
                    })
                    .collect();
                format!("{}: {}", row, markers.join(" "))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn seats(&self) -> impl Iterator<Item = &Seat> {
        self.seats.values()
    }

    pub fn reserved_codes(&self) -> BTreeSet<String> {
        self.seats
            .iter()
            .filter(|(_, seat)| seat.status == SeatStatus::Reserved)
            .map(|(code, _)| code.clone())
            .collect()
    }

    pub fn reserved_count(&self) -> usize {
        self.seats.values().filter(|seat| !seat.is_available()).count()
    }

    pub fn len(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_map() -> SeatMap {
        SeatMap::initialize(&ScreenConfig::new(&["A", "B"], 3, &["A"]))
    }

    #[test]
    fn test_initialize_builds_cross_product() {
        let map = small_map();
        assert_eq!(map.len(), 6);
        for code in ["A1", "A2", "A3", "B1", "B2", "B3"] {
            assert!(map.is_available(code), "{} should be available", code);
        }
        assert_eq!(map.zone_of("A2"), Some(SeatZone::Premium));
        assert_eq!(map.zone_of("B2"), Some(SeatZone::Standard));
        assert!(map.get("A4").is_none());
    }

    #[test]
    fn test_initialize_defaults() {
        let config: ScreenConfig = serde_json::from_str("{}").unwrap();
        let map = SeatMap::initialize(&config);
        assert_eq!(map.len(), 96);
        assert!(map.is_available("H12"));
        assert!(map.seats().all(|seat| seat.zone == SeatZone::Standard));

        let empty_rows = ScreenConfig::new(&[], 2, &[]);
        assert_eq!(SeatMap::initialize(&empty_rows).len(), 16);
    }

    #[test]
    fn test_reserve_and_release() {
        let mut map = small_map();
        map.reserve("A1").unwrap();
        assert!(!map.is_available("A1"));

        let err = map.reserve("A1").unwrap_err();
        assert!(matches!(err, BookingError::InvalidSeat(code) if code == "A1"));

        let err = map.reserve("Z9").unwrap_err();
        assert!(matches!(err, BookingError::InvalidSeat(code) if code == "Z9"));

        map.release("A1");
        assert!(map.is_available("A1"));

        // unknown codes are ignored
        map.release("Z9");
        assert_eq!(map, small_map());
    }

    #[test]
    fn test_unknown_code_is_unavailable() {
        let map = small_map();
        assert!(!map.is_available("Z9"));
        assert!(!map.is_available(""));
    }

    #[test]
    fn test_render_sorted_and_stable() {
        let mut map = SeatMap::initialize(&ScreenConfig::new(&["B", "A"], 10, &[]));
        map.reserve("A2").unwrap();
        map.reserve("B10").unwrap();

        let rendered = map.render();
        assert_eq!(
            rendered,
            "A: O X O O O O O O O O\nB: O O O O O O O O O X"
        );
        assert_eq!(rendered, map.render());
    }

    #[test]
    fn test_reserved_codes() {
        let mut map = small_map();
        map.reserve("B3").unwrap();
        map.reserve("A1").unwrap();
        let reserved: Vec<String> = map.reserved_codes().into_iter().collect();
        assert_eq!(reserved, vec!["A1".to_string(), "B3".to_string()]);
        assert_eq!(map.reserved_count(), 2);
    }

    #[test]
    fn test_serializes_as_code_map() {
        let map = SeatMap::initialize(&ScreenConfig::new(&["A"], 1, &["A"]));
        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "A1": {"row": "A", "number": 1, "zone": "premium", "status": "available"}
            })
        );
        let back: SeatMap = serde_json::from_value(json).unwrap();
        assert_eq!(back, map);
    }
}
