use crate::domain::showtime::showtime_datetime;
use crate::domain::{Booking, SeatMap, Showtime};
use crate::pricing::round_money;
use crate::storage::LedgerState;
use crate::Result;
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_TOP_MOVIES: usize = 5;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OccupancyEntry {
    pub showtime_id: String,
    pub screen: String,
    #[serde(with = "showtime_datetime")]
    pub datetime: NaiveDateTime,
    pub total_seats: usize,
    pub reserved: usize,
    /// Percentage of seats reserved, two decimals.
    pub occupancy: Decimal,
    pub bookings: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ReportPeriod {
    #[serde(with = "showtime_datetime")]
    pub start: NaiveDateTime,
    #[serde(with = "showtime_datetime")]
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RevenueSummary {
    pub total_revenue: Decimal,
    pub booking_count: usize,
    pub period: ReportPeriod,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MovieSales {
    pub movie_id: String,
    pub seats_sold: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotReport {
    pub generated_at: DateTime<Utc>,
    pub occupancy: Vec<OccupancyEntry>,
    pub revenue: RevenueSummary,
    pub top_movies: Vec<MovieSales>,
}

/// Occupancy per showtime, in schedule order.
pub fn occupancy_report(
    showtimes: &[Showtime],
    seat_maps: &BTreeMap<String, SeatMap>,
    bookings: &[Booking],
) -> Vec<OccupancyEntry> {
    let mut active_by_showtime: HashMap<&str, usize> = HashMap::new();
    for booking in bookings.iter().filter(|b| b.is_active()) {
        *active_by_showtime.entry(booking.showtime_id.as_str()).or_default() += 1;
    }

    showtimes
        .iter()
        .map(|showtime| {
            let (total_seats, reserved) = seat_maps
                .get(&showtime.id)
                .map(|map| (map.len(), map.reserved_count()))
                .unwrap_or((0, 0));
            let occupancy = if total_seats == 0 {
                Decimal::ZERO
            } else {
                round_money(
                    Decimal::from(reserved as u64) * Decimal::ONE_HUNDRED
                        / Decimal::from(total_seats as u64),
                )
            };

            OccupancyEntry {
                showtime_id: showtime.id.clone(),
                screen: showtime.screen.clone(),
                datetime: showtime.datetime,
                total_seats,
                reserved,
                occupancy,
                bookings: active_by_showtime
                    .get(showtime.id.as_str())
                    .copied()
                    .unwrap_or(0),
            }
        })
        .collect()
}

/// Revenue of active bookings whose showtime falls within `[start, end]`.
pub fn revenue_summary(
    bookings: &[Booking],
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> RevenueSummary {
    let in_period: Vec<&Booking> = bookings
        .iter()
        .filter(|b| b.is_active())
        .filter(|b| {
            let at = b.showtime_snapshot.datetime;
            start <= at && at <= end
        })
        .collect();

    RevenueSummary {
        total_revenue: round_money(in_period.iter().map(|b| b.pricing.total).sum()),
        booking_count: in_period.len(),
        period: ReportPeriod { start, end },
    }
}

/// Movies ranked by seats sold across active bookings. Ties keep the order
/// in which the movies were first seen.
pub fn top_movies(bookings: &[Booking], showtimes: &[Showtime], limit: usize) -> Vec<MovieSales> {
    let movie_by_showtime: HashMap<&str, &str> = showtimes
        .iter()
        .map(|s| (s.id.as_str(), s.movie_id.as_str()))
        .collect();

    let mut ranked: Vec<MovieSales> = Vec::new();
    for booking in bookings.iter().filter(|b| b.is_active()) {
        let Some(movie_id) = movie_by_showtime.get(booking.showtime_id.as_str()) else {
            continue;
        };
        match ranked.iter_mut().find(|entry| entry.movie_id == *movie_id) {
            Some(entry) => entry.seats_sold += booking.seats.len(),
            None => ranked.push(MovieSales {
                movie_id: movie_id.to_string(),
                seats_sold: booking.seats.len(),
            }),
        }
    }

    ranked.sort_by(|a, b| b.seats_sold.cmp(&a.seats_sold));
    ranked.truncate(limit);
    ranked
}

pub fn snapshot_report(state: &LedgerState, start: NaiveDateTime, end: NaiveDateTime) -> SnapshotReport {
    SnapshotReport {
        generated_at: Utc::now(),
        occupancy: occupancy_report(&state.showtimes, &state.seat_maps, &state.bookings),
        revenue: revenue_summary(&state.bookings, start, end),
        top_movies: top_movies(&state.bookings, &state.showtimes, DEFAULT_TOP_MOVIES),
    }
}

/// Writes `report` as pretty JSON, creating parent directories.
pub fn export_report<T, P>(report: &T, path: P) -> Result<PathBuf>
where
    T: Serialize + ?Sized,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(report)?)?;

    info!("Report exported to {:?}", path);
    Ok(path.to_path_buf())
}
