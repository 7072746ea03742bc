use crate::catalog::{self, NewMovie, NewShowtime, ShowtimeFilter, ShowtimeUpdate};
use crate::config::AppConfig;
use crate::domain::{
    generate_id, list_customer_bookings, Booking, CreateBooking, Movie, SeatMap, Showtime,
};
use crate::metrics::Metrics;
use crate::pricing::{calculate_total, DEFAULT_TAX_RATE};
use crate::storage::LedgerState;
use crate::{BookingError, Result};
use chrono::{Duration, Local, NaiveDateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSettings {
    pub tax_rate: Decimal,
    pub cancellation_window_min: i64,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            tax_rate: DEFAULT_TAX_RATE,
            cancellation_window_min: crate::config::DEFAULT_CANCELLATION_WINDOW_MIN,
        }
    }
}

impl From<&AppConfig> for LedgerSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            tax_rate: config.tax_rate,
            cancellation_window_min: config.cancellation_window_min,
        }
    }
}

/// Result of a cancellation request. Refusals are expected outcomes, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    NotFound,
    AlreadyCancelled,
    WithinWindow { window_min: i64 },
}

impl CancelOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn into_parts(self) -> (bool, String) {
        (self.is_success(), self.message())
    }
}

impl fmt::Display for CancelOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "Booking cancelled"),
            Self::NotFound => write!(f, "Booking not found"),
            Self::AlreadyCancelled => write!(f, "Booking already cancelled"),
            Self::WithinWindow { window_min } => {
                write!(f, "cannot cancel within {} minutes of showtime", window_min)
            }
        }
    }
}

/// Sole owner of catalog, seat inventory and bookings.
///
/// Every seat map lives behind its own mutex in a keyed lock map, so all seat
/// mutation is serialized per showtime while different showtimes proceed
/// independently. Lock order is always seat map first, then the bookings
/// list; readers that need both follow the same order.
pub struct BookingLedger {
    movies: RwLock<Vec<Movie>>,
    showtimes: RwLock<Vec<Showtime>>,
    seat_maps: DashMap<String, Arc<Mutex<SeatMap>>>,
    bookings: RwLock<Vec<Booking>>,
    settings: LedgerSettings,
    metrics: Metrics,
}

impl BookingLedger {
    pub fn new(settings: LedgerSettings) -> Result<Self> {
        Self::from_state(LedgerState::default(), settings)
    }

    /// Takes ownership of previously persisted state. Seat maps are used as
    /// given; see [`BookingLedger::ensure_seat_maps`].
    pub fn from_state(state: LedgerState, settings: LedgerSettings) -> Result<Self> {
        let metrics = Metrics::new()?;
        metrics.set_active_bookings(state.bookings.iter().filter(|b| b.is_active()).count());

        let seat_maps = DashMap::new();
        for (showtime_id, seat_map) in state.seat_maps {
            seat_maps.insert(showtime_id, Arc::new(Mutex::new(seat_map)));
        }

        Ok(Self {
            movies: RwLock::new(state.movies),
            showtimes: RwLock::new(state.showtimes),
            seat_maps,
            bookings: RwLock::new(state.bookings),
            settings,
            metrics,
        })
    }

    pub fn settings(&self) -> LedgerSettings {
        self.settings
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Consistent copy of the whole ledger: every seat map is locked before
    /// the bookings are read.
    pub fn snapshot(&self) -> LedgerState {
        let movies = read(&self.movies).clone();
        let showtimes = read(&self.showtimes).clone();

        let mut handles: Vec<(String, Arc<Mutex<SeatMap>>)> = self
            .seat_maps
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        handles.sort_by(|a, b| a.0.cmp(&b.0));

        let guards: Vec<(&String, MutexGuard<'_, SeatMap>)> =
            handles.iter().map(|(id, handle)| (id, lock(handle))).collect();
        let bookings = read(&self.bookings).clone();
        let seat_maps: BTreeMap<String, SeatMap> = guards
            .iter()
            .map(|(id, guard)| ((*id).clone(), (**guard).clone()))
            .collect();

        LedgerState {
            movies,
            showtimes,
            seat_maps,
            bookings,
        }
    }

    // Catalog

    pub fn add_movie(&self, new: NewMovie) -> Movie {
        let movie = catalog::add_movie(&mut write(&self.movies), new);
        info!(movie_id = %movie.id, "Added movie: {}", movie.title);
        movie
    }

    pub fn movies(&self) -> Vec<Movie> {
        read(&self.movies).clone()
    }

    pub fn movie(&self, movie_id: &str) -> Option<Movie> {
        read(&self.movies).iter().find(|m| m.id == movie_id).cloned()
    }

    /// Schedules a showtime and builds its seat map.
    pub fn schedule_showtime(&self, new: NewShowtime) -> Showtime {
        let showtime = catalog::schedule_showtime(&mut write(&self.showtimes), new);
        self.seat_maps.insert(
            showtime.id.clone(),
            Arc::new(Mutex::new(SeatMap::initialize(&showtime.screen_config))),
        );
        info!(showtime_id = %showtime.id, movie_id = %showtime.movie_id, "Scheduled showtime");
        showtime
    }

    pub fn showtimes(&self) -> Vec<Showtime> {
        read(&self.showtimes).clone()
    }

    pub fn showtime(&self, showtime_id: &str) -> Option<Showtime> {
        read(&self.showtimes).iter().find(|s| s.id == showtime_id).cloned()
    }

    pub fn list_showtimes(&self, filter: &ShowtimeFilter) -> Vec<Showtime> {
        catalog::list_showtimes(&read(&self.showtimes), filter)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Issued bookings keep their snapshot of the old values.
    pub fn update_showtime(&self, showtime_id: &str, update: ShowtimeUpdate) -> Option<Showtime> {
        let updated = catalog::update_showtime(&mut write(&self.showtimes), showtime_id, update);
        if updated.is_some() {
            info!(showtime_id, "Updated showtime");
        }
        updated
    }

    // Seat inventory

    /// Rebuilds the seat map from the showtime's screen config, discarding
    /// every reservation on it.
    pub fn rebuild_seat_map(&self, showtime_id: &str) -> Result<()> {
        let showtime = self
            .showtime(showtime_id)
            .ok_or_else(|| BookingError::NotFound("Showtime not found".to_string()))?;
        let fresh = SeatMap::initialize(&showtime.screen_config);

        match self.seat_map_handle(showtime_id) {
            Some(handle) => {
                *lock(&handle) = fresh;
            }
            None => {
                self.seat_maps
                    .insert(showtime_id.to_string(), Arc::new(Mutex::new(fresh)));
            }
        }

        warn!(showtime_id, "Seat map rebuilt, existing reservations discarded");
        Ok(())
    }

    /// Builds seat maps for showtimes that have none. Returns how many were created.
    pub fn ensure_seat_maps(&self) -> usize {
        let showtimes = read(&self.showtimes);
        let mut created = 0;
        for showtime in showtimes.iter() {
            self.seat_maps.entry(showtime.id.clone()).or_insert_with(|| {
                created += 1;
                Arc::new(Mutex::new(SeatMap::initialize(&showtime.screen_config)))
            });
        }
        if created > 0 {
            info!("Generated {} missing seat maps", created);
        }
        created
    }

    pub fn seat_map(&self, showtime_id: &str) -> Option<SeatMap> {
        let handle = self.seat_map_handle(showtime_id)?;
        let seat_map = lock(&handle).clone();
        Some(seat_map)
    }

    pub fn render_seat_map(&self, showtime_id: &str) -> Option<String> {
        let handle = self.seat_map_handle(showtime_id)?;
        let rendered = lock(&handle).render();
        Some(rendered)
    }

    pub fn is_seat_available(&self, showtime_id: &str, seat_code: &str) -> bool {
        let Some(handle) = self.seat_map_handle(showtime_id) else {
            return false;
        };
        let available = lock(&handle).is_available(seat_code);
        available
    }

    // Bookings

    /// Reserves the requested seats and records a booking.
    ///
    /// Every seat is checked before any is reserved; on error nothing has
    /// changed. The showtime's seat map stays locked until the booking is
    /// appended, so no reader sees reserved seats without their booking.
    pub fn create_booking(&self, request: CreateBooking) -> Result<Booking> {
        let result = self.try_create_booking(request);
        match &result {
            Ok(booking) => {
                self.metrics.record_booking_attempt(true, booking.seats.len());
                info!(
                    booking_id = %booking.id,
                    showtime_id = %booking.showtime_id,
                    seats = ?booking.seats,
                    total = %booking.pricing.total,
                    "Booking created"
                );
            }
            Err(e) => {
                self.metrics.record_booking_attempt(false, 0);
                debug!("Booking rejected: {}", e);
            }
        }
        result
    }

    fn try_create_booking(&self, request: CreateBooking) -> Result<Booking> {
        let showtime = self
            .showtime(&request.showtime_id)
            .ok_or_else(|| BookingError::NotFound("Showtime not found".to_string()))?;
        let handle = self
            .seat_map_handle(&showtime.id)
            .ok_or_else(|| BookingError::NotFound("Seat map missing".to_string()))?;

        if request.seats.is_empty() {
            return Err(BookingError::Validation(
                "at least one seat must be requested".to_string(),
            ));
        }

        let mut seat_map = lock(&handle);

        // a seat listed twice counts as unavailable the second time
        let unavailable: Vec<String> = {
            let mut seen = HashSet::new();
            request
                .seats
                .iter()
                .filter(|code| !seen.insert(code.as_str()) || !seat_map.is_available(code))
                .cloned()
                .collect()
        };
        if !unavailable.is_empty() {
            return Err(BookingError::SeatUnavailable(unavailable));
        }

        // zones never change, so the price is fixed before anything is reserved
        let pricing = calculate_total(
            &request.seats,
            &showtime.pricing,
            self.settings.tax_rate,
            &request.discounts,
            Some(&*seat_map),
        );

        let mut bookings = write(&self.bookings);
        let booking_id = request.id.clone().unwrap_or_else(|| generate_id(10));
        if bookings.iter().any(|b| b.id == booking_id) {
            return Err(BookingError::Validation(format!(
                "booking id {} already exists",
                booking_id
            )));
        }

        for code in &request.seats {
            seat_map.reserve(code)?;
        }

        let booking = Booking::new(
            CreateBooking {
                id: Some(booking_id),
                ..request
            },
            &showtime,
            pricing,
        );
        bookings.push(booking.clone());
        Ok(booking)
    }

    /// Cancels against the local clock and the configured window.
    pub fn cancel_booking(&self, booking_id: &str) -> CancelOutcome {
        self.cancel_booking_at(
            booking_id,
            Local::now().naive_local(),
            self.settings.cancellation_window_min,
        )
    }

    /// Cancels a booking unless the showtime starts less than
    /// `cancellation_window_min` minutes after `now` (or has started).
    pub fn cancel_booking_at(
        &self,
        booking_id: &str,
        now: NaiveDateTime,
        cancellation_window_min: i64,
    ) -> CancelOutcome {
        let outcome = self.try_cancel_booking(booking_id, now, cancellation_window_min);
        match &outcome {
            CancelOutcome::Cancelled => info!(booking_id, "Booking cancelled"),
            other => debug!(booking_id, "Cancellation refused: {}", other),
        }
        outcome
    }

    fn try_cancel_booking(
        &self,
        booking_id: &str,
        now: NaiveDateTime,
        cancellation_window_min: i64,
    ) -> CancelOutcome {
        let (showtime_id, snapshot_time) = {
            let bookings = read(&self.bookings);
            match bookings.iter().find(|b| b.id == booking_id) {
                None => return self.refuse(CancelOutcome::NotFound),
                Some(b) if !b.is_active() => return self.refuse(CancelOutcome::AlreadyCancelled),
                Some(b) => (b.showtime_id.clone(), b.showtime_snapshot.datetime),
            }
        };

        let starts_at = self
            .showtime(&showtime_id)
            .map(|s| s.datetime)
            .unwrap_or(snapshot_time);
        // a window too large to represent covers every showtime
        let within_window = match Duration::try_minutes(cancellation_window_min) {
            Some(window) => starts_at - now < window,
            None => true,
        };
        if within_window {
            return self.refuse(CancelOutcome::WithinWindow {
                window_min: cancellation_window_min,
            });
        }

        let handle = self.seat_map_handle(&showtime_id);
        let mut seat_map = handle.as_ref().map(|h| lock(h));
        let mut bookings = write(&self.bookings);

        let Some(booking) = bookings.iter_mut().find(|b| b.id == booking_id) else {
            return self.refuse(CancelOutcome::NotFound);
        };
        if !booking.is_active() {
            return self.refuse(CancelOutcome::AlreadyCancelled);
        }

        match seat_map.as_mut() {
            Some(map) => {
                for code in &booking.seats {
                    map.release(code);
                }
            }
            None => warn!(
                booking_id,
                showtime_id = %showtime_id,
                "Seat map missing, cancelling without releasing seats"
            ),
        }
        booking.cancel(Utc::now());

        self.metrics.record_cancellation(true, booking.seats.len());
        CancelOutcome::Cancelled
    }

    fn refuse(&self, outcome: CancelOutcome) -> CancelOutcome {
        self.metrics.record_cancellation(false, 0);
        outcome
    }

    pub fn booking(&self, booking_id: &str) -> Option<Booking> {
        read(&self.bookings).iter().find(|b| b.id == booking_id).cloned()
    }

    pub fn bookings(&self) -> Vec<Booking> {
        read(&self.bookings).clone()
    }

    pub fn customer_bookings(&self, email: &str) -> Vec<Booking> {
        list_customer_bookings(&read(&self.bookings), email)
            .into_iter()
            .cloned()
            .collect()
    }

    fn seat_map_handle(&self, showtime_id: &str) -> Option<Arc<Mutex<SeatMap>>> {
        self.seat_maps
            .get(showtime_id)
            .map(|entry| Arc::clone(entry.value()))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{parse_showtime_datetime, Customer, PriceTable, ScreenConfig};
    use crate::pricing::Discount;
    use rust_decimal_macros::dec;

    fn ledger() -> BookingLedger {
        let ledger = BookingLedger::new(LedgerSettings::default()).unwrap();
        ledger.schedule_showtime(NewShowtime {
            id: Some("ST-TST".to_string()),
            movie_id: "MV001".to_string(),
            screen: Some("Screen 1".to_string()),
            datetime: Some(parse_showtime_datetime("2026-01-07 19:30").unwrap()),
            language: Some("OV".to_string()),
            pricing: Some(PriceTable::new(dec!(10.0), dec!(14.0))),
            screen_config: Some(ScreenConfig::new(&["A", "B"], 3, &["A"])),
        });
        ledger
    }

    fn request(seats: &[&str]) -> CreateBooking {
        CreateBooking::new("ST-TST", seats, Customer::new("Test", "a@test.com", ""))
    }

    fn before_showtime(minutes: i64) -> NaiveDateTime {
        parse_showtime_datetime("2026-01-07 19:30").unwrap() - Duration::minutes(minutes)
    }

    fn assert_seats_match_active_bookings(ledger: &BookingLedger) {
        let state = ledger.snapshot();
        for showtime in &state.showtimes {
            let reserved = state.seat_maps[&showtime.id].reserved_codes();
            let mut held = std::collections::BTreeSet::new();
            for booking in state
                .bookings
                .iter()
                .filter(|b| b.is_active() && b.showtime_id == showtime.id)
            {
                for seat in &booking.seats {
                    assert!(held.insert(seat.clone()), "{} held twice", seat);
                }
            }
            assert_eq!(reserved, held);
        }
    }

    #[test]
    fn test_create_booking_reserves_and_prices() {
        let ledger = ledger();
        let booking = ledger.create_booking(request(&["A1", "B1"])).unwrap();

        assert_eq!(booking.showtime_id, "ST-TST");
        assert_eq!(booking.pricing.subtotal, dec!(24));
        assert_eq!(booking.pricing.tax, dec!(1.92));
        assert_eq!(booking.pricing.total, dec!(25.92));
        assert_eq!(booking.showtime_snapshot.screen, "Screen 1");
        assert!(!ledger.is_seat_available("ST-TST", "A1"));
        assert!(!ledger.is_seat_available("ST-TST", "B1"));
        assert_eq!(ledger.bookings(), vec![booking]);
        assert_seats_match_active_bookings(&ledger);
    }

    #[test]
    fn test_create_booking_applies_discounts() {
        let ledger = ledger();
        let booking = ledger
            .create_booking(request(&["B1", "B2"]).with_discounts(vec![Discount::flat(dec!(5))]))
            .unwrap();
        assert_eq!(booking.pricing.discount, dec!(5));
        assert_eq!(booking.pricing.tax, dec!(1.2));
        assert_eq!(booking.pricing.total, dec!(16.2));
    }

    #[test]
    fn test_double_booking_blocked() {
        let ledger = ledger();
        ledger.create_booking(request(&["A1"])).unwrap();
        let before = ledger.seat_map("ST-TST").unwrap();

        let err = ledger.create_booking(request(&["A2", "A1"])).unwrap_err();
        assert!(matches!(&err, BookingError::SeatUnavailable(seats) if seats == &vec!["A1".to_string()]));
        assert_eq!(ledger.seat_map("ST-TST").unwrap(), before);
        assert_eq!(ledger.bookings().len(), 1);
        assert_seats_match_active_bookings(&ledger);
    }

    #[test]
    fn test_all_offending_seats_reported() {
        let ledger = ledger();
        ledger.create_booking(request(&["B2"])).unwrap();

        let err = ledger
            .create_booking(request(&["A1", "Z9", "B2", "A1"]))
            .unwrap_err();
        match err {
            BookingError::SeatUnavailable(seats) => assert_eq!(seats, vec!["Z9", "B2", "A1"]),
            other => panic!("unexpected error: {}", other),
        }
        assert!(ledger.is_seat_available("ST-TST", "A1"));
    }

    #[test]
    fn test_unknown_showtime_and_missing_seat_map() {
        let ledger = ledger();
        let mut req = request(&["A1"]);
        req.showtime_id = "nope".to_string();
        let err = ledger.create_booking(req).unwrap_err();
        assert!(matches!(err, BookingError::NotFound(msg) if msg == "Showtime not found"));

        let mut state = ledger.snapshot();
        state.seat_maps.clear();
        let bare = BookingLedger::from_state(state, LedgerSettings::default()).unwrap();
        let err = bare.create_booking(request(&["A1"])).unwrap_err();
        assert!(matches!(err, BookingError::NotFound(msg) if msg == "Seat map missing"));

        assert_eq!(bare.ensure_seat_maps(), 1);
        assert_eq!(bare.ensure_seat_maps(), 0);
        assert!(bare.create_booking(request(&["A1"])).is_ok());
    }

    #[test]
    fn test_empty_seat_list_rejected() {
        let ledger = ledger();
        let err = ledger.create_booking(request(&[])).unwrap_err();
        assert!(matches!(err, BookingError::Validation(_)));
        assert!(ledger.bookings().is_empty());
    }

    #[test]
    fn test_extreme_discounts_and_prices_do_not_break_booking() {
        let ledger = ledger();
        let booking = ledger
            .create_booking(
                request(&["A1", "A2"]).with_discounts(vec![Discount::percent(Decimal::MAX)]),
            )
            .unwrap();
        assert_eq!(booking.pricing.discount, booking.pricing.subtotal);
        assert_eq!(booking.pricing.total, Decimal::ZERO);

        ledger.schedule_showtime(NewShowtime {
            id: Some("ST-MAX".to_string()),
            pricing: Some(PriceTable::new(Decimal::MAX, Decimal::MAX)),
            screen_config: Some(ScreenConfig::new(&["A"], 2, &[])),
            ..NewShowtime::for_movie("MV001")
        });
        let booking = ledger
            .create_booking(CreateBooking::new(
                "ST-MAX",
                &["A1", "A2"],
                Customer::new("Test", "a@test.com", ""),
            ))
            .unwrap();
        assert_eq!(booking.pricing.total, Decimal::MAX);

        assert_eq!(ledger.bookings().len(), 2);
        assert_seats_match_active_bookings(&ledger);
    }

    #[test]
    fn test_duplicate_booking_id_rejected() {
        let ledger = ledger();
        let mut first = request(&["A1"]);
        first.id = Some("DUP".to_string());
        ledger.create_booking(first).unwrap();

        let mut second = request(&["A2"]);
        second.id = Some("DUP".to_string());
        let err = ledger.create_booking(second).unwrap_err();
        assert!(matches!(err, BookingError::Validation(msg) if msg.contains("DUP")));
        assert!(ledger.is_seat_available("ST-TST", "A2"));
        assert_eq!(ledger.bookings().len(), 1);
        assert_seats_match_active_bookings(&ledger);

        assert!(ledger.cancel_booking_at("DUP", before_showtime(60), 30).is_success());
        assert!(ledger.is_seat_available("ST-TST", "A1"));
    }

    #[test]
    fn test_cancel_releases_only_its_seats() {
        let ledger = ledger();
        let keep = ledger.create_booking(request(&["A1"])).unwrap();
        let cancel = ledger.create_booking(request(&["A2", "A3"])).unwrap();

        let outcome = ledger.cancel_booking_at(&cancel.id, before_showtime(120), 30);
        assert_eq!(outcome, CancelOutcome::Cancelled);
        assert!(ledger.is_seat_available("ST-TST", "A2"));
        assert!(ledger.is_seat_available("ST-TST", "A3"));
        assert!(!ledger.is_seat_available("ST-TST", "A1"));

        let cancelled = ledger.booking(&cancel.id).unwrap();
        assert!(!cancelled.is_active());
        assert!(cancelled.cancelled_at.is_some());
        assert!(ledger.booking(&keep.id).unwrap().is_active());

        let again = ledger.cancel_booking_at(&cancel.id, before_showtime(120), 30);
        assert_eq!(again, CancelOutcome::AlreadyCancelled);
        assert!(!again.is_success());
        assert_seats_match_active_bookings(&ledger);
    }

    #[test]
    fn test_cancel_unknown_booking() {
        let ledger = ledger();
        let (success, message) = ledger
            .cancel_booking_at("missing", before_showtime(120), 30)
            .into_parts();
        assert!(!success);
        assert_eq!(message, "Booking not found");
    }

    #[test]
    fn test_cancellation_window() {
        let ledger = ledger();
        let booking = ledger.create_booking(request(&["A1"])).unwrap();

        let outcome = ledger.cancel_booking_at(&booking.id, before_showtime(10), 30);
        assert_eq!(outcome, CancelOutcome::WithinWindow { window_min: 30 });
        assert!(outcome.message().contains("30 minutes"));
        assert!(!ledger.is_seat_available("ST-TST", "A1"));

        // already started
        let outcome = ledger.cancel_booking_at(&booking.id, before_showtime(-5), 0);
        assert!(!outcome.is_success());

        // exactly on the cutoff is allowed
        let outcome = ledger.cancel_booking_at(&booking.id, before_showtime(30), 30);
        assert!(outcome.is_success());
    }

    #[test]
    fn test_unrepresentable_window_refuses() {
        let ledger = ledger();
        let booking = ledger.create_booking(request(&["A1"])).unwrap();

        let outcome = ledger.cancel_booking_at(&booking.id, before_showtime(120), i64::MAX);
        assert_eq!(outcome, CancelOutcome::WithinWindow { window_min: i64::MAX });
        assert!(!ledger.is_seat_available("ST-TST", "A1"));
        assert!(ledger.booking(&booking.id).unwrap().is_active());
    }

    #[test]
    fn test_cancellation_window_follows_rescheduled_showtime() {
        let ledger = ledger();
        let booking = ledger.create_booking(request(&["A1"])).unwrap();
        ledger
            .update_showtime(
                "ST-TST",
                ShowtimeUpdate {
                    datetime: Some(parse_showtime_datetime("2026-01-07 21:30").unwrap()),
                    ..ShowtimeUpdate::default()
                },
            )
            .unwrap();

        // 10 minutes before the original time, two hours before the new one
        let outcome = ledger.cancel_booking_at(&booking.id, before_showtime(10), 30);
        assert!(outcome.is_success());
        assert_eq!(
            ledger.booking(&booking.id).unwrap().showtime_snapshot.datetime,
            parse_showtime_datetime("2026-01-07 19:30").unwrap()
        );
    }

    #[test]
    fn test_cancel_after_rebuild() {
        let ledger = ledger();
        let booking = ledger.create_booking(request(&["A1"])).unwrap();
        ledger.rebuild_seat_map("ST-TST").unwrap();
        assert!(ledger.is_seat_available("ST-TST", "A1"));

        assert!(ledger.cancel_booking_at(&booking.id, before_showtime(60), 30).is_success());
        assert_eq!(
            ledger.seat_map("ST-TST").unwrap(),
            SeatMap::initialize(&ScreenConfig::new(&["A", "B"], 3, &["A"]))
        );
        assert!(matches!(
            ledger.rebuild_seat_map("missing"),
            Err(BookingError::NotFound(_))
        ));
    }

    #[test]
    fn test_create_then_cancel_restores_seat_map() {
        let ledger = ledger();
        let pristine = ledger.seat_map("ST-TST").unwrap();
        let booking = ledger.create_booking(request(&["A1", "A2", "B3"])).unwrap();
        assert!(ledger.cancel_booking_at(&booking.id, before_showtime(60), 30).is_success());
        assert_eq!(ledger.seat_map("ST-TST").unwrap(), pristine);
    }

    #[test]
    fn test_customer_bookings() {
        let ledger = ledger();
        let first = ledger.create_booking(request(&["A1"])).unwrap();
        let second = ledger.create_booking(request(&["A2"])).unwrap();
        ledger
            .create_booking(CreateBooking::new("ST-TST", &["A3"], Customer::new("Other", "b@test.com", "")))
            .unwrap();
        ledger.cancel_booking_at(&first.id, before_showtime(60), 30);

        let mine: Vec<String> = ledger
            .customer_bookings("a@test.com")
            .into_iter()
            .map(|b| b.id)
            .collect();
        assert_eq!(mine, vec![second.id]);
    }

    #[test]
    fn test_metrics_follow_ledger() {
        let ledger = ledger();
        let booking = ledger.create_booking(request(&["A1", "A2"])).unwrap();
        let _ = ledger.create_booking(request(&["A1"]));
        ledger.cancel_booking_at(&booking.id, before_showtime(60), 30);

        let metrics = ledger.metrics();
        assert_eq!(metrics.bookings_created.get(), 1);
        assert_eq!(metrics.bookings_rejected.get(), 1);
        assert_eq!(metrics.seats_reserved.get(), 2);
        assert_eq!(metrics.seats_released.get(), 2);
        assert_eq!(metrics.active_bookings.get(), 0);
    }

    #[test]
    fn test_snapshot_round_trips_through_from_state() {
        let ledger = ledger();
        ledger.add_movie(NewMovie {
            id: Some("MV001".to_string()),
            title: Some("Arrival".to_string()),
            ..NewMovie::default()
        });
        ledger.create_booking(request(&["B1"])).unwrap();

        let state = ledger.snapshot();
        let restored = BookingLedger::from_state(state.clone(), ledger.settings()).unwrap();
        assert_eq!(restored.snapshot(), state);
        assert_eq!(restored.metrics().active_bookings.get(), 1);
        assert!(!restored.is_seat_available("ST-TST", "B1"));
    }
}
