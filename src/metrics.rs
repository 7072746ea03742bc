use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, IntCounter,
    IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;
use crate::Result;

/// Metrics collector for the booking ledger
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,

    pub bookings_created: IntCounter,
    pub bookings_rejected: IntCounter,
    pub bookings_cancelled: IntCounter,
    pub cancellations_refused: IntCounter,
    pub seats_reserved: IntCounter,
    pub seats_released: IntCounter,
    pub active_bookings: IntGauge,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());

        let bookings_created = register_int_counter_with_registry!(
            Opts::new("bookings_created_total", "Total number of bookings created"),
            registry
        )?;

        let bookings_rejected = register_int_counter_with_registry!(
            Opts::new("bookings_rejected_total", "Total number of booking requests rejected"),
            registry
        )?;

        let bookings_cancelled = register_int_counter_with_registry!(
            Opts::new("bookings_cancelled_total", "Total number of bookings cancelled"),
            registry
        )?;

        let cancellations_refused = register_int_counter_with_registry!(
            Opts::new("cancellations_refused_total", "Total number of refused cancellation requests"),
            registry
        )?;

        let seats_reserved = register_int_counter_with_registry!(
            Opts::new("seats_reserved_total", "Total number of seats reserved"),
            registry
        )?;

        let seats_released = register_int_counter_with_registry!(
            Opts::new("seats_released_total", "Total number of seats released"),
            registry
        )?;

        let active_bookings = register_int_gauge_with_registry!(
            Opts::new("active_bookings", "Current number of active bookings"),
            registry
        )?;

        Ok(Self {
            registry,
            bookings_created,
            bookings_rejected,
            bookings_cancelled,
            cancellations_refused,
            seats_reserved,
            seats_released,
            active_bookings,
        })
    }

    /// Export metrics in Prometheus text format
    pub fn export(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    pub fn record_booking_attempt(&self, success: bool, seats_count: usize) {
        if success {
            self.bookings_created.inc();
            self.seats_reserved.inc_by(seats_count as u64);
            self.active_bookings.inc();
        } else {
            self.bookings_rejected.inc();
        }
    }

    pub fn record_cancellation(&self, success: bool, seats_count: usize) {
        if success {
            self.bookings_cancelled.inc();
            self.seats_released.inc_by(seats_count as u64);
            self.active_bookings.dec();
        } else {
            self.cancellations_refused.inc();
        }
    }

    pub fn set_active_bookings(&self, count: usize) {
        self.active_bookings.set(count as i64);
    }
}
