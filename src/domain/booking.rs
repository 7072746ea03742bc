use super::showtime::{Showtime, ShowtimeSnapshot};
use crate::pricing::{Discount, PriceBreakdown};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const DEFAULT_CUSTOMER_NAME: &str = "Guest";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Customer {
    #[serde(default = "default_customer_name")]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

fn default_customer_name() -> String {
    DEFAULT_CUSTOMER_NAME.to_string()
}

impl Default for Customer {
    fn default() -> Self {
        Self {
            name: default_customer_name(),
            email: String::new(),
            phone: String::new(),
        }
    }
}

impl Customer {
    /// Blank names fall back to "Guest".
    pub fn new(name: &str, email: &str, phone: &str) -> Self {
        let name = name.trim();
        Self {
            name: if name.is_empty() {
                default_customer_name()
            } else {
                name.to_string()
            },
            email: email.trim().to_string(),
            phone: phone.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Active,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CreateBooking {
    /// Caller-chosen id; one is generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    pub showtime_id: String,
    pub seats: Vec<String>,
    #[serde(default)]
    pub customer: Customer,
    #[serde(default)]
    pub discounts: Vec<Discount>,
}

impl CreateBooking {
    pub fn new(showtime_id: &str, seats: &[&str], customer: Customer) -> Self {
        Self {
            id: None,
            showtime_id: showtime_id.to_string(),
            seats: seats.iter().map(|s| s.to_string()).collect(),
            customer,
            discounts: Vec::new(),
        }
    }

    pub fn with_discounts(mut self, discounts: Vec<Discount>) -> Self {
        self.discounts = discounts;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: String,
    pub showtime_id: String,
    pub seats: Vec<String>,
    pub customer: Customer,
    pub pricing: PriceBreakdown,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    pub showtime_snapshot: ShowtimeSnapshot,
}

impl Booking {
    pub fn new(request: CreateBooking, showtime: &Showtime, pricing: PriceBreakdown) -> Self {
        Self {
            id: request.id.unwrap_or_else(|| generate_id(10)),
            showtime_id: showtime.id.clone(),
            seats: request.seats,
            customer: request.customer,
            pricing,
            status: BookingStatus::Active,
            created_at: Utc::now(),
            cancelled_at: None,
            showtime_snapshot: ShowtimeSnapshot::from(showtime),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == BookingStatus::Active
    }

    /// Marks the booking cancelled. Returns false if it already was.
    pub fn cancel(&mut self, at: DateTime<Utc>) -> bool {
        if !self.is_active() {
            return false;
        }
        self.status = BookingStatus::Cancelled;
        self.cancelled_at = Some(at);
        true
    }
}

/// Short random identifier: the first `len` characters of a v4 UUID.
pub fn generate_id(len: usize) -> String {
    let mut id = uuid::Uuid::new_v4().to_string();
    id.truncate(len);
    id
}

/// Active bookings for `email`, exact match, in insertion order.
pub fn list_customer_bookings<'a>(bookings: &'a [Booking], email: &str) -> Vec<&'a Booking> {
    bookings
        .iter()
        .filter(|booking| booking.is_active() && booking.customer.email == email)
        .collect()
}
