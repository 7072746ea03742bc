use crate::domain::{PriceTable, SeatMap, SeatZone};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// 8%, the sales tax applied when no rate is configured.
pub const DEFAULT_TAX_RATE: Decimal = Decimal::from_parts(8, 0, 0, false, 2);

const ONE_HUNDRED: Decimal = Decimal::ONE_HUNDRED;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Discount {
    /// Percentage of the subtotal.
    Percent {
        #[serde(default)]
        value: Decimal,
    },
    /// Fixed amount off.
    Flat {
        #[serde(default)]
        value: Decimal,
    },
    /// Any discount type this system does not know; contributes nothing.
    #[serde(other)]
    Unsupported,
}

impl Discount {
    pub fn percent(value: Decimal) -> Self {
        Self::Percent { value }
    }

    pub fn flat(value: Decimal) -> Self {
        Self::Flat { value }
    }

    /// Amount taken off `subtotal`. Percentages are clamped to 0..=100 and
    /// negative flat values count as zero.
    fn amount(&self, subtotal: Decimal) -> Decimal {
        match self {
            Self::Percent { value } => {
                let rate = (*value).clamp(Decimal::ZERO, ONE_HUNDRED) / ONE_HUNDRED;
                subtotal.saturating_mul(rate)
            }
            Self::Flat { value } => (*value).max(Decimal::ZERO),
            Self::Unsupported => Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PriceBreakdown {
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Prices `seats` against `pricing`.
///
/// Each seat's zone comes from `seat_map` when given and the seat is known,
/// otherwise it is priced as standard. Seats are not deduplicated. The total
/// discount never exceeds the subtotal.
///
/// Amounts are rounded to two places, midpoint away from zero. Arithmetic
/// saturates at the `Decimal` range instead of panicking.
pub fn calculate_total<S: AsRef<str>>(
    seats: &[S],
    pricing: &PriceTable,
    tax_rate: Decimal,
    discounts: &[Discount],
    seat_map: Option<&SeatMap>,
) -> PriceBreakdown {
    let subtotal: Decimal = seats
        .iter()
        .map(|code| {
            let zone = seat_map
                .and_then(|map| map.zone_of(code.as_ref()))
                .unwrap_or(SeatZone::Standard);
            pricing.unit_price(zone)
        })
        .fold(Decimal::ZERO, Decimal::saturating_add);

    let discount = discounts
        .iter()
        .map(|discount| discount.amount(subtotal))
        .fold(Decimal::ZERO, Decimal::saturating_add)
        .min(subtotal);

    let taxable = subtotal - discount;
    let tax = round_money(taxable.saturating_mul(tax_rate));
    let total = round_money(taxable.saturating_add(tax));

    PriceBreakdown {
        subtotal: round_money(subtotal),
        discount: round_money(discount),
        tax,
        total,
    }
}
