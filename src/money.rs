//! Pure money arithmetic for invoice settlement.
//!
//! Every amount is a [`Decimal`]; rounding is half-away-from-zero throughout,
//! at 2 decimal places for line amounts and taxes and at 0 decimal places for
//! the final rupee total. Callers validate ranges (quantity and rate
//! non-negative, discount within 0–100) before computing; these functions
//! never clamp.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Compute a line item's amount: `quantity * rate * (1 - discount_percent/100)`,
/// rounded to 2 decimal places.
pub fn line_amount(quantity: Decimal, rate: Decimal, discount_percent: Decimal) -> Decimal {
    let gross = quantity * rate;
    let net = gross * (Decimal::ONE - discount_percent / Decimal::ONE_HUNDRED);
    net.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Subtotal, per-component GST amounts, round-off, and integral total for one
/// invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TaxBreakdown {
    pub subtotal: Decimal,
    pub cgst_amount: Decimal,
    pub sgst_amount: Decimal,
    pub igst_amount: Decimal,
    pub total_tax: Decimal,
    /// Signed rupee-rounding adjustment; `total = subtotal + total_tax + round_off`.
    pub round_off: Decimal,
    /// Always an integral rupee value.
    pub total: Decimal,
}

impl TaxBreakdown {
    /// Compute the breakdown from already-settled line amounts and the three
    /// GST rate percentages. Rates are independent; mutual exclusivity of
    /// CGST+SGST vs IGST is the caller's choice.
    pub fn compute(
        line_amounts: &[Decimal],
        cgst_rate: Decimal,
        sgst_rate: Decimal,
        igst_rate: Decimal,
    ) -> Self {
        let subtotal: Decimal = line_amounts.iter().copied().sum();

        let cgst_amount = tax_component(subtotal, cgst_rate);
        let sgst_amount = tax_component(subtotal, sgst_rate);
        let igst_amount = tax_component(subtotal, igst_rate);
        let total_tax = cgst_amount + sgst_amount + igst_amount;

        let pre_round = subtotal + total_tax;
        let total = pre_round.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        let round_off = total - pre_round;

        Self {
            subtotal,
            cgst_amount,
            sgst_amount,
            igst_amount,
            total_tax,
            round_off,
            total,
        }
    }
}

fn tax_component(subtotal: Decimal, rate: Decimal) -> Decimal {
    (subtotal * rate / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
