//! Invoice arithmetic.
//!
//! Every entry is rounded half-up to cents before it is summed, so totals always
//! match what the printed invoice shows line by line.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Round a value half-up (away from zero) to two decimal places.
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Render an amount as `$1,352.02` or `-$94.59`.
pub fn format_currency(value: Decimal) -> String {
    let rounded = round_cents(value);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let plain = format!("{:.2}", rounded.abs());
    let (whole, cents) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("{sign}${grouped}.{cents}")
}

/// Largest accepted amount in either direction: twelve integer digits.
///
/// Keeps every invoice sum far inside `Decimal`'s range, so totals never overflow.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

/// Parse a user-supplied amount such as `"12.5"` or `"-3"`.
pub fn parse_amount(s: &str) -> crate::Result<Decimal> {
    let value = s
        .trim()
        .parse::<Decimal>()
        .map_err(|e| crate::Error::InvalidAmount(format!("{s:?}: {e}")))?;
    if value.abs() > MAX_AMOUNT {
        return Err(crate::Error::InvalidAmount(format!(
            "{s:?}: larger than {MAX_AMOUNT}"
        )));
    }
    Ok(value)
}

/// Computed totals for one invoice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct InvoiceTotals {
    /// Everything owed: line items minus credits plus reimbursements.
    pub balance_due: Decimal,
    /// Sum of the positive entries only.
    pub gross_pay: Decimal,
    /// Sum of reimbursements.
    pub reimbursements_total: Decimal,
    /// Balance due without reimbursements.
    pub net_pay: Decimal,
}

impl InvoiceTotals {
    /// Compute totals from the raw amounts of each entry kind.
    ///
    /// Credits are given as positive amounts and count against the balance.
    pub fn compute(line_items: &[Decimal], credits: &[Decimal], reimbursements: &[Decimal]) -> Self {
        let values: Vec<Decimal> = line_items
            .iter()
            .map(|v| round_cents(*v))
            .chain(credits.iter().map(|v| -round_cents(*v)))
            .chain(reimbursements.iter().map(|v| round_cents(*v)))
            .collect();

        let balance_due: Decimal = values.iter().sum();
        let gross_pay: Decimal = values.iter().filter(|v| v.is_sign_positive()).sum();
        let reimbursements_total: Decimal = reimbursements.iter().map(|v| round_cents(*v)).sum();

        Self {
            balance_due,
            gross_pay,
            reimbursements_total,
            net_pay: balance_due - reimbursements_total,
        }
    }
}
