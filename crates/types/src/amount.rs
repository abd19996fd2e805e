//! Smallest-unit decimal amounts.

use rust_decimal::Decimal;

/// Decimal places kept on per-block accruals.
pub const ACCRUAL_DECIMALS: u32 = 8;

/// Clamp a reconstructed balance at zero.
pub fn non_negative(value: Decimal) -> Decimal {
    value.max(Decimal::ZERO)
}

/// `true` when `value` is a fraction in `[0, 1]`.
pub fn is_fraction(value: Decimal) -> bool {
    value >= Decimal::ZERO && value <= Decimal::ONE
}
