//! Comparisons with an explicit tolerance
//!
//! `is_le(x, y, prec)` reads "x is at most y, give or take prec". With a
//! zero tolerance every helper is the exact comparison.

use crate::fixed::{Decimal, MathError, Precision};

/// Tolerance for radicands and range checks inside reconstruction (1e-12)
pub fn precision_internal<P: Precision>() -> Decimal<P> {
    Decimal::negative_power_of_ten(12)
}

/// Tolerance for comparing caller-supplied ratios against the floor (1e-8)
pub fn precision_input<P: Precision>() -> Decimal<P> {
    Decimal::negative_power_of_ten(8)
}

/// `x - y <= prec`
pub fn is_le<P: Precision>(
    x: Decimal<P>,
    y: Decimal<P>,
    prec: Decimal<P>,
) -> Result<bool, MathError> {
    Ok(x.checked_sub(y)? <= prec)
}

/// `y - x <= prec`
pub fn is_ge<P: Precision>(
    x: Decimal<P>,
    y: Decimal<P>,
    prec: Decimal<P>,
) -> Result<bool, MathError> {
    is_le(y, x, prec)
}

/// `|x - y| <= prec`
pub fn is_close<P: Precision>(
    x: Decimal<P>,
    y: Decimal<P>,
    prec: Decimal<P>,
) -> Result<bool, MathError> {
    Ok(x.checked_sub(y)?.abs() <= prec)
}
