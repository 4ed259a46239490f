//! Logarithm, exponential and real powers
//!
//! Series are evaluated in [`Fp100`] and projected back to the caller's
//! precision, so the result is exact to the last digit of `P` except for
//! the final truncation.

use super::{Decimal, Fp100, MathError, Precision, P100};

/// Max number of series terms before giving up
const MAX_SERIES_TERMS: u32 = 512;

/// Max number of halvings/doublings used for range reduction
const MAX_REDUCTION_STEPS: u32 = 4096;

/// `sum_{k>=0} z^(2k+1) / (2k+1)` for `|z| < 1`, i.e. `atanh(z)`.
fn atanh_series(z: Fp100) -> Result<Fp100, MathError> {
    let z_squared = z.mul_down(z)?;
    let mut power = z;
    let mut sum = Fp100::zero();
    for k in 0..MAX_SERIES_TERMS {
        let term = power.div_down(Fp100::from_integer(2 * k as i64 + 1))?;
        if term.is_zero() {
            return Ok(sum);
        }
        sum = sum.checked_add(term)?;
        power = power.mul_down(z_squared)?;
    }
    Err(MathError::NoConvergence)
}

fn ln_two() -> Result<Fp100, MathError> {
    let third = Fp100::one().div_down(Fp100::from_integer(3))?;
    atanh_series(third)?.mul_down(Fp100::from_integer(2))
}

fn ln_wide(x: Fp100) -> Result<Fp100, MathError> {
    if !x.is_positive() {
        return Err(MathError::NonPositiveLog(x.to_string()));
    }
    let one = Fp100::one();
    let two = Fp100::from_integer(2);

    // x = m * 2^e with m in [1, 2)
    let mut mantissa = x;
    let mut exponent: i64 = 0;
    let mut steps = 0;
    while mantissa >= two {
        mantissa = mantissa.div_down(two)?;
        exponent += 1;
        steps += 1;
        if steps > MAX_REDUCTION_STEPS {
            return Err(MathError::NoConvergence);
        }
    }
    while mantissa < one {
        mantissa = mantissa.mul_down(two)?;
        exponent -= 1;
        steps += 1;
        if steps > MAX_REDUCTION_STEPS {
            return Err(MathError::NoConvergence);
        }
    }

    let z = mantissa
        .checked_sub(one)?
        .div_down(mantissa.checked_add(one)?)?;
    let ln_mantissa = atanh_series(z)?.mul_down(two)?;
    ln_mantissa.checked_add(ln_two()?.mul_down(Fp100::from_integer(exponent))?)
}

fn exp_wide(x: Fp100) -> Result<Fp100, MathError> {
    if x.is_zero() {
        return Ok(Fp100::one());
    }
    let two = Fp100::from_integer(2);
    let threshold = Fp100::negative_power_of_ten(3);

    let mut reduced = x.abs();
    let mut halvings = 0;
    while reduced > threshold {
        reduced = reduced.div_down(two)?;
        halvings += 1;
        if halvings > MAX_REDUCTION_STEPS {
            return Err(MathError::NoConvergence);
        }
    }

    let mut sum = Fp100::one();
    let mut term = Fp100::one();
    let mut converged = false;
    for n in 1..=MAX_SERIES_TERMS {
        term = term
            .mul_down(reduced)?
            .div_down(Fp100::from_integer(i64::from(n)))?;
        if term.is_zero() {
            converged = true;
            break;
        }
        sum = sum.checked_add(term)?;
    }
    if !converged {
        return Err(MathError::NoConvergence);
    }

    for _ in 0..halvings {
        sum = match sum.mul_down(sum) {
            Ok(squared) => squared,
            // e^-x underflows to zero long before e^x stops fitting
            Err(MathError::Overflow) if x.is_negative() => return Ok(Fp100::zero()),
            Err(err) => return Err(err),
        };
    }

    if x.is_negative() {
        Fp100::one().div_down(sum)
    } else {
        Ok(sum)
    }
}

impl<P: Precision> Decimal<P> {
    /// Natural logarithm.
    pub fn ln(self) -> Result<Self, MathError> {
        ln_wide(self.to_precision::<P100>()?)?.to_precision()
    }

    /// Natural exponential.
    pub fn exp(self) -> Result<Self, MathError> {
        exp_wide(self.to_precision::<P100>()?)?.to_precision()
    }

    /// `self^exponent` for a real exponent. Integral exponents use repeated
    /// squaring; everything else goes through `exp(exponent * ln(self))`.
    pub fn pow(self, exponent: Self) -> Result<Self, MathError> {
        if exponent.is_integral() {
            let whole = exponent.magnitude / Self::scale();
            if whole.bits() <= 32 {
                let power = whole.low_u32();
                return if exponent.is_negative() {
                    Self::one().div_down(self.pow_int(power)?)
                } else {
                    self.pow_int(power)
                };
            }
        }
        if self.is_zero() {
            return if exponent.is_negative() {
                Err(MathError::DivisionByZero)
            } else {
                Ok(Self::zero())
            };
        }
        let log = ln_wide(self.to_precision::<P100>()?)?;
        exp_wide(log.mul_down(exponent.to_precision::<P100>()?)?)?.to_precision()
    }
}
