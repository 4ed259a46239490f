//! Signed decimal fixed-point arithmetic
//!
//! [`Decimal<P>`] stores a sign flag and a scaled magnitude with `P::DIGITS`
//! fractional digits. Three precisions are provided:
//!
//! | Alias     | Marker  | Fractional digits | Magnitude bound |
//! |-----------|---------|-------------------|-----------------|
//! | [`Fp`]    | [`P18`] | 18                | 2^256           |
//! | [`Fp38`]  | [`P38`] | 38                | 2^384           |
//! | [`Fp100`] | [`P100`]| 100               | 2^512           |
//!
//! All arithmetic is checked: leaving the magnitude bound is
//! [`MathError::Overflow`], never a silent wrap. Products and quotients
//! truncate toward zero. Widening conversions are exact, so a value can be
//! lifted into a wider precision, worked on, and projected back.

mod transcendental;

use core::cmp::Ordering;
use core::fmt;
use core::marker::PhantomData;
use core::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use uint::construct_uint;

construct_uint! {
    /// Unsigned backing integer shared by every precision.
    pub struct U1024(16);
}

/// Max number of iterations performed in the Newton square root
const MAX_SQRT_ITERATIONS: u32 = 255;

/// Errors raised by fixed-point arithmetic
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MathError {
    /// Result magnitude exceeds the precision's bound
    #[error("fixed-point overflow")]
    Overflow,
    /// Division by zero
    #[error("division by zero")]
    DivisionByZero,
    /// Square root of a value more negative than the accepted tolerance
    #[error("square root of negative value {0}")]
    NegativeSqrt(String),
    /// Logarithm of zero or a negative value
    #[error("logarithm of non-positive value {0}")]
    NonPositiveLog(String),
    /// Malformed decimal literal
    #[error("invalid decimal literal `{0}`")]
    Parse(String),
    /// An iterative method hit its iteration cap
    #[error("iteration limit reached without convergence")]
    NoConvergence,
}

/// Compile-time description of a fixed-point precision.
pub trait Precision:
    Copy + Clone + Default + PartialEq + Eq + core::hash::Hash + fmt::Debug + Send + Sync + 'static
{
    /// Number of fractional decimal digits.
    const DIGITS: u32;
    /// Largest permitted bit length of the scaled magnitude.
    const MAX_BITS: usize;
}

/// 18 fractional digits: the public precision of prices, reserves and supply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct P18;

/// 38 fractional digits: working precision for forward curve evaluation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct P38;

/// 100 fractional digits: working precision for anchor reconstruction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct P100;

impl Precision for P18 {
    const DIGITS: u32 = 18;
    const MAX_BITS: usize = 256;
}

impl Precision for P38 {
    const DIGITS: u32 = 38;
    const MAX_BITS: usize = 384;
}

impl Precision for P100 {
    const DIGITS: u32 = 100;
    const MAX_BITS: usize = 512;
}

pub type Fp = Decimal<P18>;
pub type Fp38 = Decimal<P38>;
pub type Fp100 = Decimal<P100>;

/// Signed decimal with `P::DIGITS` fractional digits.
///
/// Zero is always stored with a clear sign flag, so derived equality and
/// hashing agree with numeric equality.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Decimal<P: Precision> {
    negative: bool,
    magnitude: U1024,
    precision: PhantomData<P>,
}

/// floor(sqrt(n)) by Newton iteration from an initial guess above the root.
fn integer_sqrt(n: U1024) -> Result<U1024, MathError> {
    if n.is_zero() {
        return Ok(n);
    }
    let mut x = U1024::one() << ((n.bits() + 1) / 2);
    for _ in 0..MAX_SQRT_ITERATIONS {
        let y = (x + n / x) >> 1usize;
        if y >= x {
            return Ok(x);
        }
        x = y;
    }
    Err(MathError::NoConvergence)
}

impl<P: Precision> Decimal<P> {
    fn scale() -> U1024 {
        U1024::exp10(P::DIGITS as usize)
    }

    fn from_parts(negative: bool, magnitude: U1024) -> Result<Self, MathError> {
        if magnitude.bits() > P::MAX_BITS {
            return Err(MathError::Overflow);
        }
        Ok(Self::from_parts_unchecked(negative, magnitude))
    }

    fn from_parts_unchecked(negative: bool, magnitude: U1024) -> Self {
        Self {
            negative: negative && !magnitude.is_zero(),
            magnitude,
            precision: PhantomData,
        }
    }

    pub fn zero() -> Self {
        Self::from_parts_unchecked(false, U1024::zero())
    }

    pub fn one() -> Self {
        Self::from_parts_unchecked(false, Self::scale())
    }

    /// Smallest positive value, one unit in the last place.
    pub fn ulp() -> Self {
        Self::from_parts_unchecked(false, U1024::one())
    }

    /// `10^-n`, or zero when `n` exceeds the fractional digits.
    pub fn negative_power_of_ten(n: u32) -> Self {
        if n > P::DIGITS {
            return Self::zero();
        }
        Self::from_parts_unchecked(false, U1024::exp10((P::DIGITS - n) as usize))
    }

    pub fn from_integer(value: i64) -> Self {
        let magnitude = U1024::from(value.unsigned_abs()) * Self::scale();
        Self::from_parts_unchecked(value < 0, magnitude)
    }

    pub fn from_u128(value: u128) -> Self {
        Self::from_parts_unchecked(false, U1024::from(value) * Self::scale())
    }

    /// Build from an already scaled integer (`raw = value * 10^DIGITS`).
    pub fn from_raw(raw: i128) -> Self {
        Self::from_parts_unchecked(raw < 0, U1024::from(raw.unsigned_abs()))
    }

    /// The scaled integer, if it fits an `i128`.
    pub fn to_raw(self) -> Result<i128, MathError> {
        if self.magnitude.bits() > 127 {
            return Err(MathError::Overflow);
        }
        let raw = self.magnitude.low_u128() as i128;
        Ok(if self.negative { -raw } else { raw })
    }

    /// Lossy conversion, for display and plotting only.
    pub fn to_f64(self) -> f64 {
        self.to_string().parse().unwrap_or(f64::NAN)
    }

    /// Re-express in another precision. Widening is exact; narrowing
    /// truncates toward zero.
    pub fn to_precision<Q: Precision>(self) -> Result<Decimal<Q>, MathError> {
        let magnitude = if Q::DIGITS >= P::DIGITS {
            self.magnitude
                .checked_mul(U1024::exp10((Q::DIGITS - P::DIGITS) as usize))
                .ok_or(MathError::Overflow)?
        } else {
            self.magnitude / U1024::exp10((P::DIGITS - Q::DIGITS) as usize)
        };
        Decimal::<Q>::from_parts(self.negative, magnitude)
    }

    pub fn is_zero(&self) -> bool {
        self.magnitude.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn is_positive(&self) -> bool {
        !self.negative && !self.magnitude.is_zero()
    }

    /// Whether the value has no fractional part.
    pub fn is_integral(&self) -> bool {
        (self.magnitude % Self::scale()).is_zero()
    }

    pub fn abs(self) -> Self {
        Self::from_parts_unchecked(false, self.magnitude)
    }

    pub fn checked_add(self, other: Self) -> Result<Self, MathError> {
        if self.negative == other.negative {
            let magnitude = self
                .magnitude
                .checked_add(other.magnitude)
                .ok_or(MathError::Overflow)?;
            Self::from_parts(self.negative, magnitude)
        } else if self.magnitude >= other.magnitude {
            Self::from_parts(self.negative, self.magnitude - other.magnitude)
        } else {
            Self::from_parts(other.negative, other.magnitude - self.magnitude)
        }
    }

    pub fn checked_sub(self, other: Self) -> Result<Self, MathError> {
        self.checked_add(-other)
    }

    /// Full-width product truncated to `P::DIGITS` fractional digits.
    pub fn mul_down(self, other: Self) -> Result<Self, MathError> {
        let product = self
            .magnitude
            .checked_mul(other.magnitude)
            .ok_or(MathError::Overflow)?;
        Self::from_parts(self.negative != other.negative, product / Self::scale())
    }

    /// Quotient truncated to `P::DIGITS` fractional digits.
    pub fn div_down(self, other: Self) -> Result<Self, MathError> {
        if other.is_zero() {
            return Err(MathError::DivisionByZero);
        }
        let numerator = self
            .magnitude
            .checked_mul(Self::scale())
            .ok_or(MathError::Overflow)?;
        Self::from_parts(self.negative != other.negative, numerator / other.magnitude)
    }

    /// `self^exponent` by square-and-multiply, truncating every product.
    pub fn pow_int(self, exponent: u32) -> Result<Self, MathError> {
        let mut result = Self::one();
        let mut base = self;
        let mut remaining = exponent;
        while remaining > 0 {
            if remaining & 1 == 1 {
                result = result.mul_down(base)?;
            }
            remaining >>= 1;
            if remaining > 0 {
                base = base.mul_down(base)?;
            }
        }
        Ok(result)
    }

    /// Square root rounded down. A negative input within one ulp of zero
    /// maps to zero; anything more negative is a fault.
    pub fn sqrt(self) -> Result<Self, MathError> {
        self.sqrt_within(Self::ulp())
    }

    /// Square root rounded down, mapping negative inputs no further than
    /// `tolerance` below zero to zero.
    pub fn sqrt_within(self, tolerance: Self) -> Result<Self, MathError> {
        if self.negative {
            if self.magnitude <= tolerance.magnitude {
                return Ok(Self::zero());
            }
            return Err(MathError::NegativeSqrt(self.to_string()));
        }
        let radicand = self
            .magnitude
            .checked_mul(Self::scale())
            .ok_or(MathError::Overflow)?;
        Self::from_parts(false, integer_sqrt(radicand)?)
    }
}

impl<P: Precision> core::ops::Neg for Decimal<P> {
    type Output = Self;

    fn neg(self) -> Self {
        Self::from_parts_unchecked(!self.negative, self.magnitude)
    }
}

impl<P: Precision> Ord for Decimal<P> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.negative, other.negative) {
            (false, false) => self.magnitude.cmp(&other.magnitude),
            (true, true) => other.magnitude.cmp(&self.magnitude),
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
        }
    }
}

impl<P: Precision> PartialOrd for Decimal<P> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Canonical form: optional `-`, integer part, `.`, exactly `P::DIGITS`
/// fractional digits.
impl<P: Precision> fmt::Display for Decimal<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (integer, fraction) = self.magnitude.div_mod(Self::scale());
        if self.negative {
            f.write_str("-")?;
        }
        write!(
            f,
            "{}.{:0>width$}",
            integer,
            fraction.to_string(),
            width = P::DIGITS as usize
        )
    }
}

impl<P: Precision> fmt::Debug for Decimal<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Accepts `[+-]digits[.digits]`. Fractional digits beyond `P::DIGITS` are
/// truncated.
impl<P: Precision> FromStr for Decimal<P> {
    type Err = MathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let (negative, body) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let (integer_part, fraction_part) = body.split_once('.').unwrap_or((body, ""));
        let well_formed = !(integer_part.is_empty() && fraction_part.is_empty())
            && integer_part.bytes().all(|c| c.is_ascii_digit())
            && fraction_part.bytes().all(|c| c.is_ascii_digit());
        if !well_formed {
            return Err(MathError::Parse(s.to_string()));
        }

        let fraction: String = fraction_part
            .chars()
            .chain(core::iter::repeat('0'))
            .take(P::DIGITS as usize)
            .collect();
        let integer = if integer_part.is_empty() {
            U1024::zero()
        } else {
            U1024::from_dec_str(integer_part).map_err(|_| MathError::Parse(s.to_string()))?
        };
        let fraction =
            U1024::from_dec_str(&fraction).map_err(|_| MathError::Parse(s.to_string()))?;
        let magnitude = integer
            .checked_mul(Self::scale())
            .and_then(|scaled| scaled.checked_add(fraction))
            .ok_or(MathError::Overflow)?;
        Self::from_parts(negative, magnitude)
    }
}

impl<P: Precision> Serialize for Decimal<P> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, P: Precision> Deserialize<'de> for Decimal<P> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp(s: &str) -> Fp {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display_canonical() {
        assert_eq!(fp("0.85").to_string(), "0.850000000000000000");
        assert_eq!(fp("-1.5").to_string(), "-1.500000000000000000");
        assert_eq!(fp(".25").to_string(), "0.250000000000000000");
        assert_eq!(fp("+3").to_string(), "3.000000000000000000");
        assert_eq!(fp("-0").to_string(), "0.000000000000000000");
        assert!(!fp("-0").is_negative());
        // Digits beyond the 18th are truncated toward zero
        assert_eq!(fp("0.1234567890123456789").to_string(), "0.123456789012345678");
        assert_eq!(fp("-0.1234567890123456789").to_string(), "-0.123456789012345678");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", ".", "abc", "1.2.3", "1e5", "--1", "0x10", "1 000"] {
            assert!(matches!(bad.parse::<Fp>(), Err(MathError::Parse(_))), "{bad}");
        }
    }

    #[test]
    fn test_raw_and_integer_conversions() {
        assert_eq!(Fp::from_integer(3).to_raw().unwrap(), 3_000_000_000_000_000_000);
        assert_eq!(Fp::from_integer(-2), fp("-2"));
        assert_eq!(Fp::from_raw(500_000_000_000_000_000), fp("0.5"));
        assert_eq!(Fp::from_u128(7), fp("7"));
        assert_eq!(Fp::ulp().to_raw().unwrap(), 1);
        assert_eq!(Fp::negative_power_of_ten(8), fp("0.00000001"));
        assert_eq!(Fp::negative_power_of_ten(19), Fp::zero());
    }

    #[test]
    fn test_add_sub_signs() {
        assert_eq!(fp("0.3").checked_add(fp("0.7")).unwrap(), Fp::one());
        assert_eq!(fp("0.3").checked_sub(fp("0.7")).unwrap(), fp("-0.4"));
        assert_eq!(fp("-0.3").checked_sub(fp("-0.7")).unwrap(), fp("0.4"));
        assert_eq!(fp("-0.3").checked_add(fp("0.3")).unwrap(), Fp::zero());
        assert!(!fp("-0.3").checked_add(fp("0.3")).unwrap().is_negative());
    }

    #[test]
    fn test_mul_div_truncate_toward_zero() {
        // 1/3 = 0.333...333 (18 digits), truncated
        let third = Fp::one().div_down(Fp::from_integer(3)).unwrap();
        assert_eq!(third.to_raw().unwrap(), 333_333_333_333_333_333);
        let neg_third = Fp::from_integer(-1).div_down(Fp::from_integer(3)).unwrap();
        assert_eq!(neg_third.to_raw().unwrap(), -333_333_333_333_333_333);
        // 0.000000000000000001 * 0.5 truncates to zero
        assert_eq!(Fp::ulp().mul_down(fp("0.5")).unwrap(), Fp::zero());
        assert_eq!(fp("1.5").mul_down(fp("-2")).unwrap(), fp("-3"));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(Fp::one().div_down(Fp::zero()), Err(MathError::DivisionByZero));
    }

    #[test]
    fn test_overflow_faults() {
        // 2^255 - ish in 18-digit precision: 10^58 * 10^18 = 10^76 > 2^252
        let big = fp("10000000000000000000000000000000000000000000000000000000000");
        assert_eq!(big.mul_down(big), Err(MathError::Overflow));
        let huge = "1".repeat(90);
        assert_eq!(huge.parse::<Fp>(), Err(MathError::Overflow));
        assert!(huge.parse::<Fp100>().is_err());
    }

    #[test]
    fn test_ordering() {
        let mut values = vec![fp("0.5"), fp("-2"), fp("0"), fp("-0.1"), fp("3")];
        values.sort();
        assert_eq!(values, vec![fp("-2"), fp("-0.1"), fp("0"), fp("0.5"), fp("3")]);
        assert_eq!(fp("-1").max(fp("-3")), fp("-1"));
    }

    #[test]
    fn test_sqrt_rounds_down() {
        assert_eq!(fp("4").sqrt().unwrap(), fp("2"));
        assert_eq!(fp("0.25").sqrt().unwrap(), fp("0.5"));
        let root_two = fp("2").sqrt().unwrap();
        assert_eq!(root_two.to_string(), "1.414213562373095048");
        // s^2 <= x < (s + ulp)^2, checked on the raw integers
        let s = root_two.to_raw().unwrap() as u128;
        let x = 2u128 * 10u128.pow(36);
        assert!(s * s <= x);
        assert!((s + 1) * (s + 1) > x);
    }

    #[test]
    fn test_sqrt_negative_tolerance() {
        assert_eq!((-Fp::ulp()).sqrt().unwrap(), Fp::zero());
        let two_ulps = -(Fp::from_raw(2));
        assert!(matches!(two_ulps.sqrt(), Err(MathError::NegativeSqrt(_))));
        let within = -(fp("0.0000000000001"));
        assert_eq!(within.sqrt_within(fp("0.000000000001")).unwrap(), Fp::zero());
        assert!(fp("-0.1").sqrt_within(fp("0.000000000001")).is_err());
    }

    #[test]
    fn test_wide_sqrt_resolves_small_differences() {
        let x: Fp100 = "0.0000000000000000000000001".parse().unwrap();
        let root = x.sqrt().unwrap();
        assert_eq!(root.to_precision::<P18>().unwrap(), fp("0.000000000000316227"));
        // In 18 digits the same radicand is zero
        assert_eq!(x.to_precision::<P18>().unwrap(), Fp::zero());
    }

    #[test]
    fn test_pow_int() {
        assert_eq!(fp("0.5").pow_int(2).unwrap(), fp("0.25"));
        assert_eq!(fp("2").pow_int(10).unwrap(), fp("1024"));
        assert_eq!(fp("7.5").pow_int(0).unwrap(), Fp::one());
        assert_eq!(fp("-2").pow_int(3).unwrap(), fp("-8"));
        let decayed = fp("0.999993123563518195").pow_int(100_800).unwrap();
        assert!((decayed.to_f64() - 0.5).abs() < 1e-3, "{decayed}");
    }

    #[test]
    fn test_precision_round_trip_is_lossless() {
        let value = fp("-123.456789012345678901");
        let wide: Fp100 = value.to_precision().unwrap();
        let back: Fp = wide.to_precision().unwrap();
        assert_eq!(back, value);
        let mid: Fp38 = value.to_precision().unwrap();
        assert_eq!(mid.to_precision::<P18>().unwrap(), value);
    }

    #[test]
    fn test_narrowing_truncates() {
        let wide: Fp38 = "0.99999999999999999999999".parse().unwrap();
        assert_eq!(wide.to_precision::<P18>().unwrap(), fp("0.999999999999999999"));
        let wide: Fp38 = "-0.99999999999999999999999".parse().unwrap();
        assert_eq!(wide.to_precision::<P18>().unwrap(), fp("-0.999999999999999999"));
    }

    #[test]
    fn test_serde_string_encoding() {
        let value = fp("0.85");
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, "\"0.850000000000000000\"");
        let back: Fp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
        assert!(serde_json::from_str::<Fp>("\"zero\"").is_err());
    }
}
