//! Curve evaluator
//!
//! For an anchor `(b_a, y_a)` the redemption curve `b = f(x)` has three
//! pieces:
//!
//! ```text
//!   b_a - x                               0   <= x <= x_U   (par)
//!   b_a - x + alpha/2 * (x - x_U)^2       x_U <  x <= x_L   (decay)
//!   r_L * (y_a - x)                       x_L <  x <= y_a   (floor)
//! ```
//!
//! with `r_L = 1 - alpha * (x_L - x_U)`. The curve is continuous and `C^1`
//! at both thresholds, and the price `-f'(x)` falls from 1 to `r_L`.
//!
//! All helpers are generic over the precision so the same formulas serve
//! the 18-digit public API and the wide reconstruction path.

use crate::fixed::{Decimal, Precision};
use crate::params::Params;
use crate::{PammError, Result};

fn two<P: Precision>() -> Decimal<P> {
    Decimal::from_integer(2)
}

/// Slope the curve needs to reach the floor exactly at `y_a`, ignoring the
/// lower bound `alpha_bar`.
pub fn compute_slope_unconstrained<P: Precision>(
    ba: Decimal<P>,
    ya: Decimal<P>,
    theta_bar: Decimal<P>,
) -> Result<Decimal<P>> {
    let one = Decimal::<P>::one();
    let ratio = ba.div_down(ya)?;
    if ratio <= theta_bar {
        return Err(PammError::Precondition(format!(
            "anchor ratio {ratio} is not above the floor {theta_bar}"
        )));
    }
    let theta = one.checked_sub(theta_bar)?;
    if ratio >= one.checked_add(theta_bar)?.div_down(two())? {
        return Ok(two::<P>().mul_down(one.checked_sub(ratio)?)?.div_down(ya)?);
    }
    let excess = ba.checked_sub(theta_bar.mul_down(ya)?)?;
    Ok(theta.mul_down(theta)?.div_down(two::<P>().mul_down(excess)?)?)
}

/// `max(alpha_bar / y_a, compute_slope_unconstrained)`
pub fn compute_slope<P: Precision>(
    ba: Decimal<P>,
    ya: Decimal<P>,
    params: &Params<P>,
) -> Result<Decimal<P>> {
    let floor = params.alpha_bar().div_down(ya)?;
    let unconstrained = compute_slope_unconstrained(ba, ya, params.theta_bar())?;
    Ok(floor.max(unconstrained))
}

/// Upper threshold at which the decay must start for slope `alpha` to
/// reach the floor, without the `xu_bar` cap.
pub fn compute_upper_redemption_threshold_unconstrained<P: Precision>(
    ba: Decimal<P>,
    ya: Decimal<P>,
    alpha: Decimal<P>,
    theta: Decimal<P>,
) -> Result<Decimal<P>> {
    let delta = ya.checked_sub(ba)?;
    if alpha.mul_down(delta)? <= theta.mul_down(theta)?.div_down(two())? {
        let run = two::<P>().mul_down(delta)?.div_down(alpha)?.sqrt()?;
        return Ok(ya.checked_sub(run)?);
    }
    let half_run = theta.div_down(two::<P>().mul_down(alpha)?)?;
    Ok(ya.checked_sub(delta.div_down(theta)?)?.checked_sub(half_run)?)
}

/// Unconstrained upper threshold clipped to `[0, xu_bar * y_a]`.
pub fn compute_upper_redemption_threshold<P: Precision>(
    ba: Decimal<P>,
    ya: Decimal<P>,
    alpha: Decimal<P>,
    params: &Params<P>,
) -> Result<Decimal<P>> {
    let cap = params.xu_bar().mul_down(ya)?;
    let unconstrained =
        compute_upper_redemption_threshold_unconstrained(ba, ya, alpha, params.theta()?)?;
    Ok(cap.min(unconstrained).max(Decimal::zero()))
}

/// Redemption level at which the decay piece meets the floor.
///
/// A negative radicand means the quadratic never flattens out before `y_a`,
/// so the threshold saturates at `y_a`.
pub fn compute_lower_redemption_threshold<P: Precision>(
    ba: Decimal<P>,
    ya: Decimal<P>,
    alpha: Decimal<P>,
    xu: Decimal<P>,
) -> Result<Decimal<P>> {
    if ba >= ya {
        return Ok(ya);
    }
    let span = ya.checked_sub(xu)?;
    let radicand = span
        .mul_down(span)?
        .checked_sub(two::<P>().div_down(alpha)?.mul_down(ya.checked_sub(ba)?)?)?;
    if radicand.is_negative() {
        return Ok(ya);
    }
    Ok(ya.checked_sub(radicand.sqrt()?)?)
}

/// The curve for explicit `(alpha, x_U, x_L)`.
pub fn compute_fixed_reserve<P: Precision>(
    x: Decimal<P>,
    ba: Decimal<P>,
    ya: Decimal<P>,
    alpha: Decimal<P>,
    xu: Decimal<P>,
    xl: Decimal<P>,
) -> Result<Decimal<P>> {
    if x <= xu {
        return Ok(ba.checked_sub(x)?);
    }
    if x <= xl {
        let past = x.checked_sub(xu)?;
        let rebate = alpha.div_down(two())?.mul_down(past.mul_down(past)?)?;
        // A saturated x_L can leave this a unit below zero at y_a
        return Ok(ba.checked_sub(x)?.checked_add(rebate)?.max(Decimal::zero()));
    }
    let floor_ratio = Decimal::<P>::one().checked_sub(alpha.mul_down(xl.checked_sub(xu)?)?)?;
    Ok(floor_ratio.mul_down(ya.checked_sub(x)?)?)
}

/// Slope and thresholds of the curve through an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurveShape<P: Precision> {
    pub alpha: Decimal<P>,
    pub xu: Decimal<P>,
    pub xl: Decimal<P>,
}

impl<P: Precision> CurveShape<P> {
    /// Requires `theta_bar < b_a / y_a`.
    pub fn new(ba: Decimal<P>, ya: Decimal<P>, params: &Params<P>) -> Result<Self> {
        let alpha = compute_slope(ba, ya, params)?;
        let xu = compute_upper_redemption_threshold(ba, ya, alpha, params)?;
        let xl = compute_lower_redemption_threshold(ba, ya, alpha, xu)?;
        Ok(Self { alpha, xu, xl })
    }

    pub fn reserve(&self, x: Decimal<P>, ba: Decimal<P>, ya: Decimal<P>) -> Result<Decimal<P>> {
        compute_fixed_reserve(x, ba, ya, self.alpha, self.xu, self.xl)
    }

    pub fn price(&self, x: Decimal<P>) -> Result<Decimal<P>> {
        let one = Decimal::<P>::one();
        if x <= self.xu {
            return Ok(one);
        }
        let decayed = x.min(self.xl).checked_sub(self.xu)?;
        Ok(one.checked_sub(self.alpha.mul_down(decayed)?)?)
    }

    /// Reserve ratio on the floor piece.
    pub fn floor_ratio(&self) -> Result<Decimal<P>> {
        self.price(self.xl)
    }
}

fn check_domain<P: Precision>(x: Decimal<P>, ba: Decimal<P>, ya: Decimal<P>) -> Result<()> {
    if x.is_negative() || ba.is_negative() {
        return Err(PammError::Precondition(format!(
            "negative input: x = {x}, b_a = {ba}"
        )));
    }
    if !ya.is_positive() {
        return Err(PammError::Precondition(format!(
            "anchor supply must be positive, got {ya}"
        )));
    }
    if x > ya {
        return Err(PammError::Precondition(format!(
            "redemption level {x} exceeds anchor supply {ya}"
        )));
    }
    Ok(())
}

/// Slope and thresholds through `(b_a, y_a)`, or `None` on the flat and
/// floor branches where the curve is a single line.
pub fn curve_shape<P: Precision>(
    ba: Decimal<P>,
    ya: Decimal<P>,
    params: &Params<P>,
) -> Result<Option<CurveShape<P>>> {
    if ba >= ya || ba.div_down(ya)? <= params.theta_bar() {
        return Ok(None);
    }
    CurveShape::new(ba, ya, params).map(Some)
}

/// Reserve left after redeeming up to level `x` from anchor `(b_a, y_a)`.
pub fn compute_reserve<P: Precision>(
    x: Decimal<P>,
    ba: Decimal<P>,
    ya: Decimal<P>,
    params: &Params<P>,
) -> Result<Decimal<P>> {
    check_domain(x, ba, ya)?;
    if ba >= ya {
        return Ok(ba.checked_sub(x)?);
    }
    let ratio = ba.div_down(ya)?;
    if ratio <= params.theta_bar() {
        return Ok(ba.checked_sub(ratio.mul_down(x)?)?);
    }
    CurveShape::new(ba, ya, params)?.reserve(x, ba, ya)
}

/// Marginal redemption price at level `x`.
pub fn compute_price<P: Precision>(
    x: Decimal<P>,
    ba: Decimal<P>,
    ya: Decimal<P>,
    params: &Params<P>,
) -> Result<Decimal<P>> {
    check_domain(x, ba, ya)?;
    if ba >= ya {
        return Ok(Decimal::one());
    }
    let ratio = ba.div_down(ya)?;
    if ratio <= params.theta_bar() {
        return Ok(ratio);
    }
    CurveShape::new(ba, ya, params)?.price(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::Fp;

    fn fp(s: &str) -> Fp {
        s.parse().unwrap()
    }

    fn params(alpha_bar: &str) -> Params {
        Params::new(fp(alpha_bar), fp("0.3"), fp("0.6")).unwrap()
    }

    #[test]
    fn test_fixed_reserve_pieces() {
        let one = Fp::one();
        // Par piece
        assert_eq!(
            compute_fixed_reserve(fp("0.3"), fp("0.8"), one, one, fp("0.3"), fp("0.7")).unwrap(),
            fp("0.5")
        );
        // Decay piece
        assert_eq!(
            compute_fixed_reserve(fp("0.4"), fp("0.8775"), one, fp("0.5"), fp("0.3"), one)
                .unwrap(),
            fp("0.48")
        );
        assert_eq!(
            compute_fixed_reserve(fp("0.4"), fp("0.85"), one, fp("0.5"), fp("0.22"), fp("0.9"))
                .unwrap(),
            fp("0.4581")
        );
        // Floor piece: r_L = 1 - (0.7 - 0.3) = 0.6
        assert_eq!(
            compute_fixed_reserve(fp("0.8"), fp("0.8"), one, one, fp("0.3"), fp("0.7")).unwrap(),
            fp("0.12")
        );
    }

    #[test]
    fn test_fixed_reserve_continuous_at_lower_threshold() {
        let one = Fp::one();
        let at = compute_fixed_reserve(fp("0.7"), fp("0.8"), one, one, fp("0.3"), fp("0.7"));
        let after = compute_fixed_reserve(
            fp("0.700000000000000001"),
            fp("0.8"),
            one,
            one,
            fp("0.3"),
            fp("0.7"),
        );
        assert_eq!(at.unwrap(), fp("0.18"));
        let gap = fp("0.18").checked_sub(after.unwrap()).unwrap();
        assert!(gap >= Fp::zero() && gap <= Fp::from_raw(2), "{gap}");
    }

    #[test]
    fn test_upper_threshold() {
        let p = params("1");
        assert_eq!(
            compute_upper_redemption_threshold(fp("0.85"), Fp::one(), fp("0.5"), &p).unwrap(),
            fp("0.225403330758516623")
        );
        // Unconstrained value is exactly zero here
        assert_eq!(
            compute_upper_redemption_threshold(fp("0.85"), Fp::one(), fp("0.3"), &p).unwrap(),
            Fp::zero()
        );
        // Capped by xu_bar
        assert_eq!(
            compute_upper_redemption_threshold(fp("0.99"), Fp::one(), Fp::one(), &p).unwrap(),
            fp("0.3")
        );
    }

    #[test]
    fn test_upper_threshold_linear_branch() {
        // alpha * delta = 0.2 > theta^2 / 2 = 0.08
        let value = compute_upper_redemption_threshold_unconstrained(
            fp("0.8"),
            Fp::one(),
            Fp::one(),
            fp("0.4"),
        )
        .unwrap();
        // 1 - 0.2/0.4 - 0.4/2
        assert_eq!(value, fp("0.3"));
    }

    #[test]
    fn test_slope() {
        let theta_bar = fp("0.6");
        assert_eq!(compute_slope_unconstrained(fp("0.8"), Fp::one(), theta_bar).unwrap(), fp("0.4"));
        assert_eq!(compute_slope_unconstrained(fp("0.85"), Fp::one(), theta_bar).unwrap(), fp("0.3"));
        // Below the H/L split the floor-distance branch applies: 0.16 / (2 * 0.1)
        assert_eq!(compute_slope_unconstrained(fp("0.7"), Fp::one(), theta_bar).unwrap(), fp("0.8"));
        assert_eq!(compute_slope(fp("0.8"), Fp::one(), &params("0.5")).unwrap(), fp("0.5"));
        assert_eq!(compute_slope(fp("0.85"), Fp::one(), &params("0.5")).unwrap(), fp("0.5"));
        assert_eq!(compute_slope(fp("0.8"), Fp::one(), &params("0.1")).unwrap(), fp("0.4"));
        assert_eq!(compute_slope(fp("0.85"), Fp::one(), &params("0.1")).unwrap(), fp("0.3"));
    }

    #[test]
    fn test_slope_requires_ratio_above_floor() {
        let result = compute_slope_unconstrained(fp("0.6"), Fp::one(), fp("0.6"));
        assert!(matches!(result, Err(PammError::Precondition(_))));
    }

    #[test]
    fn test_lower_threshold() {
        assert_eq!(
            compute_lower_redemption_threshold(fp("0.85"), Fp::one(), Fp::one(), fp("0.3"))
                .unwrap(),
            fp("0.564110105645932645")
        );
        assert_eq!(
            compute_lower_redemption_threshold(Fp::one(), Fp::one(), Fp::one(), fp("0.3")).unwrap(),
            Fp::one()
        );
        // (1 - 0.2)^2 - 2 * 0.16 / 0.3 < 0
        assert_eq!(
            compute_lower_redemption_threshold(fp("0.84"), Fp::one(), fp("0.3"), fp("0.2"))
                .unwrap(),
            Fp::one()
        );
    }

    #[test]
    fn test_reserve_and_price_decay_piece() {
        let p = params("0.5");
        let (x, ba, ya) = (fp("0.4"), fp("0.85"), Fp::one());
        assert_eq!(compute_reserve(x, ba, ya, &p).unwrap(), fp("0.457620999227554986"));
        assert_eq!(compute_price(x, ba, ya, &p).unwrap(), fp("0.912701665379258312"));
        let shape = curve_shape(ba, ya, &p).unwrap().unwrap();
        assert_eq!(shape.alpha, fp("0.5"));
        assert_eq!(shape.xu, fp("0.225403330758516623"));
        assert_eq!(shape.xl, Fp::one());
    }

    #[test]
    fn test_reserve_and_price_shallow_slope() {
        let p = params("0.3");
        let (x, ba, ya) = (fp("0.7"), fp("0.85"), Fp::one());
        assert_eq!(compute_reserve(x, ba, ya, &p).unwrap(), fp("0.2235"));
        assert_eq!(compute_price(x, ba, ya, &p).unwrap(), fp("0.79"));
        let shape = curve_shape(ba, ya, &p).unwrap().unwrap();
        assert_eq!(shape.alpha, fp("0.3"));
        assert_eq!(shape.xu, Fp::zero());
        assert_eq!(shape.xl, fp("0.999999999"));
    }

    #[test]
    fn test_flat_and_floor_branches() {
        let p = params("1");
        // Over-collateralised anchor: redeem at par
        assert_eq!(compute_reserve(fp("0.3"), fp("1.2"), Fp::one(), &p).unwrap(), fp("0.9"));
        assert_eq!(compute_price(fp("0.3"), fp("1.2"), Fp::one(), &p).unwrap(), Fp::one());
        // At or below the floor: pro rata
        assert_eq!(compute_reserve(fp("0.5"), fp("0.5"), Fp::one(), &p).unwrap(), fp("0.25"));
        assert_eq!(compute_price(fp("0.5"), fp("0.5"), Fp::one(), &p).unwrap(), fp("0.5"));
        assert!(curve_shape(fp("0.5"), Fp::one(), &p).unwrap().is_none());
        assert!(curve_shape(Fp::one(), Fp::one(), &p).unwrap().is_none());
    }

    #[test]
    fn test_unnormalized_anchor() {
        // Slope scales with 1 / y_a and thresholds with y_a
        let p = params("1");
        let (ba, ya) = (fp("1.7"), fp("2"));
        let shape = curve_shape(ba, ya, &p).unwrap().unwrap();
        assert_eq!(shape.alpha, fp("0.5"));
        assert_eq!(shape.xu, fp("0.6"));
        assert_eq!(shape.xl, fp("1.12822021129186529"));
        assert_eq!(compute_reserve(fp("0.8"), ba, ya, &p).unwrap(), fp("0.91"));
        assert_eq!(compute_price(fp("0.8"), ba, ya, &p).unwrap(), fp("0.9"));
    }

    #[test]
    fn test_domain_checks() {
        let p = params("1");
        let one = Fp::one();
        for (x, ba, ya) in [
            (fp("-0.1"), fp("0.8"), one),
            (fp("0.1"), fp("-0.8"), one),
            (fp("0.1"), fp("0.8"), Fp::zero()),
            (fp("1.1"), fp("0.8"), one),
        ] {
            assert!(matches!(compute_reserve(x, ba, ya, &p), Err(PammError::Precondition(_))));
            assert!(matches!(compute_price(x, ba, ya, &p), Err(PammError::Precondition(_))));
        }
    }

    #[test]
    fn test_floor_ratio_matches_tail() {
        let p = params("1");
        let (ba, ya) = (fp("0.8"), Fp::one());
        let shape = CurveShape::new(ba, ya, &p).unwrap();
        assert_eq!(shape.floor_ratio().unwrap(), fp("0.6"));
        assert_eq!(compute_price(fp("0.9"), ba, ya, &p).unwrap(), fp("0.6"));
    }
}
