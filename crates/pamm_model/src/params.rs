//! PAMM parameters and the thresholds derived from them

use crate::curve::{
    compute_fixed_reserve, compute_lower_redemption_threshold, compute_slope,
    compute_upper_redemption_threshold,
};
use crate::fixed::{Decimal, Precision, P18};
use crate::{PammError, Result};

/// The three governance parameters of a PAMM.
///
/// - `alpha_bar` (decay slope lower bound): minimum rate at which the
///   redemption price falls once redemptions pass the upper threshold.
/// - `xu_bar` (stable redeem threshold upper bound): largest share of the
///   anchor supply that can be redeemed at par.
/// - `theta_bar` (target reserve ratio floor): reserve ratio at which the
///   curve bottoms out and redemptions are paid pro rata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Params<P: Precision = P18> {
    alpha_bar: Decimal<P>,
    xu_bar: Decimal<P>,
    theta_bar: Decimal<P>,
}

impl<P: Precision> Params<P> {
    pub fn new(alpha_bar: Decimal<P>, xu_bar: Decimal<P>, theta_bar: Decimal<P>) -> Result<Self> {
        let one = Decimal::<P>::one();
        if !alpha_bar.is_positive() {
            return Err(PammError::Parameter(format!(
                "alpha_bar must be positive, got {alpha_bar}"
            )));
        }
        if !xu_bar.is_positive() || xu_bar >= one {
            return Err(PammError::Parameter(format!(
                "xu_bar must lie in (0, 1), got {xu_bar}"
            )));
        }
        if !theta_bar.is_positive() || theta_bar >= one {
            return Err(PammError::Parameter(format!(
                "theta_bar must lie in (0, 1), got {theta_bar}"
            )));
        }
        Ok(Self {
            alpha_bar,
            xu_bar,
            theta_bar,
        })
    }

    pub fn alpha_bar(&self) -> Decimal<P> {
        self.alpha_bar
    }

    pub fn xu_bar(&self) -> Decimal<P> {
        self.xu_bar
    }

    pub fn theta_bar(&self) -> Decimal<P> {
        self.theta_bar
    }

    /// Target utilization ceiling `1 - theta_bar`.
    pub fn theta(&self) -> Result<Decimal<P>> {
        Ok(Decimal::<P>::one().checked_sub(self.theta_bar)?)
    }

    /// The same parameters in another precision.
    pub fn to_precision<Q: Precision>(&self) -> Result<Params<Q>> {
        Ok(Params {
            alpha_bar: self.alpha_bar.to_precision()?,
            xu_bar: self.xu_bar.to_precision()?,
            theta_bar: self.theta_bar.to_precision()?,
        })
    }

    /// Anchor reserve (normalized to `y_a = 1`) at which the unconstrained
    /// upper threshold equals `xu`, for slope `alpha_bar`.
    pub fn relative_reserve_for_xu(&self, xu: Decimal<P>) -> Result<Decimal<P>> {
        let one = Decimal::<P>::one();
        let two = Decimal::<P>::from_integer(2);
        let theta = self.theta()?;
        let run = one.checked_sub(xu)?;
        if one.checked_sub(self.alpha_bar.mul_down(run)?)? >= self.theta_bar {
            let drop = self.alpha_bar.div_down(two)?.mul_down(run.mul_down(run)?)?;
            return Ok(one.checked_sub(drop)?);
        }
        let linear = theta.mul_down(run)?;
        let offset = theta
            .mul_down(theta)?
            .div_down(two.mul_down(self.alpha_bar)?)?;
        Ok(one.checked_sub(linear)?.checked_add(offset)?)
    }

    pub fn derived(&self) -> Result<DerivedParams<P>> {
        DerivedParams::new(self)
    }
}

/// Thresholds that depend only on the parameters, normalized to `y_a = 1`.
///
/// They separate the regions of observed states: a state lies in case I
/// when it sits on or above the curve anchored at `anchor_i_ii`, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedParams<P: Precision> {
    /// Anchor reserve separating cases I and II.
    pub anchor_i_ii: Decimal<P>,
    /// Anchor reserve separating cases II and III.
    pub anchor_ii_iii: Decimal<P>,
    /// Lower threshold of the curve anchored at `anchor_i_ii`.
    pub lower_i_ii: Decimal<P>,
    /// Lower threshold of the curve anchored at `anchor_ii_iii`.
    pub lower_ii_iii: Decimal<P>,
    /// Anchor reserve separating sub-cases H and L within case II.
    pub anchor_ii_hl: Decimal<P>,
    pub upper_ii_hl: Decimal<P>,
    pub lower_ii_hl: Decimal<P>,
    /// Anchor reserve separating sub-cases H and L within case III.
    pub anchor_iii_hl: Decimal<P>,
    pub slope_iii_hl: Decimal<P>,
    pub lower_iii_hl: Decimal<P>,
}

impl<P: Precision> DerivedParams<P> {
    pub fn new(params: &Params<P>) -> Result<Self> {
        let one = Decimal::<P>::one();
        let zero = Decimal::<P>::zero();
        let two = Decimal::<P>::from_integer(2);
        let alpha_bar = params.alpha_bar();
        let theta = params.theta()?;

        let anchor_i_ii = params.relative_reserve_for_xu(params.xu_bar())?;
        let anchor_ii_iii = params.relative_reserve_for_xu(zero)?;
        let lower_i_ii =
            compute_lower_redemption_threshold(anchor_i_ii, one, alpha_bar, params.xu_bar())?;
        let lower_ii_iii = compute_lower_redemption_threshold(anchor_ii_iii, one, alpha_bar, zero)?;

        let anchor_ii_hl = one.checked_sub(theta.mul_down(theta)?.div_down(two.mul_down(alpha_bar)?)?)?;
        let upper_ii_hl = compute_upper_redemption_threshold(anchor_ii_hl, one, alpha_bar, params)?;
        let lower_ii_hl =
            compute_lower_redemption_threshold(anchor_ii_hl, one, alpha_bar, upper_ii_hl)?;

        let anchor_iii_hl = one.checked_add(params.theta_bar())?.div_down(two)?;
        let slope_iii_hl = compute_slope(anchor_iii_hl, one, params)?;
        let lower_iii_hl =
            compute_lower_redemption_threshold(anchor_iii_hl, one, slope_iii_hl, zero)?;

        Ok(Self {
            anchor_i_ii,
            anchor_ii_iii,
            lower_i_ii,
            lower_ii_iii,
            anchor_ii_hl,
            upper_ii_hl,
            lower_ii_hl,
            anchor_iii_hl,
            slope_iii_hl,
            lower_iii_hl,
        })
    }

    /// Normalized reserve, at redemption level `x`, of the curve that
    /// separates cases I and II.
    pub fn boundary_i_ii(&self, x: Decimal<P>, params: &Params<P>) -> Result<Decimal<P>> {
        compute_fixed_reserve(
            x,
            self.anchor_i_ii,
            Decimal::one(),
            params.alpha_bar(),
            params.xu_bar(),
            self.lower_i_ii,
        )
    }

    /// Same for the curve separating cases II and III.
    pub fn boundary_ii_iii(&self, x: Decimal<P>, params: &Params<P>) -> Result<Decimal<P>> {
        compute_fixed_reserve(
            x,
            self.anchor_ii_iii,
            Decimal::one(),
            params.alpha_bar(),
            Decimal::zero(),
            self.lower_ii_iii,
        )
    }

    pub fn boundary_ii_hl(&self, x: Decimal<P>, params: &Params<P>) -> Result<Decimal<P>> {
        compute_fixed_reserve(
            x,
            self.anchor_ii_hl,
            Decimal::one(),
            params.alpha_bar(),
            self.upper_ii_hl,
            self.lower_ii_hl,
        )
    }

    pub fn boundary_iii_hl(&self, x: Decimal<P>) -> Result<Decimal<P>> {
        compute_fixed_reserve(
            x,
            self.anchor_iii_hl,
            Decimal::one(),
            self.slope_iii_hl,
            Decimal::zero(),
            self.lower_iii_hl,
        )
    }

    pub fn to_precision<Q: Precision>(&self) -> Result<DerivedParams<Q>> {
        Ok(DerivedParams {
            anchor_i_ii: self.anchor_i_ii.to_precision()?,
            anchor_ii_iii: self.anchor_ii_iii.to_precision()?,
            lower_i_ii: self.lower_i_ii.to_precision()?,
            lower_ii_iii: self.lower_ii_iii.to_precision()?,
            anchor_ii_hl: self.anchor_ii_hl.to_precision()?,
            upper_ii_hl: self.upper_ii_hl.to_precision()?,
            lower_ii_hl: self.lower_ii_hl.to_precision()?,
            anchor_iii_hl: self.anchor_iii_hl.to_precision()?,
            slope_iii_hl: self.slope_iii_hl.to_precision()?,
            lower_iii_hl: self.lower_iii_hl.to_precision()?,
        })
    }
}
