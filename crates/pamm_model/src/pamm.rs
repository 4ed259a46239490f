//! PAMM state machine
//!
//! Holds the observed state `(x, y, b)` and prices redemptions against it.
//! The anchor reserve is reconstructed on every call, never cached, since
//! the surrounding system may move `b` and `y` between calls.

use serde::{Deserialize, Serialize};

use crate::anchor::reconstruct_normalized_anchor;
use crate::curve::{compute_price, compute_reserve};
use crate::fixed::{Fp, Fp100, Fp38, P100, P18, P38};
use crate::fuzzy::{is_le, precision_input, precision_internal};
use crate::params::{DerivedParams, Params};
use crate::region::{classify_state, NormalizedState, Region};
use crate::{PammError, Result};

/// Observed state: redemption level, outstanding supply, reserve value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PammState {
    pub x: Fp,
    pub y: Fp,
    pub b: Fp,
}

impl PammState {
    pub fn new(x: Fp, y: Fp, b: Fp) -> Result<Self> {
        if x.is_negative() || y.is_negative() || b.is_negative() {
            return Err(PammError::Precondition(format!(
                "state must be non-negative: x = {x}, y = {y}, b = {b}"
            )));
        }
        Ok(Self { x, y, b })
    }
}

/// Stable serialized form of a PAMM: parameters and state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PammRecord {
    pub alpha_bar: Fp,
    pub xu_bar: Fp,
    pub theta_bar: Fp,
    pub x: Fp,
    pub y: Fp,
    pub b: Fp,
}

#[derive(Debug, Clone)]
pub struct Pamm {
    params: Params,
    /// Parameters at the forward evaluation precision
    mid_params: Params<P38>,
    /// Parameters and thresholds at the reconstruction precision
    wide_params: Params<P100>,
    wide_derived: DerivedParams<P100>,
    region_tolerance: Fp100,
    state: PammState,
}

impl Pamm {
    /// A PAMM at state `(0, 0, 0)`.
    pub fn new(params: Params) -> Result<Self> {
        let wide_params = params.to_precision::<P100>()?;
        Ok(Self {
            params,
            mid_params: params.to_precision()?,
            wide_derived: wide_params.derived()?,
            wide_params,
            region_tolerance: Fp100::zero(),
            state: PammState::default(),
        })
    }

    /// Tolerance applied to every comparison of the state classifier.
    pub fn with_region_tolerance(mut self, tolerance: Fp) -> Result<Self> {
        if tolerance.is_negative() {
            return Err(PammError::Parameter(format!(
                "region tolerance must be non-negative, got {tolerance}"
            )));
        }
        self.region_tolerance = tolerance.to_precision()?;
        Ok(self)
    }

    pub fn region_tolerance(&self) -> Result<Fp> {
        Ok(self.region_tolerance.to_precision()?)
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Replace the parameters. Only allowed before the first redemption.
    pub fn set_params(&mut self, params: Params) -> Result<()> {
        if !self.state.x.is_zero() {
            return Err(PammError::Precondition(format!(
                "parameters are fixed once redemptions happened (x = {})",
                self.state.x
            )));
        }
        let mut next = Self::new(params)?;
        next.region_tolerance = self.region_tolerance;
        next.state = self.state;
        *self = next;
        Ok(())
    }

    pub fn derived_params(&self) -> Result<DerivedParams<P18>> {
        self.wide_derived.to_precision()
    }

    pub fn state(&self) -> PammState {
        self.state
    }

    /// Overwrite the state after mints, burns or a reserve revaluation.
    pub fn update_state(&mut self, x: Fp, b: Fp, y: Fp) -> Result<()> {
        self.state = PammState::new(x, y, b)?;
        Ok(())
    }

    pub fn record(&self) -> PammRecord {
        PammRecord {
            alpha_bar: self.params.alpha_bar(),
            xu_bar: self.params.xu_bar(),
            theta_bar: self.params.theta_bar(),
            x: self.state.x,
            y: self.state.y,
            b: self.state.b,
        }
    }

    pub fn from_record(record: &PammRecord) -> Result<Self> {
        let params = Params::new(record.alpha_bar, record.xu_bar, record.theta_bar)?;
        let mut pamm = Self::new(params)?;
        pamm.update_state(record.x, record.b, record.y)?;
        Ok(pamm)
    }

    /// `x + y`
    pub fn anchor_supply(&self) -> Result<Fp> {
        Ok(self.state.x.checked_add(self.state.y)?)
    }

    /// `b / y`
    pub fn reserve_ratio(&self) -> Result<Fp> {
        if self.state.y.is_zero() {
            return Err(PammError::Precondition("no outstanding supply".into()));
        }
        Ok(self.state.b.div_down(self.state.y)?)
    }

    /// Region of an arbitrary observed state.
    pub fn region_of(&self, x: Fp, b: Fp, y: Fp) -> Result<Region> {
        check_observed(x, b, y)?;
        if b >= y {
            return Ok(Region::High);
        }
        let ratio = b.div_down(y)?;
        if is_le(ratio, self.params.theta_bar(), precision_input())? {
            return Ok(Region::Low);
        }
        let state = NormalizedState::new(wide(x)?, wide(b)?, wide(y)?)?;
        classify_state(
            &state,
            &self.wide_params,
            &self.wide_derived,
            self.region_tolerance,
        )
    }

    pub fn current_region(&self) -> Result<Region> {
        let PammState { x, y, b } = self.state;
        self.region_of(x, b, y)
    }

    /// Anchor reserve of an observed state; `None` at or below the floor,
    /// where the curve cannot be inverted.
    pub fn reconstruct_anchor(&self, x: Fp, b: Fp, y: Fp) -> Result<Option<Fp>> {
        Ok(self
            .wide_anchor(x, b, y)?
            .map(|anchor| anchor.to_precision())
            .transpose()?)
    }

    pub fn anchor_reserve(&self) -> Result<Option<Fp>> {
        let PammState { x, y, b } = self.state;
        self.reconstruct_anchor(x, b, y)
    }

    /// Marginal redemption price at the current state.
    pub fn spot_price(&self) -> Result<Fp> {
        let PammState { x, y, b } = self.state;
        check_observed(x, b, y)?;
        if b >= y {
            return Ok(Fp::one());
        }
        let Some(anchor) = self.wide_anchor(x, b, y)? else {
            return Ok(b.div_down(y)?);
        };
        let ya: Fp38 = x.checked_add(y)?.to_precision()?;
        let price = compute_price(x.to_precision()?, anchor.to_precision()?, ya, &self.mid_params)?;
        Ok(price.to_precision()?)
    }

    /// Reserve value paid out for redeeming `amount`. Does not change state.
    pub fn quote_redeem(&self, amount: Fp) -> Result<Fp> {
        if amount.is_negative() {
            return Err(PammError::Precondition(format!(
                "redeem amount must be non-negative, got {amount}"
            )));
        }
        if amount.is_zero() {
            return Ok(Fp::zero());
        }
        let PammState { x, y, b } = self.state;
        if !y.is_positive() {
            return Err(PammError::Precondition("no outstanding supply".into()));
        }
        if amount > y {
            return Err(PammError::Precondition(format!(
                "redeem amount {amount} exceeds supply {y}"
            )));
        }

        if b >= y {
            return Ok(amount);
        }
        let ratio = b.div_down(y)?;
        if is_le(ratio, self.params.theta_bar(), precision_input())? {
            return Ok(ratio.mul_down(amount)?);
        }

        let anchor = self.wide_anchor(x, b, y)?.ok_or_else(|| {
            PammError::Invariant(format!("no anchor above the floor for ({x}, {b}, {y})"))
        })?;
        let ya: Fp38 = x.checked_add(y)?.to_precision()?;
        let next_x: Fp38 = x.checked_add(amount)?.to_precision()?;
        let next_b = compute_reserve(next_x, anchor.to_precision()?, ya, &self.mid_params)?;
        let value = b.checked_sub(next_b.to_precision()?)?;
        clamp_quote(value, amount)
    }

    /// Redeem `amount`: `(x, y, b) <- (x + amount, y - amount, b - value)`.
    pub fn apply_redeem(&mut self, amount: Fp) -> Result<Fp> {
        let value = self.quote_redeem(amount)?;
        let PammState { x, y, b } = self.state;
        self.state = PammState::new(
            x.checked_add(amount)?,
            y.checked_sub(amount)?,
            b.checked_sub(value)?,
        )?;
        Ok(value)
    }

    /// Non-normalized anchor at 100 digits.
    fn wide_anchor(&self, x: Fp, b: Fp, y: Fp) -> Result<Option<Fp100>> {
        let region = self.region_of(x, b, y)?;
        match region {
            Region::High => Ok(Some(wide(b.checked_add(x)?)?)),
            Region::Low => Ok(None),
            _ => {
                let state = NormalizedState::new(wide(x)?, wide(b)?, wide(y)?)?;
                let normalized = reconstruct_normalized_anchor(&state, region, &self.wide_params)?;
                Ok(Some(normalized.mul_down(wide(x.checked_add(y)?)?)?))
            }
        }
    }
}

fn wide(value: Fp) -> Result<Fp100> {
    Ok(value.to_precision()?)
}

fn check_observed(x: Fp, b: Fp, y: Fp) -> Result<()> {
    if !y.is_positive() {
        return Err(PammError::Precondition(format!(
            "outstanding supply must be positive, got {y}"
        )));
    }
    if x.is_negative() || b.is_negative() {
        return Err(PammError::Precondition(format!(
            "state must be non-negative: x = {x}, b = {b}"
        )));
    }
    Ok(())
}

/// Pull a quote that rounding pushed just outside `[0, amount]` back in.
fn clamp_quote(value: Fp, amount: Fp) -> Result<Fp> {
    let slack = precision_internal();
    if value.is_negative() {
        if value.abs() <= slack {
            return Ok(Fp::zero());
        }
    } else if value > amount {
        if value.checked_sub(amount)? <= slack {
            return Ok(amount);
        }
    } else {
        return Ok(value);
    }
    Err(PammError::Invariant(format!(
        "quote {value} outside [0, {amount}]"
    )))
}
