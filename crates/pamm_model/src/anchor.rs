//! Anchor reconstruction
//!
//! The anchor reserve `b_a` is the reserve the curve started from before
//! any redemption. Given an observed state and its region, the curve piece
//! the state sits on has a closed form in `b_a`; solving it for `b_a`
//! recovers the anchor. Everything here is normalized to `y_a = x + y = 1`.
//!
//! With `r = b / y`, `u = 1 - r` and `theta = 1 - theta_bar`:
//!
//! | Region  | `b_a`                                                   |
//! |---------|---------------------------------------------------------|
//! | `i`     | `b + x`                                                 |
//! | `I.ii`  | `b + x - alpha_bar/2 * (x - xu_bar)^2`                  |
//! | `I.iii` | `1 - (1 - xu_bar) * u + u^2 / (2 alpha_bar)`            |
//! | `II.H`  | `1 - alpha_bar/2 * (u / alpha_bar + y/2)^2`             |
//! | `II.L`  | `1 - theta (theta / (2 alpha_bar) + y) + sqrt(2 theta^2 / alpha_bar * (b - theta_bar y))` |
//! | `III.H` | `1 - (y - b) / (1 - x^2)`                               |
//! | `III.L` | `1 - p + sqrt(p^2 - q)`, `p = (y - b + theta)/2`, `q = (y - b) theta + theta^2 x^2 / 4` |

use crate::fixed::{Decimal, Precision};
use crate::fuzzy::{is_ge, is_le, precision_internal};
use crate::params::Params;
use crate::region::{NormalizedState, Region};
use crate::{PammError, Result};

/// Solve the curve piece of `region` for the normalized anchor reserve.
///
/// The result is not range checked; see [`reconstruct_normalized_anchor`].
pub fn solve_normalized_anchor<P: Precision>(
    state: &NormalizedState<P>,
    region: Region,
    params: &Params<P>,
) -> Result<Decimal<P>> {
    let one = Decimal::<P>::one();
    let two = Decimal::<P>::from_integer(2);
    let alpha_bar = params.alpha_bar();
    let xu_bar = params.xu_bar();
    let theta_bar = params.theta_bar();
    let theta = params.theta()?;
    let NormalizedState { x, b, y, ratio } = *state;
    let shortfall = one.checked_sub(ratio)?;

    let anchor = match region {
        Region::Par => b.checked_add(x)?,
        Region::OneDecay => {
            let past = x.checked_sub(xu_bar)?;
            let rebate = alpha_bar.mul_down(past.mul_down(past)?)?.div_down(two)?;
            b.checked_add(x)?.checked_sub(rebate)?
        }
        Region::OneTail => {
            let linear = one.checked_sub(xu_bar)?.mul_down(shortfall)?;
            let curvature = shortfall
                .mul_down(shortfall)?
                .div_down(two.mul_down(alpha_bar)?)?;
            one.checked_sub(linear)?.checked_add(curvature)?
        }
        Region::TwoHigh => {
            let span = shortfall.div_down(alpha_bar)?.checked_add(y.div_down(two)?)?;
            one.checked_sub(alpha_bar.mul_down(span.mul_down(span)?)?.div_down(two)?)?
        }
        Region::TwoLow => {
            let p = theta.mul_down(theta.div_down(two.mul_down(alpha_bar)?)?.checked_add(y)?)?;
            let cushion = b.checked_sub(theta_bar.mul_down(y)?)?;
            let radicand = theta
                .mul_down(theta)?
                .mul_down(two)?
                .div_down(alpha_bar)?
                .mul_down(cushion)?;
            let root = radicand.sqrt_within(precision_internal())?;
            one.checked_sub(p)?.checked_add(root)?
        }
        Region::ThreeHigh => {
            let gap = y.checked_sub(b)?;
            one.checked_sub(gap.div_down(one.checked_sub(x.mul_down(x)?)?)?)?
        }
        Region::ThreeLow => {
            let gap = y.checked_sub(b)?;
            let p = gap.checked_add(theta)?.div_down(two)?;
            let q = gap.mul_down(theta)?.checked_add(
                theta
                    .mul_down(theta)?
                    .mul_down(x.mul_down(x)?)?
                    .div_down(Decimal::from_integer(4))?,
            )?;
            let root = p
                .mul_down(p)?
                .checked_sub(q)?
                .sqrt_within(precision_internal())?;
            one.checked_sub(p.checked_sub(root)?)?
        }
        Region::Low | Region::High => {
            return Err(PammError::Precondition(format!(
                "no anchor to solve for in region {region}"
            )))
        }
    };
    Ok(anchor)
}

/// Solve for the normalized anchor and check it lies in `[b, 1]` up to one
/// unit of 18-digit precision, clamping it into that range.
pub fn reconstruct_normalized_anchor<P: Precision>(
    state: &NormalizedState<P>,
    region: Region,
    params: &Params<P>,
) -> Result<Decimal<P>> {
    let one = Decimal::<P>::one();
    let slack = Decimal::<P>::negative_power_of_ten(18);
    let anchor = solve_normalized_anchor(state, region, params)?;
    if !is_ge(anchor, state.b, slack)? || !is_le(anchor, one, slack)? {
        return Err(PammError::Invariant(format!(
            "anchor {anchor} for region {region} outside [{}, 1]",
            state.b
        )));
    }
    Ok(anchor.max(state.b).min(one))
}
