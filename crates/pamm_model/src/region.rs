//! Region classification
//!
//! A region names the closed-form branch of the curve that applies to a
//! state. It is assembled from three pieces:
//!
//! - the major case (I, II, III) says how the anchor's slope and upper
//!   threshold compare with their parameter bounds,
//! - the sub-case (H, L) splits cases II and III by how far the anchor sits
//!   above the floor,
//! - the minor case (i, ii, iii) says which piece of the curve the
//!   redemption level falls on.
//!
//! Two classifiers produce regions. [`classify_anchor`] works from a known
//! anchor `(x, b_a, y_a)`. [`classify_state`] works from the observed
//! `(x, b, y)` alone by comparing it against the curves through the derived
//! anchors, which is what reconstruction needs.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::curve::{
    compute_lower_redemption_threshold, compute_slope_unconstrained,
    compute_upper_redemption_threshold_unconstrained,
};
use crate::fixed::{Decimal, Precision};
use crate::fuzzy::{is_ge, is_le};
use crate::params::{DerivedParams, Params};
use crate::{PammError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MajorCase {
    /// Slope at its lower bound, upper threshold at its cap
    One,
    /// Slope at its lower bound, upper threshold below its cap
    Two,
    /// Slope above its lower bound
    Three,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubCase {
    High,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MinorCase {
    /// `x <= x_U`
    Par,
    /// `x_U < x <= x_L`
    Decay,
    /// `x_L < x`
    Tail,
}

/// Major case, optional sub-case and minor case of an anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionPieces {
    pub major: MajorCase,
    pub sub: Option<SubCase>,
    pub minor: MinorCase,
}

impl RegionPieces {
    pub fn new(major: MajorCase, sub: Option<SubCase>, minor: MinorCase) -> Self {
        Self { major, sub, minor }
    }
}

/// Curve branch of a state.
///
/// Textual forms: `i`, `I.ii`, `I.iii`, `II.H`, `II.L`, `III.H`, `III.L`,
/// plus the sentinels `low` (ratio at or below the floor) and `high`
/// (ratio at or above one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    /// `i`: redemption at par
    #[serde(rename = "i")]
    Par,
    /// `I.ii`
    #[serde(rename = "I.ii")]
    OneDecay,
    /// `I.iii`
    #[serde(rename = "I.iii")]
    OneTail,
    /// `II.H`
    #[serde(rename = "II.H")]
    TwoHigh,
    /// `II.L`
    #[serde(rename = "II.L")]
    TwoLow,
    /// `III.H`
    #[serde(rename = "III.H")]
    ThreeHigh,
    /// `III.L`
    #[serde(rename = "III.L")]
    ThreeLow,
    #[serde(rename = "low")]
    Low,
    #[serde(rename = "high")]
    High,
}

impl Region {
    pub const ALL: [Region; 9] = [
        Region::Par,
        Region::OneDecay,
        Region::OneTail,
        Region::TwoHigh,
        Region::TwoLow,
        Region::ThreeHigh,
        Region::ThreeLow,
        Region::Low,
        Region::High,
    ];

    /// Combine pieces. Rules are tried in order; the first match wins.
    pub fn from_pieces(pieces: RegionPieces) -> Option<Region> {
        use MajorCase::*;
        use MinorCase::*;
        use SubCase::*;

        match (pieces.major, pieces.sub, pieces.minor) {
            (_, _, Par) => Some(Region::Par),
            (One, _, Decay) => Some(Region::OneDecay),
            (One, _, Tail) => Some(Region::OneTail),
            (Two, Some(High), _) => Some(Region::TwoHigh),
            (Two, Some(Low), _) => Some(Region::TwoLow),
            (Three, Some(High), _) => Some(Region::ThreeHigh),
            (Three, Some(Low), _) => Some(Region::ThreeLow),
            _ => None,
        }
    }

    /// Canonical pieces of a curve region; `None` for the sentinels.
    pub fn to_pieces(self) -> Option<RegionPieces> {
        use MajorCase::*;
        use MinorCase::*;

        let pieces = match self {
            Region::Par => RegionPieces::new(One, None, Par),
            Region::OneDecay => RegionPieces::new(One, None, Decay),
            Region::OneTail => RegionPieces::new(One, None, Tail),
            Region::TwoHigh => RegionPieces::new(Two, Some(SubCase::High), Decay),
            Region::TwoLow => RegionPieces::new(Two, Some(SubCase::Low), Decay),
            Region::ThreeHigh => RegionPieces::new(Three, Some(SubCase::High), Decay),
            Region::ThreeLow => RegionPieces::new(Three, Some(SubCase::Low), Decay),
            Region::Low | Region::High => return None,
        };
        Some(pieces)
    }

    pub fn code(self) -> u8 {
        match self {
            Region::Par => 0,
            Region::OneDecay => 1,
            Region::OneTail => 2,
            Region::TwoHigh => 3,
            Region::TwoLow => 4,
            Region::ThreeHigh => 5,
            Region::ThreeLow => 6,
            Region::Low => 10,
            Region::High => 20,
        }
    }

    pub fn from_code(code: u8) -> Option<Region> {
        Region::ALL.into_iter().find(|region| region.code() == code)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Region::Par => "i",
            Region::OneDecay => "I.ii",
            Region::OneTail => "I.iii",
            Region::TwoHigh => "II.H",
            Region::TwoLow => "II.L",
            Region::ThreeHigh => "III.H",
            Region::ThreeLow => "III.L",
            Region::Low => "low",
            Region::High => "high",
        }
    }

    /// Whether the region is a branch of the curve rather than a sentinel.
    pub fn is_curve(self) -> bool {
        !matches!(self, Region::Low | Region::High)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = PammError;

    fn from_str(s: &str) -> Result<Self> {
        Region::ALL
            .into_iter()
            .find(|region| region.as_str() == s)
            .ok_or_else(|| PammError::Precondition(format!("unknown region `{s}`")))
    }
}

fn combine(pieces: RegionPieces) -> Result<Region> {
    Region::from_pieces(pieces)
        .ok_or_else(|| PammError::Invariant(format!("no region for pieces {pieces:?}")))
}

/// `high` when the anchor ratio is at least one, `low` when it is at or
/// below the floor, `None` on the curve.
fn anchor_sentinel<P: Precision>(
    x: Decimal<P>,
    ba: Decimal<P>,
    ya: Decimal<P>,
    params: &Params<P>,
    eps: Decimal<P>,
) -> Result<Option<Region>> {
    if !ya.is_positive() || x.is_negative() || ba.is_negative() || x > ya {
        return Err(PammError::Precondition(format!(
            "anchor outside domain: x = {x}, b_a = {ba}, y_a = {ya}"
        )));
    }
    if ba >= ya {
        return Ok(Some(Region::High));
    }
    if is_le(ba, ya.mul_down(params.theta_bar())?, eps)? {
        return Ok(Some(Region::Low));
    }
    Ok(None)
}

/// Pieces of the anchor `(x, b_a, y_a)`; `None` when the anchor is a
/// sentinel.
pub fn anchor_pieces<P: Precision>(
    x: Decimal<P>,
    ba: Decimal<P>,
    ya: Decimal<P>,
    params: &Params<P>,
    eps: Decimal<P>,
) -> Result<Option<RegionPieces>> {
    if anchor_sentinel(x, ba, ya, params, eps)?.is_some() {
        return Ok(None);
    }

    let one = Decimal::<P>::one();
    let two = Decimal::<P>::from_integer(2);
    let theta = params.theta()?;
    let xu_cap = params.xu_bar().mul_down(ya)?;
    let alpha_floor = params.alpha_bar().div_down(ya)?;

    let alpha_hat = compute_slope_unconstrained(ba, ya, params.theta_bar())?;
    let alpha = alpha_floor.max(alpha_hat);
    let xu_hat = compute_upper_redemption_threshold_unconstrained(ba, ya, alpha, theta)?;
    let xu = xu_cap.min(xu_hat);
    let xl = compute_lower_redemption_threshold(ba, ya, alpha, xu)?;

    let slope_at_floor = is_le(alpha_hat, alpha_floor, eps)?;
    let (major, sub) = if slope_at_floor && is_ge(xu_hat, xu_cap, eps)? {
        (MajorCase::One, None)
    } else if slope_at_floor {
        let drop = alpha.mul_down(ya.checked_sub(ba)?)?;
        let high = is_le(drop, theta.mul_down(theta)?.div_down(two)?, eps)?;
        (MajorCase::Two, Some(if high { SubCase::High } else { SubCase::Low }))
    } else {
        let ratio = ba.div_down(ya)?;
        let split = one.checked_add(params.theta_bar())?.div_down(two)?;
        let high = is_ge(ratio, split, eps)?;
        (MajorCase::Three, Some(if high { SubCase::High } else { SubCase::Low }))
    };

    let minor = if is_le(x, xu, eps)? {
        MinorCase::Par
    } else if is_le(x, xl, eps)? {
        MinorCase::Decay
    } else {
        MinorCase::Tail
    };

    Ok(Some(RegionPieces::new(major, sub, minor)))
}

/// Region of the anchor `(x, b_a, y_a)`.
pub fn classify_anchor<P: Precision>(
    x: Decimal<P>,
    ba: Decimal<P>,
    ya: Decimal<P>,
    params: &Params<P>,
    eps: Decimal<P>,
) -> Result<Region> {
    if let Some(sentinel) = anchor_sentinel(x, ba, ya, params, eps)? {
        return Ok(sentinel);
    }
    match anchor_pieces(x, ba, ya, params, eps)? {
        Some(pieces) => combine(pieces),
        None => Err(PammError::Invariant(format!(
            "anchor ({x}, {ba}, {ya}) has neither pieces nor a sentinel"
        ))),
    }
}

/// Observed state scaled so the anchor supply `x + y` is one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedState<P: Precision> {
    /// `x / y_a`
    pub x: Decimal<P>,
    /// `b / y_a`
    pub b: Decimal<P>,
    /// `y / y_a`
    pub y: Decimal<P>,
    /// `b / y`
    pub ratio: Decimal<P>,
}

impl<P: Precision> NormalizedState<P> {
    pub fn new(x: Decimal<P>, b: Decimal<P>, y: Decimal<P>) -> Result<Self> {
        if !y.is_positive() || x.is_negative() || b.is_negative() {
            return Err(PammError::Precondition(format!(
                "state outside domain: x = {x}, b = {b}, y = {y}"
            )));
        }
        let ya = y.checked_add(x)?;
        Ok(Self {
            x: x.div_down(ya)?,
            b: b.div_down(ya)?,
            y: y.div_down(ya)?,
            ratio: b.div_down(y)?,
        })
    }
}

/// Region of an observed state with `theta_bar < ratio < 1`.
///
/// The state lies in case I when it is on or above the curve through
/// `anchor_i_ii`, in case II when on or above the curve through
/// `anchor_ii_iii`, and in case III otherwise. Sub-cases follow from the
/// curves through the H/L split anchors, where those splits exist.
pub fn classify_state<P: Precision>(
    state: &NormalizedState<P>,
    params: &Params<P>,
    derived: &DerivedParams<P>,
    eps: Decimal<P>,
) -> Result<Region> {
    let one = Decimal::<P>::one();
    let two = Decimal::<P>::from_integer(2);
    let alpha_bar = params.alpha_bar();
    let NormalizedState { x, b, y, ratio } = *state;

    if is_ge(b, derived.boundary_i_ii(x, params)?, eps)? {
        let minor = if is_le(x, params.xu_bar(), eps)? {
            MinorCase::Par
        } else if is_le(
            ratio,
            one.checked_sub(alpha_bar.mul_down(x.checked_sub(params.xu_bar())?)?)?,
            eps,
        )? {
            MinorCase::Decay
        } else {
            MinorCase::Tail
        };
        return combine(RegionPieces::new(MajorCase::One, None, minor));
    }

    if is_ge(b, derived.boundary_ii_iii(x, params)?, eps)? {
        let high = if derived.anchor_ii_hl >= derived.anchor_i_ii {
            false
        } else if derived.anchor_ii_hl <= derived.anchor_ii_iii {
            true
        } else {
            is_ge(b, derived.boundary_ii_hl(x, params)?, eps)?
        };
        let (sub, at_par) = if high {
            let shortfall = y.checked_sub(b)?;
            let allowance = alpha_bar.div_down(two)?.mul_down(y.mul_down(y)?)?;
            (SubCase::High, is_le(shortfall, allowance, eps)?)
        } else {
            let theta = params.theta()?;
            let cushion = b.checked_sub(params.theta_bar().mul_down(y)?)?;
            let needed = theta.mul_down(theta)?.div_down(two.mul_down(alpha_bar)?)?;
            (SubCase::Low, is_ge(cushion, needed, eps)?)
        };
        let minor = if at_par { MinorCase::Par } else { MinorCase::Decay };
        return combine(RegionPieces::new(MajorCase::Two, Some(sub), minor));
    }

    let high = derived.anchor_iii_hl < derived.anchor_ii_iii
        && is_ge(b, derived.boundary_iii_hl(x)?, eps)?;
    let sub = if high { SubCase::High } else { SubCase::Low };
    combine(RegionPieces::new(MajorCase::Three, Some(sub), MinorCase::Decay))
}

#[cfg(kani)]
mod kani_proofs {
    use super::*;

    /// Every curve region survives a round trip through its pieces
    #[kani::proof]
    fn verify_pieces_round_trip() {
        let code: u8 = kani::any();
        kani::assume(code <= 6);

        if let Some(region) = Region::from_code(code) {
            let pieces = region.to_pieces();
            assert!(pieces.is_some());
            if let Some(pieces) = pieces {
                assert!(Region::from_pieces(pieces) == Some(region));
            }
        }
    }

    /// Minor case `i` wins over every major/sub combination
    #[kani::proof]
    fn verify_par_dominates() {
        let major = match kani::any::<u8>() % 3 {
            0 => MajorCase::One,
            1 => MajorCase::Two,
            _ => MajorCase::Three,
        };
        let sub = match kani::any::<u8>() % 3 {
            0 => None,
            1 => Some(SubCase::High),
            _ => Some(SubCase::Low),
        };
        let pieces = RegionPieces::new(major, sub, MinorCase::Par);
        assert!(Region::from_pieces(pieces) == Some(Region::Par));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::{Fp, Fp100, P100};

    fn fp(s: &str) -> Fp {
        s.parse().unwrap()
    }

    fn params(alpha_bar: &str) -> Params {
        Params::new(fp(alpha_bar), fp("0.3"), fp("0.6")).unwrap()
    }

    fn anchor_region(alpha_bar: &str, x: &str, ba: &str) -> Region {
        classify_anchor(fp(x), fp(ba), Fp::one(), &params(alpha_bar), Fp::zero()).unwrap()
    }

    fn state_region(alpha_bar: &str, x: &str, b: &str, y: &str) -> Region {
        let p = params(alpha_bar).to_precision::<P100>().unwrap();
        let derived = p.derived().unwrap();
        let wide = |s: &str| s.parse::<Fp100>().unwrap();
        let state = NormalizedState::new(wide(x), wide(b), wide(y)).unwrap();
        classify_state(&state, &p, &derived, Fp100::zero()).unwrap()
    }

    #[test]
    fn test_text_and_codes() {
        for region in Region::ALL {
            assert_eq!(region.as_str().parse::<Region>().unwrap(), region);
            assert_eq!(Region::from_code(region.code()), Some(region));
        }
        assert_eq!(Region::TwoLow.to_string(), "II.L");
        assert_eq!(Region::Low.code(), 10);
        assert_eq!(Region::High.code(), 20);
        assert!(Region::from_code(7).is_none());
        assert!("IV".parse::<Region>().is_err());
    }

    #[test]
    fn test_serde_uses_text_form() {
        assert_eq!(serde_json::to_string(&Region::OneTail).unwrap(), "\"I.iii\"");
        let region: Region = serde_json::from_str("\"III.H\"").unwrap();
        assert_eq!(region, Region::ThreeHigh);
    }

    #[test]
    fn test_rule_table() {
        use MajorCase::*;
        use MinorCase::*;
        use SubCase::*;

        let table = [
            (RegionPieces::new(Two, Some(Low), Par), Some(Region::Par)),
            (RegionPieces::new(One, None, Decay), Some(Region::OneDecay)),
            (RegionPieces::new(One, None, Tail), Some(Region::OneTail)),
            (RegionPieces::new(Two, Some(Low), Tail), Some(Region::TwoLow)),
            (RegionPieces::new(Three, Some(High), Tail), Some(Region::ThreeHigh)),
            (RegionPieces::new(Three, Some(Low), Tail), Some(Region::ThreeLow)),
            (RegionPieces::new(Two, Some(High), Decay), Some(Region::TwoHigh)),
            (RegionPieces::new(Three, Some(Low), Decay), Some(Region::ThreeLow)),
            (RegionPieces::new(Two, None, Decay), None),
        ];
        for (pieces, expected) in table {
            assert_eq!(Region::from_pieces(pieces), expected, "{pieces:?}");
        }
        for region in Region::ALL {
            match region.to_pieces() {
                Some(pieces) => assert_eq!(Region::from_pieces(pieces), Some(region)),
                None => assert!(!region.is_curve()),
            }
        }
    }

    #[test]
    fn test_anchor_classifier() {
        assert_eq!(anchor_region("1", "0.1", "0.75"), Region::Par);
        assert_eq!(anchor_region("1", "0.2", "0.75"), Region::TwoLow);
        assert_eq!(anchor_region("1", "0.1", "0.61"), Region::ThreeLow);
        assert_eq!(anchor_region("1", "0.3", "0.7"), Region::TwoLow);
        assert_eq!(anchor_region("1", "0.4", "0.85"), Region::OneDecay);
        assert_eq!(anchor_region("1", "0.8", "0.9"), Region::OneTail);
        assert_eq!(anchor_region("0.5", "0.4", "0.85"), Region::TwoHigh);
        assert_eq!(anchor_region("0.3", "0.7", "0.85"), Region::TwoHigh);
        assert_eq!(anchor_region("0.3", "0.7", "0.8499"), Region::ThreeHigh);
        assert_eq!(anchor_region("0.3", "0.7", "0.8501"), Region::TwoHigh);
        assert_eq!(anchor_region("0.3", "0.2", "0.65"), Region::ThreeLow);
    }

    #[test]
    fn test_anchor_tail_keeps_its_case() {
        // x_L of these anchors lies below x, so x is on the floor piece
        assert_eq!(anchor_region("1", "0.1", "0.61"), Region::ThreeLow);
        assert_eq!(anchor_region("1", "0.65", "0.75"), Region::TwoLow);
        let pieces = anchor_pieces(fp("0.65"), fp("0.75"), Fp::one(), &params("1"), Fp::zero())
            .unwrap()
            .unwrap();
        assert_eq!(pieces.minor, MinorCase::Tail);
        assert_eq!(pieces.sub, Some(SubCase::Low));
    }

    #[test]
    fn test_anchor_sentinels() {
        assert_eq!(anchor_region("1", "0.1", "1"), Region::High);
        assert_eq!(anchor_region("1", "0.1", "1.3"), Region::High);
        assert_eq!(anchor_region("1", "0.1", "0.6"), Region::Low);
        assert_eq!(anchor_region("1", "0.1", "0.2"), Region::Low);
        // A tolerance pulls a ratio just above the floor onto it
        let region = classify_anchor(
            fp("0.1"),
            fp("0.6000001"),
            Fp::one(),
            &params("1"),
            fp("0.000001"),
        )
        .unwrap();
        assert_eq!(region, Region::Low);
    }

    #[test]
    fn test_anchor_domain() {
        let p = params("1");
        assert!(classify_anchor(fp("1.1"), fp("0.8"), Fp::one(), &p, Fp::zero()).is_err());
        assert!(classify_anchor(fp("0.1"), fp("0.8"), Fp::zero(), &p, Fp::zero()).is_err());
    }

    #[test]
    fn test_state_classifier() {
        assert_eq!(state_region("1", "0.1", "0.8", "0.9"), Region::Par);
        assert_eq!(state_region("1", "0.1", "0.61", "0.9"), Region::TwoLow);
        assert_eq!(state_region("1", "0.3", "0.45", "0.7"), Region::TwoLow);
        assert_eq!(state_region("1", "0.8", "0.18", "0.2"), Region::OneTail);
        assert_eq!(state_region("1", "0.4", "0.455", "0.6"), Region::OneDecay);
    }

    #[test]
    fn test_state_classifier_is_scale_free() {
        for (x, b, y) in [
            ("0.1", "0.61", "0.9"),
            ("0.3", "0.45", "0.7"),
            ("0.8", "0.18", "0.2"),
            ("0.4", "0.455", "0.6"),
        ] {
            let base = state_region("1", x, b, y);
            let scale = |s: &str| {
                let v: Fp100 = s.parse().unwrap();
                v.mul_down(Fp100::from_integer(1000)).unwrap().to_string()
            };
            assert_eq!(state_region("1", &scale(x), &scale(b), &scale(y)), base);
        }
    }

    #[test]
    fn test_states_on_anchor_curves_match_anchor_regions() {
        // Walk each anchor's curve and compare both classifiers
        for (alpha_bar, ba) in [("1", "0.75"), ("1", "0.85"), ("0.5", "0.85"), ("0.3", "0.85")] {
            let p = params(alpha_bar);
            let wide = p.to_precision::<P100>().unwrap();
            let derived = wide.derived().unwrap();
            for x in ["0.05", "0.2", "0.35", "0.5", "0.65"] {
                let anchor = classify_anchor(fp(x), fp(ba), Fp::one(), &p, Fp::zero()).unwrap();
                if !anchor.is_curve() {
                    continue;
                }
                let b = crate::curve::compute_reserve(fp(x), fp(ba), Fp::one(), &p).unwrap();
                let y = Fp::one().checked_sub(fp(x)).unwrap();
                if b.div_down(y).unwrap() <= p.theta_bar() {
                    continue;
                }
                let state = NormalizedState::new(
                    fp(x).to_precision::<P100>().unwrap(),
                    b.to_precision().unwrap(),
                    y.to_precision().unwrap(),
                )
                .unwrap();
                let observed = classify_state(&state, &wide, &derived, Fp100::zero()).unwrap();
                assert_eq!(observed, anchor, "alpha_bar {alpha_bar} b_a {ba} x {x}");
            }
        }
    }
}
