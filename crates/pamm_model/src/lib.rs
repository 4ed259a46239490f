//! PAMM Model - redemption pricing for a reserve-backed stablecoin
//!
//! The primary AMM prices redemptions of stablecoin against its reserve
//! along a piecewise curve: one-for-one while the reserve covers the
//! supply, a quadratic discount once redemptions pass an upper threshold,
//! and the plain reserve ratio once the curve reaches its floor.
//!
//! The curve is anchored on the reserve the system would hold had no
//! redemption happened. That anchor is never stored: it is reconstructed
//! from the observed `(x, y, b)` on every call, because supply and reserve
//! move underneath the pricer between calls.
//!
//! Layers, leaves first:
//! - [`fixed`]: checked decimal fixed point at 18, 38 and 100 digits
//! - [`region`]: which closed-form branch of the curve applies
//! - [`curve`]: forward evaluation of reserve and price
//! - [`anchor`]: inverting the curve to recover the anchor reserve
//! - [`pamm`]: the stateful quote/redeem API

pub mod anchor;
pub mod curve;
pub mod fixed;
pub mod fuzzy;
pub mod pamm;
pub mod params;
pub mod region;

pub use curve::{compute_price, compute_reserve, CurveShape};
pub use fixed::{Decimal, Fp, Fp100, Fp38, MathError, Precision, P100, P18, P38};
pub use pamm::{Pamm, PammRecord, PammState};
pub use params::{DerivedParams, Params};
pub use region::{MajorCase, MinorCase, Region, RegionPieces, SubCase};

/// Result alias for PAMM operations
pub type Result<T> = core::result::Result<T, PammError>;

/// Error types for PAMM operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PammError {
    /// Caller passed values outside the documented domain
    #[error("precondition violated: {0}")]
    Precondition(String),
    /// Internal inconsistency; always a bug
    #[error("invariant violated: {0}")]
    Invariant(String),
    /// Arithmetic fault
    #[error("numeric fault: {0}")]
    Numeric(#[from] MathError),
    /// Parameters outside their valid ranges
    #[error("invalid parameter: {0}")]
    Parameter(String),
}
