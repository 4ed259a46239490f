//! Redemption desk
//!
//! Drives a [`Pamm`] from live collaborators. On every sync the desk reads
//! the reserve value and the outstanding supply, and decays the redemption
//! level by the outflow memory for each block since the last sync:
//!
//! ```text
//!   x(t) = x(t0) * m^(t - t0),   0 < m <= 1
//! ```
//!
//! so old redemptions stop depressing the price over time. The desk does
//! not settle redemptions: after [`RedemptionDesk::redeem`] the caller
//! burns `amount` and pays `value` out of the reserve before the next sync.

use log::{debug, info, warn};
use pamm_model::{Fp, Pamm, Region};
use serde::{Deserialize, Serialize};

use crate::config::{check_outflow_memory, ConfigStore};
use crate::error::{AdapterError, Result};
use crate::oracle::PriceOracle;
use crate::supply::SupplySource;

/// Outcome of one redemption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedemptionReceipt {
    pub amount: Fp,
    pub value: Fp,
    /// Region of the state the redemption was priced from
    pub region: Region,
    pub block: u64,
}

pub struct RedemptionDesk<O, S> {
    pamm: Pamm,
    oracle: O,
    supply: S,
    outflow_memory: Fp,
    last_block: Option<u64>,
}

impl<O: PriceOracle, S: SupplySource> RedemptionDesk<O, S> {
    /// A desk around `pamm`. Its redemption level is kept; `b` and `y` are
    /// replaced on the first sync.
    pub fn new(pamm: Pamm, oracle: O, supply: S, outflow_memory: Fp) -> Result<Self> {
        check_outflow_memory(outflow_memory)?;
        Ok(Self {
            pamm,
            oracle,
            supply,
            outflow_memory,
            last_block: None,
        })
    }

    pub fn from_config<C: ConfigStore>(config: &C, oracle: O, supply: S) -> Result<Self> {
        let pamm = Pamm::new(config.pamm_params()?)?
            .with_region_tolerance(config.region_tolerance()?)?;
        Self::new(pamm, oracle, supply, config.outflow_memory()?)
    }

    pub fn pamm(&self) -> &Pamm {
        &self.pamm
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn oracle_mut(&mut self) -> &mut O {
        &mut self.oracle
    }

    pub fn supply(&self) -> &S {
        &self.supply
    }

    pub fn supply_mut(&mut self) -> &mut S {
        &mut self.supply
    }

    pub fn last_block(&self) -> Option<u64> {
        self.last_block
    }

    /// Pull reserve and supply, decay the redemption level up to `block`.
    pub fn sync(&mut self, block: u64) -> Result<()> {
        self.pamm = self.synced(block)?;
        self.last_block = Some(block);
        Ok(())
    }

    /// Value `amount` would redeem for at `block`. The desk is unchanged.
    pub fn quote(&self, amount: Fp, block: u64) -> Result<Fp> {
        Ok(self.synced(block)?.quote_redeem(amount)?)
    }

    pub fn redeem(&mut self, amount: Fp, block: u64) -> Result<RedemptionReceipt> {
        self.sync(block)?;
        let region = self.pamm.current_region()?;
        let value = self.pamm.apply_redeem(amount)?;
        info!(
            "redeemed {} for {} in region {} at block {}",
            amount, value, region, block
        );
        Ok(RedemptionReceipt {
            amount,
            value,
            region,
            block,
        })
    }

    fn synced(&self, block: u64) -> Result<Pamm> {
        let x = self.decayed_level(block)?;
        let b = self.oracle.reserve_value().map_err(|e| {
            warn!("reserve value unavailable at block {}: {}", block, e);
            e
        })?;
        let y = self.supply.total_supply().map_err(|e| {
            warn!("total supply unavailable at block {}: {}", block, e);
            e
        })?;

        let mut pamm = self.pamm.clone();
        pamm.update_state(x, b, y)?;
        debug!("synced block {}: x = {}, b = {}, y = {}", block, x, b, y);
        Ok(pamm)
    }

    fn decayed_level(&self, block: u64) -> Result<Fp> {
        let x = self.pamm.state().x;
        let Some(last) = self.last_block else {
            return Ok(x);
        };
        let elapsed = block.checked_sub(last).ok_or_else(|| {
            AdapterError::precondition(format!("block {block} is before the last sync at {last}"))
        })?;
        Ok(x.mul_down(decay_factor(self.outflow_memory, elapsed)?)?)
    }
}

/// `memory^elapsed`
fn decay_factor(memory: Fp, mut elapsed: u64) -> Result<Fp> {
    let mut factor = Fp::one();
    if memory == Fp::one() {
        return Ok(factor);
    }
    while elapsed > 0 && !factor.is_zero() {
        let step = u32::try_from(elapsed).unwrap_or(u32::MAX);
        factor = factor.mul_down(memory.pow_int(step)?)?;
        elapsed -= u64::from(step);
    }
    Ok(factor)
}
