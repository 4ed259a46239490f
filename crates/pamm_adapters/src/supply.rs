//! Stablecoin supply sources

use pamm_model::Fp;

use crate::error::{AdapterError, Result};

/// Outstanding stablecoin supply.
pub trait SupplySource {
    fn total_supply(&self) -> Result<Fp>;
}

/// In-memory supply ledger with checked mint and burn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedgerSupply {
    total: Fp,
}

impl LedgerSupply {
    pub fn new(initial: Fp) -> Result<Self> {
        if initial.is_negative() {
            return Err(AdapterError::Supply(format!(
                "initial supply must be non-negative, got {initial}"
            )));
        }
        Ok(Self { total: initial })
    }

    pub fn mint(&mut self, amount: Fp) -> Result<()> {
        check_amount(amount)?;
        self.total = self.total.checked_add(amount)?;
        Ok(())
    }

    pub fn burn(&mut self, amount: Fp) -> Result<()> {
        check_amount(amount)?;
        if amount > self.total {
            return Err(AdapterError::Supply(format!(
                "cannot burn {amount}, only {} outstanding",
                self.total
            )));
        }
        self.total = self.total.checked_sub(amount)?;
        Ok(())
    }
}

impl SupplySource for LedgerSupply {
    fn total_supply(&self) -> Result<Fp> {
        Ok(self.total)
    }
}

fn check_amount(amount: Fp) -> Result<()> {
    if amount.is_negative() {
        return Err(AdapterError::Supply(format!(
            "amount must be non-negative, got {amount}"
        )));
    }
    Ok(())
}
