//! Reserve value sources

use pamm_model::Fp;
use serde::{Deserialize, Serialize};

use crate::error::{AdapterError, Result};

/// Current value of the reserve backing the stablecoin, in stablecoin units.
pub trait PriceOracle {
    fn reserve_value(&self) -> Result<Fp>;
}

/// Reserve value set by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticPriceOracle {
    value: Fp,
}

impl StaticPriceOracle {
    pub fn new(value: Fp) -> Result<Self> {
        check_non_negative("reserve value", value)?;
        Ok(Self { value })
    }

    pub fn set(&mut self, value: Fp) -> Result<()> {
        check_non_negative("reserve value", value)?;
        self.value = value;
        Ok(())
    }
}

impl PriceOracle for StaticPriceOracle {
    fn reserve_value(&self) -> Result<Fp> {
        Ok(self.value)
    }
}

/// One named reserve asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub name: String,
    pub amount: Fp,
    pub unit_price: Fp,
}

impl Holding {
    pub fn value(&self) -> Result<Fp> {
        Ok(self.amount.mul_down(self.unit_price)?)
    }
}

/// Reserve valued as a basket of holdings: `sum(amount * unit_price)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasketPriceOracle {
    holdings: Vec<Holding>,
}

impl BasketPriceOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holdings(&self) -> &[Holding] {
        &self.holdings
    }

    pub fn add_holding(&mut self, name: &str, amount: Fp, unit_price: Fp) -> Result<()> {
        if self.holdings.iter().any(|h| h.name == name) {
            return Err(AdapterError::Oracle(format!("duplicate holding {name}")));
        }
        check_non_negative("holding amount", amount)?;
        check_non_negative("unit price", unit_price)?;
        self.holdings.push(Holding {
            name: name.to_string(),
            amount,
            unit_price,
        });
        Ok(())
    }

    pub fn set_price(&mut self, name: &str, unit_price: Fp) -> Result<()> {
        check_non_negative("unit price", unit_price)?;
        self.holding_mut(name)?.unit_price = unit_price;
        Ok(())
    }

    pub fn set_amount(&mut self, name: &str, amount: Fp) -> Result<()> {
        check_non_negative("holding amount", amount)?;
        self.holding_mut(name)?.amount = amount;
        Ok(())
    }

    fn holding_mut(&mut self, name: &str) -> Result<&mut Holding> {
        self.holdings
            .iter_mut()
            .find(|h| h.name == name)
            .ok_or_else(|| AdapterError::Oracle(format!("unknown holding {name}")))
    }
}

impl PriceOracle for BasketPriceOracle {
    fn reserve_value(&self) -> Result<Fp> {
        self.holdings.iter().try_fold(Fp::zero(), |total, holding| {
            Ok(total.checked_add(holding.value()?)?)
        })
    }
}

fn check_non_negative(what: &str, value: Fp) -> Result<()> {
    if value.is_negative() {
        return Err(AdapterError::Oracle(format!("{what} must be non-negative, got {value}")));
    }
    Ok(())
}
