//! In-memory token pool backed by a funding allowance.

use std::collections::BTreeMap;

use drip_core::error::ClaimError;
use drip_core::traits::TokenPool;
use drip_core::types::Address;

/// Allowance granted to the distributor, drawn down by transfers.
///
/// Credited amounts accumulate per beneficiary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AllowancePool {
    allowance: u128,
    balances: BTreeMap<Address, u128>,
}

impl AllowancePool {
    pub fn new(allowance: u128) -> Self {
        Self {
            allowance,
            balances: BTreeMap::new(),
        }
    }

    /// Raise the allowance. Saturates at `u128::MAX`.
    pub fn fund(&mut self, amount: u128) {
        self.allowance = self.allowance.saturating_add(amount);
    }

    pub fn balance_of(&self, beneficiary: &Address) -> u128 {
        self.balances.get(beneficiary).copied().unwrap_or(0)
    }

    /// Sum of everything transferred so far.
    pub fn total_paid(&self) -> u128 {
        self.balances
            .values()
            .fold(0u128, |acc, b| acc.saturating_add(*b))
    }
}

impl TokenPool for AllowancePool {
    fn transfer(&mut self, to: &Address, amount: u128) -> Result<(), ClaimError> {
        if amount > self.allowance {
            return Err(ClaimError::InsufficientFunding {
                requested: amount,
                available: self.allowance,
            });
        }
        let credited = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(ClaimError::ArithmeticOverflow)?;
        self.allowance -= amount;
        self.balances.insert(*to, credited);
        Ok(())
    }

    fn available(&self) -> u128 {
        self.allowance
    }
}
