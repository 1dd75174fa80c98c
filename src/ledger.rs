//! Chain-local token balance table.
//!
//! Models the ledger the hosting runtime provides to one protocol instance:
//! a per-token balance map with checked transfers. Native currency is held
//! under the router's wrapped-native token id. Each protocol call runs to
//! completion against exactly one ledger, so there is no concurrent
//! mutation within a call.

use crate::errors::{Result, SwapError};
use crate::types::{Address, Amount};
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct Ledger {
    // (token, holder) -> balance
    balances: DashMap<(Address, Address), Amount>,
}

impl Ledger {
    pub fn new() -> Self {
        Self {
            balances: DashMap::new(),
        }
    }

    pub fn balance_of(&self, token: Address, holder: Address) -> Amount {
        self.balances
            .get(&(token, holder))
            .map(|b| *b)
            .unwrap_or(0)
    }

    /// Credits freshly issued units to `to`. Used for seeding test and
    /// genesis state; the protocol core itself never mints.
    pub fn mint(&self, token: Address, to: Address, amount: Amount) -> Result<()> {
        self.credit(token, to, amount)
    }

    /// Moves `amount` of `token` from `from` to `to`, all-or-nothing.
    pub fn transfer(&self, token: Address, from: Address, to: Address, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        // A self-transfer moves nothing but must still be covered.
        let available = self.balance_of(token, from);
        if available < amount {
            return Err(SwapError::InsufficientBalance {
                token,
                holder: from,
                available,
                required: amount,
            });
        }
        if from == to {
            return Ok(());
        }
        // Receiver overflow is checked before the sender is debited so a
        // failed transfer leaves both balances untouched.
        if self.balance_of(token, to).checked_add(amount).is_none() {
            return Err(SwapError::BalanceOverflow { token, holder: to });
        }
        self.debit(token, from, amount)?;
        self.credit(token, to, amount)
    }

    fn debit(&self, token: Address, holder: Address, amount: Amount) -> Result<()> {
        let mut entry = self.balances.entry((token, holder)).or_insert(0);
        let available = *entry;
        if available < amount {
            return Err(SwapError::InsufficientBalance {
                token,
                holder,
                available,
                required: amount,
            });
        }
        *entry = available - amount;
        Ok(())
    }

    fn credit(&self, token: Address, holder: Address, amount: Amount) -> Result<()> {
        let mut entry = self.balances.entry((token, holder)).or_insert(0);
        *entry = entry
            .checked_add(amount)
            .ok_or(SwapError::BalanceOverflow { token, holder })?;
        Ok(())
    }
}
