//! Per-principal balances.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use strongbox_protocol::error::LedgerError;
use strongbox_protocol::primitives::{amount_str, Address};

/// One principal's holdings. Native value is kept in wei; each token in its
/// own smallest unit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(with = "amount_str")]
    pub native: u128,
    #[serde(default, with = "amount_str::map")]
    pub tokens: BTreeMap<Address, u128>,
}

impl Account {
    pub fn token_balance(&self, token: &Address) -> u128 {
        self.tokens.get(token).copied().unwrap_or(0)
    }

    /// Native balance after crediting `amount`.
    pub fn native_after_credit(&self, amount: u128) -> Result<u128, LedgerError> {
        self.native
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)
    }

    /// Token balance after crediting `amount`.
    pub fn token_after_credit(&self, token: &Address, amount: u128) -> Result<u128, LedgerError> {
        self.token_balance(token)
            .checked_add(amount)
            .ok_or(LedgerError::ArithmeticOverflow)
    }

    pub fn set_token(&mut self, token: Address, balance: u128) {
        if balance == 0 {
            self.tokens.remove(&token);
        } else {
            self.tokens.insert(token, balance);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.native == 0 && self.tokens.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAI: Address = Address::from_low_u8(0xda);

    #[test]
    fn credit_is_checked() {
        let acct = Account {
            native: u128::MAX,
            ..Account::default()
        };
        assert_eq!(acct.native_after_credit(1), Err(LedgerError::ArithmeticOverflow));
        assert_eq!(acct.native_after_credit(0), Ok(u128::MAX));
    }

    #[test]
    fn zero_token_balance_is_pruned() {
        let mut acct = Account::default();
        acct.set_token(DAI, 5);
        assert_eq!(acct.token_balance(&DAI), 5);
        acct.set_token(DAI, 0);
        assert!(acct.is_empty());
    }
}
