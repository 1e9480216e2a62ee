//! # Ledger Configuration & Constants
//!
//! Precision constants and the per-deployment parameters a [`LedgerConfig`]
//! carries. The bank cap is fixed at construction; the withdraw limit is the
//! starting value and can later be changed by an admin.

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::primitives::amount_str;

// ---------------------------------------------------------------------------
// Precision
// ---------------------------------------------------------------------------

/// Decimal places of the native value unit (wei per ether).
pub const NATIVE_DECIMALS: u8 = 18;

/// Decimal places of the canonical accounting unit. The bank cap and the
/// running deposit total are kept in this scale, the same one USD-pegged
/// stablecoins use.
pub const CANONICAL_DECIMALS: u8 = 6;

/// One whole native unit in its smallest denomination.
pub const ONE_NATIVE: u128 = 1_000_000_000_000_000_000;

/// One whole canonical unit.
pub const ONE_CANONICAL: u128 = 1_000_000;

// ---------------------------------------------------------------------------
// LedgerConfig
// ---------------------------------------------------------------------------

/// Parameters fixed when a ledger is created.
///
/// Amounts serialize as decimal strings; TOML integers stop at `i64::MAX`,
/// which is only about nine ether in wei.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Ceiling on the sum of all outstanding deposits, in canonical units.
    #[serde(with = "amount_str")]
    pub bank_cap: u128,

    /// Largest native amount a single withdrawal may move.
    #[serde(with = "amount_str")]
    pub withdraw_limit: u128,
}

impl LedgerConfig {
    /// Builds a config. Call [`validate`](Self::validate) before use.
    pub fn new(bank_cap: u128, withdraw_limit: u128) -> Self {
        Self {
            bank_cap,
            withdraw_limit,
        }
    }

    /// Rejects zero caps and zero limits.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidConfiguration`] naming the bad field.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.bank_cap == 0 {
            return Err(LedgerError::InvalidConfiguration(
                "bank_cap must be greater than zero".to_string(),
            ));
        }
        if self.withdraw_limit == 0 {
            return Err(LedgerError::InvalidConfiguration(
                "withdraw_limit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for LedgerConfig {
    /// One million canonical units of capacity, one ether per withdrawal.
    fn default() -> Self {
        Self {
            bank_cap: 1_000_000 * ONE_CANONICAL,
            withdraw_limit: ONE_NATIVE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precision_constants_agree() {
        assert_eq!(ONE_NATIVE, 10u128.pow(u32::from(NATIVE_DECIMALS)));
        assert_eq!(ONE_CANONICAL, 10u128.pow(u32::from(CANONICAL_DECIMALS)));
        assert!(CANONICAL_DECIMALS < NATIVE_DECIMALS);
    }

    #[test]
    fn default_config_is_valid() {
        assert!(LedgerConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_cap_rejected() {
        let err = LedgerConfig::new(0, 1).validate().unwrap_err();
        assert!(matches!(err, LedgerError::InvalidConfiguration(msg) if msg.contains("bank_cap")));
    }

    #[test]
    fn zero_limit_rejected() {
        let err = LedgerConfig::new(1, 0).validate().unwrap_err();
        assert!(matches!(err, LedgerError::InvalidConfiguration(msg) if msg.contains("withdraw_limit")));
    }

    #[test]
    fn parses_from_toml_with_large_amounts() {
        let cfg: LedgerConfig = toml::from_str(
            r#"
            bank_cap = 1000000
            withdraw_limit = "50_000_000_000_000_000_000"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.bank_cap, 1_000_000);
        assert_eq!(cfg.withdraw_limit, 50 * ONE_NATIVE);
    }
}
