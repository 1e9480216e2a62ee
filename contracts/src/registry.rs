//! # Asset Registry
//!
//! Records each token's decimal precision and whether new deposits of it are
//! accepted. An asset is either absent (never seen) or present with a fixed
//! precision; zero decimals is a valid precision, not a marker for "unset".
//!
//! Precision is written once, either by an admin through
//! [`AssetRegistry::register`] or by the first deposit's hint, and never
//! changes afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use strongbox_protocol::error::LedgerError;
use strongbox_protocol::normalize::supports_precision;
use strongbox_protocol::primitives::Address;

/// What the ledger knows about one token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    /// Decimal places of the token's smallest unit.
    pub decimals: u8,
    /// Whether new deposits are accepted.
    pub enabled: bool,
}

/// Token address → [`AssetInfo`].
#[derive(Clone, Debug, Default)]
pub struct AssetRegistry {
    assets: BTreeMap<Address, AssetInfo>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, token: &Address) -> Option<AssetInfo> {
        self.assets.get(token).copied()
    }

    pub fn is_registered(&self, token: &Address) -> bool {
        self.assets.contains_key(token)
    }

    /// Records `decimals` for a token seen for the first time. A token that
    /// is already present keeps its precision. Returns whether a new entry
    /// was created.
    pub fn record_first_seen(&mut self, token: Address, decimals: u8) -> bool {
        if self.assets.contains_key(&token) {
            return false;
        }
        self.assets.insert(
            token,
            AssetInfo {
                decimals,
                enabled: true,
            },
        );
        true
    }

    /// Rejects precisions the ledger cannot scale to canonical units.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidConfiguration`] when `decimals` is out of range.
    pub fn check_precision(token: &Address, decimals: u8) -> Result<(), LedgerError> {
        if supports_precision(decimals) {
            Ok(())
        } else {
            Err(LedgerError::InvalidConfiguration(format!(
                "asset {token} precision of {decimals} decimals is out of range"
            )))
        }
    }

    /// Explicit registration. Re-registering with the same precision is a
    /// no-op; a different precision is rejected.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidConfiguration`] on a precision mismatch or an
    /// unsupported precision.
    pub fn register(&mut self, token: Address, decimals: u8) -> Result<bool, LedgerError> {
        Self::check_precision(&token, decimals)?;
        match self.assets.get(&token) {
            Some(info) if info.decimals == decimals => Ok(false),
            Some(info) => Err(LedgerError::InvalidConfiguration(format!(
                "asset {token} already registered with {} decimals, not {decimals}",
                info.decimals
            ))),
            None => Ok(self.record_first_seen(token, decimals)),
        }
    }

    /// Enables or disables deposits. Returns whether the flag changed.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidConfiguration`] if the token is unknown.
    pub fn set_enabled(&mut self, token: &Address, enabled: bool) -> Result<bool, LedgerError> {
        let info = self.assets.get_mut(token).ok_or_else(|| {
            LedgerError::InvalidConfiguration(format!("asset {token} is not registered"))
        })?;
        let changed = info.enabled != enabled;
        info.enabled = enabled;
        Ok(changed)
    }

    /// Registered assets, sorted by address.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, &AssetInfo)> {
        self.assets.iter()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
