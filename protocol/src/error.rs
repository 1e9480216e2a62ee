//! Error types for ledger operations.
//!
//! Every fallible ledger operation returns a [`LedgerError`]. A failed
//! operation leaves balances, totals, roles and the event log untouched;
//! nothing is retried internally.

use thiserror::Error;

use crate::access::Role;
use crate::normalize::NormalizeError;
use crate::primitives::{Address, Asset};
use crate::transfer::TransferError;

/// Errors surfaced by the ledger to its callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The caller does not hold the role the operation requires.
    #[error("unauthorized: {principal} lacks role {role}")]
    Unauthorized {
        /// The principal that was checked.
        principal: Address,
        /// The role that was required.
        role: Role,
    },

    /// Zero amount, or the deposit would push the total past the bank cap.
    #[error("invalid deposit of {amount}")]
    InvalidDeposit {
        /// The rejected amount, in the asset's own units.
        amount: u128,
    },

    /// Zero amount, above the withdraw limit, or above the native balance.
    #[error("invalid withdrawal of {amount}")]
    InvalidWithdrawal {
        /// The rejected amount, in native units.
        amount: u128,
    },

    /// A token withdrawal exceeds the holder's token balance.
    #[error("insufficient funds: {asset} balance {available}, requested {requested}")]
    InsufficientFunds {
        /// The token being withdrawn.
        asset: Asset,
        /// The holder's balance.
        available: u128,
        /// The amount asked for.
        requested: u128,
    },

    /// The external transfer collaborator reported a failure.
    #[error("transfer failed: {0}")]
    TransferFailed(#[from] TransferError),

    /// An administrative parameter was rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Checked arithmetic on balances, totals or normalization overflowed.
    #[error("arithmetic overflow")]
    ArithmeticOverflow,

    /// The price source could not supply a price.
    #[error("price unavailable for {asset}: {reason}")]
    PriceUnavailable {
        /// The asset that was quoted.
        asset: Asset,
        /// Diagnostic from the price source.
        reason: String,
    },

    /// Deposits of this token have been disabled by an admin.
    #[error("asset {asset} is disabled")]
    AssetDisabled {
        /// The disabled token.
        asset: Asset,
    },
}

impl LedgerError {
    /// Short snake_case name of the variant, for metric labels and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::Unauthorized { .. } => "unauthorized",
            LedgerError::InvalidDeposit { .. } => "invalid_deposit",
            LedgerError::InvalidWithdrawal { .. } => "invalid_withdrawal",
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::TransferFailed(_) => "transfer_failed",
            LedgerError::InvalidConfiguration(_) => "invalid_configuration",
            LedgerError::ArithmeticOverflow => "arithmetic_overflow",
            LedgerError::PriceUnavailable { .. } => "price_unavailable",
            LedgerError::AssetDisabled { .. } => "asset_disabled",
        }
    }
}

impl From<NormalizeError> for LedgerError {
    fn from(_: NormalizeError) -> Self {
        LedgerError::ArithmeticOverflow
    }
}
