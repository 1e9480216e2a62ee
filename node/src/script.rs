//! # Operation Scripts
//!
//! A script is a JSON array of operations, each tagged by `op`:
//!
//! ```json
//! [
//!   { "op": "deposit", "principal": "0x…a1", "amount": "1000000000000000000" },
//!   { "op": "withdraw", "principal": "0x…a1", "amount": 500 },
//!   { "op": "set_reverting", "principal": "0x…a1", "reverting": true }
//! ]
//! ```
//!
//! Ledger operations map one-to-one onto [`Bank`](strongbox_contracts::Bank)
//! methods. `fund`, `approve` and `set_reverting` act on the in-memory
//! transfer agent instead, standing in for what happens outside the ledger.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use strongbox_protocol::access::Role;
use strongbox_protocol::primitives::{amount_str, Address, Asset};

/// Errors raised while loading a script.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read script {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse script: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One scripted step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Push native value from the principal's wallet via `deposit`.
    Deposit {
        principal: Address,
        #[serde(with = "amount_str")]
        amount: u128,
    },
    /// Push native value with no call attached (`receive_unsolicited`).
    Receive {
        principal: Address,
        #[serde(with = "amount_str")]
        amount: u128,
    },
    Withdraw {
        principal: Address,
        #[serde(with = "amount_str")]
        amount: u128,
    },
    DepositToken {
        principal: Address,
        token: Address,
        #[serde(with = "amount_str")]
        amount: u128,
        decimals: u8,
    },
    WithdrawToken {
        principal: Address,
        token: Address,
        #[serde(with = "amount_str")]
        amount: u128,
    },
    UpdateWithdrawLimit {
        caller: Address,
        #[serde(with = "amount_str")]
        limit: u128,
    },
    GrantRole {
        caller: Address,
        role: Role,
        target: Address,
    },
    RevokeRole {
        caller: Address,
        role: Role,
        target: Address,
    },
    AddUser {
        caller: Address,
        target: Address,
    },
    RemoveUser {
        caller: Address,
        target: Address,
    },
    RegisterAsset {
        caller: Address,
        token: Address,
        decimals: u8,
    },
    SetAssetEnabled {
        caller: Address,
        token: Address,
        enabled: bool,
    },
    /// Query: on-ledger balance of `asset` (native when omitted).
    Balance {
        principal: Address,
        #[serde(default = "native")]
        asset: Asset,
    },
    /// Query: reference price of `asset`.
    Price { asset: Asset },
    /// Query: canonical value of `amount` wei at the reference price.
    Quote {
        #[serde(with = "amount_str")]
        amount: u128,
    },
    /// Agent: credit an external wallet.
    Fund {
        owner: Address,
        asset: Asset,
        #[serde(with = "amount_str")]
        amount: u128,
    },
    /// Agent: set the ledger's allowance on `owner`'s tokens.
    Approve {
        owner: Address,
        token: Address,
        #[serde(with = "amount_str")]
        amount: u128,
    },
    /// Agent: make transfers to `principal` revert, or stop doing so.
    SetReverting { principal: Address, reverting: bool },
}

fn native() -> Asset {
    Asset::Native
}

impl Operation {
    /// The `op` tag, used as a metric label.
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Deposit { .. } => "deposit",
            Operation::Receive { .. } => "receive",
            Operation::Withdraw { .. } => "withdraw",
            Operation::DepositToken { .. } => "deposit_token",
            Operation::WithdrawToken { .. } => "withdraw_token",
            Operation::UpdateWithdrawLimit { .. } => "update_withdraw_limit",
            Operation::GrantRole { .. } => "grant_role",
            Operation::RevokeRole { .. } => "revoke_role",
            Operation::AddUser { .. } => "add_user",
            Operation::RemoveUser { .. } => "remove_user",
            Operation::RegisterAsset { .. } => "register_asset",
            Operation::SetAssetEnabled { .. } => "set_asset_enabled",
            Operation::Balance { .. } => "balance",
            Operation::Price { .. } => "price",
            Operation::Quote { .. } => "quote",
            Operation::Fund { .. } => "fund",
            Operation::Approve { .. } => "approve",
            Operation::SetReverting { .. } => "set_reverting",
        }
    }
}

/// Parses a script from JSON text.
pub fn parse(text: &str) -> Result<Vec<Operation>, ScriptError> {
    Ok(serde_json::from_str(text)?)
}

/// Reads and parses a script file.
pub fn load(path: &Path) -> Result<Vec<Operation>, ScriptError> {
    let text = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse(&text)
}
