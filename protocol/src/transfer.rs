//! # External Transfer Collaborators
//!
//! The ledger never moves value itself. It asks a [`NativeTransfer`] to send
//! native value out and an [`AssetTransfer`] to pull tokens in or push them
//! out. Both report failure synchronously; the ledger only commits its own
//! bookkeeping after the collaborator succeeds.
//!
//! The ledger holds its write lock while it calls a collaborator, so an
//! implementation must never call back into the same ledger.
//!
//! [`LocalTransferAgent`] is an in-memory implementation of both traits. It
//! keeps external wallets, token holdings, allowances and the custody
//! balances on the ledger's side, and can be told to make a recipient
//! revert.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

use crate::primitives::{Address, Asset};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why an external transfer did not happen.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// The counterparty refused the transfer (a reverting recipient).
    #[error("transfer rejected: {reason}")]
    Rejected {
        /// Diagnostic from the counterparty.
        reason: String,
    },

    /// A pull exceeded what the owner approved.
    #[error("insufficient allowance for {asset}: approved {approved}, requested {requested}")]
    InsufficientAllowance {
        /// The token being pulled.
        asset: Asset,
        /// Currently approved amount.
        approved: u128,
        /// Amount the ledger tried to pull.
        requested: u128,
    },

    /// The paying side does not hold enough.
    #[error("insufficient funds for {asset}: available {available}, requested {requested}")]
    InsufficientFunds {
        /// The asset being moved.
        asset: Asset,
        /// What the payer holds.
        available: u128,
        /// What was requested.
        requested: u128,
    },

    /// Anything else the transport reports.
    #[error("transport error: {0}")]
    Transport(String),
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Pushes native value from the ledger's custody to a principal.
pub trait NativeTransfer: Send + Sync {
    /// Sends `amount` to `to`.
    fn send(&self, to: &Address, amount: u128) -> Result<(), TransferError>;
}

/// Moves tokens between principals and the ledger's custody.
pub trait AssetTransfer: Send + Sync {
    /// Pulls `amount` of `token` from `from`; needs prior approval by `from`.
    fn pull(&self, token: &Address, from: &Address, amount: u128) -> Result<(), TransferError>;

    /// Pushes `amount` of `token` to `to`.
    fn push(&self, token: &Address, to: &Address, amount: u128) -> Result<(), TransferError>;
}

// ---------------------------------------------------------------------------
// LocalTransferAgent
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct AgentBook {
    wallets: HashMap<(Asset, Address), u128>,
    allowances: HashMap<(Address, Address), u128>,
    custody: HashMap<Asset, u128>,
    reverting: HashSet<Address>,
}

impl AgentBook {
    fn wallet(&self, asset: Asset, holder: &Address) -> u128 {
        self.wallets.get(&(asset, *holder)).copied().unwrap_or(0)
    }

    fn custody(&self, asset: Asset) -> u128 {
        self.custody.get(&asset).copied().unwrap_or(0)
    }

    fn check_recipient(&self, to: &Address) -> Result<(), TransferError> {
        if self.reverting.contains(to) {
            return Err(TransferError::Rejected {
                reason: format!("recipient {to} reverted"),
            });
        }
        Ok(())
    }

    /// Moves `amount` from the ledger's custody to `to`'s wallet.
    fn release(&mut self, asset: Asset, to: &Address, amount: u128) -> Result<(), TransferError> {
        self.check_recipient(to)?;
        let held = self.custody(asset);
        if held < amount {
            return Err(TransferError::InsufficientFunds {
                asset,
                available: held,
                requested: amount,
            });
        }
        let credited = self
            .wallet(asset, to)
            .checked_add(amount)
            .ok_or_else(|| TransferError::Transport("wallet balance overflow".into()))?;
        self.custody.insert(asset, held - amount);
        self.wallets.insert((asset, *to), credited);
        Ok(())
    }

    /// Moves `amount` from `from`'s wallet into the ledger's custody.
    fn collect(&mut self, asset: Asset, from: &Address, amount: u128) -> Result<(), TransferError> {
        let available = self.wallet(asset, from);
        if available < amount {
            return Err(TransferError::InsufficientFunds {
                asset,
                available,
                requested: amount,
            });
        }
        let custody = self
            .custody(asset)
            .checked_add(amount)
            .ok_or_else(|| TransferError::Transport("custody balance overflow".into()))?;
        self.wallets.insert((asset, *from), available - amount);
        self.custody.insert(asset, custody);
        Ok(())
    }
}

/// In-memory stand-in for the chain the ledger runs on.
///
/// Cheap to share behind an `Arc`; all state sits behind one mutex.
#[derive(Debug, Default)]
pub struct LocalTransferAgent {
    book: Mutex<AgentBook>,
}

impl LocalTransferAgent {
    /// Creates an agent with empty wallets and custody.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `holder`'s external wallet out of thin air (faucet).
    pub fn fund(&self, asset: Asset, holder: Address, amount: u128) {
        let mut book = self.book.lock();
        let entry = book.wallets.entry((asset, holder)).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Sets how much of `token` the ledger may pull from `owner`.
    pub fn approve(&self, token: Address, owner: Address, amount: u128) {
        self.book.lock().allowances.insert((token, owner), amount);
    }

    /// Makes every transfer to `principal` fail until cleared.
    pub fn set_reverting(&self, principal: Address, reverting: bool) {
        let mut book = self.book.lock();
        if reverting {
            book.reverting.insert(principal);
        } else {
            book.reverting.remove(&principal);
        }
    }

    /// `holder`'s external (off-ledger) balance of `asset`.
    pub fn wallet_balance(&self, asset: Asset, holder: &Address) -> u128 {
        self.book.lock().wallet(asset, holder)
    }

    /// Remaining approval of `token` from `owner`.
    pub fn allowance(&self, token: &Address, owner: &Address) -> u128 {
        self.book
            .lock()
            .allowances
            .get(&(*token, *owner))
            .copied()
            .unwrap_or(0)
    }

    /// Value of `asset` held on the ledger's side.
    pub fn custody_balance(&self, asset: Asset) -> u128 {
        self.book.lock().custody(asset)
    }

    /// Pushes native value from `from` into the ledger and lets the ledger
    /// decide whether to accept it.
    ///
    /// The sender's wallet is debited and custody credited before `accept`
    /// runs; if `accept` fails, both moves are undone and the incoming
    /// transfer counts as rejected. The lock is released while `accept`
    /// runs, so `accept` is free to call into the ledger.
    pub fn deliver_native<T, E, F>(&self, from: Address, amount: u128, accept: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<TransferError>,
    {
        self.book.lock().collect(Asset::Native, &from, amount)?;

        match accept() {
            Ok(value) => Ok(value),
            Err(err) => {
                let mut book = self.book.lock();
                let custody = book.custody(Asset::Native).saturating_sub(amount);
                book.custody.insert(Asset::Native, custody);
                let wallet = book.wallet(Asset::Native, &from).saturating_add(amount);
                book.wallets.insert((Asset::Native, from), wallet);
                debug!(%from, amount = %amount, "incoming native transfer rejected and reverted");
                Err(err)
            }
        }
    }
}

impl NativeTransfer for LocalTransferAgent {
    fn send(&self, to: &Address, amount: u128) -> Result<(), TransferError> {
        self.book.lock().release(Asset::Native, to, amount)
    }
}

impl AssetTransfer for LocalTransferAgent {
    fn pull(&self, token: &Address, from: &Address, amount: u128) -> Result<(), TransferError> {
        let asset = Asset::Token(*token);
        let mut book = self.book.lock();
        let approved = book
            .allowances
            .get(&(*token, *from))
            .copied()
            .unwrap_or(0);
        if approved < amount {
            return Err(TransferError::InsufficientAllowance {
                asset,
                approved,
                requested: amount,
            });
        }
        book.collect(asset, from, amount)?;
        book.allowances.insert((*token, *from), approved - amount);
        Ok(())
    }

    fn push(&self, token: &Address, to: &Address, amount: u128) -> Result<(), TransferError> {
        self.book.lock().release(Asset::Token(*token), to, amount)
    }
}
