//! # Bank: the Custodial Ledger
//!
//! Holds per-principal balances of native value and tokens, a global deposit
//! cap measured in canonical units, a per-transaction withdraw limit, and
//! the role table that gates every mutation.
//!
//! ## Serialization
//!
//! All mutable state sits in one `LedgerState` behind a single
//! `parking_lot::RwLock`. Mutations take the write lock for their whole
//! duration, including the external transfer, so operations are applied one
//! at a time. Queries take the read lock and always see a fully applied
//! state.
//!
//! ## Two-phase mutations
//!
//! Every operation that moves value runs in three steps while holding the
//! write lock:
//!
//! 1. **validate**: role, amount, limit, balance and cap checks, and every
//!    checked sum the commit will need;
//! 2. **external call**: `send`, `pull` or `push` on a collaborator;
//! 3. **commit**: write the precomputed balances and total, append one
//!    event.
//!
//! Nothing is written before step 2 succeeds, so a failed transfer leaves
//! no trace.
//!
//! ## Precision
//!
//! The cap and the running total are in canonical units (6 decimals). A
//! deposit of `x` adds `to_canonical(x)`; a withdrawal of `x` subtracts the
//! same `to_canonical(x)`. Truncation means many small deposits can add up
//! to less than one large withdrawal of the same sum; the total then
//! saturates at zero.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use strongbox_protocol::access::{AccessControl, Role};
use strongbox_protocol::config::{LedgerConfig, CANONICAL_DECIMALS, NATIVE_DECIMALS};
use strongbox_protocol::error::LedgerError;
use strongbox_protocol::events::{EventDraft, EventKind, EventLog, LedgerEvent};
use strongbox_protocol::normalize::{from_canonical, normalize, to_canonical};
use strongbox_protocol::oracle::{Price, PriceSource, StaticPriceSource};
use strongbox_protocol::primitives::{amount_str, Address, Asset};
use strongbox_protocol::transfer::{AssetTransfer, LocalTransferAgent, NativeTransfer};

use crate::account::Account;
use crate::registry::{AssetInfo, AssetRegistry};

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// The outside world the ledger talks to.
///
/// None of these may call back into the same [`Bank`] from inside a call the
/// bank made: the write lock is held across the call.
#[derive(Clone)]
pub struct Collaborators {
    /// Sends native value out of custody.
    pub native: Arc<dyn NativeTransfer>,
    /// Pulls and pushes tokens.
    pub assets: Arc<dyn AssetTransfer>,
    /// Reference prices for reporting.
    pub prices: Arc<dyn PriceSource>,
}

impl Collaborators {
    /// Wires one in-memory agent for both transfer kinds.
    pub fn local(agent: Arc<LocalTransferAgent>, prices: Arc<StaticPriceSource>) -> Self {
        Self {
            native: agent.clone(),
            assets: agent,
            prices,
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Counts of committed fund movements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStats {
    pub deposits: u64,
    pub withdrawals: u64,
    pub token_deposits: u64,
    pub token_withdrawals: u64,
}

impl LedgerStats {
    /// All committed fund movements.
    pub fn total(&self) -> u64 {
        self.deposits + self.withdrawals + self.token_deposits + self.token_withdrawals
    }
}

/// Serializable point-in-time view of the whole ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    #[serde(with = "amount_str")]
    pub bank_cap: u128,
    #[serde(with = "amount_str")]
    pub total_deposited: u128,
    #[serde(with = "amount_str")]
    pub withdraw_limit: u128,
    pub admins: BTreeSet<Address>,
    pub users: BTreeSet<Address>,
    pub accounts: BTreeMap<Address, Account>,
    pub assets: BTreeMap<Address, AssetInfo>,
    pub last_sequence: u64,
    pub stats: LedgerStats,
}

struct LedgerState {
    access: AccessControl,
    accounts: BTreeMap<Address, Account>,
    registry: AssetRegistry,
    bank_cap: u128,
    total_deposited: u128,
    withdraw_limit: u128,
    events: EventLog,
    stats: LedgerStats,
}

impl LedgerState {
    fn account(&self, principal: &Address) -> Option<&Account> {
        self.accounts.get(principal)
    }

    fn native_balance(&self, principal: &Address) -> u128 {
        self.account(principal).map_or(0, |a| a.native)
    }

    fn token_balance(&self, principal: &Address, token: &Address) -> u128 {
        self.account(principal).map_or(0, |a| a.token_balance(token))
    }

    /// Total after adding `normalized`, or `InvalidDeposit` if that passes
    /// the cap.
    fn total_after_deposit(&self, amount: u128, normalized: u128) -> Result<u128, LedgerError> {
        self.total_deposited
            .checked_add(normalized)
            .filter(|total| *total <= self.bank_cap)
            .ok_or(LedgerError::InvalidDeposit { amount })
    }

    fn total_after_withdrawal(&self, normalized: u128) -> u128 {
        if normalized > self.total_deposited {
            warn!(
                total = %self.total_deposited,
                normalized = %normalized,
                "withdrawal exceeds running total after truncation drift; clamping to zero"
            );
        }
        self.total_deposited.saturating_sub(normalized)
    }

    fn set_native(&mut self, principal: Address, balance: u128) {
        let account = self.accounts.entry(principal).or_default();
        account.native = balance;
        if account.is_empty() {
            self.accounts.remove(&principal);
        }
    }

    fn set_token(&mut self, principal: Address, token: Address, balance: u128) {
        let account = self.accounts.entry(principal).or_default();
        account.set_token(token, balance);
        if account.is_empty() {
            self.accounts.remove(&principal);
        }
    }
}

// ---------------------------------------------------------------------------
// Bank
// ---------------------------------------------------------------------------

/// The ledger. Share it behind an `Arc`; every method takes `&self`.
pub struct Bank {
    state: RwLock<LedgerState>,
    collaborators: Collaborators,
}

impl std::fmt::Debug for Bank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("Bank")
            .field("bank_cap", &state.bank_cap)
            .field("total_deposited", &state.total_deposited)
            .field("withdraw_limit", &state.withdraw_limit)
            .field("accounts", &state.accounts.len())
            .field("events", &state.events.len())
            .finish()
    }
}

/// Logs a rejected operation at debug level and passes the result through.
fn traced<T>(
    op: &'static str,
    principal: &Address,
    result: Result<T, LedgerError>,
) -> Result<T, LedgerError> {
    if let Err(err) = &result {
        debug!(op, %principal, error = %err, "operation rejected");
    }
    result
}

impl Bank {
    /// Creates a ledger with `deployer` holding both `ADMIN` and `USER`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidConfiguration`] if `config` has a zero cap or
    /// limit.
    pub fn new(
        deployer: Address,
        config: LedgerConfig,
        collaborators: Collaborators,
    ) -> Result<Self, LedgerError> {
        config.validate()?;
        info!(
            %deployer,
            bank_cap = %config.bank_cap,
            withdraw_limit = %config.withdraw_limit,
            "ledger created"
        );
        Ok(Self {
            state: RwLock::new(LedgerState {
                access: AccessControl::new(deployer),
                accounts: BTreeMap::new(),
                registry: AssetRegistry::new(),
                bank_cap: config.bank_cap,
                total_deposited: 0,
                withdraw_limit: config.withdraw_limit,
                events: EventLog::new(),
                stats: LedgerStats::default(),
            }),
            collaborators,
        })
    }

    // -- native value --------------------------------------------------------

    /// Credits `amount` wei to `principal`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Unauthorized`] without `USER`.
    /// - [`LedgerError::InvalidDeposit`] for zero, or when the canonical
    ///   value would push the total past the cap.
    pub fn deposit(&self, principal: &Address, amount: u128) -> Result<LedgerEvent, LedgerError> {
        traced("deposit", principal, self.credit_native(principal, amount))
    }

    /// Value pushed to the ledger without an explicit deposit call. Same
    /// rules as [`deposit`](Self::deposit); an error means the incoming
    /// transfer must be bounced (see [`LocalTransferAgent::deliver_native`]).
    pub fn receive_unsolicited(
        &self,
        principal: &Address,
        amount: u128,
    ) -> Result<LedgerEvent, LedgerError> {
        traced("receive", principal, self.credit_native(principal, amount))
    }

    fn credit_native(&self, principal: &Address, amount: u128) -> Result<LedgerEvent, LedgerError> {
        let mut state = self.state.write();
        state.access.authorize(principal, Role::User)?;
        if amount == 0 {
            return Err(LedgerError::InvalidDeposit { amount });
        }
        let normalized = to_canonical(amount, NATIVE_DECIMALS)?;
        let total = state.total_after_deposit(amount, normalized)?;
        let balance = state
            .account(principal)
            .map_or(Ok(amount), |a| a.native_after_credit(amount))?;

        state.set_native(*principal, balance);
        state.total_deposited = total;
        state.stats.deposits += 1;
        let event = state.events.append(EventDraft::movement(
            EventKind::Deposit,
            *principal,
            Asset::Native,
            amount,
        ));
        info!(%principal, amount = %amount, total = %total, seq = event.sequence, "deposit committed");
        Ok(event)
    }

    /// Debits `amount` wei from `principal` and sends it to them.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Unauthorized`] without `USER`.
    /// - [`LedgerError::InvalidWithdrawal`] for zero, above the withdraw
    ///   limit, or above the native balance.
    /// - [`LedgerError::TransferFailed`] if the send fails; nothing changes.
    pub fn withdraw(&self, principal: &Address, amount: u128) -> Result<LedgerEvent, LedgerError> {
        traced("withdraw", principal, self.debit_native(principal, amount))
    }

    fn debit_native(&self, principal: &Address, amount: u128) -> Result<LedgerEvent, LedgerError> {
        let mut state = self.state.write();
        state.access.authorize(principal, Role::User)?;
        let balance = state.native_balance(principal);
        if amount == 0 || amount > state.withdraw_limit || amount > balance {
            return Err(LedgerError::InvalidWithdrawal { amount });
        }
        let normalized = to_canonical(amount, NATIVE_DECIMALS)?;

        self.collaborators.native.send(principal, amount)?;

        let total = state.total_after_withdrawal(normalized);
        state.set_native(*principal, balance - amount);
        state.total_deposited = total;
        state.stats.withdrawals += 1;
        let event = state.events.append(EventDraft::movement(
            EventKind::Withdraw,
            *principal,
            Asset::Native,
            amount,
        ));
        info!(%principal, amount = %amount, total = %total, seq = event.sequence, "withdraw committed");
        Ok(event)
    }

    // -- tokens --------------------------------------------------------------

    /// Pulls `amount` of `token` from `principal` and credits it.
    ///
    /// A token seen for the first time is recorded with `decimals_hint`.
    /// For a known token the hint is ignored.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Unauthorized`] without `USER`.
    /// - [`LedgerError::InvalidDeposit`] for zero or past the cap.
    /// - [`LedgerError::AssetDisabled`] if an admin disabled the token.
    /// - [`LedgerError::InvalidConfiguration`] if a new token's hint is a
    ///   precision the ledger cannot scale.
    /// - [`LedgerError::ArithmeticOverflow`] if the hint scales the amount
    ///   beyond `u128`.
    /// - [`LedgerError::TransferFailed`] if the pull fails.
    pub fn deposit_token(
        &self,
        principal: &Address,
        token: &Address,
        amount: u128,
        decimals_hint: u8,
    ) -> Result<LedgerEvent, LedgerError> {
        traced(
            "deposit_token",
            principal,
            self.credit_token(principal, token, amount, decimals_hint),
        )
    }

    fn credit_token(
        &self,
        principal: &Address,
        token: &Address,
        amount: u128,
        decimals_hint: u8,
    ) -> Result<LedgerEvent, LedgerError> {
        let mut state = self.state.write();
        state.access.authorize(principal, Role::User)?;
        if amount == 0 {
            return Err(LedgerError::InvalidDeposit { amount });
        }
        let decimals = match state.registry.get(token) {
            Some(info) if !info.enabled => {
                return Err(LedgerError::AssetDisabled {
                    asset: Asset::Token(*token),
                })
            }
            Some(info) => {
                if info.decimals != decimals_hint {
                    debug!(%token, recorded = info.decimals, hint = decimals_hint, "precision hint ignored");
                }
                info.decimals
            }
            None => {
                AssetRegistry::check_precision(token, decimals_hint)?;
                decimals_hint
            }
        };
        let normalized = to_canonical(amount, decimals)?;
        let total = state.total_after_deposit(amount, normalized)?;
        let balance = state
            .account(principal)
            .map_or(Ok(amount), |a| a.token_after_credit(token, amount))?;

        self.collaborators.assets.pull(token, principal, amount)?;

        if state.registry.record_first_seen(*token, decimals) {
            state.events.append(
                EventDraft::admin(EventKind::AssetRegistered { decimals }, *principal, *principal)
                    .with_asset(Asset::Token(*token)),
            );
            info!(%token, decimals, "asset registered on first deposit");
        }
        state.set_token(*principal, *token, balance);
        state.total_deposited = total;
        state.stats.token_deposits += 1;
        let event = state.events.append(EventDraft::movement(
            EventKind::DepositToken,
            *principal,
            Asset::Token(*token),
            amount,
        ));
        info!(%principal, %token, amount = %amount, total = %total, seq = event.sequence, "token deposit committed");
        Ok(event)
    }

    /// Debits `amount` of `token` from `principal` and pushes it to them.
    /// The withdraw limit does not apply, and disabled tokens can still be
    /// withdrawn.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::Unauthorized`] without `USER`.
    /// - [`LedgerError::InvalidWithdrawal`] for zero.
    /// - [`LedgerError::InsufficientFunds`] above the token balance.
    /// - [`LedgerError::TransferFailed`] if the push fails; nothing changes.
    pub fn withdraw_token(
        &self,
        principal: &Address,
        token: &Address,
        amount: u128,
    ) -> Result<LedgerEvent, LedgerError> {
        traced(
            "withdraw_token",
            principal,
            self.debit_token(principal, token, amount),
        )
    }

    fn debit_token(
        &self,
        principal: &Address,
        token: &Address,
        amount: u128,
    ) -> Result<LedgerEvent, LedgerError> {
        let mut state = self.state.write();
        state.access.authorize(principal, Role::User)?;
        if amount == 0 {
            return Err(LedgerError::InvalidWithdrawal { amount });
        }
        let balance = state.token_balance(principal, token);
        let insufficient = LedgerError::InsufficientFunds {
            asset: Asset::Token(*token),
            available: balance,
            requested: amount,
        };
        if amount > balance {
            return Err(insufficient);
        }
        // A positive balance implies the token is registered.
        let decimals = state
            .registry
            .get(token)
            .map(|info| info.decimals)
            .ok_or(insufficient)?;
        let normalized = to_canonical(amount, decimals)?;

        self.collaborators.assets.push(token, principal, amount)?;

        let total = state.total_after_withdrawal(normalized);
        state.set_token(*principal, *token, balance - amount);
        state.total_deposited = total;
        state.stats.token_withdrawals += 1;
        let event = state.events.append(EventDraft::movement(
            EventKind::WithdrawToken,
            *principal,
            Asset::Token(*token),
            amount,
        ));
        info!(%principal, %token, amount = %amount, total = %total, seq = event.sequence, "token withdrawal committed");
        Ok(event)
    }

    // -- administration ------------------------------------------------------

    /// Sets the per-transaction native withdraw limit.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Unauthorized`] without `ADMIN`;
    /// [`LedgerError::InvalidConfiguration`] for zero.
    pub fn update_withdraw_limit(
        &self,
        caller: &Address,
        limit: u128,
    ) -> Result<LedgerEvent, LedgerError> {
        traced(
            "update_withdraw_limit",
            caller,
            self.set_withdraw_limit(caller, limit),
        )
    }

    fn set_withdraw_limit(&self, caller: &Address, limit: u128) -> Result<LedgerEvent, LedgerError> {
        let mut state = self.state.write();
        state.access.authorize(caller, Role::Admin)?;
        if limit == 0 {
            return Err(LedgerError::InvalidConfiguration(
                "withdraw_limit must be greater than zero".to_string(),
            ));
        }
        let previous = std::mem::replace(&mut state.withdraw_limit, limit);
        let event = state.events.append(
            EventDraft::admin(EventKind::WithdrawLimitUpdated, *caller, *caller)
                .with_asset(Asset::Native)
                .with_amount(limit),
        );
        info!(%caller, previous = %previous, limit = %limit, "withdraw limit updated");
        Ok(event)
    }

    /// Grants `role` to `target`. Returns the event, or `None` if the role
    /// was already held.
    pub fn grant_role(
        &self,
        caller: &Address,
        role: Role,
        target: Address,
    ) -> Result<Option<LedgerEvent>, LedgerError> {
        traced("grant_role", caller, self.apply_grant(caller, role, target))
    }

    fn apply_grant(
        &self,
        caller: &Address,
        role: Role,
        target: Address,
    ) -> Result<Option<LedgerEvent>, LedgerError> {
        let mut state = self.state.write();
        if !state.access.grant_role(caller, role, target)? {
            return Ok(None);
        }
        info!(%caller, %target, %role, "role granted");
        Ok(Some(state.events.append(EventDraft::admin(
            EventKind::RoleGranted { role },
            *caller,
            target,
        ))))
    }

    /// Revokes `role` from `target`. Returns the event, or `None` if the
    /// role was not held.
    pub fn revoke_role(
        &self,
        caller: &Address,
        role: Role,
        target: &Address,
    ) -> Result<Option<LedgerEvent>, LedgerError> {
        traced("revoke_role", caller, self.apply_revoke(caller, role, target))
    }

    fn apply_revoke(
        &self,
        caller: &Address,
        role: Role,
        target: &Address,
    ) -> Result<Option<LedgerEvent>, LedgerError> {
        let mut state = self.state.write();
        if !state.access.revoke_role(caller, role, target)? {
            return Ok(None);
        }
        info!(%caller, %target, %role, "role revoked");
        Ok(Some(state.events.append(EventDraft::admin(
            EventKind::RoleRevoked { role },
            *caller,
            *target,
        ))))
    }

    /// Grants `USER` to `target`.
    pub fn add_user(
        &self,
        caller: &Address,
        target: Address,
    ) -> Result<Option<LedgerEvent>, LedgerError> {
        self.grant_role(caller, Role::User, target)
    }

    /// Revokes `USER` from `target`. Their balances stay; they just cannot
    /// move them until re-added.
    pub fn remove_user(
        &self,
        caller: &Address,
        target: &Address,
    ) -> Result<Option<LedgerEvent>, LedgerError> {
        self.revoke_role(caller, Role::User, target)
    }

    /// Records `token`'s precision ahead of any deposit.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Unauthorized`] without `ADMIN`;
    /// [`LedgerError::InvalidConfiguration`] if already registered with a
    /// different precision.
    pub fn register_asset(
        &self,
        caller: &Address,
        token: Address,
        decimals: u8,
    ) -> Result<Option<LedgerEvent>, LedgerError> {
        traced(
            "register_asset",
            caller,
            self.apply_registration(caller, token, decimals),
        )
    }

    fn apply_registration(
        &self,
        caller: &Address,
        token: Address,
        decimals: u8,
    ) -> Result<Option<LedgerEvent>, LedgerError> {
        let mut state = self.state.write();
        state.access.authorize(caller, Role::Admin)?;
        if !state.registry.register(token, decimals)? {
            return Ok(None);
        }
        info!(%caller, %token, decimals, "asset registered");
        Ok(Some(state.events.append(
            EventDraft::admin(EventKind::AssetRegistered { decimals }, *caller, *caller)
                .with_asset(Asset::Token(token)),
        )))
    }

    /// Enables or disables new deposits of `token`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Unauthorized`] without `ADMIN`;
    /// [`LedgerError::InvalidConfiguration`] for an unregistered token.
    pub fn set_asset_enabled(
        &self,
        caller: &Address,
        token: &Address,
        enabled: bool,
    ) -> Result<Option<LedgerEvent>, LedgerError> {
        traced(
            "set_asset_enabled",
            caller,
            self.apply_asset_status(caller, token, enabled),
        )
    }

    fn apply_asset_status(
        &self,
        caller: &Address,
        token: &Address,
        enabled: bool,
    ) -> Result<Option<LedgerEvent>, LedgerError> {
        let mut state = self.state.write();
        state.access.authorize(caller, Role::Admin)?;
        if !state.registry.set_enabled(token, enabled)? {
            return Ok(None);
        }
        info!(%caller, %token, enabled, "asset status updated");
        Ok(Some(state.events.append(
            EventDraft::admin(EventKind::AssetStatusUpdated { enabled }, *caller, *caller)
                .with_asset(Asset::Token(*token)),
        )))
    }

    // -- queries -------------------------------------------------------------

    /// Native balance in wei.
    pub fn balance_of(&self, principal: &Address) -> u128 {
        self.state.read().native_balance(principal)
    }

    /// Token balance in the token's smallest unit.
    pub fn token_balance_of(&self, principal: &Address, token: &Address) -> u128 {
        self.state.read().token_balance(principal, token)
    }

    /// Whether `principal` currently holds `role`.
    pub fn has_role(&self, principal: &Address, role: Role) -> bool {
        self.state.read().access.has_role(principal, role)
    }

    /// Largest native amount one withdrawal may move, in wei.
    pub fn withdraw_limit(&self) -> u128 {
        self.state.read().withdraw_limit
    }

    /// Ceiling on outstanding deposits, in canonical units.
    pub fn bank_cap(&self) -> u128 {
        self.state.read().bank_cap
    }

    /// Outstanding deposits across all assets, in canonical units.
    pub fn total_deposited(&self) -> u128 {
        self.state.read().total_deposited
    }

    /// Canonical units still available under the cap.
    pub fn remaining_capacity(&self) -> u128 {
        let state = self.state.read();
        state.bank_cap.saturating_sub(state.total_deposited)
    }

    /// Remaining capacity expressed in wei.
    pub fn remaining_native_capacity(&self) -> Result<u128, LedgerError> {
        Ok(from_canonical(self.remaining_capacity(), NATIVE_DECIMALS)?)
    }

    /// Recorded precision and status of `token`, if it has been seen.
    pub fn asset_info(&self, token: &Address) -> Option<AssetInfo> {
        self.state.read().registry.get(token)
    }

    /// Latest reference price of `asset`. Never consulted for balances.
    ///
    /// # Errors
    ///
    /// [`LedgerError::PriceUnavailable`] when the source fails.
    pub fn get_reference_price(&self, asset: &Asset) -> Result<Price, LedgerError> {
        self.collaborators
            .prices
            .latest_price(asset)
            .map_err(|err| LedgerError::PriceUnavailable {
                asset: *asset,
                reason: err.to_string(),
            })
    }

    /// Reference value of `amount` wei in canonical units, truncated.
    pub fn quote_native(&self, amount: u128) -> Result<u128, LedgerError> {
        let price = self.get_reference_price(&Asset::Native)?;
        let product = amount
            .checked_mul(price.value)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        let scale = NATIVE_DECIMALS
            .checked_add(price.decimals)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        Ok(normalize(product, scale, CANONICAL_DECIMALS)?)
    }

    /// Every recorded event, oldest first.
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.state.read().events.all().to_vec()
    }

    /// Sequence of the newest event, or 0 before the first one.
    pub fn last_sequence(&self) -> u64 {
        self.state.read().events.last_sequence()
    }

    /// Events with a sequence greater than `sequence`.
    pub fn events_since(&self, sequence: u64) -> Vec<LedgerEvent> {
        self.state.read().events.since(sequence).to_vec()
    }

    /// Counts of committed fund movements.
    pub fn stats(&self) -> LedgerStats {
        self.state.read().stats
    }

    /// Consistent copy of the whole ledger.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let state = self.state.read();
        LedgerSnapshot {
            bank_cap: state.bank_cap,
            total_deposited: state.total_deposited,
            withdraw_limit: state.withdraw_limit,
            admins: state.access.members(Role::Admin),
            users: state.access.members(Role::User),
            accounts: state.accounts.clone(),
            assets: state.registry.iter().map(|(k, v)| (*k, *v)).collect(),
            last_sequence: state.events.last_sequence(),
            stats: state.stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strongbox_protocol::config::{ONE_CANONICAL, ONE_NATIVE};

    const DEPLOYER: Address = Address::from_low_u8(1);
    const ALICE: Address = Address::from_low_u8(2);

    fn bank() -> (Bank, Arc<LocalTransferAgent>, Arc<StaticPriceSource>) {
        let agent = Arc::new(LocalTransferAgent::new());
        let prices = Arc::new(StaticPriceSource::new());
        let bank = Bank::new(
            DEPLOYER,
            LedgerConfig::new(1_000_000 * ONE_CANONICAL, 10 * ONE_NATIVE),
            Collaborators::local(agent.clone(), prices.clone()),
        )
        .unwrap();
        (bank, agent, prices)
    }

    #[test]
    fn rejects_invalid_config() {
        let agent = Arc::new(LocalTransferAgent::new());
        let prices = Arc::new(StaticPriceSource::new());
        let err = Bank::new(
            DEPLOYER,
            LedgerConfig::new(0, 1),
            Collaborators::local(agent, prices),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidConfiguration(_)));
    }

    #[test]
    fn deposit_updates_balance_total_and_log() {
        let (bank, _, _) = bank();
        let ev = bank.deposit(&DEPLOYER, 2 * ONE_NATIVE).unwrap();
        assert_eq!(ev.sequence, 1);
        assert_eq!(bank.balance_of(&DEPLOYER), 2 * ONE_NATIVE);
        assert_eq!(bank.total_deposited(), 2 * ONE_CANONICAL);
        assert_eq!(bank.stats().deposits, 1);
    }

    #[test]
    fn empty_accounts_are_dropped() {
        let (bank, agent, _) = bank();
        agent.fund(Asset::Native, DEPLOYER, ONE_NATIVE);
        agent
            .deliver_native(DEPLOYER, ONE_NATIVE, || bank.deposit(&DEPLOYER, ONE_NATIVE))
            .unwrap();
        bank.withdraw(&DEPLOYER, ONE_NATIVE).unwrap();
        assert!(bank.snapshot().accounts.is_empty());
        assert_eq!(agent.wallet_balance(Asset::Native, &DEPLOYER), ONE_NATIVE);
    }

    #[test]
    fn admin_updates_need_admin() {
        let (bank, _, _) = bank();
        assert!(matches!(
            bank.update_withdraw_limit(&ALICE, 5),
            Err(LedgerError::Unauthorized { .. })
        ));
        assert!(matches!(
            bank.update_withdraw_limit(&DEPLOYER, 0),
            Err(LedgerError::InvalidConfiguration(_))
        ));
        let ev = bank.update_withdraw_limit(&DEPLOYER, 5).unwrap();
        assert_eq!(ev.amount, Some(5));
        assert_eq!(bank.withdraw_limit(), 5);
    }

    #[test]
    fn role_events_only_on_change() {
        let (bank, _, _) = bank();
        assert!(bank.add_user(&DEPLOYER, ALICE).unwrap().is_some());
        assert!(bank.add_user(&DEPLOYER, ALICE).unwrap().is_none());
        assert!(bank.remove_user(&DEPLOYER, &ALICE).unwrap().is_some());
        assert!(bank.remove_user(&DEPLOYER, &ALICE).unwrap().is_none());
        assert_eq!(bank.events().len(), 2);
    }

    #[test]
    fn quote_uses_reference_price() {
        let (bank, _, prices) = bank();
        assert!(matches!(
            bank.quote_native(ONE_NATIVE),
            Err(LedgerError::PriceUnavailable { .. })
        ));
        // 2500.00000000 canonical per ether.
        prices.set_price(Asset::Native, Price::new(250_000_000_000, 8));
        assert_eq!(bank.quote_native(ONE_NATIVE).unwrap(), 2_500 * ONE_CANONICAL);
        assert_eq!(bank.quote_native(ONE_NATIVE / 2).unwrap(), 1_250 * ONE_CANONICAL);
    }

    #[test]
    fn remaining_capacity_in_wei() {
        let (bank, _, _) = bank();
        bank.deposit(&DEPLOYER, 999_999 * ONE_NATIVE).unwrap();
        assert_eq!(bank.remaining_capacity(), ONE_CANONICAL);
        assert_eq!(bank.remaining_native_capacity().unwrap(), ONE_NATIVE);
    }

    #[test]
    fn snapshot_serializes() {
        let (bank, _, _) = bank();
        bank.deposit(&DEPLOYER, 7).unwrap();
        let json = serde_json::to_value(bank.snapshot()).unwrap();
        assert_eq!(json["last_sequence"], 1);
        assert_eq!(json["stats"]["deposits"], 1);
        assert!(json["accounts"][DEPLOYER.to_hex()].is_object());
    }

    #[test]
    fn snapshot_carries_amounts_beyond_u64() {
        let (bank, agent, _) = bank();
        let token = Address::from_low_u8(0xee);
        let native = 100 * ONE_NATIVE;
        let tokens = 500 * ONE_NATIVE;
        bank.update_withdraw_limit(&DEPLOYER, 50 * ONE_NATIVE).unwrap();
        bank.deposit(&DEPLOYER, native).unwrap();
        agent.fund(Asset::Token(token), DEPLOYER, tokens);
        agent.approve(token, DEPLOYER, tokens);
        bank.deposit_token(&DEPLOYER, &token, tokens, 18).unwrap();

        let snapshot = bank.snapshot();
        let json = serde_json::to_value(&snapshot).unwrap();
        let account = &json["accounts"][DEPLOYER.to_hex()];
        assert_eq!(account["native"], native.to_string());
        assert_eq!(account["tokens"][token.to_hex()], tokens.to_string());
        assert_eq!(json["withdraw_limit"], (50 * ONE_NATIVE).to_string());
        assert_eq!(json["total_deposited"], (600 * ONE_CANONICAL).to_string());

        let back: LedgerSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }
}
