//! # Audit Events
//!
//! Every committed state change appends one [`LedgerEvent`] to the
//! [`EventLog`]. Failed operations append nothing. Sequence numbers start at
//! 1 and increase by one per event, giving external indexers a gap-free
//! ordering marker.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::Role;
use crate::primitives::{Address, Asset};

/// What kind of state change an event records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// Native value credited (explicit deposit or unsolicited receive).
    Deposit,
    /// Native value debited and sent out.
    Withdraw,
    /// Token pulled in and credited.
    DepositToken,
    /// Token debited and pushed out.
    WithdrawToken,
    /// Admin changed the per-transaction withdraw limit.
    WithdrawLimitUpdated,
    /// A role was granted.
    RoleGranted {
        /// The granted role.
        role: Role,
    },
    /// A role was revoked.
    RoleRevoked {
        /// The revoked role.
        role: Role,
    },
    /// An asset's precision was recorded.
    AssetRegistered {
        /// The recorded precision.
        decimals: u8,
    },
    /// Admin enabled or disabled deposits of an asset.
    AssetStatusUpdated {
        /// The new status.
        enabled: bool,
    },
}

/// An immutable record of one committed operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    /// Position in the log, starting at 1.
    pub sequence: u64,

    /// What happened.
    pub kind: EventKind,

    /// The account the event is about (depositor, role target, ...).
    pub principal: Address,

    /// The caller that caused the event. Equal to `principal` for fund
    /// movements; the admin for role and configuration changes.
    pub actor: Address,

    /// The asset involved, if any.
    pub asset: Option<Asset>,

    /// The amount involved, if any, in the asset's own units. For
    /// [`EventKind::WithdrawLimitUpdated`] this is the new limit.
    #[serde(default, with = "crate::primitives::amount_str::option")]
    pub amount: Option<u128>,

    /// Wall-clock time the event was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// Fields of an event before it is sequenced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventDraft {
    /// What happened.
    pub kind: EventKind,
    /// The account the event is about.
    pub principal: Address,
    /// The caller that caused it.
    pub actor: Address,
    /// The asset involved, if any.
    pub asset: Option<Asset>,
    /// The amount involved, if any.
    pub amount: Option<u128>,
}

impl EventDraft {
    /// A fund movement made by `principal` on its own account.
    pub fn movement(kind: EventKind, principal: Address, asset: Asset, amount: u128) -> Self {
        Self {
            kind,
            principal,
            actor: principal,
            asset: Some(asset),
            amount: Some(amount),
        }
    }

    /// An administrative change made by `actor` concerning `principal`.
    pub fn admin(kind: EventKind, actor: Address, principal: Address) -> Self {
        Self {
            kind,
            principal,
            actor,
            asset: None,
            amount: None,
        }
    }

    /// Attaches an asset.
    pub fn with_asset(mut self, asset: Asset) -> Self {
        self.asset = Some(asset);
        self
    }

    /// Attaches an amount.
    pub fn with_amount(mut self, amount: u128) -> Self {
        self.amount = Some(amount);
        self
    }
}

/// Append-only event storage.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Vec<LedgerEvent>,
}

impl EventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequences and stores a draft, returning the stored event.
    pub fn append(&mut self, draft: EventDraft) -> LedgerEvent {
        let event = LedgerEvent {
            sequence: self.last_sequence() + 1,
            kind: draft.kind,
            principal: draft.principal,
            actor: draft.actor,
            asset: draft.asset,
            amount: draft.amount,
            recorded_at: Utc::now(),
        };
        self.events.push(event.clone());
        event
    }

    /// Every event, oldest first.
    pub fn all(&self) -> &[LedgerEvent] {
        &self.events
    }

    /// Events with a sequence strictly greater than `sequence`.
    pub fn since(&self, sequence: u64) -> &[LedgerEvent] {
        // Sequence n lives at index n - 1.
        let start = usize::try_from(sequence).unwrap_or(usize::MAX);
        self.events.get(start..).unwrap_or(&[])
    }

    /// Sequence of the newest event, or 0 when empty.
    pub fn last_sequence(&self) -> u64 {
        self.events.last().map_or(0, |e| e.sequence)
    }

    /// Number of events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Address = Address::from_low_u8(2);
    const ADMIN: Address = Address::from_low_u8(1);

    fn deposit(amount: u128) -> EventDraft {
        EventDraft::movement(EventKind::Deposit, ALICE, Asset::Native, amount)
    }

    #[test]
    fn sequences_start_at_one_and_increase() {
        let mut log = EventLog::new();
        assert_eq!(log.last_sequence(), 0);
        let first = log.append(deposit(1));
        let second = log.append(deposit(2));
        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn since_returns_suffix() {
        let mut log = EventLog::new();
        for i in 1..=5 {
            log.append(deposit(i));
        }
        let tail: Vec<u64> = log.since(3).iter().map(|e| e.sequence).collect();
        assert_eq!(tail, vec![4, 5]);
        assert_eq!(log.since(0).len(), 5);
        assert!(log.since(5).is_empty());
        assert!(log.since(99).is_empty());
    }

    #[test]
    fn admin_draft_carries_actor() {
        let mut log = EventLog::new();
        let ev = log.append(EventDraft::admin(
            EventKind::RoleGranted { role: Role::User },
            ADMIN,
            ALICE,
        ));
        assert_eq!(ev.actor, ADMIN);
        assert_eq!(ev.principal, ALICE);
        assert_eq!(ev.asset, None);
    }

    #[test]
    fn event_json_shape() {
        let mut log = EventLog::new();
        let ev = log.append(deposit(10));
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["kind"]["type"], "deposit");
        assert_eq!(json["asset"], "native");
        assert_eq!(json["sequence"], 1);
        assert_eq!(json["amount"], "10");

        let back: LedgerEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, ev);
    }

    #[test]
    fn amounts_beyond_u64_serialize() {
        let mut log = EventLog::new();
        let amount = u128::from(u64::MAX) * 1_000;
        let ev = log.append(deposit(amount));
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["amount"], amount.to_string());
        assert_eq!(serde_json::from_value::<LedgerEvent>(json).unwrap(), ev);
    }
}
