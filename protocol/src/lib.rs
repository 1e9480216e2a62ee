// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Strongbox Protocol: Core Library
//!
//! The shared vocabulary of the Strongbox custodial ledger: who the
//! principals are, what assets exist, how amounts of different precision
//! are compared, who may do what, and how the ledger talks to the outside
//! world.
//!
//! ## Modules
//!
//! - **primitives**: `Address`, `Asset` and the amount serde helper.
//! - **normalize**: decimal-precision conversion with explicit truncation.
//! - **access**: the `ADMIN` / `USER` role relation.
//! - **events**: the append-only audit log.
//! - **transfer**: native and token transfer collaborators, plus an
//!   in-memory agent.
//! - **oracle**: read-only reference prices.
//! - **config**: precision constants and `LedgerConfig`.
//! - **error**: `LedgerError`.
//!
//! ## Ground Rules
//!
//! 1. Every balance change uses checked arithmetic.
//! 2. A failed operation changes nothing, including the event log.
//! 3. Value moves out only after the ledger has validated the request, and
//!    the ledger's books change only after value has moved.

pub mod access;
pub mod config;
pub mod error;
pub mod events;
pub mod normalize;
pub mod oracle;
pub mod primitives;
pub mod transfer;

pub use access::{AccessControl, Authorized, Role};
pub use config::{LedgerConfig, CANONICAL_DECIMALS, NATIVE_DECIMALS};
pub use error::LedgerError;
pub use events::{EventDraft, EventKind, EventLog, LedgerEvent};
pub use oracle::{Price, PriceError, PriceSource, StaticPriceSource};
pub use primitives::{Address, Asset};
pub use transfer::{AssetTransfer, LocalTransferAgent, NativeTransfer, TransferError};
