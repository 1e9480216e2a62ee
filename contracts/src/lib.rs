//! # Strongbox Ledger Core
//!
//! The custodial ledger built on `strongbox-protocol`:
//!
//! - **Bank**: balances, the global cap, the withdraw limit and the role
//!   table behind one lock, with every value movement delegated to an
//!   injected transfer collaborator.
//! - **Registry**: per-token precision and enabled flag.
//! - **Account**: one principal's native and token holdings.
//!
//! ## Design Principles
//!
//! 1. All monetary operations check for overflow. Wrapping arithmetic and
//!    money do not mix.
//! 2. Validation precedes any external effect, and external effects precede
//!    any bookkeeping.
//! 3. Every public view type is serializable (serde) so observers can
//!    consume it without linking this crate.

pub mod account;
pub mod bank;
pub mod registry;

pub use account::Account;
pub use bank::{Bank, Collaborators, LedgerSnapshot, LedgerStats};
pub use registry::{AssetInfo, AssetRegistry};
