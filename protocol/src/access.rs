//! # Role-Based Access Control
//!
//! Two roles gate the ledger: `ADMIN` for configuration and role
//! management, `USER` for moving funds. A principal may hold neither, one,
//! or both. The deployer starts with both.
//!
//! Authorization is an explicit check returning an [`Authorized`] token, so
//! every gated operation reads as `authorize(..)?` before it touches state.
//!
//! Nothing prevents an admin from revoking the last admin role, including
//! their own. That leaves the ledger without administration; it is allowed
//! and logged.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use tracing::warn;

use crate::error::LedgerError;
use crate::primitives::Address;

/// A role a principal can hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Configuration and role management.
    Admin,
    /// Deposits and withdrawals.
    User,
}

impl Role {
    /// Every role, in a stable order.
    pub const ALL: [Role; 2] = [Role::Admin, Role::User];
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("ADMIN"),
            Role::User => f.write_str("USER"),
        }
    }
}

/// Proof that `principal` held `role` when the check ran.
///
/// Only [`AccessControl::authorize`] constructs one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Authorized {
    principal: Address,
    role: Role,
}

impl Authorized {
    /// The principal that passed the check.
    pub fn principal(&self) -> Address {
        self.principal
    }

    /// The role that was checked.
    pub fn role(&self) -> Role {
        self.role
    }
}

/// The role membership relation.
#[derive(Clone, Debug, Default)]
pub struct AccessControl {
    members: HashMap<Role, HashSet<Address>>,
}

impl AccessControl {
    /// Creates the relation with `deployer` holding every role.
    pub fn new(deployer: Address) -> Self {
        let mut members: HashMap<Role, HashSet<Address>> = HashMap::new();
        for role in Role::ALL {
            members.entry(role).or_default().insert(deployer);
        }
        Self { members }
    }

    /// Pure membership lookup.
    pub fn has_role(&self, principal: &Address, role: Role) -> bool {
        self.members
            .get(&role)
            .map_or(false, |set| set.contains(principal))
    }

    /// Checks that `principal` holds `role`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unauthorized`] otherwise.
    pub fn authorize(&self, principal: &Address, role: Role) -> Result<Authorized, LedgerError> {
        if self.has_role(principal, role) {
            Ok(Authorized {
                principal: *principal,
                role,
            })
        } else {
            Err(LedgerError::Unauthorized {
                principal: *principal,
                role,
            })
        }
    }

    /// Grants `role` to `target`. Returns whether membership changed;
    /// granting a held role is a successful no-op.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unauthorized`] unless `caller` is an admin.
    pub fn grant_role(
        &mut self,
        caller: &Address,
        role: Role,
        target: Address,
    ) -> Result<bool, LedgerError> {
        self.authorize(caller, Role::Admin)?;
        Ok(self.members.entry(role).or_default().insert(target))
    }

    /// Revokes `role` from `target`. Returns whether membership changed;
    /// revoking a role that is not held is a successful no-op.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Unauthorized`] unless `caller` is an admin.
    pub fn revoke_role(
        &mut self,
        caller: &Address,
        role: Role,
        target: &Address,
    ) -> Result<bool, LedgerError> {
        self.authorize(caller, Role::Admin)?;
        let removed = self
            .members
            .get_mut(&role)
            .map_or(false, |set| set.remove(target));
        if removed && role == Role::Admin && self.admin_count() == 0 {
            warn!(%caller, %target, "last admin revoked; ledger administration is now locked");
        }
        Ok(removed)
    }

    /// Members of `role`, sorted.
    pub fn members(&self, role: Role) -> BTreeSet<Address> {
        self.members
            .get(&role)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of principals holding `ADMIN`.
    pub fn admin_count(&self) -> usize {
        self.members.get(&Role::Admin).map_or(0, HashSet::len)
    }
}
