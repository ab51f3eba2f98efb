//! Role grants and the emergency pause flag.
//!
//! Each identity holds a set of independent capabilities. There is no
//! hierarchy: holding [`Capability::Admin`] does not imply
//! [`Capability::BridgeAdmin`], and an identity that should do both must be
//! granted both.
//!
//! | Capability    | Gates                                              |
//! |---------------|----------------------------------------------------|
//! | `Admin`       | granting and revoking roles, reserve withdrawal    |
//! | `BridgeAdmin` | chain configuration, resolving outbound entries    |
//! | `Emergency`   | pausing and unpausing the relay                    |
//!
//! # Example
//!
//! ```rust
//! use covrelay_core::access::{AccessControl, Capability};
//! use covrelay_core::types::Address;
//!
//! let admin = Address::repeat_byte(1);
//! let operator = Address::repeat_byte(2);
//!
//! let mut access = AccessControl::with_admin(admin);
//! assert!(access.grant(admin, operator, Capability::Emergency).unwrap());
//! assert!(access.has_role(operator, Capability::Emergency));
//! assert!(!access.has_role(operator, Capability::Admin));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::RelayError;
use crate::types::Address;

// =============================================================================
// Capability
// =============================================================================

/// A single privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Manage roles and withdraw the reserve.
    Admin,
    /// Configure destinations and resolve outbound coverage.
    BridgeAdmin,
    /// Pause and unpause the relay.
    Emergency,
}

impl Capability {
    /// All capabilities, in declaration order.
    pub const ALL: [Self; 3] = [Self::Admin, Self::BridgeAdmin, Self::Emergency];

    /// Snake-case name used in configuration and errors.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::BridgeAdmin => "bridge_admin",
            Self::Emergency => "emergency",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown capability name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown capability: {0}")]
pub struct UnknownCapability(pub String);

impl FromStr for Capability {
    type Err = UnknownCapability;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|capability| capability.as_str() == s)
            .ok_or_else(|| UnknownCapability(s.to_string()))
    }
}

/// The capabilities held by one identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct CapabilitySet {
    /// Holds [`Capability::Admin`].
    pub admin: bool,
    /// Holds [`Capability::BridgeAdmin`].
    pub bridge_admin: bool,
    /// Holds [`Capability::Emergency`].
    pub emergency: bool,
}

impl CapabilitySet {
    /// Every capability.
    pub const ALL: Self = Self {
        admin: true,
        bridge_admin: true,
        emergency: true,
    };

    /// Returns `true` if `capability` is held.
    #[must_use]
    pub const fn contains(&self, capability: Capability) -> bool {
        match capability {
            Capability::Admin => self.admin,
            Capability::BridgeAdmin => self.bridge_admin,
            Capability::Emergency => self.emergency,
        }
    }

    /// Returns `true` if no capability is held.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !(self.admin || self.bridge_admin || self.emergency)
    }

    /// Sets or clears `capability`; returns `true` if the set changed.
    fn set(&mut self, capability: Capability, held: bool) -> bool {
        let slot = match capability {
            Capability::Admin => &mut self.admin,
            Capability::BridgeAdmin => &mut self.bridge_admin,
            Capability::Emergency => &mut self.emergency,
        };
        let changed = *slot != held;
        *slot = held;
        changed
    }
}

// =============================================================================
// AccessControl
// =============================================================================

/// Role assignments plus the pause flag.
#[derive(Debug, Clone, Default)]
pub struct AccessControl {
    roles: HashMap<Address, CapabilitySet>,
    paused: bool,
}

impl AccessControl {
    /// Creates a running relay whose only role holder is `admin`, with every
    /// capability.
    #[must_use]
    pub fn with_admin(admin: Address) -> Self {
        let mut roles = HashMap::new();
        roles.insert(admin, CapabilitySet::ALL);
        Self {
            roles,
            paused: false,
        }
    }

    /// Fails unless `caller` holds `required`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Unauthorized`].
    pub fn require(&self, caller: Address, required: Capability) -> Result<(), RelayError> {
        if self.has_role(caller, required) {
            Ok(())
        } else {
            tracing::warn!(caller = %caller, required = %required, "unauthorized call rejected");
            Err(RelayError::Unauthorized { caller, required })
        }
    }

    /// Grants `capability` to `account`. Returns `true` if it was not held.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Unauthorized`] unless `caller` is an admin.
    pub fn grant(
        &mut self,
        caller: Address,
        account: Address,
        capability: Capability,
    ) -> Result<bool, RelayError> {
        self.require(caller, Capability::Admin)?;
        Ok(self.assign(account, capability))
    }

    /// Revokes `capability` from `account`. Returns `true` if it was held.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Unauthorized`] unless `caller` is an admin.
    pub fn revoke(
        &mut self,
        caller: Address,
        account: Address,
        capability: Capability,
    ) -> Result<bool, RelayError> {
        self.require(caller, Capability::Admin)?;
        let Some(set) = self.roles.get_mut(&account) else {
            return Ok(false);
        };
        let changed = set.set(capability, false);
        if set.is_empty() {
            self.roles.remove(&account);
        }
        Ok(changed)
    }

    /// Grants without an authorization check. Used for bootstrap.
    pub(crate) fn assign(&mut self, account: Address, capability: Capability) -> bool {
        self.roles
            .entry(account)
            .or_default()
            .set(capability, true)
    }

    /// Returns `true` if `account` holds `capability`.
    #[must_use]
    pub fn has_role(&self, account: Address, capability: Capability) -> bool {
        self.roles
            .get(&account)
            .is_some_and(|set| set.contains(capability))
    }

    /// The full capability set of `account`.
    #[must_use]
    pub fn capabilities(&self, account: Address) -> CapabilitySet {
        self.roles.get(&account).copied().unwrap_or_default()
    }

    /// Returns `true` while paused.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Sets the pause flag.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Unauthorized`] unless `caller` holds
    /// [`Capability::Emergency`], and [`RelayError::InvalidStateTransition`]
    /// if the flag already has the requested value.
    pub fn set_paused(&mut self, caller: Address, paused: bool) -> Result<(), RelayError> {
        self.require(caller, Capability::Emergency)?;
        if self.paused == paused {
            let state = pause_state(paused);
            return Err(RelayError::invalid_transition("bridge", state, state));
        }
        self.paused = paused;
        Ok(())
    }

    /// Fails while paused.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::BridgePaused`].
    pub fn ensure_running(&self) -> Result<(), RelayError> {
        if self.paused {
            Err(RelayError::BridgePaused)
        } else {
            Ok(())
        }
    }
}

const fn pause_state(paused: bool) -> &'static str {
    if paused { "paused" } else { "running" }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADMIN: Address = Address::repeat_byte(0xad);
    const ALICE: Address = Address::repeat_byte(0xa1);

    #[test]
    fn test_genesis_admin_holds_everything() {
        let access = AccessControl::with_admin(ADMIN);
        assert_eq!(access.capabilities(ADMIN), CapabilitySet::ALL);
        assert!(access.capabilities(ALICE).is_empty());
    }

    #[test]
    fn test_capabilities_are_independent() {
        let mut access = AccessControl::with_admin(ADMIN);
        access.grant(ADMIN, ALICE, Capability::Admin).unwrap();

        assert!(access.has_role(ALICE, Capability::Admin));
        assert!(!access.has_role(ALICE, Capability::BridgeAdmin));
        assert!(matches!(
            access.set_paused(ALICE, true),
            Err(RelayError::Unauthorized {
                required: Capability::Emergency,
                ..
            })
        ));
    }

    #[test]
    fn test_grant_requires_admin() {
        let mut access = AccessControl::with_admin(ADMIN);
        let err = access
            .grant(ALICE, ALICE, Capability::BridgeAdmin)
            .unwrap_err();
        assert!(matches!(err, RelayError::Unauthorized { caller, .. } if caller == ALICE));
        assert!(!access.has_role(ALICE, Capability::BridgeAdmin));
    }

    #[test]
    fn test_grant_and_revoke_report_changes() {
        let mut access = AccessControl::with_admin(ADMIN);
        assert!(access.grant(ADMIN, ALICE, Capability::Emergency).unwrap());
        assert!(!access.grant(ADMIN, ALICE, Capability::Emergency).unwrap());
        assert!(access.revoke(ADMIN, ALICE, Capability::Emergency).unwrap());
        assert!(!access.revoke(ADMIN, ALICE, Capability::Emergency).unwrap());
        assert!(access.capabilities(ALICE).is_empty());
    }

    #[test]
    fn test_admin_can_revoke_own_role() {
        let mut access = AccessControl::with_admin(ADMIN);
        access.revoke(ADMIN, ADMIN, Capability::Admin).unwrap();
        assert!(access.grant(ADMIN, ALICE, Capability::Admin).is_err());
        assert!(access.has_role(ADMIN, Capability::Emergency));
    }

    #[test]
    fn test_pause_toggle() {
        let mut access = AccessControl::with_admin(ADMIN);
        access.ensure_running().unwrap();

        access.set_paused(ADMIN, true).unwrap();
        assert!(access.is_paused());
        assert!(matches!(
            access.ensure_running(),
            Err(RelayError::BridgePaused)
        ));
        assert!(matches!(
            access.set_paused(ADMIN, true),
            Err(RelayError::InvalidStateTransition { .. })
        ));

        access.set_paused(ADMIN, false).unwrap();
        assert!(!access.is_paused());
        assert!(access.set_paused(ADMIN, false).is_err());
    }

    #[test]
    fn test_capability_names_round_trip() {
        for capability in Capability::ALL {
            assert_eq!(capability.as_str().parse::<Capability>(), Ok(capability));
        }
        assert_eq!(
            "root".parse::<Capability>(),
            Err(UnknownCapability("root".to_string()))
        );
    }
}
