//! # Authority Registry
//!
//! Role membership for the engine: a single owner plus two independent sets,
//! verifiers (may finalize) and auditors (may read the audit ledger). The
//! owner is a member of both sets from creation.
//!
//! ## Rules
//!
//! - Only the owner mutates membership.
//! - The owner can never be removed from the verifier set, whoever asks.
//!   The owner can be removed from the auditor set.
//! - Adding a present member fails `AlreadyExists`; removing an absent one
//!   fails `NotFound`.
//! - Ownership transfer is a single reassignment. The former owner keeps
//!   whatever set memberships it had but loses every owner-only right.

use std::collections::BTreeSet;

use cav_core::Actor;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// A role an operation may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Engine owner.
    Owner,
    /// Authorized verifier.
    Verifier,
    /// Audit trail reader.
    Auditor,
}

impl Role {
    /// Return the string value for serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Verifier => "verifier",
            Self::Auditor => "auditor",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role-based registry of the owner, verifiers and auditors.
#[derive(Debug, Clone)]
pub struct AuthorityRegistry {
    owner: Actor,
    verifiers: BTreeSet<Actor>,
    auditors: BTreeSet<Actor>,
}

impl AuthorityRegistry {
    /// Create a registry owned by `owner`, who starts as verifier and auditor.
    pub fn new(owner: Actor) -> Self {
        let verifiers = BTreeSet::from([owner.clone()]);
        let auditors = BTreeSet::from([owner.clone()]);
        Self {
            owner,
            verifiers,
            auditors,
        }
    }

    /// The current owner.
    pub fn owner(&self) -> &Actor {
        &self.owner
    }

    /// Whether `actor` is the current owner.
    pub fn is_owner(&self, actor: &Actor) -> bool {
        &self.owner == actor
    }

    /// Whether `actor` is an authorized verifier.
    pub fn is_verifier(&self, actor: &Actor) -> bool {
        self.verifiers.contains(actor)
    }

    /// Whether `actor` is an auditor.
    pub fn is_auditor(&self, actor: &Actor) -> bool {
        self.auditors.contains(actor)
    }

    /// Current verifiers, in order.
    pub fn verifiers(&self) -> impl Iterator<Item = &Actor> {
        self.verifiers.iter()
    }

    /// Current auditors, in order.
    pub fn auditors(&self) -> impl Iterator<Item = &Actor> {
        self.auditors.iter()
    }

    /// Require `caller` to hold `role`.
    ///
    /// # Errors
    ///
    /// [`EngineError::Unauthorized`] if it does not.
    pub fn require(&self, caller: &Actor, role: Role) -> Result<(), EngineError> {
        let held = match role {
            Role::Owner => self.is_owner(caller),
            Role::Verifier => self.is_verifier(caller),
            Role::Auditor => self.is_auditor(caller),
        };
        if held {
            Ok(())
        } else {
            Err(EngineError::Unauthorized {
                caller: caller.clone(),
                role,
            })
        }
    }

    /// Add a verifier. Owner only.
    pub fn add_verifier(&mut self, caller: &Actor, member: Actor) -> Result<(), EngineError> {
        self.require(caller, Role::Owner)?;
        insert_member(&mut self.verifiers, member, Role::Verifier)
    }

    /// Remove a verifier. Owner only; the owner itself cannot be removed.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidInput`] when `member` is the owner, checked
    /// before the caller's role so the guard holds for every caller.
    pub fn remove_verifier(&mut self, caller: &Actor, member: &Actor) -> Result<(), EngineError> {
        if self.is_owner(member) {
            return Err(EngineError::InvalidInput(
                "the owner cannot be removed from the verifier set".into(),
            ));
        }
        self.require(caller, Role::Owner)?;
        remove_member(&mut self.verifiers, member, Role::Verifier)
    }

    /// Add an auditor. Owner only.
    pub fn add_auditor(&mut self, caller: &Actor, member: Actor) -> Result<(), EngineError> {
        self.require(caller, Role::Owner)?;
        insert_member(&mut self.auditors, member, Role::Auditor)
    }

    /// Remove an auditor. Owner only. The owner may remove itself.
    pub fn remove_auditor(&mut self, caller: &Actor, member: &Actor) -> Result<(), EngineError> {
        self.require(caller, Role::Owner)?;
        remove_member(&mut self.auditors, member, Role::Auditor)
    }

    /// Hand ownership to `new_owner`, who joins the verifier and auditor
    /// sets. Returns the former owner.
    ///
    /// # Errors
    ///
    /// [`EngineError::Unauthorized`] unless `caller` is the owner;
    /// [`EngineError::AlreadyExists`] if `new_owner` already owns the engine.
    pub fn transfer_ownership(
        &mut self,
        caller: &Actor,
        new_owner: Actor,
    ) -> Result<Actor, EngineError> {
        self.require(caller, Role::Owner)?;
        if self.is_owner(&new_owner) {
            return Err(EngineError::AlreadyExists(format!("owner {new_owner}")));
        }
        self.verifiers.insert(new_owner.clone());
        self.auditors.insert(new_owner.clone());
        Ok(std::mem::replace(&mut self.owner, new_owner))
    }
}

fn insert_member(set: &mut BTreeSet<Actor>, member: Actor, role: Role) -> Result<(), EngineError> {
    if set.contains(&member) {
        return Err(EngineError::AlreadyExists(format!("{role} {member}")));
    }
    set.insert(member);
    Ok(())
}

fn remove_member(set: &mut BTreeSet<Actor>, member: &Actor, role: Role) -> Result<(), EngineError> {
    if set.remove(member) {
        Ok(())
    } else {
        Err(EngineError::NotFound(format!("{role} {member}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use cav_core::PrincipalId;

    fn actor(name: &str) -> Actor {
        Actor::from(PrincipalId::new(name).unwrap())
    }

    #[test]
    fn owner_starts_in_both_sets() {
        let reg = AuthorityRegistry::new(actor("owner"));
        assert!(reg.is_owner(&actor("owner")));
        assert!(reg.is_verifier(&actor("owner")));
        assert!(reg.is_auditor(&actor("owner")));
        assert!(!reg.is_verifier(&actor("alice")));
    }

    #[test]
    fn add_and_remove_verifier() {
        let owner = actor("owner");
        let mut reg = AuthorityRegistry::new(owner.clone());
        reg.add_verifier(&owner, actor("v1")).unwrap();
        assert!(reg.is_verifier(&actor("v1")));

        let err = reg.add_verifier(&owner, actor("v1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);

        reg.remove_verifier(&owner, &actor("v1")).unwrap();
        let err = reg.remove_verifier(&owner, &actor("v1")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn owner_cannot_leave_verifier_set() {
        let owner = actor("owner");
        let mut reg = AuthorityRegistry::new(owner.clone());
        for caller in [owner.clone(), actor("stranger")] {
            let err = reg.remove_verifier(&caller, &owner).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput);
        }
        assert!(reg.is_verifier(&owner));
    }

    #[test]
    fn owner_can_leave_auditor_set() {
        let owner = actor("owner");
        let mut reg = AuthorityRegistry::new(owner.clone());
        reg.remove_auditor(&owner, &owner).unwrap();
        assert!(!reg.is_auditor(&owner));
        assert!(reg.is_owner(&owner));
    }

    #[test]
    fn non_owner_cannot_mutate() {
        let mut reg = AuthorityRegistry::new(actor("owner"));
        let err = reg.add_auditor(&actor("eve"), actor("eve")).unwrap_err();
        assert_eq!(
            err,
            EngineError::Unauthorized {
                caller: actor("eve"),
                role: Role::Owner
            }
        );
        assert!(!reg.is_auditor(&actor("eve")));
    }

    #[test]
    fn transfer_revokes_former_owner_rights() {
        let old = actor("old");
        let new = actor("new");
        let mut reg = AuthorityRegistry::new(old.clone());

        let former = reg.transfer_ownership(&old, new.clone()).unwrap();
        assert_eq!(former, old);
        assert!(reg.is_owner(&new));
        assert!(reg.is_verifier(&new));
        assert!(reg.is_auditor(&new));

        let err = reg.add_verifier(&old, actor("x")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        // The former owner is no longer guarded.
        reg.remove_verifier(&new, &old).unwrap();
        assert!(!reg.is_verifier(&old));
    }

    #[test]
    fn transfer_to_self_is_rejected() {
        let owner = actor("owner");
        let mut reg = AuthorityRegistry::new(owner.clone());
        let err = reg.transfer_ownership(&owner, owner.clone()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }
}
