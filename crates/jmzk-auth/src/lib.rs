//! Authorization engine (C8): determines whether a set of signing keys
//! satisfies a `permission_def`, routing through nested groups and the
//! "owner" pseudo-group, and tracking which signing keys were actually
//! used so the processor can reject transactions carrying signatures
//! nothing authorized.
//!
//! Storage-agnostic by design: callers supply `GroupResolver`/
//! `OwnerResolver` implementations backed by whatever TDB handle they
//! hold, the same way the group/owner lookups were passed in as
//! callbacks rather than baked into the checker.

use jmzk_chain_core::{AuthorizerRef, Group, JmzkError, Name128, PermissionDef, PublicKeyBytes, Result};

pub trait GroupResolver {
    fn resolve_group(&self, name: &Name128) -> Result<Group>;
}

pub trait OwnerResolver {
    fn resolve_owner(&self, domain: &Name128, key: &Name128) -> Result<Vec<PublicKeyBytes>>;
}

pub struct AuthorizationChecker<'a> {
    signing_keys: Vec<PublicKeyBytes>,
    used: Vec<bool>,
    groups: &'a dyn GroupResolver,
    owners: &'a dyn OwnerResolver,
}

impl<'a> AuthorizationChecker<'a> {
    pub fn new(
        signing_keys: Vec<PublicKeyBytes>,
        groups: &'a dyn GroupResolver,
        owners: &'a dyn OwnerResolver,
    ) -> Self {
        let used = vec![false; signing_keys.len()];
        AuthorizationChecker { signing_keys, used, groups, owners }
    }

    fn mark_used(&mut self, key: &PublicKeyBytes) -> bool {
        match self.signing_keys.iter().position(|k| k == key) {
            Some(idx) => {
                self.used[idx] = true;
                true
            }
            None => false,
        }
    }

    /// `domain`/`key` identify the action's target token, needed to
    /// resolve `AuthorizerRef::Owner`. Keys marked used while probing an
    /// authorizer that ultimately doesn't push the total over threshold
    /// are reverted before returning, so a failed check never leaks
    /// partial credit into a later one run against the same checker.
    pub fn satisfied(&mut self, permission: &PermissionDef, domain: &Name128, key: &Name128) -> Result<bool> {
        let saved = self.used.clone();
        let mut total_weight = 0u32;

        for authorizer in &permission.authorizers {
            let satisfied = match &authorizer.reference {
                AuthorizerRef::Owner => {
                    let owners = self.owners.resolve_owner(domain, key)?;
                    let matched = owners.iter().filter(|o| self.mark_used(o)).count();
                    matched == owners.len()
                }
                AuthorizerRef::Account(account_key) => self.mark_used(account_key),
                AuthorizerRef::Group(name) => {
                    let group = self.groups.resolve_group(name)?;
                    let mut used_in_group = Vec::new();
                    let ok = group.satisfied(&self.signing_keys, &mut |k| used_in_group.push(*k));
                    if ok {
                        for k in &used_in_group {
                            self.mark_used(k);
                        }
                    }
                    ok
                }
            };
            if satisfied {
                total_weight += authorizer.weight as u32;
                if total_weight >= permission.threshold {
                    return Ok(true);
                }
            }
        }

        self.used = saved;
        Ok(false)
    }

    pub fn all_keys_used(&self) -> bool {
        self.used.iter().all(|&u| u)
    }

    pub fn used_keys(&self) -> Vec<PublicKeyBytes> {
        self.signing_keys
            .iter()
            .zip(self.used.iter())
            .filter(|(_, used)| **used)
            .map(|(k, _)| *k)
            .collect()
    }

    pub fn unused_keys(&self) -> Vec<PublicKeyBytes> {
        self.signing_keys
            .iter()
            .zip(self.used.iter())
            .filter(|(_, used)| !**used)
            .map(|(k, _)| *k)
            .collect()
    }
}

impl std::fmt::Debug for AuthorizationChecker<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationChecker")
            .field("signing_keys", &self.signing_keys.len())
            .field("used", &self.used)
            .finish()
    }
}

/// An `OwnerResolver` for permissions known never to reference `Owner`
/// (e.g. a fungible's `manage` permission). Errors if the assumption
/// turns out to be wrong.
pub struct NoOwner;

impl OwnerResolver for NoOwner {
    fn resolve_owner(&self, domain: &Name128, key: &Name128) -> Result<Vec<PublicKeyBytes>> {
        Err(JmzkError::MetaInvolve(format!("owner involved in permission with no token context: {domain}/{key}")))
    }
}
