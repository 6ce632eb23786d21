//! Authorization primitives: authorizer references, permission definitions,
//! and the weighted n-ary group tree.

use serde::{Deserialize, Serialize};

use crate::error::JmzkError;
use crate::name128::Name128;
use crate::types::PublicKeyBytes;

/// One reference inside a `permission_def`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum AuthorizerRef {
    /// The "owner" pseudo-group: every address in the target token's
    /// `owner` list must be present in the signing key set.
    Owner,
    Account(PublicKeyBytes),
    Group(Name128),
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct AuthorizerWeight {
    pub reference: AuthorizerRef,
    pub weight: u16,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct PermissionDef {
    pub name: Name128,
    pub threshold: u32,
    pub authorizers: Vec<AuthorizerWeight>,
}

impl PermissionDef {
    /// `require_positive_threshold` is true for issue/transfer permissions;
    /// manage permissions may have threshold 0 (nobody can change them).
    pub fn validate(&self, require_positive_threshold: bool) -> Result<(), JmzkError> {
        if require_positive_threshold && self.threshold == 0 {
            return Err(JmzkError::PermissionType(format!(
                "permission {} requires threshold > 0",
                self.name
            )));
        }

        let mut seen = Vec::with_capacity(self.authorizers.len());
        for a in &self.authorizers {
            if seen.contains(&a.reference) {
                return Err(JmzkError::PermissionType(format!(
                    "duplicate authorizer reference in permission {}",
                    self.name
                )));
            }
            seen.push(a.reference.clone());
        }

        if self.threshold != 0 {
            let total: u32 = self.authorizers.iter().map(|a| a.weight as u32).sum();
            if total < self.threshold {
                return Err(JmzkError::PermissionType(format!(
                    "permission {} weights ({total}) sum below threshold ({})",
                    self.name, self.threshold
                )));
            }
        }
        Ok(())
    }
}

/// A node in the flattened group tree. Non-leaf nodes reference a
/// contiguous span `[index, index+size)` of their children; a leaf has
/// `size == 0` and carries a public key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct GroupNode {
    pub index: u32,
    pub size: u32,
    pub threshold: u32,
    pub weight: u16,
    pub key: Option<PublicKeyBytes>,
}

impl GroupNode {
    pub fn is_leaf(&self) -> bool {
        self.size == 0
    }

    pub fn children_range(&self) -> std::ops::Range<usize> {
        self.index as usize..(self.index as usize + self.size as usize)
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct Group {
    pub name: Name128,
    pub key: PublicKeyBytes,
    pub root: Vec<GroupNode>,
}

impl Group {
    /// The root's `weight` must be 0 (it is never a child of anything);
    /// every node's child range must fit the array; every non-leaf's
    /// sum-of-child-weights must meet its own threshold.
    pub fn validate(&self) -> Result<(), JmzkError> {
        if self.root.is_empty() {
            return Err(JmzkError::PermissionType(format!(
                "group {} has an empty tree",
                self.name
            )));
        }
        if self.root[0].weight != 0 {
            return Err(JmzkError::PermissionType(format!(
                "group {} root weight must be 0",
                self.name
            )));
        }
        for node in &self.root {
            if !node.is_leaf() {
                let range = node.children_range();
                if range.end > self.root.len() {
                    return Err(JmzkError::PermissionType(format!(
                        "group {} node child range out of bounds",
                        self.name
                    )));
                }
                let sum: u32 = self.root[range].iter().map(|c| c.weight as u32).sum();
                if sum < node.threshold {
                    return Err(JmzkError::PermissionType(format!(
                        "group {} node weights ({sum}) below threshold ({})",
                        self.name, node.threshold
                    )));
                }
            }
        }
        Ok(())
    }

    /// Tally the weight of `signing_keys` satisfied under the node at
    /// `node_idx`, short-circuiting once the node's threshold is met.
    /// Returns the weight this node contributes to its parent (its own
    /// `weight` field if satisfied, 0 otherwise) and records which keys
    /// were used via `mark_used`.
    pub fn evaluate_node(
        &self,
        node_idx: usize,
        signing_keys: &[PublicKeyBytes],
        mark_used: &mut impl FnMut(&PublicKeyBytes),
    ) -> u32 {
        let node = &self.root[node_idx];
        if node.is_leaf() {
            if let Some(key) = &node.key {
                if signing_keys.contains(key) {
                    mark_used(key);
                    return node.weight as u32;
                }
            }
            return 0;
        }

        let mut total = 0u32;
        for child_idx in node.children_range() {
            let child = &self.root[child_idx];
            let contrib = self.evaluate_node(child_idx, signing_keys, mark_used);
            if contrib > 0 {
                total += child.weight as u32;
                if total >= node.threshold {
                    break;
                }
            }
        }
        if total >= node.threshold {
            node.weight as u32
        } else {
            0
        }
    }

    /// Whether the whole tree (root threshold) is satisfied by the given
    /// signing keys.
    pub fn satisfied(
        &self,
        signing_keys: &[PublicKeyBytes],
        mark_used: &mut impl FnMut(&PublicKeyBytes),
    ) -> bool {
        let root = &self.root[0];
        let mut total = 0u32;
        for child_idx in root.children_range() {
            let child = &self.root[child_idx];
            let contrib = self.evaluate_node(child_idx, signing_keys, mark_used);
            if contrib > 0 {
                total += child.weight as u32;
                if total >= root.threshold {
                    return true;
                }
            }
        }
        total >= root.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pk(b: u8) -> PublicKeyBytes {
        let mut bytes = [0u8; 33];
        bytes[0] = 0x02;
        bytes[32] = b;
        PublicKeyBytes(bytes)
    }

    #[test]
    fn two_of_two_group_satisfied_by_both_keys() {
        let k1 = pk(1);
        let k2 = pk(2);
        let group = Group {
            name: Name128::from_str_checked("g1").unwrap(),
            key: pk(0),
            root: vec![
                GroupNode { index: 1, size: 2, threshold: 2, weight: 0, key: None },
                GroupNode { index: 0, size: 0, threshold: 0, weight: 1, key: Some(k1) },
                GroupNode { index: 0, size: 0, threshold: 0, weight: 1, key: Some(k2) },
            ],
        };
        group.validate().unwrap();
        let mut used = Vec::new();
        assert!(group.satisfied(&[k1, k2], &mut |k| used.push(*k)));
        assert_eq!(used.len(), 2);
    }

    #[test]
    fn group_not_satisfied_by_single_key_under_threshold_two() {
        let k1 = pk(1);
        let k2 = pk(2);
        let group = Group {
            name: Name128::from_str_checked("g1").unwrap(),
            key: pk(0),
            root: vec![
                GroupNode { index: 1, size: 2, threshold: 2, weight: 0, key: None },
                GroupNode { index: 0, size: 0, threshold: 0, weight: 1, key: Some(k1) },
                GroupNode { index: 0, size: 0, threshold: 0, weight: 1, key: Some(k2) },
            ],
        };
        let mut used = Vec::new();
        assert!(!group.satisfied(&[k1], &mut |k| used.push(*k)));
    }

    #[test]
    fn validate_rejects_zero_weight_root() {
        let group = Group {
            name: Name128::from_str_checked("g1").unwrap(),
            key: pk(0),
            root: vec![GroupNode { index: 0, size: 0, threshold: 0, weight: 1, key: Some(pk(1)) }],
        };
        assert!(group.validate().is_err());
    }
}
