//! The generic wire-level action: a dispatch target plus an opaque
//! payload. Concrete payload types (`NewDomain`, `Transfer`, ...) are
//! defined by the contract crate that interprets them; this crate only
//! carries the envelope the execution context dispatches on.

use serde::{Deserialize, Serialize};

use crate::name128::Name128;

/// Stable 64-bit id for an action name, used on the wire in place of the
/// variable-length string. Collisions are a deployment-time concern (the
/// compiled-in action table is fixed), not a runtime one.
pub fn action_name_id(name: &str) -> u64 {
    // FNV-1a: simple, deterministic, no external crate needed for a
    // name-to-id mapping that never leaves the process.
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in name.as_bytes() {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
    }
    hash
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct Action {
    pub name: u64,
    pub domain: Name128,
    pub key: Name128,
    pub data: Vec<u8>,
}

impl Action {
    pub fn new(name: &str, domain: Name128, key: Name128, data: Vec<u8>) -> Self {
        Action { name: action_name_id(name), domain, key, data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_name_id_is_deterministic() {
        assert_eq!(action_name_id("transfer"), action_name_id("transfer"));
        assert_ne!(action_name_id("transfer"), action_name_id("newdomain"));
    }
}
