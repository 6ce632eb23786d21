//! Fungible token principal record and the per-address balance ("property")
//! record.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::domain::Meta;
use crate::group::PermissionDef;
use crate::name128::Name128;
use crate::symbol::{Asset, Symbol};
use crate::types::{PublicKeyBytes, Timestamp};

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct FungibleDef {
    pub name: Name128,
    pub sym_name: String,
    pub sym: Symbol,
    pub creator: PublicKeyBytes,
    pub create_time: Timestamp,
    pub issue: PermissionDef,
    pub transfer: PermissionDef,
    pub manage: PermissionDef,
    pub total_supply: Asset,
    pub metas: Vec<Meta>,
}

impl FungibleDef {
    /// The distinguished holder address that mints (`issuefungible`) draw
    /// from and recycles (`recycleft`/`destroyft`) return to.
    pub fn sink_address(&self) -> Address {
        Address::for_fungible(self.sym.id())
    }
}

/// A balance record keyed by `(address, sym_id)` in the TDB's asset space.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct Property {
    pub amount: Asset,
    pub frozen_amount: Asset,
    pub sym: Symbol,
    pub created_at: Timestamp,
    pub created_index: u64,
}

impl Property {
    pub fn spendable(&self) -> i64 {
        self.amount.amount - self.frozen_amount.amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_address_is_generated_fungible_prefix() {
        let sym = Symbol::new(4, 7).unwrap();
        let def = FungibleDef {
            name: Name128::from_str_checked("f1").unwrap(),
            sym_name: "FOO".into(),
            sym,
            creator: PublicKeyBytes([0u8; 33]),
            create_time: 0,
            issue: PermissionDef { name: Name128::from_str_checked("issue").unwrap(), threshold: 1, authorizers: vec![] },
            transfer: PermissionDef { name: Name128::from_str_checked("transfer").unwrap(), threshold: 1, authorizers: vec![] },
            manage: PermissionDef { name: Name128::from_str_checked("manage").unwrap(), threshold: 0, authorizers: vec![] },
            total_supply: Asset::new(0, sym).unwrap(),
            metas: vec![],
        };
        assert!(def.sink_address().has_prefix("fungible"));
    }

    #[test]
    fn property_spendable_excludes_frozen() {
        let sym = Symbol::new(0, 1).unwrap();
        let p = Property {
            amount: Asset::new(100, sym).unwrap(),
            frozen_amount: Asset::new(40, sym).unwrap(),
            sym,
            created_at: 0,
            created_index: 0,
        };
        assert_eq!(p.spendable(), 60);
    }
}
