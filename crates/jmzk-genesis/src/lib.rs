//! Genesis bootstrap: seeds an empty TDB with the global property record
//! and the native token's `fungible_def` before any transaction is ever
//! processed.
//!
//! Genesis writes go straight to the TDB outside any savepoint — per
//! §4.1's failure model this is allowed but unsafe, and this is the one
//! place in the system that relies on that.

use jmzk_chain_core::{
    Address, ChainConfig, FungibleDef, GlobalProperties, Name128, PermissionDef, PublicKeyBytes,
    Symbol, JMZK_SYM_ID,
};
use jmzk_state::tdb::{PutOp, Tdb, TokenType};

/// Parameters a deployer supplies for the one-time genesis write.
#[derive(Clone, Debug)]
pub struct GenesisParams {
    /// Controls the native token's issue/manage permissions at genesis.
    pub founder_key: PublicKeyBytes,
    pub jmzk_sym_name: String,
    pub jmzk_precision: u8,
    pub config: ChainConfig,
}

impl GenesisParams {
    pub fn new(founder_key: PublicKeyBytes) -> Self {
        GenesisParams {
            founder_key,
            jmzk_sym_name: "JMZK".into(),
            jmzk_precision: 5,
            config: ChainConfig::default(),
        }
    }
}

/// Applies genesis to a fresh TDB: writes the global property record and
/// the native `fungible_def`.
pub fn apply_genesis(tdb: &Tdb, params: &GenesisParams) -> jmzk_chain_core::Result<GlobalProperties> {
    let sym = Symbol::new(params.jmzk_precision, JMZK_SYM_ID as u32)?;

    let owner_perm = |name: &str| -> jmzk_chain_core::Result<PermissionDef> {
        Ok(PermissionDef {
            name: Name128::from_str_checked(name)?,
            threshold: 1,
            authorizers: vec![jmzk_chain_core::AuthorizerWeight {
                reference: jmzk_chain_core::AuthorizerRef::Account(params.founder_key),
                weight: 1,
            }],
        })
    };

    let native = FungibleDef {
        name: Name128::from_str_checked("jmzk")?,
        sym_name: params.jmzk_sym_name.clone(),
        sym,
        creator: params.founder_key,
        create_time: 0,
        issue: owner_perm("issue")?,
        transfer: owner_perm("transfer")?,
        manage: PermissionDef { name: Name128::from_str_checked("manage")?, threshold: 0, authorizers: vec![] },
        total_supply: jmzk_chain_core::Asset::new(0, sym)?,
        metas: vec![],
    };

    tdb.put_token(
        TokenType::Fungible,
        PutOp::Add,
        None,
        Name128::from_str_checked("jmzk")?,
        jmzk_state::tdb::encode(&native)?,
    )?;

    // The founder's zero balance record establishes the asset space early
    // so downstream range scans see a stable key shape; real supply is
    // minted via `issuefungible`, never here.
    let zero_balance = jmzk_chain_core::Property {
        amount: jmzk_chain_core::Asset::new(0, sym)?,
        frozen_amount: jmzk_chain_core::Asset::new(0, sym)?,
        sym,
        created_at: 0,
        created_index: 0,
    };
    tdb.put_asset(&Address::PublicKey(params.founder_key), sym.id(), jmzk_state::tdb::encode(&zero_balance)?)?;

    Ok(GlobalProperties { config: params.config.clone(), action_vers: Default::default() })
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
    fn genesis_seeds_native_fungible() {
        let tdb = Tdb::open_in_memory().unwrap();
        let params = GenesisParams::new(pk(1));
        apply_genesis(&tdb, &params).unwrap();
        assert!(tdb
            .exists_token(TokenType::Fungible, None, Name128::from_str_checked("jmzk").unwrap())
            .unwrap());
    }

    #[test]
    fn genesis_runs_outside_any_savepoint() {
        let tdb = Tdb::open_in_memory().unwrap();
        let params = GenesisParams::new(pk(1));
        apply_genesis(&tdb, &params).unwrap();
        assert_eq!(tdb.savepoints_size(), 0);
    }
}
