//! Packed transaction wire format (§6.2) and the digest it is signed over.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::action::Action;
use crate::address::Address;
use crate::types::RecoverableSignature;

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct TransactionHeader {
    pub expiration: u32,
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    pub max_charge: u32,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct TransactionBody {
    pub header: TransactionHeader,
    pub actions: Vec<Action>,
    pub payer: Address,
    pub transaction_extensions: Vec<(u16, Vec<u8>)>,
}

impl TransactionBody {
    /// `SHA-256(chain_id || header || body)`, per §6.2. The bincode
    /// encoding of `self` stands in for the original ABI-packed bytes: it
    /// is deterministic and covers every field actually signed over.
    pub fn digest(&self, chain_id: &[u8; 32]) -> Result<[u8; 32], bincode::Error> {
        let mut hasher = Sha256::new();
        hasher.update(chain_id);
        hasher.update(bincode::serialize(&self.header)?);
        let rest = bincode::serialize(&(&self.actions, &self.payer, &self.transaction_extensions))?;
        hasher.update(rest);
        Ok(hasher.finalize().into())
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct PackedTransaction {
    pub body: TransactionBody,
    pub signatures: Vec<RecoverableSignature>,
}

impl PackedTransaction {
    pub fn id(&self, chain_id: &[u8; 32]) -> Result<[u8; 32], bincode::Error> {
        self.body.digest(chain_id)
    }
}
