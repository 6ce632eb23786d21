//! The finalized jmzk-Link record stored in the TDB once `everipay`/
//! `everipass` consumes a link, guarding against replay.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct JmzkLinkObject {
    pub link_id: u128,
    pub block_num: u32,
    pub trx_id: [u8; 32],
}
