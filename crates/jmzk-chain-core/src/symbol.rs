//! Symbol and asset: the fixed-point value types backing every balance,
//! charge and transfer amount in the chain.

use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

use crate::error::JmzkError;

pub const MAX_PRECISION: u8 = 18;

/// Reserved symbol ids. `jmzk` is the native token; `pjmzk` is its pinned
/// (non-transferable-as-payer-except-to-self) variant.
pub const EMPTY_SYM_ID: u64 = 0;
pub const JMZK_SYM_ID: u64 = 1;
pub const PJMZK_SYM_ID: u64 = 2;

pub const MAX_AMOUNT: i64 = (1i64 << 62) - 1;

/// `(precision << 32) | symbol_id`, packed into a single u64 exactly as on
/// the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(pub u64);

impl Symbol {
    pub fn new(precision: u8, id: u32) -> Result<Self, JmzkError> {
        if precision > MAX_PRECISION {
            return Err(JmzkError::AssetSymbol(format!(
                "precision {precision} exceeds max {MAX_PRECISION}"
            )));
        }
        Ok(Symbol(((precision as u64) << 32) | id as u64))
    }

    pub fn precision(&self) -> u8 {
        (self.0 >> 32) as u8
    }

    pub fn id(&self) -> u32 {
        (self.0 & 0xFFFF_FFFF) as u32
    }

    pub fn is_jmzk(&self) -> bool {
        self.id() as u64 == JMZK_SYM_ID
    }

    pub fn is_pjmzk(&self) -> bool {
        self.id() as u64 == PJMZK_SYM_ID
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{}@{}", self.id(), self.precision())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self)
    }
}

/// A signed fixed-point amount tied to a symbol. `|amount| <= 2^62 - 1`.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct Asset {
    pub amount: i64,
    pub sym: Symbol,
}

impl Asset {
    pub fn new(amount: i64, sym: Symbol) -> Result<Self, JmzkError> {
        if amount.unsigned_abs() as i64 > MAX_AMOUNT {
            return Err(JmzkError::AssetType(format!(
                "amount {amount} exceeds max magnitude {MAX_AMOUNT}"
            )));
        }
        Ok(Asset { amount, sym })
    }

    fn check_same_symbol(&self, other: &Asset) -> Result<(), JmzkError> {
        if self.sym != other.sym {
            return Err(JmzkError::AssetSymbol(format!(
                "symbol mismatch: {} vs {}",
                self.sym, other.sym
            )));
        }
        Ok(())
    }

    pub fn checked_add(&self, other: &Asset) -> Result<Asset, JmzkError> {
        self.check_same_symbol(other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or_else(|| JmzkError::AssetType("asset addition overflow".into()))?;
        Asset::new(amount, self.sym)
    }

    pub fn checked_sub(&self, other: &Asset) -> Result<Asset, JmzkError> {
        self.check_same_symbol(other)?;
        let amount = self
            .amount
            .checked_sub(other.amount)
            .ok_or_else(|| JmzkError::AssetType("asset subtraction overflow".into()))?;
        Asset::new(amount, self.sym)
    }

    pub fn is_negative(&self) -> bool {
        self.amount < 0
    }
}

impl Add for Asset {
    type Output = Result<Asset, JmzkError>;

    fn add(self, rhs: Asset) -> Self::Output {
        self.checked_add(&rhs)
    }
}

impl Sub for Asset {
    type Output = Result<Asset, JmzkError>;

    fn sub(self, rhs: Asset) -> Self::Output {
        self.checked_sub(&rhs)
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.sym.precision() as u32;
        let scale = 10i64.pow(p);
        let whole = self.amount / scale;
        let frac = self.amount.abs() % scale;
        write!(f, "{whole}.{frac:0width$} {}", self.sym, width = p as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_pack_unpack() {
        let s = Symbol::new(4, 3).unwrap();
        assert_eq!(s.precision(), 4);
        assert_eq!(s.id(), 3);
    }

    #[test]
    fn symbol_rejects_excess_precision() {
        assert!(Symbol::new(19, 1).is_err());
    }

    #[test]
    fn asset_add_requires_same_symbol() {
        let a = Asset::new(100, Symbol::new(4, 1).unwrap()).unwrap();
        let b = Asset::new(100, Symbol::new(4, 2).unwrap()).unwrap();
        assert!(a.checked_add(&b).is_err());
    }

    #[test]
    fn asset_add_ok() {
        let sym = Symbol::new(4, 1).unwrap();
        let a = Asset::new(100, sym).unwrap();
        let b = Asset::new(50, sym).unwrap();
        let c = a.checked_add(&b).unwrap();
        assert_eq!(c.amount, 150);
    }

    #[test]
    fn asset_rejects_overflow_magnitude() {
        let sym = Symbol::new(0, 1).unwrap();
        assert!(Asset::new(MAX_AMOUNT + 1, sym).is_err());
    }

    proptest::proptest! {
        #[test]
        fn checked_add_then_sub_is_identity(a in -MAX_AMOUNT..=MAX_AMOUNT, b in -MAX_AMOUNT..=MAX_AMOUNT) {
            let sym = Symbol::new(2, 7).unwrap();
            let x = Asset::new(a, sym).unwrap();
            let y = Asset::new(b, sym).unwrap();
            if let Ok(sum) = x.checked_add(&y) {
                let back = sum.checked_sub(&y).unwrap();
                prop_assert_eq!(back.amount, a);
            }
        }

        #[test]
        fn symbol_round_trips_through_pack_unpack(precision in 0u8..=MAX_PRECISION, id in 0u32..) {
            let sym = Symbol::new(precision, id).unwrap();
            prop_assert_eq!(sym.precision(), precision);
            prop_assert_eq!(sym.id(), id);
        }
    }
}
