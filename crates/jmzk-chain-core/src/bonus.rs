//! Passive bonus: a per-fungible fee schedule applied on transfer/everiPay
//! that accumulates and is periodically distributed (§4.9).

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::JmzkError;
use crate::symbol::Symbol;
use crate::types::{PublicKeyBytes, Timestamp};

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum BonusMethod {
    TransferFt,
    EveriPay,
}

/// A distribution target: either a concrete address or the pro-rata set of
/// holders of some fungible above a minimum balance.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum DistReceiver {
    Address(Address),
    FtHolders { sym_id: u32, threshold: i64 },
}

/// Fixed rules are evaluated first, then percent, then remaining-percent;
/// callers are responsible for sorting `rules` into that order before
/// evaluating the schedule (`PassiveBonus::validate` enforces it).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub enum DistRule {
    Fixed { amount: i64, receiver: DistReceiver },
    Percent { percent: f64, receiver: DistReceiver },
    RemainingPercent { percent: f64, receiver: DistReceiver },
}

impl DistRule {
    fn rank(&self) -> u8 {
        match self {
            DistRule::Fixed { .. } => 0,
            DistRule::Percent { .. } => 1,
            DistRule::RemainingPercent { .. } => 2,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct PassiveBonus {
    pub sym_id: u32,
    /// `(0, 1]`, applied to the triggering transfer/payment amount.
    pub rate: f64,
    pub base_charge: i64,
    pub charge_threshold: Option<i64>,
    pub minimum_charge: Option<i64>,
    pub dist_threshold: i64,
    pub rules: Vec<DistRule>,
    pub methods: Vec<BonusMethod>,
    pub round: u32,
    pub deadline: Timestamp,
    pub final_receiver: Option<Address>,
}

impl PassiveBonus {
    pub fn validate(&self) -> Result<(), JmzkError> {
        if !(self.rate > 0.0 && self.rate <= 1.0) {
            return Err(JmzkError::InvalidArgument("bonus rate must be in (0, 1]".into()));
        }
        if self.base_charge < 0 {
            return Err(JmzkError::InvalidArgument("base_charge must be non-negative".into()));
        }
        if let (Some(min), Some(thr)) = (self.minimum_charge, self.charge_threshold) {
            if min >= thr {
                return Err(JmzkError::InvalidArgument(
                    "minimum_charge must be below charge_threshold".into(),
                ));
            }
        }
        if self.dist_threshold <= 0 {
            return Err(JmzkError::InvalidArgument("dist_threshold must be positive".into()));
        }

        let mut last_rank = 0u8;
        for rule in &self.rules {
            if rule.rank() < last_rank {
                return Err(JmzkError::InvalidArgument(
                    "rules must be ordered fixed, percent, remaining-percent".into(),
                ));
            }
            last_rank = rule.rank();
            match rule {
                DistRule::Fixed { amount, .. } if *amount < 1 => {
                    return Err(JmzkError::InvalidArgument("fixed rule amount must be >= 1".into()));
                }
                DistRule::Percent { percent, .. } | DistRule::RemainingPercent { percent, .. }
                    if !(*percent > 0.0 && *percent <= 1.0) =>
                {
                    return Err(JmzkError::InvalidArgument("rule percent must be in (0, 1]".into()));
                }
                _ => {}
            }
        }

        let remaining_sum: f64 = self
            .rules
            .iter()
            .filter_map(|r| match r {
                DistRule::RemainingPercent { percent, .. } => Some(*percent),
                _ => None,
            })
            .sum();
        if remaining_sum > 1.0 + f64::EPSILON {
            return Err(JmzkError::InvalidArgument(
                "remaining-percent rules must sum to at most 1".into(),
            ));
        }

        let mut remainder = self.dist_threshold;
        for rule in &self.rules {
            match rule {
                DistRule::Fixed { amount, .. } => remainder -= *amount,
                DistRule::Percent { percent, .. } => {
                    remainder -= (*percent * self.dist_threshold as f64).floor() as i64;
                }
                DistRule::RemainingPercent { .. } => {}
            }
        }
        if remainder > 0 && (remaining_sum - 1.0).abs() > f64::EPSILON {
            return Err(JmzkError::InvalidArgument(
                "a distribution remainder persists but remaining-percent rules do not sum to exactly 1".into(),
            ));
        }
        Ok(())
    }

    /// Clamp `rate * amount` to `[minimum_charge, charge_threshold]` (when
    /// set) and add `base_charge`, yielding the collected fee for one
    /// triggering transfer/payment.
    pub fn charge_for(&self, amount: i64) -> i64 {
        let mut fee = (self.rate * amount as f64).floor() as i64;
        if let Some(min) = self.minimum_charge {
            fee = fee.max(min);
        }
        if let Some(thr) = self.charge_threshold {
            fee = fee.min(thr);
        }
        fee + self.base_charge
    }

    pub fn collection_address(&self) -> Address {
        Address::for_psvbonus(self.sym_id, 0)
    }

    pub fn distribution_address(&self, round: u32) -> Address {
        Address::for_psvbonus(self.sym_id, round)
    }
}

/// Evaluate a validated rule list against a collected pool, returning
/// `(receiver, amount)` pairs for the fixed and percent rules; the caller
/// resolves `FtHolders` receivers against a balance snapshot and splits
/// any leftover remainder across `RemainingPercent` rules pro-rata.
pub fn evaluate_dist_rules(rules: &[DistRule], pool: i64) -> Vec<(DistReceiver, i64)> {
    let mut remaining = pool;
    let mut out = Vec::with_capacity(rules.len());
    let mut remaining_rules: Vec<(f64, DistReceiver)> = Vec::new();

    for rule in rules {
        match rule {
            DistRule::Fixed { amount, receiver } => {
                out.push((receiver.clone(), *amount));
                remaining -= amount;
            }
            DistRule::Percent { percent, receiver } => {
                let amount = (*percent * pool as f64).floor() as i64;
                out.push((receiver.clone(), amount));
                remaining -= amount;
            }
            DistRule::RemainingPercent { percent, receiver } => {
                remaining_rules.push((*percent, receiver.clone()));
            }
        }
    }

    for (percent, receiver) in remaining_rules {
        let amount = (percent * remaining as f64).floor() as i64;
        out.push((receiver, amount));
    }
    out
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Debug, Default)]
pub struct HolderSnapshot {
    pub by_hash: std::collections::HashMap<u32, i64>,
    /// Hash collisions are rare (32-bit hash of a 33-byte key) but must
    /// not silently merge two holders' balances.
    pub collisions: std::collections::HashMap<PublicKeyBytes, i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_out_of_order_rules() {
        let b = PassiveBonus {
            sym_id: 3,
            rate: 0.01,
            base_charge: 0,
            charge_threshold: None,
            minimum_charge: None,
            dist_threshold: 100,
            rules: vec![
                DistRule::Percent { percent: 0.3, receiver: DistReceiver::Address(Address::Reserved) },
                DistRule::Fixed { amount: 10, receiver: DistReceiver::Address(Address::Reserved) },
            ],
            methods: vec![BonusMethod::TransferFt],
            round: 0,
            deadline: 0,
            final_receiver: None,
        };
        assert!(b.validate().is_err());
    }

    #[test]
    fn validate_rejects_unaccounted_remainder() {
        let b = PassiveBonus {
            sym_id: 3,
            rate: 0.01,
            base_charge: 0,
            charge_threshold: None,
            minimum_charge: None,
            dist_threshold: 100,
            rules: vec![DistRule::Fixed { amount: 10, receiver: DistReceiver::Address(Address::Reserved) }],
            methods: vec![BonusMethod::TransferFt],
            round: 0,
            deadline: 0,
            final_receiver: None,
        };
        assert!(b.validate().is_err());
    }

    #[test]
    fn scenario_from_spec_distributes_correctly() {
        let rules = vec![
            DistRule::Fixed { amount: 10, receiver: DistReceiver::Address(Address::Reserved) },
            DistRule::Percent { percent: 0.3, receiver: DistReceiver::Address(Address::Reserved) },
            DistRule::RemainingPercent { percent: 1.0, receiver: DistReceiver::FtHolders { sym_id: 3, threshold: 1 } },
        ];
        let out = evaluate_dist_rules(&rules, 100);
        assert_eq!(out[0].1, 10);
        assert_eq!(out[1].1, 30);
        assert_eq!(out[2].1, 60);
    }

    #[test]
    fn charge_for_clamps_to_bounds() {
        let b = PassiveBonus {
            sym_id: 3,
            rate: 0.5,
            base_charge: 1,
            charge_threshold: Some(10),
            minimum_charge: Some(2),
            dist_threshold: 100,
            rules: vec![],
            methods: vec![],
            round: 0,
            deadline: 0,
            final_receiver: None,
        };
        assert_eq!(b.charge_for(2), 3); // floor(1) -> min clamp 2, +1 base
        assert_eq!(b.charge_for(1000), 11); // floor(500) -> max clamp 10, +1 base
    }
}
