//! Chain-wide numeric constants. Pricing and link-expiry defaults live in
//! on-chain config (see [`crate::config::ChainConfig`]) and can be changed
//! by `prodvote`; the values here are the compiled-in defaults it starts
//! from and the hard limits nothing can vote past.

/// jmzk-Link decoded segment byte budget: sized so the base-42 expansion of
/// the header plus segments plus three 65-byte signatures still fits the
/// practical URI length ecosystems tolerate.
pub const JMZK_LINK_MAX_SEGMENT_BYTES: usize = 240;

/// Recoverable secp256k1 signature wire size: 64-byte (r, s) + 1-byte
/// recovery id.
pub const SIGNATURE_SIZE: usize = 65;

/// Default per-action cpu units when the action type has no override.
pub const DEFAULT_ACTION_CPU_UNITS: u32 = 15;

/// Default per-action extra_factor multiplier (applied to the action's
/// share of the transaction-wide base cost).
pub const DEFAULT_ACTION_EXTRA_FACTOR: u32 = 10;

/// Fixed per-signature cpu unit cost.
pub const CPU_UNITS_PER_SIGNATURE: u32 = 60;

/// Charge divisor: the raw weighted sum of network/cpu/storage units is
/// divided by this to yield the final charge in native-token base units.
pub const CHARGE_DIVISOR: i64 = 1_000_000;

/// Default link expiration window in seconds.
pub const DEFAULT_JMZK_LINK_EXPIRED_SECS: i64 = 90;

/// Snapshot format magic number (`§6.4`).
pub const SNAPSHOT_MAGIC: u32 = 0x3051_0550;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 3;

/// Snapshot section-table terminator sentinel.
pub const SNAPSHOT_TERMINATOR: u64 = 0xFFFF_FFFF_FFFF_FFFF;
