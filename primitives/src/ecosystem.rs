//! Ecosystem Constants for the Vault Router
//!
//! This module centralizes system-level constants: pallet identifiers used to derive
//! router-owned accounts and the fundamental allocation parameters shared by the
//! router pallet, its runtime configuration and the pure allocation math.
//!
//! These constants are the single source of truth and are re-used across runtime
//! configurations via the primitives crate.

/// Balance type alias for consistency across the ecosystem
pub type Balance = u128;

/// Pallet identifiers for deriving pallet-owned accounts.
///
/// These IDs are used by Polkadot SDK's `PalletId::into_account_truncating()`
/// to deterministically generate accounts for pallet-specific operations.
pub mod pallet_ids {
  /// Vault Router pallet ID (staging account for routed value)
  pub const VAULT_ROUTER_PALLET_ID: &[u8; 8] = b"vltroutr";
}

/// Allocation parameters shared by the router and the allocation math.
pub mod params {
  use super::Balance;

  /// Fixed-point base for allocation fractions and target weights (parts per million).
  ///
  /// A complete backend configuration has target weights summing to exactly this value.
  pub const ALLOCATION_SCALE: u32 = 1_000_000;

  /// One whole stable unit (6 decimals).
  pub const STABLE_UNIT: Balance = 1_000_000;

  /// Default absolute dust tolerance (0.01 stable units).
  ///
  /// Mismatches below this threshold are ignored instead of enforced.
  pub const DEFAULT_DUST_TOLERANCE: Balance = STABLE_UNIT / 100;

  /// Reference deposit used by the deposit health probe (1.0 stable unit).
  pub const HEALTH_PROBE_AMOUNT: Balance = STABLE_UNIT;

  /// Hard upper bound on configured backends.
  pub const MAX_BACKENDS: u32 = 32;

  /// Default number of candidates considered by a single automatic operation.
  pub const DEFAULT_MAX_BACKENDS_PER_OPERATION: u32 = 8;
}
