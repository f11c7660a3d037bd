//! Ecosystem Constants for the Conduit Routing Engine
//!
//! This module centralizes all system-level constants: pallet IDs used to derive
//! protocol-owned accounts (agents, the fee collector) and the fundamental numeric
//! parameters of amount resolution and authorization.
//!
//! These constants are the single source of truth for system architecture and are re-used
//! across all runtime configurations via the primitives crate.

/// Balance type alias for consistency across ecosystem
pub type Balance = u128;

/// Pallet identifiers for deriving pallet-owned accounts.
///
/// These IDs are used by Polkadot SDK's `PalletId::into_account_truncating()` (and the
/// per-user sub-account variant) to deterministically generate protocol-owned accounts.
pub mod pallet_ids {
  /// Conduit Router pallet ID (agent account derivation seed)
  pub const CONDUIT_ROUTER_PALLET_ID: &[u8; 8] = b"cndt/rtr";

  /// Fee Engine pallet ID (fee collector account)
  pub const FEE_ENGINE_PALLET_ID: &[u8; 8] = b"cndt/fee";
}

/// Ecosystem parameters defining mathematical constants and thresholds.
pub mod params {
  use super::Balance;

  /// Precision scalar used by tests and reference amounts (10^12).
  pub const PRECISION: Balance = 1_000_000_000_000;

  /// Basis-point base: 10_000 bps = 100%.
  ///
  /// Percentage-of-balance inputs resolve as `floor(balance * bps / BPS_BASE)`.
  pub const BPS_BASE: u16 = 10_000;

  /// Sentinel for `Input::amount_bps` selecting fixed-amount mode.
  ///
  /// When set, `amount_or_offset` carries the literal amount instead of a payload offset.
  pub const SKIP_BPS: u16 = u16::MAX;

  /// Width in bytes of a big-endian amount field inside a logic payload.
  pub const AMOUNT_FIELD_WIDTH: usize = 16;

  /// Allowance granted when a logic requests approval and the current allowance is
  /// insufficient. Half of `u128::MAX` so additive approval backends cannot overflow.
  pub const UNLIMITED_ALLOWANCE: Balance = u128::MAX / 2;
}
