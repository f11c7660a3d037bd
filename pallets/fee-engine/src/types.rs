use polkadot_sdk::frame_support::pallet_prelude::*;

use primitives::Balance;
use primitives::routing::{Fee, Logic};

/// Reference to a registered calculator plus its configuration.
///
/// `rate` interpretation belongs to the calculator behind `calculator`: basis points for
/// proportional calculators, an absolute amount for flat ones.
#[derive(
  Clone,
  Copy,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Encode,
  Eq,
  MaxEncodedLen,
  PartialEq,
  TypeInfo,
)]
pub struct CalculatorEntry {
  pub calculator: u32,
  pub rate: Balance,
}

/// Calculator dispatch boundary.
///
/// The runtime decides what each calculator id means; the engine only routes
/// `(entry, target, payload)` to it and trusts the returned fee to be deterministic
/// for a given payload and configuration.
pub trait FeeComputer<AccountId> {
  fn compute(calculator: u32, rate: Balance, target: &AccountId, payload: &[u8])
  -> Option<Fee>;
}

/// No-op computer: no logic ever carries a fee.
impl<AccountId> FeeComputer<AccountId> for () {
  fn compute(_: u32, _: Balance, _: &AccountId, _: &[u8]) -> Option<Fee> {
    None
  }
}

/// On-path fee surface the router drives during `execute`.
pub trait FeeHandler<AccountId> {
  /// Account fee-charge steps pay into.
  fn collector() -> AccountId;

  /// Recompute fees from the actual logics and require element-wise equality with the
  /// caller-declared set.
  fn verify_fees(logics: &[Logic<AccountId>], declared: &[Fee]) -> DispatchResult;
}
