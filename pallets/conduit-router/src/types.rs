use polkadot_sdk::frame_support::pallet_prelude::*;

use primitives::{AssetKind, Balance};

/// Venue dispatch boundary.
///
/// One logic call: the opaque payload goes to `target` on behalf of `agent`, with
/// `native_value` already moved from the agent to the target by the router (the
/// analogue of attaching call value). Implementations pull token inputs from the agent
/// through the allowances the router granted beforehand.
pub trait LogicDispatcher<AccountId> {
  fn dispatch(
    target: &AccountId,
    agent: &AccountId,
    payload: &[u8],
    native_value: Balance,
  ) -> DispatchResult;
}

/// No-op dispatcher: every call succeeds without side effects.
impl<AccountId> LogicDispatcher<AccountId> for () {
  fn dispatch(_: &AccountId, _: &AccountId, _: &[u8], _: Balance) -> DispatchResult {
    Ok(())
  }
}

/// Native <-> wrapped-native conversion boundary used by `WrapMode`.
pub trait NativeWrapper<AccountId> {
  /// The asset the native token wraps into
  fn wrapped_asset() -> AssetKind;

  fn wrap(who: &AccountId, amount: Balance) -> DispatchResult;

  fn unwrap(who: &AccountId, amount: Balance) -> DispatchResult;
}

/// No-op wrapper for configurations without a wrapped-native asset.
impl<AccountId> NativeWrapper<AccountId> for () {
  fn wrapped_asset() -> AssetKind {
    AssetKind::Native
  }

  fn wrap(_: &AccountId, _: Balance) -> DispatchResult {
    Err(DispatchError::Other("NativeWrapper not configured"))
  }

  fn unwrap(_: &AccountId, _: Balance) -> DispatchResult {
    Err(DispatchError::Other("NativeWrapper not configured"))
  }
}

/// The single global executing slot: who is running and through which agent.
#[derive(
  Clone, Debug, Decode, DecodeWithMemTracking, Encode, Eq, MaxEncodedLen, PartialEq, TypeInfo,
)]
pub struct ExecutionContext<AccountId> {
  pub user: AccountId,
  pub agent: AccountId,
}
