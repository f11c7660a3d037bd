//! Routing data model shared by the Conduit Router and the Fee Engine.
//!
//! A `Logic` describes one external call: an opaque byte payload dispatched to a target
//! account, plus the dynamic input/output/authorization metadata the router needs to
//! resolve amounts, grant allowances and police results. Logics are transient call
//! arguments; nothing in this module is ever stored.
//!
//! Payload wire format: the first four bytes are the operation selector, amount fields
//! are 16-byte big-endian `u128` values at caller-declared offsets. The fee-charge
//! payload (`CHARGE_SELECTOR`) is the one payload shape owned by the protocol itself.

use codec::{Decode, DecodeWithMemTracking, Encode};
use scale_info::TypeInfo;

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;
#[cfg(feature = "std")]
use std::vec::Vec;

use crate::assets::AssetKind;
use crate::ecosystem::{Balance, params::AMOUNT_FIELD_WIDTH};

/// Four-byte operation selector heading every logic payload.
pub type Selector = [u8; 4];

/// Selector of the protocol-owned fee-charge step inserted by fee simulation.
pub const CHARGE_SELECTOR: Selector = *b"chrg";

/// How the router treats native balances around a logic call.
#[derive(
  Clone,
  Copy,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Default,
  Encode,
  Eq,
  PartialEq,
  TypeInfo,
)]
pub enum WrapMode {
  /// No native wrapping around this call
  #[default]
  None,
  /// Wrap the agent's whole native balance into the wrapped asset before the call
  WrapBefore,
  /// Unwrap the agent's whole wrapped balance back to native after the call
  UnwrapAfter,
}

/// One dynamic input of a logic call.
///
/// `amount_bps == SKIP_BPS` selects fixed mode: `amount_or_offset` is the literal amount.
/// Any other value selects percentage mode: the resolved amount is
/// `floor(balance * amount_bps / BPS_BASE)` of the agent's current balance of `token`,
/// and `amount_or_offset` is the byte offset inside the payload where the resolved
/// amount is written.
#[derive(
  Clone, Copy, Debug, Decode, DecodeWithMemTracking, Encode, Eq, PartialEq, TypeInfo,
)]
pub struct Input {
  pub token: AssetKind,
  pub amount_bps: u16,
  pub amount_or_offset: u128,
  pub require_approval: bool,
}

impl Input {
  /// Fixed-amount input.
  pub fn fixed(token: AssetKind, amount: Balance) -> Self {
    Self {
      token,
      amount_bps: crate::ecosystem::params::SKIP_BPS,
      amount_or_offset: amount,
      require_approval: false,
    }
  }

  /// Percentage-of-balance input patched into the payload at `offset`.
  pub fn percentage(token: AssetKind, amount_bps: u16, offset: u128) -> Self {
    Self {
      token,
      amount_bps,
      amount_or_offset: offset,
      require_approval: false,
    }
  }

  pub fn with_approval(mut self) -> Self {
    self.require_approval = true;
    self
  }
}

/// Post-call floor on the balance delta of one token.
#[derive(
  Clone, Copy, Debug, Decode, DecodeWithMemTracking, Encode, Eq, PartialEq, TypeInfo,
)]
pub struct Output {
  pub token: AssetKind,
  pub min_amount: Balance,
}

/// One declarative external call plus its dynamic input/output/authorization metadata.
#[derive(Clone, Debug, Decode, DecodeWithMemTracking, Encode, Eq, PartialEq, TypeInfo)]
pub struct Logic<AccountId> {
  /// Venue account the payload is dispatched to
  pub target: AccountId,
  /// Opaque call data; selector first, amount fields at declared offsets
  pub payload: Vec<u8>,
  pub inputs: Vec<Input>,
  pub outputs: Vec<Output>,
  pub wrap_mode: WrapMode,
  /// Allowance delegate when an input requires approval; defaults to `target`
  pub approval_target: Option<AccountId>,
  /// The single party allowed to re-enter the router while this call is on the stack
  pub callback_entrant: Option<AccountId>,
}

impl<AccountId> Logic<AccountId> {
  pub fn new(target: AccountId, payload: Vec<u8>) -> Self {
    Self {
      target,
      payload,
      inputs: Vec::new(),
      outputs: Vec::new(),
      wrap_mode: WrapMode::None,
      approval_target: None,
      callback_entrant: None,
    }
  }

  pub fn with_inputs(mut self, inputs: Vec<Input>) -> Self {
    self.inputs = inputs;
    self
  }

  pub fn with_outputs(mut self, outputs: Vec<Output>) -> Self {
    self.outputs = outputs;
    self
  }

  pub fn with_wrap_mode(mut self, wrap_mode: WrapMode) -> Self {
    self.wrap_mode = wrap_mode;
    self
  }

  pub fn with_approval_target(mut self, approval_target: AccountId) -> Self {
    self.approval_target = Some(approval_target);
    self
  }

  pub fn with_callback_entrant(mut self, entrant: AccountId) -> Self {
    self.callback_entrant = Some(entrant);
    self
  }
}

/// A fee obligation asserted by the caller and re-derived by the fee engine.
#[derive(Clone, Debug, Decode, DecodeWithMemTracking, Encode, Eq, PartialEq, TypeInfo)]
pub struct Fee {
  pub token: AssetKind,
  pub amount: Balance,
  /// Calculator-chosen tag carried through simulation for off-chain attribution
  pub metadata: Vec<u8>,
}

/// Read the four-byte selector heading a payload.
pub fn selector_of(payload: &[u8]) -> Option<Selector> {
  payload.get(..4)?.try_into().ok()
}

/// Overwrite the 16-byte big-endian amount field at `offset`. Returns false when the
/// write would run past the end of the payload.
pub fn write_amount_be(payload: &mut [u8], offset: usize, amount: Balance) -> bool {
  let end = match offset.checked_add(AMOUNT_FIELD_WIDTH) {
    Some(end) => end,
    None => return false,
  };
  match payload.get_mut(offset..end) {
    Some(field) => {
      field.copy_from_slice(&amount.to_be_bytes());
      true
    }
    None => false,
  }
}

/// Read the 16-byte big-endian amount field at `offset`.
pub fn read_amount_be(payload: &[u8], offset: usize) -> Option<Balance> {
  let end = offset.checked_add(AMOUNT_FIELD_WIDTH)?;
  let field: [u8; AMOUNT_FIELD_WIDTH] = payload.get(offset..end)?.try_into().ok()?;
  Some(Balance::from_be_bytes(field))
}

/// Build the standard `[selector | token | amount]` payload shape used by venues that
/// take one token amount, with the amount as a trailing big-endian field so percentage
/// inputs can patch it in place.
pub fn encode_call(selector: Selector, token: AssetKind, amount: Balance) -> Vec<u8> {
  let mut payload = selector.to_vec();
  token.encode_to(&mut payload);
  payload.extend_from_slice(&amount.to_be_bytes());
  payload
}

/// Byte offset of the amount field inside an `encode_call` payload for `token`.
pub fn amount_offset(token: AssetKind) -> u128 {
  (4 + token.encoded_size()) as u128
}

/// Decode the `[selector | token | amount]` shape, ignoring which selector heads it.
pub fn decode_token_amount(payload: &[u8]) -> Option<(AssetKind, Balance)> {
  let mut body = payload.get(4..)?;
  let token = AssetKind::decode(&mut body).ok()?;
  if body.len() != AMOUNT_FIELD_WIDTH {
    return None;
  }
  read_amount_be(body, 0).map(|amount| (token, amount))
}

/// Build a fee-charge payload moving `amount` of `token` from the agent to the collector.
pub fn encode_charge(token: AssetKind, amount: Balance) -> Vec<u8> {
  encode_call(CHARGE_SELECTOR, token, amount)
}

/// Decode a fee-charge payload; `None` for any other selector or a malformed body.
pub fn decode_charge(payload: &[u8]) -> Option<(AssetKind, Balance)> {
  if selector_of(payload)? != CHARGE_SELECTOR {
    return None;
  }
  decode_token_amount(payload)
}
