use crate as pallet_conduit_router;

use polkadot_sdk::frame_support::traits::fungible::Mutate as FungibleMutate;
use polkadot_sdk::frame_support::traits::fungibles::Mutate as FungiblesMutate;
use polkadot_sdk::frame_support::traits::fungibles::approvals::Mutate as ApprovalsMutate;
use polkadot_sdk::frame_support::traits::tokens::{Fortitude, Precision, Preservation};
use polkadot_sdk::frame_support::{
  PalletId, construct_runtime, derive_impl,
  traits::{AsEnsureOriginWithArg, ConstU32, ConstU128, Currency, Get},
};
use polkadot_sdk::frame_system;
use polkadot_sdk::sp_runtime::{
  BuildStorage, DispatchError, DispatchResult,
  testing::H256,
  traits::{BlakeTwo256, IdentityLookup},
};

use crate::types::{LogicDispatcher, NativeWrapper};
use codec::{Decode, Encode};
use primitives::routing::{self, Fee, Logic, Selector};
use primitives::{AssetKind, params};
use std::cell::RefCell;
use std::collections::BTreeMap;

// Test actors
pub const ALICE: u64 = 1;
pub const BOB: u64 = 2;

// Mock venues
pub const EXCHANGE_A: u64 = 1001;
pub const EXCHANGE_B: u64 = 1002;
pub const FLASH_LENDER: u64 = 2001;
pub const DOUBLE_CALLBACK_LENDER: u64 = 2002;
pub const NOOP_VENUE: u64 = 3001;
pub const OBSERVER_VENUE: u64 = 3002;
pub const REENTRANT_VILLAIN: u64 = 666;
pub const HIJACKER_VENUE: u64 = 667;

// Venue operation selectors
pub const SWAP_SELECTOR: Selector = *b"swap";
pub const FLASH_SELECTOR: Selector = *b"flsh";
pub const REPAY_SELECTOR: Selector = *b"repy";
pub const NOOP_SELECTOR: Selector = *b"noop";

pub const WRAPPED_NATIVE_ID: u32 = 9000;
pub const WRAPPED_NATIVE: AssetKind = AssetKind::Local(WRAPPED_NATIVE_ID);

// State containers for stateful mocks
thread_local! {
    // Exchange venues: account -> (token_in, token_out, rate numerator, rate denominator)
    pub static EXCHANGES: RefCell<BTreeMap<u64, (AssetKind, AssetKind, u128, u128)>> = const { RefCell::new(BTreeMap::new()) };

    // Agents the observer venue saw mid-dispatch
    pub static OBSERVED_AGENTS: RefCell<Vec<Option<u64>>> = const { RefCell::new(Vec::new()) };
}

pub fn set_exchange(venue: u64, token_in: AssetKind, token_out: AssetKind, num: u128, den: u128) {
  EXCHANGES.with(|e| {
    e.borrow_mut().insert(venue, (token_in, token_out, num, den));
  });
}

pub fn observed_agents() -> Vec<Option<u64>> {
  OBSERVED_AGENTS.with(|o| o.borrow().clone())
}

type Block = frame_system::mocking::MockBlock<Test>;

construct_runtime!(
  pub struct Test {
    System: frame_system,
    Balances: polkadot_sdk::pallet_balances,
    Assets: polkadot_sdk::pallet_assets,
    FeeEngine: pallet_fee_engine,
    ConduitRouter: pallet_conduit_router,
  }
);

#[derive_impl(frame_system::config_preludes::TestDefaultConfig)]
impl frame_system::Config for Test {
  type Block = Block;
  type AccountId = u64;
  type Lookup = IdentityLookup<Self::AccountId>;
  type Hash = H256;
  type Hashing = BlakeTwo256;
  type AccountData = polkadot_sdk::pallet_balances::AccountData<u128>;
}

impl polkadot_sdk::pallet_balances::Config for Test {
  type MaxLocks = ();
  type MaxReserves = ();
  type ReserveIdentifier = [u8; 8];
  type Balance = u128;
  type DustRemoval = ();
  type RuntimeEvent = RuntimeEvent;
  type ExistentialDeposit = ConstU128<1>;
  type AccountStore = System;
  type WeightInfo = ();
  type FreezeIdentifier = ();
  type MaxFreezes = ();
  type RuntimeHoldReason = ();
  type RuntimeFreezeReason = ();
  type DoneSlashHandler = ();
}

impl polkadot_sdk::pallet_assets::Config for Test {
  type RuntimeEvent = RuntimeEvent;
  type Balance = u128;
  type AssetId = u32;
  type AssetIdParameter = u32;
  type Currency = Balances;
  type CreateOrigin = AsEnsureOriginWithArg<frame_system::EnsureSigned<Self::AccountId>>;
  type ForceOrigin = frame_system::EnsureRoot<Self::AccountId>;
  type AssetDeposit = ConstU128<1>;
  type AssetAccountDeposit = ConstU128<1>;
  type MetadataDepositBase = ConstU128<1>;
  type MetadataDepositPerByte = ConstU128<1>;
  // Agents hold no native working capital of their own, so allowance grants must not
  // demand a deposit from them.
  type ApprovalDeposit = ConstU128<0>;
  type StringLimit = ConstU32<50>;
  type Freezer = ();
  type Extra = ();
  type ReserveData = ();
  type CallbackHandle = ();
  type WeightInfo = ();
  type RemoveItemsLimit = ConstU32<5>;
  type Holder = ();
  #[cfg(feature = "runtime-benchmarks")]
  type BenchmarkHelper = AssetBenchmarkHelper;
}

#[cfg(feature = "runtime-benchmarks")]
pub struct AssetBenchmarkHelper;

#[cfg(feature = "runtime-benchmarks")]
impl polkadot_sdk::pallet_assets::BenchmarkHelper<u32, ()> for AssetBenchmarkHelper {
  fn create_asset_id_parameter(id: u32) -> u32 {
    id
  }
  fn create_reserve_id_parameter(_id: u32) -> () {
    ()
  }
}

// MOCK CALCULATORS

/// Proportional calculator: fee = payload amount * rate (bps) / 10_000, in the payload token
pub const CALC_PAYLOAD_BPS: u32 = 1;
/// Flat calculator: fee = rate, in the native token
pub const CALC_FLAT_NATIVE: u32 = 2;

pub struct MockCalculators;
impl pallet_fee_engine::FeeComputer<u64> for MockCalculators {
  fn compute(calculator: u32, rate: u128, _target: &u64, payload: &[u8]) -> Option<Fee> {
    match calculator {
      CALC_PAYLOAD_BPS => {
        let (token, amount) = routing::decode_token_amount(payload)?;
        let fee = amount.saturating_mul(rate) / u128::from(params::BPS_BASE);
        (fee > 0).then(|| Fee {
          token,
          amount: fee,
          metadata: b"payload-bps".to_vec(),
        })
      }
      CALC_FLAT_NATIVE => Some(Fee {
        token: AssetKind::Native,
        amount: rate,
        metadata: b"flat-native".to_vec(),
      }),
      _ => None,
    }
  }
}

pub struct FeeEnginePalletIdStub;
impl Get<PalletId> for FeeEnginePalletIdStub {
  fn get() -> PalletId {
    PalletId(*primitives::pallet_ids::FEE_ENGINE_PALLET_ID)
  }
}

impl pallet_fee_engine::Config for Test {
  type AdminOrigin = frame_system::EnsureRoot<u64>;
  type Calculators = MockCalculators;
  type PalletId = FeeEnginePalletIdStub;
  type WeightInfo = ();
}

// MOCK VENUES

/// Flash-loan request carried behind `FLASH_SELECTOR`: the loan plus the nested
/// sequence the lender replays through the router's callback path.
#[derive(Clone, Debug, Decode, Encode, Eq, PartialEq)]
pub struct FlashOp {
  pub token: AssetKind,
  pub amount: u128,
  pub logics: Vec<Logic<u64>>,
  pub tokens_to_sweep: Vec<AssetKind>,
}

pub struct MockDispatcher;
impl LogicDispatcher<u64> for MockDispatcher {
  fn dispatch(target: &u64, agent: &u64, payload: &[u8], native_value: u128) -> DispatchResult {
    match *target {
      NOOP_VENUE => Ok(()),
      OBSERVER_VENUE => {
        OBSERVED_AGENTS.with(|o| o.borrow_mut().push(ConduitRouter::current_agent()));
        Ok(())
      }
      EXCHANGE_A | EXCHANGE_B => dispatch_exchange(*target, agent, payload, native_value),
      FLASH_LENDER => match routing::selector_of(payload) {
        Some(FLASH_SELECTOR) => dispatch_flash_loan(agent, payload),
        Some(REPAY_SELECTOR) => dispatch_repayment(agent, payload),
        _ => Err(DispatchError::Other("FlashLender: unknown operation")),
      },
      DOUBLE_CALLBACK_LENDER => dispatch_double_callback(),
      REENTRANT_VILLAIN => {
        // Try to open a second execution from inside the current one.
        ConduitRouter::execute(
          RuntimeOrigin::signed(REENTRANT_VILLAIN),
          vec![],
          vec![],
          vec![],
          0,
        )
      }
      HIJACKER_VENUE => {
        // Use the callback path without being the recorded entrant.
        ConduitRouter::execute_by_entrant(RuntimeOrigin::signed(HIJACKER_VENUE), vec![], vec![])
      }
      _ => Err(DispatchError::Other("unknown venue")),
    }
  }
}

/// Fixed-rate exchange: pulls `amount_in` of its input token through the allowance the
/// router granted (or consumes attached native value) and mints the output to the agent.
fn dispatch_exchange(venue: u64, agent: &u64, payload: &[u8], native_value: u128) -> DispatchResult {
  let (token_in, token_out, num, den) = EXCHANGES
    .with(|e| e.borrow().get(&venue).cloned())
    .ok_or(DispatchError::Other("Exchange not configured"))?;
  let (payload_token, amount_in) = routing::decode_token_amount(payload)
    .ok_or(DispatchError::Other("Exchange: bad payload"))?;
  if payload_token != token_in {
    return Err(DispatchError::Other("Exchange: unsupported input token"));
  }

  match token_in {
    AssetKind::Native => {
      // Call value was already attached by the router.
      if native_value < amount_in {
        return Err(DispatchError::Other("Exchange: insufficient call value"));
      }
    }
    AssetKind::Local(id) | AssetKind::Foreign(id) => {
      <Assets as ApprovalsMutate<u64>>::transfer_from(id, agent, &venue, &venue, amount_in)?;
    }
  }

  let amount_out = amount_in.saturating_mul(num) / den;
  match token_out {
    AssetKind::Native => {
      <Balances as FungibleMutate<u64>>::mint_into(agent, amount_out)?;
    }
    AssetKind::Local(id) | AssetKind::Foreign(id) => {
      <Assets as FungiblesMutate<u64>>::mint_into(id, agent, amount_out)?;
    }
  }
  Ok(())
}

/// Flash lender: advances the loan, re-enters the router through the callback path, and
/// refuses to return unless its pool has been made whole.
fn dispatch_flash_loan(agent: &u64, payload: &[u8]) -> DispatchResult {
  let mut body = &payload[4..];
  let op =
    FlashOp::decode(&mut body).map_err(|_| DispatchError::Other("FlashLender: bad payload"))?;
  let pool_before = crate::Pallet::<Test>::balance_of(op.token, &FLASH_LENDER);
  if pool_before < op.amount {
    return Err(DispatchError::Other("FlashLender: insufficient liquidity"));
  }
  mock_transfer(op.token, &FLASH_LENDER, agent, op.amount)?;
  ConduitRouter::execute_by_entrant(
    RuntimeOrigin::signed(FLASH_LENDER),
    op.logics,
    op.tokens_to_sweep,
  )?;
  if crate::Pallet::<Test>::balance_of(op.token, &FLASH_LENDER) < pool_before {
    return Err(DispatchError::Other("FlashLender: loan not repaid"));
  }
  Ok(())
}

fn dispatch_repayment(agent: &u64, payload: &[u8]) -> DispatchResult {
  let (token, amount) = routing::decode_token_amount(payload)
    .ok_or(DispatchError::Other("FlashLender: bad repayment"))?;
  mock_transfer(token, agent, &FLASH_LENDER, amount)
}

/// Lender that tries the callback path twice; the second attempt must be rejected.
fn dispatch_double_callback() -> DispatchResult {
  ConduitRouter::execute_by_entrant(
    RuntimeOrigin::signed(DOUBLE_CALLBACK_LENDER),
    vec![],
    vec![],
  )?;
  match ConduitRouter::execute_by_entrant(
    RuntimeOrigin::signed(DOUBLE_CALLBACK_LENDER),
    vec![],
    vec![],
  ) {
    Err(error) if error == crate::Error::<Test>::UnauthorizedCallback.into() => Ok(()),
    Ok(()) => Err(DispatchError::Other("second callback unexpectedly authorized")),
    Err(error) => Err(error),
  }
}

fn mock_transfer(token: AssetKind, from: &u64, to: &u64, amount: u128) -> DispatchResult {
  match token {
    AssetKind::Native => {
      <Balances as FungibleMutate<u64>>::transfer(from, to, amount, Preservation::Expendable)?;
    }
    AssetKind::Local(id) | AssetKind::Foreign(id) => {
      <Assets as FungiblesMutate<u64>>::transfer(id, from, to, amount, Preservation::Expendable)?;
    }
  }
  Ok(())
}

/// 1:1 wrapped-native adapter backed by a dedicated asset.
pub struct MockWrapper;
impl NativeWrapper<u64> for MockWrapper {
  fn wrapped_asset() -> AssetKind {
    WRAPPED_NATIVE
  }

  fn wrap(who: &u64, amount: u128) -> DispatchResult {
    <Balances as FungibleMutate<u64>>::burn_from(
      who,
      amount,
      Preservation::Expendable,
      Precision::Exact,
      Fortitude::Polite,
    )?;
    <Assets as FungiblesMutate<u64>>::mint_into(WRAPPED_NATIVE_ID, who, amount)?;
    Ok(())
  }

  fn unwrap(who: &u64, amount: u128) -> DispatchResult {
    <Assets as FungiblesMutate<u64>>::burn_from(
      WRAPPED_NATIVE_ID,
      who,
      amount,
      Preservation::Expendable,
      Precision::Exact,
      Fortitude::Polite,
    )?;
    <Balances as FungibleMutate<u64>>::mint_into(who, amount)?;
    Ok(())
  }
}

pub struct RouterPalletIdStub;
impl Get<PalletId> for RouterPalletIdStub {
  fn get() -> PalletId {
    PalletId(*primitives::pallet_ids::CONDUIT_ROUTER_PALLET_ID)
  }
}

impl pallet_conduit_router::Config for Test {
  type Currency = Balances;
  type Assets = Assets;
  type Dispatcher = MockDispatcher;
  type FeeHandler = FeeEngine;
  type Wrapper = MockWrapper;
  type PalletId = RouterPalletIdStub;
  type WeightInfo = ();
}

// Payload builders shared by the test suite

pub fn swap_payload(token_in: AssetKind, amount: u128) -> Vec<u8> {
  routing::encode_call(SWAP_SELECTOR, token_in, amount)
}

pub fn repay_payload(token: AssetKind, amount: u128) -> Vec<u8> {
  routing::encode_call(REPAY_SELECTOR, token, amount)
}

pub fn flash_payload(op: &FlashOp) -> Vec<u8> {
  let mut payload = FLASH_SELECTOR.to_vec();
  op.encode_to(&mut payload);
  payload
}

pub fn noop_payload() -> Vec<u8> {
  NOOP_SELECTOR.to_vec()
}

pub fn balance_of(token: AssetKind, who: u64) -> u128 {
  crate::Pallet::<Test>::balance_of(token, &who)
}

pub fn new_test_ext() -> polkadot_sdk::sp_io::TestExternalities {
  let ext = frame_system::GenesisConfig::<Test>::default()
    .build_storage()
    .unwrap();
  let mut ext: polkadot_sdk::sp_io::TestExternalities = ext.into();

  // Reset thread locals
  EXCHANGES.with(|e| e.borrow_mut().clear());
  OBSERVED_AGENTS.with(|o| o.borrow_mut().clear());

  ext.execute_with(|| {
    System::set_block_number(1);

    // Pre-fund actors, venues and the fee collector with native balance. The collector
    // needs a provider reference to receive insufficient assets.
    let collector = pallet_fee_engine::Pallet::<Test>::account_id();
    let accounts = vec![
      ALICE,
      BOB,
      EXCHANGE_A,
      EXCHANGE_B,
      FLASH_LENDER,
      NOOP_VENUE,
      collector,
    ];
    for acc in accounts {
      let _ = Balances::deposit_creating(&acc, 10_000 * params::PRECISION);
    }

    // Create test assets (1..=3 plus the wrapped-native asset) and seed balances
    for asset_id in [1u32, 2, 3, WRAPPED_NATIVE_ID] {
      let _ = Assets::create(RuntimeOrigin::signed(ALICE), asset_id, ALICE, 1);
      let initial_balance = 10_000 * params::PRECISION;
      let _ = Assets::mint_into(asset_id, &ALICE, initial_balance);
      let _ = Assets::mint_into(asset_id, &BOB, initial_balance);
      let _ = Assets::mint_into(asset_id, &FLASH_LENDER, initial_balance);
    }
  });
  ext
}
