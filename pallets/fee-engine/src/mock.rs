use crate as pallet_fee_engine;

use polkadot_sdk::frame_support::{PalletId, construct_runtime, derive_impl, traits::Get};
use polkadot_sdk::frame_system;
use polkadot_sdk::sp_runtime::{
  BuildStorage,
  testing::H256,
  traits::{BlakeTwo256, IdentityLookup},
};

use primitives::routing::{self, Fee, Logic};
use primitives::{AssetKind, params};

type Block = frame_system::mocking::MockBlock<Test>;

construct_runtime!(
  pub struct Test {
    System: frame_system,
    FeeEngine: pallet_fee_engine,
  }
);

#[derive_impl(frame_system::config_preludes::TestDefaultConfig)]
impl frame_system::Config for Test {
  type Block = Block;
  type AccountId = u64;
  type Lookup = IdentityLookup<Self::AccountId>;
  type Hash = H256;
  type Hashing = BlakeTwo256;
}

// MOCK CALCULATORS

/// Proportional calculator: fee = payload amount * rate (bps) / 10_000, in the payload token
pub const CALC_PAYLOAD_BPS: u32 = 1;
/// Flat calculator: fee = rate, in the native token
pub const CALC_FLAT_NATIVE: u32 = 2;

pub struct MockCalculators;
impl pallet_fee_engine::types::FeeComputer<u64> for MockCalculators {
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

pub struct PalletIdStub;
impl Get<PalletId> for PalletIdStub {
  fn get() -> PalletId {
    PalletId(*primitives::pallet_ids::FEE_ENGINE_PALLET_ID)
  }
}

impl pallet_fee_engine::Config for Test {
  type AdminOrigin = frame_system::EnsureRoot<u64>;
  type Calculators = MockCalculators;
  type PalletId = PalletIdStub;
  type WeightInfo = ();
}

/// Standard swap-shaped venue payload: `[b"swap" | token | amount]`
pub fn swap_logic(target: u64, token: AssetKind, amount: u128) -> Logic<u64> {
  Logic::new(target, routing::encode_call(*b"swap", token, amount))
}

pub fn new_test_ext() -> polkadot_sdk::sp_io::TestExternalities {
  let ext = frame_system::GenesisConfig::<Test>::default()
    .build_storage()
    .unwrap();
  let mut ext: polkadot_sdk::sp_io::TestExternalities = ext.into();
  ext.execute_with(|| {
    System::set_block_number(1);
  });
  ext
}
