#![cfg_attr(rustfmt, rustfmt_skip)]
#![allow(unused_parens)]
#![allow(unused_imports)]
#![allow(missing_docs)]

use core::marker::PhantomData;
use polkadot_sdk::frame_support::{
  traits::Get,
  weights::{constants::RocksDbWeight, Weight},
};

pub trait WeightInfo {
  fn set_fee_calculators(n: u32) -> Weight;
  fn remove_fee_calculators(n: u32) -> Weight;
}

pub struct SubstrateWeight<T>(PhantomData<T>);
impl<T: polkadot_sdk::frame_system::Config + crate::Config> WeightInfo for SubstrateWeight<T> {
  fn set_fee_calculators(n: u32) -> Weight {
    let entries = u64::from(n);
    Weight::from_parts(
      10_000_000u64.saturating_add(entries.saturating_mul(2_000_000)),
      800u64.saturating_add(entries.saturating_mul(64)),
    )
    .saturating_add(T::DbWeight::get().writes(entries))
  }

  fn remove_fee_calculators(n: u32) -> Weight {
    let entries = u64::from(n);
    Weight::from_parts(
      8_000_000u64.saturating_add(entries.saturating_mul(1_500_000)),
      800u64.saturating_add(entries.saturating_mul(64)),
    )
    .saturating_add(T::DbWeight::get().writes(entries))
  }
}

impl WeightInfo for () {
  fn set_fee_calculators(n: u32) -> Weight {
    let entries = u64::from(n.min(64));
    Weight::from_parts(10_000_000u64.saturating_add(entries.saturating_mul(2_000_000)), 800)
  }
  fn remove_fee_calculators(n: u32) -> Weight {
    let entries = u64::from(n.min(64));
    Weight::from_parts(8_000_000u64.saturating_add(entries.saturating_mul(1_500_000)), 800)
  }
}
