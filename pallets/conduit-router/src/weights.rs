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
  fn execute(n: u32) -> Weight;
  fn execute_by_entrant(n: u32) -> Weight;
  fn new_agent() -> Weight;
}

pub struct SubstrateWeight<T>(PhantomData<T>);
impl<T: polkadot_sdk::frame_system::Config + crate::Config> WeightInfo for SubstrateWeight<T> {
  fn execute(n: u32) -> Weight {
    let logics = u64::from(n);
    Weight::from_parts(
      40_000_000u64.saturating_add(logics.saturating_mul(60_000_000)),
      3000u64.saturating_add(logics.saturating_mul(512)),
    )
    .saturating_add(T::DbWeight::get().reads_writes(
      6u64.saturating_add(logics.saturating_mul(8)),
      4u64.saturating_add(logics.saturating_mul(8)),
    ))
  }

  fn execute_by_entrant(n: u32) -> Weight {
    let logics = u64::from(n);
    Weight::from_parts(
      25_000_000u64.saturating_add(logics.saturating_mul(60_000_000)),
      2200u64.saturating_add(logics.saturating_mul(512)),
    )
    .saturating_add(T::DbWeight::get().reads_writes(
      3u64.saturating_add(logics.saturating_mul(8)),
      2u64.saturating_add(logics.saturating_mul(8)),
    ))
  }

  fn new_agent() -> Weight {
    Weight::from_parts(18_000_000, 1200)
      .saturating_add(T::DbWeight::get().reads(1))
      .saturating_add(T::DbWeight::get().writes(2))
  }
}

impl WeightInfo for () {
  fn execute(n: u32) -> Weight {
    let logics = u64::from(n.min(64));
    Weight::from_parts(40_000_000u64.saturating_add(logics.saturating_mul(60_000_000)), 3000)
  }
  fn execute_by_entrant(n: u32) -> Weight {
    let logics = u64::from(n.min(64));
    Weight::from_parts(25_000_000u64.saturating_add(logics.saturating_mul(60_000_000)), 2200)
  }
  fn new_agent() -> Weight { Weight::from_parts(18_000_000, 1200) }
}
