extern crate alloc;

use crate::*;
use alloc::vec;
use polkadot_sdk::frame_benchmarking::v2::*;
use polkadot_sdk::frame_system::RawOrigin;

#[benchmarks]
mod benches {
  use super::*;

  #[benchmark]
  fn set_fee_calculators() {
    let entry = CalculatorEntry {
      calculator: 1,
      rate: 50,
    };

    #[extrinsic_call]
    set_fee_calculators(RawOrigin::Root, vec![*b"swap"], vec![None], vec![entry]);

    assert!(DefaultFeeCalculators::<T>::get(*b"swap").is_some());
  }

  #[benchmark]
  fn remove_fee_calculators() {
    let entry = CalculatorEntry {
      calculator: 1,
      rate: 50,
    };
    Pallet::<T>::set_fee_calculators(RawOrigin::Root.into(), vec![*b"swap"], vec![None], vec![
      entry,
    ])
    .expect("Failed to register calculator");

    #[extrinsic_call]
    remove_fee_calculators(RawOrigin::Root, vec![*b"swap"], vec![None]);

    assert!(DefaultFeeCalculators::<T>::get(*b"swap").is_none());
  }

  #[cfg(test)]
  use crate::mock::{Test, new_test_ext};
  #[cfg(test)]
  impl_benchmark_test_suite!(Pallet, new_test_ext(), Test);
}
