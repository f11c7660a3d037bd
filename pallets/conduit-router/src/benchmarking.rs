extern crate alloc;

use crate::*;
use alloc::vec;
use polkadot_sdk::frame_benchmarking::v2::*;
use polkadot_sdk::frame_system::RawOrigin;

#[benchmarks]
mod benches {
  use super::*;

  #[benchmark]
  fn execute() {
    let caller: T::AccountId = whitelisted_caller();

    #[extrinsic_call]
    execute(RawOrigin::Signed(caller.clone()), vec![], vec![], vec![], 0);

    assert!(Agents::<T>::get(&caller).is_some());
  }

  #[benchmark]
  fn new_agent() {
    let caller: T::AccountId = whitelisted_caller();

    #[extrinsic_call]
    new_agent(RawOrigin::Signed(caller.clone()), None);

    assert_eq!(
      Agents::<T>::get(&caller),
      Some(Pallet::<T>::predict_agent_address(&caller))
    );
  }

  #[cfg(test)]
  use crate::mock::{Test, new_test_ext};
  #[cfg(test)]
  impl_benchmark_test_suite!(Pallet, new_test_ext(), Test);
}
