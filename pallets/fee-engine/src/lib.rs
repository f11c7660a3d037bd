//! Fee Engine Pallet
//!
//! Pluggable per-(operation, target) fee calculators for the Conduit routing engine.
//!
//! The engine never trusts caller arithmetic, only caller intent about which logics to
//! run: an off-path simulation (`get_logics_and_fees`) augments a logic sequence with
//! fee-charge steps and returns the exact fee set, and the on-path verification
//! (`verify_fees`) re-derives that set from the actual logics and the current calculator
//! configuration, rejecting any mismatch.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use pallet::*;

pub mod types;
pub use types::{CalculatorEntry, FeeComputer, FeeHandler};

#[cfg(test)]
pub mod mock;

#[cfg(feature = "runtime-benchmarks")]
mod benchmarking;

pub mod weights;
pub use weights::WeightInfo;

#[frame::pallet]
pub mod pallet {
  use super::*;
  use alloc::vec::Vec;
  use frame::prelude::*;
  use polkadot_sdk::frame_support::PalletId;
  use polkadot_sdk::sp_runtime::traits::AccountIdConversion;
  use primitives::{AssetInspector, Balance};
  use primitives::routing::{self, Fee, Logic, Selector};

  #[pallet::config]
  pub trait Config: frame_system::Config {
    /// Origin allowed to register and remove fee calculators
    type AdminOrigin: frame::deps::frame_support::traits::EnsureOrigin<Self::RuntimeOrigin>;

    /// Calculator dispatch into the runtime-provided set of fee policies
    type Calculators: FeeComputer<Self::AccountId>;

    /// Pallet ID; its account is the fee collector
    #[pallet::constant]
    type PalletId: Get<PalletId>;

    /// Weight information
    type WeightInfo: WeightInfo;
  }

  #[pallet::pallet]
  pub struct Pallet<T>(PhantomData<T>);

  /// Dedicated calculator for one (selector, target) pair.
  ///
  /// Takes precedence over the selector-wide default, so a single venue can carry a
  /// policy distinct from every other venue sharing its operation shape.
  #[pallet::storage]
  pub type FeeCalculators<T: Config> = StorageDoubleMap<
    _,
    Blake2_128Concat,
    Selector,
    Blake2_128Concat,
    T::AccountId,
    CalculatorEntry,
    OptionQuery,
  >;

  /// Selector-wide default calculator shared by every target with that operation shape.
  #[pallet::storage]
  pub type DefaultFeeCalculators<T: Config> =
    StorageMap<_, Blake2_128Concat, Selector, CalculatorEntry, OptionQuery>;

  #[pallet::event]
  #[pallet::generate_deposit(pub(super) fn deposit_event)]
  pub enum Event<T: Config> {
    /// A calculator was registered
    FeeCalculatorSet {
      selector: Selector,
      target: Option<T::AccountId>,
      calculator: u32,
      rate: Balance,
    },
    /// A calculator was removed
    FeeCalculatorRemoved {
      selector: Selector,
      target: Option<T::AccountId>,
    },
  }

  #[pallet::error]
  pub enum Error<T> {
    /// Registration arrays have different lengths
    LengthMismatch,
    /// Declared fees do not match the recomputed set
    FeeVerificationFailed,
  }

  #[pallet::call]
  impl<T: Config> Pallet<T> {
    /// Register fee calculators, keyed by `(selector, target)`.
    ///
    /// A `None` target registers the selector-wide default. Re-registering an existing
    /// key overwrites it. Governance only.
    #[pallet::call_index(0)]
    #[pallet::weight(T::WeightInfo::set_fee_calculators(selectors.len() as u32))]
    pub fn set_fee_calculators(
      origin: OriginFor<T>,
      selectors: Vec<Selector>,
      targets: Vec<Option<T::AccountId>>,
      calculators: Vec<CalculatorEntry>,
    ) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      ensure!(
        selectors.len() == targets.len() && targets.len() == calculators.len(),
        Error::<T>::LengthMismatch
      );
      for ((selector, target), entry) in
        selectors.into_iter().zip(targets).zip(calculators)
      {
        match &target {
          Some(account) => FeeCalculators::<T>::insert(selector, account, entry),
          None => DefaultFeeCalculators::<T>::insert(selector, entry),
        }
        Self::deposit_event(Event::FeeCalculatorSet {
          selector,
          target,
          calculator: entry.calculator,
          rate: entry.rate,
        });
      }
      Ok(())
    }

    /// Remove previously registered calculators. Governance only.
    #[pallet::call_index(1)]
    #[pallet::weight(T::WeightInfo::remove_fee_calculators(selectors.len() as u32))]
    pub fn remove_fee_calculators(
      origin: OriginFor<T>,
      selectors: Vec<Selector>,
      targets: Vec<Option<T::AccountId>>,
    ) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      ensure!(selectors.len() == targets.len(), Error::<T>::LengthMismatch);
      for (selector, target) in selectors.into_iter().zip(targets) {
        match &target {
          Some(account) => FeeCalculators::<T>::remove(selector, account),
          None => DefaultFeeCalculators::<T>::remove(selector),
        }
        Self::deposit_event(Event::FeeCalculatorRemoved { selector, target });
      }
      Ok(())
    }
  }

  impl<T: Config> Pallet<T> {
    /// The fee collector account (derived from PalletId)
    pub fn account_id() -> T::AccountId {
      T::PalletId::get().into_account_truncating()
    }

    /// Resolve the calculator for a `(selector, target)` pair, dedicated entry first.
    pub fn calculator_for(selector: Selector, target: &T::AccountId) -> Option<CalculatorEntry> {
      FeeCalculators::<T>::get(selector, target)
        .or_else(|| DefaultFeeCalculators::<T>::get(selector))
    }

    /// Off-path simulation: augment `logics` with fee-charge steps and return the exact
    /// fee set the on-path verification will expect, merged per token.
    ///
    /// The returned incoming value is bumped by the native fee total so the caller can
    /// fund native fees up front.
    pub fn get_logics_and_fees(
      logics: Vec<Logic<T::AccountId>>,
      incoming_value: Balance,
    ) -> (Vec<Logic<T::AccountId>>, Balance, Vec<Fee>) {
      let collector = Self::account_id();
      let mut augmented = Vec::with_capacity(logics.len() * 2);
      let mut fees: Vec<Fee> = Vec::new();
      for logic in logics {
        let fee = Self::fee_for_logic(&logic);
        augmented.push(logic);
        if let Some(fee) = fee {
          augmented.push(Logic::new(
            collector.clone(),
            routing::encode_charge(fee.token, fee.amount),
          ));
          Self::merge_fee(&mut fees, fee);
        }
      }
      let native_total = fees
        .iter()
        .filter(|fee| fee.token.is_native())
        .fold(0u128, |acc, fee| acc.saturating_add(fee.amount));
      (augmented, incoming_value.saturating_add(native_total), fees)
    }

    /// Recompute the fee set from the fee-bearing logics of a sequence.
    pub fn compute_fees(logics: &[Logic<T::AccountId>]) -> Vec<Fee> {
      let mut fees = Vec::new();
      for logic in logics {
        if let Some(fee) = Self::fee_for_logic(logic) {
          Self::merge_fee(&mut fees, fee);
        }
      }
      fees
    }

    /// On-path verification: the declared set and the charge steps present in the
    /// sequence must both equal the recomputed set, element-wise.
    pub fn verify_fees(logics: &[Logic<T::AccountId>], declared: &[Fee]) -> DispatchResult {
      let expected = Self::compute_fees(logics);
      ensure!(declared == expected.as_slice(), Error::<T>::FeeVerificationFailed);
      let expected_amounts: Vec<(primitives::AssetKind, Balance)> =
        expected.iter().map(|fee| (fee.token, fee.amount)).collect();
      ensure!(
        Self::charged_amounts(logics) == expected_amounts,
        Error::<T>::FeeVerificationFailed
      );
      Ok(())
    }

    /// Fee owed by one logic, if any. Charge steps themselves never bear fees.
    fn fee_for_logic(logic: &Logic<T::AccountId>) -> Option<Fee> {
      let selector = routing::selector_of(&logic.payload)?;
      if selector == routing::CHARGE_SELECTOR {
        return None;
      }
      let entry = Self::calculator_for(selector, &logic.target)?;
      T::Calculators::compute(entry.calculator, entry.rate, &logic.target, &logic.payload)
    }

    /// Sum the charge steps of a sequence, merged per token in first-appearance order.
    fn charged_amounts(
      logics: &[Logic<T::AccountId>],
    ) -> Vec<(primitives::AssetKind, Balance)> {
      let collector = Self::account_id();
      let mut charged: Vec<(primitives::AssetKind, Balance)> = Vec::new();
      for logic in logics {
        if logic.target != collector {
          continue;
        }
        if let Some((token, amount)) = routing::decode_charge(&logic.payload) {
          match charged.iter_mut().find(|(existing, _)| *existing == token) {
            Some((_, total)) => *total = total.saturating_add(amount),
            None => charged.push((token, amount)),
          }
        }
      }
      charged
    }

    fn merge_fee(fees: &mut Vec<Fee>, fee: Fee) {
      match fees.iter_mut().find(|existing| existing.token == fee.token) {
        Some(existing) => existing.amount = existing.amount.saturating_add(fee.amount),
        None => fees.push(fee),
      }
    }
  }

  impl<T: Config> FeeHandler<T::AccountId> for Pallet<T> {
    fn collector() -> T::AccountId {
      Self::account_id()
    }

    fn verify_fees(logics: &[Logic<T::AccountId>], declared: &[Fee]) -> DispatchResult {
      Pallet::<T>::verify_fees(logics, declared)
    }
  }

  /// Genesis configuration ensuring the collector account is ED-free
  #[pallet::genesis_config]
  #[derive(frame::prelude::DefaultNoBound)]
  pub struct GenesisConfig<T: Config> {
    #[serde(skip)]
    pub _marker: core::marker::PhantomData<T>,
  }

  #[pallet::genesis_build]
  impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
    fn build(&self) {
      // Collector account survives zero native balance via provider reference
      frame_system::Pallet::<T>::inc_providers(&Pallet::<T>::account_id());
    }
  }
}
