//! Conduit Router Pallet
//!
//! Composable transaction routing through per-user isolated agent accounts.
//!
//! A caller hands the router a sequence of logics: opaque venue calls plus the
//! metadata needed to resolve dynamic amounts, grant allowances and police results.
//! The router runs the whole sequence through the caller's agent account inside one
//! atomic extrinsic: it resolves percentage-of-balance inputs against live balances,
//! patches resolved amounts into the outbound payloads, dispatches each call, verifies
//! declared protocol fees against the fee engine's recomputation, and sweeps leftover
//! balances back to the caller. Sanctioned flash-loan style re-entry is scoped to the
//! single party recorded on the currently dispatching logic.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use pallet::*;

pub mod types;
pub use types::{ExecutionContext, LogicDispatcher, NativeWrapper};

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
  use frame::deps::frame_support::traits::{
    fungible::{Inspect as NativeInspect, Mutate as NativeMutate},
    fungibles::{
      Inspect as FungiblesInspect, Mutate as FungiblesMutate,
      approvals::{Inspect as ApprovalsInspect, Mutate as ApprovalsMutate},
    },
    tokens::Preservation,
  };
  use frame::prelude::*;
  use pallet_fee_engine::FeeHandler;
  use polkadot_sdk::frame_support::PalletId;
  use polkadot_sdk::frame_support::storage::with_storage_layer;
  use polkadot_sdk::sp_core::U256;
  use polkadot_sdk::sp_runtime::traits::{AccountIdConversion, Zero};
  use primitives::routing::{self, Fee, Input, Logic, WrapMode};
  use primitives::{AssetInspector, AssetKind, Balance, params};

  #[pallet::config]
  pub trait Config: frame_system::Config {
    /// Native currency interface
    type Currency: NativeInspect<Self::AccountId, Balance = Balance>
      + NativeMutate<Self::AccountId>;

    /// Asset management interface, including the allowance subsystem the approval
    /// manager drives
    type Assets: FungiblesInspect<Self::AccountId, AssetId = u32, Balance = Balance>
      + FungiblesMutate<Self::AccountId>
      + ApprovalsInspect<Self::AccountId>
      + ApprovalsMutate<Self::AccountId>;

    /// Venue call boundary
    type Dispatcher: LogicDispatcher<Self::AccountId>;

    /// On-path fee surface (collector account + declared-fee verification)
    type FeeHandler: FeeHandler<Self::AccountId>;

    /// Native <-> wrapped-native conversion used by `WrapMode`
    type Wrapper: NativeWrapper<Self::AccountId>;

    /// Pallet ID for agent account derivation
    #[pallet::constant]
    type PalletId: Get<PalletId>;

    /// Weight information
    type WeightInfo: WeightInfo;
  }

  #[pallet::pallet]
  pub struct Pallet<T>(PhantomData<T>);

  /// Agent account per user. Created lazily, never replaced.
  #[pallet::storage]
  #[pallet::getter(fn agent_of)]
  pub type Agents<T: Config> =
    StorageMap<_, Blake2_128Concat, T::AccountId, T::AccountId, OptionQuery>;

  /// The single global executing slot, doubling as the reentrancy guard.
  #[pallet::storage]
  pub type Context<T: Config> = StorageValue<_, ExecutionContext<T::AccountId>, OptionQuery>;

  /// Entrant allowed to re-enter while the current logic dispatch is on the stack.
  /// Consumed by the first authorized re-entry, cleared when the dispatch returns.
  #[pallet::storage]
  pub type PendingEntrant<T: Config> = StorageValue<_, T::AccountId, OptionQuery>;

  #[pallet::event]
  #[pallet::generate_deposit(pub(super) fn deposit_event)]
  pub enum Event<T: Config> {
    /// An agent account was created for a user
    AgentCreated {
      user: T::AccountId,
      agent: T::AccountId,
    },
    /// A logic sequence executed successfully
    Executed {
      user: T::AccountId,
      agent: T::AccountId,
      logics: u32,
    },
    /// A sanctioned callback ran a nested logic sequence
    CallbackExecuted { entrant: T::AccountId, logics: u32 },
    /// A fee-charge step paid the collector
    FeeCharged {
      agent: T::AccountId,
      token: AssetKind,
      amount: Balance,
    },
    /// Leftover balance returned to the user
    Swept {
      user: T::AccountId,
      token: AssetKind,
      amount: Balance,
    },
  }

  #[pallet::error]
  pub enum Error<T> {
    /// An execution is already in flight
    Reentrancy,
    /// Re-entry attempted outside a dispatch or by the wrong party
    UnauthorizedCallback,
    /// Percentage input above the basis-point base
    InvalidBps,
    /// Payload patch would write past the end of the payload
    OffsetOutOfBounds,
    /// Post-call balance delta below the declared minimum
    InsufficientOutput,
    /// Explicit agent creation for a user that already has one
    AgentAlreadyExists,
    /// Fee-charge step with an undecodable payload
    ChargePayloadMalformed,
  }

  #[pallet::call]
  impl<T: Config> Pallet<T> {
    /// Execute a logic sequence through the caller's agent.
    ///
    /// Creates the agent on first use. `incoming_value` is moved from the caller to
    /// the agent as its opening working balance. After the sequence runs, `fees` are
    /// verified against the fee engine's recomputation and every token in
    /// `tokens_to_sweep` is drained from the agent back to the caller. Any failure
    /// unwinds the whole extrinsic.
    #[pallet::call_index(0)]
    #[pallet::weight(T::WeightInfo::execute(logics.len() as u32))]
    pub fn execute(
      origin: OriginFor<T>,
      logics: Vec<Logic<T::AccountId>>,
      fees: Vec<Fee>,
      tokens_to_sweep: Vec<AssetKind>,
      incoming_value: Balance,
    ) -> DispatchResult {
      let who = ensure_signed(origin)?;
      ensure!(Context::<T>::get().is_none(), Error::<T>::Reentrancy);
      // All-or-nothing also for direct (non-Executive) invocations, nested callback
      // failures included.
      with_storage_layer(|| {
        let agent = Self::ensure_agent(&who);
        Context::<T>::put(ExecutionContext {
          user: who.clone(),
          agent: agent.clone(),
        });
        if !incoming_value.is_zero() {
          T::Currency::transfer(&who, &agent, incoming_value, Preservation::Preserve)?;
        }
        Self::run_logics(&agent, &logics)?;
        T::FeeHandler::verify_fees(&logics, &fees)?;
        Self::sweep(&agent, &who, &tokens_to_sweep)?;
        Context::<T>::kill();
        Self::deposit_event(Event::Executed {
          user: who.clone(),
          agent,
          logics: logics.len() as u32,
        });
        Ok(())
      })
    }

    /// Re-enter the router from inside an in-flight logic dispatch.
    ///
    /// Only the entrant recorded on the currently dispatching logic may call this, at
    /// most once per dispatch. The nested sequence runs against the same agent and the
    /// same executing context; sweeps go to the original user.
    #[pallet::call_index(1)]
    #[pallet::weight(T::WeightInfo::execute_by_entrant(logics.len() as u32))]
    pub fn execute_by_entrant(
      origin: OriginFor<T>,
      logics: Vec<Logic<T::AccountId>>,
      tokens_to_sweep: Vec<AssetKind>,
    ) -> DispatchResult {
      let who = ensure_signed(origin)?;
      let context = Context::<T>::get().ok_or(Error::<T>::UnauthorizedCallback)?;
      let entrant = PendingEntrant::<T>::get().ok_or(Error::<T>::UnauthorizedCallback)?;
      ensure!(who == entrant, Error::<T>::UnauthorizedCallback);
      with_storage_layer(|| {
        PendingEntrant::<T>::kill();
        Self::run_logics(&context.agent, &logics)?;
        Self::sweep(&context.agent, &context.user, &tokens_to_sweep)?;
        Self::deposit_event(Event::CallbackExecuted {
          entrant: who.clone(),
          logics: logics.len() as u32,
        });
        Ok(())
      })
    }

    /// Explicitly create an agent, for the caller or on behalf of `user`.
    ///
    /// Lets anyone pre-fund a not-yet-created agent at its predicted address. Fails if
    /// the agent already exists so a repeat creation can never reset anything.
    #[pallet::call_index(2)]
    #[pallet::weight(T::WeightInfo::new_agent())]
    pub fn new_agent(origin: OriginFor<T>, user: Option<T::AccountId>) -> DispatchResult {
      let who = ensure_signed(origin)?;
      let user = user.unwrap_or(who);
      ensure!(
        !Agents::<T>::contains_key(&user),
        Error::<T>::AgentAlreadyExists
      );
      Self::create_agent(&user);
      Ok(())
    }
  }

  impl<T: Config> Pallet<T> {
    /// Derive the agent account for a user. Pure; valid before creation.
    ///
    /// The user's identity is folded into the PalletId so uniqueness is preserved even
    /// for small AccountId types where `into_sub_account_truncating` may aggressively
    /// truncate the sub-account payload.
    pub fn predict_agent_address(user: &T::AccountId) -> T::AccountId {
      let mut seed_input = user.encode();
      seed_input.extend_from_slice(b"agent");
      let seed = frame::hashing::blake2_256(&seed_input);
      let mut id_bytes = T::PalletId::get().0;
      for (i, b) in seed.iter().enumerate() {
        id_bytes[i % 8] ^= b;
      }
      PalletId(id_bytes).into_sub_account_truncating(0u64)
    }

    /// Agent of the execution currently in flight, if any.
    ///
    /// Venues use this mid-dispatch to confirm they are being driven on behalf of a
    /// specific, active user context.
    pub fn current_agent() -> Option<T::AccountId> {
      Context::<T>::get().map(|context| context.agent)
    }

    fn ensure_agent(user: &T::AccountId) -> T::AccountId {
      match Agents::<T>::get(user) {
        Some(agent) => agent,
        None => Self::create_agent(user),
      }
    }

    fn create_agent(user: &T::AccountId) -> T::AccountId {
      let agent = Self::predict_agent_address(user);
      Agents::<T>::insert(user, &agent);
      // Agent survives zero native balance via provider reference
      frame_system::Pallet::<T>::inc_providers(&agent);
      Self::deposit_event(Event::AgentCreated {
        user: user.clone(),
        agent: agent.clone(),
      });
      agent
    }

    fn run_logics(agent: &T::AccountId, logics: &[Logic<T::AccountId>]) -> DispatchResult {
      for logic in logics {
        Self::run_logic(agent, logic)?;
      }
      Ok(())
    }

    fn run_logic(agent: &T::AccountId, logic: &Logic<T::AccountId>) -> DispatchResult {
      if logic.wrap_mode == WrapMode::WrapBefore {
        let native = Self::balance_of(AssetKind::Native, agent);
        if !native.is_zero() {
          T::Wrapper::wrap(agent, native)?;
        }
      }

      let mut payload = logic.payload.clone();
      let mut native_value: Balance = 0;
      for input in &logic.inputs {
        let amount = Self::resolve_input(input, agent)?;
        if input.amount_bps != params::SKIP_BPS {
          Self::patch_payload(&mut payload, input.amount_or_offset, amount)?;
        }
        if input.token.is_native() {
          // Native inputs become attached value; no allowance exists for them.
          native_value = native_value.saturating_add(amount);
        } else if input.require_approval {
          let spender = logic
            .approval_target
            .clone()
            .unwrap_or_else(|| logic.target.clone());
          Self::ensure_approval(agent, input.token, &spender, amount)?;
        }
      }

      let balances_before: Vec<Balance> = logic
        .outputs
        .iter()
        .map(|output| Self::balance_of(output.token, agent))
        .collect();

      if let Some(entrant) = &logic.callback_entrant {
        PendingEntrant::<T>::put(entrant.clone());
      }
      let dispatched = Self::dispatch_call(agent, &logic.target, &payload, native_value);
      // Re-entry is scoped to the dispatch; an unconsumed entrant dies with it.
      PendingEntrant::<T>::kill();
      dispatched?;

      if logic.wrap_mode == WrapMode::UnwrapAfter {
        let wrapped = Self::balance_of(T::Wrapper::wrapped_asset(), agent);
        if !wrapped.is_zero() {
          T::Wrapper::unwrap(agent, wrapped)?;
        }
      }

      for (output, before) in logic.outputs.iter().zip(balances_before) {
        let after = Self::balance_of(output.token, agent);
        ensure!(
          after.saturating_sub(before) >= output.min_amount,
          Error::<T>::InsufficientOutput
        );
      }
      Ok(())
    }

    /// Resolve one input to a concrete amount, strictly before the call it feeds.
    fn resolve_input(input: &Input, agent: &T::AccountId) -> Result<Balance, DispatchError> {
      if input.amount_bps == params::SKIP_BPS {
        return Ok(input.amount_or_offset);
      }
      ensure!(input.amount_bps <= params::BPS_BASE, Error::<T>::InvalidBps);
      let balance = Self::balance_of(input.token, agent);
      let resolved = U256::from(balance)
        .saturating_mul(U256::from(input.amount_bps))
        .checked_div(U256::from(params::BPS_BASE))
        .unwrap_or_default();
      // resolved <= balance, so the cast back is lossless
      Ok(resolved.as_u128())
    }

    fn patch_payload(payload: &mut [u8], offset: u128, amount: Balance) -> DispatchResult {
      let offset: usize = offset
        .try_into()
        .map_err(|_| Error::<T>::OffsetOutOfBounds)?;
      ensure!(
        routing::write_amount_be(payload, offset, amount),
        Error::<T>::OffsetOutOfBounds
      );
      Ok(())
    }

    /// Grant the spender an effectively unlimited allowance if the current one cannot
    /// cover `needed`. Never reduces an allowance; a covered repeat is a no-op.
    fn ensure_approval(
      agent: &T::AccountId,
      token: AssetKind,
      spender: &T::AccountId,
      needed: Balance,
    ) -> DispatchResult {
      let id = match token {
        AssetKind::Local(id) | AssetKind::Foreign(id) => id,
        AssetKind::Native => return Ok(()),
      };
      let current = T::Assets::allowance(id, agent, spender);
      if current >= needed {
        return Ok(());
      }
      T::Assets::approve(id, agent, spender, params::UNLIMITED_ALLOWANCE)
    }

    fn dispatch_call(
      agent: &T::AccountId,
      target: &T::AccountId,
      payload: &[u8],
      native_value: Balance,
    ) -> DispatchResult {
      let collector = T::FeeHandler::collector();
      if *target == collector && routing::selector_of(payload) == Some(routing::CHARGE_SELECTOR)
      {
        return Self::charge_fee(agent, &collector, payload);
      }
      if !native_value.is_zero() {
        T::Currency::transfer(agent, target, native_value, Preservation::Expendable)?;
      }
      T::Dispatcher::dispatch(target, agent, payload, native_value)
    }

    /// Fee-charge steps are executed by the router itself rather than a venue.
    fn charge_fee(
      agent: &T::AccountId,
      collector: &T::AccountId,
      payload: &[u8],
    ) -> DispatchResult {
      let (token, amount) =
        routing::decode_charge(payload).ok_or(Error::<T>::ChargePayloadMalformed)?;
      if amount.is_zero() {
        return Ok(());
      }
      Self::transfer_asset(token, agent, collector, amount)?;
      Self::deposit_event(Event::FeeCharged {
        agent: agent.clone(),
        token,
        amount,
      });
      Ok(())
    }

    fn sweep(
      agent: &T::AccountId,
      user: &T::AccountId,
      tokens: &[AssetKind],
    ) -> DispatchResult {
      for token in tokens {
        let balance = Self::balance_of(*token, agent);
        if balance.is_zero() {
          continue;
        }
        Self::transfer_asset(*token, agent, user, balance)?;
        Self::deposit_event(Event::Swept {
          user: user.clone(),
          token: *token,
          amount: balance,
        });
      }
      Ok(())
    }

    pub fn balance_of(token: AssetKind, who: &T::AccountId) -> Balance {
      match token {
        AssetKind::Native => T::Currency::balance(who),
        AssetKind::Local(id) | AssetKind::Foreign(id) => T::Assets::balance(id, who),
      }
    }

    fn transfer_asset(
      token: AssetKind,
      from: &T::AccountId,
      to: &T::AccountId,
      amount: Balance,
    ) -> DispatchResult {
      match token {
        AssetKind::Native => {
          T::Currency::transfer(from, to, amount, Preservation::Expendable)?;
        }
        AssetKind::Local(id) | AssetKind::Foreign(id) => {
          T::Assets::transfer(id, from, to, amount, Preservation::Expendable)?;
        }
      }
      Ok(())
    }
  }
}
