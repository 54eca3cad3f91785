//! # Vault Router Pallet
//!
//! Pools a stable unit on behalf of an upstream pallet and spreads it across a set of
//! yield-bearing backends according to target weights.
//!
//! ## Overview
//!
//! Every backend is reached through a converter that translates stable units into the
//! backend's shares and back. Shares are parked with a custody holder; the router never
//! keeps positions on its own account. Value moves in three ways:
//!
//! - **Automatic** (`deposit`, `withdraw`): candidates are ranked by how far their
//!   current allocation sits from target and tried one at a time. Transient backend
//!   failures fall through to the next candidate inside a metered retry budget.
//! - **Solver** (`solver_*`): the caller names every leg explicitly. Legs run in order
//!   with no selection, no health probes and no retries; the batch is all-or-nothing.
//! - **Exchange** (`exchange_assets`, `rebalance`): value moves between two backends
//!   without leaving custody's accounting.
//!
//! Converter reports are cross-checked against observed custody and stable-unit deltas.
//! A converter that misreports its backend or under-delivers aborts the whole operation.
//!
//! Stable units left on the router account after an operation are tracked as surplus and
//! can later be swept into the default backend.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use pallet::*;

pub mod converters;
pub use converters::{ConverterFamily, FamilyDispatch, PassThroughConverter};

pub mod types;
pub use types::*;

pub mod weights;
pub use weights::WeightInfo;

#[cfg(test)]
mod mock;

#[cfg(feature = "runtime-benchmarks")]
mod benchmarking;

pub const LOG_TARGET: &str = "runtime::vault-router";

#[frame::pallet]
pub mod pallet {
  use super::*;
  use alloc::{collections::BTreeSet, vec::Vec};
  use frame::prelude::*;
  use polkadot_sdk::frame_support::{
    PalletId,
    storage::with_storage_layer,
    traits::{
      EnsureOrigin,
      fungibles::{Inspect as FungiblesInspect, Mutate as FungiblesMutate},
      tokens::Preservation,
    },
  };
  use polkadot_sdk::sp_runtime::{
    ArithmeticError, TokenError,
    traits::{AccountIdConversion, Zero},
  };
  use primitives::{
    allocation::{self, AllocationError},
    params::{
      ALLOCATION_SCALE, DEFAULT_DUST_TOLERANCE, DEFAULT_MAX_BACKENDS_PER_OPERATION, MAX_BACKENDS,
    },
  };

  /// Explicit `(backend, amount)` legs of a solver batch
  pub type SolverLegs<T> = BoundedVec<(BackendId, Balance), <T as Config>::MaxBackends>;

  #[pallet::pallet]
  pub struct Pallet<T>(_);

  #[pallet::config]
  pub trait Config: frame_system::Config {
    /// Fungibles holding the stable unit
    type Assets: FungiblesInspect<Self::AccountId, AssetId = u32, Balance = Balance>
      + FungiblesMutate<Self::AccountId, AssetId = u32, Balance = Balance>;

    /// Asset id of the pooled stable unit
    #[pallet::constant]
    type StableAsset: Get<u32>;

    /// Holder of backend positions
    type Custody: Custody<Self::AccountId>;

    /// Converter lookup keyed by [`ConverterRef`]
    type Converter: Converter<Self::AccountId>;

    /// Origin allowed to configure backends and router parameters
    type AdminOrigin: EnsureOrigin<Self::RuntimeOrigin>;

    /// Origin of the pallet whose pooled value is routed; resolves to the paying account
    type UpstreamOrigin: EnsureOrigin<Self::RuntimeOrigin, Success = Self::AccountId>;

    /// Origin allowed to move value directly between backends
    type ExchangerOrigin: EnsureOrigin<Self::RuntimeOrigin>;

    #[pallet::constant]
    type PalletId: Get<PalletId>;

    /// Upper bound on configured backends
    #[pallet::constant]
    type MaxBackends: Get<u32>;

    /// Reference deposit used to probe backend health before automatic deposits
    #[pallet::constant]
    type HealthProbeAmount: Get<Balance>;

    /// Retry allowance consumed by one routing attempt
    #[pallet::constant]
    type AttemptWeight: Get<Weight>;

    /// Retry allowance that must remain for completing the operation
    #[pallet::constant]
    type CompletionReserve: Get<Weight>;

    type WeightInfo: WeightInfo;

    #[cfg(feature = "runtime-benchmarks")]
    type BenchmarkHelper: BenchmarkHelper<Self::AccountId>;
  }

  #[pallet::type_value]
  pub fn DefaultDustTolerance<T: Config>() -> Balance {
    DEFAULT_DUST_TOLERANCE
  }

  #[pallet::type_value]
  pub fn DefaultMaxBackendsPerOperation<T: Config>() -> u32 {
    DEFAULT_MAX_BACKENDS_PER_OPERATION.min(T::MaxBackends::get())
  }

  #[pallet::type_value]
  pub fn DefaultMaxBackendCount<T: Config>() -> u32 {
    T::MaxBackends::get()
  }

  /// Configured backends in insertion order
  #[pallet::storage]
  pub type Backends<T: Config> =
    StorageValue<_, BoundedVec<BackendConfig, T::MaxBackends>, ValueQuery>;

  /// Position of each configured backend inside [`Backends`]
  #[pallet::storage]
  pub type BackendIndex<T: Config> = StorageMap<_, Blake2_128Concat, BackendId, u32, OptionQuery>;

  #[pallet::storage]
  pub type ConverterBindings<T: Config> =
    StorageMap<_, Blake2_128Concat, BackendId, ConverterRef, OptionQuery>;

  #[pallet::storage]
  pub type Paused<T: Config> = StorageValue<_, bool, ValueQuery>;

  /// Absolute stable-unit shortfall ignored by slippage checks
  #[pallet::storage]
  pub type DustTolerance<T: Config> =
    StorageValue<_, Balance, ValueQuery, DefaultDustTolerance<T>>;

  /// Candidate cap for a single automatic operation
  #[pallet::storage]
  pub type MaxBackendsPerOperation<T: Config> =
    StorageValue<_, u32, ValueQuery, DefaultMaxBackendsPerOperation<T>>;

  /// Administrative cap on configured backends, never above `MaxBackends`
  #[pallet::storage]
  pub type MaxBackendCount<T: Config> =
    StorageValue<_, u32, ValueQuery, DefaultMaxBackendCount<T>>;

  /// Destination for swept surplus
  #[pallet::storage]
  pub type DefaultBackend<T: Config> = StorageValue<_, BackendId, OptionQuery>;

  /// Stable units held by the router account outside any backend
  #[pallet::storage]
  pub type Surplus<T: Config> = StorageValue<_, Balance, ValueQuery>;

  /// Value stranded in backends removed as impaired
  #[pallet::storage]
  pub type RecognizedLosses<T: Config> =
    StorageMap<_, Blake2_128Concat, BackendId, ImpairmentRecord<BlockNumberFor<T>>, OptionQuery>;

  #[pallet::genesis_config]
  pub struct GenesisConfig<T: Config> {
    pub backends: Vec<BackendConfig>,
    pub bindings: Vec<(BackendId, ConverterRef)>,
    pub dust_tolerance: Balance,
    pub max_backends_per_operation: u32,
    pub default_backend: Option<BackendId>,
    #[serde(skip)]
    pub _marker: core::marker::PhantomData<T>,
  }

  impl<T: Config> Default for GenesisConfig<T> {
    fn default() -> Self {
      Self {
        backends: Vec::new(),
        bindings: Vec::new(),
        dust_tolerance: DEFAULT_DUST_TOLERANCE,
        max_backends_per_operation: DEFAULT_MAX_BACKENDS_PER_OPERATION,
        default_backend: None,
        _marker: Default::default(),
      }
    }
  }

  #[pallet::genesis_build]
  impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
    fn build(&self) {
      frame_system::Pallet::<T>::inc_providers(&Pallet::<T>::account_id());

      if !self.backends.is_empty() {
        let weights: Vec<Ppm> = self.backends.iter().map(|b| b.target_weight).collect();
        assert!(
          allocation::is_full_allocation(&weights),
          "Genesis backend weights must sum to the allocation scale"
        );
        let records: BoundedVec<BackendConfig, T::MaxBackends> = self
          .backends
          .clone()
          .try_into()
          .expect("Genesis backends exceed MaxBackends");
        for (index, config) in records.iter().enumerate() {
          assert!(config.has_valid_id(), "Genesis backend id must be nonzero");
          assert!(
            !BackendIndex::<T>::contains_key(config.id),
            "Duplicate genesis backend"
          );
          BackendIndex::<T>::insert(config.id, index as u32);
        }
        Backends::<T>::put(records);
      }

      for (backend, converter) in &self.bindings {
        assert!(
          BackendIndex::<T>::contains_key(backend),
          "Genesis binding for unknown backend"
        );
        assert_eq!(
          T::Converter::backend_identifier(*converter),
          Some(*backend),
          "Genesis converter reports a different backend"
        );
        if !T::Custody::is_supported(*backend) {
          T::Custody::add_supported(*backend).expect("Custody rejected genesis backend");
        }
        ConverterBindings::<T>::insert(backend, converter);
      }

      DustTolerance::<T>::put(self.dust_tolerance);
      MaxBackendsPerOperation::<T>::put(
        self
          .max_backends_per_operation
          .clamp(1, T::MaxBackends::get().max(1)),
      );
      if let Some(backend) = self.default_backend {
        assert!(
          BackendIndex::<T>::contains_key(backend),
          "Genesis default backend is not configured"
        );
        DefaultBackend::<T>::put(backend);
      }
    }
  }

  #[pallet::hooks]
  impl<T: Config> Hooks<BlockNumberFor<T>> for Pallet<T> {
    fn integrity_test() {
      assert!(T::MaxBackends::get() > 0, "MaxBackends must be nonzero");
      assert!(
        T::MaxBackends::get() <= MAX_BACKENDS,
        "MaxBackends exceeds the supported backend count"
      );
      assert!(
        !T::AttemptWeight::get().is_zero(),
        "AttemptWeight must be nonzero"
      );
    }

    #[cfg(feature = "try-runtime")]
    fn try_state(_n: BlockNumberFor<T>) -> Result<(), polkadot_sdk::sp_runtime::TryRuntimeError> {
      Self::do_try_state()
    }
  }

  #[pallet::event]
  #[pallet::generate_deposit(pub(super) fn deposit_event)]
  pub enum Event<T: Config> {
    /// Stable units were converted into backend shares held by custody
    RoutedDeposit {
      backend: BackendId,
      assets: Balance,
      shares: Balance,
    },
    /// Backend shares were redeemed and paid out
    RoutedWithdrawal {
      backend: BackendId,
      assets: Balance,
      shares: Balance,
      receiver: T::AccountId,
      owner: T::AccountId,
    },
    /// A candidate declined an automatic attempt and the next one was tried
    AttemptFailed {
      backend: BackendId,
      error: DispatchError,
    },
    SolverBatchExecuted {
      operation: SolverOperation,
      legs: u32,
      assets: Balance,
      shares: Balance,
    },
    BackendsReplaced {
      count: u32,
    },
    BackendAdded {
      backend: BackendId,
      target_weight: Ppm,
      status: BackendStatus,
    },
    BackendUpdated {
      backend: BackendId,
      target_weight: Ppm,
      status: BackendStatus,
    },
    BackendRemoved {
      backend: BackendId,
    },
    /// A backend was dropped with value still inside; the loss is recorded
    BackendImpaired {
      backend: BackendId,
      shares: Balance,
      stable_value: Balance,
    },
    ConverterBound {
      backend: BackendId,
      converter: ConverterRef,
    },
    ConverterUnbound {
      backend: BackendId,
      converter: ConverterRef,
      /// Whether custody stopped tracking the backend
      deregistered: bool,
    },
    ExchangeExecuted {
      from: BackendId,
      to: BackendId,
      shares_in: Balance,
      assets: Balance,
      shares_out: Balance,
    },
    SurplusHeld {
      amount: Balance,
      total: Balance,
    },
    SurplusSwept {
      backend: BackendId,
      amount: Balance,
      shares: Balance,
    },
    RouterPaused,
    RouterUnpaused,
    DustToleranceSet {
      amount: Balance,
    },
    MaxBackendsPerOperationSet {
      count: u32,
    },
    MaxBackendCountSet {
      count: u32,
    },
    DefaultBackendSet {
      backend: Option<BackendId>,
    },
  }

  #[pallet::error]
  pub enum Error<T> {
    /// Backend identifier zero is reserved
    ZeroBackendId,
    /// Target weights exceed or do not add up to the allocation scale
    InvalidWeightSum,
    DuplicateBackend,
    UnknownBackend,
    TooManyBackends,
    /// Backend still has a custody position
    BackendHasPosition,
    /// Backend still has a nonzero target weight
    BackendHasWeight,
    ConverterAlreadyBound,
    ConverterNotBound,
    /// Converter reported a backend other than the one it is bound to
    ConverterBackendMismatch,
    InvalidParameter,
    /// Backend configuration is empty
    NoBackends,
    /// Backend cannot serve the requested amount right now
    NoLiquidity,
    /// Backend is not accepting value right now
    BackendInactive,
    /// Backend delivered less than requested
    SlippageCheckFailed,
    /// Every candidate declined
    NoLiquidityAvailable,
    /// No backend passed the eligibility checks
    InsufficientActiveBackends,
    /// Observed custody or stable-unit delta fell short of the converter's report
    CustodyDeltaMismatch,
    /// Retry budget cannot cover another attempt
    RetryBudgetExhausted,
    RouterPaused,
    ZeroAmount,
    /// Output below the caller's minimum by more than the dust tolerance
    SlippageExceeded,
    IdenticalBackends,
    NoSurplus,
    NoDefaultBackend,
    NothingToRebalance,
    EmptyBatch,
    Overflow,
  }

  #[pallet::call]
  impl<T: Config> Pallet<T> {
    /// Route `amount` stable units from the upstream account into one backend.
    ///
    /// Charged the base weight plus `retry_budget`; the unused part of the budget is
    /// refunded.
    #[pallet::call_index(0)]
    #[pallet::weight(T::WeightInfo::deposit().saturating_add(*retry_budget))]
    pub fn deposit(
      origin: OriginFor<T>,
      amount: Balance,
      retry_budget: Weight,
    ) -> DispatchResultWithPostInfo {
      let who = T::UpstreamOrigin::ensure_origin(origin)?;
      let outcome = Self::route_deposit(&who, amount, retry_budget)?;
      Ok(Some(T::WeightInfo::deposit().saturating_add(outcome.consumed)).into())
    }

    /// Redeem `amount` stable units out of one backend and pay them to `receiver`.
    #[pallet::call_index(1)]
    #[pallet::weight(T::WeightInfo::withdraw().saturating_add(*retry_budget))]
    pub fn withdraw(
      origin: OriginFor<T>,
      amount: Balance,
      receiver: T::AccountId,
      owner: T::AccountId,
      retry_budget: Weight,
    ) -> DispatchResultWithPostInfo {
      T::UpstreamOrigin::ensure_origin(origin)?;
      let outcome = Self::route_withdraw(amount, &receiver, &owner, retry_budget)?;
      Ok(Some(T::WeightInfo::withdraw().saturating_add(outcome.consumed)).into())
    }

    /// Deposit the given stable-unit amount into each named backend.
    #[pallet::call_index(2)]
    #[pallet::weight(T::WeightInfo::solver_deposit_assets(legs.len() as u32))]
    pub fn solver_deposit_assets(origin: OriginFor<T>, legs: SolverLegs<T>) -> DispatchResult {
      let who = T::UpstreamOrigin::ensure_origin(origin)?;
      Self::ensure_active()?;
      let legs = Self::resolve_legs(&legs, true)?;
      let total = Self::sum_legs(&legs)?;
      Self::pull_stable(&who, total)?;

      let mut minted: Balance = 0;
      for (backend, converter, assets) in legs.iter().copied() {
        let shares = Self::deposit_into(backend, converter, assets)?;
        minted = minted.saturating_add(shares);
        Self::deposit_event(Event::RoutedDeposit {
          backend,
          assets,
          shares,
        });
      }

      Self::reconcile_surplus();
      Self::deposit_event(Event::SolverBatchExecuted {
        operation: SolverOperation::DepositAssets,
        legs: legs.len() as u32,
        assets: total,
        shares: minted,
      });
      Ok(())
    }

    /// Mint at least the given share amount in each named backend.
    ///
    /// Each leg is priced from the converter's previews, rounding in the pool's favour.
    #[pallet::call_index(3)]
    #[pallet::weight(T::WeightInfo::solver_deposit_shares(legs.len() as u32))]
    pub fn solver_deposit_shares(origin: OriginFor<T>, legs: SolverLegs<T>) -> DispatchResult {
      let who = T::UpstreamOrigin::ensure_origin(origin)?;
      Self::ensure_active()?;
      let resolved = Self::resolve_legs(&legs, true)?;

      let mut priced = Vec::with_capacity(resolved.len());
      for (backend, converter, shares) in resolved.iter().copied() {
        let assets = Self::assets_for_shares(backend, converter, shares)?;
        priced.push((backend, converter, assets, shares));
      }
      let total = priced.iter().try_fold(0 as Balance, |acc, (_, _, assets, _)| {
        acc.checked_add(*assets).ok_or(Error::<T>::Overflow)
      })?;
      Self::pull_stable(&who, total)?;

      let mut minted: Balance = 0;
      for (backend, converter, assets, wanted) in priced {
        let shares = Self::deposit_into(backend, converter, assets)?;
        ensure!(shares >= wanted, Error::<T>::SlippageCheckFailed);
        minted = minted.saturating_add(shares);
        Self::deposit_event(Event::RoutedDeposit {
          backend,
          assets,
          shares,
        });
      }

      Self::reconcile_surplus();
      Self::deposit_event(Event::SolverBatchExecuted {
        operation: SolverOperation::DepositShares,
        legs: resolved.len() as u32,
        assets: total,
        shares: minted,
      });
      Ok(())
    }

    /// Withdraw the given stable-unit amount out of each named backend.
    #[pallet::call_index(4)]
    #[pallet::weight(T::WeightInfo::solver_withdraw_assets(legs.len() as u32))]
    pub fn solver_withdraw_assets(
      origin: OriginFor<T>,
      legs: SolverLegs<T>,
      receiver: T::AccountId,
      owner: T::AccountId,
    ) -> DispatchResult {
      T::UpstreamOrigin::ensure_origin(origin)?;
      Self::ensure_active()?;
      let legs = Self::resolve_legs(&legs, false)?;
      let total = Self::sum_legs(&legs)?;

      let mut burned: Balance = 0;
      for (backend, converter, assets) in legs.iter().copied() {
        let (shares, _) = Self::withdraw_from(backend, converter, assets, &receiver)?;
        burned = burned.saturating_add(shares);
        Self::deposit_event(Event::RoutedWithdrawal {
          backend,
          assets,
          shares,
          receiver: receiver.clone(),
          owner: owner.clone(),
        });
      }

      Self::reconcile_surplus();
      Self::deposit_event(Event::SolverBatchExecuted {
        operation: SolverOperation::WithdrawAssets,
        legs: legs.len() as u32,
        assets: total,
        shares: burned,
      });
      Ok(())
    }

    /// Redeem the given share amount out of each named backend and pay out everything
    /// it yields.
    #[pallet::call_index(5)]
    #[pallet::weight(T::WeightInfo::solver_withdraw_shares(legs.len() as u32))]
    pub fn solver_withdraw_shares(
      origin: OriginFor<T>,
      legs: SolverLegs<T>,
      receiver: T::AccountId,
      owner: T::AccountId,
    ) -> DispatchResult {
      T::UpstreamOrigin::ensure_origin(origin)?;
      Self::ensure_active()?;
      let legs = Self::resolve_legs(&legs, false)?;
      let burned = Self::sum_legs(&legs)?;

      let mut paid: Balance = 0;
      for (backend, converter, shares) in legs.iter().copied() {
        ensure!(
          T::Custody::position(backend) >= shares,
          Error::<T>::NoLiquidity
        );
        let assets = Self::redeem(backend, converter, shares)?;
        Self::push_stable(&receiver, assets)?;
        paid = paid.saturating_add(assets);
        Self::deposit_event(Event::RoutedWithdrawal {
          backend,
          assets,
          shares,
          receiver: receiver.clone(),
          owner: owner.clone(),
        });
      }

      Self::reconcile_surplus();
      Self::deposit_event(Event::SolverBatchExecuted {
        operation: SolverOperation::WithdrawShares,
        legs: legs.len() as u32,
        assets: paid,
        shares: burned,
      });
      Ok(())
    }

    /// Move `shares` of backend `from` into backend `to` through the stable unit.
    ///
    /// `min_stable_out` bounds the intermediate stable-unit amount; a shortfall below
    /// the dust tolerance is accepted.
    #[pallet::call_index(6)]
    #[pallet::weight(T::WeightInfo::exchange_assets())]
    pub fn exchange_assets(
      origin: OriginFor<T>,
      from: BackendId,
      to: BackendId,
      shares: Balance,
      min_stable_out: Balance,
    ) -> DispatchResult {
      T::ExchangerOrigin::ensure_origin(origin)?;
      Self::ensure_active()?;
      Self::do_exchange(from, to, shares, min_stable_out)?;
      Ok(())
    }

    /// Move up to `amount` stable units of value from the most overallocated backend to
    /// the most underallocated one.
    #[pallet::call_index(7)]
    #[pallet::weight(T::WeightInfo::rebalance())]
    pub fn rebalance(origin: OriginFor<T>, amount: Balance) -> DispatchResult {
      T::ExchangerOrigin::ensure_origin(origin)?;
      Self::ensure_active()?;
      ensure!(!amount.is_zero(), Error::<T>::ZeroAmount);

      let snapshot = Self::allocation_snapshot();
      let mut sources = Vec::new();
      let mut destinations = Vec::new();
      for (index, backend) in snapshot.backends.iter().enumerate() {
        let Some(record) = Self::backend_config(*backend) else {
          continue;
        };
        if !ConverterBindings::<T>::contains_key(backend) {
          continue;
        }
        if snapshot.is_overallocated(index) && !T::Custody::position(*backend).is_zero() {
          sources.push(index);
        }
        if snapshot.is_underallocated(index) && record.status.accepts_directed_deposits() {
          destinations.push(index);
        }
      }
      let from = *snapshot
        .rank(&sources, RankBy::Overallocation, 1)
        .first()
        .ok_or(Error::<T>::NothingToRebalance)?;
      let to = *snapshot
        .rank(&destinations, RankBy::Underallocation, 1)
        .first()
        .ok_or(Error::<T>::NothingToRebalance)?;

      let converter = Self::binding(from)?;
      let shares = Self::shares_for_assets(from, converter, amount)?.min(T::Custody::position(from));
      let minimum = T::Converter::preview_withdraw(converter, shares)?.min(amount);
      Self::do_exchange(from, to, shares, minimum)?;
      Ok(())
    }

    /// Replace the whole backend configuration.
    ///
    /// Weights must add up to the allocation scale. Dropped backends must have no
    /// custody position; their bindings are released.
    #[pallet::call_index(8)]
    #[pallet::weight(T::WeightInfo::set_backends(configs.len() as u32))]
    pub fn set_backends(
      origin: OriginFor<T>,
      configs: BoundedVec<BackendConfig, T::MaxBackends>,
    ) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      ensure!(!configs.is_empty(), Error::<T>::NoBackends);
      ensure!(
        configs.len() as u32 <= MaxBackendCount::<T>::get(),
        Error::<T>::TooManyBackends
      );

      let mut retained = BTreeSet::new();
      for config in configs.iter() {
        ensure!(config.has_valid_id(), Error::<T>::ZeroBackendId);
        ensure!(config.has_valid_weight(), Error::<T>::InvalidWeightSum);
        ensure!(retained.insert(config.id), Error::<T>::DuplicateBackend);
      }
      let weights: Vec<Ppm> = configs.iter().map(|c| c.target_weight).collect();
      ensure!(
        allocation::is_full_allocation(&weights),
        Error::<T>::InvalidWeightSum
      );

      let previous = Backends::<T>::get();
      let dropped: Vec<BackendId> = previous
        .iter()
        .map(|record| record.id)
        .filter(|id| !retained.contains(id))
        .collect();
      for backend in dropped.iter() {
        ensure!(
          T::Custody::position(*backend).is_zero(),
          Error::<T>::BackendHasPosition
        );
      }

      for backend in dropped {
        Self::release_backend(backend)?;
      }
      for record in previous.iter() {
        BackendIndex::<T>::remove(record.id);
      }
      for (index, config) in configs.iter().enumerate() {
        BackendIndex::<T>::insert(config.id, index as u32);
      }
      let count = configs.len() as u32;
      Backends::<T>::put(configs);

      log::info!(target: LOG_TARGET, "backend configuration replaced with {count} backends");
      Self::deposit_event(Event::BackendsReplaced { count });
      Ok(())
    }

    /// Append one backend; the resulting weights may not exceed the allocation scale.
    #[pallet::call_index(9)]
    #[pallet::weight(T::WeightInfo::add_backend())]
    pub fn add_backend(origin: OriginFor<T>, config: BackendConfig) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      ensure!(config.has_valid_id(), Error::<T>::ZeroBackendId);
      ensure!(config.has_valid_weight(), Error::<T>::InvalidWeightSum);
      ensure!(
        !BackendIndex::<T>::contains_key(config.id),
        Error::<T>::DuplicateBackend
      );

      Backends::<T>::try_mutate(|records| -> DispatchResult {
        ensure!(
          (records.len() as u32) < MaxBackendCount::<T>::get(),
          Error::<T>::TooManyBackends
        );
        let weights: Vec<Ppm> = records.iter().map(|r| r.target_weight).collect();
        ensure!(
          allocation::weight_sum(&weights).saturating_add(u64::from(config.target_weight))
            <= u64::from(ALLOCATION_SCALE),
          Error::<T>::InvalidWeightSum
        );
        let index = records.len() as u32;
        records
          .try_push(config)
          .map_err(|_| Error::<T>::TooManyBackends)?;
        BackendIndex::<T>::insert(config.id, index);
        Ok(())
      })?;

      Self::deposit_event(Event::BackendAdded {
        backend: config.id,
        target_weight: config.target_weight,
        status: config.status,
      });
      Ok(())
    }

    #[pallet::call_index(10)]
    #[pallet::weight(T::WeightInfo::update_backend())]
    pub fn update_backend(
      origin: OriginFor<T>,
      backend: BackendId,
      target_weight: Ppm,
      status: BackendStatus,
    ) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      ensure!(target_weight <= ALLOCATION_SCALE, Error::<T>::InvalidWeightSum);
      let index = BackendIndex::<T>::get(backend).ok_or(Error::<T>::UnknownBackend)?;

      Backends::<T>::try_mutate(|records| -> DispatchResult {
        let others: u64 = records
          .iter()
          .filter(|record| record.id != backend)
          .map(|record| u64::from(record.target_weight))
          .sum();
        ensure!(
          others.saturating_add(u64::from(target_weight)) <= u64::from(ALLOCATION_SCALE),
          Error::<T>::InvalidWeightSum
        );
        let record = records
          .get_mut(index as usize)
          .ok_or(Error::<T>::UnknownBackend)?;
        record.target_weight = target_weight;
        record.status = status;
        Ok(())
      })?;

      if status == BackendStatus::Suspended {
        log::warn!(target: LOG_TARGET, "backend {backend} suspended");
      }
      Self::deposit_event(Event::BackendUpdated {
        backend,
        target_weight,
        status,
      });
      Ok(())
    }

    /// Remove a drained backend with zero target weight.
    #[pallet::call_index(11)]
    #[pallet::weight(T::WeightInfo::remove_backend())]
    pub fn remove_backend(origin: OriginFor<T>, backend: BackendId) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      let record = Self::backend_config(backend).ok_or(Error::<T>::UnknownBackend)?;
      ensure!(record.target_weight.is_zero(), Error::<T>::BackendHasWeight);
      ensure!(
        T::Custody::position(backend).is_zero(),
        Error::<T>::BackendHasPosition
      );

      Self::release_backend(backend)?;
      Self::detach_backend(backend)?;
      Self::deposit_event(Event::BackendRemoved { backend });
      Ok(())
    }

    /// Remove a backend whose position can no longer be recovered and record the loss.
    ///
    /// Custody keeps valuing the stranded position until it is written off.
    #[pallet::call_index(12)]
    #[pallet::weight(T::WeightInfo::remove_impaired_backend())]
    pub fn remove_impaired_backend(origin: OriginFor<T>, backend: BackendId) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      ensure!(
        BackendIndex::<T>::contains_key(backend),
        Error::<T>::UnknownBackend
      );

      let shares = T::Custody::position(backend);
      let stable_value = Self::backend_value(backend);
      if let Some(converter) = ConverterBindings::<T>::take(backend) {
        let deregistered = shares.is_zero();
        if deregistered {
          T::Custody::remove_supported(backend)?;
        }
        Self::deposit_event(Event::ConverterUnbound {
          backend,
          converter,
          deregistered,
        });
      }
      if DefaultBackend::<T>::get() == Some(backend) {
        DefaultBackend::<T>::kill();
      }
      Self::detach_backend(backend)?;
      RecognizedLosses::<T>::insert(
        backend,
        ImpairmentRecord {
          shares,
          stable_value,
          recognized_at: frame_system::Pallet::<T>::block_number(),
        },
      );

      log::warn!(
        target: LOG_TARGET,
        "backend {backend} removed as impaired, {shares} shares worth {stable_value} stranded"
      );
      Self::deposit_event(Event::BackendImpaired {
        backend,
        shares,
        stable_value,
      });
      Ok(())
    }

    /// Bind a converter to a configured backend and register the backend with custody.
    #[pallet::call_index(13)]
    #[pallet::weight(T::WeightInfo::bind_converter())]
    pub fn bind_converter(
      origin: OriginFor<T>,
      backend: BackendId,
      converter: ConverterRef,
    ) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      ensure!(
        BackendIndex::<T>::contains_key(backend),
        Error::<T>::UnknownBackend
      );
      ensure!(
        !ConverterBindings::<T>::contains_key(backend),
        Error::<T>::ConverterAlreadyBound
      );
      ensure!(
        T::Converter::backend_identifier(converter) == Some(backend),
        Error::<T>::ConverterBackendMismatch
      );

      if !T::Custody::is_supported(backend) {
        T::Custody::add_supported(backend)?;
      }
      ConverterBindings::<T>::insert(backend, converter);
      Self::deposit_event(Event::ConverterBound { backend, converter });
      Ok(())
    }

    /// Drop a backend's converter binding.
    ///
    /// Custody keeps valuing a nonzero position; an empty one is deregistered.
    #[pallet::call_index(14)]
    #[pallet::weight(T::WeightInfo::unbind_converter())]
    pub fn unbind_converter(origin: OriginFor<T>, backend: BackendId) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      let converter =
        ConverterBindings::<T>::take(backend).ok_or(Error::<T>::ConverterNotBound)?;
      let deregistered = T::Custody::position(backend).is_zero();
      if deregistered {
        T::Custody::remove_supported(backend)?;
      }
      Self::deposit_event(Event::ConverterUnbound {
        backend,
        converter,
        deregistered,
      });
      Ok(())
    }

    #[pallet::call_index(15)]
    #[pallet::weight(T::WeightInfo::pause())]
    pub fn pause(origin: OriginFor<T>) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      Paused::<T>::put(true);
      log::warn!(target: LOG_TARGET, "router paused");
      Self::deposit_event(Event::RouterPaused);
      Ok(())
    }

    #[pallet::call_index(16)]
    #[pallet::weight(T::WeightInfo::unpause())]
    pub fn unpause(origin: OriginFor<T>) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      Paused::<T>::put(false);
      Self::deposit_event(Event::RouterUnpaused);
      Ok(())
    }

    #[pallet::call_index(17)]
    #[pallet::weight(T::WeightInfo::set_dust_tolerance())]
    pub fn set_dust_tolerance(origin: OriginFor<T>, amount: Balance) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      DustTolerance::<T>::put(amount);
      Self::deposit_event(Event::DustToleranceSet { amount });
      Ok(())
    }

    #[pallet::call_index(18)]
    #[pallet::weight(T::WeightInfo::set_max_backends_per_operation())]
    pub fn set_max_backends_per_operation(origin: OriginFor<T>, count: u32) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      ensure!(
        count >= 1 && count <= T::MaxBackends::get(),
        Error::<T>::InvalidParameter
      );
      MaxBackendsPerOperation::<T>::put(count);
      Self::deposit_event(Event::MaxBackendsPerOperationSet { count });
      Ok(())
    }

    #[pallet::call_index(19)]
    #[pallet::weight(T::WeightInfo::set_max_backend_count())]
    pub fn set_max_backend_count(origin: OriginFor<T>, count: u32) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      ensure!(
        count >= 1 && count <= T::MaxBackends::get(),
        Error::<T>::InvalidParameter
      );
      ensure!(
        count as usize >= Backends::<T>::decode_len().unwrap_or(0),
        Error::<T>::TooManyBackends
      );
      MaxBackendCount::<T>::put(count);
      Self::deposit_event(Event::MaxBackendCountSet { count });
      Ok(())
    }

    #[pallet::call_index(20)]
    #[pallet::weight(T::WeightInfo::set_default_backend())]
    pub fn set_default_backend(origin: OriginFor<T>, backend: Option<BackendId>) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      match backend {
        Some(id) => {
          ensure!(
            BackendIndex::<T>::contains_key(id),
            Error::<T>::UnknownBackend
          );
          DefaultBackend::<T>::put(id);
        }
        None => DefaultBackend::<T>::kill(),
      }
      Self::deposit_event(Event::DefaultBackendSet { backend });
      Ok(())
    }

    /// Deposit all tracked surplus into the default backend.
    ///
    /// The default backend must pass the same admission checks as an automatic deposit.
    #[pallet::call_index(21)]
    #[pallet::weight(T::WeightInfo::sweep_surplus())]
    pub fn sweep_surplus(origin: OriginFor<T>) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      Self::ensure_active()?;
      Self::reconcile_surplus();
      let amount = Surplus::<T>::get();
      ensure!(!amount.is_zero(), Error::<T>::NoSurplus);
      let backend = DefaultBackend::<T>::get().ok_or(Error::<T>::NoDefaultBackend)?;
      ensure!(
        Self::accepts_automatic_deposit(backend),
        Error::<T>::BackendInactive
      );
      let converter = Self::binding(backend)?;

      let shares = Self::deposit_into(backend, converter, amount)?;
      Self::reconcile_surplus();
      Self::deposit_event(Event::SurplusSwept {
        backend,
        amount,
        shares,
      });
      Ok(())
    }
  }

  impl<T: Config> Pallet<T> {
    /// Router staging account
    pub fn account_id() -> T::AccountId {
      T::PalletId::get().into_account_truncating()
    }

    pub fn backend_config(backend: BackendId) -> Option<BackendConfig> {
      let index = BackendIndex::<T>::get(backend)?;
      Backends::<T>::get()
        .get(index as usize)
        .copied()
        .filter(|record| record.id == backend)
    }

    /// Stable-unit value of custody's position in `backend`, zero if it cannot be priced.
    pub fn backend_value(backend: BackendId) -> Balance {
      let position = T::Custody::position(backend);
      if position.is_zero() {
        return 0;
      }
      ConverterBindings::<T>::get(backend)
        .and_then(|converter| T::Converter::preview_withdraw(converter, position).ok())
        .unwrap_or(0)
    }

    /// Current and target allocation of every configured backend.
    pub fn allocation_snapshot() -> AllocationSnapshot {
      let records = Backends::<T>::get();
      let mut backends = Vec::with_capacity(records.len());
      let mut balances = Vec::with_capacity(records.len());
      let mut target = Vec::with_capacity(records.len());
      for record in records.iter() {
        backends.push(record.id);
        balances.push(Self::backend_value(record.id));
        target.push(record.target_weight);
      }
      AllocationSnapshot::new(backends, balances, target)
    }

    /// Split `amount` across configured backends by target weight.
    ///
    /// Integrators use the result to build solver batches.
    pub fn target_split(amount: Balance) -> Result<Vec<(BackendId, Balance)>, DispatchError> {
      let records = Backends::<T>::get();
      let weights: Vec<Ppm> = records.iter().map(|r| r.target_weight).collect();
      let parts = allocation::split_proportionally(amount, &weights).map_err(|e| match e {
        AllocationError::ZeroWeightSum => Error::<T>::InvalidWeightSum,
      })?;
      Ok(records.iter().map(|r| r.id).zip(parts).collect())
    }

    /// Failures that let automatic routing move on to the next candidate.
    pub fn is_transient(error: &DispatchError) -> bool {
      let transient: [DispatchError; 5] = [
        Error::<T>::NoLiquidity.into(),
        Error::<T>::BackendInactive.into(),
        Error::<T>::SlippageCheckFailed.into(),
        DispatchError::Token(TokenError::FundsUnavailable),
        DispatchError::Arithmetic(ArithmeticError::Underflow),
      ];
      transient.contains(error)
    }

    /// Route a deposit paid by `who`.
    ///
    /// Callers outside a dispatchable must provide their own storage layer.
    pub fn route_deposit(
      who: &T::AccountId,
      amount: Balance,
      retry_budget: Weight,
    ) -> Result<RouteOutcome, DispatchError> {
      Self::ensure_active()?;
      ensure!(!amount.is_zero(), Error::<T>::ZeroAmount);

      let snapshot = Self::allocation_snapshot();
      let eligible: Vec<usize> = snapshot
        .backends
        .iter()
        .enumerate()
        .filter(|(_, backend)| Self::accepts_automatic_deposit(**backend))
        .map(|(index, _)| index)
        .collect();
      ensure!(!eligible.is_empty(), Error::<T>::InsufficientActiveBackends);
      let candidates = snapshot.rank(
        &eligible,
        RankBy::Underallocation,
        MaxBackendsPerOperation::<T>::get() as usize,
      );
      log::debug!(target: LOG_TARGET, "deposit of {amount} candidates {candidates:?}");

      Self::pull_stable(who, amount)?;
      let mut budget = RetryBudget::new(
        retry_budget,
        T::AttemptWeight::get(),
        T::CompletionReserve::get(),
      );
      let (backend, shares) = Self::try_candidates(&candidates, &mut budget, |backend, converter| {
        Self::deposit_into(backend, converter, amount)
      })?;

      Self::reconcile_surplus();
      Self::deposit_event(Event::RoutedDeposit {
        backend,
        assets: amount,
        shares,
      });
      Ok(RouteOutcome {
        backend,
        assets: amount,
        shares,
        consumed: budget.consumed(),
      })
    }

    /// Route a withdrawal of exactly `amount` to `receiver`.
    ///
    /// Callers outside a dispatchable must provide their own storage layer.
    pub fn route_withdraw(
      amount: Balance,
      receiver: &T::AccountId,
      owner: &T::AccountId,
      retry_budget: Weight,
    ) -> Result<RouteOutcome, DispatchError> {
      Self::ensure_active()?;
      ensure!(!amount.is_zero(), Error::<T>::ZeroAmount);

      let snapshot = Self::allocation_snapshot();
      let eligible: Vec<usize> = snapshot
        .backends
        .iter()
        .zip(snapshot.balances.iter())
        .enumerate()
        .filter(|(_, (backend, value))| {
          !value.is_zero() && Self::accepts_automatic_withdrawal(**backend)
        })
        .map(|(index, _)| index)
        .collect();
      ensure!(!eligible.is_empty(), Error::<T>::InsufficientActiveBackends);
      let candidates = snapshot.rank(
        &eligible,
        RankBy::Overallocation,
        MaxBackendsPerOperation::<T>::get() as usize,
      );
      log::debug!(target: LOG_TARGET, "withdrawal of {amount} candidates {candidates:?}");

      let mut budget = RetryBudget::new(
        retry_budget,
        T::AttemptWeight::get(),
        T::CompletionReserve::get(),
      );
      let (backend, (shares, _)) =
        Self::try_candidates(&candidates, &mut budget, |backend, converter| {
          Self::withdraw_from(backend, converter, amount, receiver)
        })?;

      Self::reconcile_surplus();
      Self::deposit_event(Event::RoutedWithdrawal {
        backend,
        assets: amount,
        shares,
        receiver: receiver.clone(),
        owner: owner.clone(),
      });
      Ok(RouteOutcome {
        backend,
        assets: amount,
        shares,
        consumed: budget.consumed(),
      })
    }

    /// Run `attempt` against each candidate in order, each inside its own storage layer.
    fn try_candidates<R>(
      candidates: &[BackendId],
      budget: &mut RetryBudget,
      mut attempt: impl FnMut(BackendId, ConverterRef) -> Result<R, DispatchError>,
    ) -> Result<(BackendId, R), DispatchError> {
      for backend in candidates.iter().copied() {
        ensure!(
          budget.try_reserve_attempt(),
          Error::<T>::RetryBudgetExhausted
        );
        let converter = Self::binding(backend)?;
        match with_storage_layer(|| attempt(backend, converter)) {
          Ok(result) => return Ok((backend, result)),
          Err(error) if Self::is_transient(&error) => {
            log::debug!(target: LOG_TARGET, "backend {backend} declined attempt: {error:?}");
            Self::deposit_event(Event::AttemptFailed { backend, error });
          }
          Err(error) => {
            log::warn!(target: LOG_TARGET, "backend {backend} aborted routing: {error:?}");
            return Err(error);
          }
        }
      }
      Err(Error::<T>::NoLiquidityAvailable.into())
    }

    fn accepts_automatic_deposit(backend: BackendId) -> bool {
      let Some(record) = Self::backend_config(backend) else {
        return false;
      };
      let Some(converter) = ConverterBindings::<T>::get(backend) else {
        return false;
      };
      record.status.accepts_automatic_deposits() && Self::passes_deposit_probe(backend, converter)
    }

    fn accepts_automatic_withdrawal(backend: BackendId) -> bool {
      Self::backend_config(backend)
        .is_some_and(|record| record.status.accepts_automatic_withdrawals())
        && ConverterBindings::<T>::contains_key(backend)
        && !T::Custody::position(backend).is_zero()
    }

    /// Backend can value its position and quote a reference deposit for itself.
    fn passes_deposit_probe(backend: BackendId, converter: ConverterRef) -> bool {
      let valued = T::Converter::preview_withdraw(converter, T::Custody::position(backend)).is_ok();
      let quoted = matches!(
        T::Converter::preview_deposit(converter, T::HealthProbeAmount::get()),
        Ok((reported, shares)) if reported == backend && !shares.is_zero()
      );
      if !(valued && quoted) {
        log::debug!(target: LOG_TARGET, "backend {backend} failed deposit health probe");
      }
      valued && quoted
    }

    /// Convert `assets` held by the router into `backend` shares credited to custody.
    ///
    /// Returns the observed custody delta.
    fn deposit_into(
      backend: BackendId,
      converter: ConverterRef,
      assets: Balance,
    ) -> Result<Balance, DispatchError> {
      let (previewed_backend, expected) = T::Converter::preview_deposit(converter, assets)?;
      Self::ensure_reported_backend(backend, previewed_backend)?;
      ensure!(!expected.is_zero(), Error::<T>::SlippageCheckFailed);

      let before = T::Custody::position(backend);
      let (reported_backend, reported) =
        T::Converter::deposit(converter, &Self::account_id(), &T::Custody::account(), assets)?;
      Self::ensure_reported_backend(backend, reported_backend)?;

      let observed = T::Custody::position(backend).saturating_sub(before);
      if observed < expected || observed < reported {
        log::error!(
          target: LOG_TARGET,
          "backend {backend} credited {observed} shares, previewed {expected}, reported {reported}"
        );
        return Err(Error::<T>::CustodyDeltaMismatch.into());
      }
      Ok(observed)
    }

    /// Redeem `amount` stable units out of `backend` and pay exactly `amount` to `receiver`.
    ///
    /// Returns the shares burned and the stable units received.
    fn withdraw_from(
      backend: BackendId,
      converter: ConverterRef,
      amount: Balance,
      receiver: &T::AccountId,
    ) -> Result<(Balance, Balance), DispatchError> {
      let shares = Self::shares_for_assets(backend, converter, amount)?;
      ensure!(
        T::Custody::position(backend) >= shares,
        Error::<T>::NoLiquidity
      );
      let received = Self::redeem(backend, converter, shares)?;
      ensure!(received >= amount, Error::<T>::SlippageCheckFailed);
      Self::push_stable(receiver, amount)?;
      Ok((shares, received))
    }

    /// Move `shares` from custody to the router and redeem them there.
    ///
    /// Custody must release exactly `shares`, the converter must burn all of them, and
    /// the observed stable-unit delta must cover both the preview and the converter's
    /// report. Returns the observed delta.
    fn redeem(
      backend: BackendId,
      converter: ConverterRef,
      shares: Balance,
    ) -> Result<Balance, DispatchError> {
      let router = Self::account_id();
      let expected = T::Converter::preview_withdraw(converter, shares)?;
      let position = T::Custody::position(backend);
      let held = T::Converter::balance_of(converter, &router);
      T::Custody::send_asset(backend, shares, &router)?;
      let released = position.saturating_sub(T::Custody::position(backend));

      let before = Self::stable_balance(&router);
      let reported = T::Converter::withdraw(converter, &router, shares)?;
      let observed = Self::stable_balance(&router).saturating_sub(before);
      let unburned = T::Converter::balance_of(converter, &router).saturating_sub(held);
      if released != shares || !unburned.is_zero() || observed < expected || observed < reported {
        log::error!(
          target: LOG_TARGET,
          "backend {backend} redeemed {shares} shares: custody released {released}, \
           {unburned} left unburned, paid {observed}, previewed {expected}, reported {reported}"
        );
        return Err(Error::<T>::CustodyDeltaMismatch.into());
      }
      Ok(observed)
    }

    /// Shares to redeem for at least `assets` stable units, rounded up.
    fn shares_for_assets(
      backend: BackendId,
      converter: ConverterRef,
      assets: Balance,
    ) -> Result<Balance, DispatchError> {
      let (previewed_backend, mut shares) = T::Converter::preview_deposit(converter, assets)?;
      Self::ensure_reported_backend(backend, previewed_backend)?;
      if T::Converter::preview_withdraw(converter, shares)? < assets {
        shares = shares.checked_add(1).ok_or(Error::<T>::Overflow)?;
      }
      ensure!(!shares.is_zero(), Error::<T>::NoLiquidity);
      Ok(shares)
    }

    /// Stable units needed to mint at least `shares`, rounded up.
    fn assets_for_shares(
      backend: BackendId,
      converter: ConverterRef,
      shares: Balance,
    ) -> Result<Balance, DispatchError> {
      let mut assets = T::Converter::preview_withdraw(converter, shares)?;
      let (previewed_backend, minted) = T::Converter::preview_deposit(converter, assets)?;
      Self::ensure_reported_backend(backend, previewed_backend)?;
      if minted < shares {
        assets = assets.checked_add(1).ok_or(Error::<T>::Overflow)?;
        let (_, minted) = T::Converter::preview_deposit(converter, assets)?;
        ensure!(minted >= shares, Error::<T>::SlippageCheckFailed);
      }
      ensure!(!assets.is_zero(), Error::<T>::ZeroAmount);
      Ok(assets)
    }

    fn do_exchange(
      from: BackendId,
      to: BackendId,
      shares: Balance,
      min_stable_out: Balance,
    ) -> Result<(Balance, Balance), DispatchError> {
      ensure!(from != to, Error::<T>::IdenticalBackends);
      ensure!(!shares.is_zero(), Error::<T>::ZeroAmount);
      ensure!(
        BackendIndex::<T>::contains_key(from),
        Error::<T>::UnknownBackend
      );
      let destination = Self::backend_config(to).ok_or(Error::<T>::UnknownBackend)?;
      ensure!(
        destination.status.accepts_directed_deposits(),
        Error::<T>::BackendInactive
      );
      let source_converter = Self::binding(from)?;
      let destination_converter = Self::binding(to)?;
      ensure!(
        T::Custody::position(from) >= shares,
        Error::<T>::NoLiquidity
      );

      let assets = Self::redeem(from, source_converter, shares)?;
      Self::ensure_min_output(assets, min_stable_out)?;
      let shares_out = Self::deposit_into(to, destination_converter, assets)?;

      Self::reconcile_surplus();
      Self::deposit_event(Event::ExchangeExecuted {
        from,
        to,
        shares_in: shares,
        assets,
        shares_out,
      });
      Ok((assets, shares_out))
    }

    /// `actual` may fall short of `minimum` by less than the dust tolerance.
    fn ensure_min_output(actual: Balance, minimum: Balance) -> DispatchResult {
      let shortfall = minimum.saturating_sub(actual);
      if shortfall.is_zero() {
        return Ok(());
      }
      ensure!(
        shortfall < DustTolerance::<T>::get(),
        Error::<T>::SlippageExceeded
      );
      log::debug!(target: LOG_TARGET, "accepted dust shortfall of {shortfall}");
      Ok(())
    }

    fn ensure_reported_backend(expected: BackendId, reported: BackendId) -> DispatchResult {
      if expected != reported {
        log::error!(
          target: LOG_TARGET,
          "converter bound to backend {expected} reported backend {reported}"
        );
        return Err(Error::<T>::ConverterBackendMismatch.into());
      }
      Ok(())
    }

    /// Validate solver legs and attach each leg's converter.
    fn resolve_legs(
      legs: &[(BackendId, Balance)],
      depositing: bool,
    ) -> Result<Vec<(BackendId, ConverterRef, Balance)>, DispatchError> {
      ensure!(!legs.is_empty(), Error::<T>::EmptyBatch);
      let mut seen = BTreeSet::new();
      let mut resolved = Vec::with_capacity(legs.len());
      for (backend, amount) in legs.iter().copied() {
        ensure!(seen.insert(backend), Error::<T>::DuplicateBackend);
        ensure!(!amount.is_zero(), Error::<T>::ZeroAmount);
        let record = Self::backend_config(backend).ok_or(Error::<T>::UnknownBackend)?;
        if depositing {
          ensure!(
            record.status.accepts_directed_deposits(),
            Error::<T>::BackendInactive
          );
        }
        resolved.push((backend, Self::binding(backend)?, amount));
      }
      Ok(resolved)
    }

    fn sum_legs(legs: &[(BackendId, ConverterRef, Balance)]) -> Result<Balance, DispatchError> {
      legs
        .iter()
        .try_fold(0 as Balance, |acc, (_, _, amount)| acc.checked_add(*amount))
        .ok_or_else(|| Error::<T>::Overflow.into())
    }

    fn binding(backend: BackendId) -> Result<ConverterRef, DispatchError> {
      ConverterBindings::<T>::get(backend).ok_or_else(|| Error::<T>::ConverterNotBound.into())
    }

    /// Drop the converter binding and custody registration of a drained backend.
    fn release_backend(backend: BackendId) -> DispatchResult {
      if let Some(converter) = ConverterBindings::<T>::take(backend) {
        T::Custody::remove_supported(backend)?;
        Self::deposit_event(Event::ConverterUnbound {
          backend,
          converter,
          deregistered: true,
        });
      }
      if DefaultBackend::<T>::get() == Some(backend) {
        DefaultBackend::<T>::kill();
      }
      Ok(())
    }

    /// Swap-remove `backend` from the arena, re-indexing the record moved into its slot.
    fn detach_backend(backend: BackendId) -> DispatchResult {
      let index = BackendIndex::<T>::take(backend).ok_or(Error::<T>::UnknownBackend)? as usize;
      Backends::<T>::try_mutate(|records| -> DispatchResult {
        ensure!(index < records.len(), Error::<T>::UnknownBackend);
        records.swap_remove(index);
        if let Some(moved) = records.get(index) {
          BackendIndex::<T>::insert(moved.id, index as u32);
        }
        Ok(())
      })
    }

    fn ensure_active() -> DispatchResult {
      ensure!(!Paused::<T>::get(), Error::<T>::RouterPaused);
      Ok(())
    }

    fn stable_balance(who: &T::AccountId) -> Balance {
      T::Assets::balance(T::StableAsset::get(), who)
    }

    fn pull_stable(from: &T::AccountId, amount: Balance) -> DispatchResult {
      T::Assets::transfer(
        T::StableAsset::get(),
        from,
        &Self::account_id(),
        amount,
        Preservation::Expendable,
      )?;
      Ok(())
    }

    fn push_stable(to: &T::AccountId, amount: Balance) -> DispatchResult {
      T::Assets::transfer(
        T::StableAsset::get(),
        &Self::account_id(),
        to,
        amount,
        Preservation::Expendable,
      )?;
      Ok(())
    }

    /// Bring [`Surplus`] in line with the stable units held by the router account.
    fn reconcile_surplus() {
      let held = Self::stable_balance(&Self::account_id());
      let tracked = Surplus::<T>::get();
      if held > tracked {
        log::info!(target: LOG_TARGET, "holding {} surplus stable units", held - tracked);
        Self::deposit_event(Event::SurplusHeld {
          amount: held - tracked,
          total: held,
        });
      }
      if held != tracked {
        Surplus::<T>::put(held);
      }
    }

    #[cfg(any(feature = "try-runtime", test))]
    pub fn do_try_state() -> Result<(), DispatchError> {
      let records = Backends::<T>::get();
      ensure!(
        records.len() as u32 <= MaxBackendCount::<T>::get(),
        "More backends than MaxBackendCount"
      );
      ensure!(
        BackendIndex::<T>::iter().count() == records.len(),
        "BackendIndex size differs from Backends"
      );
      for (index, record) in records.iter().enumerate() {
        ensure!(record.has_valid_id(), "Backend with zero id");
        ensure!(
          BackendIndex::<T>::get(record.id) == Some(index as u32),
          "BackendIndex out of sync with Backends"
        );
      }
      let weights: Vec<Ppm> = records.iter().map(|r| r.target_weight).collect();
      ensure!(
        allocation::weight_sum(&weights) <= u64::from(ALLOCATION_SCALE),
        "Target weights exceed the allocation scale"
      );
      for (backend, _) in ConverterBindings::<T>::iter() {
        ensure!(
          BackendIndex::<T>::contains_key(backend),
          "Binding for unknown backend"
        );
        ensure!(
          T::Custody::is_supported(backend),
          "Bound backend unknown to custody"
        );
      }
      if let Some(backend) = DefaultBackend::<T>::get() {
        ensure!(
          BackendIndex::<T>::contains_key(backend),
          "Default backend is not configured"
        );
      }
      let per_operation = MaxBackendsPerOperation::<T>::get();
      ensure!(
        per_operation >= 1 && per_operation <= T::MaxBackends::get(),
        "MaxBackendsPerOperation out of range"
      );
      ensure!(
        Surplus::<T>::get() <= Self::stable_balance(&Self::account_id()),
        "Tracked surplus exceeds router balance"
      );
      Ok(())
    }
  }
}
