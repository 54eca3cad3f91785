use alloc::vec::Vec;
use frame::prelude::*;

pub use primitives::{
  Balance, BackendConfig, BackendId, BackendStatus, ConverterKind, ConverterRef, Ppm,
};
use primitives::{allocation::current_allocations, selector};

/// Value translator between the stable unit and one backend's share unit.
///
/// Every claim a converter makes is untrusted: the router compares reported
/// identifiers and amounts with the balance changes it observes.
pub trait Converter<AccountId> {
  /// Backend the converter declares itself bound to.
  fn backend_identifier(converter: ConverterRef) -> Option<BackendId>;

  /// Shares expected for depositing `assets` stable units.
  fn preview_deposit(
    converter: ConverterRef,
    assets: Balance,
  ) -> Result<(BackendId, Balance), DispatchError>;

  /// Take `assets` stable units from `from` and credit the minted shares to `beneficiary`.
  fn deposit(
    converter: ConverterRef,
    from: &AccountId,
    beneficiary: &AccountId,
    assets: Balance,
  ) -> Result<(BackendId, Balance), DispatchError>;

  /// Stable units expected for redeeming `shares`.
  fn preview_withdraw(converter: ConverterRef, shares: Balance) -> Result<Balance, DispatchError>;

  /// Burn `shares` held by `who` and credit the redeemed stable units to `who`.
  fn withdraw(
    converter: ConverterRef,
    who: &AccountId,
    shares: Balance,
  ) -> Result<Balance, DispatchError>;

  /// Shares of the converter's backend held by `who`.
  fn balance_of(converter: ConverterRef, who: &AccountId) -> Balance;
}

/// Holder of backend positions on behalf of the pool.
pub trait Custody<AccountId> {
  /// Account the backend shares are credited to.
  fn account() -> AccountId;

  /// Shares of `backend` currently held.
  fn position(backend: BackendId) -> Balance;

  /// Move `amount` shares of `backend` to `to`.
  fn send_asset(backend: BackendId, amount: Balance, to: &AccountId) -> DispatchResult;

  fn add_supported(backend: BackendId) -> DispatchResult;

  fn remove_supported(backend: BackendId) -> DispatchResult;

  fn is_supported(backend: BackendId) -> bool;

  /// Total value of every supported position, in stable units.
  fn total_value() -> Balance;
}

/// Metered allowance for routing attempts within one operation.
///
/// Each attempt needs `per_attempt + completion_reserve` to be available and
/// consumes `per_attempt`, so the reserve is always left for finishing the call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryBudget {
  remaining: Weight,
  per_attempt: Weight,
  completion_reserve: Weight,
  consumed: Weight,
}

impl RetryBudget {
  pub fn new(limit: Weight, per_attempt: Weight, completion_reserve: Weight) -> Self {
    Self {
      remaining: limit,
      per_attempt,
      completion_reserve,
      consumed: Weight::zero(),
    }
  }

  /// Reserve one attempt, returning `false` when the allowance cannot cover it.
  pub fn try_reserve_attempt(&mut self) -> bool {
    let needed = self.per_attempt.saturating_add(self.completion_reserve);
    if !self.remaining.all_gte(needed) {
      return false;
    }
    self.remaining = self.remaining.saturating_sub(self.per_attempt);
    self.consumed = self.consumed.saturating_add(self.per_attempt);
    true
  }

  pub fn remaining(&self) -> Weight {
    self.remaining
  }

  pub fn consumed(&self) -> Weight {
    self.consumed
  }
}

/// Ranking direction for candidate selection
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RankBy {
  Underallocation,
  Overallocation,
}

/// Allocation state of every configured backend, rebuilt for each operation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AllocationSnapshot {
  pub backends: Vec<BackendId>,
  /// Stable-unit value of custody's position per backend
  pub balances: Vec<Balance>,
  pub current: Vec<Ppm>,
  pub target: Vec<Ppm>,
  pub total: Balance,
}

impl AllocationSnapshot {
  pub fn new(backends: Vec<BackendId>, balances: Vec<Balance>, target: Vec<Ppm>) -> Self {
    let (current, total) = current_allocations(&balances);
    Self {
      backends,
      balances,
      current,
      target,
      total,
    }
  }

  /// Rank the backends at `eligible` positions, keeping snapshot order for ties.
  pub fn rank(&self, eligible: &[usize], by: RankBy, count: usize) -> Vec<BackendId> {
    let mut backends = Vec::with_capacity(eligible.len());
    let mut current = Vec::with_capacity(eligible.len());
    let mut target = Vec::with_capacity(eligible.len());
    for index in eligible.iter().copied() {
      if let (Some(backend), Some(now), Some(goal)) = (
        self.backends.get(index),
        self.current.get(index),
        self.target.get(index),
      ) {
        backends.push(*backend);
        current.push(*now);
        target.push(*goal);
      }
    }
    match by {
      RankBy::Underallocation => {
        selector::select_top_underallocated(&backends, &current, &target, count)
      }
      RankBy::Overallocation => {
        selector::select_top_overallocated(&backends, &current, &target, count)
      }
    }
  }

  pub fn is_underallocated(&self, index: usize) -> bool {
    matches!((self.current.get(index), self.target.get(index)), (Some(now), Some(goal)) if now < goal)
  }

  pub fn is_overallocated(&self, index: usize) -> bool {
    matches!((self.current.get(index), self.target.get(index)), (Some(now), Some(goal)) if now > goal)
  }
}

/// Result of an automatically routed deposit or withdrawal
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RouteOutcome {
  pub backend: BackendId,
  pub assets: Balance,
  pub shares: Balance,
  /// Retry allowance actually spent
  pub consumed: Weight,
}

/// Stranded value recognized when a backend is removed as impaired
#[derive(Clone, Encode, Decode, Eq, PartialEq, RuntimeDebug, TypeInfo, MaxEncodedLen)]
pub struct ImpairmentRecord<BlockNumber> {
  /// Shares custody still held at removal
  pub shares: Balance,
  /// Last stable-unit valuation of those shares
  pub stable_value: Balance,
  pub recognized_at: BlockNumber,
}

/// Caller-directed batch kinds
#[derive(
  Clone,
  Copy,
  Decode,
  DecodeWithMemTracking,
  Encode,
  Eq,
  PartialEq,
  RuntimeDebug,
  TypeInfo,
  MaxEncodedLen,
)]
pub enum SolverOperation {
  DepositAssets,
  DepositShares,
  WithdrawAssets,
  WithdrawShares,
}

/// Helper for benchmarking
#[cfg(feature = "runtime-benchmarks")]
pub trait BenchmarkHelper<AccountId> {
  /// Make `backend` ready to receive deposits and return the converter to bind.
  fn prepare_backend(backend: BackendId) -> Result<ConverterRef, DispatchError>;
  /// Credit `amount` stable units to `who`.
  fn fund_stable(who: &AccountId, amount: Balance) -> DispatchResult;
}
