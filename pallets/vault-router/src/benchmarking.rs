use crate::*;
use alloc::vec::Vec;
use frame::prelude::*;
use polkadot_sdk::frame_benchmarking::v2::*;
use polkadot_sdk::frame_support::traits::EnsureOrigin;
use polkadot_sdk::frame_system::RawOrigin;
use primitives::params::ALLOCATION_SCALE;

const FUNDING: Balance = 1_000_000_000_000;
const AMOUNT: Balance = 1_000_000;

/// Configure `count` equally weighted backends with bound converters.
fn setup_backends<T: Config>(count: u32) -> Result<Vec<BackendId>, BenchmarkError> {
  let count = count.max(1);
  let weight = ALLOCATION_SCALE / count;
  let mut configs: Vec<BackendConfig> = (1..=count)
    .map(|id| BackendConfig::active(id, weight))
    .collect();
  if let Some(last) = configs.last_mut() {
    last.target_weight += ALLOCATION_SCALE - weight * count;
  }
  let bounded: BoundedVec<BackendConfig, T::MaxBackends> =
    configs.try_into().map_err(|_| BenchmarkError::Weightless)?;
  Pallet::<T>::set_backends(RawOrigin::Root.into(), bounded)?;
  for id in 1..=count {
    let converter = T::BenchmarkHelper::prepare_backend(id)?;
    Pallet::<T>::bind_converter(RawOrigin::Root.into(), id, converter)?;
  }
  Ok((1..=count).collect())
}

fn upstream<T: Config>() -> Result<(T::RuntimeOrigin, T::AccountId), BenchmarkError> {
  let origin =
    T::UpstreamOrigin::try_successful_origin().map_err(|_| BenchmarkError::Weightless)?;
  let who = T::UpstreamOrigin::ensure_origin(origin.clone()).map_err(|_| BenchmarkError::Weightless)?;
  T::BenchmarkHelper::fund_stable(&who, FUNDING)?;
  Ok((origin, who))
}

fn exchanger<T: Config>() -> Result<T::RuntimeOrigin, BenchmarkError> {
  T::ExchangerOrigin::try_successful_origin().map_err(|_| BenchmarkError::Weightless)
}

fn solver_legs<T: Config>(backends: &[BackendId], amount: Balance) -> SolverLegs<T> {
  let legs: Vec<(BackendId, Balance)> = backends.iter().map(|id| (*id, amount)).collect();
  BoundedVec::truncate_from(legs)
}

#[benchmarks]
mod benches {
  use super::*;

  #[benchmark]
  fn deposit() -> Result<(), BenchmarkError> {
    setup_backends::<T>(T::MaxBackends::get())?;
    let (origin, _) = upstream::<T>()?;
    let budget = T::AttemptWeight::get().saturating_add(T::CompletionReserve::get());

    #[extrinsic_call]
    _(origin as T::RuntimeOrigin, AMOUNT, budget);

    assert_eq!(Surplus::<T>::get(), 0);
    Ok(())
  }

  #[benchmark]
  fn withdraw() -> Result<(), BenchmarkError> {
    let backends = setup_backends::<T>(T::MaxBackends::get())?;
    let (origin, who) = upstream::<T>()?;
    Pallet::<T>::solver_deposit_assets(origin.clone(), solver_legs::<T>(&backends, AMOUNT))?;
    let budget = T::AttemptWeight::get().saturating_add(T::CompletionReserve::get());

    #[extrinsic_call]
    _(origin as T::RuntimeOrigin, AMOUNT / 2, who.clone(), who, budget);

    Ok(())
  }

  #[benchmark]
  fn solver_deposit_assets(l: Linear<1, { T::MaxBackends::get() }>) -> Result<(), BenchmarkError> {
    let backends = setup_backends::<T>(l)?;
    let (origin, _) = upstream::<T>()?;
    let legs = solver_legs::<T>(&backends, AMOUNT);

    #[extrinsic_call]
    _(origin as T::RuntimeOrigin, legs);

    Ok(())
  }

  #[benchmark]
  fn solver_deposit_shares(l: Linear<1, { T::MaxBackends::get() }>) -> Result<(), BenchmarkError> {
    let backends = setup_backends::<T>(l)?;
    let (origin, _) = upstream::<T>()?;
    let legs = solver_legs::<T>(&backends, AMOUNT);

    #[extrinsic_call]
    _(origin as T::RuntimeOrigin, legs);

    Ok(())
  }

  #[benchmark]
  fn solver_withdraw_assets(l: Linear<1, { T::MaxBackends::get() }>) -> Result<(), BenchmarkError> {
    let backends = setup_backends::<T>(l)?;
    let (origin, who) = upstream::<T>()?;
    Pallet::<T>::solver_deposit_assets(origin.clone(), solver_legs::<T>(&backends, AMOUNT))?;
    let legs = solver_legs::<T>(&backends, AMOUNT / 2);

    #[extrinsic_call]
    _(origin as T::RuntimeOrigin, legs, who.clone(), who);

    Ok(())
  }

  #[benchmark]
  fn solver_withdraw_shares(l: Linear<1, { T::MaxBackends::get() }>) -> Result<(), BenchmarkError> {
    let backends = setup_backends::<T>(l)?;
    let (origin, who) = upstream::<T>()?;
    Pallet::<T>::solver_deposit_assets(origin.clone(), solver_legs::<T>(&backends, AMOUNT))?;
    let legs: Vec<(BackendId, Balance)> = backends
      .iter()
      .map(|id| (*id, T::Custody::position(*id) / 2))
      .collect();

    #[extrinsic_call]
    _(
      origin as T::RuntimeOrigin,
      BoundedVec::truncate_from(legs),
      who.clone(),
      who,
    );

    Ok(())
  }

  #[benchmark]
  fn exchange_assets() -> Result<(), BenchmarkError> {
    setup_backends::<T>(2)?;
    let (origin, _) = upstream::<T>()?;
    Pallet::<T>::solver_deposit_assets(origin, solver_legs::<T>(&[1], AMOUNT))?;
    let shares = T::Custody::position(1);
    let exchanger = exchanger::<T>()?;

    #[extrinsic_call]
    _(exchanger as T::RuntimeOrigin, 1, 2, shares, 0);

    assert!(T::Custody::position(1).is_zero());
    Ok(())
  }

  #[benchmark]
  fn rebalance() -> Result<(), BenchmarkError> {
    setup_backends::<T>(T::MaxBackends::get().max(2))?;
    let (origin, _) = upstream::<T>()?;
    Pallet::<T>::solver_deposit_assets(origin, solver_legs::<T>(&[1], AMOUNT))?;
    let exchanger = exchanger::<T>()?;

    #[extrinsic_call]
    _(exchanger as T::RuntimeOrigin, AMOUNT / 4);

    Ok(())
  }

  #[benchmark]
  fn set_backends(n: Linear<1, { T::MaxBackends::get() }>) -> Result<(), BenchmarkError> {
    setup_backends::<T>(T::MaxBackends::get())?;
    let weight = ALLOCATION_SCALE / n;
    let mut configs: Vec<BackendConfig> = (1..=n)
      .map(|id| BackendConfig::active(id, weight))
      .collect();
    if let Some(last) = configs.last_mut() {
      last.target_weight += ALLOCATION_SCALE - weight * n;
    }
    let bounded: BoundedVec<BackendConfig, T::MaxBackends> = BoundedVec::truncate_from(configs);

    #[extrinsic_call]
    _(RawOrigin::Root, bounded);

    assert_eq!(Backends::<T>::get().len() as u32, n);
    Ok(())
  }

  #[benchmark]
  fn add_backend() -> Result<(), BenchmarkError> {
    let count = T::MaxBackends::get().saturating_sub(1).max(1);
    setup_backends::<T>(count)?;
    let config = BackendConfig::active(count + 1, 0);

    #[extrinsic_call]
    _(RawOrigin::Root, config);

    assert!(BackendIndex::<T>::contains_key(count + 1));
    Ok(())
  }

  #[benchmark]
  fn update_backend() -> Result<(), BenchmarkError> {
    setup_backends::<T>(T::MaxBackends::get())?;

    #[extrinsic_call]
    _(RawOrigin::Root, 1, 0, BackendStatus::Suspended);

    Ok(())
  }

  #[benchmark]
  fn remove_backend() -> Result<(), BenchmarkError> {
    setup_backends::<T>(T::MaxBackends::get())?;
    Pallet::<T>::update_backend(RawOrigin::Root.into(), 1, 0, BackendStatus::Inactive)?;

    #[extrinsic_call]
    _(RawOrigin::Root, 1);

    assert!(!BackendIndex::<T>::contains_key(1));
    Ok(())
  }

  #[benchmark]
  fn remove_impaired_backend() -> Result<(), BenchmarkError> {
    setup_backends::<T>(T::MaxBackends::get())?;
    let (origin, _) = upstream::<T>()?;
    Pallet::<T>::solver_deposit_assets(origin, solver_legs::<T>(&[1], AMOUNT))?;

    #[extrinsic_call]
    _(RawOrigin::Root, 1);

    assert!(RecognizedLosses::<T>::contains_key(1));
    Ok(())
  }

  #[benchmark]
  fn bind_converter() -> Result<(), BenchmarkError> {
    setup_backends::<T>(T::MaxBackends::get())?;
    Pallet::<T>::unbind_converter(RawOrigin::Root.into(), 1)?;
    let converter = T::BenchmarkHelper::prepare_backend(1)?;

    #[extrinsic_call]
    _(RawOrigin::Root, 1, converter);

    assert!(ConverterBindings::<T>::contains_key(1));
    Ok(())
  }

  #[benchmark]
  fn unbind_converter() -> Result<(), BenchmarkError> {
    setup_backends::<T>(T::MaxBackends::get())?;

    #[extrinsic_call]
    _(RawOrigin::Root, 1);

    assert!(!ConverterBindings::<T>::contains_key(1));
    Ok(())
  }

  #[benchmark]
  fn pause() {
    #[extrinsic_call]
    _(RawOrigin::Root);

    assert!(Paused::<T>::get());
  }

  #[benchmark]
  fn unpause() {
    Paused::<T>::put(true);

    #[extrinsic_call]
    _(RawOrigin::Root);

    assert!(!Paused::<T>::get());
  }

  #[benchmark]
  fn set_dust_tolerance() {
    #[extrinsic_call]
    _(RawOrigin::Root, 1_000);

    assert_eq!(DustTolerance::<T>::get(), 1_000);
  }

  #[benchmark]
  fn set_max_backends_per_operation() {
    #[extrinsic_call]
    _(RawOrigin::Root, 1);
  }

  #[benchmark]
  fn set_max_backend_count() {
    #[extrinsic_call]
    _(RawOrigin::Root, T::MaxBackends::get());
  }

  #[benchmark]
  fn set_default_backend() -> Result<(), BenchmarkError> {
    setup_backends::<T>(1)?;

    #[extrinsic_call]
    _(RawOrigin::Root, Some(1));

    assert_eq!(DefaultBackend::<T>::get(), Some(1));
    Ok(())
  }

  #[benchmark]
  fn sweep_surplus() -> Result<(), BenchmarkError> {
    setup_backends::<T>(1)?;
    Pallet::<T>::set_default_backend(RawOrigin::Root.into(), Some(1))?;
    T::BenchmarkHelper::fund_stable(&Pallet::<T>::account_id(), AMOUNT)?;

    #[extrinsic_call]
    _(RawOrigin::Root);

    assert!(Surplus::<T>::get().is_zero());
    Ok(())
  }

  #[cfg(test)]
  use crate::mock::{Test, new_test_ext};
  #[cfg(test)]
  impl_benchmark_test_suite!(Pallet, new_test_ext(), Test);
}
