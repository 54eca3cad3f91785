#![cfg_attr(rustfmt, rustfmt_skip)]
#![allow(unused_parens)]
#![allow(unused_imports)]
#![allow(missing_docs)]

use core::marker::PhantomData;
use polkadot_sdk::frame_support::{
  traits::Get,
  weights::{constants::RocksDbWeight, Weight},
};

/// Weight functions for `pallet_vault_router`.
///
/// Automatic `deposit` and `withdraw` are charged the base returned here plus the
/// caller's retry budget; unused budget is refunded after dispatch.
pub trait WeightInfo {
  fn deposit() -> Weight;
  fn withdraw() -> Weight;
  fn solver_deposit_assets(legs: u32) -> Weight;
  fn solver_deposit_shares(legs: u32) -> Weight;
  fn solver_withdraw_assets(legs: u32) -> Weight;
  fn solver_withdraw_shares(legs: u32) -> Weight;
  fn exchange_assets() -> Weight;
  fn rebalance() -> Weight;
  fn set_backends(count: u32) -> Weight;
  fn add_backend() -> Weight;
  fn update_backend() -> Weight;
  fn remove_backend() -> Weight;
  fn remove_impaired_backend() -> Weight;
  fn bind_converter() -> Weight;
  fn unbind_converter() -> Weight;
  fn pause() -> Weight;
  fn unpause() -> Weight;
  fn set_dust_tolerance() -> Weight;
  fn set_max_backends_per_operation() -> Weight;
  fn set_max_backend_count() -> Weight;
  fn set_default_backend() -> Weight;
  fn sweep_surplus() -> Weight;
}

pub struct SubstrateWeight<T>(PhantomData<T>);
impl<T: polkadot_sdk::frame_system::Config + crate::Config> WeightInfo for SubstrateWeight<T> {
  fn deposit() -> Weight {
    // Snapshot: record, binding and custody position per configured backend
    let snapshot_reads = u64::from(T::MaxBackends::get()).saturating_mul(3);
    Weight::from_parts(40_000_000, 4000)
      .saturating_add(T::DbWeight::get().reads(snapshot_reads.saturating_add(6)))
      .saturating_add(T::DbWeight::get().writes(5))
  }

  fn withdraw() -> Weight {
    let snapshot_reads = u64::from(T::MaxBackends::get()).saturating_mul(3);
    Weight::from_parts(45_000_000, 4000)
      .saturating_add(T::DbWeight::get().reads(snapshot_reads.saturating_add(6)))
      .saturating_add(T::DbWeight::get().writes(6))
  }

  fn solver_deposit_assets(legs: u32) -> Weight {
    let legs = u64::from(legs);
    Weight::from_parts(20_000_000, 2500)
      .saturating_add(Weight::from_parts(25_000_000, 1500).saturating_mul(legs))
      .saturating_add(T::DbWeight::get().reads(legs.saturating_mul(5).saturating_add(3)))
      .saturating_add(T::DbWeight::get().writes(legs.saturating_mul(4).saturating_add(3)))
  }

  fn solver_deposit_shares(legs: u32) -> Weight {
    let legs = u64::from(legs);
    Weight::from_parts(20_000_000, 2500)
      .saturating_add(Weight::from_parts(30_000_000, 1500).saturating_mul(legs))
      .saturating_add(T::DbWeight::get().reads(legs.saturating_mul(6).saturating_add(3)))
      .saturating_add(T::DbWeight::get().writes(legs.saturating_mul(4).saturating_add(3)))
  }

  fn solver_withdraw_assets(legs: u32) -> Weight {
    let legs = u64::from(legs);
    Weight::from_parts(20_000_000, 2500)
      .saturating_add(Weight::from_parts(35_000_000, 1500).saturating_mul(legs))
      .saturating_add(T::DbWeight::get().reads(legs.saturating_mul(6).saturating_add(2)))
      .saturating_add(T::DbWeight::get().writes(legs.saturating_mul(5).saturating_add(1)))
  }

  fn solver_withdraw_shares(legs: u32) -> Weight {
    let legs = u64::from(legs);
    Weight::from_parts(20_000_000, 2500)
      .saturating_add(Weight::from_parts(30_000_000, 1500).saturating_mul(legs))
      .saturating_add(T::DbWeight::get().reads(legs.saturating_mul(5).saturating_add(2)))
      .saturating_add(T::DbWeight::get().writes(legs.saturating_mul(5).saturating_add(1)))
  }

  fn exchange_assets() -> Weight {
    Weight::from_parts(55_000_000, 3500)
      .saturating_add(T::DbWeight::get().reads(10))
      .saturating_add(T::DbWeight::get().writes(8))
  }

  fn rebalance() -> Weight {
    let snapshot_reads = u64::from(T::MaxBackends::get()).saturating_mul(3);
    Weight::from_parts(65_000_000, 4000)
      .saturating_add(T::DbWeight::get().reads(snapshot_reads.saturating_add(10)))
      .saturating_add(T::DbWeight::get().writes(8))
  }

  fn set_backends(count: u32) -> Weight {
    let previous = u64::from(T::MaxBackends::get());
    let count = u64::from(count);
    Weight::from_parts(15_000_000, 1500)
      .saturating_add(Weight::from_parts(1_500_000, 0).saturating_mul(count))
      .saturating_add(T::DbWeight::get().reads(previous.saturating_mul(2).saturating_add(2)))
      .saturating_add(T::DbWeight::get().writes(previous.saturating_mul(3).saturating_add(count).saturating_add(1)))
  }

  fn add_backend() -> Weight {
    Weight::from_parts(14_000_000, 1500)
      .saturating_add(T::DbWeight::get().reads(3))
      .saturating_add(T::DbWeight::get().writes(2))
  }

  fn update_backend() -> Weight {
    Weight::from_parts(12_000_000, 1500)
      .saturating_add(T::DbWeight::get().reads(2))
      .saturating_add(T::DbWeight::get().writes(1))
  }

  fn remove_backend() -> Weight {
    Weight::from_parts(18_000_000, 1500)
      .saturating_add(T::DbWeight::get().reads(5))
      .saturating_add(T::DbWeight::get().writes(5))
  }

  fn remove_impaired_backend() -> Weight {
    Weight::from_parts(20_000_000, 1800)
      .saturating_add(T::DbWeight::get().reads(6))
      .saturating_add(T::DbWeight::get().writes(6))
  }

  fn bind_converter() -> Weight {
    Weight::from_parts(14_000_000, 1200)
      .saturating_add(T::DbWeight::get().reads(3))
      .saturating_add(T::DbWeight::get().writes(2))
  }

  fn unbind_converter() -> Weight {
    Weight::from_parts(14_000_000, 1200)
      .saturating_add(T::DbWeight::get().reads(3))
      .saturating_add(T::DbWeight::get().writes(2))
  }

  fn pause() -> Weight {
    Weight::from_parts(8_000_000, 600)
      .saturating_add(T::DbWeight::get().writes(1))
  }

  fn unpause() -> Weight {
    Weight::from_parts(8_000_000, 600)
      .saturating_add(T::DbWeight::get().writes(1))
  }

  fn set_dust_tolerance() -> Weight {
    Weight::from_parts(8_000_000, 600)
      .saturating_add(T::DbWeight::get().writes(1))
  }

  fn set_max_backends_per_operation() -> Weight {
    Weight::from_parts(8_000_000, 600)
      .saturating_add(T::DbWeight::get().writes(1))
  }

  fn set_max_backend_count() -> Weight {
    Weight::from_parts(9_000_000, 600)
      .saturating_add(T::DbWeight::get().reads(1))
      .saturating_add(T::DbWeight::get().writes(1))
  }

  fn set_default_backend() -> Weight {
    Weight::from_parts(9_000_000, 600)
      .saturating_add(T::DbWeight::get().reads(1))
      .saturating_add(T::DbWeight::get().writes(1))
  }

  fn sweep_surplus() -> Weight {
    Weight::from_parts(35_000_000, 2500)
      .saturating_add(T::DbWeight::get().reads(8))
      .saturating_add(T::DbWeight::get().writes(5))
  }
}

impl WeightInfo for () {
  fn deposit() -> Weight { Weight::from_parts(40_000_000, 4000) }
  fn withdraw() -> Weight { Weight::from_parts(45_000_000, 4000) }
  fn solver_deposit_assets(legs: u32) -> Weight {
    Weight::from_parts(20_000_000u64.saturating_add(u64::from(legs).saturating_mul(25_000_000)), 2500)
  }
  fn solver_deposit_shares(legs: u32) -> Weight {
    Weight::from_parts(20_000_000u64.saturating_add(u64::from(legs).saturating_mul(30_000_000)), 2500)
  }
  fn solver_withdraw_assets(legs: u32) -> Weight {
    Weight::from_parts(20_000_000u64.saturating_add(u64::from(legs).saturating_mul(35_000_000)), 2500)
  }
  fn solver_withdraw_shares(legs: u32) -> Weight {
    Weight::from_parts(20_000_000u64.saturating_add(u64::from(legs).saturating_mul(30_000_000)), 2500)
  }
  fn exchange_assets() -> Weight { Weight::from_parts(55_000_000, 3500) }
  fn rebalance() -> Weight { Weight::from_parts(65_000_000, 4000) }
  fn set_backends(count: u32) -> Weight {
    Weight::from_parts(15_000_000u64.saturating_add(u64::from(count).saturating_mul(1_500_000)), 1500)
  }
  fn add_backend() -> Weight { Weight::from_parts(14_000_000, 1500) }
  fn update_backend() -> Weight { Weight::from_parts(12_000_000, 1500) }
  fn remove_backend() -> Weight { Weight::from_parts(18_000_000, 1500) }
  fn remove_impaired_backend() -> Weight { Weight::from_parts(20_000_000, 1800) }
  fn bind_converter() -> Weight { Weight::from_parts(14_000_000, 1200) }
  fn unbind_converter() -> Weight { Weight::from_parts(14_000_000, 1200) }
  fn pause() -> Weight { Weight::from_parts(8_000_000, 600) }
  fn unpause() -> Weight { Weight::from_parts(8_000_000, 600) }
  fn set_dust_tolerance() -> Weight { Weight::from_parts(8_000_000, 600) }
  fn set_max_backends_per_operation() -> Weight { Weight::from_parts(8_000_000, 600) }
  fn set_max_backend_count() -> Weight { Weight::from_parts(9_000_000, 600) }
  fn set_default_backend() -> Weight { Weight::from_parts(9_000_000, 600) }
  fn sweep_surplus() -> Weight { Weight::from_parts(35_000_000, 2500) }
}
