use crate as pallet_vault_router;
use crate::{
  BackendConfig, BackendId, BackendStatus, ConverterFamily, ConverterKind, ConverterRef, Custody,
  FamilyDispatch, PassThroughConverter, Ppm,
};

use polkadot_sdk::frame_support::traits::fungibles::{Inspect, Mutate as FungiblesMutate};
use polkadot_sdk::frame_support::traits::tokens::{Fortitude, Precision, Preservation};
use polkadot_sdk::frame_support::{
  PalletId, assert_ok, construct_runtime, derive_impl, ord_parameter_types, parameter_types,
  storage::unhashed,
  traits::{ConstU32, ConstU128, Get},
  weights::Weight,
};
use polkadot_sdk::frame_system::{self, EnsureRoot, EnsureSignedBy};
use polkadot_sdk::sp_runtime::{
  BuildStorage, DispatchError, DispatchResult,
  testing::H256,
  traits::{BlakeTwo256, Convert, IdentityLookup},
};
use primitives::{pallet_ids::VAULT_ROUTER_PALLET_ID, params::HEALTH_PROBE_AMOUNT};

use core::marker::PhantomData;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

pub const STABLE: u32 = 1;
pub const SHARE_ASSET_BASE: u32 = 100;
pub const VAULT_ACCOUNT_BASE: u64 = 1_000;

pub const ASSET_OWNER: u64 = 1;
pub const UPSTREAM: u64 = 10;
pub const EXCHANGER: u64 = 20;
pub const RECEIVER: u64 = 30;
pub const OWNER: u64 = 31;
pub const STRANGER: u64 = 99;
pub const CUSTODY: u64 = 900;

pub const INITIAL_STABLE: u128 = 1_000_000_000;
pub const MOCK_DUST: u128 = 10;
/// Backends 1..=MAX_TEST_BACKEND get a share asset at startup
pub const MAX_TEST_BACKEND: BackendId = 6;

/// Enough retry allowance for every test scenario
pub const BUDGET: Weight = Weight::from_parts(1_000_000_000, 0);

// Fault injection for mock converters, keyed by backend
thread_local! {
    pub static DEPOSIT_FAULTS: RefCell<BTreeMap<BackendId, DispatchError>> = const { RefCell::new(BTreeMap::new()) };
    pub static WITHDRAW_FAULTS: RefCell<BTreeMap<BackendId, DispatchError>> = const { RefCell::new(BTreeMap::new()) };
    // Converter keeps half of what it reports delivering
    pub static UNDER_DELIVERING: RefCell<BTreeSet<BackendId>> = const { RefCell::new(BTreeSet::new()) };
    // Deposits report this backend instead of their own
    pub static MISREPORTING: RefCell<BTreeMap<BackendId, BackendId>> = const { RefCell::new(BTreeMap::new()) };
    // Previews fail
    pub static BROKEN_PREVIEWS: RefCell<BTreeSet<BackendId>> = const { RefCell::new(BTreeSet::new()) };
    // Withdrawals burn half the shares; the flag makes them still pay the full value
    pub static PARTIAL_BURNS: RefCell<BTreeMap<BackendId, bool>> = const { RefCell::new(BTreeMap::new()) };
}

pub fn fail_deposits(backend: BackendId, error: DispatchError) {
  DEPOSIT_FAULTS.with(|f| f.borrow_mut().insert(backend, error));
}

pub fn fail_withdrawals(backend: BackendId, error: DispatchError) {
  WITHDRAW_FAULTS.with(|f| f.borrow_mut().insert(backend, error));
}

pub fn under_deliver(backend: BackendId) {
  UNDER_DELIVERING.with(|u| u.borrow_mut().insert(backend));
}

pub fn misreport_deposits(backend: BackendId, reported: BackendId) {
  MISREPORTING.with(|m| m.borrow_mut().insert(backend, reported));
}

pub fn break_previews(backend: BackendId) {
  BROKEN_PREVIEWS.with(|b| b.borrow_mut().insert(backend));
}

pub fn burn_partially(backend: BackendId, pays_full: bool) {
  PARTIAL_BURNS.with(|p| p.borrow_mut().insert(backend, pays_full));
}

pub fn clear_faults() {
  DEPOSIT_FAULTS.with(|f| f.borrow_mut().clear());
  WITHDRAW_FAULTS.with(|f| f.borrow_mut().clear());
  UNDER_DELIVERING.with(|u| u.borrow_mut().clear());
  MISREPORTING.with(|m| m.borrow_mut().clear());
  BROKEN_PREVIEWS.with(|b| b.borrow_mut().clear());
  PARTIAL_BURNS.with(|p| p.borrow_mut().clear());
}

type Block = frame_system::mocking::MockBlock<Test>;

construct_runtime!(
  pub struct Test {
    System: frame_system,
    Balances: polkadot_sdk::pallet_balances,
    Assets: polkadot_sdk::pallet_assets,
    VaultRouter: pallet_vault_router,
  }
);

#[derive_impl(frame_system::config_preludes::TestDefaultConfig)]
impl frame_system::Config for Test {
  type Block = Block;
  type AccountId = u64;
  type Lookup = IdentityLookup<Self::AccountId>;
  type Hash = H256;
  type Hashing = BlakeTwo256;
  type AccountData = polkadot_sdk::pallet_balances::AccountData<u128>;
}

impl polkadot_sdk::pallet_balances::Config for Test {
  type MaxLocks = ();
  type MaxReserves = ();
  type ReserveIdentifier = [u8; 8];
  type Balance = u128;
  type DustRemoval = ();
  type RuntimeEvent = RuntimeEvent;
  type ExistentialDeposit = ConstU128<1>;
  type AccountStore = System;
  type WeightInfo = ();
  type FreezeIdentifier = ();
  type MaxFreezes = ();
  type RuntimeHoldReason = ();
  type RuntimeFreezeReason = ();
  type DoneSlashHandler = ();
}

impl polkadot_sdk::pallet_assets::Config for Test {
  type RuntimeEvent = RuntimeEvent;
  type Balance = u128;
  type AssetId = u32;
  type AssetIdParameter = u32;
  type Currency = Balances;
  type CreateOrigin = polkadot_sdk::frame_support::traits::AsEnsureOriginWithArg<
    frame_system::EnsureSigned<Self::AccountId>,
  >;
  type ForceOrigin = EnsureRoot<Self::AccountId>;
  type AssetDeposit = ConstU128<1>;
  type AssetAccountDeposit = ConstU128<1>;
  type MetadataDepositBase = ConstU128<1>;
  type MetadataDepositPerByte = ConstU128<1>;
  type ApprovalDeposit = ConstU128<1>;
  type StringLimit = ConstU32<50>;
  type Freezer = ();
  type Extra = ();
  type ReserveData = ();
  type CallbackHandle = ();
  type WeightInfo = ();
  type RemoveItemsLimit = ConstU32<5>;
  type Holder = ();
  #[cfg(feature = "runtime-benchmarks")]
  type BenchmarkHelper = AssetBenchmarkHelper;
}

#[cfg(feature = "runtime-benchmarks")]
pub struct AssetBenchmarkHelper;

#[cfg(feature = "runtime-benchmarks")]
impl polkadot_sdk::pallet_assets::BenchmarkHelper<u32, ()> for AssetBenchmarkHelper {
  fn create_asset_id_parameter(id: u32) -> u32 {
    id
  }
  fn create_reserve_id_parameter(_id: u32) -> () {
    ()
  }
}

pub struct ShareAssetOf;
impl Convert<BackendId, u32> for ShareAssetOf {
  fn convert(backend: BackendId) -> u32 {
    SHARE_ASSET_BASE + backend
  }
}

pub struct VaultAccountOf;
impl Convert<BackendId, u64> for VaultAccountOf {
  fn convert(backend: BackendId) -> u64 {
    VAULT_ACCOUNT_BASE + u64::from(backend)
  }
}

pub fn share_asset(backend: BackendId) -> u32 {
  ShareAssetOf::convert(backend)
}

pub fn vault_account(backend: BackendId) -> u64 {
  VaultAccountOf::convert(backend)
}

parameter_types! {
  pub const StableAssetId: u32 = STABLE;
  pub const VaultRouterPalletId: PalletId = PalletId(*VAULT_ROUTER_PALLET_ID);
  pub const MaxBackends: u32 = 8;
  pub const HealthProbeAmount: u128 = HEALTH_PROBE_AMOUNT;
  pub const AttemptWeight: Weight = Weight::from_parts(10_000_000, 0);
  pub const CompletionReserve: Weight = Weight::from_parts(5_000_000, 0);
  // Two shares per stable unit
  pub const VaultRate: (u128, u128) = (2, 1);
  // Index of 1.01 stable units per share
  pub const LendingRate: (u128, u128) = (100, 101);
}

ord_parameter_types! {
  pub const Upstream: u64 = UPSTREAM;
  pub const Exchanger: u64 = EXCHANGER;
}

/// Share token minted at a fixed `shares : assets` rate, rounding down both ways.
pub struct RatedConverter<Rate>(PhantomData<Rate>);

impl<Rate: Get<(u128, u128)>> RatedConverter<Rate> {
  fn to_shares(assets: u128) -> u128 {
    let (shares, per_assets) = Rate::get();
    assets * shares / per_assets
  }

  fn to_assets(shares: u128) -> u128 {
    let (per_shares, assets) = Rate::get();
    shares * assets / per_shares
  }
}

impl<Rate: Get<(u128, u128)>> ConverterFamily<u64> for RatedConverter<Rate> {
  fn backend_identifier(instance: u32) -> Option<BackendId> {
    (instance != 0).then_some(instance)
  }

  fn preview_deposit(instance: u32, assets: u128) -> Result<(BackendId, u128), DispatchError> {
    Ok((instance, Self::to_shares(assets)))
  }

  fn deposit(
    instance: u32,
    from: &u64,
    beneficiary: &u64,
    assets: u128,
  ) -> Result<(BackendId, u128), DispatchError> {
    let shares = Self::to_shares(assets);
    <Assets as FungiblesMutate<u64>>::transfer(
      STABLE,
      from,
      &vault_account(instance),
      assets,
      Preservation::Expendable,
    )?;
    <Assets as FungiblesMutate<u64>>::mint_into(share_asset(instance), beneficiary, shares)?;
    Ok((instance, shares))
  }

  fn preview_withdraw(_instance: u32, shares: u128) -> Result<u128, DispatchError> {
    Ok(Self::to_assets(shares))
  }

  fn withdraw(instance: u32, who: &u64, shares: u128) -> Result<u128, DispatchError> {
    let assets = Self::to_assets(shares);
    <Assets as FungiblesMutate<u64>>::burn_from(
      share_asset(instance),
      who,
      shares,
      Preservation::Expendable,
      Precision::Exact,
      Fortitude::Polite,
    )?;
    <Assets as FungiblesMutate<u64>>::transfer(
      STABLE,
      &vault_account(instance),
      who,
      assets,
      Preservation::Expendable,
    )?;
    Ok(assets)
  }

  fn balance_of(instance: u32, who: &u64) -> u128 {
    <Assets as Inspect<u64>>::balance(share_asset(instance), who)
  }
}

/// Wraps a converter family with the injected faults.
pub struct Faulty<Inner>(PhantomData<Inner>);

impl<Inner: ConverterFamily<u64>> ConverterFamily<u64> for Faulty<Inner> {
  fn backend_identifier(instance: u32) -> Option<BackendId> {
    Inner::backend_identifier(instance)
  }

  fn preview_deposit(instance: u32, assets: u128) -> Result<(BackendId, u128), DispatchError> {
    if BROKEN_PREVIEWS.with(|b| b.borrow().contains(&instance)) {
      return Err(DispatchError::Other("preview unavailable"));
    }
    Inner::preview_deposit(instance, assets)
  }

  fn deposit(
    instance: u32,
    from: &u64,
    beneficiary: &u64,
    assets: u128,
  ) -> Result<(BackendId, u128), DispatchError> {
    if let Some(error) = DEPOSIT_FAULTS.with(|f| f.borrow().get(&instance).cloned()) {
      return Err(error);
    }
    let (backend, shares) = Inner::deposit(instance, from, beneficiary, assets)?;
    if UNDER_DELIVERING.with(|u| u.borrow().contains(&instance)) {
      <Assets as FungiblesMutate<u64>>::burn_from(
        share_asset(instance),
        beneficiary,
        shares / 2,
        Preservation::Expendable,
        Precision::Exact,
        Fortitude::Force,
      )?;
    }
    let reported = MISREPORTING
      .with(|m| m.borrow().get(&instance).copied())
      .unwrap_or(backend);
    Ok((reported, shares))
  }

  fn preview_withdraw(instance: u32, shares: u128) -> Result<u128, DispatchError> {
    if BROKEN_PREVIEWS.with(|b| b.borrow().contains(&instance)) {
      return Err(DispatchError::Other("preview unavailable"));
    }
    Inner::preview_withdraw(instance, shares)
  }

  fn withdraw(instance: u32, who: &u64, shares: u128) -> Result<u128, DispatchError> {
    if let Some(error) = WITHDRAW_FAULTS.with(|f| f.borrow().get(&instance).cloned()) {
      return Err(error);
    }
    if let Some(pays_full) = PARTIAL_BURNS.with(|p| p.borrow().get(&instance).copied()) {
      let mut paid = Inner::withdraw(instance, who, shares / 2)?;
      if pays_full {
        let owed = Inner::preview_withdraw(instance, shares)?.saturating_sub(paid);
        <Assets as FungiblesMutate<u64>>::transfer(
          STABLE,
          &vault_account(instance),
          who,
          owed,
          Preservation::Expendable,
        )?;
        paid += owed;
      }
      return Ok(paid);
    }
    let assets = Inner::withdraw(instance, who, shares)?;
    if UNDER_DELIVERING.with(|u| u.borrow().contains(&instance)) {
      <Assets as FungiblesMutate<u64>>::transfer(
        STABLE,
        who,
        &vault_account(instance),
        assets / 2,
        Preservation::Expendable,
      )?;
    }
    Ok(assets)
  }

  fn balance_of(instance: u32, who: &u64) -> u128 {
    Inner::balance_of(instance, who)
  }
}

pub type IdentityConverter =
  PassThroughConverter<Assets, StableAssetId, ShareAssetOf, VaultAccountOf>;

pub type MockConverter = FamilyDispatch<
  Faulty<IdentityConverter>,
  Faulty<RatedConverter<VaultRate>>,
  Faulty<RatedConverter<LendingRate>>,
>;

const SUPPORTED_KEY: &[u8] = b":mock:custody:supported";

/// Custody holding share assets on a plain account.
///
/// The supported set lives in raw storage so it reverts together with the router's
/// storage layers.
pub struct MockCustody;

impl MockCustody {
  fn supported() -> Vec<BackendId> {
    unhashed::get_or_default(SUPPORTED_KEY)
  }
}

impl Custody<u64> for MockCustody {
  fn account() -> u64 {
    CUSTODY
  }

  fn position(backend: BackendId) -> u128 {
    <Assets as Inspect<u64>>::balance(share_asset(backend), &CUSTODY)
  }

  fn send_asset(backend: BackendId, amount: u128, to: &u64) -> DispatchResult {
    <Assets as FungiblesMutate<u64>>::transfer(
      share_asset(backend),
      &CUSTODY,
      to,
      amount,
      Preservation::Expendable,
    )?;
    Ok(())
  }

  fn add_supported(backend: BackendId) -> DispatchResult {
    let mut supported = Self::supported();
    if !supported.contains(&backend) {
      supported.push(backend);
      supported.sort();
      unhashed::put(SUPPORTED_KEY, &supported);
    }
    Ok(())
  }

  fn remove_supported(backend: BackendId) -> DispatchResult {
    let mut supported = Self::supported();
    supported.retain(|b| *b != backend);
    unhashed::put(SUPPORTED_KEY, &supported);
    Ok(())
  }

  fn is_supported(backend: BackendId) -> bool {
    Self::supported().contains(&backend)
  }

  fn total_value() -> u128 {
    Self::supported()
      .into_iter()
      .map(VaultRouter::backend_value)
      .sum()
  }
}

#[cfg(feature = "runtime-benchmarks")]
pub struct VaultRouterBenchmarkHelper;

#[cfg(feature = "runtime-benchmarks")]
impl crate::BenchmarkHelper<u64> for VaultRouterBenchmarkHelper {
  fn prepare_backend(backend: BackendId) -> Result<ConverterRef, DispatchError> {
    let asset = share_asset(backend);
    if !<Assets as Inspect<u64>>::asset_exists(asset) {
      Assets::force_create(RuntimeOrigin::root(), asset, ASSET_OWNER, true, 1)?;
    }
    Ok(ConverterRef::new(ConverterKind::Identity, backend))
  }

  fn fund_stable(who: &u64, amount: u128) -> DispatchResult {
    <Assets as FungiblesMutate<u64>>::mint_into(STABLE, who, amount)?;
    Ok(())
  }
}

impl pallet_vault_router::Config for Test {
  type Assets = Assets;
  type StableAsset = StableAssetId;
  type Custody = MockCustody;
  type Converter = MockConverter;
  type AdminOrigin = EnsureRoot<u64>;
  type UpstreamOrigin = EnsureSignedBy<Upstream, u64>;
  type ExchangerOrigin = EnsureSignedBy<Exchanger, u64>;
  type PalletId = VaultRouterPalletId;
  type MaxBackends = MaxBackends;
  type HealthProbeAmount = HealthProbeAmount;
  type AttemptWeight = AttemptWeight;
  type CompletionReserve = CompletionReserve;
  type WeightInfo = ();
  #[cfg(feature = "runtime-benchmarks")]
  type BenchmarkHelper = VaultRouterBenchmarkHelper;
}

fn build_ext(router: pallet_vault_router::GenesisConfig<Test>) -> polkadot_sdk::sp_io::TestExternalities {
  let mut storage = frame_system::GenesisConfig::<Test>::default()
    .build_storage()
    .unwrap();
  router.assimilate_storage(&mut storage).unwrap();
  let mut ext: polkadot_sdk::sp_io::TestExternalities = storage.into();

  clear_faults();

  ext.execute_with(|| {
    System::set_block_number(1);

    assert_ok!(Assets::force_create(
      RuntimeOrigin::root(),
      STABLE,
      ASSET_OWNER,
      true,
      1
    ));
    for backend in 1..=MAX_TEST_BACKEND {
      assert_ok!(Assets::force_create(
        RuntimeOrigin::root(),
        share_asset(backend),
        ASSET_OWNER,
        true,
        1
      ));
    }
    for account in [UPSTREAM, EXCHANGER, STRANGER] {
      assert_ok!(Assets::mint_into(STABLE, &account, INITIAL_STABLE));
    }
  });
  ext
}

pub fn new_test_ext() -> polkadot_sdk::sp_io::TestExternalities {
  build_ext(pallet_vault_router::GenesisConfig::<Test> {
    dust_tolerance: MOCK_DUST,
    ..Default::default()
  })
}

/// Test externalities whose router genesis configures and binds `backends`.
pub fn new_test_ext_with_backends(
  backends: &[(BackendId, ConverterKind, Ppm)],
) -> polkadot_sdk::sp_io::TestExternalities {
  build_ext(pallet_vault_router::GenesisConfig::<Test> {
    backends: backends
      .iter()
      .map(|(id, _, weight)| BackendConfig::active(*id, *weight))
      .collect(),
    bindings: backends
      .iter()
      .map(|(id, kind, _)| (*id, ConverterRef::new(*kind, *id)))
      .collect(),
    dust_tolerance: MOCK_DUST,
    default_backend: backends.first().map(|(id, _, _)| *id),
    ..Default::default()
  })
}

/// Configure and bind `backends` through the admin calls.
pub fn configure_backends(backends: &[(BackendId, ConverterKind, Ppm)]) {
  let configs: Vec<BackendConfig> = backends
    .iter()
    .map(|(id, _, weight)| BackendConfig::new(*id, *weight, BackendStatus::Active))
    .collect();
  assert_ok!(VaultRouter::set_backends(
    RuntimeOrigin::root(),
    configs.try_into().unwrap()
  ));
  for (id, kind, _) in backends {
    assert_ok!(VaultRouter::bind_converter(
      RuntimeOrigin::root(),
      *id,
      ConverterRef::new(*kind, *id)
    ));
  }
}

/// Identity backends 1, 2 and 3 weighted 50/30/20.
pub fn configure_three_backends() {
  configure_backends(&[
    (1, ConverterKind::Identity, 500_000),
    (2, ConverterKind::Identity, 300_000),
    (3, ConverterKind::Identity, 200_000),
  ]);
}

pub fn position(backend: BackendId) -> u128 {
  MockCustody::position(backend)
}

pub fn stable_balance(who: u64) -> u128 {
  <Assets as Inspect<u64>>::balance(STABLE, &who)
}

pub fn router_account() -> u64 {
  VaultRouter::account_id()
}
