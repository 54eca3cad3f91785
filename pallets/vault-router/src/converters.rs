//! Converter adapters
//!
//! A runtime usually hosts several converter families (plain share tokens, external
//! tokenized vaults, wrapped lending positions). [`FamilyDispatch`] routes a
//! [`ConverterRef`] to the family implementation selected by its kind, so the router
//! only ever talks to the single [`Converter`] seam.

use core::marker::PhantomData;
use frame::prelude::*;
use polkadot_sdk::frame_support::traits::{
  fungibles::{Inspect, Mutate},
  tokens::{Fortitude, Precision, Preservation},
};
use polkadot_sdk::sp_runtime::traits::Convert;

use crate::types::{Balance, BackendId, Converter, ConverterKind, ConverterRef};

/// One family of converters, addressed by instance number.
pub trait ConverterFamily<AccountId> {
  fn backend_identifier(instance: u32) -> Option<BackendId>;

  fn preview_deposit(instance: u32, assets: Balance) -> Result<(BackendId, Balance), DispatchError>;

  fn deposit(
    instance: u32,
    from: &AccountId,
    beneficiary: &AccountId,
    assets: Balance,
  ) -> Result<(BackendId, Balance), DispatchError>;

  fn preview_withdraw(instance: u32, shares: Balance) -> Result<Balance, DispatchError>;

  fn withdraw(instance: u32, who: &AccountId, shares: Balance) -> Result<Balance, DispatchError>;

  fn balance_of(instance: u32, who: &AccountId) -> Balance;
}

/// Family slot left empty by the runtime.
impl<AccountId> ConverterFamily<AccountId> for () {
  fn backend_identifier(_: u32) -> Option<BackendId> {
    None
  }

  fn preview_deposit(_: u32, _: Balance) -> Result<(BackendId, Balance), DispatchError> {
    Err(DispatchError::Other("converter family not configured"))
  }

  fn deposit(
    _: u32,
    _: &AccountId,
    _: &AccountId,
    _: Balance,
  ) -> Result<(BackendId, Balance), DispatchError> {
    Err(DispatchError::Other("converter family not configured"))
  }

  fn preview_withdraw(_: u32, _: Balance) -> Result<Balance, DispatchError> {
    Err(DispatchError::Other("converter family not configured"))
  }

  fn withdraw(_: u32, _: &AccountId, _: Balance) -> Result<Balance, DispatchError> {
    Err(DispatchError::Other("converter family not configured"))
  }

  fn balance_of(_: u32, _: &AccountId) -> Balance {
    0
  }
}

/// [`Converter`] that forwards to `Identity`, `Vault` or `Lending` by converter kind.
pub struct FamilyDispatch<Identity, Vault, Lending>(PhantomData<(Identity, Vault, Lending)>);

impl<AccountId, Identity, Vault, Lending> Converter<AccountId>
  for FamilyDispatch<Identity, Vault, Lending>
where
  Identity: ConverterFamily<AccountId>,
  Vault: ConverterFamily<AccountId>,
  Lending: ConverterFamily<AccountId>,
{
  fn backend_identifier(converter: ConverterRef) -> Option<BackendId> {
    match converter.kind {
      ConverterKind::Identity => Identity::backend_identifier(converter.instance),
      ConverterKind::ExternalVault => Vault::backend_identifier(converter.instance),
      ConverterKind::WrappedLending => Lending::backend_identifier(converter.instance),
    }
  }

  fn preview_deposit(
    converter: ConverterRef,
    assets: Balance,
  ) -> Result<(BackendId, Balance), DispatchError> {
    match converter.kind {
      ConverterKind::Identity => Identity::preview_deposit(converter.instance, assets),
      ConverterKind::ExternalVault => Vault::preview_deposit(converter.instance, assets),
      ConverterKind::WrappedLending => Lending::preview_deposit(converter.instance, assets),
    }
  }

  fn deposit(
    converter: ConverterRef,
    from: &AccountId,
    beneficiary: &AccountId,
    assets: Balance,
  ) -> Result<(BackendId, Balance), DispatchError> {
    match converter.kind {
      ConverterKind::Identity => Identity::deposit(converter.instance, from, beneficiary, assets),
      ConverterKind::ExternalVault => Vault::deposit(converter.instance, from, beneficiary, assets),
      ConverterKind::WrappedLending => {
        Lending::deposit(converter.instance, from, beneficiary, assets)
      }
    }
  }

  fn preview_withdraw(converter: ConverterRef, shares: Balance) -> Result<Balance, DispatchError> {
    match converter.kind {
      ConverterKind::Identity => Identity::preview_withdraw(converter.instance, shares),
      ConverterKind::ExternalVault => Vault::preview_withdraw(converter.instance, shares),
      ConverterKind::WrappedLending => Lending::preview_withdraw(converter.instance, shares),
    }
  }

  fn withdraw(
    converter: ConverterRef,
    who: &AccountId,
    shares: Balance,
  ) -> Result<Balance, DispatchError> {
    match converter.kind {
      ConverterKind::Identity => Identity::withdraw(converter.instance, who, shares),
      ConverterKind::ExternalVault => Vault::withdraw(converter.instance, who, shares),
      ConverterKind::WrappedLending => Lending::withdraw(converter.instance, who, shares),
    }
  }

  fn balance_of(converter: ConverterRef, who: &AccountId) -> Balance {
    match converter.kind {
      ConverterKind::Identity => Identity::balance_of(converter.instance, who),
      ConverterKind::ExternalVault => Vault::balance_of(converter.instance, who),
      ConverterKind::WrappedLending => Lending::balance_of(converter.instance, who),
    }
  }
}

/// One-to-one share token backed by stable units parked in a per-backend vault account.
///
/// The instance number is the backend identifier. `ShareAsset` maps a backend to the
/// fungible minted as its share and `VaultAccount` to the account holding its stable units.
pub struct PassThroughConverter<Assets, StableAsset, ShareAsset, VaultAccount>(
  PhantomData<(Assets, StableAsset, ShareAsset, VaultAccount)>,
);

impl<AccountId, Assets, StableAsset, ShareAsset, VaultAccount> ConverterFamily<AccountId>
  for PassThroughConverter<Assets, StableAsset, ShareAsset, VaultAccount>
where
  AccountId: Eq,
  Assets: Inspect<AccountId, AssetId = u32, Balance = Balance>
    + Mutate<AccountId, AssetId = u32, Balance = Balance>,
  StableAsset: Get<u32>,
  ShareAsset: Convert<BackendId, u32>,
  VaultAccount: Convert<BackendId, AccountId>,
{
  fn backend_identifier(instance: u32) -> Option<BackendId> {
    (instance != 0).then_some(instance)
  }

  fn preview_deposit(instance: u32, assets: Balance) -> Result<(BackendId, Balance), DispatchError> {
    Ok((instance, assets))
  }

  fn deposit(
    instance: u32,
    from: &AccountId,
    beneficiary: &AccountId,
    assets: Balance,
  ) -> Result<(BackendId, Balance), DispatchError> {
    let vault = VaultAccount::convert(instance);
    Assets::transfer(
      StableAsset::get(),
      from,
      &vault,
      assets,
      Preservation::Expendable,
    )?;
    Assets::mint_into(ShareAsset::convert(instance), beneficiary, assets)?;
    Ok((instance, assets))
  }

  fn preview_withdraw(_instance: u32, shares: Balance) -> Result<Balance, DispatchError> {
    Ok(shares)
  }

  fn withdraw(instance: u32, who: &AccountId, shares: Balance) -> Result<Balance, DispatchError> {
    Assets::burn_from(
      ShareAsset::convert(instance),
      who,
      shares,
      Preservation::Expendable,
      Precision::Exact,
      Fortitude::Polite,
    )?;
    let vault = VaultAccount::convert(instance);
    Assets::transfer(
      StableAsset::get(),
      &vault,
      who,
      shares,
      Preservation::Expendable,
    )?;
    Ok(shares)
  }

  fn balance_of(instance: u32, who: &AccountId) -> Balance {
    Assets::balance(ShareAsset::convert(instance), who)
  }
}
