use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use scale_info::TypeInfo;
use serde::{Deserialize, Serialize};

use crate::params::ALLOCATION_SCALE;

/// Identifier of a yield-bearing backend. Zero is reserved and never valid.
pub type BackendId = u32;

/// Parts-per-million fraction (see [`ALLOCATION_SCALE`]).
pub type Ppm = u32;

/// Converter family a backend's value translator belongs to.
///
/// - `Identity`: shares are minted one-for-one against the stable unit.
/// - `ExternalVault`: shares of an external tokenized vault with its own exchange rate.
/// - `WrappedLending`: a wrapped lending-market position with an accruing index.
#[derive(
  Clone,
  Copy,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Encode,
  Eq,
  MaxEncodedLen,
  Ord,
  PartialEq,
  PartialOrd,
  TypeInfo,
  Serialize,
  Deserialize,
)]
pub enum ConverterKind {
  Identity,
  ExternalVault,
  WrappedLending,
}

/// Handle to a converter instance inside its family.
#[derive(
  Clone,
  Copy,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Encode,
  Eq,
  MaxEncodedLen,
  Ord,
  PartialEq,
  PartialOrd,
  TypeInfo,
  Serialize,
  Deserialize,
)]
pub struct ConverterRef {
  pub kind: ConverterKind,
  pub instance: u32,
}

impl ConverterRef {
  pub const fn new(kind: ConverterKind, instance: u32) -> Self {
    Self { kind, instance }
  }
}

/// Lifecycle state of a configured backend.
///
/// `Inactive` is set through configuration and stops automatic deposits.
/// `Suspended` is the emergency state: the backend is skipped by every automatic
/// selection but stays reachable for solver-mode batches and exchanges.
#[derive(
  Clone,
  Copy,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Default,
  Encode,
  Eq,
  MaxEncodedLen,
  PartialEq,
  TypeInfo,
  Serialize,
  Deserialize,
)]
pub enum BackendStatus {
  #[default]
  Active,
  Inactive,
  Suspended,
}

impl BackendStatus {
  pub fn accepts_automatic_deposits(&self) -> bool {
    matches!(self, BackendStatus::Active)
  }

  pub fn accepts_automatic_withdrawals(&self) -> bool {
    !matches!(self, BackendStatus::Suspended)
  }

  pub fn accepts_directed_deposits(&self) -> bool {
    !matches!(self, BackendStatus::Inactive)
  }
}

/// Administrative description of one backend.
#[derive(
  Clone,
  Copy,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Encode,
  Eq,
  MaxEncodedLen,
  PartialEq,
  TypeInfo,
  Serialize,
  Deserialize,
)]
pub struct BackendConfig {
  pub id: BackendId,
  pub target_weight: Ppm,
  pub status: BackendStatus,
}

impl BackendConfig {
  pub const fn new(id: BackendId, target_weight: Ppm, status: BackendStatus) -> Self {
    Self {
      id,
      target_weight,
      status,
    }
  }

  pub const fn active(id: BackendId, target_weight: Ppm) -> Self {
    Self::new(id, target_weight, BackendStatus::Active)
  }

  pub fn has_valid_id(&self) -> bool {
    self.id != 0
  }

  pub fn has_valid_weight(&self) -> bool {
    self.target_weight <= ALLOCATION_SCALE
  }
}
