//! Allocation math
//!
//! Pure fixed-point helpers turning raw per-backend balances into allocation
//! fractions and splitting an amount across weights. All fractions are expressed
//! in parts per million ([`ALLOCATION_SCALE`]).
//!
//! Rounding is always down; `split_proportionally` hands the rounding leftover out
//! one unit at a time in ascending index order, which gives lower-indexed backends a
//! bounded (strictly less than one unit each) deterministic bias.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};
#[cfg(feature = "std")]
use std::{vec, vec::Vec};

use sp_arithmetic::{helpers_128bit::multiply_by_rational_with_rounding, per_things::Rounding};

use crate::{Ppm, ecosystem::Balance, params::ALLOCATION_SCALE};

/// Failure of a proportional split.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AllocationError {
  /// A nonzero amount cannot be split across weights summing to zero.
  ZeroWeightSum,
}

/// `floor(value * numerator / denominator)` without intermediate overflow.
fn mul_div_floor(value: Balance, numerator: Balance, denominator: Balance) -> Option<Balance> {
  multiply_by_rational_with_rounding(value, numerator, denominator, Rounding::Down)
}

/// Current allocation fraction of every balance and the total they sum to.
///
/// `fraction_i = floor(balance_i * SCALE / total)`; every fraction is zero when the
/// total is zero.
pub fn current_allocations(balances: &[Balance]) -> (Vec<Ppm>, Balance) {
  let total = balances
    .iter()
    .fold(0u128, |acc, balance| acc.saturating_add(*balance));
  if total == 0 {
    return (vec![0; balances.len()], 0);
  }
  let fractions = balances
    .iter()
    .map(|balance| {
      mul_div_floor(*balance, ALLOCATION_SCALE as Balance, total)
        .map(|fraction| fraction.min(ALLOCATION_SCALE as Balance) as Ppm)
        .unwrap_or(ALLOCATION_SCALE)
    })
    .collect();
  (fractions, total)
}

/// Sum of a weight vector, widened so that it cannot overflow.
pub fn weight_sum(weights: &[Ppm]) -> u64 {
  weights.iter().map(|weight| u64::from(*weight)).sum()
}

/// Whether the weights describe a complete configuration (exactly 100%).
pub fn is_full_allocation(weights: &[Ppm]) -> bool {
  weight_sum(weights) == u64::from(ALLOCATION_SCALE)
}

/// Split `amount` across `weights`.
///
/// `amount_i = floor(amount * weight_i / sum(weights))`; the leftover
/// `amount - sum(amount_i)` goes out one unit at a time in ascending index order,
/// zero-weight entries included. The leftover is smaller than the number of
/// nonzero weights, so a single pass hands all of it out.
pub fn split_proportionally(
  amount: Balance,
  weights: &[Ppm],
) -> Result<Vec<Balance>, AllocationError> {
  if amount == 0 {
    return Ok(vec![0; weights.len()]);
  }
  let total_weight = weight_sum(weights) as Balance;
  if total_weight == 0 {
    return Err(AllocationError::ZeroWeightSum);
  }
  let mut amounts: Vec<Balance> = weights
    .iter()
    .map(|weight| mul_div_floor(amount, *weight as Balance, total_weight).unwrap_or(0))
    .collect();
  let distributed = amounts
    .iter()
    .fold(0u128, |acc, part| acc.saturating_add(*part));
  let mut leftover = amount.saturating_sub(distributed);
  for part in amounts.iter_mut() {
    if leftover == 0 {
      break;
    }
    *part = part.saturating_add(1);
    leftover -= 1;
  }
  Ok(amounts)
}
