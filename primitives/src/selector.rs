//! Deterministic backend selection
//!
//! Ranks backends by how far their current allocation sits from target. Results
//! depend only on the inputs: entries are ordered by descending delta and equal
//! deltas keep ascending original index, so anyone holding the same public state
//! computes the same ranking.
//!
//! Slices of different lengths are truncated to the shortest one.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;
#[cfg(feature = "std")]
use std::vec::Vec;

use crate::Ppm;

/// `max(target_i - current_i, 0)` for every backend.
pub fn underallocation(current: &[Ppm], target: &[Ppm]) -> Vec<Ppm> {
  current
    .iter()
    .zip(target.iter())
    .map(|(current, target)| target.saturating_sub(*current))
    .collect()
}

/// `max(current_i - target_i, 0)` for every backend.
pub fn overallocation(current: &[Ppm], target: &[Ppm]) -> Vec<Ppm> {
  current
    .iter()
    .zip(target.iter())
    .map(|(current, target)| current.saturating_sub(*target))
    .collect()
}

/// Up to `count` backends ordered by descending underallocation.
pub fn select_top_underallocated<B: Copy>(
  backends: &[B],
  current: &[Ppm],
  target: &[Ppm],
  count: usize,
) -> Vec<B> {
  select_top(backends, &underallocation(current, target), count)
}

/// Up to `count` backends ordered by descending overallocation.
pub fn select_top_overallocated<B: Copy>(
  backends: &[B],
  current: &[Ppm],
  target: &[Ppm],
  count: usize,
) -> Vec<B> {
  select_top(backends, &overallocation(current, target), count)
}

fn select_top<B: Copy>(backends: &[B], deltas: &[Ppm], count: usize) -> Vec<B> {
  let mut ranked: Vec<(usize, Ppm)> = deltas
    .iter()
    .take(backends.len())
    .copied()
    .enumerate()
    .collect();
  ranked.sort_by(|(index_a, delta_a), (index_b, delta_b)| {
    delta_b.cmp(delta_a).then(index_a.cmp(index_b))
  });
  ranked
    .into_iter()
    .take(count)
    .map(|(index, _)| backends[index])
    .collect()
}
