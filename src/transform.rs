// Copyright (c) 2017-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

//! Orthonormal 2-D DCT-II used for the residual of every transform block.

use std::f64::consts::PI;

pub const MIN_TX_LOG2_SIZE: usize = 2;
pub const MAX_TX_LOG2_SIZE: usize = 5;

/// Row `k` holds the `k`-th basis function sampled at `0..n`.
fn dct_basis(n: usize) -> Vec<f64> {
  let mut basis = Vec::with_capacity(n * n);
  for k in 0..n {
    let scale =
      if k == 0 { (1.0 / n as f64).sqrt() } else { (2.0 / n as f64).sqrt() };
    for i in 0..n {
      let angle = PI * ((2 * i + 1) * k) as f64 / (2 * n) as f64;
      basis.push(scale * angle.cos());
    }
  }
  basis
}

/// `output = B * input * B^T` for the row-major `n`x`n` `input`.
pub fn forward_transform(input: &[i32], output: &mut [f64], log2_size: usize) {
  debug_assert!((MIN_TX_LOG2_SIZE..=MAX_TX_LOG2_SIZE).contains(&log2_size));
  let n = 1 << log2_size;
  let basis = dct_basis(n);
  let mut tmp = vec![0f64; n * n];

  // columns
  for k in 0..n {
    for x in 0..n {
      tmp[k * n + x] =
        (0..n).map(|y| basis[k * n + y] * input[y * n + x] as f64).sum();
    }
  }
  // rows
  for k in 0..n {
    for l in 0..n {
      output[k * n + l] =
        (0..n).map(|x| tmp[k * n + x] * basis[l * n + x]).sum();
    }
  }
}

/// `output = round(B^T * input * B)`.
pub fn inverse_transform(input: &[f64], output: &mut [i32], log2_size: usize) {
  debug_assert!((MIN_TX_LOG2_SIZE..=MAX_TX_LOG2_SIZE).contains(&log2_size));
  let n = 1 << log2_size;
  let basis = dct_basis(n);
  let mut tmp = vec![0f64; n * n];

  for y in 0..n {
    for l in 0..n {
      tmp[y * n + l] =
        (0..n).map(|k| basis[k * n + y] * input[k * n + l]).sum();
    }
  }
  for y in 0..n {
    for x in 0..n {
      let v: f64 = (0..n).map(|l| tmp[y * n + l] * basis[l * n + x]).sum();
      output[y * n + x] = v.round() as i32;
    }
  }
}
