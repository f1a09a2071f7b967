// Copyright (c) 2001-2016, Alliance for Open Media. All rights reserved
// Copyright (c) 2017-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use crate::ec::CABAC_BITRES;

use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Lagrange multiplier of an intra picture coded at `qp`.
pub fn lambda(qp: u8) -> f64 {
  0.57 * 2f64.powf((qp as f64 - 12.0) / 3.0)
}

/// Distortion and rate of a candidate, kept apart so that the costs of
/// sub-blocks add up exactly.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RdCost {
  /// Distortion in squared (or absolute) sample error.
  pub distortion: u64,
  /// Rate in 1/2^CABAC_BITRES bits.
  pub rate: u64,
}

impl RdCost {
  pub const fn new(distortion: u64, rate: u64) -> Self {
    RdCost { distortion, rate }
  }

  /// `D + lambda * R`, with the rate in bits.
  #[inline]
  pub fn cost(self, lambda: f64) -> f64 {
    self.distortion as f64
      + lambda * self.rate as f64 / (1u64 << CABAC_BITRES) as f64
  }

  /// Rate rounded up to whole bits.
  pub const fn bits(self) -> u64 {
    (self.rate + (1 << CABAC_BITRES) - 1) >> CABAC_BITRES
  }
}

impl Add for RdCost {
  type Output = RdCost;
  fn add(self, rhs: RdCost) -> RdCost {
    RdCost::new(self.distortion + rhs.distortion, self.rate + rhs.rate)
  }
}

impl AddAssign for RdCost {
  fn add_assign(&mut self, rhs: RdCost) {
    *self = *self + rhs;
  }
}

impl Sum for RdCost {
  fn sum<I: Iterator<Item = RdCost>>(iter: I) -> RdCost {
    iter.fold(RdCost::default(), Add::add)
  }
}
