// Copyright (c) 2017-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

pub const MAX_QP: u8 = 51;

/// Rounding offset of the dead-zone quantizer for intra blocks.
const INTRA_ROUNDING: f64 = 1.0 / 3.0;

static CHROMA_QP_TABLE: [u8; 14] =
  [29, 30, 31, 32, 33, 33, 34, 34, 35, 35, 36, 36, 37, 37];

/// Quantizer step size for `qp`, relative to an orthonormal transform.
pub fn qstep(qp: u8) -> f64 {
  2f64.powf((qp as f64 - 4.0) / 6.0)
}

/// Chroma QP of a 4:2:0 picture for luma QP `qp`.
pub fn chroma_qp(qp: u8) -> u8 {
  match qp {
    0..=29 => qp,
    30..=43 => CHROMA_QP_TABLE[(qp - 30) as usize],
    _ => qp - 6,
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantizationContext {
  step: f64,
  rounding: f64,
}

impl QuantizationContext {
  pub fn new(qp: u8) -> Self {
    assert!(qp <= MAX_QP);
    QuantizationContext { step: qstep(qp), rounding: INTRA_ROUNDING }
  }

  /// Quantizes `coeffs` into `levels` and returns the number of non-zero
  /// levels.
  pub fn quantize(&self, coeffs: &[f64], levels: &mut [i32]) -> usize {
    let mut nonzero = 0;
    for (level, &c) in levels.iter_mut().zip(coeffs) {
      let magnitude = (c.abs() / self.step + self.rounding).floor();
      let magnitude = magnitude.min(i16::MAX as f64) as i32;
      *level = if c < 0.0 { -magnitude } else { magnitude };
      nonzero += (magnitude != 0) as usize;
    }
    nonzero
  }

  pub fn dequantize(&self, levels: &[i32], coeffs: &mut [f64]) {
    for (c, &level) in coeffs.iter_mut().zip(levels) {
      *c = level as f64 * self.step;
    }
  }
}
