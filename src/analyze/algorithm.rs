// Copyright (c) 2018-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use super::*;

use crate::api::{EncoderConfig, IntraPartModeAlgo};

/// A complete coding-tree search: the QP stage and the stages it hands the
/// coding-tree blocks to.
pub trait EncodingAlgorithm: fmt::Debug + Send + Sync {
  fn ctb_qscale(&self) -> &dyn CtbQScale;
  fn stages(&self) -> Stages<'_>;
  /// QP signaled in the picture parameter set.
  fn pps_qp(&self) -> u8;
  fn slice_qp_delta(&self) -> i8 {
    0
  }
  /// QP the context models of a slice are initialized with.
  fn slice_qp(&self) -> i32 {
    self.pps_qp() as i32 + self.slice_qp_delta() as i32
  }
}

/// The configurable search: constant QP, brute-force splitting and either
/// brute-force or fixed intra partitioning.
#[derive(Clone, Debug, Default)]
pub struct EncodingAlgorithmCustom {
  qscale_constant: QScaleConstant,
  split_brute_force: CbSplitBruteForce,
  intra_part_mode_brute_force: IntraPartModeBruteForce,
  intra_part_mode_fixed: IntraPartModeFixed,
  intra_part_mode_algo: IntraPartModeAlgo,
  slice_qp_delta: i8,
}

impl EncodingAlgorithmCustom {
  pub fn new() -> Self {
    Self::default()
  }

  /// Binds the parameters of every stage. Must not be called while a
  /// picture is being searched.
  pub fn set_params(&mut self, config: &EncoderConfig) {
    self.qscale_constant.set_params(QScaleConstantParams { qp: config.qp });
    self.intra_part_mode_fixed.set_params(IntraPartModeFixedParams {
      part_mode: config.fixed_part_mode,
    });
    self.intra_part_mode_algo = config.intra_part_mode_algo;
    self.slice_qp_delta = config.slice_qp_delta;
  }

  pub const fn qscale_constant(&self) -> &QScaleConstant {
    &self.qscale_constant
  }

  pub const fn intra_part_mode_algo(&self) -> IntraPartModeAlgo {
    self.intra_part_mode_algo
  }
}

impl EncodingAlgorithm for EncodingAlgorithmCustom {
  fn ctb_qscale(&self) -> &dyn CtbQScale {
    &self.qscale_constant
  }

  fn stages(&self) -> Stages<'_> {
    let intra_part_mode: &dyn CbIntraPartMode = match self.intra_part_mode_algo
    {
      IntraPartModeAlgo::BruteForce => &self.intra_part_mode_brute_force,
      IntraPartModeAlgo::Fixed => &self.intra_part_mode_fixed,
    };
    Stages { split: &self.split_brute_force, intra_part_mode }
  }

  fn pps_qp(&self) -> u8 {
    self.qscale_constant.qp()
  }

  fn slice_qp_delta(&self) -> i8 {
    self.slice_qp_delta
  }
}
