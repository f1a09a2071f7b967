// Copyright (c) 2020, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use itertools::*;

use crate::dist::DistortionMetric;
use crate::encoder::PartMode;
use crate::frame::ChromaSampling;
use crate::serialize::{Deserialize, Serialize};

use std::fmt;

/// Strategy deciding the intra partitioning of leaf coding blocks.
#[derive(
  Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize,
)]
pub enum IntraPartModeAlgo {
  /// Evaluate 2Nx2N and NxN and keep the cheaper one.
  #[default]
  BruteForce,
  /// Always use [`EncoderConfig::fixed_part_mode`].
  Fixed,
}

impl fmt::Display for IntraPartModeAlgo {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    f.write_str(match self {
      IntraPartModeAlgo::BruteForce => "brute-force",
      IntraPartModeAlgo::Fixed => "fixed",
    })
  }
}

/// Encoder settings which impact the coded pictures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderConfig {
  // output size
  /// Width of the frames in pixels.
  pub width: usize,
  /// Height of the frames in pixels.
  pub height: usize,
  /// Chroma subsampling.
  pub chroma_sampling: ChromaSampling,

  /// The quantizer of every coding-tree block, 0..=51.
  pub qp: u8,
  /// Difference between the slice QP and the picture QP.
  pub slice_qp_delta: i8,

  // coding tree
  /// log2 of the coding-tree block size, 4..=6.
  pub log2_ctb_size: usize,
  /// log2 of the smallest coding block size, 3..=`log2_ctb_size`.
  pub log2_min_cb_size: usize,
  /// Deepest coding-tree level searched.
  pub max_depth: usize,

  // search
  /// How leaves are partitioned.
  pub intra_part_mode_algo: IntraPartModeAlgo,
  /// Partitioning used by [`IntraPartModeAlgo::Fixed`].
  pub fixed_part_mode: PartMode,
  /// Distortion of the intra mode search.
  pub mode_decision_metric: DistortionMetric,
  /// Distortion of the rate-distortion costs.
  pub rd_metric: DistortionMetric,
}

impl Default for EncoderConfig {
  fn default() -> Self {
    EncoderConfig {
      width: 640,
      height: 480,
      chroma_sampling: ChromaSampling::Cs420,
      qp: 27,
      slice_qp_delta: 0,
      log2_ctb_size: 6,
      log2_min_cb_size: 3,
      max_depth: 3,
      intra_part_mode_algo: IntraPartModeAlgo::BruteForce,
      fixed_part_mode: PartMode::Part2Nx2N,
      mode_decision_metric: DistortionMetric::Sad,
      rd_metric: DistortionMetric::Sse,
    }
  }
}

impl EncoderConfig {
  /// Deepest level the coding tree can reach: the configured depth, capped
  /// by the minimum coding block size.
  pub fn effective_max_depth(&self) -> usize {
    self
      .max_depth
      .min(self.log2_ctb_size.saturating_sub(self.log2_min_cb_size))
  }

  /// Side of the smallest block the coding tree can produce.
  pub fn min_leaf_size(&self) -> usize {
    1 << (self.log2_ctb_size - self.effective_max_depth())
  }
}

impl fmt::Display for EncoderConfig {
  fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
    let pairs = [
      ("qp", self.qp.to_string()),
      ("slice_qp_delta", self.slice_qp_delta.to_string()),
      ("ctb_size", (1usize << self.log2_ctb_size).to_string()),
      ("min_cb_size", (1usize << self.log2_min_cb_size).to_string()),
      ("max_depth", self.effective_max_depth().to_string()),
      ("part_mode", self.intra_part_mode_algo.to_string()),
      ("fixed_part_mode", self.fixed_part_mode.to_string()),
      ("mode_metric", format!("{:?}", self.mode_decision_metric)),
      ("rd_metric", format!("{:?}", self.rd_metric)),
    ];
    write!(
      f,
      "{}",
      pairs.iter().map(|pair| format!("{}={}", pair.0, pair.1)).join(" ")
    )
  }
}
