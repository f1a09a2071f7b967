// Copyright (c) 2018-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use crate::api::EncoderConfig;
use crate::dist::DistortionMetric;
use crate::frame::ChromaSampling;
use crate::transform::MIN_TX_LOG2_SIZE;

/// Coding-tree geometry and search settings shared by every picture of a
/// sequence.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SequenceParameters {
  pub width: usize,
  pub height: usize,
  pub chroma_sampling: ChromaSampling,
  pub log2_ctb_size: usize,
  pub log2_min_cb_size: usize,
  /// Deepest coding-tree level a block may reach, never past the minimum
  /// coding-block size.
  pub max_depth: usize,
  /// Distortion used by the intra mode search.
  pub mode_decision_metric: DistortionMetric,
  /// Distortion used in rate-distortion costs.
  pub rd_metric: DistortionMetric,
}

impl SequenceParameters {
  pub fn new(config: &EncoderConfig) -> Self {
    SequenceParameters {
      width: config.width,
      height: config.height,
      chroma_sampling: config.chroma_sampling,
      log2_ctb_size: config.log2_ctb_size,
      log2_min_cb_size: config.log2_min_cb_size,
      max_depth: config.effective_max_depth(),
      mode_decision_metric: config.mode_decision_metric,
      rd_metric: config.rd_metric,
    }
  }

  #[inline]
  pub const fn ctb_size(&self) -> usize {
    1 << self.log2_ctb_size
  }

  pub const fn pic_width_in_ctbs(&self) -> usize {
    (self.width + self.ctb_size() - 1) >> self.log2_ctb_size
  }

  pub const fn pic_height_in_ctbs(&self) -> usize {
    (self.height + self.ctb_size() - 1) >> self.log2_ctb_size
  }

  /// Whether a block at this size and depth may be split further.
  #[inline]
  pub const fn can_split(&self, log2_cb_size: usize, depth: usize) -> bool {
    log2_cb_size > self.log2_min_cb_size && depth < self.max_depth
  }

  #[inline]
  pub const fn is_inside_picture(
    &self, x0: usize, y0: usize, log2_cb_size: usize,
  ) -> bool {
    x0 + (1 << log2_cb_size) <= self.width
      && y0 + (1 << log2_cb_size) <= self.height
  }

  #[inline]
  pub const fn is_outside_picture(&self, x0: usize, y0: usize) -> bool {
    x0 >= self.width || y0 >= self.height
  }

  /// `split_cu_flag` is only present for blocks fully inside the picture
  /// that are allowed to split.
  #[inline]
  pub const fn split_flag_signaled(
    &self, x0: usize, y0: usize, log2_cb_size: usize, depth: usize,
  ) -> bool {
    self.is_inside_picture(x0, y0, log2_cb_size)
      && self.can_split(log2_cb_size, depth)
  }

  /// NxN partitioning is only allowed for the deepest blocks whose
  /// quadrants are at least 4x4.
  #[inline]
  pub const fn is_nxn_legal(&self, log2_cb_size: usize, depth: usize) -> bool {
    depth == self.max_depth && log2_cb_size > MIN_TX_LOG2_SIZE
  }

  /// Coding order of the 4x4 luma unit containing (`x`, `y`): coding-tree
  /// blocks in raster order, Z-order inside each of them.
  pub fn z_order(&self, x: usize, y: usize) -> usize {
    let log2_ctb = self.log2_ctb_size;
    let ctb_addr =
      (y >> log2_ctb) * self.pic_width_in_ctbs() + (x >> log2_ctb);
    let mask = self.ctb_size() - 1;
    let (ux, uy) = ((x & mask) >> 2, (y & mask) >> 2);
    let mut morton = 0;
    for bit in 0..log2_ctb - 2 {
      morton |= ((ux >> bit) & 1) << (2 * bit);
      morton |= ((uy >> bit) & 1) << (2 * bit + 1);
    }
    (ctb_addr << (2 * (log2_ctb - 2))) | morton
  }
}
