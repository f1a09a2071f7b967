// Copyright (c) 2018-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

//! The decision stages of the coding-tree search.
//!
//! Each stage is a trait with one struct per strategy. A stage that hands
//! work to a deeper one receives the deeper stages through [`Stages`], so
//! the same strategy objects can be wired in different combinations.

use std::fmt;

use crate::context::ContextModelTable;
use crate::encoder::{CodingBlock, EncoderContext};
use crate::frame::Frame;

mod algorithm;
mod intra_part_mode;
mod qscale;
mod split;

pub use self::algorithm::*;
pub use self::intra_part_mode::*;
pub use self::qscale::*;
pub use self::split::*;

/// Chooses the QP of a coding-tree block and searches it.
pub trait CtbQScale: fmt::Debug + Send + Sync {
  /// Searches the coding-tree block at (`ctb_x`, `ctb_y`) in luma samples.
  fn analyze(
    &self, ectx: &mut EncoderContext, models: &mut ContextModelTable,
    input: &Frame, ctb_x: usize, ctb_y: usize, log2_ctb_size: usize,
    depth: usize, stages: Stages<'_>,
  ) -> CodingBlock;
}

/// Decides whether a coding block is split into four quadrants.
pub trait CbSplit: fmt::Debug + Send + Sync {
  /// Returns the chosen subtree rooted at (`x0`, `y0`). On return `ectx`
  /// and `models` hold the state after coding exactly that subtree.
  fn analyze(
    &self, ectx: &mut EncoderContext, models: &mut ContextModelTable,
    input: &Frame, x0: usize, y0: usize, log2_cb_size: usize, depth: usize,
    qp: u8, stages: Stages<'_>,
  ) -> CodingBlock;
}

/// Decides the intra partitioning of a leaf coding block.
pub trait CbIntraPartMode: fmt::Debug + Send + Sync {
  /// Returns the chosen leaf. On return `ectx` and `models` hold the state
  /// after coding exactly that leaf.
  fn analyze(
    &self, ectx: &mut EncoderContext, models: &mut ContextModelTable,
    input: &Frame, x0: usize, y0: usize, log2_cb_size: usize, depth: usize,
    qp: u8,
  ) -> CodingBlock;
}

/// The stages a coding-tree block search delegates to.
#[derive(Copy, Clone, Debug)]
pub struct Stages<'a> {
  pub split: &'a dyn CbSplit,
  pub intra_part_mode: &'a dyn CbIntraPartMode,
}

#[cfg(test)]
pub(crate) mod test_util {
  use crate::api::EncoderConfig;
  use crate::frame::{ChromaSampling, Frame};
  use rand::{Rng, SeedableRng};
  use rand_chacha::ChaChaRng;

  pub fn config(width: usize, height: usize) -> EncoderConfig {
    EncoderConfig { width, height, ..Default::default() }
  }

  /// Smooth gradients with a textured patch, so that both large and small
  /// blocks have a chance to win.
  pub fn test_frame(width: usize, height: usize, seed: u8) -> Frame {
    let mut ra = ChaChaRng::from_seed([seed; 32]);
    let mut frame = Frame::new(width, height, ChromaSampling::Cs420);
    for (p, plane) in frame.planes.iter_mut().enumerate() {
      let (w, h) = (plane.cfg.width, plane.cfg.height);
      for y in 0..h {
        for x in 0..w {
          let v = if x < w / 2 && y < h / 2 {
            ra.gen_range(0..=255)
          } else {
            (x * 2 + y + p * 20) as i32 % 256
          };
          plane.data[y * plane.cfg.stride + x] = v as u8;
        }
      }
    }
    frame
  }
}
