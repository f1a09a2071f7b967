// Copyright (c) 2018-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use arrayvec::ArrayVec;

use crate::context::{BlockContext, BlockContextCheckpoint, ContextModelTable};
use crate::frame::Frame;

pub use self::block::*;
pub use self::cb::*;
pub use self::frame::*;
pub use self::sequence::*;

mod block;
mod cb;
mod frame;
mod sequence;

/// Mutable state of the picture being searched.
#[derive(Debug, Clone)]
pub struct EncoderContext {
  pub seq: SequenceParameters,
  /// Reconstructed samples, the prediction reference of later blocks.
  pub rec: Frame,
  /// Coding-tree depth and luma mode of every 4x4 unit.
  pub bc: BlockContext,
}

/// State to restore after a trial encode of the block at (`x0`, `y0`).
#[derive(Debug, Clone)]
pub struct SearchCheckpoint {
  x0: usize,
  y0: usize,
  log2_size: usize,
  models: ContextModelTable,
  rec: ArrayVec<Vec<u8>, 3>,
  bc: BlockContextCheckpoint,
}

impl EncoderContext {
  pub fn new(seq: SequenceParameters) -> Self {
    EncoderContext {
      rec: Frame::new(seq.width, seq.height, seq.chroma_sampling),
      bc: BlockContext::new(seq.width, seq.height),
      seq,
    }
  }

  /// Whether the sample at (`nb_x`, `nb_y`) of `plane` is reconstructed
  /// before the block whose top-left sample is (`cur_x`, `cur_y`).
  pub fn is_available(
    &self, plane: usize, cur_x: usize, cur_y: usize, nb_x: isize, nb_y: isize,
  ) -> bool {
    if nb_x < 0 || nb_y < 0 {
      return false;
    }
    let cfg = &self.rec.planes[plane].cfg;
    let (nb_x, nb_y) =
      ((nb_x as usize) << cfg.xdec, (nb_y as usize) << cfg.ydec);
    if nb_x >= self.seq.width || nb_y >= self.seq.height {
      return false;
    }
    self.seq.z_order(nb_x, nb_y)
      < self.seq.z_order(cur_x << cfg.xdec, cur_y << cfg.ydec)
  }

  pub fn checkpoint(
    &self, models: &ContextModelTable, x0: usize, y0: usize, log2_size: usize,
  ) -> SearchCheckpoint {
    let size = 1 << log2_size;
    let rec = self
      .rec
      .planes
      .iter()
      .map(|p| {
        let (xdec, ydec) = (p.cfg.xdec, p.cfg.ydec);
        p.save_rect(x0 >> xdec, y0 >> ydec, size >> xdec, size >> ydec)
      })
      .collect();
    SearchCheckpoint {
      x0,
      y0,
      log2_size,
      models: models.checkpoint(),
      rec,
      bc: self.bc.checkpoint(x0, y0, log2_size),
    }
  }

  pub fn rollback(
    &mut self, models: &mut ContextModelTable, checkpoint: &SearchCheckpoint,
  ) {
    let size = 1 << checkpoint.log2_size;
    let (x0, y0) = (checkpoint.x0, checkpoint.y0);
    for (p, saved) in self.rec.planes.iter_mut().zip(&checkpoint.rec) {
      let (xdec, ydec) = (p.cfg.xdec, p.cfg.ydec);
      let (x, y) = (x0 >> xdec, y0 >> ydec);
      p.restore_rect(x, y, size >> xdec, size >> ydec, saved);
    }
    self.bc.rollback(&checkpoint.bc);
    models.restore(&checkpoint.models);
  }
}
