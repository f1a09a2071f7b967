// Copyright (c) 2017-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use arrayvec::ArrayVec;

use super::*;

use crate::ec::Writer;
use crate::encoder::{CbKind, CodingBlock, IntraLeaf, PartMode};
use crate::predict::IntraPredMode;
use crate::predict::IntraPredMode::*;

use std::ops::Range;

/// log2 of the luma samples covered by one block-context unit.
pub const BLOCK_UNIT_LOG2: usize = 2;

/// Coding information of one 4x4 luma unit.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Block {
  pub ct_depth: u8,
  pub luma_mode: IntraPredMode,
}

/// Per-unit coding information of a picture, read by context selection and
/// most probable mode derivation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockContext {
  blocks: Vec<Block>,
  cols: usize,
  rows: usize,
}

#[derive(Clone, Debug)]
pub struct BlockContextCheckpoint {
  cols: Range<usize>,
  rows: Range<usize>,
  blocks: Vec<Block>,
}

impl BlockContext {
  pub fn new(width: usize, height: usize) -> Self {
    let cols = (width + (1 << BLOCK_UNIT_LOG2) - 1) >> BLOCK_UNIT_LOG2;
    let rows = (height + (1 << BLOCK_UNIT_LOG2) - 1) >> BLOCK_UNIT_LOG2;
    BlockContext { blocks: vec![Block::default(); cols * rows], cols, rows }
  }

  /// The unit containing luma sample (`x`, `y`).
  #[inline]
  pub fn at(&self, x: usize, y: usize) -> &Block {
    &self.blocks[(y >> BLOCK_UNIT_LOG2) * self.cols + (x >> BLOCK_UNIT_LOG2)]
  }

  fn unit_ranges(
    &self, x0: usize, y0: usize, log2_size: usize,
  ) -> (Range<usize>, Range<usize>) {
    let units = 1 << (log2_size - BLOCK_UNIT_LOG2);
    let (ux, uy) = (x0 >> BLOCK_UNIT_LOG2, y0 >> BLOCK_UNIT_LOG2);
    (
      ux.min(self.cols)..(ux + units).min(self.cols),
      uy.min(self.rows)..(uy + units).min(self.rows),
    )
  }

  fn for_each_in(
    &mut self, x0: usize, y0: usize, log2_size: usize,
    mut f: impl FnMut(&mut Block),
  ) {
    let (cols, rows) = self.unit_ranges(x0, y0, log2_size);
    for row in rows {
      let start = row * self.cols;
      let units = &mut self.blocks[start + cols.start..start + cols.end];
      units.iter_mut().for_each(&mut f);
    }
  }

  pub fn set_depth(
    &mut self, x0: usize, y0: usize, log2_size: usize, depth: usize,
  ) {
    self.for_each_in(x0, y0, log2_size, |b| b.ct_depth = depth as u8);
  }

  pub fn set_luma_mode(
    &mut self, x0: usize, y0: usize, log2_size: usize, mode: IntraPredMode,
  ) {
    self.for_each_in(x0, y0, log2_size, |b| b.luma_mode = mode);
  }

  pub fn checkpoint(
    &self, x0: usize, y0: usize, log2_size: usize,
  ) -> BlockContextCheckpoint {
    let (cols, rows) = self.unit_ranges(x0, y0, log2_size);
    let blocks = rows
      .clone()
      .flat_map(|row| {
        let start = row * self.cols;
        self.blocks[start + cols.start..start + cols.end].iter().copied()
      })
      .collect();
    BlockContextCheckpoint { cols, rows, blocks }
  }

  pub fn rollback(&mut self, checkpoint: &BlockContextCheckpoint) {
    let width = checkpoint.cols.len();
    if width == 0 {
      return;
    }
    for (row, saved) in
      checkpoint.rows.clone().zip(checkpoint.blocks.chunks_exact(width))
    {
      let start = row * self.cols + checkpoint.cols.start;
      self.blocks[start..start + width].copy_from_slice(saved);
    }
  }

  /// Context increment of `split_cu_flag` for a block at `depth`: one for
  /// each of the left and above neighbors that was split deeper.
  pub fn split_cu_flag_context(
    &self, x0: usize, y0: usize, depth: usize,
  ) -> usize {
    let deeper = |b: &Block| b.ct_depth as usize > depth;
    let left = x0 > 0 && deeper(self.at(x0 - 1, y0));
    let above = y0 > 0 && deeper(self.at(x0, y0 - 1));
    left as usize + above as usize
  }

  /// The three most probable luma modes of the prediction unit at
  /// (`x`, `y`). An above neighbor in the previous row of coding-tree blocks
  /// counts as DC.
  pub fn mpm_candidates(
    &self, x: usize, y: usize, log2_ctb_size: usize,
  ) -> [IntraPredMode; 3] {
    let left = if x > 0 { self.at(x - 1, y).luma_mode } else { Dc };
    let above = if y > 0 && (y - 1) >> log2_ctb_size == y >> log2_ctb_size {
      self.at(x, y - 1).luma_mode
    } else {
      Dc
    };

    if left == above {
      if left.is_angular() {
        let a = left.index();
        [left, angular(2 + ((a + 29) % 32)), angular(2 + ((a - 2 + 1) % 32))]
      } else {
        [Planar, Dc, IntraPredMode::VERTICAL]
      }
    } else {
      let third = if left != Planar && above != Planar {
        Planar
      } else if left != Dc && above != Dc {
        Dc
      } else {
        IntraPredMode::VERTICAL
      };
      [left, above, third]
    }
  }
}

fn angular(index: usize) -> IntraPredMode {
  IntraPredMode::from_index(index)
    .unwrap_or_else(|| unreachable!("intra mode index {}", index))
}

/// `rem_intra_luma_pred_mode` of a mode that is not one of `candidates`.
pub fn rem_intra_luma_pred_mode(
  mode: IntraPredMode, mut candidates: [IntraPredMode; 3],
) -> u32 {
  debug_assert!(!candidates.contains(&mode));
  candidates.sort_unstable();
  let mut rem = mode.index();
  for c in candidates.iter().rev() {
    if rem > c.index() {
      rem -= 1;
    }
  }
  rem as u32
}

/// Explicitly signaled chroma modes, in the order of their index, for a
/// block whose first luma mode is `luma`.
pub fn chroma_mode_candidates(luma: IntraPredMode) -> [IntraPredMode; 4] {
  [Planar, IntraPredMode::VERTICAL, IntraPredMode::HORIZONTAL, Dc]
    .map(|m| if m == luma { Angular34 } else { m })
}

enum LumaModeCoding {
  Mpm(usize),
  Rem(u32),
}

impl<'a> ContextWriter<'a> {
  pub fn write_split_cu_flag(
    &mut self, w: &mut impl Writer, x0: usize, y0: usize, depth: usize,
    split: bool,
  ) {
    let ctx = self.bc.split_cu_flag_context(x0, y0, depth);
    w.bin(split, &mut self.fc.split_cu_flag[ctx]);
  }

  /// Writes a coding quad-tree in coding order: split flags where they are
  /// signaled, then every leaf.
  pub fn write_coding_quadtree(
    &mut self, w: &mut impl Writer, cb: &CodingBlock,
  ) {
    let signaled =
      self.seq.split_flag_signaled(cb.x, cb.y, cb.log2_size, cb.depth);
    match &cb.kind {
      CbKind::Outside => {}
      CbKind::Split(children) => {
        if signaled {
          self.write_split_cu_flag(w, cb.x, cb.y, cb.depth, true);
        }
        for child in children.iter() {
          self.write_coding_quadtree(w, child);
        }
      }
      CbKind::Leaf(leaf) => {
        if signaled {
          self.write_split_cu_flag(w, cb.x, cb.y, cb.depth, false);
        }
        self.write_coding_unit(w, cb.x, cb.y, cb.log2_size, cb.depth, leaf);
      }
    }
  }

  /// Writes the syntax of a leaf coding block, split flag excluded.
  pub fn write_coding_unit(
    &mut self, w: &mut impl Writer, x0: usize, y0: usize, log2_cb_size: usize,
    depth: usize, leaf: &IntraLeaf,
  ) {
    self.bc.set_depth(x0, y0, log2_cb_size, depth);
    if self.seq.is_nxn_legal(log2_cb_size, depth) {
      w.bin(leaf.part_mode == PartMode::Part2Nx2N, &mut self.fc.part_mode[0]);
    } else {
      debug_assert_eq!(leaf.part_mode, PartMode::Part2Nx2N);
    }
    self.write_intra_luma_modes(w, x0, y0, log2_cb_size, leaf);
    if let Some(chroma_mode) = leaf.chroma_mode {
      self.write_intra_chroma_pred_mode(w, chroma_mode, leaf.luma_modes[0]);
    }
    self.write_transform_tree(w, log2_cb_size, leaf);
  }

  fn write_intra_luma_modes(
    &mut self, w: &mut impl Writer, x0: usize, y0: usize, log2_cb_size: usize,
    leaf: &IntraLeaf,
  ) {
    let log2_pu_size = match leaf.part_mode {
      PartMode::Part2Nx2N => log2_cb_size,
      PartMode::PartNxN => log2_cb_size - 1,
    };
    debug_assert_eq!(leaf.luma_modes.len(), leaf.part_mode.num_pus());

    let mut coded = ArrayVec::<LumaModeCoding, 4>::new();
    for (i, &mode) in leaf.luma_modes.iter().enumerate() {
      let x = x0 + ((i & 1) << log2_pu_size);
      let y = y0 + ((i >> 1) << log2_pu_size);
      let candidates = self.bc.mpm_candidates(x, y, self.seq.log2_ctb_size);
      coded.push(match candidates.iter().position(|&c| c == mode) {
        Some(idx) => LumaModeCoding::Mpm(idx),
        None => {
          LumaModeCoding::Rem(rem_intra_luma_pred_mode(mode, candidates))
        }
      });
      self.bc.set_luma_mode(x, y, log2_pu_size, mode);
    }

    for c in &coded {
      let is_mpm = matches!(c, LumaModeCoding::Mpm(_));
      w.bin(is_mpm, &mut self.fc.prev_intra_luma_pred_flag[0]);
    }
    for c in &coded {
      match *c {
        LumaModeCoding::Mpm(idx) => {
          // truncated unary, at most 2
          w.bypass(idx > 0);
          if idx > 0 {
            w.bypass(idx > 1);
          }
        }
        LumaModeCoding::Rem(rem) => w.bypass_bits(rem, 5),
      }
    }
  }

  pub fn write_intra_chroma_pred_mode(
    &mut self, w: &mut impl Writer, chroma_mode: IntraPredMode,
    luma_mode: IntraPredMode,
  ) {
    if chroma_mode == luma_mode {
      w.bin(false, &mut self.fc.intra_chroma_pred_mode[0]);
      return;
    }
    let idx = chroma_mode_candidates(luma_mode)
      .iter()
      .position(|&m| m == chroma_mode)
      .unwrap_or_else(|| {
        unreachable!("chroma mode {:?} not signalable", chroma_mode)
      });
    w.bin(true, &mut self.fc.intra_chroma_pred_mode[0]);
    w.bypass_bits(idx as u32, 2);
  }
}

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn mpm_of_unavailable_neighbors() {
    let bc = BlockContext::new(64, 64);
    assert_eq!(bc.mpm_candidates(0, 0, 6), [Planar, Dc, Angular26]);
  }

  #[test]
  fn mpm_of_equal_angular_neighbors() {
    let mut bc = BlockContext::new(64, 64);
    bc.set_luma_mode(0, 16, 4, Angular10);
    bc.set_luma_mode(16, 0, 4, Angular10);
    assert_eq!(bc.mpm_candidates(16, 16, 6), [Angular10, Angular9, Angular11]);

    bc.set_luma_mode(0, 0, 5, Angular2);
    assert_eq!(bc.mpm_candidates(8, 8, 6), [Angular2, Angular33, Angular3]);
  }

  #[test]
  fn mpm_of_distinct_neighbors() {
    let mut bc = BlockContext::new(64, 64);
    bc.set_luma_mode(0, 8, 3, Planar);
    bc.set_luma_mode(8, 0, 3, Dc);
    assert_eq!(bc.mpm_candidates(8, 8, 6), [Planar, Dc, Angular26]);

    bc.set_luma_mode(8, 0, 3, Angular18);
    assert_eq!(bc.mpm_candidates(8, 8, 6), [Planar, Angular18, Dc]);
  }

  #[test]
  fn above_neighbor_across_ctb_row_is_dc() {
    let mut bc = BlockContext::new(64, 64);
    bc.set_luma_mode(0, 32, 2, Angular30);
    bc.set_luma_mode(4, 28, 2, Angular30);
    assert_eq!(bc.mpm_candidates(4, 32, 5), [Angular30, Dc, Planar]);
    assert_eq!(bc.mpm_candidates(4, 32, 6), [Angular30, Angular29, Angular31]);
  }

  #[test]
  fn rem_mode_skips_candidates() {
    let candidates = [Angular26, Planar, Dc];
    assert_eq!(rem_intra_luma_pred_mode(Angular2, candidates), 0);
    assert_eq!(rem_intra_luma_pred_mode(Angular25, candidates), 23);
    assert_eq!(rem_intra_luma_pred_mode(Angular34, candidates), 31);
  }

  #[test]
  fn chroma_candidates_avoid_duplicates() {
    assert_eq!(
      chroma_mode_candidates(Angular26),
      [Planar, Angular34, Angular10, Dc]
    );
    assert_eq!(
      chroma_mode_candidates(Angular7),
      [Planar, Angular26, Angular10, Dc]
    );
  }

  #[test]
  fn split_context_counts_deeper_neighbors() {
    let mut bc = BlockContext::new(64, 64);
    bc.set_depth(0, 0, 6, 1);
    bc.set_depth(0, 16, 4, 2);
    assert_eq!(bc.split_cu_flag_context(0, 0, 0), 0);
    assert_eq!(bc.split_cu_flag_context(16, 16, 1), 1);
    assert_eq!(bc.split_cu_flag_context(16, 16, 0), 2);
  }

  #[test]
  fn checkpoint_is_clipped_to_picture() {
    let mut bc = BlockContext::new(40, 40);
    let checkpoint = bc.checkpoint(32, 32, 5);
    let before = bc.clone();
    bc.set_depth(32, 32, 5, 3);
    assert_ne!(bc, before);
    bc.rollback(&checkpoint);
    assert_eq!(bc, before);
  }
}
