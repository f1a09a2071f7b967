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
use crate::encoder::{IntraLeaf, TransformBlock};
use crate::transform::MIN_TX_LOG2_SIZE;

/// Prefix of a last significant coefficient position.
static GROUP_IDX: [u8; 32] = [
  0, 1, 2, 3, 4, 4, 5, 5, 6, 6, 6, 6, 7, 7, 7, 7, 8, 8, 8, 8, 8, 8, 8, 8, 9,
  9, 9, 9, 9, 9, 9, 9,
];

static MIN_IN_GROUP: [u32; 10] = [0, 1, 2, 3, 4, 6, 8, 12, 16, 24];

static CTX_IDX_MAP_4X4: [usize; 15] =
  [0, 1, 4, 5, 2, 3, 4, 5, 6, 6, 8, 8, 7, 7, 8];

/// Levels covered by greater-1 flags in each 4x4 sub-block.
const C1FLAG_NUMBER: usize = 8;
const COEF_REMAIN_BIN_REDUCTION: u32 = 3;

/// Up-right diagonal scan of a `size`x`size` grid, as (x, y) pairs.
pub fn diag_scan(size: usize) -> Vec<(usize, usize)> {
  let mut scan = Vec::with_capacity(size * size);
  for diagonal in 0..2 * size - 1 {
    for y in (0..=diagonal).rev() {
      let x = diagonal - y;
      if x < size && y < size {
        scan.push((x, y));
      }
    }
  }
  scan
}

/// Context index of `sig_coeff_flag` at (`x`, `y`) of a transform block.
/// `prev_csbf` has bit 0 set when the sub-block to the right is coded and
/// bit 1 when the one below is.
fn sig_coeff_ctx(
  log2_size: usize, x: usize, y: usize, prev_csbf: usize, is_luma: bool,
) -> usize {
  let sig_ctx = if log2_size == 2 {
    CTX_IDX_MAP_4X4[(y << 2) + x]
  } else if x + y == 0 {
    0
  } else {
    let (xp, yp) = (x & 3, y & 3);
    let sig = match prev_csbf {
      0 => match xp + yp {
        0 => 2,
        1 | 2 => 1,
        _ => 0,
      },
      1 => 2usize.saturating_sub(yp),
      2 => 2usize.saturating_sub(xp),
      _ => 2,
    };
    if is_luma {
      let sub_block_offset = if (x >> 2) + (y >> 2) > 0 { 3 } else { 0 };
      sig + sub_block_offset + if log2_size == 3 { 9 } else { 21 }
    } else {
      sig + if log2_size == 3 { 9 } else { 12 }
    }
  };
  if is_luma {
    sig_ctx
  } else {
    27 + sig_ctx
  }
}

fn write_last_sig_coeff_prefix(
  w: &mut impl Writer, models: &mut [ContextModel], prefix: usize,
  max_prefix: usize, offset: usize, shift: usize,
) {
  for i in 0..prefix {
    w.bin(true, &mut models[offset + (i >> shift)]);
  }
  if prefix < max_prefix {
    w.bin(false, &mut models[offset + (prefix >> shift)]);
  }
}

/// Rice/Exp-Golomb binarization of `coeff_abs_level_remaining`.
pub fn write_coeff_abs_level_remaining(
  w: &mut impl Writer, value: u32, rice_param: u32,
) {
  if value < (COEF_REMAIN_BIN_REDUCTION << rice_param) {
    let length = value >> rice_param;
    w.bypass_bits((1 << (length + 1)) - 2, length + 1);
    w.bypass_bits(value & ((1 << rice_param) - 1), rice_param);
  } else {
    let mut length = rice_param;
    let mut code = value - (COEF_REMAIN_BIN_REDUCTION << rice_param);
    while code >= 1 << length {
      code -= 1 << length;
      length += 1;
    }
    let prefix_length = COEF_REMAIN_BIN_REDUCTION + length + 1 - rice_param;
    w.bypass_bits((1 << prefix_length) - 2, prefix_length);
    w.bypass_bits(code, length);
  }
}

impl<'a> ContextWriter<'a> {
  /// Writes the transform tree of a leaf: the coded block flags and the
  /// residual of every transform block.
  ///
  /// The tree is split once for NxN leaves and for blocks larger than the
  /// largest transform; chroma is coded per quadrant unless the quadrants
  /// would be smaller than 4x4 chroma samples, in which case it follows the
  /// last luma quadrant.
  pub fn write_transform_tree(
    &mut self, w: &mut impl Writer, log2_cb_size: usize, leaf: &IntraLeaf,
  ) {
    let has_chroma = leaf.chroma_mode.is_some();
    let cbf_cb = leaf.chroma_tbs.iter().any(|[cb, _]| cb.cbf());
    let cbf_cr = leaf.chroma_tbs.iter().any(|[_, cr]| cr.cbf());
    if has_chroma {
      w.bin(cbf_cb, &mut self.fc.cbf_chroma[0]);
      w.bin(cbf_cr, &mut self.fc.cbf_chroma[0]);
    }

    if !leaf.is_tu_split(log2_cb_size) {
      debug_assert_eq!(leaf.luma_tbs.len(), 1);
      let luma = &leaf.luma_tbs[0];
      w.bin(luma.cbf(), &mut self.fc.cbf_luma[1]);
      self.write_transform_unit(w, luma, leaf.chroma_tbs.first());
      return;
    }

    debug_assert_eq!(leaf.luma_tbs.len(), 4);
    let chroma_per_unit =
      has_chroma && log2_cb_size - 1 > MIN_TX_LOG2_SIZE;
    for (i, luma) in leaf.luma_tbs.iter().enumerate() {
      let chroma = if chroma_per_unit {
        let [cb, cr] = &leaf.chroma_tbs[i];
        if cbf_cb {
          w.bin(cb.cbf(), &mut self.fc.cbf_chroma[1]);
        }
        if cbf_cr {
          w.bin(cr.cbf(), &mut self.fc.cbf_chroma[1]);
        }
        Some(&leaf.chroma_tbs[i])
      } else if has_chroma && i == 3 {
        leaf.chroma_tbs.first()
      } else {
        None
      };
      w.bin(luma.cbf(), &mut self.fc.cbf_luma[0]);
      self.write_transform_unit(w, luma, chroma);
    }
  }

  fn write_transform_unit(
    &mut self, w: &mut impl Writer, luma: &TransformBlock,
    chroma: Option<&[TransformBlock; 2]>,
  ) {
    let chroma_tbs = chroma.into_iter().flatten();
    for tb in std::iter::once(luma).chain(chroma_tbs) {
      if tb.cbf() {
        self.write_residual_coding(w, tb);
      }
    }
  }

  fn write_last_sig_coeff_position(
    &mut self, w: &mut impl Writer, x: usize, y: usize, log2_size: usize,
    is_luma: bool,
  ) {
    let (offset, shift) = if is_luma {
      (3 * (log2_size - 2) + ((log2_size - 1) >> 2), (log2_size + 1) >> 2)
    } else {
      (15, log2_size - 2)
    };
    let max_prefix = (log2_size << 1) - 1;
    let (gx, gy) = (GROUP_IDX[x] as usize, GROUP_IDX[y] as usize);
    write_last_sig_coeff_prefix(
      w,
      &mut self.fc.last_sig_coeff_x_prefix,
      gx,
      max_prefix,
      offset,
      shift,
    );
    write_last_sig_coeff_prefix(
      w,
      &mut self.fc.last_sig_coeff_y_prefix,
      gy,
      max_prefix,
      offset,
      shift,
    );
    for (pos, g) in [(x, gx), (y, gy)] {
      if g > 3 {
        let suffix_length = ((g >> 1) - 1) as u32;
        w.bypass_bits(pos as u32 - MIN_IN_GROUP[g], suffix_length);
      }
    }
  }

  /// Writes the levels of one transform block with a non-zero coded block
  /// flag, 4x4 sub-block by sub-block in reverse diagonal scan order.
  pub fn write_residual_coding(
    &mut self, w: &mut impl Writer, tb: &TransformBlock,
  ) {
    let log2_size = tb.log2_size;
    let n = 1 << log2_size;
    let is_luma = tb.plane == 0;
    let sb_width = 1 << (log2_size - 2);
    let sb_scan = diag_scan(sb_width);
    let pos_scan = diag_scan(4);
    let level_at = |s: usize, p: usize| {
      let (xs, ys) = sb_scan[s];
      let (xp, yp) = pos_scan[p];
      tb.levels[(ys * 4 + yp) * n + xs * 4 + xp]
    };

    let last = (0..sb_scan.len())
      .rev()
      .flat_map(|s| (0..16).rev().map(move |p| (s, p)))
      .find(|&(s, p)| level_at(s, p) != 0);
    let Some((last_sb, last_pos)) = last else {
      debug_assert!(false, "residual of an all-zero transform block");
      return;
    };
    let last_x = sb_scan[last_sb].0 * 4 + pos_scan[last_pos].0;
    let last_y = sb_scan[last_sb].1 * 4 + pos_scan[last_pos].1;
    self.write_last_sig_coeff_position(w, last_x, last_y, log2_size, is_luma);

    let mut coded_sb = vec![false; sb_width * sb_width];
    let mut c1 = 1usize;
    for s in (0..=last_sb).rev() {
      let (xs, ys) = sb_scan[s];
      let right = xs + 1 < sb_width && coded_sb[ys * sb_width + xs + 1];
      let below = ys + 1 < sb_width && coded_sb[(ys + 1) * sb_width + xs];
      let prev_csbf = right as usize | (below as usize) << 1;

      let mut infer_sb_dc = false;
      let sb_coded = if s < last_sb && s > 0 {
        let flag = (0..16).any(|p| level_at(s, p) != 0);
        let ctx = (right || below) as usize + if is_luma { 0 } else { 2 };
        w.bin(flag, &mut self.fc.coded_sub_block_flag[ctx]);
        infer_sb_dc = true;
        flag
      } else {
        true
      };
      coded_sb[ys * sb_width + xs] = sb_coded;
      if !sb_coded {
        continue;
      }

      // significant levels in reverse scan order
      let mut nonzero = ArrayVec::<i32, 16>::new();
      let first = if s == last_sb {
        nonzero.push(level_at(s, last_pos));
        last_pos
      } else {
        16
      };
      for p in (0..first).rev() {
        let level = level_at(s, p);
        if p > 0 || !infer_sb_dc {
          let (x, y) = (xs * 4 + pos_scan[p].0, ys * 4 + pos_scan[p].1);
          let ctx = sig_coeff_ctx(log2_size, x, y, prev_csbf, is_luma);
          w.bin(level != 0, &mut self.fc.sig_coeff_flag[ctx]);
          if level != 0 {
            infer_sb_dc = false;
          }
        }
        if level != 0 {
          nonzero.push(level);
        }
      }
      // the first sub-block is always present but may hold only zeros
      if !nonzero.is_empty() {
        self.write_coeff_levels(w, &nonzero, s == 0, is_luma, &mut c1);
      }
    }
  }

  fn write_coeff_levels(
    &mut self, w: &mut impl Writer, nonzero: &[i32], is_dc_sub_block: bool,
    is_luma: bool, c1: &mut usize,
  ) {
    debug_assert!(!nonzero.is_empty());
    let mut ctx_set = if is_dc_sub_block || !is_luma { 0 } else { 2 };
    if *c1 == 0 {
      ctx_set += 1;
    }
    *c1 = 1;

    let greater1_offset = if is_luma { 0 } else { 16 };
    let mut first_greater1 = None;
    for (idx, &level) in nonzero.iter().take(C1FLAG_NUMBER).enumerate() {
      let greater1 = level.abs() > 1;
      let ctx = greater1_offset + ctx_set * 4 + *c1;
      w.bin(greater1, &mut self.fc.coeff_abs_level_greater1_flag[ctx]);
      if greater1 {
        *c1 = 0;
        first_greater1.get_or_insert(idx);
      } else if *c1 > 0 && *c1 < 3 {
        *c1 += 1;
      }
    }
    if let Some(idx) = first_greater1 {
      let ctx = ctx_set + if is_luma { 0 } else { 4 };
      w.bin(
        nonzero[idx].abs() > 2,
        &mut self.fc.coeff_abs_level_greater2_flag[ctx],
      );
    }

    for &level in nonzero {
      w.bypass(level < 0);
    }

    if *c1 == 0 || nonzero.len() > C1FLAG_NUMBER {
      let mut first_coeff2 = 1;
      let mut rice_param = 0;
      for (idx, &level) in nonzero.iter().enumerate() {
        let abs = level.unsigned_abs();
        let base_level =
          if idx < C1FLAG_NUMBER { 2 + first_coeff2 } else { 1 };
        if abs >= base_level {
          write_coeff_abs_level_remaining(w, abs - base_level, rice_param);
          if abs > 3 * (1 << rice_param) {
            rice_param = (rice_param + 1).min(4);
          }
        }
        if abs >= 2 {
          first_coeff2 = 0;
        }
      }
    }
  }
}
