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

use crate::context::ContextWriter;
use crate::dist::DistortionMetric;
use crate::ec::{Writer, WriterCounter};
use crate::frame::Plane;
use crate::predict::{predict_intra, use_smoothed_edge, IntraEdge};
use crate::predict::IntraPredMode;
use crate::quantize::{chroma_qp, QuantizationContext};
use crate::rdo::RdCost;
use crate::transform::{
  forward_transform, inverse_transform, MAX_TX_LOG2_SIZE, MIN_TX_LOG2_SIZE,
};

/// Predicts the `2^log2_size` block at (`x`, `y`) of a plane with every
/// intra mode and returns the one closest to `input`. The lowest mode index
/// wins ties.
///
/// `available` tells whether a reference sample of `rec` may be used.
pub fn find_best_intra_mode(
  input: &Plane, rec: &Plane, x: usize, y: usize, log2_size: usize,
  is_luma: bool, available: impl Fn(isize, isize) -> bool,
  metric: DistortionMetric,
) -> IntraPredMode {
  let n = 1 << log2_size;
  let edge = IntraEdge::new(rec, x, y, log2_size, available);
  let smoothed = edge.smoothed();
  let mut pred = vec![0u8; n * n];
  IntraPredMode::iter()
    .map(|mode| {
      let e = if use_smoothed_edge(mode, log2_size, is_luma) {
        &smoothed
      } else {
        &edge
      };
      predict_intra(mode, e, log2_size, is_luma, &mut pred);
      (mode, metric.block_distortion(input, x, y, &pred, n, n))
    })
    .min_by_key(|&(_, distortion)| distortion)
    .map(|(mode, _)| mode)
    .unwrap_or_default()
}

/// Predicts, transforms and quantizes one transform block, then writes its
/// reconstruction into the encoder context.
pub fn encode_transform_block(
  ectx: &mut EncoderContext, input: &Frame, plane: usize, x: usize, y: usize,
  log2_size: usize, mode: IntraPredMode, qp: u8,
) -> TransformBlock {
  debug_assert!((MIN_TX_LOG2_SIZE..=MAX_TX_LOG2_SIZE).contains(&log2_size));
  let n = 1 << log2_size;
  let is_luma = plane == 0;

  let mut pred = vec![0u8; n * n];
  {
    let edge =
      IntraEdge::new(&ectx.rec.planes[plane], x, y, log2_size, |nx, ny| {
        ectx.is_available(plane, x, y, nx, ny)
      });
    let edge = if use_smoothed_edge(mode, log2_size, is_luma) {
      edge.smoothed()
    } else {
      edge
    };
    predict_intra(mode, &edge, log2_size, is_luma, &mut pred);
  }

  let src = &input.planes[plane];
  let residual: Vec<i32> = pred
    .iter()
    .enumerate()
    .map(|(i, &p)| {
      src.p(x + (i & (n - 1)), y + (i >> log2_size)) as i32 - p as i32
    })
    .collect();
  let mut coeffs = vec![0f64; n * n];
  forward_transform(&residual, &mut coeffs, log2_size);

  let qc = QuantizationContext::new(if is_luma { qp } else { chroma_qp(qp) });
  let mut levels = vec![0i32; n * n];
  if qc.quantize(&coeffs, &mut levels) > 0 {
    let mut rcoeffs = vec![0f64; n * n];
    let mut rresidual = vec![0i32; n * n];
    qc.dequantize(&levels, &mut rcoeffs);
    inverse_transform(&rcoeffs, &mut rresidual, log2_size);
    for (p, &r) in pred.iter_mut().zip(&rresidual) {
      *p = (*p as i32 + r).clamp(0, 255) as u8;
    }
  }
  ectx.rec.planes[plane].write_block(x, y, n, &pred);

  TransformBlock { plane, x, y, log2_size, levels }
}

/// Top-left corners of the `2^log2_tb_size` blocks tiling a
/// `2^log2_size` block, in Z-order.
fn tile(
  x: usize, y: usize, log2_size: usize, log2_tb_size: usize,
) -> impl Iterator<Item = (usize, usize)> {
  let count = if log2_size > log2_tb_size { 4 } else { 1 };
  (0..count).map(move |i| {
    (x + ((i & 1) << log2_tb_size), y + ((i >> 1) << log2_tb_size))
  })
}

/// Encodes a leaf coding block with the given partitioning: searches the
/// luma mode of every prediction unit, reconstructs all its transform
/// blocks and writes its syntax through `models` to measure the rate.
///
/// Prediction units are searched in Z-order, each one predicted from the
/// reconstruction of the previous ones. Chroma always uses the mode of the
/// first luma prediction unit.
pub fn encode_intra_leaf(
  ectx: &mut EncoderContext, models: &mut ContextModelTable, input: &Frame,
  x0: usize, y0: usize, log2_cb_size: usize, depth: usize, qp: u8,
  part_mode: PartMode,
) -> CodingBlock {
  let seq = ectx.seq;
  debug_assert!(seq.is_inside_picture(x0, y0, log2_cb_size));
  debug_assert!(
    part_mode == PartMode::Part2Nx2N || seq.is_nxn_legal(log2_cb_size, depth)
  );

  let log2_pu_size = match part_mode {
    PartMode::Part2Nx2N => log2_cb_size,
    PartMode::PartNxN => log2_cb_size - 1,
  };
  let tu_split =
    part_mode == PartMode::PartNxN || log2_cb_size > MAX_TX_LOG2_SIZE;
  let log2_luma_tb_size =
    if tu_split { log2_cb_size - 1 } else { log2_cb_size };

  let mut luma_modes = ArrayVec::new();
  let mut luma_tbs = ArrayVec::new();
  for (px, py) in tile(x0, y0, log2_cb_size, log2_pu_size) {
    let mode = find_best_intra_mode(
      &input.planes[0],
      &ectx.rec.planes[0],
      px,
      py,
      log2_pu_size,
      true,
      |nx, ny| ectx.is_available(0, px, py, nx, ny),
      seq.mode_decision_metric,
    );
    for (tx, ty) in tile(px, py, log2_pu_size, log2_luma_tb_size) {
      luma_tbs.push(encode_transform_block(
        ectx,
        input,
        0,
        tx,
        ty,
        log2_luma_tb_size,
        mode,
        qp,
      ));
    }
    luma_modes.push(mode);
  }

  let chroma_mode =
    seq.chroma_sampling.get_decimation().map(|_| luma_modes[0]);
  let mut chroma_tbs = ArrayVec::new();
  if let Some(mode) = chroma_mode {
    let (cx, cy) = (x0 >> 1, y0 >> 1);
    let log2_chroma_cb_size = log2_cb_size - 1;
    let log2_chroma_tb_size =
      if tu_split && log2_cb_size - 1 > MIN_TX_LOG2_SIZE {
        log2_chroma_cb_size - 1
      } else {
        log2_chroma_cb_size
      };
    for (tx, ty) in tile(cx, cy, log2_chroma_cb_size, log2_chroma_tb_size) {
      chroma_tbs.push([1, 2].map(|plane| {
        encode_transform_block(
          ectx,
          input,
          plane,
          tx,
          ty,
          log2_chroma_tb_size,
          mode,
          qp,
        )
      }));
    }
  }

  let leaf =
    IntraLeaf { part_mode, luma_modes, chroma_mode, luma_tbs, chroma_tbs };

  let mut w = WriterCounter::new();
  ContextWriter::new(models, &mut ectx.bc, &seq).write_coding_unit(
    &mut w,
    x0,
    y0,
    log2_cb_size,
    depth,
    &leaf,
  );

  let size = 1 << log2_cb_size;
  let distortion = ectx
    .rec
    .planes
    .iter()
    .zip(&input.planes)
    .map(|(rec, src)| {
      let (xdec, ydec) = (rec.cfg.xdec, rec.cfg.ydec);
      seq.rd_metric.plane_distortion(
        src,
        rec,
        x0 >> xdec,
        y0 >> ydec,
        size >> xdec,
        size >> ydec,
      )
    })
    .sum();
  let cost = RdCost::new(distortion, w.tell_frac());

  trace!(
    "leaf {}x{} @({}, {}) {}: distortion {} rate {} bits",
    size,
    size,
    x0,
    y0,
    part_mode,
    cost.distortion,
    cost.bits()
  );

  CodingBlock {
    x: x0,
    y: y0,
    log2_size: log2_cb_size,
    depth,
    qp,
    cost,
    kind: CbKind::Leaf(leaf),
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::api::EncoderConfig;
  use crate::frame::ChromaSampling;
  use crate::predict::IntraPredMode::*;
  use rand::{Rng, SeedableRng};
  use rand_chacha::ChaChaRng;

  fn setup(
    width: usize, height: usize, chroma_sampling: ChromaSampling,
  ) -> (EncoderContext, ContextModelTable) {
    let config =
      EncoderConfig { width, height, chroma_sampling, ..Default::default() };
    (
      EncoderContext::new(SequenceParameters::new(&config)),
      ContextModelTable::new(27),
    )
  }

  fn noise_frame(
    width: usize, height: usize, chroma_sampling: ChromaSampling, seed: u8,
  ) -> Frame {
    let mut ra = ChaChaRng::from_seed([seed; 32]);
    let mut frame = Frame::new(width, height, chroma_sampling);
    for plane in frame.planes.iter_mut() {
      plane.data.iter_mut().for_each(|v| *v = ra.gen());
    }
    frame
  }

  #[test]
  fn mode_search_finds_vertical_stripes() {
    let mut input = Plane::new(16, 16, 0, 0);
    for y in 0..16 {
      for x in 0..16 {
        input.data[y * 16 + x] = if x % 2 == 0 { 200 } else { 40 };
      }
    }
    // the reconstructed row above carries the same stripes
    let rec = input.clone();
    let mode = find_best_intra_mode(
      &input,
      &rec,
      8,
      8,
      2,
      true,
      |_, y| y < 8,
      DistortionMetric::Sad,
    );
    assert_eq!(mode, IntraPredMode::VERTICAL);
  }

  #[test]
  fn mode_search_breaks_ties_on_lowest_index() {
    let input = Plane::new(16, 16, 0, 0);
    let rec = input.clone();
    // every mode predicts mid-grey against a black source
    let mode = find_best_intra_mode(
      &input,
      &rec,
      0,
      0,
      3,
      true,
      |_, _| false,
      DistortionMetric::Sse,
    );
    assert_eq!(mode, Planar);
  }

  #[test]
  fn flat_block_has_no_residual() {
    let (mut ectx, _) = setup(16, 16, ChromaSampling::Cs420);
    let mut input = Frame::new(16, 16, ChromaSampling::Cs420);
    input.fill(128, 128, 128);
    let tb = encode_transform_block(&mut ectx, &input, 0, 0, 0, 3, Dc, 27);
    assert!(!tb.cbf());
    assert!(ectx.rec.planes[0].row(3)[..8].iter().all(|&v| v == 128));
  }

  #[test]
  fn reconstruction_approaches_source_at_low_qp() {
    let (mut ectx, _) = setup(16, 16, ChromaSampling::Cs400);
    let input = noise_frame(16, 16, ChromaSampling::Cs400, 5);
    let tb = encode_transform_block(&mut ectx, &input, 0, 0, 0, 4, Dc, 0);
    assert!(tb.cbf());
    let sse = DistortionMetric::Sse.plane_distortion(
      &input.planes[0],
      &ectx.rec.planes[0],
      0,
      0,
      16,
      16,
    );
    assert!(sse <= 256, "sse {sse}");
  }

  #[test]
  fn leaf_layouts() {
    let (mut ectx, mut models) = setup(64, 64, ChromaSampling::Cs420);
    let input = noise_frame(64, 64, ChromaSampling::Cs420, 9);

    let cb = encode_intra_leaf(
      &mut ectx,
      &mut models,
      &input,
      0,
      0,
      6,
      0,
      27,
      PartMode::Part2Nx2N,
    );
    let leaf = cb.leaf().unwrap();
    assert_eq!(leaf.luma_modes.len(), 1);
    assert_eq!(leaf.luma_tbs.len(), 4);
    assert!(leaf.luma_tbs.iter().all(|tb| tb.log2_size == 5));
    assert_eq!(leaf.chroma_tbs.len(), 4);
    assert!(leaf.chroma_tbs.iter().all(|[cb, _]| cb.log2_size == 4));
    assert_eq!(leaf.chroma_mode, Some(leaf.luma_modes[0]));
    assert!(cb.cost.rate > 0 && cb.cost.distortion > 0);
  }

  #[test]
  fn nxn_leaf_of_8x8_shares_one_chroma_block() {
    let config = EncoderConfig {
      width: 16,
      height: 16,
      log2_ctb_size: 4,
      max_depth: 1,
      ..Default::default()
    };
    let mut ectx = EncoderContext::new(SequenceParameters::new(&config));
    let mut models = ContextModelTable::new(27);
    let input = noise_frame(16, 16, ChromaSampling::Cs420, 11);

    let cb = encode_intra_leaf(
      &mut ectx,
      &mut models,
      &input,
      8,
      8,
      3,
      1,
      27,
      PartMode::PartNxN,
    );
    let leaf = cb.leaf().unwrap();
    assert_eq!(leaf.luma_modes.len(), 4);
    assert!(leaf.luma_tbs.iter().all(|tb| tb.log2_size == 2));
    assert_eq!(leaf.chroma_tbs.len(), 1);
    assert_eq!(leaf.chroma_tbs[0][1].log2_size, 2);
    assert_eq!((leaf.chroma_tbs[0][1].x, leaf.chroma_tbs[0][1].y), (4, 4));
    // the writer recorded the modes of every prediction unit
    assert_eq!(ectx.bc.at(12, 12).luma_mode, leaf.luma_modes[3]);
    assert_eq!(ectx.bc.at(8, 8).ct_depth, 1);
  }

  #[test]
  fn monochrome_leaf_has_no_chroma() {
    let (mut ectx, mut models) = setup(32, 32, ChromaSampling::Cs400);
    let input = noise_frame(32, 32, ChromaSampling::Cs400, 3);
    let cb = encode_intra_leaf(
      &mut ectx,
      &mut models,
      &input,
      0,
      0,
      4,
      1,
      27,
      PartMode::Part2Nx2N,
    );
    let leaf = cb.leaf().unwrap();
    assert_eq!(leaf.chroma_mode, None);
    assert!(leaf.chroma_tbs.is_empty());
  }
}
