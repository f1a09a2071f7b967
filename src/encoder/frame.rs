// Copyright (c) 2018-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use arrayvec::ArrayVec;

use super::*;

use crate::analyze::EncodingAlgorithm;
use crate::context::ContextWriter;
use crate::dist::{psnr, DistortionMetric};
use crate::ec::{Writer, WriterCounter};
use crate::rdo::RdCost;

use std::fmt;

/// Statistics of one coded picture.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameSummary {
  pub frameno: u64,
  pub qp: u8,
  pub ctbs: usize,
  /// Coded leaves, and how many of them use NxN.
  pub leaves: usize,
  pub nxn_leaves: usize,
  /// Sum of the costs of every coding-tree block.
  pub cost: RdCost,
  pub rd_cost: f64,
  /// Estimated size of the slice data in bits.
  pub bits: u64,
  /// PSNR of every plane of the reconstruction.
  pub psnr: ArrayVec<f64, 3>,
}

impl fmt::Display for FrameSummary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "Frame {} - QP {} - {} CBs ({} NxN) - {} bits - RD cost {:.1}",
      self.frameno,
      self.qp,
      self.leaves,
      self.nxn_leaves,
      self.bits,
      self.rd_cost
    )?;
    if !self.psnr.is_empty() {
      write!(f, " - PSNR:")?;
      for (name, psnr) in ["Y", "Cb", "Cr"].iter().zip(&self.psnr) {
        write!(f, " {}: {:.4}", name, psnr)?;
      }
    }
    Ok(())
  }
}

/// The outcome of [`encode_image`].
#[derive(Clone, Debug)]
pub struct EncodedFrame {
  pub summary: FrameSummary,
  /// The chosen tree of every coding-tree block, in raster order.
  pub ctbs: Vec<CodingBlock>,
  pub rec: Frame,
}

/// Totals over the pictures of a sequence.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SequenceSummary {
  pub frames: usize,
  pub bits: u64,
  pub rd_cost: f64,
  /// Mean PSNR of every plane.
  pub psnr: ArrayVec<f64, 3>,
}

impl<'a> FromIterator<&'a FrameSummary> for SequenceSummary {
  fn from_iter<I: IntoIterator<Item = &'a FrameSummary>>(iter: I) -> Self {
    let mut summary = SequenceSummary::default();
    let mut psnr_sum = ArrayVec::<f64, 3>::new();
    for frame in iter {
      summary.frames += 1;
      summary.bits += frame.bits;
      summary.rd_cost += frame.rd_cost;
      if psnr_sum.is_empty() {
        psnr_sum.extend(frame.psnr.iter().copied());
      } else {
        psnr_sum.iter_mut().zip(&frame.psnr).for_each(|(s, p)| *s += p);
      }
    }
    if summary.frames > 0 {
      let n = summary.frames as f64;
      summary.psnr = psnr_sum.into_iter().map(|s| s / n).collect();
    }
    summary
  }
}

impl fmt::Display for SequenceSummary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} frames - {} bits - RD cost {:.1}",
      self.frames, self.bits, self.rd_cost
    )?;
    if !self.psnr.is_empty() {
      write!(f, " - mean PSNR:")?;
      for (name, psnr) in ["Y", "Cb", "Cr"].iter().zip(&self.psnr) {
        write!(f, " {}: {:.4}", name, psnr)?;
      }
    }
    Ok(())
  }
}

/// Searches and codes every coding-tree block of `input` in raster order.
///
/// Each block is searched on a copy of `models`; the chosen tree is then
/// written to `models` itself, which leaves them exactly as a decoder would
/// see them after the block.
pub fn encode_image(
  ectx: &mut EncoderContext, models: &mut ContextModelTable, input: &Frame,
  algo: &dyn EncodingAlgorithm,
) -> EncodedFrame {
  let seq = ectx.seq;
  assert_eq!(input.width(), seq.width);
  assert_eq!(input.height(), seq.height);

  let stages = algo.stages();
  let num_ctbs = seq.pic_width_in_ctbs() * seq.pic_height_in_ctbs();
  let mut ctbs = Vec::with_capacity(num_ctbs);
  let mut w = WriterCounter::new();
  for ctb_y in 0..seq.pic_height_in_ctbs() {
    for ctb_x in 0..seq.pic_width_in_ctbs() {
      let (x0, y0) = (ctb_x << seq.log2_ctb_size, ctb_y << seq.log2_ctb_size);
      let mut search_models = models.clone();
      let ctb = algo.ctb_qscale().analyze(
        ectx,
        &mut search_models,
        input,
        x0,
        y0,
        seq.log2_ctb_size,
        0,
        stages,
      );

      ContextWriter::new(models, &mut ectx.bc, &seq)
        .write_coding_quadtree(&mut w, &ctb);
      debug_assert_eq!(
        search_models, *models,
        "search state diverged from the coded tree"
      );
      // end_of_slice_segment_flag
      w.terminate(ctbs.len() + 1 == num_ctbs);

      debug!(
        "CTB ({}, {}): {} leaves, max depth {:?}, cost {:.1}",
        ctb_x,
        ctb_y,
        ctb.leaves().count(),
        ctb.max_leaf_depth(),
        ctb.rd_cost()
      );
      ctbs.push(ctb);
    }
  }

  let psnr = input
    .planes
    .iter()
    .zip(&ectx.rec.planes)
    .map(|(src, rec)| {
      let (width, height) = (src.cfg.width, src.cfg.height);
      let sse =
        DistortionMetric::Sse.plane_distortion(src, rec, 0, 0, width, height);
      psnr(sse, width * height)
    })
    .collect();
  let leaves = || ctbs.iter().flat_map(|ctb| ctb.leaves());
  let summary = FrameSummary {
    frameno: 0,
    qp: algo.pps_qp(),
    ctbs: ctbs.len(),
    leaves: leaves().count(),
    nxn_leaves: leaves()
      .filter_map(|cb| cb.leaf())
      .filter(|leaf| leaf.part_mode == PartMode::PartNxN)
      .count(),
    cost: ctbs.iter().map(|ctb| ctb.cost).sum(),
    rd_cost: ctbs.iter().map(|ctb| ctb.rd_cost()).sum(),
    bits: w.tell(),
    psnr,
  };

  EncodedFrame { summary, ctbs, rec: ectx.rec.clone() }
}

/// Codes every picture of a sequence as an independent intra picture.
/// Pictures are coded in parallel with the `threading` feature; the result
/// keeps their order.
pub fn encode_frames(
  seq: &SequenceParameters, algo: &dyn EncodingAlgorithm, frames: &[Frame],
) -> Vec<EncodedFrame> {
  map_frames(frames, |(frameno, input)| {
    encode_picture(seq, algo, frameno as u64, input)
  })
}

/// Codes `input` from a fresh encoder state and freshly initialized
/// context models, and logs its summary.
pub fn encode_picture(
  seq: &SequenceParameters, algo: &dyn EncodingAlgorithm, frameno: u64,
  input: &Frame,
) -> EncodedFrame {
  let mut ectx = EncoderContext::new(*seq);
  let mut models = ContextModelTable::new(algo.slice_qp());
  let mut encoded = encode_image(&mut ectx, &mut models, input, algo);
  encoded.summary.frameno = frameno;
  info!("{}", encoded.summary);
  encoded
}

cfg_if::cfg_if! {
  if #[cfg(feature = "threading")] {
    fn map_frames<F>(frames: &[Frame], f: F) -> Vec<EncodedFrame>
    where
      F: Fn((usize, &Frame)) -> EncodedFrame + Send + Sync,
    {
      use rayon::prelude::*;
      frames.par_iter().enumerate().map(f).collect()
    }
  } else {
    fn map_frames<F>(frames: &[Frame], f: F) -> Vec<EncodedFrame>
    where
      F: Fn((usize, &Frame)) -> EncodedFrame,
    {
      frames.iter().enumerate().map(f).collect()
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::analyze::EncodingAlgorithmCustom;
  use crate::api::EncoderConfig;
  use crate::frame::ChromaSampling;

  fn gradient(width: usize, height: usize, shift: usize) -> Frame {
    let mut frame = Frame::new(width, height, ChromaSampling::Cs420);
    for plane in frame.planes.iter_mut() {
      let stride = plane.cfg.stride;
      for (i, v) in plane.data.iter_mut().enumerate() {
        *v = ((i % stride + i / stride + shift) * 3 % 256) as u8;
      }
    }
    frame
  }

  fn setup(
    config: &EncoderConfig,
  ) -> (SequenceParameters, EncodingAlgorithmCustom) {
    let mut algo = EncodingAlgorithmCustom::new();
    algo.set_params(config);
    (SequenceParameters::new(config), algo)
  }

  #[test]
  fn ctbs_are_coded_in_raster_order() {
    let config = EncoderConfig {
      width: 96,
      height: 48,
      log2_ctb_size: 5,
      ..Default::default()
    };
    let (seq, algo) = setup(&config);
    let mut ectx = EncoderContext::new(seq);
    let mut models = ContextModelTable::new(algo.slice_qp());
    let input = gradient(96, 48, 0);
    let encoded = encode_image(&mut ectx, &mut models, &input, &algo);

    let origins: Vec<_> = encoded.ctbs.iter().map(|cb| (cb.x, cb.y)).collect();
    assert_eq!(
      origins,
      [(0, 0), (32, 0), (64, 0), (0, 32), (32, 32), (64, 32)]
    );
    assert_eq!(encoded.summary.ctbs, 6);
    assert_eq!(encoded.summary.psnr.len(), 3);
    assert!(encoded.summary.bits > 0);
    assert_eq!(encoded.rec, ectx.rec);
  }

  #[test]
  fn frame_bits_match_the_search() {
    let config = EncoderConfig { width: 64, height: 32, ..Default::default() };
    let (seq, algo) = setup(&config);
    let mut ectx = EncoderContext::new(seq);
    let mut models = ContextModelTable::new(algo.slice_qp());
    let input = gradient(64, 32, 1);
    let encoded = encode_image(&mut ectx, &mut models, &input, &algo);
    // the searched rates plus one terminating bin per coding-tree block
    let searched = encoded.summary.cost.bits();
    let ctbs = encoded.ctbs.len() as u64;
    assert!(encoded.summary.bits >= searched);
    assert!(encoded.summary.bits <= searched + 2 * ctbs + 8);
  }

  #[test]
  fn frames_keep_their_order() {
    let config = EncoderConfig { width: 32, height: 32, ..Default::default() };
    let (seq, algo) = setup(&config);
    let frames: Vec<_> = (0..4).map(|i| gradient(32, 32, i * 7)).collect();
    let encoded = encode_frames(&seq, &algo, &frames);
    assert_eq!(encoded.len(), 4);
    for (i, e) in encoded.iter().enumerate() {
      assert_eq!(e.summary.frameno, i as u64);
      let mut ectx = EncoderContext::new(seq);
      let mut models = ContextModelTable::new(algo.slice_qp());
      let alone = encode_image(&mut ectx, &mut models, &frames[i], &algo);
      assert_eq!(e.ctbs, alone.ctbs);
    }

    let total: SequenceSummary = encoded.iter().map(|e| &e.summary).collect();
    assert_eq!(total.frames, 4);
    let bits: u64 = encoded.iter().map(|e| e.summary.bits).sum();
    assert_eq!(total.bits, bits);
    assert_eq!(total.psnr.len(), 3);
  }
}
