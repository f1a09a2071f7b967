// Copyright (c) 2018-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use super::*;

use crate::context::ContextWriter;
use crate::ec::{Writer, WriterCounter};
use crate::encoder::CbKind;
use crate::rdo::RdCost;

/// Cost of `split_cu_flag` for the block at (`x0`, `y0`), written to
/// `models`, or nothing when the flag is not signaled.
fn code_split_flag(
  ectx: &mut EncoderContext, models: &mut ContextModelTable, x0: usize,
  y0: usize, log2_cb_size: usize, depth: usize, split: bool,
) -> RdCost {
  let seq = ectx.seq;
  if !seq.split_flag_signaled(x0, y0, log2_cb_size, depth) {
    return RdCost::default();
  }
  let mut w = WriterCounter::new();
  ContextWriter::new(models, &mut ectx.bc, &seq)
    .write_split_cu_flag(&mut w, x0, y0, depth, split);
  RdCost::new(0, w.tell_frac())
}

/// Codes the block at (`x0`, `y0`) as a leaf, split flag included.
pub fn encode_cb_no_split(
  ectx: &mut EncoderContext, models: &mut ContextModelTable, input: &Frame,
  x0: usize, y0: usize, log2_cb_size: usize, depth: usize, qp: u8,
  stages: Stages<'_>,
) -> CodingBlock {
  let flag = code_split_flag(ectx, models, x0, y0, log2_cb_size, depth, false);
  let mut cb = stages
    .intra_part_mode
    .analyze(ectx, models, input, x0, y0, log2_cb_size, depth, qp);
  cb.cost += flag;
  cb
}

/// Codes the block at (`x0`, `y0`) as four quadrants in Z-order, each one
/// searched by `stages.split`. Quadrants outside the picture are skipped.
pub fn encode_cb_split(
  ectx: &mut EncoderContext, models: &mut ContextModelTable, input: &Frame,
  x0: usize, y0: usize, log2_cb_size: usize, depth: usize, qp: u8,
  stages: Stages<'_>,
) -> CodingBlock {
  let seq = ectx.seq;
  debug_assert!(log2_cb_size > seq.log2_min_cb_size);
  let flag = code_split_flag(ectx, models, x0, y0, log2_cb_size, depth, true);

  let log2_sub_size = log2_cb_size - 1;
  let children = [0, 1, 2, 3].map(|i| {
    let x = x0 + ((i & 1) << log2_sub_size);
    let y = y0 + ((i >> 1) << log2_sub_size);
    if seq.is_outside_picture(x, y) {
      CodingBlock::outside(x, y, log2_sub_size, depth + 1, qp)
    } else {
      stages.split.analyze(
        ectx,
        models,
        input,
        x,
        y,
        log2_sub_size,
        depth + 1,
        qp,
        stages,
      )
    }
  });

  let cost = flag + children.iter().map(|cb| cb.cost).sum::<RdCost>();
  CodingBlock {
    x: x0,
    y: y0,
    log2_size: log2_cb_size,
    depth,
    qp,
    cost,
    kind: CbKind::Split(Box::new(children)),
  }
}

/// Tries both coding the block whole and splitting it, and keeps the
/// cheaper one. Ties keep the block whole.
#[derive(Clone, Copy, Debug, Default)]
pub struct CbSplitBruteForce;

impl CbSplit for CbSplitBruteForce {
  fn analyze(
    &self, ectx: &mut EncoderContext, models: &mut ContextModelTable,
    input: &Frame, x0: usize, y0: usize, log2_cb_size: usize, depth: usize,
    qp: u8, stages: Stages<'_>,
  ) -> CodingBlock {
    let seq = ectx.seq;
    assert!(
      log2_cb_size >= seq.log2_min_cb_size && depth <= seq.max_depth,
      "coding block {}x{} at depth {} out of range",
      1 << log2_cb_size,
      1 << log2_cb_size,
      depth
    );

    let can_split = seq.can_split(log2_cb_size, depth);
    if !seq.is_inside_picture(x0, y0, log2_cb_size) {
      // implicit split
      assert!(can_split, "block straddling the picture edge cannot split");
      return encode_cb_split(
        ectx,
        models,
        input,
        x0,
        y0,
        log2_cb_size,
        depth,
        qp,
        stages,
      );
    }

    if !can_split {
      return encode_cb_no_split(
        ectx,
        models,
        input,
        x0,
        y0,
        log2_cb_size,
        depth,
        qp,
        stages,
      );
    }

    let checkpoint = ectx.checkpoint(models, x0, y0, log2_cb_size);
    let no_split = encode_cb_no_split(
      ectx,
      models,
      input,
      x0,
      y0,
      log2_cb_size,
      depth,
      qp,
      stages,
    );
    let no_split_checkpoint = ectx.checkpoint(models, x0, y0, log2_cb_size);

    ectx.rollback(models, &checkpoint);
    let split = encode_cb_split(
      ectx,
      models,
      input,
      x0,
      y0,
      log2_cb_size,
      depth,
      qp,
      stages,
    );

    let (no_split_cost, split_cost) = (no_split.rd_cost(), split.rd_cost());
    debug!(
      "{}x{} @({}, {}) depth {}: no split {:.1}, split {:.1}",
      1 << log2_cb_size,
      1 << log2_cb_size,
      x0,
      y0,
      depth,
      no_split_cost,
      split_cost
    );
    if no_split_cost <= split_cost {
      ectx.rollback(models, &no_split_checkpoint);
      no_split
    } else {
      split
    }
  }
}

#[cfg(test)]
mod test {
  use super::test_util::*;
  use super::*;
  use crate::api::{EncoderConfig, IntraPartModeAlgo};
  use crate::encoder::{PartMode, SequenceParameters};

  struct Search {
    algo: EncodingAlgorithmCustom,
    ectx: EncoderContext,
    models: ContextModelTable,
    input: Frame,
  }

  impl Search {
    fn new(config: EncoderConfig, seed: u8) -> Self {
      let mut algo = EncodingAlgorithmCustom::new();
      algo.set_params(&config);
      Search {
        algo,
        ectx: EncoderContext::new(SequenceParameters::new(&config)),
        models: ContextModelTable::new(config.qp as i32),
        input: test_frame(config.width, config.height, seed),
      }
    }

    fn run(
      &mut self,
      f: impl Fn(
        &mut EncoderContext,
        &mut ContextModelTable,
        &Frame,
        Stages<'_>,
      ) -> CodingBlock,
    ) -> CodingBlock {
      f(&mut self.ectx, &mut self.models, &self.input, self.algo.stages())
    }
  }

  #[test]
  fn brute_force_is_no_worse_than_either_candidate() {
    let config = config(32, 32);
    let mut search = Search::new(config, 3);
    let start = search.ectx.clone();
    let start_models = search.models.clone();

    let best = search.run(|e, m, i, s| {
      CbSplitBruteForce.analyze(e, m, i, 0, 0, 5, 1, 27, s)
    });

    search.ectx = start.clone();
    search.models = start_models.clone();
    let no_split = search
      .run(|e, m, i, s| encode_cb_no_split(e, m, i, 0, 0, 5, 1, 27, s));

    search.ectx = start;
    search.models = start_models;
    let split =
      search.run(|e, m, i, s| encode_cb_split(e, m, i, 0, 0, 5, 1, 27, s));

    assert!(best.rd_cost() <= no_split.rd_cost());
    assert!(best.rd_cost() <= split.rd_cost());
    assert_eq!(best.rd_cost(), no_split.rd_cost().min(split.rd_cost()));
  }

  #[test]
  fn search_state_matches_a_replay_of_the_winner() {
    let config = config(64, 64);
    let mut search = Search::new(config, 4);
    let start_models = search.models.clone();
    let ctb = search.run(|e, m, i, s| {
      CbSplitBruteForce.analyze(e, m, i, 0, 0, 6, 0, 27, s)
    });

    let mut replay_models = start_models;
    let mut bc = crate::context::BlockContext::new(64, 64);
    let mut w = WriterCounter::new();
    ContextWriter::new(&mut replay_models, &mut bc, &search.ectx.seq)
      .write_coding_quadtree(&mut w, &ctb);
    assert_eq!(replay_models, search.models);
    assert_eq!(bc, search.ectx.bc);
    assert_eq!(w.tell_frac(), ctb.cost.rate);
  }

  fn check_quad_tree(cb: &CodingBlock, seq: &SequenceParameters) {
    assert!(cb.log2_size >= seq.log2_min_cb_size);
    assert!(cb.depth <= seq.max_depth);
    match &cb.kind {
      CbKind::Split(children) => {
        let half = cb.size() / 2;
        for (i, child) in children.iter().enumerate() {
          assert_eq!(child.x, cb.x + (i & 1) * half);
          assert_eq!(child.y, cb.y + (i >> 1) * half);
          assert_eq!(child.log2_size, cb.log2_size - 1);
          assert_eq!(child.depth, cb.depth + 1);
          check_quad_tree(child, seq);
        }
      }
      CbKind::Leaf(_) => {
        assert!(seq.is_inside_picture(cb.x, cb.y, cb.log2_size));
      }
      CbKind::Outside => {
        assert!(seq.is_outside_picture(cb.x, cb.y));
      }
    }
  }

  #[test]
  fn tree_tiles_the_picture_within_limits() {
    // 40x24 leaves partial coding-tree blocks on both edges
    let config = EncoderConfig {
      log2_ctb_size: 5,
      max_depth: 2,
      ..config(40, 24)
    };
    let seq = SequenceParameters::new(&config);
    let mut search = Search::new(config, 5);
    let ctb = search.run(|e, m, i, s| {
      CbSplitBruteForce.analyze(e, m, i, 32, 0, 5, 0, 27, s)
    });
    check_quad_tree(&ctb, &seq);
    assert!(ctb.is_split());
    let covered: usize = ctb.leaves().map(|cb| cb.size() * cb.size()).sum();
    assert_eq!(covered, 8 * 24);
    assert!(ctb.max_leaf_depth().unwrap() <= 2);
    // at the minimum size a block is always a leaf
    let mut min_size = ctb.iter().filter(|cb| cb.log2_size == 3);
    assert!(min_size.all(|cb| !cb.is_split()));
  }

  #[test]
  fn depth_limit_stops_the_recursion() {
    let config = EncoderConfig { max_depth: 1, ..config(64, 64) };
    let seq = SequenceParameters::new(&config);
    let mut search = Search::new(config, 6);
    let ctb = search.run(|e, m, i, s| {
      CbSplitBruteForce.analyze(e, m, i, 0, 0, 6, 0, 27, s)
    });
    check_quad_tree(&ctb, &seq);
    assert!(ctb.iter().all(|cb| cb.depth <= 1 && cb.log2_size >= 5));
  }

  #[test]
  fn flat_picture_is_one_leaf() {
    let config = EncoderConfig {
      qp: 30,
      intra_part_mode_algo: IntraPartModeAlgo::BruteForce,
      ..config(64, 64)
    };
    let mut search = Search::new(config, 0);
    search.input.fill(128, 128, 128);
    let ctb = search.run(|e, m, i, s| {
      CbSplitBruteForce.analyze(e, m, i, 0, 0, 6, 0, 30, s)
    });
    let leaf = ctb.leaf().expect("flat block should not split");
    assert_eq!(leaf.part_mode, PartMode::Part2Nx2N);
    assert_eq!(ctb.cost.distortion, 0);
  }
}
