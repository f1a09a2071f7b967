// Copyright (c) 2018-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use super::*;

use crate::encoder::{encode_intra_leaf, PartMode};
use crate::serialize::{Deserialize, Serialize};

/// Evaluates 2Nx2N and, where it is allowed, NxN. Ties go to 2Nx2N.
#[derive(Clone, Copy, Debug, Default)]
pub struct IntraPartModeBruteForce;

impl CbIntraPartMode for IntraPartModeBruteForce {
  fn analyze(
    &self, ectx: &mut EncoderContext, models: &mut ContextModelTable,
    input: &Frame, x0: usize, y0: usize, log2_cb_size: usize, depth: usize,
    qp: u8,
  ) -> CodingBlock {
    if !ectx.seq.is_nxn_legal(log2_cb_size, depth) {
      return encode_intra_leaf(
        ectx,
        models,
        input,
        x0,
        y0,
        log2_cb_size,
        depth,
        qp,
        PartMode::Part2Nx2N,
      );
    }

    let checkpoint = ectx.checkpoint(models, x0, y0, log2_cb_size);
    let cb_2nx2n = encode_intra_leaf(
      ectx,
      models,
      input,
      x0,
      y0,
      log2_cb_size,
      depth,
      qp,
      PartMode::Part2Nx2N,
    );
    let checkpoint_2nx2n = ectx.checkpoint(models, x0, y0, log2_cb_size);

    ectx.rollback(models, &checkpoint);
    let cb_nxn = encode_intra_leaf(
      ectx,
      models,
      input,
      x0,
      y0,
      log2_cb_size,
      depth,
      qp,
      PartMode::PartNxN,
    );

    if cb_2nx2n.rd_cost() <= cb_nxn.rd_cost() {
      ectx.rollback(models, &checkpoint_2nx2n);
      cb_2nx2n
    } else {
      cb_nxn
    }
  }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntraPartModeFixedParams {
  pub part_mode: PartMode,
}

/// Always codes leaves with the configured partitioning, falling back to
/// 2Nx2N where NxN is not allowed.
#[derive(Clone, Debug, Default)]
pub struct IntraPartModeFixed {
  params: IntraPartModeFixedParams,
}

impl IntraPartModeFixed {
  pub const fn new(params: IntraPartModeFixedParams) -> Self {
    IntraPartModeFixed { params }
  }

  pub fn set_params(&mut self, params: IntraPartModeFixedParams) {
    self.params = params;
  }
}

impl CbIntraPartMode for IntraPartModeFixed {
  fn analyze(
    &self, ectx: &mut EncoderContext, models: &mut ContextModelTable,
    input: &Frame, x0: usize, y0: usize, log2_cb_size: usize, depth: usize,
    qp: u8,
  ) -> CodingBlock {
    let part_mode = match self.params.part_mode {
      PartMode::PartNxN if ectx.seq.is_nxn_legal(log2_cb_size, depth) => {
        PartMode::PartNxN
      }
      _ => PartMode::Part2Nx2N,
    };
    encode_intra_leaf(
      ectx,
      models,
      input,
      x0,
      y0,
      log2_cb_size,
      depth,
      qp,
      part_mode,
    )
  }
}
