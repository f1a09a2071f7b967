// Copyright (c) 2018-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use super::*;

use crate::quantize::MAX_QP;
use crate::serialize::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QScaleConstantParams {
  pub qp: u8,
}

impl Default for QScaleConstantParams {
  fn default() -> Self {
    QScaleConstantParams { qp: 27 }
  }
}

/// Codes every coding-tree block with the same QP.
#[derive(Clone, Debug, Default)]
pub struct QScaleConstant {
  params: QScaleConstantParams,
}

impl QScaleConstant {
  pub fn new(params: QScaleConstantParams) -> Self {
    assert!(params.qp <= MAX_QP);
    QScaleConstant { params }
  }

  pub fn set_params(&mut self, params: QScaleConstantParams) {
    assert!(params.qp <= MAX_QP);
    self.params = params;
  }

  pub const fn qp(&self) -> u8 {
    self.params.qp
  }
}

impl CtbQScale for QScaleConstant {
  fn analyze(
    &self, ectx: &mut EncoderContext, models: &mut ContextModelTable,
    input: &Frame, ctb_x: usize, ctb_y: usize, log2_ctb_size: usize,
    depth: usize, stages: Stages<'_>,
  ) -> CodingBlock {
    stages.split.analyze(
      ectx,
      models,
      input,
      ctb_x,
      ctb_y,
      log2_ctb_size,
      depth,
      self.params.qp,
      stages,
    )
  }
}
