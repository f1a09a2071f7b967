// Copyright (c) 2017-2023, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

//! Context modeling and syntax writing of the coding quad-tree.
//!
//! [`ContextWriter`] is the single place where syntax elements are turned
//! into bins, for rate estimation during the search as well as for the
//! final write of a picture.

use crate::encoder::SequenceParameters;

mod block_unit;
mod cabac_context;
mod transform_unit;

pub use self::block_unit::*;
pub use self::cabac_context::*;
pub use self::transform_unit::*;

pub struct ContextWriter<'a> {
  pub bc: &'a mut BlockContext,
  pub fc: &'a mut ContextModelTable,
  seq: &'a SequenceParameters,
}

impl<'a> ContextWriter<'a> {
  pub fn new(
    fc: &'a mut ContextModelTable, bc: &'a mut BlockContext,
    seq: &'a SequenceParameters,
  ) -> Self {
    ContextWriter { bc, fc, seq }
  }
}
