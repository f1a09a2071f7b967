// Copyright (c) 2017-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use arrayvec::ArrayVec;

use crate::predict::IntraPredMode;
use crate::rdo::{lambda, RdCost};
use crate::serialize::{Deserialize, Serialize};
use crate::transform::MAX_TX_LOG2_SIZE;

use std::fmt;

/// Intra prediction partitioning of a leaf coding block.
#[derive(
  Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum PartMode {
  /// One prediction unit covering the block.
  #[default]
  Part2Nx2N,
  /// Four square prediction units.
  PartNxN,
}

impl PartMode {
  pub const fn num_pus(self) -> usize {
    match self {
      PartMode::Part2Nx2N => 1,
      PartMode::PartNxN => 4,
    }
  }
}

impl fmt::Display for PartMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      PartMode::Part2Nx2N => "2Nx2N",
      PartMode::PartNxN => "NxN",
    })
  }
}

/// Quantized residual of one square transform block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransformBlock {
  pub plane: usize,
  /// Position in samples of `plane`.
  pub x: usize,
  pub y: usize,
  pub log2_size: usize,
  /// Levels in raster order.
  pub levels: Vec<i32>,
}

impl TransformBlock {
  /// Coded block flag: whether any level is non-zero.
  #[inline]
  pub fn cbf(&self) -> bool {
    self.levels.iter().any(|&l| l != 0)
  }
}

/// Everything coded for a leaf coding block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntraLeaf {
  pub part_mode: PartMode,
  /// One mode per prediction unit, in Z-order.
  pub luma_modes: ArrayVec<IntraPredMode, 4>,
  /// `None` for monochrome pictures.
  pub chroma_mode: Option<IntraPredMode>,
  /// Luma transform blocks in Z-order.
  pub luma_tbs: ArrayVec<TransformBlock, 4>,
  /// Cb and Cr transform blocks, one pair per chroma transform unit.
  pub chroma_tbs: ArrayVec<[TransformBlock; 2], 4>,
}

impl IntraLeaf {
  /// Whether the transform tree of a `log2_cb_size` block is split once.
  #[inline]
  pub fn is_tu_split(&self, log2_cb_size: usize) -> bool {
    self.part_mode == PartMode::PartNxN || log2_cb_size > MAX_TX_LOG2_SIZE
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CbKind {
  Leaf(IntraLeaf),
  /// Four quadrants in Z-order.
  Split(Box<[CodingBlock; 4]>),
  /// Lies completely outside the picture; nothing is coded.
  Outside,
}

/// A node of the coding quad-tree of a coding-tree block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodingBlock {
  /// Position in luma samples.
  pub x: usize,
  pub y: usize,
  pub log2_size: usize,
  pub depth: usize,
  pub qp: u8,
  /// Cost of the whole subtree, split flag included.
  pub cost: RdCost,
  pub kind: CbKind,
}

impl CodingBlock {
  pub fn outside(
    x: usize, y: usize, log2_size: usize, depth: usize, qp: u8,
  ) -> Self {
    CodingBlock {
      x,
      y,
      log2_size,
      depth,
      qp,
      cost: RdCost::default(),
      kind: CbKind::Outside,
    }
  }

  #[inline]
  pub const fn size(&self) -> usize {
    1 << self.log2_size
  }

  /// Lagrangian cost of the subtree at its own QP.
  #[inline]
  pub fn rd_cost(&self) -> f64 {
    self.cost.cost(lambda(self.qp))
  }

  pub fn leaf(&self) -> Option<&IntraLeaf> {
    match &self.kind {
      CbKind::Leaf(leaf) => Some(leaf),
      _ => None,
    }
  }

  pub fn children(&self) -> Option<&[CodingBlock; 4]> {
    match &self.kind {
      CbKind::Split(children) => Some(children),
      _ => None,
    }
  }

  #[inline]
  pub fn is_split(&self) -> bool {
    matches!(self.kind, CbKind::Split(_))
  }

  /// Every node of the subtree in coding order (pre-order, Z-order).
  pub fn iter(&self) -> CodingBlockIter<'_> {
    CodingBlockIter { stack: vec![self] }
  }

  /// The coded leaves of the subtree in coding order.
  pub fn leaves(&self) -> impl Iterator<Item = &CodingBlock> {
    self.iter().filter(|cb| cb.leaf().is_some())
  }

  /// Depth of the deepest coded leaf.
  pub fn max_leaf_depth(&self) -> Option<usize> {
    self.leaves().map(|cb| cb.depth).max()
  }

  fn fmt_indented(
    &self, f: &mut fmt::Formatter<'_>, indent: usize,
  ) -> fmt::Result {
    write!(
      f,
      "{:indent$}{}x{} @({}, {}) depth {} qp {}",
      "",
      self.size(),
      self.size(),
      self.x,
      self.y,
      self.depth,
      self.qp,
      indent = indent * 2
    )?;
    match &self.kind {
      CbKind::Outside => writeln!(f, " outside"),
      CbKind::Leaf(leaf) => {
        let modes = leaf.luma_modes.iter().map(|m| m.index());
        write!(
          f,
          " {} luma [{}]",
          leaf.part_mode,
          itertools::join(modes, ", ")
        )?;
        if let Some(chroma) = leaf.chroma_mode {
          write!(f, " chroma {}", chroma.index())?;
        }
        writeln!(f, " cost {:.1}", self.rd_cost())
      }
      CbKind::Split(children) => {
        writeln!(f, " split cost {:.1}", self.rd_cost())?;
        children.iter().try_for_each(|c| c.fmt_indented(f, indent + 1))
      }
    }
  }
}

impl fmt::Display for CodingBlock {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.fmt_indented(f, 0)
  }
}

pub struct CodingBlockIter<'a> {
  stack: Vec<&'a CodingBlock>,
}

impl<'a> Iterator for CodingBlockIter<'a> {
  type Item = &'a CodingBlock;

  fn next(&mut self) -> Option<&'a CodingBlock> {
    let cb = self.stack.pop()?;
    if let Some(children) = cb.children() {
      self.stack.extend(children.iter().rev());
    }
    Some(cb)
  }
}

#[cfg(test)]
mod test {
  use super::*;

  fn leaf(x: usize, y: usize, log2_size: usize, depth: usize) -> CodingBlock {
    CodingBlock {
      x,
      y,
      log2_size,
      depth,
      qp: 27,
      cost: RdCost::new(1, 0),
      kind: CbKind::Leaf(IntraLeaf {
        part_mode: PartMode::Part2Nx2N,
        luma_modes: [IntraPredMode::Dc].into_iter().collect(),
        chroma_mode: None,
        luma_tbs: ArrayVec::new(),
        chroma_tbs: ArrayVec::new(),
      }),
    }
  }

  #[test]
  fn iteration_is_pre_order_z_order() {
    let tree = CodingBlock {
      x: 0,
      y: 0,
      log2_size: 4,
      depth: 0,
      qp: 27,
      cost: RdCost::new(3, 0),
      kind: CbKind::Split(Box::new([
        leaf(0, 0, 3, 1),
        leaf(8, 0, 3, 1),
        leaf(0, 8, 3, 1),
        CodingBlock::outside(8, 8, 3, 1, 27),
      ])),
    };
    let order: Vec<_> = tree.iter().map(|cb| (cb.x, cb.y)).collect();
    assert_eq!(order, [(0, 0), (0, 0), (8, 0), (0, 8), (8, 8)]);
    assert_eq!(tree.leaves().count(), 3);
    assert_eq!(tree.max_leaf_depth(), Some(1));

    let dump = tree.to_string();
    assert_eq!(dump.lines().count(), 5);
    assert!(dump.lines().nth(4).unwrap().ends_with("outside"));
  }
}
