// Copyright (c) 2017-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

#![allow(non_upper_case_globals)]

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::frame::Plane;
use crate::serialize::{Deserialize, Serialize};

pub const NUM_INTRA_PRED_MODES: usize = 35;

/// Intra prediction modes, in the order of their syntax index.
#[derive(
  Copy,
  Clone,
  Debug,
  Default,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  FromPrimitive,
  Serialize,
  Deserialize,
)]
#[repr(u8)]
pub enum IntraPredMode {
  #[default]
  Planar = 0,
  Dc,
  Angular2,
  Angular3,
  Angular4,
  Angular5,
  Angular6,
  Angular7,
  Angular8,
  Angular9,
  /// Horizontal
  Angular10,
  Angular11,
  Angular12,
  Angular13,
  Angular14,
  Angular15,
  Angular16,
  Angular17,
  Angular18,
  Angular19,
  Angular20,
  Angular21,
  Angular22,
  Angular23,
  Angular24,
  Angular25,
  /// Vertical
  Angular26,
  Angular27,
  Angular28,
  Angular29,
  Angular30,
  Angular31,
  Angular32,
  Angular33,
  Angular34,
}

use IntraPredMode::*;

impl IntraPredMode {
  pub const HORIZONTAL: IntraPredMode = Angular10;
  pub const VERTICAL: IntraPredMode = Angular26;

  #[inline]
  pub const fn index(self) -> usize {
    self as usize
  }

  #[inline]
  pub fn from_index(index: usize) -> Option<IntraPredMode> {
    IntraPredMode::from_usize(index)
  }

  /// All modes in increasing index order.
  pub fn iter() -> impl Iterator<Item = IntraPredMode> {
    (0..NUM_INTRA_PRED_MODES).filter_map(IntraPredMode::from_index)
  }

  #[inline]
  pub const fn is_angular(self) -> bool {
    self as usize >= 2
  }
}

static INTRA_PRED_ANGLE: [i32; NUM_INTRA_PRED_MODES] = [
  0, 0, 32, 26, 21, 17, 13, 9, 5, 2, 0, -2, -5, -9, -13, -17, -21, -26, -32,
  -26, -21, -17, -13, -9, -5, -2, 0, 2, 5, 9, 13, 17, 21, 26, 32,
];

// modes 11 to 25
static INV_ANGLE: [i32; 15] = [
  -4096, -1638, -910, -630, -482, -390, -315, -256, -315, -390, -482, -630,
  -910, -1638, -4096,
];

/// Reference samples of an `n`x`n` block: `2n` samples to the left (down to
/// the below-left block), the above-left corner and `2n` samples above
/// (through the above-right block).
///
/// They are stored bottom-left first, so index `2n - 1 - y` holds the left
/// neighbor of row `y`, index `2n` the corner and `2n + 1 + x` the above
/// neighbor of column `x`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntraEdge {
  samples: Vec<i32>,
  n: usize,
}

impl IntraEdge {
  /// Gathers the edge of the block at (`x`, `y`) of `rec`.
  ///
  /// `available` tells whether the sample at the given plane position has
  /// been reconstructed. Missing samples are substituted from the nearest
  /// available one in the bottom-left to top-right scan, or by mid-grey if
  /// no sample is available at all.
  pub fn new(
    rec: &Plane, x: usize, y: usize, log2_size: usize,
    available: impl Fn(isize, isize) -> bool,
  ) -> Self {
    let n = 1 << log2_size;
    let len = 4 * n + 1;
    let (bx, by) = (x as isize, y as isize);
    let position = |k: usize| -> (isize, isize) {
      if k < 2 * n {
        (bx - 1, by + (2 * n - 1 - k) as isize)
      } else {
        (bx + k as isize - 2 * n as isize - 1, by - 1)
      }
    };

    let mut samples = vec![0i32; len];
    let mut is_available = vec![false; len];
    for k in 0..len {
      let (sx, sy) = position(k);
      if available(sx, sy) {
        samples[k] = rec.p(sx as usize, sy as usize) as i32;
        is_available[k] = true;
      }
    }

    match is_available.iter().position(|&a| a) {
      None => samples.fill(128),
      Some(first) => {
        samples[0] = samples[first];
        for k in 1..len {
          if !is_available[k] {
            samples[k] = samples[k - 1];
          }
        }
      }
    }

    IntraEdge { samples, n }
  }

  /// `p[-1][y]` for `y` in `-1..2n`.
  #[inline(always)]
  pub fn left(&self, y: isize) -> i32 {
    self.samples[(2 * self.n as isize - 1 - y) as usize]
  }

  /// `p[x][-1]` for `x` in `-1..2n`.
  #[inline(always)]
  pub fn top(&self, x: isize) -> i32 {
    self.samples[(2 * self.n as isize + 1 + x) as usize]
  }

  /// The edge after the [1 2 1] smoothing filter, end points untouched.
  pub fn smoothed(&self) -> IntraEdge {
    let s = &self.samples;
    let mut samples = s.clone();
    for k in 1..s.len() - 1 {
      samples[k] = (s[k - 1] + 2 * s[k] + s[k + 1] + 2) >> 2;
    }
    IntraEdge { samples, n: self.n }
  }
}

/// Whether `mode` predicts from the smoothed edge.
pub fn use_smoothed_edge(
  mode: IntraPredMode, log2_size: usize, is_luma: bool,
) -> bool {
  if !is_luma || mode == Dc || log2_size == 2 {
    return false;
  }
  let m = mode.index() as i32;
  let min_dist_ver_hor = (m - 26).abs().min((m - 10).abs());
  let threshold = match log2_size {
    3 => 7,
    4 => 1,
    _ => 0,
  };
  min_dist_ver_hor > threshold
}

/// Predicts an `n`x`n` block, written row-major into `dst`. Luma blocks
/// smaller than 32x32 get the DC and pure horizontal/vertical boundary
/// filters.
pub fn predict_intra(
  mode: IntraPredMode, edge: &IntraEdge, log2_size: usize, is_luma: bool,
  dst: &mut [u8],
) {
  let n = 1 << log2_size;
  debug_assert_eq!(edge.n, n);
  debug_assert!(dst.len() >= n * n);
  let edge_filters = is_luma && n < 32;
  match mode {
    Planar => pred_planar(edge, log2_size, dst),
    Dc => pred_dc(edge, log2_size, edge_filters, dst),
    _ => pred_angular(mode, edge, n, edge_filters, dst),
  }
}

#[inline(always)]
fn clip_pixel(v: i32) -> u8 {
  v.clamp(0, 255) as u8
}

fn pred_planar(edge: &IntraEdge, log2_size: usize, dst: &mut [u8]) {
  let n = 1usize << log2_size;
  let ni = n as i32;
  let top_right = edge.top(n as isize);
  let bottom_left = edge.left(n as isize);
  for y in 0..n {
    for x in 0..n {
      let (xi, yi) = (x as i32, y as i32);
      let v = (ni - 1 - xi) * edge.left(y as isize)
        + (xi + 1) * top_right
        + (ni - 1 - yi) * edge.top(x as isize)
        + (yi + 1) * bottom_left
        + ni;
      dst[y * n + x] = (v >> (log2_size + 1)) as u8;
    }
  }
}

fn pred_dc(
  edge: &IntraEdge, log2_size: usize, edge_filters: bool, dst: &mut [u8],
) {
  let n = 1usize << log2_size;
  let sum: i32 = (0..n as isize).map(|i| edge.top(i) + edge.left(i)).sum();
  let dc = (sum + n as i32) >> (log2_size + 1);
  dst[..n * n].fill(dc as u8);
  if edge_filters {
    dst[0] = ((edge.left(0) + 2 * dc + edge.top(0) + 2) >> 2) as u8;
    for x in 1..n {
      dst[x] = ((edge.top(x as isize) + 3 * dc + 2) >> 2) as u8;
    }
    for y in 1..n {
      dst[y * n] = ((edge.left(y as isize) + 3 * dc + 2) >> 2) as u8;
    }
  }
}

fn pred_angular(
  mode: IntraPredMode, edge: &IntraEdge, n: usize, edge_filters: bool,
  dst: &mut [u8],
) {
  let m = mode.index();
  let angle = INTRA_PRED_ANGLE[m] as isize;
  let vertical = m >= 18;
  let ni = n as isize;

  // main reference indexed from -n to 2n
  let main =
    |i: isize| if vertical { edge.top(i - 1) } else { edge.left(i - 1) };
  let side =
    |i: isize| if vertical { edge.left(i - 1) } else { edge.top(i - 1) };
  let mut refs = vec![0i32; 3 * n + 1];
  let at = |i: isize| (i + ni) as usize;
  for i in 0..=ni {
    refs[at(i)] = main(i);
  }
  if angle < 0 {
    let last = (ni * angle) >> 5;
    if last < -1 {
      let inv_angle = INV_ANGLE[m - 11] as isize;
      for i in last..=-1 {
        refs[at(i)] = side((i * inv_angle + 128) >> 8);
      }
    }
  } else {
    for i in ni + 1..=2 * ni {
      refs[at(i)] = main(i);
    }
  }

  for j in 0..n {
    let pos = (j as isize + 1) * angle;
    let idx = pos >> 5;
    let fact = (pos & 31) as i32;
    for k in 0..n {
      let r = at(k as isize + idx + 1);
      let v = if fact != 0 {
        ((32 - fact) * refs[r] + fact * refs[r + 1] + 16) >> 5
      } else {
        refs[r]
      };
      let (x, y) = if vertical { (k, j) } else { (j, k) };
      dst[y * n + x] = v as u8;
    }
  }

  if edge_filters {
    let corner = edge.top(-1);
    if mode == IntraPredMode::VERTICAL {
      for y in 0..n {
        let delta = (edge.left(y as isize) - corner) >> 1;
        dst[y * n] = clip_pixel(edge.top(0) + delta);
      }
    } else if mode == IntraPredMode::HORIZONTAL {
      for x in 0..n {
        let delta = (edge.top(x as isize) - corner) >> 1;
        dst[x] = clip_pixel(edge.left(0) + delta);
      }
    }
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use rand::{Rng, SeedableRng};
  use rand_chacha::ChaChaRng;

  fn random_plane(seed: u8) -> Plane {
    let mut ra = ChaChaRng::from_seed([seed; 32]);
    Plane::wrap((0..32 * 32).map(|_| ra.gen()).collect(), 32)
  }

  #[test]
  fn unavailable_edges_predict_mid_grey() {
    let rec = random_plane(1);
    let edge = IntraEdge::new(&rec, 8, 8, 3, |_, _| false);
    let mut dst = [0u8; 64];
    for mode in IntraPredMode::iter() {
      let e = if use_smoothed_edge(mode, 3, true) {
        edge.smoothed()
      } else {
        edge.clone()
      };
      predict_intra(mode, &e, 3, true, &mut dst);
      assert!(dst.iter().all(|&v| v == 128), "mode {mode:?}");
    }
  }

  #[test]
  fn missing_left_column_is_substituted_from_corner() {
    let rec = random_plane(2);
    let edge = IntraEdge::new(&rec, 8, 8, 2, |_, y| y < 8);
    let corner = rec.p(7, 7) as i32;
    assert_eq!(edge.top(-1), corner);
    for y in 0..8 {
      assert_eq!(edge.left(y), corner);
    }
    assert_eq!(edge.top(5), rec.p(13, 7) as i32);
  }

  #[test]
  fn vertical_copies_the_row_above() {
    let mut rec = random_plane(3);
    // flat left column so the boundary filter is a no-op
    let corner = rec.p(7, 7);
    for y in 8..24 {
      rec.data[y * 32 + 7] = corner;
    }
    let edge = IntraEdge::new(&rec, 8, 8, 3, |x, y| x < 8 || y < 8);
    let mut dst = [0u8; 64];
    predict_intra(IntraPredMode::VERTICAL, &edge, 3, true, &mut dst);
    for row in dst.chunks_exact(8) {
      assert_eq!(row, &rec.row(7)[8..16]);
    }
  }

  #[test]
  fn horizontal_copies_the_left_column_in_chroma() {
    let rec = random_plane(4);
    let edge = IntraEdge::new(&rec, 4, 4, 2, |x, y| x < 4 || y < 4);
    let mut dst = [0u8; 16];
    predict_intra(IntraPredMode::HORIZONTAL, &edge, 2, false, &mut dst);
    for (y, row) in dst.chunks_exact(4).enumerate() {
      assert!(row.iter().all(|&v| v == rec.p(3, 4 + y)));
    }
  }

  #[test]
  fn planar_of_flat_edge_is_flat() {
    let mut rec = Plane::new(32, 32, 0, 0);
    rec.fill(77);
    // the whole edge of the 8x8 block lies inside the plane
    let edge = IntraEdge::new(&rec, 8, 8, 3, |x, y| {
      (0..32).contains(&x) && (0..32).contains(&y) && (x < 8 || y < 8)
    });
    let mut dst = [0u8; 64];
    predict_intra(Planar, &edge.smoothed(), 3, true, &mut dst);
    assert!(dst.iter().all(|&v| v == 77));
  }

  #[test]
  fn smoothing_thresholds() {
    assert!(!use_smoothed_edge(Planar, 2, true));
    assert!(use_smoothed_edge(Planar, 3, true));
    assert!(!use_smoothed_edge(Dc, 5, true));
    assert!(!use_smoothed_edge(Angular33, 3, true));
    assert!(use_smoothed_edge(Angular34, 3, true));
    assert!(use_smoothed_edge(Angular11, 5, true));
    assert!(!use_smoothed_edge(Angular11, 4, true));
    assert!(!use_smoothed_edge(Angular34, 5, false));
  }

  #[test]
  fn mode_indices_round_trip() {
    assert_eq!(IntraPredMode::iter().count(), NUM_INTRA_PRED_MODES);
    assert_eq!(IntraPredMode::from_index(26), Some(IntraPredMode::VERTICAL));
    assert_eq!(IntraPredMode::from_index(35), None);
  }
}
