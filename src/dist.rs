// Copyright (c) 2019-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use crate::frame::Plane;
use crate::serialize::{Deserialize, Serialize};

/// Distortion measure between source samples and a prediction or
/// reconstruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DistortionMetric {
  /// Sum of absolute differences.
  Sad,
  /// Sum of squared errors.
  Sse,
}

impl DistortionMetric {
  /// Distortion of the row-major `w`x`h` `block` against the area of `src`
  /// at (`x`, `y`).
  #[inline]
  pub fn block_distortion(
    self, src: &Plane, x: usize, y: usize, block: &[u8], w: usize, h: usize,
  ) -> u64 {
    match self {
      DistortionMetric::Sad => get_sad(src, x, y, block, w, h),
      DistortionMetric::Sse => get_sse(src, x, y, block, w, h),
    }
  }

  /// Distortion between the co-located `w`x`h` areas of two planes.
  pub fn plane_distortion(
    self, a: &Plane, b: &Plane, x: usize, y: usize, w: usize, h: usize,
  ) -> u64 {
    (y..y + h)
      .map(|row| {
        let ra = &a.row(row)[x..x + w];
        let rb = &b.row(row)[x..x + w];
        match self {
          DistortionMetric::Sad => sad_row(ra, rb),
          DistortionMetric::Sse => sse_row(ra, rb),
        }
      })
      .sum()
  }
}

#[inline(always)]
fn sad_row(a: &[u8], b: &[u8]) -> u64 {
  a.iter()
    .zip(b)
    .map(|(&a, &b)| (a as i32 - b as i32).unsigned_abs() as u64)
    .sum()
}

#[inline(always)]
fn sse_row(a: &[u8], b: &[u8]) -> u64 {
  a.iter()
    .zip(b)
    .map(|(&a, &b)| {
      let d = a as i32 - b as i32;
      (d * d) as u64
    })
    .sum()
}

pub fn get_sad(
  src: &Plane, x: usize, y: usize, block: &[u8], w: usize, h: usize,
) -> u64 {
  block
    .chunks_exact(w)
    .take(h)
    .enumerate()
    .map(|(j, blk_row)| sad_row(&src.row(y + j)[x..x + w], blk_row))
    .sum()
}

pub fn get_sse(
  src: &Plane, x: usize, y: usize, block: &[u8], w: usize, h: usize,
) -> u64 {
  block
    .chunks_exact(w)
    .take(h)
    .enumerate()
    .map(|(j, blk_row)| sse_row(&src.row(y + j)[x..x + w], blk_row))
    .sum()
}

/// PSNR of an 8-bit plane pair given their total squared error.
pub fn psnr(sse: u64, num_samples: usize) -> f64 {
  if sse == 0 {
    return 100.0;
  }
  let mse = sse as f64 / num_samples as f64;
  10.0 * (255.0 * 255.0 / mse).log10()
}

#[cfg(test)]
mod test {
  use super::*;

  fn ramp_plane() -> Plane {
    Plane::wrap((0..64u8).collect(), 8)
  }

  #[test]
  fn sad_and_sse_of_offset_block() {
    let src = ramp_plane();
    let block: Vec<u8> = (0..4)
      .flat_map(|j| (0..4).map(move |i| (j + 2) * 8 + i + 2 + 3))
      .collect();
    assert_eq!(get_sad(&src, 2, 2, &block, 4, 4), 16 * 3);
    assert_eq!(get_sse(&src, 2, 2, &block, 4, 4), 16 * 9);
  }

  #[test]
  fn plane_distortion_matches_block_distortion() {
    let a = ramp_plane();
    let mut b = ramp_plane();
    b.write_block(4, 4, 2, &[0, 0, 0, 0]);
    let blk: Vec<u8> = b.save_rect(0, 0, 8, 8);
    for metric in [DistortionMetric::Sad, DistortionMetric::Sse] {
      assert_eq!(
        metric.plane_distortion(&a, &b, 0, 0, 8, 8),
        metric.block_distortion(&a, 0, 0, &blk, 8, 8)
      );
    }
  }

  #[test]
  fn psnr_of_identical_planes_is_capped() {
    assert_eq!(psnr(0, 64), 100.0);
    assert!((psnr(64, 64) - 48.1308).abs() < 1e-3);
  }
}
