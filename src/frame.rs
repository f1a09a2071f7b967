// Copyright (c) 2017-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use arrayvec::ArrayVec;

use crate::serialize::{Deserialize, Serialize};

use std::fmt;

/// Chroma subsampling format
#[derive(
  Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize,
)]
pub enum ChromaSampling {
  /// Both vertically and horizontally subsampled.
  #[default]
  Cs420,
  /// Monochrome.
  Cs400,
}

impl ChromaSampling {
  /// Provides the amount to right shift the luma plane dimensions to get the
  /// chroma plane dimensions.
  /// Only values 0 or 1 are ever returned.
  /// `None` is returned for monochrome.
  pub const fn get_decimation(self) -> Option<(usize, usize)> {
    use self::ChromaSampling::*;
    match self {
      Cs420 => Some((1, 1)),
      Cs400 => None,
    }
  }

  /// Calculates the size of a chroma plane for this sampling type, given the
  /// luma plane dimensions.
  pub const fn get_chroma_dimensions(
    self, luma_width: usize, luma_height: usize,
  ) -> (usize, usize) {
    if let Some((ss_x, ss_y)) = self.get_decimation() {
      ((luma_width + ss_x) >> ss_x, (luma_height + ss_y) >> ss_y)
    } else {
      (0, 0)
    }
  }

  /// Number of planes carried by a frame of this sampling type.
  pub const fn num_planes(self) -> usize {
    match self {
      ChromaSampling::Cs420 => 3,
      ChromaSampling::Cs400 => 1,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaneConfig {
  pub stride: usize,
  pub width: usize,
  pub height: usize,
  pub xdec: usize,
  pub ydec: usize,
}

/// An 8-bit sample plane.
#[derive(Clone, PartialEq, Eq)]
pub struct Plane {
  pub data: Vec<u8>,
  pub cfg: PlaneConfig,
}

impl fmt::Debug for Plane {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Plane").field("cfg", &self.cfg).finish_non_exhaustive()
  }
}

impl Plane {
  pub fn new(width: usize, height: usize, xdec: usize, ydec: usize) -> Self {
    Plane {
      data: vec![0; width * height],
      cfg: PlaneConfig { stride: width, width, height, xdec, ydec },
    }
  }

  /// Wraps a buffer of `stride`-wide rows as a full resolution plane.
  pub fn wrap(data: Vec<u8>, stride: usize) -> Self {
    let len = data.len();
    assert!(stride > 0 && len % stride == 0);
    Plane {
      data,
      cfg: PlaneConfig {
        stride,
        width: stride,
        height: len / stride,
        xdec: 0,
        ydec: 0,
      },
    }
  }

  #[inline(always)]
  pub fn p(&self, x: usize, y: usize) -> u8 {
    self.data[y * self.cfg.stride + x]
  }

  #[inline]
  pub fn row(&self, y: usize) -> &[u8] {
    let start = y * self.cfg.stride;
    &self.data[start..start + self.cfg.width]
  }

  #[inline]
  pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
    let start = y * self.cfg.stride;
    let width = self.cfg.width;
    &mut self.data[start..start + width]
  }

  pub fn fill(&mut self, value: u8) {
    self.data.fill(value);
  }

  pub fn copy_from_raw_u8(&mut self, source: &[u8], source_stride: usize) {
    let width = self.cfg.width;
    for (self_row, source_row) in self
      .data
      .chunks_exact_mut(self.cfg.stride)
      .zip(source.chunks(source_stride))
    {
      let w = width.min(source_row.len());
      self_row[..w].copy_from_slice(&source_row[..w]);
    }
  }

  /// Returns the `w`x`h` area at (`x`, `y`), clipped to the plane, row by
  /// row.
  pub fn save_rect(&self, x: usize, y: usize, w: usize, h: usize) -> Vec<u8> {
    let w = w.min(self.cfg.width.saturating_sub(x));
    let h = h.min(self.cfg.height.saturating_sub(y));
    let mut saved = Vec::with_capacity(w * h);
    for row in y..y + h {
      saved.extend_from_slice(&self.row(row)[x..x + w]);
    }
    saved
  }

  /// Writes back an area saved with [`Plane::save_rect`] using the same
  /// arguments.
  pub fn restore_rect(
    &mut self, x: usize, y: usize, w: usize, h: usize, saved: &[u8],
  ) {
    let w = w.min(self.cfg.width.saturating_sub(x));
    let h = h.min(self.cfg.height.saturating_sub(y));
    if w == 0 {
      return;
    }
    debug_assert_eq!(saved.len(), w * h);
    for (row, src) in (y..y + h).zip(saved.chunks_exact(w)) {
      self.row_mut(row)[x..x + w].copy_from_slice(src);
    }
  }

  /// Stores a square `n`x`n` block of samples, which must lie inside the
  /// plane.
  pub fn write_block(&mut self, x: usize, y: usize, n: usize, block: &[u8]) {
    assert!(x + n <= self.cfg.width && y + n <= self.cfg.height);
    for (row, src) in (y..y + n).zip(block.chunks_exact(n)) {
      self.row_mut(row)[x..x + n].copy_from_slice(src);
    }
  }
}

/// A picture: one luma plane and, unless monochrome, two chroma planes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
  pub planes: ArrayVec<Plane, 3>,
  chroma_sampling: ChromaSampling,
}

impl Frame {
  pub fn new(
    width: usize, height: usize, chroma_sampling: ChromaSampling,
  ) -> Self {
    let mut planes = ArrayVec::new();
    planes.push(Plane::new(width, height, 0, 0));
    if let Some((xdec, ydec)) = chroma_sampling.get_decimation() {
      let (cw, ch) = chroma_sampling.get_chroma_dimensions(width, height);
      planes.push(Plane::new(cw, ch, xdec, ydec));
      planes.push(Plane::new(cw, ch, xdec, ydec));
    }
    Frame { planes, chroma_sampling }
  }

  #[inline]
  pub fn width(&self) -> usize {
    self.planes[0].cfg.width
  }

  #[inline]
  pub fn height(&self) -> usize {
    self.planes[0].cfg.height
  }

  #[inline]
  pub const fn chroma_sampling(&self) -> ChromaSampling {
    self.chroma_sampling
  }

  /// Sets every sample of each plane to a constant.
  pub fn fill(&mut self, y: u8, u: u8, v: u8) {
    for (plane, value) in self.planes.iter_mut().zip([y, u, v]) {
      plane.fill(value);
    }
  }
}
