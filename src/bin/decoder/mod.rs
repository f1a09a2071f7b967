// Copyright (c) 2001-2016, Alliance for Open Media. All rights reserved
// Copyright (c) 2017-2021, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use hevc_rdo::prelude::*;
use std::io;

pub mod y4m;

pub trait Decoder {
  fn get_video_details(&self) -> VideoDetails;
  fn read_frame(&mut self, cfg: &VideoDetails) -> Result<Frame, DecodeError>;
}

#[derive(Debug, thiserror::Error)]
#[allow(clippy::upper_case_acronyms)]
pub enum DecodeError {
  #[error("end of input")]
  EOF,
  #[error("bad y4m input parameters")]
  BadInput,
  #[error("unknown colorspace")]
  UnknownColorspace,
  #[error("only 8-bit 4:2:0 and monochrome input are supported")]
  UnsupportedColorspace,
  #[error("could not parse the y4m stream")]
  ParseError,
  #[error("{0}")]
  IoError(io::Error),
  #[error("the frame size exceeds the limit")]
  MemoryLimitExceeded,
}

#[derive(Debug, Clone, Copy)]
pub struct VideoDetails {
  pub width: usize,
  pub height: usize,
  pub chroma_sampling: ChromaSampling,
  /// Frames per second as a (numerator, denominator) pair.
  pub frame_rate: (usize, usize),
}

impl Default for VideoDetails {
  fn default() -> Self {
    VideoDetails {
      width: 640,
      height: 480,
      chroma_sampling: ChromaSampling::Cs420,
      frame_rate: (30, 1),
    }
  }
}
