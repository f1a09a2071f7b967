// Copyright (c) 2018-2021, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use std::io::{Read, Write};

use crate::decoder::{DecodeError, Decoder, VideoDetails};
use hevc_rdo::prelude::*;

impl Decoder for y4m::Decoder<Box<dyn Read>> {
  fn get_video_details(&self) -> VideoDetails {
    let framerate = self.get_framerate();
    VideoDetails {
      width: self.get_width(),
      height: self.get_height(),
      chroma_sampling: map_y4m_color_space(self.get_colorspace())
        .unwrap_or_default(),
      frame_rate: (framerate.num, framerate.den),
    }
  }

  fn read_frame(&mut self, cfg: &VideoDetails) -> Result<Frame, DecodeError> {
    let frame = y4m::Decoder::read_frame(self)?;
    let mut f = Frame::new(cfg.width, cfg.height, cfg.chroma_sampling);
    let sources =
      [frame.get_y_plane(), frame.get_u_plane(), frame.get_v_plane()];
    for (plane, source) in f.planes.iter_mut().zip(sources) {
      let stride = plane.cfg.width;
      plane.copy_from_raw_u8(source, stride);
    }
    Ok(f)
  }
}

impl From<y4m::Error> for DecodeError {
  fn from(e: y4m::Error) -> DecodeError {
    match e {
      y4m::Error::EOF => DecodeError::EOF,
      y4m::Error::BadInput => DecodeError::BadInput,
      y4m::Error::UnknownColorspace => DecodeError::UnknownColorspace,
      y4m::Error::ParseError(_) => DecodeError::ParseError,
      y4m::Error::IoError(e) => DecodeError::IoError(e),
      y4m::Error::OutOfMemory => DecodeError::MemoryLimitExceeded,
    }
  }
}

pub fn map_y4m_color_space(
  color_space: y4m::Colorspace,
) -> Result<ChromaSampling, DecodeError> {
  use y4m::Colorspace::*;
  match color_space {
    Cmono => Ok(ChromaSampling::Cs400),
    C420jpeg | C420paldv | C420mpeg2 | C420 => Ok(ChromaSampling::Cs420),
    _ => Err(DecodeError::UnsupportedColorspace),
  }
}

/// Writes reconstructed frames as y4m.
pub struct Y4mRecon<W: Write> {
  encoder: y4m::Encoder<W>,
}

impl<W: Write> Y4mRecon<W> {
  pub fn new(
    output: W, details: &VideoDetails,
  ) -> Result<Self, y4m::Error> {
    let colorspace = match details.chroma_sampling {
      ChromaSampling::Cs420 => y4m::Colorspace::C420jpeg,
      ChromaSampling::Cs400 => y4m::Colorspace::Cmono,
    };
    let (num, den) = details.frame_rate;
    let encoder =
      y4m::encode(details.width, details.height, y4m::Ratio::new(num, den))
        .with_colorspace(colorspace)
        .write_header(output)?;
    Ok(Y4mRecon { encoder })
  }

  pub fn write_frame(&mut self, rec: &Frame) -> Result<(), y4m::Error> {
    let planes: Vec<Vec<u8>> = rec
      .planes
      .iter()
      .map(|plane| {
        (0..plane.cfg.height)
          .flat_map(|y| plane.row(y)[..plane.cfg.width].iter().copied())
          .collect()
      })
      .collect();
    let empty = Vec::new();
    let plane = |i: usize| planes.get(i).unwrap_or(&empty).as_slice();
    let frame = y4m::Frame::new([plane(0), plane(1), plane(2)], None);
    self.encoder.write_frame(&frame)
  }
}
