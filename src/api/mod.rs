// Copyright (c) 2018-2019, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.
#![deny(missing_docs)]

/// Encoder Configuration
pub mod config;

#[cfg(test)]
mod test;

pub use config::*;

use thiserror::Error;

use crate::analyze::{EncodingAlgorithm, EncodingAlgorithmCustom};
use crate::encoder::*;
use crate::frame::*;

/// Errors reported while setting up or running the encoder.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EncoderError {
  /// The configuration is not usable.
  #[error("invalid configuration: {0}")]
  InvalidConfig(#[from] InvalidConfig),
  /// A frame does not have the configured format.
  #[error(
    "frame {frameno} is {width}x{height} {chroma_sampling:?}, expected \
     {expected_width}x{expected_height} {expected_chroma_sampling:?}"
  )]
  FrameMismatch {
    /// Position of the frame in the input.
    frameno: usize,
    /// Width of the frame.
    width: usize,
    /// Height of the frame.
    height: usize,
    /// Chroma sampling of the frame.
    chroma_sampling: ChromaSampling,
    /// Configured width.
    expected_width: usize,
    /// Configured height.
    expected_height: usize,
    /// Configured chroma sampling.
    expected_chroma_sampling: ChromaSampling,
  },
  /// The worker threads could not be started.
  #[cfg(feature = "threading")]
  #[error("cannot build the thread pool: {0}")]
  ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Searches the coding trees of pictures with a fixed configuration.
///
/// Created with [`Config::new_encoder`].
#[derive(Debug)]
pub struct Encoder {
  seq: SequenceParameters,
  algo: EncodingAlgorithmCustom,
  #[cfg(feature = "threading")]
  pub(crate) pool: Option<rayon::ThreadPool>,
}

impl Encoder {
  pub(crate) fn new(
    seq: SequenceParameters, algo: EncodingAlgorithmCustom,
  ) -> Self {
    Encoder {
      seq,
      algo,
      #[cfg(feature = "threading")]
      pool: None,
    }
  }

  /// The parameters shared by every picture.
  pub const fn sequence_parameters(&self) -> &SequenceParameters {
    &self.seq
  }

  /// The search the encoder runs.
  pub fn algorithm(&self) -> &dyn EncodingAlgorithm {
    &self.algo
  }

  fn check_frame(
    &self, frameno: usize, frame: &Frame,
  ) -> Result<(), EncoderError> {
    if frame.width() != self.seq.width
      || frame.height() != self.seq.height
      || frame.chroma_sampling() != self.seq.chroma_sampling
    {
      return Err(EncoderError::FrameMismatch {
        frameno,
        width: frame.width(),
        height: frame.height(),
        chroma_sampling: frame.chroma_sampling(),
        expected_width: self.seq.width,
        expected_height: self.seq.height,
        expected_chroma_sampling: self.seq.chroma_sampling,
      });
    }
    Ok(())
  }

  /// Codes one picture as an intra picture with its own slice.
  ///
  /// # Errors
  ///
  /// Returns `EncoderError::FrameMismatch` if the frame does not have the
  /// configured size and chroma sampling.
  pub fn encode_frame(
    &self, frame: &Frame,
  ) -> Result<EncodedFrame, EncoderError> {
    self.check_frame(0, frame)?;
    Ok(encode_picture(&self.seq, &self.algo, 0, frame))
  }

  /// Codes every picture of a sequence, each one independently. The
  /// results keep the order of `frames`.
  ///
  /// # Errors
  ///
  /// Returns `EncoderError::FrameMismatch` for the first frame that does
  /// not have the configured format; nothing is coded in that case.
  pub fn encode_sequence(
    &self, frames: &[Frame],
  ) -> Result<Vec<EncodedFrame>, EncoderError> {
    for (frameno, frame) in frames.iter().enumerate() {
      self.check_frame(frameno, frame)?;
    }
    let encode = || encode_frames(&self.seq, &self.algo, frames);
    #[cfg(feature = "threading")]
    let encoded = match &self.pool {
      Some(pool) => pool.install(encode),
      None => encode(),
    };
    #[cfg(not(feature = "threading"))]
    let encoded = encode();
    Ok(encoded)
  }
}

/// Validates `config`, then codes `frames` and sums up the result.
///
/// # Errors
///
/// Returns an `EncoderError` if the configuration is invalid or a frame
/// does not match it.
pub fn encode_sequence(
  config: &EncoderConfig, frames: &[Frame],
) -> Result<SequenceSummary, EncoderError> {
  let encoder = Config::new().with_encoder_config(*config).new_encoder()?;
  let encoded = encoder.encode_sequence(frames)?;
  let summary: SequenceSummary =
    encoded.iter().map(|frame| &frame.summary).collect();
  info!("{}", summary);
  Ok(summary)
}
