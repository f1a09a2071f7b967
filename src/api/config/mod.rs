// Copyright (c) 2020-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use thiserror::Error;

use crate::analyze::EncodingAlgorithmCustom;
use crate::api::{Encoder, EncoderError};
use crate::encoder::SequenceParameters;
use crate::quantize::MAX_QP;

mod encoder;
pub use encoder::*;

/// Largest supported picture dimension.
pub(crate) const MAX_DIMENSION: usize = 8192;

/// Enumeration of possible invalid configuration errors.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Error)]
#[non_exhaustive]
pub enum InvalidConfig {
  /// The width is invalid.
  #[error("invalid width {0} (expected >= 1, <= 8192)")]
  InvalidWidth(usize),
  /// The height is invalid.
  #[error("invalid height {0} (expected >= 1, <= 8192)")]
  InvalidHeight(usize),
  /// The picture is not made of whole smallest coding blocks.
  #[error(
    "frame size {width}x{height} is not a multiple of the minimum coding \
     block size {min_cb_size}"
  )]
  UnalignedFrameSize {
    /// The width.
    width: usize,
    /// The height.
    height: usize,
    /// The minimum coding block size.
    min_cb_size: usize,
  },
  /// The quantizer is invalid.
  #[error("invalid qp {0} (expected <= 51)")]
  InvalidQp(u8),
  /// The slice quantizer is invalid.
  #[error("invalid slice qp {qp} + {delta} (expected 0..=51)")]
  InvalidSliceQpDelta {
    /// The picture quantizer.
    qp: u8,
    /// The delta.
    delta: i8,
  },
  /// The coding-tree block size is invalid.
  #[error("invalid coding-tree block size {0} (expected 16, 32 or 64)")]
  InvalidCtbSize(usize),
  /// The minimum coding block size is invalid.
  #[error(
    "invalid minimum coding block size {actual} (expected >= 8, <= {max})"
  )]
  InvalidMinCbSize {
    /// The actual value.
    actual: usize,
    /// The maximal supported value.
    max: usize,
  },
}

/// Contains the encoder configuration.
#[derive(Clone, Debug, Default)]
pub struct Config {
  /// Settings which impact the coded pictures.
  pub(crate) enc: EncoderConfig,
  /// The number of threads in the threadpool.
  pub(crate) threads: usize,
}

impl Config {
  /// Create a default configuration
  ///
  /// same as `Default::default()`
  pub fn new() -> Self {
    Config::default()
  }

  /// Set the encoder configuration
  pub fn with_encoder_config(mut self, enc: EncoderConfig) -> Self {
    self.enc = enc;
    self
  }

  /// Set the number of workers in the threadpool
  ///
  /// If it is left unset, the encoder will use the default global
  /// threadpool provided by Rayon instead.
  pub const fn with_threads(mut self, threads: usize) -> Self {
    self.threads = threads;
    self
  }

  /// The encoder configuration.
  pub const fn encoder_config(&self) -> &EncoderConfig {
    &self.enc
  }

  /// Validates the configuration.
  ///
  /// # Errors
  ///
  /// - Returns `InvalidConfig` if any setting is out of range.
  pub fn validate(&self) -> Result<(), InvalidConfig> {
    use InvalidConfig::*;

    let config = &self.enc;

    if config.width == 0 || config.width > MAX_DIMENSION {
      return Err(InvalidWidth(config.width));
    }
    if config.height == 0 || config.height > MAX_DIMENSION {
      return Err(InvalidHeight(config.height));
    }

    if config.qp > MAX_QP {
      return Err(InvalidQp(config.qp));
    }
    let slice_qp = config.qp as i32 + config.slice_qp_delta as i32;
    if !(0..=MAX_QP as i32).contains(&slice_qp) {
      return Err(InvalidSliceQpDelta {
        qp: config.qp,
        delta: config.slice_qp_delta,
      });
    }

    if !(4..=6).contains(&config.log2_ctb_size) {
      return Err(InvalidCtbSize(
        1usize.checked_shl(config.log2_ctb_size as u32).unwrap_or(0),
      ));
    }
    if !(3..=config.log2_ctb_size).contains(&config.log2_min_cb_size) {
      return Err(InvalidMinCbSize {
        actual: 1usize
          .checked_shl(config.log2_min_cb_size as u32)
          .unwrap_or(0),
        max: 1 << config.log2_ctb_size,
      });
    }

    // coding blocks straddling the picture edge are split implicitly, which
    // must be possible down to the smallest leaf
    let min_cb_size = config.min_leaf_size();
    if config.width % min_cb_size != 0 || config.height % min_cb_size != 0 {
      return Err(UnalignedFrameSize {
        width: config.width,
        height: config.height,
        min_cb_size,
      });
    }

    Ok(())
  }

  /// Creates an [`Encoder`] with this configuration.
  ///
  /// # Errors
  ///
  /// Returns `InvalidConfig` if the config is invalid, or a thread pool
  /// error if the requested workers cannot be spawned.
  ///
  /// # Examples
  ///
  /// ```
  /// use hevc_rdo::prelude::*;
  ///
  /// # fn main() -> Result<(), EncoderError> {
  /// let cfg = Config::default();
  /// let encoder = cfg.new_encoder()?;
  /// # Ok(())
  /// # }
  /// ```
  pub fn new_encoder(&self) -> Result<Encoder, EncoderError> {
    self.validate()?;

    let seq = SequenceParameters::new(&self.enc);
    let mut algo = EncodingAlgorithmCustom::new();
    algo.set_params(&self.enc);
    info!("using {}", self.enc);

    #[allow(unused_mut)]
    let mut encoder = Encoder::new(seq, algo);
    #[cfg(feature = "threading")]
    {
      encoder.pool = self.new_thread_pool()?;
    }
    Ok(encoder)
  }

  /// Create a new threadpool with this configuration if set,
  /// or return `None` if global threadpool should be used instead.
  #[cfg(feature = "threading")]
  fn new_thread_pool(
    &self,
  ) -> Result<Option<rayon::ThreadPool>, EncoderError> {
    if self.threads == 0 {
      return Ok(None);
    }
    let pool =
      rayon::ThreadPoolBuilder::new().num_threads(self.threads).build()?;
    Ok(Some(pool))
  }
}
