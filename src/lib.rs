// Copyright (c) 2017-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

//! hevc-rdo is the coding-tree search engine of an HEVC intra encoder.
//!
//! For every coding-tree block of a picture it decides the quantizer, the
//! quad-tree split structure and the intra partition mode of every leaf by
//! trial-encoding the candidates and keeping the one with the lowest
//! rate-distortion cost.
//!
//! The search is organized as three pluggable stages:
//!
//! - [`CtbQScale`] picks the QP of a coding-tree block,
//! - [`CbSplit`] decides whether a coding block is split into four,
//! - [`CbIntraPartMode`] decides between one 2Nx2N and four NxN prediction
//!   units for a leaf.
//!
//! [`EncodingAlgorithmCustom`] owns one instance of each and wires them
//! together. Most users go through [`Config`] and [`Encoder`]:
//!
//! ```
//! use hevc_rdo::prelude::*;
//!
//! let enc = EncoderConfig { width: 64, height: 64, ..Default::default() };
//! let cfg = Config::new().with_encoder_config(enc);
//! let encoder = cfg.new_encoder().unwrap();
//! let mut frame = Frame::new(64, 64, ChromaSampling::Cs420);
//! frame.fill(128, 128, 128);
//! let encoded = encoder.encode_frame(&frame).unwrap();
//! assert_eq!(encoded.ctbs.len(), 1);
//! ```
//!
//! [`CtbQScale`]: analyze::CtbQScale
//! [`CbSplit`]: analyze::CbSplit
//! [`CbIntraPartMode`]: analyze::CbIntraPartMode
//! [`EncodingAlgorithmCustom`]: analyze::EncodingAlgorithmCustom

#![deny(bare_trait_objects)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::upper_case_acronyms)]
#![warn(clippy::expl_impl_clone_on_copy)]
#![warn(clippy::linkedlist)]
#![warn(clippy::map_flatten)]
#![warn(clippy::mem_forget)]
#![warn(clippy::mut_mut)]
#![warn(clippy::needless_borrow)]
#![warn(clippy::needless_continue)]
#![warn(clippy::path_buf_push_overwrite)]
#![warn(clippy::range_plus_one)]

#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;

mod serialize {
  cfg_if::cfg_if! {
    if #[cfg(feature="serialize")] {
      pub use serde::*;
    } else {
      pub use noop_proc_macro::{Deserialize, Serialize};
    }
  }
}

pub mod analyze;
pub mod context;
pub mod dist;
pub mod ec;
pub mod encoder;
pub mod frame;
pub mod predict;
pub mod quantize;
pub mod rdo;
pub mod transform;

mod api;

pub use crate::api::*;

/// Commonly used types and traits.
pub mod prelude {
  pub use crate::analyze::*;
  pub use crate::api::*;
  pub use crate::dist::DistortionMetric;
  pub use crate::encoder::{
    CbKind, CodingBlock, EncodedFrame, EncoderContext, FrameSummary,
    IntraLeaf, PartMode, SequenceParameters, SequenceSummary,
  };
  pub use crate::frame::*;
  pub use crate::predict::IntraPredMode;
}
