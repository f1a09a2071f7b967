// Copyright (c) 2017-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use crate::error::*;
use clap::{Parser, ValueEnum};
use hevc_rdo::prelude::*;

use std::fs::File;
use std::io;
use std::io::prelude::*;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
  name = "hevc-rdo",
  version,
  about = "Rate-distortion search of HEVC intra coding trees"
)]
pub struct CliOptions {
  /// Uncompressed YUV4MPEG2 video input, `-` for stdin
  #[arg(value_parser, help_heading = "INPUT/OUTPUT")]
  pub input: PathBuf,
  /// Write the reconstructed frames to this y4m file
  #[arg(long, short, value_parser, help_heading = "INPUT/OUTPUT")]
  pub reconstruction: Option<PathBuf>,
  /// Print the chosen coding tree of every coding-tree block
  #[arg(long, help_heading = "INPUT/OUTPUT")]
  pub dump_tree: bool,
  /// Maximum number of frames to encode, 0 for all
  #[arg(long, short, default_value_t = 0, help_heading = "INPUT/OUTPUT")]
  pub limit: usize,

  /// Quantizer of every coding-tree block
  #[arg(
    long,
    default_value_t = 27,
    value_parser = clap::value_parser!(u8).range(0..=51)
  )]
  pub qp: u8,
  /// Slice QP relative to the picture QP
  #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
  pub slice_qp_delta: i8,
  /// Coding-tree block size
  #[arg(long, default_value_t = 64)]
  pub ctb_size: usize,
  /// Smallest coding block size
  #[arg(long, default_value_t = 8)]
  pub min_cb_size: usize,
  /// Deepest coding-tree level searched
  #[arg(long, default_value_t = 3)]
  pub max_depth: usize,
  /// How leaf coding blocks are partitioned into prediction units
  #[arg(long, value_enum, default_value_t = PartModeAlgoArg::BruteForce)]
  pub part_mode: PartModeAlgoArg,
  /// Partitioning used by `--part-mode fixed`
  #[arg(long, value_enum, default_value_t = PartModeArg::P2Nx2N)]
  pub fixed_part_mode: PartModeArg,
  /// Distortion of the intra mode search
  #[arg(long, value_enum, default_value_t = MetricArg::Sad)]
  pub mode_metric: MetricArg,
  /// Distortion of the rate-distortion costs
  #[arg(long, value_enum, default_value_t = MetricArg::Sse)]
  pub rd_metric: MetricArg,

  /// Number of threads, 0 for one per core
  #[arg(long, default_value_t = 0, help_heading = "THREADING")]
  pub threads: usize,
  /// Verbose logging, also reports every coding-tree block
  #[arg(long, short)]
  pub verbose: bool,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum PartModeAlgoArg {
  BruteForce,
  Fixed,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum PartModeArg {
  #[value(name = "2Nx2N")]
  P2Nx2N,
  #[value(name = "NxN")]
  PNxN,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum MetricArg {
  Sad,
  Sse,
}

impl From<MetricArg> for DistortionMetric {
  fn from(metric: MetricArg) -> Self {
    match metric {
      MetricArg::Sad => DistortionMetric::Sad,
      MetricArg::Sse => DistortionMetric::Sse,
    }
  }
}

fn log2(size: usize, opt: &str) -> Result<usize, CliError> {
  if !size.is_power_of_two() {
    return Err(CliError::new(&format!("--{opt} must be a power of two")));
  }
  Ok(size.trailing_zeros() as usize)
}

impl CliOptions {
  /// Settings of the search. The picture format is filled in from the
  /// input stream.
  pub fn encoder_config(&self) -> Result<EncoderConfig, CliError> {
    Ok(EncoderConfig {
      qp: self.qp,
      slice_qp_delta: self.slice_qp_delta,
      log2_ctb_size: log2(self.ctb_size, "ctb-size")?,
      log2_min_cb_size: log2(self.min_cb_size, "min-cb-size")?,
      max_depth: self.max_depth,
      intra_part_mode_algo: match self.part_mode {
        PartModeAlgoArg::BruteForce => IntraPartModeAlgo::BruteForce,
        PartModeAlgoArg::Fixed => IntraPartModeAlgo::Fixed,
      },
      fixed_part_mode: match self.fixed_part_mode {
        PartModeArg::P2Nx2N => PartMode::Part2Nx2N,
        PartModeArg::PNxN => PartMode::PartNxN,
      },
      mode_decision_metric: self.mode_metric.into(),
      rd_metric: self.rd_metric.into(),
      ..Default::default()
    })
  }

  pub fn open_input(&self) -> Result<Box<dyn Read>, CliError> {
    Ok(match self.input.to_str() {
      Some("-") => Box::new(io::stdin()) as Box<dyn Read>,
      _ => Box::new(
        File::open(&self.input).map_err(|e| e.context("Cannot open input"))?,
      ) as Box<dyn Read>,
    })
  }

  pub fn create_reconstruction(
    &self,
  ) -> Result<Option<Box<dyn Write>>, CliError> {
    self
      .reconstruction
      .as_ref()
      .map(|path| {
        File::create(path)
          .map(|f| Box::new(io::BufWriter::new(f)) as Box<dyn Write>)
          .map_err(|e| e.context("Cannot create reconstruction file"))
      })
      .transpose()
  }
}

pub fn parse_cli() -> CliOptions {
  CliOptions::parse()
}
