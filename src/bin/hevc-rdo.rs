// Copyright (c) 2017-2023, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

// Safety lints
#![deny(bare_trait_objects)]
// Performance lints
#![warn(clippy::inefficient_to_string)]
#![warn(clippy::needless_collect)]
#![warn(clippy::or_fun_call)]
// Correctness lints
#![deny(clippy::expl_impl_clone_on_copy)]
#![deny(clippy::float_cmp)]
#![deny(clippy::manual_instant_elapsed)]
#![deny(clippy::path_buf_push_overwrite)]
// Clarity/formatting lints
#![warn(clippy::implicit_clone)]
#![warn(clippy::manual_let_else)]
#![warn(clippy::map_flatten)]

#[macro_use]
extern crate log;

mod common;
mod decoder;
mod error;

use crate::common::*;
use crate::decoder::y4m::{map_y4m_color_space, Y4mRecon};
use crate::decoder::{DecodeError, Decoder, VideoDetails};
use crate::error::*;
use hevc_rdo::prelude::*;

use std::process::exit;
use std::time::Instant;

fn main() {
  let cli = parse_cli();
  init_logger(cli.verbose);

  run(cli).unwrap_or_else(|e| {
    error::print_error(&e);
    exit(1);
  });
}

fn init_logger(verbose: bool) {
  use std::str::FromStr;
  fn level_colored(l: log::Level) -> console::StyledObject<&'static str> {
    use console::style;
    use log::Level;
    match l {
      Level::Trace => style("??").dim(),
      Level::Debug => style("? ").dim(),
      Level::Info => style("> ").green(),
      Level::Warn => style("! ").yellow(),
      Level::Error => style("!!").red(),
    }
  }

  let level = std::env::var("HEVC_RDO_LOG")
    .ok()
    .and_then(|l| log::LevelFilter::from_str(&l).ok())
    .unwrap_or(if verbose {
      log::LevelFilter::Debug
    } else {
      log::LevelFilter::Info
    });

  fern::Dispatch::new()
    .format(move |out, message, record| {
      out.finish(format_args!(
        "{level} {message}",
        level = level_colored(record.level()),
        message = message,
      ));
    })
    // dependencies only get to report warnings
    .level(log::LevelFilter::Warn)
    .level_for("hevc_rdo", level)
    .chain(std::io::stderr())
    .apply()
    .unwrap();
}

fn read_frames<D: Decoder>(
  decoder: &mut D, details: &VideoDetails, limit: usize,
) -> Result<Vec<Frame>, CliError> {
  let mut frames = Vec::new();
  while limit == 0 || frames.len() < limit {
    match decoder.read_frame(details) {
      Ok(frame) => frames.push(frame),
      Err(DecodeError::EOF) => break,
      Err(e) => return Err(e.context("Cannot read input frame")),
    }
  }
  Ok(frames)
}

fn run(cli: CliOptions) -> Result<(), CliError> {
  // largest supported picture plus the y4m headers
  let limits = y4m::Limits {
    bytes: 8192usize
      .saturating_mul(8192)
      .saturating_mul(3)
      .saturating_add(1024),
  };
  let mut y4m_dec =
    match y4m::Decoder::new_with_limits(cli.open_input()?, limits) {
      Err(e) => {
        return Err(CliError::new(match e {
          y4m::Error::ParseError(_) => {
            "Could not parse input video. Is it a y4m file?"
          }
          y4m::Error::IoError(_) => "Could not read input file.",
          y4m::Error::UnknownColorspace => "Unknown colorspace.",
          y4m::Error::OutOfMemory => {
            "The video's frame size exceeds the limit."
          }
          y4m::Error::EOF => "Unexpected end of input.",
          y4m::Error::BadInput => "Bad y4m input parameters provided.",
        }))
      }
      Ok(d) => d,
    };
  map_y4m_color_space(y4m_dec.get_colorspace())
    .map_err(|e| e.context("Unsupported input"))?;
  let video_info = y4m_dec.get_video_details();

  let mut enc = cli.encoder_config()?;
  enc.width = video_info.width;
  enc.height = video_info.height;
  enc.chroma_sampling = video_info.chroma_sampling;
  let cfg = Config::new().with_encoder_config(enc).with_threads(cli.threads);
  let encoder =
    cfg.new_encoder().map_err(|e| e.context("Invalid configuration"))?;

  info!(
    "Using y4m decoder: {}x{}p @ {}/{} fps, {:?}",
    video_info.width,
    video_info.height,
    video_info.frame_rate.0,
    video_info.frame_rate.1,
    video_info.chroma_sampling
  );

  let frames = read_frames(&mut y4m_dec, &video_info, cli.limit)?;
  let start = Instant::now();
  let encoded = encoder
    .encode_sequence(&frames)
    .map_err(|e| e.context("Encoding failed"))?;
  let elapsed = start.elapsed().as_secs_f64();

  let mut rec = match cli.create_reconstruction()? {
    Some(output) => Some(
      Y4mRecon::new(output, &video_info)
        .map_err(|e| e.context("Cannot write reconstruction header"))?,
    ),
    None => None,
  };
  for frame in &encoded {
    if cli.dump_tree {
      println!("frame {}", frame.summary.frameno);
      for ctb in &frame.ctbs {
        print!("{}", ctb);
      }
    }
    if let Some(rec) = rec.as_mut() {
      rec
        .write_frame(&frame.rec)
        .map_err(|e| e.context("Cannot write reconstruction"))?;
    }
  }

  let summary: SequenceSummary =
    encoded.iter().map(|frame| &frame.summary).collect();
  eprintln!("{}", summary);
  if elapsed > 0.0 {
    eprintln!(
      "encoded {} frames in {:.2}s ({:.2} fps)",
      summary.frames,
      elapsed,
      summary.frames as f64 / elapsed
    );
  }
  Ok(())
}
