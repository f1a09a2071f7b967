// Copyright (c) 2018-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use crate::analyze::test_util::test_frame;
use crate::prelude::*;

use interpolate_name::interpolate_test;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaChaRng;

fn setup_config(w: usize, h: usize) -> EncoderConfig {
  EncoderConfig { width: w, height: h, ..Default::default() }
}

fn validate(enc: EncoderConfig) -> Result<(), InvalidConfig> {
  Config::new().with_encoder_config(enc).validate()
}

#[test]
fn default_config_is_valid() {
  assert_eq!(Config::default().validate(), Ok(()));
}

#[test]
fn invalid_sizes() {
  use InvalidConfig::*;

  assert_eq!(validate(setup_config(0, 64)), Err(InvalidWidth(0)));
  assert_eq!(validate(setup_config(64, 0)), Err(InvalidHeight(0)));
  assert_eq!(validate(setup_config(8200, 64)), Err(InvalidWidth(8200)));
  assert_eq!(validate(setup_config(64, 8200)), Err(InvalidHeight(8200)));
  assert_eq!(
    validate(setup_config(100, 64)),
    Err(UnalignedFrameSize { width: 100, height: 64, min_cb_size: 8 })
  );
}

#[test]
fn picture_must_hold_whole_minimum_blocks() {
  // a shallow tree cannot reach 8x8 blocks
  let enc = EncoderConfig { max_depth: 1, ..setup_config(48, 48) };
  assert_eq!(
    validate(enc),
    Err(InvalidConfig::UnalignedFrameSize {
      width: 48,
      height: 48,
      min_cb_size: 32
    })
  );
  let enc = EncoderConfig { max_depth: 2, ..setup_config(48, 48) };
  assert_eq!(validate(enc), Ok(()));
}

#[test]
fn invalid_quantizers() {
  let enc = EncoderConfig { qp: 52, ..setup_config(64, 64) };
  assert_eq!(validate(enc), Err(InvalidConfig::InvalidQp(52)));

  let enc = EncoderConfig { qp: 40, slice_qp_delta: 12, ..enc };
  assert_eq!(
    validate(enc),
    Err(InvalidConfig::InvalidSliceQpDelta { qp: 40, delta: 12 })
  );
  let enc = EncoderConfig { qp: 3, slice_qp_delta: -4, ..enc };
  assert_eq!(
    validate(enc),
    Err(InvalidConfig::InvalidSliceQpDelta { qp: 3, delta: -4 })
  );
  let enc = EncoderConfig { qp: 3, slice_qp_delta: -3, ..enc };
  assert_eq!(validate(enc), Ok(()));
}

#[interpolate_test(ctb_8, 3, 3)]
#[interpolate_test(ctb_128, 7, 3)]
fn invalid_ctb_size(log2_ctb_size: usize, log2_min_cb_size: usize) {
  let enc =
    EncoderConfig { log2_ctb_size, log2_min_cb_size, ..setup_config(64, 64) };
  assert_eq!(
    validate(enc),
    Err(InvalidConfig::InvalidCtbSize(1 << log2_ctb_size))
  );
}

#[interpolate_test(min_cb_4, 5, 2)]
#[interpolate_test(min_cb_above_ctb, 5, 6)]
fn invalid_min_cb_size(log2_ctb_size: usize, log2_min_cb_size: usize) {
  let enc =
    EncoderConfig { log2_ctb_size, log2_min_cb_size, ..setup_config(64, 64) };
  assert_eq!(
    validate(enc),
    Err(InvalidConfig::InvalidMinCbSize {
      actual: 1 << log2_min_cb_size,
      max: 1 << log2_ctb_size
    })
  );
}

#[test]
fn invalid_config_fails_to_create_an_encoder() {
  let cfg = Config::new().with_encoder_config(setup_config(0, 64));
  assert!(matches!(
    cfg.new_encoder(),
    Err(EncoderError::InvalidConfig(InvalidConfig::InvalidWidth(0)))
  ));
}

#[test]
fn encoder_uses_the_configured_qp() {
  let enc = EncoderConfig { qp: 32, ..setup_config(64, 64) };
  let encoder = Config::new().with_encoder_config(enc).new_encoder().unwrap();
  assert_eq!(encoder.algorithm().pps_qp(), 32);
  assert_eq!(encoder.algorithm().slice_qp(), 32);

  let encoded = encoder.encode_frame(&test_frame(64, 64, 3)).unwrap();
  assert_eq!(encoded.summary.qp, 32);
  let mut cbs = encoded.ctbs.iter().flat_map(|ctb| ctb.iter());
  assert!(cbs.all(|cb| cb.qp == 32));
}

#[test]
fn default_picture_qp_is_27() {
  let encoder = Config::new().new_encoder().unwrap();
  assert_eq!(encoder.algorithm().pps_qp(), 27);
  assert_eq!(encoder.algorithm().slice_qp_delta(), 0);
}

#[test]
fn mismatched_frames_are_rejected() {
  let encoder = Config::new()
    .with_encoder_config(setup_config(64, 64))
    .new_encoder()
    .unwrap();

  let frame = test_frame(64, 32, 0);
  match encoder.encode_frame(&frame) {
    Err(EncoderError::FrameMismatch { frameno, width, height, .. }) => {
      assert_eq!((frameno, width, height), (0, 64, 32));
    }
    other => panic!("unexpected result {:?}", other.map(|e| e.summary)),
  }

  let mono = Frame::new(64, 64, ChromaSampling::Cs400);
  let frames = [test_frame(64, 64, 0), mono];
  match encoder.encode_sequence(&frames) {
    Err(EncoderError::FrameMismatch { frameno, chroma_sampling, .. }) => {
      assert_eq!(frameno, 1);
      assert_eq!(chroma_sampling, ChromaSampling::Cs400);
    }
    Err(e) => panic!("unexpected error {}", e),
    Ok(_) => panic!("mismatched frame was coded"),
  }
}

#[test]
fn sequence_summary_adds_up_frames() {
  let enc = setup_config(64, 64);
  let frames: Vec<_> = (0..3).map(|i| test_frame(64, 64, i)).collect();
  let summary = encode_sequence(&enc, &frames).unwrap();

  let encoder = Config::new().with_encoder_config(enc).new_encoder().unwrap();
  let encoded = encoder.encode_sequence(&frames).unwrap();
  assert_eq!(summary.frames, 3);
  assert_eq!(
    summary.bits,
    encoded.iter().map(|frame| frame.summary.bits).sum::<u64>()
  );
  assert_eq!(summary.psnr.len(), 3);
}

#[test]
fn sequence_does_not_depend_on_the_thread_count() {
  let enc = setup_config(32, 32);
  let frames: Vec<_> = (0..5).map(|i| test_frame(32, 32, i)).collect();

  let single = Config::new()
    .with_encoder_config(enc)
    .with_threads(1)
    .new_encoder()
    .unwrap()
    .encode_sequence(&frames)
    .unwrap();
  let multi = Config::new()
    .with_encoder_config(enc)
    .with_threads(3)
    .new_encoder()
    .unwrap()
    .encode_sequence(&frames)
    .unwrap();

  assert_eq!(single.len(), multi.len());
  for (i, (a, b)) in single.iter().zip(&multi).enumerate() {
    assert_eq!(a.summary.frameno, i as u64);
    assert_eq!(a.summary, b.summary);
    assert_eq!(a.ctbs, b.ctbs);
  }
}

#[test]
fn fixed_partitioning_is_honored() {
  let enc = EncoderConfig {
    intra_part_mode_algo: IntraPartModeAlgo::Fixed,
    fixed_part_mode: PartMode::Part2Nx2N,
    ..setup_config(64, 64)
  };
  let encoder = Config::new().with_encoder_config(enc).new_encoder().unwrap();
  let encoded = encoder.encode_frame(&test_frame(64, 64, 5)).unwrap();
  assert_eq!(encoded.summary.nxn_leaves, 0);
}

#[test]
fn single_frame_matches_sequence_encode() {
  let encoder = Config::new()
    .with_encoder_config(setup_config(64, 32))
    .new_encoder()
    .unwrap();
  let frame = test_frame(64, 32, 6);
  let single = encoder.encode_frame(&frame).unwrap();
  let sequence = encoder.encode_sequence(&[frame]).unwrap();
  assert_eq!(single.summary, sequence[0].summary);
  assert_eq!(single.ctbs, sequence[0].ctbs);
}

#[test]
fn coarse_quantizer_on_noise() {
  // most transform blocks keep only a few high-frequency levels
  let enc = EncoderConfig {
    qp: 51,
    chroma_sampling: ChromaSampling::Cs400,
    ..setup_config(136, 24)
  };
  let mut ra = ChaChaRng::from_seed([51; 32]);
  let mut frame = Frame::new(136, 24, ChromaSampling::Cs400);
  frame.planes[0].data.iter_mut().for_each(|v| *v = ra.gen());

  let encoder = Config::new().with_encoder_config(enc).new_encoder().unwrap();
  let encoded = encoder.encode_frame(&frame).unwrap();
  assert_eq!(encoded.ctbs.len(), 3);
  assert!(encoded.ctbs.iter().all(|ctb| ctb.iter().all(|cb| cb.qp == 51)));
  assert_eq!(encoded.summary.psnr.len(), 1);
}
