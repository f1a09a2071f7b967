use hevc_rdo::prelude::*;

#[test]
fn encode_frame() -> Result<(), Box<dyn std::error::Error>> {
  let enc = EncoderConfig { width: 64, height: 64, ..Default::default() };
  let encoder = Config::new().with_encoder_config(enc).new_encoder()?;
  let mut frame = Frame::new(64, 64, ChromaSampling::Cs420);
  frame.fill(128, 128, 128);

  let encoded = encoder.encode_frame(&frame)?;
  // One coding-tree block covers the whole picture
  assert_eq!(encoded.ctbs.len(), 1);
  // A flat picture is predicted perfectly by a single large block
  assert!(!encoded.ctbs[0].is_split());
  Ok(())
}

#[test]
fn encode_sequence() -> Result<(), Box<dyn std::error::Error>> {
  let enc = EncoderConfig {
    width: 64,
    height: 32,
    log2_ctb_size: 5,
    intra_part_mode_algo: IntraPartModeAlgo::Fixed,
    ..Default::default()
  };
  let frames: Vec<_> = (0..3u8)
    .map(|i| {
      let mut frame = Frame::new(64, 32, ChromaSampling::Cs420);
      frame.fill(40 * i, 128, 128);
      frame
    })
    .collect();

  // Validates the configuration, codes every picture and sums up the result
  let summary = hevc_rdo::encode_sequence(&enc, &frames)?;
  assert_eq!(summary.frames, 3);
  Ok(())
}

#[test]
fn frames_must_match_the_configuration(
) -> Result<(), Box<dyn std::error::Error>> {
  let encoder = Config::new()
    .with_encoder_config(EncoderConfig {
      width: 32,
      height: 32,
      ..Default::default()
    })
    .new_encoder()?;
  let frame = Frame::new(32, 32, ChromaSampling::Cs400);

  // Frames must have the configured format
  assert!(matches!(
    encoder.encode_frame(&frame),
    Err(EncoderError::FrameMismatch { .. })
  ));
  Ok(())
}
