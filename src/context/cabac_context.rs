// Copyright (c) 2017-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

use crate::ec::CABAC_BITRES;

/// Next state after coding the least probable symbol.
static TRANS_IDX_LPS: [u8; 64] = [
  0, 0, 1, 2, 2, 4, 4, 5, 6, 7, 8, 9, 9, 11, 11, 12, 13, 13, 15, 15, 16, 16,
  18, 18, 19, 19, 21, 21, 22, 22, 23, 24, 24, 25, 26, 26, 27, 27, 28, 29, 29,
  30, 30, 30, 31, 32, 32, 33, 33, 33, 34, 34, 35, 35, 35, 36, 36, 36, 37, 37,
  37, 38, 38, 63,
];

/// Ratio between the LPS probabilities of consecutive states,
/// `(0.01875 / 0.5) ^ (1 / 63)`.
const LPS_ALPHA: f64 = 0.949_217_148_771_053_1;

/// The adaptive probability state of one binary context.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ContextModel {
  /// Probability state index, 0 (equiprobable) to 62.
  pub state: u8,
  /// Most probable symbol.
  pub mps: bool,
}

impl ContextModel {
  /// Initial state for `init_value` at slice QP `qp`.
  pub fn new(init_value: u8, qp: i32) -> Self {
    let slope = (init_value >> 4) as i32 * 5 - 45;
    let offset = (((init_value & 15) as i32) << 3) - 16;
    let pre_state = (((slope * qp.clamp(0, 51)) >> 4) + offset).clamp(1, 126);
    if pre_state <= 63 {
      ContextModel { state: (63 - pre_state) as u8, mps: false }
    } else {
      ContextModel { state: (pre_state - 64) as u8, mps: true }
    }
  }

  #[inline]
  pub fn update(&mut self, bin: bool) {
    if bin == self.mps {
      self.state = (self.state + 1).min(62);
    } else {
      if self.state == 0 {
        self.mps = !self.mps;
      }
      self.state = TRANS_IDX_LPS[self.state as usize];
    }
  }

  /// Estimated cost of coding `bin` in 1/2^CABAC_BITRES bits.
  #[inline]
  pub fn cost(self, bin: bool) -> u32 {
    let p_lps = 0.5 * LPS_ALPHA.powi(self.state as i32);
    let p = if bin == self.mps { 1.0 - p_lps } else { p_lps };
    (-p.log2() * (1 << CABAC_BITRES) as f64).round() as u32
  }
}

fn init_models<const N: usize>(values: [u8; N], qp: i32) -> [ContextModel; N] {
  values.map(|v| ContextModel::new(v, qp))
}

/// Every context model used by the syntax written for an intra slice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextModelTable {
  pub split_cu_flag: [ContextModel; 3],
  pub part_mode: [ContextModel; 1],
  pub prev_intra_luma_pred_flag: [ContextModel; 1],
  pub intra_chroma_pred_mode: [ContextModel; 1],
  pub cbf_luma: [ContextModel; 2],
  pub cbf_chroma: [ContextModel; 4],
  pub last_sig_coeff_x_prefix: [ContextModel; 18],
  pub last_sig_coeff_y_prefix: [ContextModel; 18],
  pub coded_sub_block_flag: [ContextModel; 4],
  /// 27 luma contexts followed by 15 chroma contexts.
  pub sig_coeff_flag: [ContextModel; 42],
  /// 16 luma contexts followed by 8 chroma contexts.
  pub coeff_abs_level_greater1_flag: [ContextModel; 24],
  /// 4 luma contexts followed by 2 chroma contexts.
  pub coeff_abs_level_greater2_flag: [ContextModel; 6],
}

impl ContextModelTable {
  /// Initializes the tables of an I slice with slice QP `qp`.
  pub fn new(qp: i32) -> Self {
    ContextModelTable {
      split_cu_flag: init_models([139, 141, 157], qp),
      part_mode: init_models([184], qp),
      prev_intra_luma_pred_flag: init_models([184], qp),
      intra_chroma_pred_mode: init_models([63], qp),
      cbf_luma: init_models([111, 141], qp),
      cbf_chroma: init_models([94, 138, 182, 154], qp),
      last_sig_coeff_x_prefix: init_models(LAST_SIG_COEFF_PREFIX_INIT, qp),
      last_sig_coeff_y_prefix: init_models(LAST_SIG_COEFF_PREFIX_INIT, qp),
      coded_sub_block_flag: init_models([91, 171, 134, 141], qp),
      sig_coeff_flag: init_models(SIG_COEFF_FLAG_INIT, qp),
      coeff_abs_level_greater1_flag: init_models(GREATER1_FLAG_INIT, qp),
      coeff_abs_level_greater2_flag: init_models(
        [138, 153, 136, 167, 152, 152],
        qp,
      ),
    }
  }

  pub fn checkpoint(&self) -> ContextModelTable {
    self.clone()
  }

  pub fn restore(&mut self, checkpoint: &ContextModelTable) {
    self.clone_from(checkpoint);
  }
}

const LAST_SIG_COEFF_PREFIX_INIT: [u8; 18] = [
  110, 110, 124, 125, 140, 153, 125, 127, 140, 109, 111, 143, 127, 111, 79,
  108, 123, 63,
];

const SIG_COEFF_FLAG_INIT: [u8; 42] = [
  111, 111, 125, 110, 110, 94, 124, 108, 124, 107, 125, 141, 179, 153, 125,
  107, 125, 141, 179, 153, 125, 107, 125, 141, 179, 153, 125, 140, 139, 182,
  182, 152, 136, 152, 136, 153, 136, 139, 111, 136, 139, 111,
];

const GREATER1_FLAG_INIT: [u8; 24] = [
  140, 92, 137, 138, 140, 152, 138, 139, 153, 74, 149, 92, 139, 107, 122, 152,
  140, 179, 166, 182, 140, 227, 122, 197,
];

#[cfg(test)]
mod test {
  use super::*;

  #[test]
  fn init_value_154_is_equiprobable() {
    // slope 0, offset 64 at every QP
    for qp in [0, 22, 37, 51] {
      let model = ContextModel::new(154, qp);
      assert_eq!(model, ContextModel { state: 0, mps: true });
    }
  }

  #[test]
  fn init_depends_on_qp_slope() {
    let low = ContextModel::new(139, 22);
    let high = ContextModel::new(139, 37);
    assert_ne!(low, high);
    assert_eq!(ContextModel::new(139, -4), ContextModel::new(139, 0));
    assert_eq!(ContextModel::new(139, 60), ContextModel::new(139, 51));
  }

  #[test]
  fn mps_saturates_and_lps_falls_back() {
    let mut m = ContextModel { state: 61, mps: true };
    m.update(true);
    m.update(true);
    assert_eq!(m, ContextModel { state: 62, mps: true });
    m.update(false);
    assert_eq!(m, ContextModel { state: 38, mps: true });
  }

  #[test]
  fn skewed_state_prices_mps_below_lps() {
    let m = ContextModel { state: 62, mps: false };
    assert!(m.cost(false) < 1 << 10);
    assert!(m.cost(true) > 5 << CABAC_BITRES);
    let flat = ContextModel::default();
    assert_eq!(flat.cost(false), flat.cost(true));
  }

  #[test]
  fn restore_returns_the_checkpointed_state() {
    let mut table = ContextModelTable::new(27);
    let checkpoint = table.checkpoint();
    table.split_cu_flag[0].update(true);
    table.sig_coeff_flag[41].update(false);
    assert_ne!(table, checkpoint);
    table.restore(&checkpoint);
    assert_eq!(table, checkpoint);
  }
}
