// Copyright (c) 2001-2016, Alliance for Open Media. All rights reserved
// Copyright (c) 2017-2022, The rav1e contributors. All rights reserved
//
// This source code is subject to the terms of the BSD 2 Clause License and
// the Alliance for Open Media Patent License 1.0. If the BSD 2 Clause License
// was not distributed with this source code in the LICENSE file, you can
// obtain it at www.aomedia.org/license/software. If the Alliance for Open
// Media Patent License 1.0 was not distributed with this source code in the
// PATENTS file, you can obtain it at www.aomedia.org/license/patent.

//! Binary arithmetic coder interface and a bit-cost estimating counter.

use crate::context::ContextModel;

/// Fractional bits carried by [`Writer::tell_frac`].
pub const CABAC_BITRES: u32 = 15;

/// Cost of a terminating bin of value 0 and 1.
const TERMINATE_COST: [u32; 2] = [186, 261_959];

pub trait Writer {
  /// Write a context coded bin and adapt `model` to it.
  fn bin(&mut self, bin: bool, model: &mut ContextModel);
  /// Write an equiprobable bin.
  fn bypass(&mut self, bin: bool);
  /// Write the `n` least significant bits of `value` as bypass bins, most
  /// significant first.
  fn bypass_bits(&mut self, value: u32, n: u32) {
    for i in (0..n).rev() {
      self.bypass((value >> i) & 1 != 0);
    }
  }
  /// Write a bin with the fixed terminating probability.
  fn terminate(&mut self, bin: bool);
  /// Return current length of the stream in 1/2^CABAC_BITRES bits.
  fn tell_frac(&self) -> u64;
  /// Return current length of the stream in whole bits, rounded up.
  fn tell(&self) -> u64 {
    (self.tell_frac() + (1 << CABAC_BITRES) - 1) >> CABAC_BITRES
  }
}

/// A [`Writer`] that emits nothing and only accumulates the estimated cost
/// of every bin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterCounter {
  frac_bits: u64,
  bins: u64,
}

impl WriterCounter {
  pub const fn new() -> WriterCounter {
    WriterCounter { frac_bits: 0, bins: 0 }
  }

  /// Number of bins written so far.
  pub const fn bins(&self) -> u64 {
    self.bins
  }
}

impl Writer for WriterCounter {
  #[inline]
  fn bin(&mut self, bin: bool, model: &mut ContextModel) {
    self.frac_bits += model.cost(bin) as u64;
    self.bins += 1;
    model.update(bin);
  }

  #[inline]
  fn bypass(&mut self, _bin: bool) {
    self.frac_bits += 1 << CABAC_BITRES;
    self.bins += 1;
  }

  fn bypass_bits(&mut self, _value: u32, n: u32) {
    self.frac_bits += (n as u64) << CABAC_BITRES;
    self.bins += n as u64;
  }

  fn terminate(&mut self, bin: bool) {
    self.frac_bits += TERMINATE_COST[bin as usize] as u64;
    self.bins += 1;
  }

  #[inline]
  fn tell_frac(&self) -> u64 {
    self.frac_bits
  }
}
