//! Band-limiting filters for the composite pipeline: a single-pole IIR
//! low-pass on the modulator side and a three-band equalizer on the
//! demodulator side.

use crate::{
    signal::{CRT_HRES, L_FREQ},
    trig::{exp_mul, expx, sincos14, EXP_ONE, EXP_PI, T14_PI},
};
use serde::{Deserialize, Serialize};

/// Kilohertz to line-sample conversion.
#[inline]
pub const fn khz2l(khz: i32) -> i32 {
    CRT_HRES * (khz * 100) / L_FREQ
}

/// Infinite impulse response low-pass for bandlimiting YIQ ahead of
/// modulation.
#[derive(Default, Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct IirLp {
    c: i32,
    h: i32,
}

impl IirLp {
    /// `freq` is the total bandwidth, `limit` the max frequency to pass.
    pub fn low_pass(freq: i32, limit: i32) -> Self {
        let rate = (freq << 9) / limit; /* cycles/pixel rate */
        Self {
            c: EXP_ONE - expx(-((EXP_PI << 9) / rate)),
            h: 0,
        }
    }

    #[inline]
    pub fn reset(&mut self) {
        self.h = 0;
    }

    #[inline]
    pub fn filter(&mut self, s: i32) -> i32 {
        self.h += exp_mul(s - self.h, self.c);
        self.h
    }
}

const HISTLEN: usize = 3;
const HISTOLD: usize = HISTLEN - 1; /* oldest entry */
const HISTNEW: usize = 0; /* newest entry */

/// Fixed point of the EQ; the band gains are pre-scaled to match.
pub const EQ_P: i32 = 16;
const EQ_R: i32 = 1 << (EQ_P - 1); /* rounding */

/// Three-band equalizer. Two cascaded 4-pole low-passes split the signal at
/// the band edges; the band above the high cutoff is recovered from a short
/// history ring.
#[derive(Default, Debug, Copy, Clone, Serialize, Deserialize)]
#[must_use]
pub struct EqFilter {
    lf: i32,
    hf: i32, /* fractions */
    g: [i32; 3], /* gains */
    f_lo: [i32; 4],
    f_hi: [i32; 4],
    h: [i32; HISTLEN], /* history */
}

impl EqFilter {
    /// `f_lo`/`f_hi` are the low and high cutoffs in line samples at
    /// sampling rate `rate`; the gains are [`EQ_P`]-bit fixed point.
    pub fn three_band(f_lo: i32, f_hi: i32, rate: i32, g_lo: i32, g_mid: i32, g_hi: i32) -> Self {
        let (sn, _) = sincos14(T14_PI * f_lo / rate);
        let lf = 2 * (sn << (EQ_P - 15));
        let (sn, _) = sincos14(T14_PI * f_hi / rate);
        let hf = 2 * (sn << (EQ_P - 15));
        Self {
            lf,
            hf,
            g: [g_lo, g_mid, g_hi],
            f_lo: [0; 4],
            f_hi: [0; 4],
            h: [0; HISTLEN],
        }
    }

    #[inline]
    pub fn reset(&mut self) {
        self.f_lo = [0; 4];
        self.f_hi = [0; 4];
        self.h = [0; HISTLEN];
    }

    #[inline]
    pub fn filter(&mut self, s: i32) -> i32 {
        self.f_lo[0] += (self.lf * (s - self.f_lo[0]) + EQ_R) >> EQ_P;
        self.f_hi[0] += (self.hf * (s - self.f_hi[0]) + EQ_R) >> EQ_P;
        for i in 1..4 {
            self.f_lo[i] += (self.lf * (self.f_lo[i - 1] - self.f_lo[i]) + EQ_R) >> EQ_P;
            self.f_hi[i] += (self.hf * (self.f_hi[i - 1] - self.f_hi[i]) + EQ_R) >> EQ_P;
        }

        let mut r = [
            self.f_lo[3],
            self.f_hi[3] - self.f_lo[3],
            self.h[HISTOLD] - self.f_hi[3],
        ];
        for (band, gain) in r.iter_mut().zip(self.g) {
            *band = (*band * gain) >> EQ_P;
        }

        for i in (1..=HISTOLD).rev() {
            self.h[i] = self.h[i - 1];
        }
        self.h[HISTNEW] = s;

        r[0] + r[1] + r[2]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Y_FREQ;

    #[test]
    fn iir_converges_to_dc() {
        let mut iir = IirLp::low_pass(L_FREQ, Y_FREQ);
        let mut out = 0;
        for _ in 0..400 {
            out = iir.filter(100);
        }
        assert!((98..=100).contains(&out), "settled at {out}");
    }

    #[test]
    fn iir_reset_clears_history() {
        let mut iir = IirLp::low_pass(L_FREQ, Y_FREQ);
        for _ in 0..50 {
            iir.filter(100);
        }
        iir.reset();
        assert!(iir.filter(0) == 0);
    }

    #[test]
    fn eq_passes_dc_through_low_band() {
        // At DC the mid and high bands decompose to zero, so only the
        // low-band gain applies.
        let mut eq = EqFilter::three_band(khz2l(1500), khz2l(3000), CRT_HRES, 65536, 8192, 9175);
        let mut out = 0;
        for _ in 0..500 {
            out = eq.filter(100);
        }
        assert_eq!(out, 100);
    }

    #[test]
    fn eq_is_quiet_on_silence() {
        let mut eq = EqFilter::three_band(khz2l(80), khz2l(1150), CRT_HRES, 65536, 65536, 1311);
        for _ in 0..100 {
            assert_eq!(eq.filter(0), 0);
        }
        eq.filter(1000);
        eq.reset();
        assert_eq!(eq.filter(0), 0);
    }
}
