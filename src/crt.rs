//! CRT state shared between the modulator and the demodulator.
//!
//! A [`Crt`] owns the baseband composite signal the two passes exchange plus
//! everything that must persist between fields: sync positions, the
//! color-carrier convergence accumulator, the noise generator and the
//! monitor knobs. Calling [`Crt::modulate`] then [`Crt::demodulate`]
//! repeatedly (typically 2-4 times per frame) lets the carrier accumulator
//! converge, which is what cleans up chroma noise over successive passes.

use crate::{
    common::{Kind, Reset},
    config::CrtConfig,
    filter::{khz2l, EqFilter, IirLp},
    signal::{
        PixelFormat, CRT_CC_SAMPLES, CRT_CC_VPER, CRT_HRES, CRT_INPUT_SIZE, I_FREQ, L_FREQ, Q_FREQ,
        Y_FREQ,
    },
};
use serde::{Deserialize, Serialize};
use std::fmt;

mod demodulate;
mod modulate;

pub use modulate::NtscSettings;

/// Initial seed for the noise generator.
const RN_SEED: u32 = 194;

#[derive(Clone, Serialize, Deserialize)]
#[must_use]
pub struct Crt {
    /// Baseband composite signal, written by modulate and read by
    /// demodulate. Deliberately not cleared between calls: stale active
    /// video outside the current raster is a compositing feature in raw
    /// mode, and carried phase is what makes the artifacts crawl.
    analog: Vec<i8>,
    /// Noised copy of `analog`, the demodulator's actual input.
    inp: Vec<i8>,

    outw: i32,
    outh: i32,
    out_format: PixelFormat,
    /// Decoded output raster, `outw * outh * bpp` bytes.
    out: Vec<u8>,

    // Common monitor settings.
    pub hue: i32,
    pub brightness: i32,
    pub contrast: i32,
    pub saturation: i32,
    pub black_point: i32,
    pub white_point: i32,
    /// Leave gaps between lines if the output is tall enough.
    pub scanlines: i32,
    /// Blend the new field onto the previous output (phosphor afterglow).
    pub blend: bool,
    /// Factor to stretch the image vertically onto the output.
    pub v_fac: i32,

    /// Color-carrier convergence accumulator; a slowly decaying low-pass of
    /// the burst reference across frames.
    ccf: [[i32; CRT_CC_SAMPLES]; CRT_CC_VPER],
    /// Last acquired sync positions, seeding the next acquisition.
    hsync: i32,
    vsync: i32,
    /// Noise generator state.
    rn: u32,

    // YIQ band-limiting and equalization state, per instance so independent
    // CRTs can run side by side.
    iir_y: IirLp,
    iir_i: IirLp,
    iir_q: IirLp,
    eq_y: EqFilter,
    eq_i: EqFilter,
    eq_q: EqFilter,
}

impl Crt {
    /// Set up a CRT for an output raster of `w` x `h` pixels in `format`.
    pub fn new(w: i32, h: i32, format: PixelFormat) -> Self {
        let mut crt = Self {
            analog: vec![0; CRT_INPUT_SIZE],
            inp: vec![0; CRT_INPUT_SIZE],
            outw: 0,
            outh: 0,
            out_format: format,
            out: Vec::new(),
            hue: 0,
            brightness: 0,
            contrast: 0,
            saturation: 0,
            black_point: 0,
            white_point: 0,
            scanlines: 0,
            blend: false,
            v_fac: 0,
            ccf: [[0; CRT_CC_SAMPLES]; CRT_CC_VPER],
            hsync: 0,
            vsync: 0,
            rn: RN_SEED,
            iir_y: IirLp::low_pass(L_FREQ, Y_FREQ),
            iir_i: IirLp::low_pass(L_FREQ, I_FREQ),
            iir_q: IirLp::low_pass(L_FREQ, Q_FREQ),
            // Band gains are pre-scaled as 16-bit fixed point; changing EQ_P
            // means updating these too.
            eq_y: EqFilter::three_band(khz2l(1500), khz2l(3000), CRT_HRES, 65536, 8192, 9175),
            eq_i: EqFilter::three_band(khz2l(80), khz2l(1150), CRT_HRES, 65536, 65536, 1311),
            eq_q: EqFilter::three_band(khz2l(80), khz2l(1000), CRT_HRES, 65536, 65536, 0),
        };
        crt.resize(w, h, format);
        crt.reset(Kind::Soft);
        crt
    }

    /// Update the output raster parameters. The raster is reallocated only
    /// when the byte size changes, so blending continues across a resize to
    /// the same dimensions.
    pub fn resize(&mut self, w: i32, h: i32, format: PixelFormat) {
        self.outw = w;
        self.outh = h;
        self.out_format = format;
        let need = (w.max(0) as usize) * (h.max(0) as usize) * format.bpp();
        if self.out.len() != need {
            self.out = vec![0; need];
        }
    }

    #[inline]
    #[must_use]
    pub fn output(&self) -> &[u8] {
        &self.out
    }

    #[inline]
    pub fn output_mut(&mut self) -> &mut [u8] {
        &mut self.out
    }

    #[inline]
    #[must_use]
    pub fn output_width(&self) -> i32 {
        self.outw
    }

    #[inline]
    #[must_use]
    pub fn output_height(&self) -> i32 {
        self.outh
    }

    #[inline]
    #[must_use]
    pub fn output_format(&self) -> PixelFormat {
        self.out_format
    }

    /// The raw composite signal from the last modulate pass.
    #[inline]
    #[must_use]
    pub fn analog(&self) -> &[i8] {
        &self.analog
    }

    /// Clear the composite buffer. Needed when switching to a smaller raw
    /// image, since stale active video persists otherwise.
    pub fn clear_analog(&mut self) {
        self.analog.fill(0);
    }

    /// Apply a monitor preset.
    pub fn apply_config(&mut self, config: &CrtConfig) {
        self.hue = config.hue;
        self.brightness = config.brightness;
        self.contrast = config.contrast;
        self.saturation = config.saturation;
        self.black_point = config.black_point;
        self.white_point = config.white_point;
        self.blend = config.blend;
        self.scanlines = config.scanlines;
    }
}

impl Reset for Crt {
    fn reset(&mut self, kind: Kind) {
        self.hue = 0;
        self.saturation = 10;
        self.brightness = 0;
        self.contrast = 180;
        self.black_point = 0;
        self.white_point = 100;
        self.hsync = 0;
        self.vsync = 0;
        if kind == Kind::Hard {
            self.analog.fill(0);
            self.inp.fill(0);
            self.out.fill(0);
            self.ccf = [[0; CRT_CC_SAMPLES]; CRT_CC_VPER];
            self.blend = false;
            self.scanlines = 0;
            self.v_fac = 0;
            self.rn = RN_SEED;
        }
    }
}

impl fmt::Debug for Crt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Crt")
            .field("outw", &self.outw)
            .field("outh", &self.outh)
            .field("out_format", &self.out_format)
            .field("hue", &self.hue)
            .field("brightness", &self.brightness)
            .field("contrast", &self.contrast)
            .field("saturation", &self.saturation)
            .field("black_point", &self.black_point)
            .field("white_point", &self.white_point)
            .field("scanlines", &self.scanlines)
            .field("blend", &self.blend)
            .field("hsync", &self.hsync)
            .field("vsync", &self.vsync)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{BLANK_LEVEL, CRT_LINES, SYNC_LEVEL};

    fn solid(w: usize, h: usize, rgb: (u8, u8, u8)) -> Vec<u8> {
        let mut data = Vec::with_capacity(w * h * 3);
        for _ in 0..w * h {
            data.extend_from_slice(&[rgb.0, rgb.1, rgb.2]);
        }
        data
    }

    fn checkerboard(w: usize, h: usize) -> Vec<u8> {
        let mut data = Vec::with_capacity(w * h * 3);
        for y in 0..h {
            for x in 0..w {
                let v = if (x + y) & 1 == 0 { 255 } else { 0 };
                data.extend_from_slice(&[v, v, v]);
            }
        }
        data
    }

    #[test]
    fn analog_stays_within_ire_bounds() {
        let src = checkerboard(8, 8);
        let mut crt = Crt::new(64, 64, PixelFormat::Rgb);
        let mut s = NtscSettings::new(&src, PixelFormat::Rgb, 8, 8);
        crt.modulate(&mut s);
        for &v in crt.analog() {
            assert!(
                (SYNC_LEVEL as i8..=110).contains(&v),
                "composite sample {v} out of range"
            );
        }
    }

    #[test]
    fn modulate_is_deterministic() {
        let src = checkerboard(8, 8);
        let mut crt = Crt::new(64, 64, PixelFormat::Rgb);
        let mut s = NtscSettings::new(&src, PixelFormat::Rgb, 8, 8);
        s.hue = 140;
        crt.modulate(&mut s);
        let first = crt.analog().to_vec();
        crt.modulate(&mut s);
        assert_eq!(crt.analog(), &first[..]);
    }

    #[test]
    fn field_changes_vsync_pulse_waveform() {
        let src = solid(4, 4, (90, 90, 90));
        let mut crt = Crt::new(16, 16, PixelFormat::Rgb);
        let mut s = NtscSettings::new(&src, PixelFormat::Rgb, 4, 4);

        // The even field holds the sync tip through the first 46% of the
        // vsync lines; the odd field drops to blank after 4%.
        let probe = (4 * CRT_HRES + 91) as usize;
        crt.modulate(&mut s);
        assert_eq!(crt.analog()[probe], SYNC_LEVEL as i8);
        s.field = 1;
        crt.modulate(&mut s);
        assert_eq!(crt.analog()[probe], BLANK_LEVEL as i8);
    }

    #[test]
    fn monochrome_decodes_to_gray() {
        let src = checkerboard(8, 8);
        let mut crt = Crt::new(64, 64, PixelFormat::Rgb);
        let mut s = NtscSettings::new(&src, PixelFormat::Rgb, 8, 8);
        s.as_color = false;
        for _ in 0..4 {
            crt.modulate(&mut s);
            crt.demodulate(0);
        }
        for px in crt.output().chunks_exact(3) {
            assert_eq!(px[0], px[1], "chroma leaked into monochrome output");
            assert_eq!(px[1], px[2], "chroma leaked into monochrome output");
        }
    }

    #[test]
    fn color_checkerboard_leaks_chroma() {
        let src = checkerboard(8, 8);
        let mut crt = Crt::new(64, 64, PixelFormat::Rgb);
        let mut s = NtscSettings::new(&src, PixelFormat::Rgb, 8, 8);
        for _ in 0..4 {
            crt.modulate(&mut s);
            crt.demodulate(0);
        }
        // Luma edges land in the chroma band and come back out as artifact
        // colors, so a black-and-white source must not stay gray.
        let max_spread = crt
            .output()
            .chunks_exact(3)
            .map(|px| i32::from(px[0]).abs_diff(i32::from(px[2])))
            .max()
            .unwrap();
        assert!(max_spread > 10, "no artifact colors, spread {max_spread}");
    }

    #[test]
    fn gray_roundtrip_is_uniform() {
        let src = solid(16, 16, (128, 128, 128));
        let mut crt = Crt::new(64, 64, PixelFormat::Rgb);
        let mut s = NtscSettings::new(&src, PixelFormat::Rgb, 16, 16);
        for _ in 0..4 {
            crt.modulate(&mut s);
            crt.demodulate(0);
            s.field ^= 1;
        }
        let out = crt.output();
        for y in 16..48 {
            for x in 16..48 {
                let px = &out[(y * 64 + x) * 3..][..3];
                for &c in px {
                    assert!(
                        (100..=180).contains(&c),
                        "({x},{y}) channel {c} strayed from mid gray"
                    );
                }
                let spread = i32::from(px[0]).abs_diff(i32::from(px[2]));
                assert!(spread <= 40, "({x},{y}) chroma residue {spread}");
            }
        }
    }

    #[test]
    fn repeated_passes_reach_fixed_point() {
        let src = checkerboard(8, 8);
        let mut crt = Crt::new(48, 48, PixelFormat::Rgb);
        let mut s = NtscSettings::new(&src, PixelFormat::Rgb, 8, 8);
        let mut outs = Vec::new();
        for _ in 0..6 {
            crt.modulate(&mut s);
            crt.demodulate(0);
            outs.push(crt.output().to_vec());
        }
        assert_eq!(outs[4], outs[5], "chroma convergence did not settle");
    }

    #[test]
    fn blend_averages_previous_and_new() {
        let src_a = solid(8, 8, (200, 50, 30));
        let src_b = solid(8, 8, (30, 60, 200));
        let mut crt = Crt::new(32, 32, PixelFormat::Rgb);

        let mut sa = NtscSettings::new(&src_a, PixelFormat::Rgb, 8, 8);
        crt.modulate(&mut sa);
        crt.demodulate(0);
        let mut reference = crt.clone();
        let out_a = crt.output().to_vec();

        crt.blend = true;
        let mut sb = NtscSettings::new(&src_b, PixelFormat::Rgb, 8, 8);
        crt.modulate(&mut sb);
        crt.demodulate(0);
        let blended = crt.output().to_vec();

        // The same second field decoded without blending is the "new" term.
        let mut sb = NtscSettings::new(&src_b, PixelFormat::Rgb, 8, 8);
        reference.modulate(&mut sb);
        reference.demodulate(0);
        let out_b = reference.output().to_vec();

        for ((got, old), new) in blended
            .chunks_exact(3)
            .zip(out_a.chunks_exact(3))
            .zip(out_b.chunks_exact(3))
        {
            let old = u32::from(old[0]) << 16 | u32::from(old[1]) << 8 | u32::from(old[2]);
            let new = u32::from(new[0]) << 16 | u32::from(new[1]) << 8 | u32::from(new[2]);
            let want = ((new & 0xfefeff) >> 1) + ((old & 0xfefeff) >> 1);
            assert_eq!(got[0], (want >> 16) as u8);
            assert_eq!(got[1], (want >> 8) as u8);
            assert_eq!(got[2], want as u8);
        }
    }

    #[test]
    fn scanlines_duplicate_rows() {
        let src = solid(8, 8, (255, 255, 255));
        let outh = 4 * CRT_LINES;
        let mut crt = Crt::new(64, outh, PixelFormat::Rgb);
        crt.scanlines = 1;
        let mut s = NtscSettings::new(&src, PixelFormat::Rgb, 8, 8);
        crt.modulate(&mut s);
        crt.demodulate(0);

        let pitch = 64 * 3;
        let out = crt.output();
        assert!(out.iter().any(|&b| b != 0));
        let row = |r: usize| &out[r * pitch..(r + 1) * pitch];
        for k in 0..CRT_LINES as usize {
            let beg = 4 * k;
            assert_eq!(row(beg + 1), row(beg), "band {k}");
            assert_eq!(row(beg + 2), row(beg + 1), "band {k}");
            assert!(row(beg + 3).iter().all(|&b| b == 0), "band {k} gap");
        }
    }

    #[test]
    fn noise_stays_bounded() {
        let src = solid(16, 16, (128, 128, 128));
        let mut crt = Crt::new(32, 32, PixelFormat::Rgb);
        let mut s = NtscSettings::new(&src, PixelFormat::Rgb, 16, 16);
        crt.modulate(&mut s);
        crt.demodulate(32);
        assert!(crt.inp.iter().any(|&v| v != crt.inp[0]));
        crt.demodulate(255);
        for &v in &crt.inp {
            assert!((-127..=127).contains(&v));
        }
    }

    #[test]
    fn carrier_accumulator_stays_bounded() {
        let src = checkerboard(8, 8);
        let mut crt = Crt::new(32, 32, PixelFormat::Rgb);
        let mut s = NtscSettings::new(&src, PixelFormat::Rgb, 8, 8);
        for _ in 0..6 {
            crt.modulate(&mut s);
            crt.demodulate(100);
            for row in &crt.ccf {
                for &c in row {
                    assert!(c.abs() < 16384, "ccf diverged to {c}");
                }
            }
        }
    }

    #[test]
    fn reset_restores_defaults() {
        let mut crt = Crt::new(16, 16, PixelFormat::Rgb);
        crt.hue = 40;
        crt.contrast = 90;
        crt.blend = true;
        crt.reset(Kind::Soft);
        assert_eq!(crt.hue, 0);
        assert_eq!(crt.contrast, 180);
        assert_eq!(crt.saturation, 10);
        assert_eq!(crt.white_point, 100);
        assert!(crt.blend, "soft reset must keep presentation toggles");
        crt.reset(Kind::Hard);
        assert!(!crt.blend);
        assert_eq!(crt.rn, 194);
    }

    #[test]
    fn apply_config_sets_knobs() {
        let mut crt = Crt::new(16, 16, PixelFormat::Rgb);
        let preset = CrtConfig {
            hue: 15,
            contrast: 210,
            scanlines: 1,
            ..CrtConfig::default()
        };
        crt.apply_config(&preset);
        assert_eq!(crt.hue, 15);
        assert_eq!(crt.contrast, 210);
        assert_eq!(crt.scanlines, 1);
    }
}
