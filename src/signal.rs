//! NTSC signal geometry: line timing, IRE levels and pixel formats.
//!
//! <http://www.ntsc-tv.com/ntsc-index-02.htm>

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 0 = vertical chroma (228 chroma clocks per line),
/// 1 = checkered chroma (227.5 chroma clocks per line).
pub const CRT_CHROMA_PATTERN: u32 = 1;

/// Chroma clocks (subcarrier cycles) per line, times ten.
pub const CRT_CC_LINE: i32 = if CRT_CHROMA_PATTERN == 1 { 2275 } else { 2280 };

/// Carrier frequency relative to the sample rate. Increasing it reduces
/// blur and bleed.
pub const CRT_CB_FREQ: i32 = 4;
/// Horizontal resolution of the sampled line.
pub const CRT_HRES: i32 = CRT_CC_LINE * CRT_CB_FREQ / 10;
/// Vertical resolution of a field.
pub const CRT_VRES: i32 = 262;
pub const CRT_INPUT_SIZE: usize = (CRT_HRES * CRT_VRES) as usize;

/// First line with active video.
pub const CRT_TOP: i32 = 21;
/// Final line with active video.
pub const CRT_BOT: i32 = 261;
pub const CRT_LINES: i32 = CRT_BOT - CRT_TOP;

/// Samples per chroma period (samples per 360 degrees).
pub const CRT_CC_SAMPLES: usize = 4;
/// Vertical period in which the chroma artifacts repeat.
pub const CRT_CC_VPER: usize = 1;

/// Sync search windows, in samples.
pub const CRT_HSYNC_WINDOW: i32 = 8;
pub const CRT_VSYNC_WINDOW: i32 = 8;

/// Accumulated signal threshold required for sync detection. Larger is more
/// stable, until it is so large that it is never reached and the CRT cannot
/// sync at all.
pub const CRT_HSYNC_THRESH: i32 = 4;
pub const CRT_VSYNC_THRESH: i32 = 94;

/// Emulate intensity-dependent beam width (side effect: black borders).
pub const CRT_DO_BLOOM: bool = false;
/// Look for vertical sync.
pub const CRT_DO_VSYNC: bool = true;
/// Look for horizontal sync.
pub const CRT_DO_HSYNC: bool = true;

// Nanosecond durations of the pulses making up a horizontal line:
//
//   FP (~1500 ns)  SYNC (~4700 ns)  BW (~600 ns)  CB (~2500 ns)  BP (~1600 ns)
// |--------------||---------------||------------||-------------||------------|
//      BLANK            SYNC           BLANK          BLANK         BLANK
//
// followed by ~52600 ns of active video, ~63500 ns in total.
pub const FP_NS: i32 = 1500; /* front porch */
pub const SYNC_NS: i32 = 4700; /* sync tip */
pub const BW_NS: i32 = 600; /* breezeway */
pub const CB_NS: i32 = 2500; /* color burst */
pub const BP_NS: i32 = 1600; /* back porch */
pub const AV_NS: i32 = 52600; /* active video */
pub const HB_NS: i32 = FP_NS + SYNC_NS + BW_NS + CB_NS + BP_NS; /* horizontal blank */
pub const LINE_NS: i32 = HB_NS + AV_NS;

/// Convert a nanosecond offset to its corresponding point on the sampled line.
#[inline]
pub const fn ns2pos(ns: i32) -> i32 {
    ns * CRT_HRES / LINE_NS
}

// Starting points for all the different pulses.
pub const LINE_BEG: i32 = 0;
pub const FP_BEG: i32 = ns2pos(0);
pub const SYNC_BEG: i32 = ns2pos(FP_NS);
pub const BW_BEG: i32 = ns2pos(FP_NS + SYNC_NS);
pub const CB_BEG: i32 = ns2pos(FP_NS + SYNC_NS + BW_NS);
pub const BP_BEG: i32 = ns2pos(FP_NS + SYNC_NS + BW_NS + CB_NS);
pub const AV_BEG: i32 = ns2pos(HB_NS);
pub const AV_LEN: i32 = ns2pos(AV_NS);

/// Color burst length in subcarrier cycles, somewhere between 7 and 12.
pub const CB_CYCLES: i32 = 10;

// Frequencies for bandlimiting, in Hz of the 14.31818 MHz sample clock.
pub const L_FREQ: i32 = 1431818; /* full line */
pub const Y_FREQ: i32 = 420000; /* Luma   (Y) 4.2  MHz */
pub const I_FREQ: i32 = 150000; /* Chroma (I) 1.5  MHz */
pub const Q_FREQ: i32 = 55000; /* Chroma (Q) 0.55 MHz */

// IRE units (100 = 1.0V, -40 = 0.0V).
pub const WHITE_LEVEL: i32 = 100;
pub const BURST_LEVEL: i32 = 20;
pub const BLACK_LEVEL: i32 = 7;
pub const BLANK_LEVEL: i32 = 0;
pub const SYNC_LEVEL: i32 = -40;

/// Subcarrier phase for a given line parity. With checkered chroma every
/// other line is reversed.
#[inline]
pub const fn cc_phase(line: i32) -> i32 {
    if CRT_CHROMA_PATTERN == 1 && line & 1 == 1 {
        -1
    } else {
        1
    }
}

/// Modulo that stays non-negative for negative `x`.
#[inline]
pub const fn posmod(x: i32, n: i32) -> i32 {
    ((x % n) + n) % n
}

#[derive(Error, Debug)]
#[must_use]
#[error("failed to parse `PixelFormat`")]
pub struct ParsePixelFormatError;

/// Byte layout of the source and output rasters. The alpha channel is read
/// past but never written meaningfully.
#[derive(Default, Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[must_use]
pub enum PixelFormat {
    Rgb,
    Bgr,
    Argb,
    Rgba,
    Abgr,
    #[default]
    Bgra,
}

impl PixelFormat {
    /// Bytes per pixel.
    #[inline]
    #[must_use]
    pub const fn bpp(self) -> usize {
        match self {
            Self::Rgb | Self::Bgr => 3,
            Self::Argb | Self::Rgba | Self::Abgr | Self::Bgra => 4,
        }
    }

    /// Extract `(r, g, b)` from the head of a pixel in this format.
    #[inline]
    #[must_use]
    pub fn read_rgb(self, p: &[u8]) -> (u8, u8, u8) {
        match self {
            Self::Rgb | Self::Rgba => (p[0], p[1], p[2]),
            Self::Bgr | Self::Bgra => (p[2], p[1], p[0]),
            Self::Argb => (p[1], p[2], p[3]),
            Self::Abgr => (p[3], p[2], p[1]),
        }
    }

    /// Store `(r, g, b)` into a pixel in this format. Alpha bytes are left
    /// untouched.
    #[inline]
    pub fn write_rgb(self, p: &mut [u8], r: u8, g: u8, b: u8) {
        match self {
            Self::Rgb | Self::Rgba => {
                p[0] = r;
                p[1] = g;
                p[2] = b;
            }
            Self::Bgr | Self::Bgra => {
                p[0] = b;
                p[1] = g;
                p[2] = r;
            }
            Self::Argb => {
                p[1] = r;
                p[2] = g;
                p[3] = b;
            }
            Self::Abgr => {
                p[1] = b;
                p[2] = g;
                p[3] = r;
            }
        }
    }
}

impl AsRef<str> for PixelFormat {
    fn as_ref(&self) -> &str {
        match self {
            Self::Rgb => "RGB",
            Self::Bgr => "BGR",
            Self::Argb => "ARGB",
            Self::Rgba => "RGBA",
            Self::Abgr => "ABGR",
            Self::Bgra => "BGRA",
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl TryFrom<i32> for PixelFormat {
    type Error = ParsePixelFormatError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Rgb,
            1 => Self::Bgr,
            2 => Self::Argb,
            3 => Self::Rgba,
            4 => Self::Abgr,
            5 => Self::Bgra,
            _ => return Err(ParsePixelFormatError),
        })
    }
}

/// Bytes per pixel for an integer format code, 0 if the code is invalid.
#[inline]
#[must_use]
pub fn bpp4fmt(format: i32) -> usize {
    PixelFormat::try_from(format).map_or(0, PixelFormat::bpp)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulse_offsets_follow_ns_table() {
        assert_eq!(CRT_HRES, 910);
        assert_eq!(LINE_NS, 63500);
        assert_eq!(FP_BEG, 0);
        assert_eq!(SYNC_BEG, 21);
        assert_eq!(BW_BEG, 88);
        assert_eq!(CB_BEG, 97);
        assert_eq!(BP_BEG, 133);
        assert_eq!(AV_BEG, 156);
        assert_eq!(AV_LEN, 753);
    }

    #[test]
    fn bpp_per_format_code() {
        assert_eq!(bpp4fmt(0), 3);
        assert_eq!(bpp4fmt(1), 3);
        assert_eq!(bpp4fmt(2), 4);
        assert_eq!(bpp4fmt(3), 4);
        assert_eq!(bpp4fmt(4), 4);
        assert_eq!(bpp4fmt(5), 4);
        assert_eq!(bpp4fmt(6), 0);
        assert_eq!(bpp4fmt(-1), 0);
    }

    #[test]
    fn format_round_trips_channels() {
        for code in 0..6 {
            let fmt = PixelFormat::try_from(code).unwrap();
            let mut px = [0u8; 4];
            fmt.write_rgb(&mut px[..fmt.bpp()], 1, 2, 3);
            assert_eq!(fmt.read_rgb(&px[..fmt.bpp()]), (1, 2, 3), "{fmt}");
        }
        assert!(PixelFormat::try_from(6).is_err());
    }

    #[test]
    fn posmod_wraps_negatives() {
        assert_eq!(posmod(-1, CRT_VRES), 261);
        assert_eq!(posmod(262, CRT_VRES), 0);
        assert_eq!(posmod(5, CRT_VRES), 5);
    }

    #[test]
    fn chroma_phase_alternates() {
        assert_eq!(cc_phase(0), 1);
        assert_eq!(cc_phase(1), -1);
        assert_eq!(cc_phase(2), 1);
    }
}
