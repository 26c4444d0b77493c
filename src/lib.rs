//! Integer-only NTSC composite video signal encoding and decoding.
//!
//! An RGB image is modulated into a baseband composite signal (luma plus
//! quadrature chroma, with sync and color burst), then demodulated back into
//! an RGB raster, reproducing the artifacts of a consumer CRT: dot crawl,
//! color bleed, chroma/luma crosstalk, rainbow artifact colors, scanlines
//! and field interlace.
//!
//! ```no_run
//! use rustycrt::{Crt, NtscSettings, PixelFormat};
//!
//! let source = vec![0u8; 64 * 64 * 3];
//! let mut crt = Crt::new(640, 480, PixelFormat::Rgb);
//! let mut settings = NtscSettings::new(&source, PixelFormat::Rgb, 64, 64);
//! for _ in 0..4 {
//!     crt.modulate(&mut settings);
//!     crt.demodulate(12);
//!     settings.field ^= 1;
//! }
//! let rgb = crt.output();
//! # let _ = rgb;
//! ```

pub mod common;
pub mod config;
pub mod crt;
pub mod filter;
pub mod image;
pub mod signal;
pub mod trig;

pub use common::{Kind, Reset};
pub use config::CrtConfig;
pub use crt::{Crt, NtscSettings};
pub use image::Image;
pub use signal::{bpp4fmt, PixelFormat};

/// Crate-wide result type.
pub type CrtResult<T> = anyhow::Result<T>;
