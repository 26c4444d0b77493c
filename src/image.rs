//! Packed-pixel images and the file formats the front-end speaks.

use serde::{Deserialize, Serialize};

pub mod bmp;
pub mod ppm;

/// An image of packed `0xAARRGGBB` pixels. On little-endian machines the
/// byte view is BGRA order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Image {
    data: Vec<u32>,
    width: usize,
    height: usize,
}

impl Image {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            data: vec![0; width * height],
            width,
            height,
        }
    }

    pub fn from_packed(data: Vec<u32>, width: usize, height: usize) -> Self {
        assert_eq!(data.len(), width * height);
        Self {
            data,
            width,
            height,
        }
    }

    #[inline]
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    #[must_use]
    pub fn pixels(&self) -> &[u32] {
        &self.data
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.data
    }

    /// The raw byte view of the pixels (BGRA on little-endian).
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}
