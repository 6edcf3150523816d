//! Luma/chroma planes (full-range BT.601 YCbCr)
//!
//! Contrast and exposure operators only touch luminance. They split the image
//! into Y, Cb and Cr planes, edit Y, and convert back.

use image::{Rgb, RgbImage};

/// Perceived brightness of an 8-bit RGB triple on the 0-255 scale
pub fn luma(r: u8, g: u8, b: u8) -> f32 {
    0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32
}

/// Image split into separate luma and chroma planes, row-major
#[derive(Debug, Clone)]
pub struct LumaPlanes {
    pub width: u32,
    pub height: u32,
    pub y: Vec<f32>,
    pub cb: Vec<f32>,
    pub cr: Vec<f32>,
}

impl LumaPlanes {
    /// Split an RGB image into full-range Y, Cb and Cr planes
    pub fn from_rgb(image: &RgbImage) -> Self {
        let (width, height) = image.dimensions();
        let len = (width as usize) * (height as usize);
        let mut y = Vec::with_capacity(len);
        let mut cb = Vec::with_capacity(len);
        let mut cr = Vec::with_capacity(len);

        for pixel in image.pixels() {
            let [r, g, b] = pixel.0.map(|c| c as f32);
            y.push(0.299 * r + 0.587 * g + 0.114 * b);
            cb.push(128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b);
            cr.push(128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b);
        }

        Self { width, height, y, cb, cr }
    }

    /// Recombine the planes into an 8-bit RGB image, clipping out-of-range values
    pub fn to_rgb(&self) -> RgbImage {
        let mut out = RgbImage::new(self.width, self.height);
        for (i, pixel) in out.pixels_mut().enumerate() {
            let y = self.y[i];
            let cb = self.cb[i] - 128.0;
            let cr = self.cr[i] - 128.0;
            let r = y + 1.402 * cr;
            let g = y - 0.344_136 * cb - 0.714_136 * cr;
            let b = y + 1.772 * cb;
            *pixel = Rgb([to_u8(r), to_u8(g), to_u8(b)]);
        }
        out
    }
}

/// Round and clip a 0-255 float to a byte
pub fn to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
