//! sRGB to CIE L*a*b* conversion (D65 white point)

use image::Rgb;
use palette::{FromColor, Lab, Srgb};

/// Convert an 8-bit sRGB pixel to `[L, a, b]`
pub fn rgb_to_lab(pixel: Rgb<u8>) -> [f32; 3] {
    let srgb = Srgb::new(pixel[0], pixel[1], pixel[2]).into_format::<f32>();
    let lab: Lab = Lab::from_color(srgb);
    [lab.l, lab.a, lab.b]
}

/// Squared Euclidean distance in Lab space
pub fn distance_sq(a: &[f32; 3], b: &[f32; 3]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
