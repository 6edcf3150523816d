//! Contrast-limited adaptive histogram equalization (CLAHE)
//!
//! The image is split into a grid of tiles. Each tile gets its own clipped
//! histogram and lookup table, and every pixel blends the lookup tables of
//! its four nearest tile centers so tile borders do not show. Planes that do
//! not divide evenly are mirrored out to a whole grid, so every tile has the
//! same size and the requested grid is always used.

use crate::luma::LumaPlanes;
use image::RgbImage;
use serde::{Deserialize, Serialize};

const BINS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClaheParams {
    /// Histogram clip limit, relative to a flat histogram (values <= 0 disable clipping)
    pub clip_limit: f32,
    pub tiles_x: u32,
    pub tiles_y: u32,
}

impl ClaheParams {
    /// Create parameters with a square tile grid
    pub fn new(clip_limit: f32, tiles: u32) -> Self {
        Self {
            clip_limit,
            tiles_x: tiles,
            tiles_y: tiles,
        }
    }
}

impl std::fmt::Display for ClaheParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "clip {:.1}, {}x{} tiles",
            self.clip_limit, self.tiles_x, self.tiles_y
        )
    }
}

/// Equalize the luma channel of an image, leaving chroma alone
pub fn equalize_luma(image: &RgbImage, params: ClaheParams) -> RgbImage {
    let mut planes = LumaPlanes::from_rgb(image);
    planes.y = clahe(&planes.y, planes.width, planes.height, params);
    planes.to_rgb()
}

/// Run CLAHE over a single 0-255 plane
pub fn clahe(plane: &[f32], width: u32, height: u32, params: ClaheParams) -> Vec<f32> {
    if width == 0 || height == 0 {
        return plane.to_vec();
    }

    let layout = TileLayout::new(width, height, params);
    let padded = layout.pad(plane, width, height);

    let mut luts = Vec::with_capacity((layout.count_x * layout.count_y) as usize);
    for ty in 0..layout.count_y {
        for tx in 0..layout.count_x {
            luts.push(tile_lut(&padded, &layout, tx, ty, params.clip_limit));
        }
    }

    let padded_w = layout.padded_width();
    let mut out = Vec::with_capacity(plane.len());
    for y in 0..height {
        let (ty0, ty1, wy) = layout.neighbours(y, layout.tile_h, layout.count_y);
        for x in 0..width {
            let (tx0, tx1, wx) = layout.neighbours(x, layout.tile_w, layout.count_x);
            let bin = padded[(y * padded_w + x) as usize] as usize;

            let lut = |tx: u32, ty: u32| luts[(ty * layout.count_x + tx) as usize][bin];
            let top = lut(tx0, ty0) * (1.0 - wx) + lut(tx1, ty0) * wx;
            let bottom = lut(tx0, ty1) * (1.0 - wx) + lut(tx1, ty1) * wx;
            out.push(top * (1.0 - wy) + bottom * wy);
        }
    }
    out
}

/// Equal-sized tiles covering the plane padded up to a whole grid
#[derive(Debug, PartialEq)]
struct TileLayout {
    tile_w: u32,
    tile_h: u32,
    count_x: u32,
    count_y: u32,
}

impl TileLayout {
    fn new(width: u32, height: u32, params: ClaheParams) -> Self {
        let count_x = params.tiles_x.max(1);
        let count_y = params.tiles_y.max(1);
        Self {
            tile_w: width.div_ceil(count_x).max(1),
            tile_h: height.div_ceil(count_y).max(1),
            count_x,
            count_y,
        }
    }

    fn padded_width(&self) -> u32 {
        self.tile_w * self.count_x
    }

    fn padded_height(&self) -> u32 {
        self.tile_h * self.count_y
    }

    /// Quantize the plane to bins, mirroring it past the right and bottom edges
    fn pad(&self, plane: &[f32], width: u32, height: u32) -> Vec<u8> {
        let (padded_w, padded_h) = (self.padded_width(), self.padded_height());
        let mut bins = Vec::with_capacity((padded_w * padded_h) as usize);
        for y in 0..padded_h {
            let row = reflect(y, height) * width;
            for x in 0..padded_w {
                let v = plane[(row + reflect(x, width)) as usize];
                bins.push(v.round().clamp(0.0, 255.0) as u8);
            }
        }
        bins
    }

    /// Indices of the two tiles whose centers bracket `pos`, and the blend weight
    fn neighbours(&self, pos: u32, tile: u32, count: u32) -> (u32, u32, f32) {
        let f = (pos as f32 + 0.5) / tile as f32 - 0.5;
        let lower = f.floor().max(0.0) as u32;
        let lower = lower.min(count - 1);
        let upper = (lower + 1).min(count - 1);
        let weight = if upper == lower {
            0.0
        } else {
            (f - lower as f32).clamp(0.0, 1.0)
        };
        (lower, upper, weight)
    }
}

/// Mirror an index into `0..len` without repeating the edge sample (`dcb|abcd|cba`)
fn reflect(index: u32, len: u32) -> u32 {
    if len <= 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let i = index % period;
    if i >= len {
        period - i
    } else {
        i
    }
}

fn tile_lut(padded: &[u8], layout: &TileLayout, tx: u32, ty: u32, clip_limit: f32) -> Vec<f32> {
    let padded_w = layout.padded_width();
    let x0 = tx * layout.tile_w;
    let y0 = ty * layout.tile_h;

    let mut histogram = [0u32; BINS];
    for y in y0..y0 + layout.tile_h {
        let row = &padded[(y * padded_w + x0) as usize..(y * padded_w + x0 + layout.tile_w) as usize];
        for &bin in row {
            histogram[bin as usize] += 1;
        }
    }
    let area = layout.tile_w * layout.tile_h;

    if clip_limit > 0.0 {
        let limit = ((clip_limit * area as f32 / BINS as f32) as u32).max(1);
        clip_histogram(&mut histogram, limit);
    }

    let scale = 255.0 / area as f32;
    let mut cumulative = 0u32;
    histogram
        .iter()
        .map(|&count| {
            cumulative += count;
            (cumulative as f32 * scale).min(255.0)
        })
        .collect()
}

/// Clip every bin at `limit` and spread the excess evenly over all bins
fn clip_histogram(histogram: &mut [u32; BINS], limit: u32) {
    let mut excess = 0u32;
    for count in histogram.iter_mut() {
        if *count > limit {
            excess += *count - limit;
            *count = limit;
        }
    }

    let per_bin = excess / BINS as u32;
    let residual = excess as usize % BINS;
    for count in histogram.iter_mut() {
        *count += per_bin;
    }
    if residual > 0 {
        let step = (BINS / residual).max(1);
        for i in (0..BINS).step_by(step).take(residual) {
            histogram[i] += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn spread(plane: &[f32]) -> f32 {
        let min = plane.iter().cloned().fold(f32::MAX, f32::min);
        let max = plane.iter().cloned().fold(f32::MIN, f32::max);
        max - min
    }

    #[test]
    fn test_uniform_plane_stays_uniform() {
        let plane = vec![128.0; 40 * 40];
        let out = clahe(&plane, 40, 40, ClaheParams::new(4.0, 8));

        let first = out[0];
        assert!(out.iter().all(|&v| (v - first).abs() < 1e-3));
    }

    #[test]
    fn test_narrow_histogram_is_widened() {
        let (w, h) = (64u32, 64u32);
        let plane: Vec<f32> = (0..w * h).map(|i| 100.0 + (i % 10) as f32).collect();
        let out = clahe(&plane, w, h, ClaheParams::new(4.0, 1));

        assert!(spread(&out) > spread(&plane) * 2.0, "spread {} -> {}", spread(&plane), spread(&out));
    }

    #[test]
    fn test_clip_preserves_total_count() {
        let mut histogram = [0u32; BINS];
        histogram[10] = 1000;
        histogram[200] = 37;
        let before: u32 = histogram.iter().sum();

        clip_histogram(&mut histogram, 50);

        let after: u32 = histogram.iter().sum();
        assert_eq!(before, after);
        assert!(histogram[10] <= 50 + 1000 / BINS as u32 + 1);
    }

    #[test]
    fn test_tiny_image_with_more_tiles_than_pixels() {
        let plane = vec![10.0, 200.0, 30.0, 90.0];
        let out = clahe(&plane, 2, 2, ClaheParams::new(2.0, 8));
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|v| v.is_finite() && (0.0..=255.0).contains(v)));
    }

    #[test]
    fn test_equalize_luma_keeps_gray_neutral() {
        let image = RgbImage::from_fn(32, 32, |x, _| {
            let v = 90 + (x as u8 % 16);
            Rgb([v, v, v])
        });
        let out = equalize_luma(&image, ClaheParams::new(2.0, 6));

        for pixel in out.pixels() {
            assert!((pixel[0] as i32 - pixel[1] as i32).abs() <= 1);
            assert!((pixel[1] as i32 - pixel[2] as i32).abs() <= 1);
        }
    }

    #[test]
    fn test_grid_is_honored_when_size_does_not_divide() {
        let layout = TileLayout::new(50, 10, ClaheParams::new(2.0, 8));
        assert_eq!(layout, TileLayout { tile_w: 7, tile_h: 2, count_x: 8, count_y: 8 });
        assert_eq!((layout.padded_width(), layout.padded_height()), (56, 16));

        let layout = TileLayout::new(2, 2, ClaheParams::new(2.0, 8));
        assert_eq!((layout.tile_w, layout.count_x), (1, 8));
    }

    #[test]
    fn test_reflect_skips_edge_sample() {
        let mirrored: Vec<u32> = (0..9).map(|i| reflect(i, 4)).collect();
        assert_eq!(mirrored, vec![0, 1, 2, 3, 2, 1, 0, 1, 2]);
        assert_eq!(reflect(5, 1), 0);
    }

    #[test]
    fn test_padding_mirrors_last_columns() {
        let layout = TileLayout::new(5, 1, ClaheParams { clip_limit: 2.0, tiles_x: 2, tiles_y: 1 });
        let plane = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(layout.pad(&plane, 5, 1), vec![10, 20, 30, 40, 50, 40]);
    }

    #[test]
    fn test_uneven_width_stays_uniform_and_sized() {
        let plane = vec![128.0; 50 * 10];
        let out = clahe(&plane, 50, 10, ClaheParams::new(4.0, 8));

        assert_eq!(out.len(), 500);
        let first = out[0];
        assert!(out.iter().all(|&v| (v - first).abs() < 1e-3));
    }

    #[test]
    fn test_params_display() {
        assert_eq!(ClaheParams::new(4.0, 8).to_string(), "clip 4.0, 8x8 tiles");
    }
}
