use ndarray::{Array2, ArrayView2};

use crate::rect::Rect;

/// Grayscale appearance template cropped from a frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    data: Array2<f32>,
}

impl Patch {
    #[inline]
    pub fn new(data: Array2<f32>) -> Self {
        Self { data }
    }

    /// Crops `rect` out of `image`, clamped to the image bounds. A rect
    /// entirely outside the image yields an empty patch.
    pub fn crop(image: ArrayView2<f32>, rect: &Rect) -> Self {
        let (rows, cols) = image.dim();

        let x0 = rect.x.max(0.0) as usize;
        let y0 = rect.y.max(0.0) as usize;
        let x1 = (rect.right().max(0.0) as usize).min(cols);
        let y1 = (rect.bottom().max(0.0) as usize).min(rows);

        if x0 >= x1 || y0 >= y1 {
            return Self {
                data: Array2::zeros((0, 0)),
            };
        }

        Self {
            data: image.slice(ndarray::s![y0..y1, x0..x1]).to_owned(),
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bilinear resample to `rows` x `cols`.
    pub fn resized(&self, rows: usize, cols: usize) -> Self {
        let (sr, sc) = self.data.dim();

        if sr == rows && sc == cols {
            return self.clone();
        }

        if sr == 0 || sc == 0 || rows == 0 || cols == 0 {
            return Self {
                data: Array2::zeros((rows, cols)),
            };
        }

        let row_scale = sr as f32 / rows as f32;
        let col_scale = sc as f32 / cols as f32;

        let data = Array2::from_shape_fn((rows, cols), |(r, c)| {
            let y = ((r as f32 + 0.5) * row_scale - 0.5).clamp(0.0, (sr - 1) as f32);
            let x = ((c as f32 + 0.5) * col_scale - 0.5).clamp(0.0, (sc - 1) as f32);

            let y0 = y as usize;
            let x0 = x as usize;
            let y1 = (y0 + 1).min(sr - 1);
            let x1 = (x0 + 1).min(sc - 1);
            let fy = y - y0 as f32;
            let fx = x - x0 as f32;

            let top = self.data[[y0, x0]] * (1.0 - fx) + self.data[[y0, x1]] * fx;
            let bottom = self.data[[y1, x0]] * (1.0 - fx) + self.data[[y1, x1]] * fx;

            top * (1.0 - fy) + bottom * fy
        });

        Self { data }
    }

    /// Zero-mean normalized cross-correlation against a same-sized patch,
    /// in [-1, 1]. Mismatched shapes or flat patches score 0.
    pub fn correlation(&self, other: &Patch) -> f32 {
        if self.data.dim() != other.data.dim() || self.data.is_empty() {
            return 0.0;
        }

        let mean_a = self.data.mean().unwrap_or(0.0);
        let mean_b = other.data.mean().unwrap_or(0.0);

        let mut num = 0.0;
        let mut var_a = 0.0;
        let mut var_b = 0.0;

        for (a, b) in self.data.iter().zip(other.data.iter()) {
            let da = a - mean_a;
            let db = b - mean_b;

            num += da * db;
            var_a += da * da;
            var_b += db * db;
        }

        let denom = (var_a * var_b).sqrt();

        if denom <= f32::EPSILON {
            0.0
        } else {
            num / denom
        }
    }
}
