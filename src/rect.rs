use serde_derive::{Deserialize, Serialize};

/// Axis-aligned box in image coordinates, left-top-width-height as produced
/// by the blob extractor.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    #[inline]
    pub fn ltwh(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    #[inline]
    pub fn centered(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self {
            x: cx - w / 2.0,
            y: cy - h / 2.0,
            w,
            h,
        }
    }

    /// Box midpoint, used as the measured centroid of a blob.
    #[inline]
    pub fn center(&self) -> [f32; 2] {
        [self.x + self.w / 2.0, self.y + self.h / 2.0]
    }

    #[inline(always)]
    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    #[inline(always)]
    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.w * self.h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_is_box_midpoint() {
        let r = Rect::ltwh(10.0, 20.0, 4.0, 8.0);
        assert_eq!(r.center(), [12.0, 24.0]);
    }

    #[test]
    fn centered_round_trips() {
        let r = Rect::centered(12.0, 24.0, 4.0, 8.0);
        assert_eq!(r, Rect::ltwh(10.0, 20.0, 4.0, 8.0));
        assert_eq!(r.right(), 14.0);
        assert_eq!(r.bottom(), 28.0);
    }
}
