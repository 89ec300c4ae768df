use serde::{Deserialize, Serialize};

/// Bounding box in frame-relative coordinates (fractions of width/height).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Scales to pixel coordinates of a `frame_width x frame_height` frame.
    pub fn to_pixel_rect(&self, frame_width: u32, frame_height: u32) -> PixelRect {
        let fw = frame_width as f32;
        let fh = frame_height as f32;
        PixelRect {
            x: (self.x * fw).round() as i32,
            y: (self.y * fh).round() as i32,
            width: (self.width * fw).round() as i32,
            height: (self.height * fh).round() as i32,
        }
    }
}

/// Integer pixel rectangle. Ordered so it can key a sorted map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelRect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_corners(x_min: i32, y_min: i32, x_max: i32, y_max: i32) -> Self {
        Self::new(
            x_min,
            y_min,
            x_max.saturating_sub(x_min),
            y_max.saturating_sub(y_min),
        )
    }

    pub fn full_frame(frame_width: u32, frame_height: u32) -> Self {
        Self::new(0, 0, frame_width as i32, frame_height as i32)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.width)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.height)
    }

    /// Overlap of two rectangles; an empty rectangle when they are disjoint.
    pub fn intersect(&self, other: &PixelRect) -> PixelRect {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());
        if x2 <= x1 || y2 <= y1 {
            return PixelRect::default();
        }
        PixelRect::from_corners(x1, y1, x2, y2)
    }

    /// Corner form `[x1, y1, x2, y2]` used by IoU-based association.
    pub fn to_bbox(&self) -> [f64; 4] {
        [
            self.x as f64,
            self.y as f64,
            self.right() as f64,
            self.bottom() as f64,
        ]
    }

    pub fn to_normalized(&self, frame_width: u32, frame_height: u32) -> Rect {
        let fw = frame_width as f32;
        let fh = frame_height as f32;
        Rect {
            x: self.x as f32 / fw,
            y: self.y as f32 / fh,
            width: self.width as f32 / fw,
            height: self.height as f32 / fh,
        }
    }
}
