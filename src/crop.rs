//! Crop region over the chart image, kept in percent of the rendered image box
//! so it stays valid whatever size the image ends up drawn at.

use serde::{Deserialize, Serialize};

/// Percentage rectangle (0-100 on both axes) over the rendered image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRegion {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build the rectangle spanned by two corner points given in percent.
    /// Corners may come in any order; both are clamped into 0-100.
    pub fn from_corners(a: (f64, f64), b: (f64, f64)) -> Self {
        let (ax, ay) = (clamp_pct(a.0), clamp_pct(a.1));
        let (bx, by) = (clamp_pct(b.0), clamp_pct(b.1));
        Self {
            x: ax.min(bx),
            y: ay.min(by),
            width: (ax - bx).abs(),
            height: (ay - by).abs(),
        }
    }

    /// A region can drive the highlight only with a real area.
    pub fn is_valid(&self) -> bool {
        let finite = [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        finite && self.width > 0.0 && self.height > 0.0
    }

    /// Pull a region read back from storage into the image box.
    pub fn normalized(&self) -> Self {
        let x = clamp_pct(self.x);
        let y = clamp_pct(self.y);
        Self {
            x,
            y,
            width: clamp_pct(self.width).min(100.0 - x),
            height: clamp_pct(self.height).min(100.0 - y),
        }
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Map onto a box `width` x `height` pixels wide, see [`project_percent`].
    pub fn project(&self, width: u32, height: u32) -> PixelRect {
        project_percent((self.x, self.y, self.width, self.height), width, height)
    }
}

fn clamp_pct(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 100.0)
    }
}

/// Convert a point inside a `width` x `height` box into percent of that box.
pub fn to_percent(px: f64, py: f64, width: f64, height: f64) -> (f64, f64) {
    if width <= 0.0 || height <= 0.0 {
        return (0.0, 0.0);
    }
    (
        clamp_pct(px / width * 100.0),
        clamp_pct(py / height * 100.0),
    )
}

/// Integer rectangle in pixel space, half-open: `[x, x + width)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Map a percentage rectangle `(x, y, w, h)` onto a pixel box.
///
/// Edges are rounded independently so neighbouring rectangles that share an
/// edge in percent also share it in pixels. A rectangle with a positive
/// percent size always covers at least one pixel on that axis.
pub fn project_percent(rect: (f64, f64, f64, f64), width: u32, height: u32) -> PixelRect {
    let (x, y, w, h) = rect;
    let (x0, x1) = project_span(x, w, width);
    let (y0, y1) = project_span(y, h, height);
    PixelRect {
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
    }
}

fn project_span(start: f64, len: f64, extent: u32) -> (u32, u32) {
    if extent == 0 {
        return (0, 0);
    }
    let scale = extent as f64 / 100.0;
    let s = ((clamp_pct(start) * scale).round() as u32).min(extent);
    let mut e = ((clamp_pct(start + len.max(0.0)) * scale).round() as u32).min(extent);
    if len > 0.0 && e <= s {
        if s < extent {
            e = s + 1;
        } else {
            return (extent - 1, extent);
        }
    }
    (s, e.max(s))
}

/// In-progress selection while the pointer is held down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropDraft {
    anchor: (f64, f64),
    current: (f64, f64),
}

impl CropDraft {
    pub fn begin(at: (f64, f64)) -> Self {
        Self {
            anchor: at,
            current: at,
        }
    }

    pub fn drag_to(&mut self, at: (f64, f64)) {
        self.current = at;
    }

    pub fn region(&self) -> CropRegion {
        CropRegion::from_corners(self.anchor, self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_in_any_order() {
        let a = CropRegion::from_corners((10.0, 80.0), (60.0, 20.0));
        assert_eq!(a, CropRegion::new(10.0, 20.0, 50.0, 60.0));
        let b = CropRegion::from_corners((60.0, 20.0), (10.0, 80.0));
        assert_eq!(a, b);
    }

    #[test]
    fn corners_are_clamped_into_the_image() {
        let r = CropRegion::from_corners((-5.0, 50.0), (120.0, 150.0));
        assert_eq!(r, CropRegion::new(0.0, 50.0, 100.0, 50.0));
    }

    #[test]
    fn validity_requires_area() {
        assert!(CropRegion::new(0.0, 0.0, 1.0, 1.0).is_valid());
        assert!(!CropRegion::new(0.0, 0.0, 0.0, 10.0).is_valid());
        assert!(!CropRegion::new(0.0, 0.0, 10.0, 0.0).is_valid());
        assert!(!CropRegion::new(0.0, 0.0, f64::NAN, 10.0).is_valid());
    }

    #[test]
    fn normalized_keeps_region_inside() {
        let r = CropRegion::new(90.0, -3.0, 30.0, 50.0).normalized();
        assert_eq!(r, CropRegion::new(90.0, 0.0, 10.0, 50.0));
    }

    #[test]
    fn percent_of_box() {
        assert_eq!(to_percent(25.0, 10.0, 100.0, 40.0), (25.0, 25.0));
        assert_eq!(to_percent(5.0, 5.0, 0.0, 40.0), (0.0, 0.0));
        assert_eq!(to_percent(500.0, -1.0, 100.0, 40.0), (100.0, 0.0));
    }

    #[test]
    fn projection_rounds_edges() {
        let r = CropRegion::new(10.0, 25.0, 50.0, 50.0).project(40, 20);
        assert_eq!(
            r,
            PixelRect {
                x: 4,
                y: 5,
                width: 20,
                height: 10
            }
        );
    }

    #[test]
    fn thin_region_still_covers_a_pixel() {
        let r = project_percent((50.0, 99.9, 10.0, 0.05), 10, 10);
        assert_eq!(r.height, 1);
        assert_eq!(r.y, 9);
        let edge = project_percent((0.0, 100.0, 10.0, 0.01), 10, 10);
        assert_eq!((edge.y, edge.height), (9, 1));
    }

    #[test]
    fn draft_tracks_pointer() {
        let mut d = CropDraft::begin((20.0, 20.0));
        assert!(!d.region().is_valid());
        d.drag_to((40.0, 70.0));
        assert_eq!(d.region(), CropRegion::new(20.0, 20.0, 20.0, 50.0));
    }
}
