//! Coordinate transformation between screen, canonical and PDF coordinate systems
//!
//! Three spaces are involved:
//! - screen: CSS pixels relative to the top-left corner of a rendered page,
//!   after the viewer applied its zoom and the page rotation
//! - canonical: PDF points relative to the top-left corner of the page's
//!   visible box (CropBox clipped to the MediaBox), unrotated, y growing
//!   downward. Redactions are stored here.
//! - output: PDF user space (bottom-left origin, offset by the visible box origin)

use serde::{Deserialize, Serialize};

/// Page dimensions in points (1 point = 1/72 inch), unrotated
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub const LETTER: PageSize = PageSize {
        width: 612.0,
        height: 792.0,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Clockwise page rotation, as in the PDF `/Rotate` entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    #[serde(rename = "0")]
    Deg0,
    #[serde(rename = "90")]
    Deg90,
    #[serde(rename = "180")]
    Deg180,
    #[serde(rename = "270")]
    Deg270,
}

impl Rotation {
    /// Normalize any angle to the nearest quarter turn in 0..360
    pub fn from_degrees(angle: i64) -> Self {
        let normalized = angle.rem_euclid(360);
        match ((normalized + 45) / 90) % 4 {
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            3 => Rotation::Deg270,
            _ => Rotation::Deg0,
        }
    }

    pub fn degrees(self) -> u32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Compose two clockwise rotations
    pub fn then(self, other: Rotation) -> Rotation {
        Rotation::from_degrees(i64::from(self.degrees() + other.degrees()))
    }

    fn is_quarter_turn(self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }
}

/// Rectangle in canonical page space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CanonicalRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Position and size as fractions of the page: `(x, y, width, height)`
    pub fn fractions(&self, page: PageSize) -> (f64, f64, f64, f64) {
        (
            self.x / page.width,
            self.y / page.height,
            self.width / page.width,
            self.height / page.height,
        )
    }
}

/// Rectangle in PDF user space, `(x, y)` is the bottom-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl OutputRect {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn top(&self) -> f64 {
        self.y + self.height
    }

    /// True when the two rectangles share a region of positive area
    pub fn overlaps(&self, other: &OutputRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.top()
            && other.y < self.top()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Rectangle in CSS pixels relative to the rendered page's top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Normalized rectangle spanned by two corners, in any order
    pub fn from_corners(a: ScreenPoint, b: ScreenPoint) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    /// Smallest rectangle covering both
    pub fn union(&self, other: &ScreenRect) -> ScreenRect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        let right = (self.x + self.width).max(other.x + other.width);
        let bottom = (self.y + self.height).max(other.y + other.height);
        ScreenRect::new(x, y, right - x, bottom - y)
    }
}

/// How one page is currently rendered on screen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageViewport {
    /// Unrotated page size in points
    pub size: PageSize,
    /// CSS pixels per point
    pub scale: f64,
    pub rotation: Rotation,
}

impl PageViewport {
    pub fn new(size: PageSize, scale: f64, rotation: Rotation) -> Self {
        Self {
            size,
            scale,
            rotation,
        }
    }

    /// Rendered width and height in pixels, after rotation
    pub fn pixel_size(&self) -> (f64, f64) {
        let (w, h) = if self.rotation.is_quarter_turn() {
            (self.size.height, self.size.width)
        } else {
            (self.size.width, self.size.height)
        };
        (w * self.scale, h * self.scale)
    }

    fn canonical_point(&self, point: ScreenPoint) -> (f64, f64) {
        let (vx, vy) = (point.x / self.scale, point.y / self.scale);
        let PageSize { width, height } = self.size;
        match self.rotation {
            Rotation::Deg0 => (vx, vy),
            Rotation::Deg90 => (vy, height - vx),
            Rotation::Deg180 => (width - vx, height - vy),
            Rotation::Deg270 => (width - vy, vx),
        }
    }

    fn screen_point(&self, cx: f64, cy: f64) -> ScreenPoint {
        let PageSize { width, height } = self.size;
        let (vx, vy) = match self.rotation {
            Rotation::Deg0 => (cx, cy),
            Rotation::Deg90 => (height - cy, cx),
            Rotation::Deg180 => (width - cx, height - cy),
            Rotation::Deg270 => (cy, width - cx),
        };
        ScreenPoint::new(vx * self.scale, vy * self.scale)
    }
}

/// Convert an on-screen rectangle to canonical page space
pub fn screen_to_canonical(rect: ScreenRect, viewport: &PageViewport) -> CanonicalRect {
    let (ax, ay) = viewport.canonical_point(ScreenPoint::new(rect.x, rect.y));
    let (bx, by) = viewport.canonical_point(ScreenPoint::new(
        rect.x + rect.width,
        rect.y + rect.height,
    ));
    CanonicalRect::new(ax.min(bx), ay.min(by), (ax - bx).abs(), (ay - by).abs())
}

/// Convert a canonical rectangle to its on-screen position for the viewport
pub fn canonical_to_screen(rect: CanonicalRect, viewport: &PageViewport) -> ScreenRect {
    let a = viewport.screen_point(rect.x, rect.y);
    let b = viewport.screen_point(rect.right(), rect.bottom());
    ScreenRect::from_corners(a, b)
}

/// Convert a canonical rectangle to PDF user space for a page's visible box
/// `[x0, y0, x1, y1]`
pub fn canonical_to_output(rect: CanonicalRect, page_box: [f64; 4]) -> OutputRect {
    let [mb_x, mb_y, _, mb_top] = page_box;
    let height = mb_top - mb_y;
    OutputRect {
        x: mb_x + rect.x,
        y: mb_y + (height - rect.y - rect.height),
        width: rect.width,
        height: rect.height,
    }
}

/// Inverse of [`canonical_to_output`]
pub fn output_to_canonical(rect: OutputRect, page_box: [f64; 4]) -> CanonicalRect {
    let [mb_x, mb_y, _, mb_top] = page_box;
    let height = mb_top - mb_y;
    CanonicalRect {
        x: rect.x - mb_x,
        y: height - (rect.y - mb_y) - rect.height,
        width: rect.width,
        height: rect.height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LETTER_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} vs {}", a, b);
    }

    #[test]
    fn test_rotation_normalization() {
        assert_eq!(Rotation::from_degrees(0), Rotation::Deg0);
        assert_eq!(Rotation::from_degrees(90), Rotation::Deg90);
        assert_eq!(Rotation::from_degrees(360), Rotation::Deg0);
        assert_eq!(Rotation::from_degrees(450), Rotation::Deg90);
        assert_eq!(Rotation::from_degrees(-90), Rotation::Deg270);
        assert_eq!(Rotation::Deg270.then(Rotation::Deg180), Rotation::Deg90);
    }

    #[test]
    fn test_screen_to_canonical_divides_by_scale() {
        let viewport = PageViewport::new(PageSize::LETTER, 1.5, Rotation::Deg0);
        let rect = screen_to_canonical(ScreenRect::new(150.0, 300.0, 225.0, 30.0), &viewport);
        assert_eq!(rect, CanonicalRect::new(100.0, 200.0, 150.0, 20.0));
    }

    #[test]
    fn test_quarter_turn_swaps_axes() {
        // Rotated 90 degrees clockwise, the page's top edge is on the right
        let viewport = PageViewport::new(PageSize::LETTER, 1.0, Rotation::Deg90);
        assert_eq!(viewport.pixel_size(), (792.0, 612.0));

        let top_left = CanonicalRect::new(0.0, 0.0, 10.0, 20.0);
        let screen = canonical_to_screen(top_left, &viewport);
        assert_eq!(screen, ScreenRect::new(772.0, 0.0, 20.0, 10.0));
        assert_eq!(screen_to_canonical(screen, &viewport), top_left);
    }

    #[test]
    fn test_canonical_to_output_flips_y() {
        let out = canonical_to_output(CanonicalRect::new(100.0, 200.0, 150.0, 20.0), LETTER_BOX);
        assert_eq!(
            out,
            OutputRect {
                x: 100.0,
                y: 572.0,
                width: 150.0,
                height: 20.0
            }
        );
    }

    #[test]
    fn test_canonical_to_output_honours_media_box_origin() {
        let media_box = [10.0, 20.0, 622.0, 812.0];
        let rect = CanonicalRect::new(0.0, 0.0, 50.0, 50.0);
        let out = canonical_to_output(rect, media_box);
        assert_close(out.x, 10.0);
        assert_close(out.top(), 812.0);
        assert_eq!(output_to_canonical(out, media_box), rect);
    }

    #[test]
    fn test_output_overlap_requires_area() {
        let a = OutputRect {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
        };
        let touching = OutputRect {
            x: 10.0,
            y: 0.0,
            width: 5.0,
            height: 5.0,
        };
        let inside = OutputRect {
            x: 2.0,
            y: 2.0,
            width: 1.0,
            height: 1.0,
        };
        assert!(!a.overlaps(&touching));
        assert!(a.overlaps(&inside));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn dimension() -> impl Strategy<Value = f64> {
        1.0f64..2000.0
    }

    fn rotation() -> impl Strategy<Value = Rotation> {
        prop_oneof![
            Just(Rotation::Deg0),
            Just(Rotation::Deg90),
            Just(Rotation::Deg180),
            Just(Rotation::Deg270),
        ]
    }

    /// A rectangle inside a page given as fractions of its size
    fn fractional_rect() -> impl Strategy<Value = (f64, f64, f64, f64)> {
        (0.0f64..0.9, 0.0f64..0.9).prop_flat_map(|(fx, fy)| {
            (
                Just(fx),
                Just(fy),
                0.01f64..(1.0 - fx),
                0.01f64..(1.0 - fy),
            )
        })
    }

    proptest! {
        /// Property: screen -> canonical -> screen returns the original rectangle
        #[test]
        fn roundtrip_screen_canonical_screen(
            page_w in dimension(),
            page_h in dimension(),
            scale in 0.25f64..4.0,
            rotation in rotation(),
            (fx, fy, fw, fh) in fractional_rect(),
        ) {
            let viewport = PageViewport::new(PageSize::new(page_w, page_h), scale, rotation);
            let (px_w, px_h) = viewport.pixel_size();
            let screen = ScreenRect::new(fx * px_w, fy * px_h, fw * px_w, fh * px_h);

            let back = canonical_to_screen(screen_to_canonical(screen, &viewport), &viewport);

            let tolerance = 1e-6;
            prop_assert!((back.x - screen.x).abs() < tolerance);
            prop_assert!((back.y - screen.y).abs() < tolerance);
            prop_assert!((back.width - screen.width).abs() < tolerance);
            prop_assert!((back.height - screen.height).abs() < tolerance);
        }

        /// Property: the canonical rectangle's page fractions do not depend on
        /// the render scale it was drawn at, and survive output conversion
        #[test]
        fn fractions_invariant_under_render_scale(
            page_w in dimension(),
            page_h in dimension(),
            scale_a in 0.25f64..4.0,
            scale_b in 0.25f64..4.0,
            rotation in rotation(),
            (fx, fy, fw, fh) in fractional_rect(),
        ) {
            let size = PageSize::new(page_w, page_h);
            let canonical = CanonicalRect::new(fx * page_w, fy * page_h, fw * page_w, fh * page_h);

            let at_a = PageViewport::new(size, scale_a, rotation);
            let at_b = PageViewport::new(size, scale_b, rotation);
            // The same on-screen region after the viewer zooms from scale a to b
            let drawn = canonical_to_screen(canonical, &at_a);
            let k = scale_b / scale_a;
            let zoomed = ScreenRect::new(drawn.x * k, drawn.y * k, drawn.width * k, drawn.height * k);
            let rescaled = screen_to_canonical(zoomed, &at_b);

            let expected = canonical.fractions(size);
            let got = rescaled.fractions(size);
            let tolerance = 1e-9;
            prop_assert!((got.0 - expected.0).abs() < tolerance);
            prop_assert!((got.1 - expected.1).abs() < tolerance);
            prop_assert!((got.2 - expected.2).abs() < tolerance);
            prop_assert!((got.3 - expected.3).abs() < tolerance);

            let media_box = [0.0, 0.0, page_w, page_h];
            let output = canonical_to_output(rescaled, media_box);
            prop_assert!(((output.x / page_w) - expected.0).abs() < tolerance);
            prop_assert!(((output.width / page_w) - expected.2).abs() < tolerance);
            prop_assert!((((page_h - output.top()) / page_h) - expected.1).abs() < tolerance);
        }

        /// Property: canonical -> output -> canonical is the identity
        #[test]
        fn roundtrip_canonical_output(
            mb_x in -100.0f64..100.0,
            mb_y in -100.0f64..100.0,
            page_w in dimension(),
            page_h in dimension(),
            (fx, fy, fw, fh) in fractional_rect(),
        ) {
            let media_box = [mb_x, mb_y, mb_x + page_w, mb_y + page_h];
            let rect = CanonicalRect::new(fx * page_w, fy * page_h, fw * page_w, fh * page_h);
            let back = output_to_canonical(canonical_to_output(rect, media_box), media_box);

            let tolerance = 1e-6;
            prop_assert!((back.x - rect.x).abs() < tolerance);
            prop_assert!((back.y - rect.y).abs() < tolerance);
            prop_assert!((back.width - rect.width).abs() < tolerance);
            prop_assert!((back.height - rect.height).abs() < tolerance);
        }
    }
}
