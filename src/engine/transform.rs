//! Screen-space ↔ image-space conversion.
//!
//! The viewer draws the image scaled to fit its panel, so pointer positions
//! arrive in displayed pixels and must be scaled back to the image's natural
//! pixels before any grid lookup.

/// A position in natural image pixels (x = column, y = row).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImagePoint {
    pub x: f64,
    pub y: f64,
}

impl ImagePoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Finite and not left of / above the origin.
    pub fn is_on_canvas(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.x >= 0.0 && self.y >= 0.0
    }
}

/// A pointer position relative to the top-left corner of the displayed image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn from_pixels(width: u32, height: u32) -> Self {
        Self::new(width as f64, height as f64)
    }

    fn is_drawable(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Map a displayed-space point to natural image pixels.
///
/// Each axis is scaled by `natural / displayed`. Returns `None` when the
/// displayed size is degenerate (image not laid out yet). Points outside
/// the image are passed through unclamped; the grid rejects them.
pub fn screen_to_image(point: ScreenPoint, displayed: Size, natural: Size) -> Option<ImagePoint> {
    if !displayed.is_drawable() || !natural.is_drawable() {
        return None;
    }
    let sx = natural.width / displayed.width;
    let sy = natural.height / displayed.height;
    Some(ImagePoint::new(point.x * sx, point.y * sy))
}

/// Largest size with the image's aspect ratio that fits into `available`.
pub fn fit_to(natural: Size, available: Size) -> Size {
    if !natural.is_drawable() || !available.is_drawable() {
        return Size::new(0.0, 0.0);
    }
    let scale = (available.width / natural.width).min(available.height / natural.height);
    Size::new(natural.width * scale, natural.height * scale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_size_display_doubles_coordinates() {
        let p = screen_to_image(
            ScreenPoint::new(30.0, 12.5),
            Size::new(50.0, 50.0),
            Size::new(100.0, 100.0),
        );
        assert_eq!(p, Some(ImagePoint::new(60.0, 25.0)));
    }

    #[test]
    fn identity_when_displayed_at_natural_size() {
        let p = screen_to_image(
            ScreenPoint::new(7.0, 3.0),
            Size::new(640.0, 480.0),
            Size::new(640.0, 480.0),
        );
        assert_eq!(p, Some(ImagePoint::new(7.0, 3.0)));
    }

    #[test]
    fn negative_offsets_stay_negative() {
        let p = screen_to_image(
            ScreenPoint::new(-4.0, 2.0),
            Size::new(200.0, 100.0),
            Size::new(400.0, 200.0),
        )
        .unwrap();
        assert!(p.x < 0.0);
        assert!(!p.is_on_canvas());
        assert!(ImagePoint::new(0.0, 0.0).is_on_canvas());
    }

    #[test]
    fn zero_sized_display_yields_nothing() {
        assert_eq!(
            screen_to_image(ScreenPoint::new(1.0, 1.0), Size::new(0.0, 10.0), Size::new(10.0, 10.0)),
            None
        );
    }

    #[test]
    fn fit_keeps_aspect_ratio() {
        assert_eq!(fit_to(Size::new(400.0, 200.0), Size::new(100.0, 100.0)), Size::new(100.0, 50.0));
        assert_eq!(fit_to(Size::new(100.0, 300.0), Size::new(600.0, 600.0)), Size::new(200.0, 600.0));
    }
}
