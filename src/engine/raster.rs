// ============================================================================
// MASK RASTERIZER — sparse true-pixel lists → dense RGBA overlays
// ============================================================================

use image::{Rgba, RgbaImage};

use super::grid::{GridIndex, MaskId};

/// Cyan, fully opaque.
pub const DEFAULT_OVERLAY_COLOR: Rgba<u8> = Rgba([0, 255, 255, 255]);

/// One pixel of a mask. `row` is the y coordinate, `col` the x coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelCoord {
    pub row: u32,
    pub col: u32,
}

impl PixelCoord {
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// Sparse mask: the pixels that belong to it, nothing else.
#[derive(Clone, Debug, PartialEq)]
pub struct MaskRecord {
    pub id: MaskId,
    pub true_pixels: Vec<PixelCoord>,
}

/// Everything the service computed for one image.
#[derive(Clone, Debug)]
pub struct MaskSet {
    width: u32,
    height: u32,
    grid: GridIndex,
    masks: Vec<MaskRecord>,
}

impl MaskSet {
    pub fn new(width: u32, height: u32, grid: GridIndex, masks: Vec<MaskRecord>) -> Self {
        Self { width, height, grid, masks }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn grid(&self) -> &GridIndex {
        &self.grid
    }

    pub fn len(&self) -> usize {
        self.masks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masks.is_empty()
    }

    pub fn get(&self, id: MaskId) -> Option<&MaskRecord> {
        self.masks.get(id.0)
    }

    /// Rasterize mask `id` over `base`. `None` when the id is unknown or the
    /// base does not have the mask set's dimensions.
    pub fn rasterize(&self, id: MaskId, base: &RgbaImage, color: Rgba<u8>) -> Option<RgbaImage> {
        if base.dimensions() != (self.width, self.height) {
            crate::log_warn!(
                "Overlay base is {}x{}, masks are {}x{}; skipping",
                base.width(),
                base.height(),
                self.width,
                self.height
            );
            return None;
        }
        self.get(id).map(|mask| rasterize(mask, base, color))
    }
}

/// Transparent canvas used as the base before anything is confirmed.
pub fn blank_overlay(width: u32, height: u32) -> RgbaImage {
    RgbaImage::new(width, height)
}

/// Copy `base` and paint every true pixel of `mask` with `color`.
///
/// The base is never modified. Coordinates outside the base are skipped.
pub fn rasterize(mask: &MaskRecord, base: &RgbaImage, color: Rgba<u8>) -> RgbaImage {
    let mut out = base.clone();
    let (width, height) = out.dimensions();
    let stride = width as usize;
    let buf: &mut [u8] = &mut out;
    for p in &mask.true_pixels {
        if p.row >= height || p.col >= width {
            continue;
        }
        let idx = (p.row as usize * stride + p.col as usize) * 4;
        buf[idx..idx + 4].copy_from_slice(&color.0);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask(pixels: &[(u32, u32)]) -> MaskRecord {
        MaskRecord {
            id: MaskId(0),
            true_pixels: pixels.iter().map(|&(r, c)| PixelCoord::new(r, c)).collect(),
        }
    }

    #[test]
    fn alpha_is_set_exactly_at_true_pixels() {
        let out = rasterize(&mask(&[(0, 0), (0, 1)]), &blank_overlay(4, 4), DEFAULT_OVERLAY_COLOR);
        for (i, px) in out.pixels().enumerate() {
            let expected = if i == 0 || i == 1 { 255 } else { 0 };
            assert_eq!(px[3], expected, "linear index {}", i);
        }
        assert_eq!(*out.get_pixel(1, 0), DEFAULT_OVERLAY_COLOR);
    }

    #[test]
    fn row_is_y_and_col_is_x() {
        // (row 2, col 1) is x=1, y=2
        let out = rasterize(&mask(&[(2, 1)]), &blank_overlay(3, 4), DEFAULT_OVERLAY_COLOR);
        assert_eq!(out.get_pixel(1, 2)[3], 255);
        assert_eq!(out.get_pixel(2, 1)[3], 0);
    }

    #[test]
    fn base_is_left_untouched() {
        let base = blank_overlay(4, 4);
        let before = base.clone();
        let _ = rasterize(&mask(&[(1, 1), (3, 3)]), &base, DEFAULT_OVERLAY_COLOR);
        assert_eq!(base.as_raw(), before.as_raw());
    }

    #[test]
    fn same_inputs_give_same_output() {
        let mut base = blank_overlay(5, 5);
        base.put_pixel(4, 4, Rgba([9, 9, 9, 9]));
        let m = mask(&[(0, 2), (2, 0), (4, 3)]);
        let a = rasterize(&m, &base, DEFAULT_OVERLAY_COLOR);
        let b = rasterize(&m, &base, DEFAULT_OVERLAY_COLOR);
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn keeps_earlier_overlay_pixels() {
        let first = rasterize(&mask(&[(0, 0)]), &blank_overlay(2, 2), DEFAULT_OVERLAY_COLOR);
        let second = rasterize(&mask(&[(1, 1)]), &first, DEFAULT_OVERLAY_COLOR);
        assert_eq!(second.get_pixel(0, 0)[3], 255);
        assert_eq!(second.get_pixel(1, 1)[3], 255);
        assert_eq!(second.get_pixel(1, 0)[3], 0);
    }

    #[test]
    fn out_of_range_pixels_are_skipped() {
        let out = rasterize(&mask(&[(9, 0), (0, 9)]), &blank_overlay(2, 2), DEFAULT_OVERLAY_COLOR);
        assert!(out.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn mask_set_refuses_mismatched_base() {
        let grid = GridIndex::new(1.0, 1.0, &[vec![0]], 1).unwrap();
        let set = MaskSet::new(2, 2, grid, vec![mask(&[(0, 0)])]);
        assert!(set.rasterize(MaskId(0), &blank_overlay(3, 3), DEFAULT_OVERLAY_COLOR).is_none());
        assert!(set.rasterize(MaskId(1), &blank_overlay(2, 2), DEFAULT_OVERLAY_COLOR).is_none());
        assert!(set.rasterize(MaskId(0), &blank_overlay(2, 2), DEFAULT_OVERLAY_COLOR).is_some());
    }
}
