// ============================================================================
// GRID INDEX — coarse spatial lookup from image coordinates to mask ids
// ============================================================================
//
// The service buckets the image into cells of `cell_width` × `cell_height`
// pixels and records, per cell, which mask covers the cell center (or -1).
// A pointer position is resolved by flooring it into a cell and reading the
// id stored there; no pixel-exact test is done at this level.

use crate::error::{Error, Result};

use super::transform::ImagePoint;

/// Index into the session's mask list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaskId(pub usize);

/// Cell value the service writes when no mask covers a cell.
pub const NO_MASK: i64 = -1;

/// Outcome of looking up one coordinate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellLookup {
    /// Grid data has not arrived yet (or never will for this image).
    NotLoaded,
    /// Negative, non-finite, or past the last row/column.
    OutOfBounds,
    /// The cell exists but no mask covers it.
    NoMaskAtCell,
    Mask(MaskId),
}

impl CellLookup {
    pub fn mask_id(self) -> Option<MaskId> {
        match self {
            CellLookup::Mask(id) => Some(id),
            _ => None,
        }
    }
}

/// Immutable per-image grid descriptor.
#[derive(Clone, Debug, PartialEq)]
pub struct GridIndex {
    cell_width: f64,
    cell_height: f64,
    cols: usize,
    /// Row-major, `rows * cols` entries; `None` = no mask.
    cells: Vec<Option<MaskId>>,
}

impl GridIndex {
    /// Build the index from the service's nested rows.
    ///
    /// Rows must all have the same length and every id must be either
    /// [`NO_MASK`] or smaller than `mask_count`.
    pub fn new(
        cell_width: f64,
        cell_height: f64,
        rows: &[Vec<i64>],
        mask_count: usize,
    ) -> Result<Self> {
        if !(cell_width.is_finite() && cell_width > 0.0 && cell_height.is_finite() && cell_height > 0.0) {
            return Err(Error::InvalidMaskInfo(format!(
                "grid cell size must be positive, got {}x{}",
                cell_width, cell_height
            )));
        }
        let cols = rows.first().map_or(0, Vec::len);
        let mut cells = Vec::with_capacity(rows.len() * cols);
        for (r, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(Error::InvalidMaskInfo(format!(
                    "grid row {} has {} cells, expected {}",
                    r,
                    row.len(),
                    cols
                )));
            }
            for &value in row {
                let cell = match value {
                    NO_MASK => None,
                    v if v >= 0 && (v as u64) < mask_count as u64 => Some(MaskId(v as usize)),
                    v => {
                        return Err(Error::InvalidMaskInfo(format!(
                            "grid row {} references mask {} but only {} masks exist",
                            r, v, mask_count
                        )));
                    }
                };
                cells.push(cell);
            }
        }
        Ok(Self { cell_width, cell_height, cols, cells })
    }

    fn rows(&self) -> usize {
        if self.cols == 0 { 0 } else { self.cells.len() / self.cols }
    }

    /// Cell (row, col) containing an image point, if inside the grid.
    pub fn cell_of(&self, point: ImagePoint) -> Option<(usize, usize)> {
        if !point.is_on_canvas() {
            return None;
        }
        let row = (point.y / self.cell_height).floor();
        let col = (point.x / self.cell_width).floor();
        // Float-to-usize casts saturate; the comparisons reject anything past the edge
        let (row, col) = (row as usize, col as usize);
        (row < self.rows() && col < self.cols).then_some((row, col))
    }

    pub fn lookup(&self, point: ImagePoint) -> CellLookup {
        match self.cell_of(point) {
            None => CellLookup::OutOfBounds,
            Some((row, col)) => match self.cells[row * self.cols + col] {
                Some(id) => CellLookup::Mask(id),
                None => CellLookup::NoMaskAtCell,
            },
        }
    }

    /// `resolve(x, y)`: the mask under a point, if any.
    pub fn resolve(&self, point: ImagePoint) -> Option<MaskId> {
        self.lookup(point).mask_id()
    }
}

/// Lookup that also covers the "grid not loaded" state.
pub fn lookup(grid: Option<&GridIndex>, point: ImagePoint) -> CellLookup {
    match grid {
        Some(grid) => grid.lookup(point),
        None => CellLookup::NotLoaded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_by_two() -> GridIndex {
        GridIndex::new(50.0, 50.0, &[vec![0, -1], vec![-1, 1]], 2).unwrap()
    }

    #[test]
    fn floors_coordinates_into_cells() {
        let grid = two_by_two();
        assert_eq!(grid.lookup(ImagePoint::new(10.0, 10.0)), CellLookup::Mask(MaskId(0)));
        assert_eq!(grid.lookup(ImagePoint::new(49.99, 49.99)), CellLookup::Mask(MaskId(0)));
        assert_eq!(grid.lookup(ImagePoint::new(60.0, 10.0)), CellLookup::NoMaskAtCell);
        assert_eq!(grid.lookup(ImagePoint::new(60.0, 60.0)), CellLookup::Mask(MaskId(1)));
    }

    #[test]
    fn row_comes_from_y_and_column_from_x() {
        let grid = GridIndex::new(10.0, 10.0, &[vec![0, 1, 1]], 2).unwrap();
        assert_eq!(grid.resolve(ImagePoint::new(25.0, 5.0)), Some(MaskId(1)));
        assert_eq!(grid.resolve(ImagePoint::new(5.0, 25.0)), None);
    }

    #[test]
    fn negative_and_out_of_range_points_miss() {
        let grid = two_by_two();
        for p in [
            ImagePoint::new(-0.5, 10.0),
            ImagePoint::new(10.0, -3.0),
            ImagePoint::new(100.0, 10.0),
            ImagePoint::new(10.0, 1e12),
            ImagePoint::new(f64::NAN, 1.0),
        ] {
            assert_eq!(grid.lookup(p), CellLookup::OutOfBounds, "{:?}", p);
            assert_eq!(grid.resolve(p), None);
        }
    }

    #[test]
    fn missing_grid_is_not_the_same_as_an_empty_cell() {
        assert_eq!(lookup(None, ImagePoint::new(1.0, 1.0)), CellLookup::NotLoaded);
        let grid = two_by_two();
        assert_eq!(lookup(Some(&grid), ImagePoint::new(60.0, 1.0)), CellLookup::NoMaskAtCell);
    }

    #[test]
    fn rejects_inconsistent_grids() {
        assert!(GridIndex::new(0.0, 1.0, &[vec![-1]], 0).is_err());
        assert!(GridIndex::new(1.0, 1.0, &[vec![-1, -1], vec![-1]], 0).is_err());
        assert!(GridIndex::new(1.0, 1.0, &[vec![3]], 2).is_err());
        assert!(GridIndex::new(1.0, 1.0, &[vec![-7]], 2).is_err());
    }

    #[test]
    fn empty_grid_resolves_nothing() {
        let grid = GridIndex::new(1.0, 1.0, &[], 0).unwrap();
        assert_eq!(grid.rows(), 0);
        assert_eq!(grid.lookup(ImagePoint::new(0.0, 0.0)), CellLookup::OutOfBounds);
    }
}
