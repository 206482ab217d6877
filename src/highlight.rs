//! Row highlight engine.
//!
//! Charts are read bottom-up: row 1 is the lowest band of the crop region and
//! row `total` the highest. Given the crop and the row state, [`highlight_band`]
//! returns the band for the current row in the crop's own percentage space.

use crate::crop::{project_percent, CropRegion, PixelRect};

/// Total/current row pair.
///
/// `total_rows` mirrors what the user typed: `None` for an empty field, and
/// possibly zero or negative. Anything that is not a positive count is treated
/// as a single row. `current_row` is kept inside `[1, effective_total]` after
/// every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowState {
    total_rows: Option<i64>,
    current_row: u32,
}

impl Default for RowState {
    fn default() -> Self {
        Self::new(Some(15))
    }
}

impl RowState {
    pub fn new(total_rows: Option<i64>) -> Self {
        Self {
            total_rows,
            current_row: 1,
        }
    }

    /// Restore both values at once, clamping the row into range.
    pub fn restored(total_rows: Option<i64>, current_row: i64) -> Self {
        let mut rows = Self::new(total_rows);
        rows.set_current_row(current_row);
        rows
    }

    pub fn total_rows(&self) -> Option<i64> {
        self.total_rows
    }

    /// Whether the typed total is a usable count (gates highlight mode).
    pub fn has_valid_total(&self) -> bool {
        matches!(self.total_rows, Some(n) if n >= 1)
    }

    /// Row count used for geometry and clamping.
    pub fn effective_total(&self) -> u32 {
        match self.total_rows {
            Some(n) if n >= 1 => n.min(u32::MAX as i64) as u32,
            _ => 1,
        }
    }

    pub fn current_row(&self) -> u32 {
        self.current_row
    }

    pub fn set_total_rows(&mut self, total_rows: Option<i64>) {
        self.total_rows = total_rows;
        self.clamp();
    }

    pub fn set_current_row(&mut self, row: i64) {
        let max = self.effective_total() as i64;
        self.current_row = row.clamp(1, max) as u32;
    }

    /// Move one row up the chart. Returns false at the top.
    pub fn advance(&mut self) -> bool {
        let before = self.current_row;
        self.set_current_row(before as i64 + 1);
        self.current_row != before
    }

    /// Move one row down the chart. Returns false at row 1.
    pub fn retreat(&mut self) -> bool {
        let before = self.current_row;
        self.set_current_row(before as i64 - 1);
        self.current_row != before
    }

    pub fn reset(&mut self) {
        self.current_row = 1;
    }

    fn clamp(&mut self) {
        self.set_current_row(self.current_row as i64);
    }
}

/// Band covering one row, in the same percentage space as [`CropRegion`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighlightBand {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl HighlightBand {
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn project(&self, width: u32, height: u32) -> PixelRect {
        project_percent((self.left, self.top, self.width, self.height), width, height)
    }
}

/// Compute the band for `rows.current_row()`. No crop, no band.
///
/// The row is used as given: callers keep it clamped through [`RowState`].
pub fn highlight_band(crop: Option<&CropRegion>, rows: &RowState) -> Option<HighlightBand> {
    let crop = crop?;
    let total = rows.effective_total() as f64;
    let row_height = crop.height / total;
    let rows_above = total - rows.current_row() as f64;
    Some(HighlightBand {
        top: crop.y + rows_above * row_height,
        left: crop.x,
        width: crop.width,
        height: row_height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn rows(total: i64, current: i64) -> RowState {
        RowState::restored(Some(total), current)
    }

    #[test]
    fn exact_band_for_middle_row() {
        let crop = CropRegion::new(10.0, 20.0, 50.0, 40.0);
        let band = highlight_band(Some(&crop), &rows(4, 2)).unwrap();
        // rows from the top: 4, 3, 2, 1 -> row 2 is third from the top
        assert_eq!(
            band,
            HighlightBand {
                top: 40.0,
                left: 10.0,
                width: 50.0,
                height: 10.0
            }
        );
    }

    #[test]
    fn first_row_is_the_bottom_band() {
        let crop = CropRegion::new(5.0, 12.5, 80.0, 60.0);
        let band = highlight_band(Some(&crop), &rows(15, 1)).unwrap();
        assert!((band.bottom() - crop.bottom()).abs() < EPS);
        assert!((band.height - 4.0).abs() < EPS);
    }

    #[test]
    fn last_row_is_the_top_band() {
        let crop = CropRegion::new(5.0, 12.5, 80.0, 60.0);
        let band = highlight_band(Some(&crop), &rows(15, 15)).unwrap();
        assert_eq!(band.top, crop.y);
    }

    #[test]
    fn bands_tile_the_crop() {
        let crop = CropRegion::new(3.3, 7.7, 61.1, 83.9);
        for total in [1_i64, 2, 3, 7, 15, 64, 101] {
            let mut sum = 0.0;
            let mut expected_top = crop.bottom();
            for current in 1..=total {
                let band = highlight_band(Some(&crop), &rows(total, current)).unwrap();
                // each band sits right on top of the previous one
                assert!((band.bottom() - expected_top).abs() < 1e-6);
                expected_top = band.top;
                sum += band.height;
            }
            assert!((sum - crop.height).abs() < 1e-6, "total {total}");
            assert!((expected_top - crop.y).abs() < 1e-6);
        }
    }

    #[test]
    fn no_crop_no_band() {
        assert_eq!(highlight_band(None, &RowState::default()), None);
    }

    #[test]
    fn invalid_totals_act_as_one_row() {
        let crop = CropRegion::new(0.0, 10.0, 100.0, 30.0);
        for total in [None, Some(0), Some(-4)] {
            let r = RowState::restored(total, 9);
            assert_eq!(r.current_row(), 1);
            let band = highlight_band(Some(&crop), &r).unwrap();
            assert_eq!(band.top, 10.0);
            assert_eq!(band.height, 30.0);
        }
    }

    #[test]
    fn advance_caps_and_retreat_floors() {
        let mut r = rows(3, 1);
        assert!(!r.retreat());
        assert_eq!(r.current_row(), 1);
        assert!(r.advance());
        assert!(r.advance());
        assert!(!r.advance());
        assert_eq!(r.current_row(), 3);
        for _ in 0..10 {
            r.advance();
        }
        assert_eq!(r.current_row(), 3);
    }

    #[test]
    fn shrinking_total_clamps_current() {
        let mut r = rows(20, 18);
        r.set_total_rows(Some(10));
        assert_eq!(r.current_row(), 10);
        r.set_total_rows(None);
        assert_eq!(r.current_row(), 1);
        assert!(!r.has_valid_total());
    }

    #[test]
    fn band_projects_to_pixels() {
        let crop = CropRegion::new(0.0, 0.0, 100.0, 100.0);
        let band = highlight_band(Some(&crop), &rows(10, 1)).unwrap();
        let px = band.project(30, 40);
        assert_eq!(
            px,
            PixelRect {
                x: 0,
                y: 36,
                width: 30,
                height: 4
            }
        );
    }
}
