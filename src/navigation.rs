use strum_macros::Display;

use crate::crop::{CropDraft, CropRegion};
use crate::highlight::{highlight_band, HighlightBand, RowState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Mode {
    /// Selecting (or re-selecting) the crop region and the row count
    BrowsingCrop,
    /// Stepping through rows with the band drawn over the chart
    HighlightActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum EnterRefused {
    NoCrop,
    InvalidTotal,
}

/// Crop, rows and mode of the chart panel.
#[derive(Debug, Clone)]
pub struct ChartState {
    crop: Option<CropRegion>,
    draft: Option<CropDraft>,
    rows: RowState,
    mode: Mode,
}

impl Default for ChartState {
    fn default() -> Self {
        Self::new(RowState::default())
    }
}

impl ChartState {
    pub fn new(rows: RowState) -> Self {
        Self {
            crop: None,
            draft: None,
            rows,
            mode: Mode::BrowsingCrop,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_highlighting(&self) -> bool {
        self.mode == Mode::HighlightActive
    }

    pub fn rows(&self) -> &RowState {
        &self.rows
    }

    pub fn crop(&self) -> Option<&CropRegion> {
        self.crop.as_ref()
    }

    /// Region to outline while browsing: the live draft if any, else the crop.
    pub fn visible_selection(&self) -> Option<CropRegion> {
        self.draft.map(|d| d.region()).or(self.crop)
    }

    pub fn band(&self) -> Option<HighlightBand> {
        if !self.is_highlighting() {
            return None;
        }
        highlight_band(self.crop.as_ref(), &self.rows)
    }

    pub fn can_enter_highlight(&self) -> Result<(), EnterRefused> {
        match self.crop {
            Some(c) if c.is_valid() => {}
            _ => return Err(EnterRefused::NoCrop),
        }
        if !self.rows.has_valid_total() {
            return Err(EnterRefused::InvalidTotal);
        }
        Ok(())
    }

    /// `BrowsingCrop -> HighlightActive`. The current row is left as it is.
    pub fn enter_highlight(&mut self) -> Result<(), EnterRefused> {
        self.can_enter_highlight()?;
        self.draft = None;
        self.mode = Mode::HighlightActive;
        Ok(())
    }

    /// Back to crop selection, keeping the crop for re-editing. Progress
    /// restarts at row 1.
    pub fn reframe(&mut self) {
        self.mode = Mode::BrowsingCrop;
        self.rows.reset();
    }

    /// A new image invalidates everything drawn over the old one.
    pub fn image_replaced(&mut self) {
        self.crop = None;
        self.draft = None;
        self.mode = Mode::BrowsingCrop;
        self.rows.reset();
    }

    pub fn advance(&mut self) -> bool {
        self.is_highlighting() && self.rows.advance()
    }

    pub fn retreat(&mut self) -> bool {
        self.is_highlighting() && self.rows.retreat()
    }

    /// Edit the row count. Only possible while browsing.
    pub fn set_total_rows(&mut self, total: Option<i64>) -> bool {
        if self.is_highlighting() {
            return false;
        }
        self.rows.set_total_rows(total);
        true
    }

    pub fn begin_crop(&mut self, at: (f64, f64)) -> bool {
        if self.is_highlighting() {
            return false;
        }
        self.draft = Some(CropDraft::begin(at));
        true
    }

    pub fn drag_crop(&mut self, at: (f64, f64)) -> bool {
        match self.draft.as_mut() {
            Some(d) => {
                d.drag_to(at);
                true
            }
            None => false,
        }
    }

    pub fn is_drafting(&self) -> bool {
        self.draft.is_some()
    }

    /// Release the pointer: the draft becomes the crop. A zero-area draft
    /// replaces the crop too, which leaves highlight mode unavailable.
    pub fn complete_crop(&mut self) -> Option<CropRegion> {
        let draft = self.draft.take()?;
        let region = draft.region();
        self.crop = Some(region);
        Some(region)
    }

    /// Restore persisted values without going through the gates.
    pub fn restore(&mut self, crop: Option<CropRegion>, rows: RowState) {
        self.crop = crop.map(|c| c.normalized());
        self.rows = rows;
        self.mode = Mode::BrowsingCrop;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn cropped() -> ChartState {
        let mut chart = ChartState::new(RowState::new(Some(5)));
        chart.begin_crop((10.0, 10.0));
        chart.drag_crop((90.0, 60.0));
        chart.complete_crop();
        chart
    }

    #[test]
    fn entering_requires_crop_and_total() {
        let mut chart = ChartState::default();
        assert_matches!(chart.enter_highlight(), Err(EnterRefused::NoCrop));

        let mut chart = cropped();
        chart.set_total_rows(None);
        assert_matches!(chart.enter_highlight(), Err(EnterRefused::InvalidTotal));
        chart.set_total_rows(Some(0));
        assert_matches!(chart.enter_highlight(), Err(EnterRefused::InvalidTotal));
        chart.set_total_rows(Some(5));
        assert_matches!(chart.enter_highlight(), Ok(()));
        assert_eq!(chart.mode(), Mode::HighlightActive);
    }

    #[test]
    fn zero_area_crop_blocks_highlight() {
        let mut chart = ChartState::default();
        chart.begin_crop((30.0, 30.0));
        chart.complete_crop();
        assert_matches!(chart.enter_highlight(), Err(EnterRefused::NoCrop));
    }

    #[test]
    fn entering_keeps_the_row() {
        let mut chart = cropped();
        chart.enter_highlight().unwrap();
        chart.advance();
        chart.advance();
        chart.reframe();
        assert_eq!(chart.rows().current_row(), 1);
        chart.rows.set_current_row(4);
        chart.enter_highlight().unwrap();
        assert_eq!(chart.rows().current_row(), 4);
    }

    #[test]
    fn reframe_keeps_crop_and_resets_row() {
        let mut chart = cropped();
        chart.enter_highlight().unwrap();
        chart.advance();
        let crop = chart.crop().copied();
        chart.reframe();
        assert_eq!(chart.mode(), Mode::BrowsingCrop);
        assert_eq!(chart.rows().current_row(), 1);
        assert_eq!(chart.crop().copied(), crop);
    }

    #[test]
    fn navigation_only_while_highlighting() {
        let mut chart = cropped();
        assert!(!chart.advance());
        assert_eq!(chart.rows().current_row(), 1);
        chart.enter_highlight().unwrap();
        for _ in 0..9 {
            chart.advance();
        }
        assert_eq!(chart.rows().current_row(), 5);
        for _ in 0..9 {
            chart.retreat();
        }
        assert_eq!(chart.rows().current_row(), 1);
    }

    #[test]
    fn image_replacement_resets_everything() {
        let mut chart = cropped();
        chart.enter_highlight().unwrap();
        chart.advance();
        chart.image_replaced();
        assert_eq!(chart.mode(), Mode::BrowsingCrop);
        assert_eq!(chart.rows().current_row(), 1);
        assert!(chart.crop().is_none());
        assert!(chart.band().is_none());
    }

    #[test]
    fn crop_and_total_locked_while_highlighting() {
        let mut chart = cropped();
        chart.enter_highlight().unwrap();
        assert!(!chart.begin_crop((0.0, 0.0)));
        assert!(!chart.set_total_rows(Some(99)));
        assert_eq!(chart.rows().total_rows(), Some(5));
    }

    #[test]
    fn band_only_in_highlight_mode() {
        let mut chart = cropped();
        assert!(chart.band().is_none());
        chart.enter_highlight().unwrap();
        let band = chart.band().unwrap();
        assert_eq!(band.left, 10.0);
        assert!((band.bottom() - 60.0).abs() < 1e-9);
    }
}
