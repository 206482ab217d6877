//! Screen geometry shared by the renderer and the mouse hit-tests.

use ratatui::layout::{Constraint, Direction, Layout, Rect};

use crate::crop::to_percent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenLayout {
    pub header: Rect,
    pub pdf: Option<Rect>,
    pub chart: Option<Rect>,
    /// Cells covered by the chart thumbnail
    pub image: Option<Rect>,
    pub status: Rect,
}

/// Split the terminal. With a pdf loaded the pdf sits on the left and the
/// chart on the right; collapsing the split gives the pdf the full width.
/// Without a pdf the chart always gets the whole body.
pub fn screen(
    area: Rect,
    split_open: bool,
    has_pdf: bool,
    image: Option<(u32, u32)>,
) -> ScreenLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);
    let (header, body, status) = (rows[0], rows[1], rows[2]);

    let (pdf, chart) = match (has_pdf, split_open) {
        (false, _) => (None, Some(body)),
        (true, false) => (Some(body), None),
        (true, true) => {
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(body);
            (Some(cols[0]), Some(cols[1]))
        }
    };

    let image = match (chart, image) {
        (Some(chart), Some(dims)) => fit_image(inner(chart), dims),
        _ => None,
    };

    ScreenLayout {
        header,
        pdf,
        chart,
        image,
        status,
    }
}

/// Area inside a one-cell border
pub fn inner(area: Rect) -> Rect {
    Rect {
        x: area.x.saturating_add(1),
        y: area.y.saturating_add(1),
        width: area.width.saturating_sub(2),
        height: area.height.saturating_sub(2),
    }
}

/// Largest box with the image's aspect ratio that fits in `area`, centred.
/// A cell holds two vertically stacked pixels, so a cell row counts double.
pub fn fit_image(area: Rect, (width, height): (u32, u32)) -> Option<Rect> {
    if area.width == 0 || area.height == 0 || width == 0 || height == 0 {
        return None;
    }
    let scale = (area.width as f64 / width as f64).min(area.height as f64 * 2.0 / height as f64);
    let cols = ((width as f64 * scale).floor() as u16).clamp(1, area.width);
    let px_rows = (height as f64 * scale).floor().max(1.0);
    let rows = ((px_rows / 2.0).ceil() as u16).clamp(1, area.height);
    Some(Rect {
        x: area.x + (area.width - cols) / 2,
        y: area.y + (area.height - rows) / 2,
        width: cols,
        height: rows,
    })
}

/// Percent coordinates of the top-left edge of the cell under the pointer.
pub fn cell_percent(image: Rect, col: u16, row: u16) -> (f64, f64) {
    let x = col.saturating_sub(image.x).min(image.width);
    let y = row.saturating_sub(image.y).min(image.height);
    to_percent(x as f64, y as f64, image.width as f64, image.height as f64)
}

/// Percent coordinates for the moving corner of a crop drag anchored at
/// `anchor`. Cells at or past the anchor are included whole.
pub fn drag_percent(image: Rect, anchor: (u16, u16), col: u16, row: u16) -> (f64, f64) {
    let edge = |pos: u16, start: u16, len: u16, anchor: u16| -> f64 {
        let pos = pos.clamp(start, start + len.saturating_sub(1));
        let rel = pos - start;
        if pos >= anchor {
            (rel + 1) as f64
        } else {
            rel as f64
        }
    };
    to_percent(
        edge(col, image.x, image.width, anchor.0),
        edge(row, image.y, image.height, anchor.1),
        image.width as f64,
        image.height as f64,
    )
}

pub fn contains(area: Rect, col: u16, row: u16) -> bool {
    col >= area.x && col < area.x + area.width && row >= area.y && row < area.y + area.height
}
