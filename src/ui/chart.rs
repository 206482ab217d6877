//! Chart panel: a half-block thumbnail of the chart image with the crop and
//! the highlight band painted over it.

use image::{imageops::FilterType, Rgb, RgbImage};
use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

use crate::crop::PixelRect;
use crate::error::Result;
use crate::intake::ImageAsset;
use crate::navigation::ChartState;

const UPPER_HALF: &str = "▀";
const BAND_TINT: Rgb<u8> = Rgb([255, 214, 0]);

/// Image scaled to a cell box, two pixels per cell.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    serial: u64,
    cols: u16,
    rows: u16,
    pixels: RgbImage,
}

impl Thumbnail {
    pub fn build(asset: &ImageAsset, serial: u64, cols: u16, rows: u16) -> Result<Self> {
        let decoded = asset.decode()?.to_rgb8();
        let pixels = image::imageops::resize(
            &decoded,
            cols.max(1) as u32,
            rows.max(1) as u32 * 2,
            FilterType::Triangle,
        );
        log::debug!("thumbnail {cols}x{rows} built for image {serial}");
        Ok(Self {
            serial,
            cols,
            rows,
            pixels,
        })
    }

    /// Whether this thumbnail was built for the image `serial` at this size
    pub fn fits(&self, serial: u64, area: Rect) -> bool {
        self.serial == serial && self.cols == area.width && self.rows == area.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shade {
    Plain,
    Dim,
    Band,
}

fn shade(px: Rgb<u8>, s: Shade) -> Color {
    let [r, g, b] = px.0;
    match s {
        Shade::Plain => Color::Rgb(r, g, b),
        Shade::Dim => Color::Rgb(r / 3, g / 3, b / 3),
        Shade::Band => {
            let mix = |a: u8, t: u8| ((a as u16 + t as u16) / 2) as u8;
            Color::Rgb(
                mix(r, BAND_TINT.0[0]),
                mix(g, BAND_TINT.0[1]),
                mix(b, BAND_TINT.0[2]),
            )
        }
    }
}

/// Renders the thumbnail plus overlays into the image box.
pub struct ChartView<'a> {
    pub thumbnail: &'a Thumbnail,
    pub chart: &'a ChartState,
}

impl ChartView<'_> {
    fn overlays(&self, width: u32, height: u32) -> (Option<PixelRect>, Option<PixelRect>) {
        if self.chart.is_highlighting() {
            let crop = self.chart.crop().map(|c| c.project(width, height));
            let band = self.chart.band().map(|b| b.project(width, height));
            (crop, band)
        } else {
            let selection = self
                .chart
                .visible_selection()
                .map(|c| c.project(width, height));
            (selection, None)
        }
    }
}

impl Widget for ChartView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (width, height) = self.thumbnail.pixels.dimensions();
        let (focus, band) = self.overlays(width, height);

        let shade_at = |x: u32, y: u32| -> Shade {
            if band.is_some_and(|b| b.contains(x, y)) {
                return Shade::Band;
            }
            match focus {
                Some(f) if !f.is_empty() && !f.contains(x, y) => Shade::Dim,
                _ => Shade::Plain,
            }
        };

        let cols = area.width.min(self.thumbnail.cols) as u32;
        let rows = area.height.min(self.thumbnail.rows) as u32;
        for (row, col) in (0..rows).cartesian_product(0..cols) {
            let (top_y, bottom_y) = (row * 2, row * 2 + 1);
            if bottom_y >= height || col >= width {
                continue;
            }
            let top = shade(*self.thumbnail.pixels.get_pixel(col, top_y), shade_at(col, top_y));
            let bottom = shade(
                *self.thumbnail.pixels.get_pixel(col, bottom_y),
                shade_at(col, bottom_y),
            );
            if let Some(cell) = buf.cell_mut((area.x + col as u16, area.y + row as u16)) {
                cell.set_symbol(UPPER_HALF)
                    .set_style(Style::default().fg(top).bg(bottom));
            }
        }
    }
}
