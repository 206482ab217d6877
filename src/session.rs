//! Everything a user builds up while working through a chart, and its
//! write-through persistence.
//!
//! Small state is read synchronously when the session opens. The image and
//! pdf arrive later from the blob store (see [`Session::request_restore`]);
//! a highlight mode that was on at shutdown is switched back on only once the
//! image is back, since the crop means nothing without it.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::counter::Counter;
use crate::crop::CropRegion;
use crate::cue::{AudioCue, CompletionCue};
use crate::error::Result;
use crate::highlight::{HighlightBand, RowState};
use crate::intake::{DisplayUrl, DocumentViewer, ImageAsset, MediaType, PdfDocument};
use crate::navigation::{ChartState, EnterRefused, Mode};
use crate::storage::{blob_keys, keys, load_json, save_json, AsyncBlobStore, KeyValueStore};
use crate::timer::{AdjustRefused, CountdownTimer, TimerEvent};
use crate::widget_pos::{WidgetKind, WidgetTracker};

#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Row count used when none was ever stored
    pub total_rows: i64,
    pub timer_minutes: u32,
    pub cue_duration: Duration,
    /// Where pdf display copies are written
    pub cache_dir: PathBuf,
}

impl SessionOptions {
    pub fn from_config(cfg: &Config, cache_dir: PathBuf) -> Self {
        Self {
            total_rows: cfg.total_rows as i64,
            timer_minutes: cfg.timer_minutes,
            cue_duration: Duration::from_secs(cfg.cue_secs.max(1)),
            cache_dir,
        }
    }
}

/// Payload read back from the blob store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restored {
    Image(Option<Vec<u8>>),
    Pdf(Option<Vec<u8>>),
}

pub struct Session {
    kv: Box<dyn KeyValueStore>,
    blobs: AsyncBlobStore,
    cache_dir: PathBuf,

    image: Option<ImageAsset>,
    /// Bumped on every user-supplied image; a late restore must not undo one.
    image_serial: u64,
    image_restore_pending: bool,
    highlight_pending: bool,
    chart: ChartState,

    counter: Counter,
    timer: CountdownTimer,
    cue: CompletionCue,
    counter_widget: WidgetTracker,
    timer_widget: WidgetTracker,

    pdf: Option<PdfDocument>,
    pdf_url: Option<DisplayUrl>,
    split_open: bool,
    defaults: SessionOptions,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("chart", &self.chart)
            .field("counter", &self.counter)
            .field("timer", &self.timer)
            .field("has_image", &self.image.is_some())
            .field("has_pdf", &self.pdf.is_some())
            .finish()
    }
}

impl Session {
    /// Load all small state. Blob payloads are requested separately.
    pub fn open(
        kv: Box<dyn KeyValueStore>,
        blobs: AsyncBlobStore,
        audio: Box<dyn AudioCue>,
        opts: SessionOptions,
    ) -> Self {
        let store = kv.as_ref();
        // a stored `null` is an empty row field, which is different from "never set"
        let total = load_json::<Option<i64>>(store, keys::TOTAL_ROWS)
            .unwrap_or(Some(opts.total_rows));
        let current = load_json::<i64>(store, keys::CURRENT_ROW).unwrap_or(1);
        let crop = load_json::<CropRegion>(store, keys::CROP);
        let highlight_pending = load_json::<bool>(store, keys::HIGHLIGHT_MODE).unwrap_or(false);

        let mut chart = ChartState::default();
        chart.restore(crop, RowState::restored(total, current));

        let counter = load_json::<i64>(store, keys::COUNTER)
            .map(Counter::from_stored)
            .unwrap_or_default();
        let timer = match load_json::<u32>(store, keys::TIMER_DURATION) {
            Some(secs) => CountdownTimer::new(secs),
            None => CountdownTimer::with_minutes(opts.timer_minutes),
        };
        let split_open = load_json::<bool>(store, keys::SPLIT_OPEN).unwrap_or(true);

        log::info!(
            "session opened: rows {:?}/{}, crop {}, highlight pending {}",
            chart.rows().total_rows(),
            chart.rows().current_row(),
            chart.crop().is_some(),
            highlight_pending
        );

        Self {
            counter_widget: WidgetTracker::load(WidgetKind::Counter, store),
            timer_widget: WidgetTracker::load(WidgetKind::Timer, store),
            kv,
            blobs,
            cache_dir: opts.cache_dir.clone(),
            image: None,
            image_serial: 0,
            image_restore_pending: false,
            highlight_pending,
            chart,
            counter,
            timer,
            cue: CompletionCue::new(audio, opts.cue_duration),
            pdf: None,
            pdf_url: None,
            split_open,
            defaults: opts,
        }
    }

    /// Ask the blob store for the image and pdf; `notify` receives each result
    /// (on the store's thread) and should hand it to [`Session::apply_restored`].
    pub fn request_restore<F>(&mut self, notify: F)
    where
        F: Fn(Restored) + Send + Clone + 'static,
    {
        self.image_restore_pending = true;
        let on_image = notify.clone();
        self.blobs
            .get_with(blob_keys::IMAGE, move |v| on_image(Restored::Image(v)));
        self.blobs
            .get_with(blob_keys::PDF, move |v| notify(Restored::Pdf(v)));
    }

    /// Request and wait for both payloads.
    pub fn restore_blocking(&mut self) {
        self.image_restore_pending = true;
        let image = self.blobs.get(blob_keys::IMAGE);
        let pdf = self.blobs.get(blob_keys::PDF);
        self.apply_restored(Restored::Image(image.wait()));
        self.apply_restored(Restored::Pdf(pdf.wait()));
    }

    pub fn apply_restored(&mut self, restored: Restored) {
        match restored {
            Restored::Image(bytes) => {
                self.image_restore_pending = false;
                if self.image_serial == 0 {
                    if let Some(bytes) = bytes {
                        match ImageAsset::from_bytes(bytes) {
                            Ok(asset) => self.image = Some(asset),
                            Err(e) => log::warn!("stored image unusable: {e}"),
                        }
                    }
                } else {
                    log::debug!("ignoring restored image, a newer one was loaded");
                }
                self.resolve_pending_highlight();
            }
            Restored::Pdf(bytes) => {
                if self.pdf.is_some() {
                    return;
                }
                if let Some(bytes) = bytes {
                    match PdfDocument::from_bytes(bytes) {
                        Ok(doc) => self.show_pdf(doc),
                        Err(e) => log::warn!("stored pdf unusable: {e}"),
                    }
                }
            }
        }
    }

    fn resolve_pending_highlight(&mut self) {
        if !self.highlight_pending {
            return;
        }
        self.highlight_pending = false;
        let restored = self.image.is_some() && self.chart.enter_highlight().is_ok();
        if !restored {
            log::info!("highlight mode not restored");
            save_json(self.kv.as_mut(), keys::HIGHLIGHT_MODE, &false);
        }
    }

    pub fn is_restoring(&self) -> bool {
        self.image_restore_pending
    }

    // ---- image & chart ----------------------------------------------------

    pub fn image(&self) -> Option<&ImageAsset> {
        self.image.as_ref()
    }

    /// Serial of the current image, for caches keyed on it.
    pub fn image_serial(&self) -> u64 {
        self.image_serial
    }

    /// Swap in a new chart image. Crop, highlight and progress start over.
    pub fn replace_image(&mut self, asset: ImageAsset) {
        self.chart.image_replaced();
        self.highlight_pending = false;
        self.image_serial += 1;
        self.blobs.put(blob_keys::IMAGE, asset.bytes().to_vec());
        log::info!(
            "image replaced: {} {}x{}",
            asset.media(),
            asset.dimensions().0,
            asset.dimensions().1
        );
        self.image = Some(asset);
        self.kv.remove(keys::CROP);
        self.persist_rows();
        self.persist_mode();
    }

    pub fn chart(&self) -> &ChartState {
        &self.chart
    }

    pub fn mode(&self) -> Mode {
        self.chart.mode()
    }

    pub fn rows(&self) -> &RowState {
        self.chart.rows()
    }

    pub fn band(&self) -> Option<HighlightBand> {
        self.chart.band()
    }

    pub fn enter_highlight(&mut self) -> std::result::Result<(), EnterRefused> {
        if self.image.is_none() {
            return Err(EnterRefused::NoCrop);
        }
        self.chart.enter_highlight()?;
        self.persist_mode();
        Ok(())
    }

    pub fn reframe(&mut self) {
        if !self.chart.is_highlighting() {
            return;
        }
        self.chart.reframe();
        self.persist_rows();
        self.persist_mode();
    }

    pub fn advance_row(&mut self) -> bool {
        let moved = self.chart.advance();
        if moved {
            self.persist_rows();
        }
        moved
    }

    pub fn retreat_row(&mut self) -> bool {
        let moved = self.chart.retreat();
        if moved {
            self.persist_rows();
        }
        moved
    }

    pub fn set_total_rows(&mut self, total: Option<i64>) -> bool {
        let changed = self.chart.set_total_rows(total);
        if changed {
            save_json(self.kv.as_mut(), keys::TOTAL_ROWS, &total);
            self.persist_rows();
        }
        changed
    }

    pub fn begin_crop(&mut self, at: (f64, f64)) -> bool {
        self.image.is_some() && self.chart.begin_crop(at)
    }

    pub fn drag_crop(&mut self, at: (f64, f64)) -> bool {
        self.chart.drag_crop(at)
    }

    pub fn complete_crop(&mut self) -> Option<CropRegion> {
        let region = self.chart.complete_crop()?;
        save_json(self.kv.as_mut(), keys::CROP, &region);
        Some(region)
    }

    pub fn clear_crop(&mut self) {
        if self.chart.is_highlighting() {
            return;
        }
        self.chart.restore(None, *self.chart.rows());
        self.kv.remove(keys::CROP);
    }

    fn persist_rows(&mut self) {
        let current = self.chart.rows().current_row();
        save_json(self.kv.as_mut(), keys::CURRENT_ROW, &current);
    }

    fn persist_mode(&mut self) {
        let on = self.chart.is_highlighting();
        save_json(self.kv.as_mut(), keys::HIGHLIGHT_MODE, &on);
    }

    // ---- counter ----------------------------------------------------------

    pub fn counter(&self) -> Counter {
        self.counter
    }

    pub fn increment_counter(&mut self) {
        self.counter.increment();
        self.persist_counter();
    }

    pub fn decrement_counter(&mut self) -> bool {
        let changed = self.counter.decrement();
        if changed {
            self.persist_counter();
        }
        changed
    }

    pub fn reset_counter(&mut self) {
        self.counter.reset();
        self.persist_counter();
    }

    fn persist_counter(&mut self) {
        let value = self.counter.value();
        save_json(self.kv.as_mut(), keys::COUNTER, &value);
    }

    // ---- timer ------------------------------------------------------------

    pub fn timer(&self) -> &CountdownTimer {
        &self.timer
    }

    pub fn cue(&self) -> &CompletionCue {
        &self.cue
    }

    /// Start or pause. Starting ends any completion cue still playing so its
    /// wind-down cannot spill into the new run.
    pub fn toggle_timer(&mut self, now: Instant) {
        if !self.timer.is_running() {
            self.cue.cancel();
        }
        self.timer.toggle(now);
    }

    pub fn reset_timer(&mut self) {
        self.timer.reset();
    }

    pub fn adjust_timer(&mut self, minutes: i32) -> std::result::Result<u32, AdjustRefused> {
        let secs = self.timer.adjust_minutes(minutes)?;
        save_json(self.kv.as_mut(), keys::TIMER_DURATION, &secs);
        Ok(secs)
    }

    /// Set the duration outright. Refused while running.
    pub fn set_timer_minutes(&mut self, minutes: u32) -> bool {
        if self.timer.is_running() {
            return false;
        }
        self.timer.set_total_secs(minutes.saturating_mul(60));
        let secs = self.timer.total_secs();
        save_json(self.kv.as_mut(), keys::TIMER_DURATION, &secs);
        true
    }

    /// Drive the countdown and the cue up to `now`.
    pub fn tick(&mut self, now: Instant) -> Option<TimerEvent> {
        let event = self.timer.poll(now);
        if let Some(TimerEvent::Finished { cycle }) = event {
            log::info!("timer cycle {cycle} finished");
            self.cue.start(now);
        }
        self.cue.update(now);
        event
    }

    // ---- floating widgets -------------------------------------------------

    pub fn widget(&self, kind: WidgetKind) -> &WidgetTracker {
        match kind {
            WidgetKind::Counter => &self.counter_widget,
            WidgetKind::Timer => &self.timer_widget,
        }
    }

    pub fn widget_mut(&mut self, kind: WidgetKind) -> &mut WidgetTracker {
        match kind {
            WidgetKind::Counter => &mut self.counter_widget,
            WidgetKind::Timer => &mut self.timer_widget,
        }
    }

    /// Finish a drag on `kind`, persisting where it landed.
    pub fn release_widget(&mut self, kind: WidgetKind) -> bool {
        let tracker = match kind {
            WidgetKind::Counter => &mut self.counter_widget,
            WidgetKind::Timer => &mut self.timer_widget,
        };
        tracker.pointer_up(self.kv.as_mut())
    }

    pub fn dragging_widget(&self) -> Option<WidgetKind> {
        [&self.timer_widget, &self.counter_widget]
            .into_iter()
            .find(|w| w.is_dragging())
            .map(|w| w.kind())
    }

    // ---- pdf & layout -----------------------------------------------------

    pub fn pdf(&self) -> Option<&PdfDocument> {
        self.pdf.as_ref()
    }

    pub fn pdf_url(&self) -> Option<&str> {
        self.pdf_url.as_ref().map(|u| u.url())
    }

    pub fn replace_pdf(&mut self, doc: PdfDocument) {
        self.blobs.put(blob_keys::PDF, doc.bytes().to_vec());
        log::info!("pdf replaced: {} bytes", doc.len());
        self.show_pdf(doc);
    }

    fn show_pdf(&mut self, doc: PdfDocument) {
        // release the superseded url before minting a new one
        self.pdf_url = None;
        match DisplayUrl::create(&self.cache_dir, "pattern", MediaType::Pdf, doc.bytes()) {
            Ok(url) => self.pdf_url = Some(url),
            Err(e) => log::warn!("could not prepare pdf for viewing: {e}"),
        }
        self.pdf = Some(doc);
    }

    pub fn open_pdf(&self, viewer: &mut dyn DocumentViewer) -> Result<()> {
        match self.pdf_url() {
            Some(url) => viewer.open(url),
            None => Err(crate::error::RowmarkError::Unsupported(
                "no pattern pdf loaded".into(),
            )),
        }
    }

    pub fn split_open(&self) -> bool {
        self.split_open
    }

    pub fn toggle_split(&mut self) {
        self.split_open = !self.split_open;
        save_json(self.kv.as_mut(), keys::SPLIT_OPEN, &self.split_open);
    }

    /// Erase everything stored and start over from the defaults.
    pub fn forget_everything(&mut self) {
        let stored = [
            keys::TOTAL_ROWS,
            keys::CURRENT_ROW,
            keys::CROP,
            keys::HIGHLIGHT_MODE,
            keys::COUNTER,
            keys::TIMER_DURATION,
            keys::SPLIT_OPEN,
            WidgetKind::Counter.storage_key(),
            WidgetKind::Timer.storage_key(),
        ];
        for key in stored {
            self.kv.remove(key);
        }
        self.blobs.delete(blob_keys::IMAGE);
        self.blobs.delete(blob_keys::PDF);

        // a restore still in flight must not bring the old image back
        self.image_serial += 1;
        self.image = None;
        self.highlight_pending = false;
        self.chart = ChartState::new(RowState::new(Some(self.defaults.total_rows)));
        self.counter = Counter::default();
        self.cue.cancel();
        self.timer = CountdownTimer::with_minutes(self.defaults.timer_minutes);
        self.counter_widget = WidgetTracker::load(WidgetKind::Counter, self.kv.as_ref());
        self.timer_widget = WidgetTracker::load(WidgetKind::Timer, self.kv.as_ref());
        self.pdf_url = None;
        self.pdf = None;
        self.split_open = true;
        log::info!("all stored state erased");
    }

    /// Wait for queued blob writes, e.g. before exit.
    pub fn flush(&self) {
        self.blobs.flush();
    }
}
