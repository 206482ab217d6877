// Reload behaviour against the on-disk stores: JSON key/value file plus the
// SQLite blob table, both under a temporary directory.

use std::io::Cursor;
use std::path::Path;
use std::time::{Duration, Instant};

use image::{ImageFormat, Rgb, RgbImage};
use rowmark::cue::Silent;
use rowmark::intake::ImageAsset;
use rowmark::navigation::Mode;
use rowmark::session::{Session, SessionOptions};
use rowmark::storage::{
    keys, AsyncBlobStore, BlobStore, JsonFileKv, KeyValueStore, SqliteBlobStore,
};
use rowmark::timer::AdjustRefused;
use rowmark::widget_pos::{Position, Size, WidgetKind};

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 200]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

fn open(dir: &Path) -> Session {
    let db = dir.join("blobs.db");
    Session::open(
        Box::new(JsonFileKv::open(dir.join("state.json"))),
        AsyncBlobStore::spawn_with(move || SqliteBlobStore::open(db)),
        Box::new(Silent),
        SessionOptions {
            total_rows: 15,
            timer_minutes: 25,
            cue_duration: Duration::from_secs(3),
            cache_dir: dir.join("cache"),
        },
    )
}

fn reopen(dir: &Path, old: Session) -> Session {
    old.flush();
    drop(old);
    let mut s = open(dir);
    s.restore_blocking();
    s
}

fn crop_and_highlight(s: &mut Session, rows: i64) {
    s.set_total_rows(Some(rows));
    assert!(s.begin_crop((20.0, 10.0)));
    s.drag_crop((80.0, 70.0));
    s.complete_crop().unwrap();
    s.enter_highlight().unwrap();
}

#[test]
fn chart_progress_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut s = open(dir.path());
    s.restore_blocking();
    s.replace_image(ImageAsset::from_bytes(png(64, 48)).unwrap());
    crop_and_highlight(&mut s, 12);
    for _ in 0..6 {
        s.advance_row();
    }

    let s = reopen(dir.path(), s);
    assert_eq!(s.mode(), Mode::HighlightActive);
    assert_eq!(s.rows().current_row(), 7);
    assert_eq!(s.image().unwrap().dimensions(), (64, 48));
    let band = s.band().unwrap();
    let crop = s.chart().crop().unwrap();
    assert!((band.height - crop.height / 12.0).abs() < 1e-9);
}

#[test]
fn rows_tile_the_crop_and_run_bottom_up() {
    let dir = tempfile::tempdir().unwrap();
    let mut s = open(dir.path());
    s.restore_blocking();
    s.replace_image(ImageAsset::from_bytes(png(10, 10)).unwrap());
    crop_and_highlight(&mut s, 7);
    let crop = *s.chart().crop().unwrap();

    let first = s.band().unwrap();
    assert!((first.bottom() - crop.bottom()).abs() < 1e-9);

    let mut heights = first.height;
    while s.advance_row() {
        heights += s.band().unwrap().height;
    }
    assert_eq!(s.rows().current_row(), 7);
    assert!((s.band().unwrap().top - crop.y).abs() < 1e-9);
    assert!((heights - crop.height).abs() < 1e-9);

    // past the ends nothing moves
    assert!(!s.advance_row());
    assert_eq!(s.rows().current_row(), 7);
    while s.retreat_row() {}
    assert!(!s.retreat_row());
    assert_eq!(s.rows().current_row(), 1);
}

#[test]
fn new_image_resets_and_the_reset_is_stored() {
    let dir = tempfile::tempdir().unwrap();
    let mut s = open(dir.path());
    s.restore_blocking();
    s.replace_image(ImageAsset::from_bytes(png(10, 10)).unwrap());
    crop_and_highlight(&mut s, 5);
    s.advance_row();
    s.replace_image(ImageAsset::from_bytes(png(20, 10)).unwrap());
    assert_eq!(s.mode(), Mode::BrowsingCrop);
    assert_eq!(s.rows().current_row(), 1);
    assert!(s.chart().crop().is_none());

    let s = reopen(dir.path(), s);
    assert_eq!(s.mode(), Mode::BrowsingCrop);
    assert_eq!(s.rows().current_row(), 1);
    assert!(s.chart().crop().is_none());
    assert_eq!(s.image().unwrap().dimensions(), (20, 10));
}

#[test]
fn widget_positions_and_corrupt_values() {
    let dir = tempfile::tempdir().unwrap();
    let view = Size::new(400, 300);
    {
        let mut kv = JsonFileKv::open(dir.path().join("state.json"));
        kv.set(
            WidgetKind::Counter.storage_key(),
            "{\"x\":100,\"y\":200}",
        );
        kv.set(WidgetKind::Timer.storage_key(), "not json at all");
    }
    let mut s = open(dir.path());
    assert_eq!(
        s.widget(WidgetKind::Counter).position(),
        Some(Position::new(100, 200))
    );
    assert_eq!(s.widget(WidgetKind::Timer).position(), None);
    let size = Size::new(21, 4);
    let placed = s.widget_mut(WidgetKind::Timer).measure(size, view);
    assert_eq!(placed, WidgetKind::Timer.default_position(size, view));
}

#[test]
fn counter_and_timer_rules_hold_across_reload() {
    let dir = tempfile::tempdir().unwrap();
    let mut s = open(dir.path());
    for _ in 0..10 {
        s.decrement_counter();
    }
    assert_eq!(s.counter().value(), 0);
    s.increment_counter();

    let t0 = Instant::now();
    s.toggle_timer(t0);
    assert_eq!(s.adjust_timer(1), Err(AdjustRefused::Running));
    assert_eq!(s.timer().total_secs(), 1500);
    s.toggle_timer(t0 + Duration::from_secs(2));
    assert_eq!(s.adjust_timer(1), Ok(1560));
    assert_eq!(s.timer().remaining_secs(), 1560);

    let s = reopen(dir.path(), s);
    assert_eq!(s.counter().value(), 1);
    assert_eq!(s.timer().total_secs(), 1560);
    assert!(!s.timer().is_running());
}

#[test]
fn full_countdown_finishes_once() {
    let dir = tempfile::tempdir().unwrap();
    let mut s = open(dir.path());
    let t0 = Instant::now();
    s.toggle_timer(t0);
    let finished = (1..=1500)
        .filter(|sec| s.tick(t0 + Duration::from_secs(*sec)).is_some())
        .count();
    assert_eq!(finished, 1);
    assert!(!s.timer().is_running());
    assert_eq!(s.timer().remaining_secs(), 1500);
    assert!(s.cue().is_active());
}

#[test]
fn blobs_carry_an_update_stamp() {
    let dir = tempfile::tempdir().unwrap();
    let mut s = open(dir.path());
    s.replace_image(ImageAsset::from_bytes(png(4, 4)).unwrap());
    s.flush();
    drop(s);

    let store = SqliteBlobStore::open(dir.path().join("blobs.db")).unwrap();
    assert!(store.get(rowmark::storage::blob_keys::IMAGE).unwrap().is_some());
    let stamp = store
        .updated_at(rowmark::storage::blob_keys::IMAGE)
        .unwrap()
        .unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(&stamp).is_ok());

    let kv = JsonFileKv::open(dir.path().join("state.json"));
    assert_eq!(kv.get(keys::CURRENT_ROW).as_deref(), Some("1"));
}
