//! Persistence adapter.
//!
//! Two tiers, mirroring how the chart state is shaped:
//!
//! * [`KeyValueStore`] is synchronous and string-only, for small scalar state
//!   (row numbers, the crop rectangle, widget positions).
//! * [`BlobStore`] holds large byte payloads (the chart image, the pattern pdf).
//!   The UI only talks to it through [`AsyncBlobStore`], which runs the store on
//!   a worker thread so reads and writes never block a frame.
//!
//! Neither tier surfaces errors to callers of the session: failures are logged
//! and the affected value degrades to "absent".

pub mod blob;
pub mod kv;

use serde::{de::DeserializeOwned, Serialize};

pub use blob::{AsyncBlobStore, BlobStore, MemoryBlobStore, PendingBlob, SqliteBlobStore};
pub use kv::{JsonFileKv, KeyValueStore, MemoryKv};

/// Well-known keys for the small store.
pub mod keys {
    pub const TOTAL_ROWS: &str = "total-rows";
    pub const CURRENT_ROW: &str = "current-row";
    pub const CROP: &str = "crop";
    pub const HIGHLIGHT_MODE: &str = "highlight-mode";
    pub const COUNTER: &str = "counter";
    pub const TIMER_DURATION: &str = "timer-duration";
    pub const SPLIT_OPEN: &str = "split-open";
}

/// Well-known keys for the blob store.
pub mod blob_keys {
    pub const IMAGE: &str = "image-file";
    pub const PDF: &str = "pdf-file";
}

/// Decode a JSON value stored under `key`. Unparseable values count as absent.
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(v) => Some(v),
        Err(e) => {
            log::warn!("discarding malformed value for {key}: {e}");
            None
        }
    }
}

/// Encode `value` as JSON and write it under `key`, best effort.
pub fn save_json<T: Serialize + ?Sized>(store: &mut dyn KeyValueStore, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(raw) => store.set(key, &raw),
        Err(e) => log::warn!("could not encode {key}: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_helpers_roundtrip_through_store() {
        let mut kv = MemoryKv::new();
        save_json(&mut kv, "pair", &(3u32, "x"));
        let back: Option<(u32, String)> = load_json(&kv, "pair");
        assert_eq!(back, Some((3, "x".to_string())));
    }

    #[test]
    fn malformed_json_reads_as_absent() {
        let mut kv = MemoryKv::new();
        kv.set("n", "{oops");
        assert_eq!(load_json::<u32>(&kv, "n"), None);
        assert_eq!(load_json::<u32>(&kv, "missing"), None);
    }
}
