use std::collections::HashMap;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use chrono::Local;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::{Result, RowmarkError};

/// Storage for large payloads keyed by name.
pub trait BlobStore: Send + 'static {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    fn put(&self, key: &str, value: &[u8]) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
}

/// Blob table in a SQLite file
#[derive(Debug)]
pub struct SqliteBlobStore {
    conn: Connection,
}

impl SqliteBlobStore {
    /// Open (or create) the database and make sure the table exists
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS blobs (
                key TEXT PRIMARY KEY NOT NULL,
                value BLOB NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
            [],
        )?;
        Ok(Self { conn })
    }

    /// When the value under `key` was last written, as stored (RFC 3339)
    pub fn updated_at(&self, key: &str) -> Result<Option<String>> {
        let stamp = self
            .conn
            .query_row(
                "SELECT updated_at FROM blobs WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(stamp)
    }
}

impl BlobStore for SqliteBlobStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let value = self
            .conn
            .query_row("SELECT value FROM blobs WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO blobs (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
            params![key, value, Local::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM blobs WHERE key = ?1", [key])?;
        Ok(())
    }
}

/// In-memory blob store; clones share contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self.entries.lock().map_err(|_| RowmarkError::StoreClosed)?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| RowmarkError::StoreClosed)?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().map_err(|_| RowmarkError::StoreClosed)?;
        entries.remove(key);
        Ok(())
    }
}

type GetCallback = Box<dyn FnOnce(Option<Vec<u8>>) + Send>;

enum Request {
    Get { key: String, done: GetCallback },
    Put { key: String, value: Vec<u8> },
    Delete { key: String },
    Flush { done: Sender<()> },
}

/// Runs a [`BlobStore`] on its own thread.
///
/// Writes are fire-and-forget. Reads complete through a callback on the worker
/// thread (or a [`PendingBlob`] handle). A store that fails to open, or fails a
/// request, answers reads with `None` and drops writes, logging the cause.
pub struct AsyncBlobStore {
    tx: Option<Sender<Request>>,
    worker: Option<JoinHandle<()>>,
}

impl AsyncBlobStore {
    pub fn spawn<S: BlobStore>(store: S) -> Self {
        Self::spawn_with(move || Ok(store))
    }

    /// Open the store on the worker thread itself.
    pub fn spawn_with<S, F>(open: F) -> Self
    where
        S: BlobStore,
        F: FnOnce() -> Result<S> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Request>();
        let worker = thread::spawn(move || {
            let store = match open() {
                Ok(store) => Some(store),
                Err(e) => {
                    log::warn!("blob store unavailable, payloads will not persist: {e}");
                    None
                }
            };
            serve(store, rx);
        });
        Self {
            tx: Some(tx),
            worker: Some(worker),
        }
    }

    fn send(&self, req: Request) -> bool {
        self.try_send(req).is_ok()
    }

    /// Read `key`; `done` runs on the worker thread once the value is known.
    pub fn get_with<F>(&self, key: &str, done: F)
    where
        F: FnOnce(Option<Vec<u8>>) + Send + 'static,
    {
        let req = Request::Get {
            key: key.to_string(),
            done: Box::new(done),
        };
        if let Err(mpsc::SendError(Request::Get { done, .. })) = self.try_send(req) {
            done(None);
        }
    }

    fn try_send(&self, req: Request) -> std::result::Result<(), mpsc::SendError<Request>> {
        match &self.tx {
            Some(tx) => tx.send(req),
            None => Err(mpsc::SendError(req)),
        }
    }

    pub fn get(&self, key: &str) -> PendingBlob {
        let (tx, rx) = mpsc::channel();
        self.get_with(key, move |value| {
            let _ = tx.send(value);
        });
        PendingBlob {
            key: key.to_string(),
            rx,
        }
    }

    pub fn put(&self, key: &str, value: Vec<u8>) {
        if !self.send(Request::Put {
            key: key.to_string(),
            value,
        }) {
            log::warn!("blob store closed, dropping write to {key}");
        }
    }

    pub fn delete(&self, key: &str) {
        self.send(Request::Delete {
            key: key.to_string(),
        });
    }

    /// Block until every request sent before this call has been handled
    pub fn flush(&self) {
        let (done, wait) = mpsc::channel();
        if self.send(Request::Flush { done }) {
            let _ = wait.recv();
        }
    }
}

impl Drop for AsyncBlobStore {
    fn drop(&mut self) {
        // closing the channel lets the worker finish queued writes and exit
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn serve<S: BlobStore>(store: Option<S>, rx: Receiver<Request>) {
    for req in rx {
        match req {
            Request::Get { key, done } => {
                let value = store.as_ref().and_then(|s| match s.get(&key) {
                    Ok(v) => v,
                    Err(e) => {
                        log::warn!("blob read {key} failed: {e}");
                        None
                    }
                });
                done(value);
            }
            Request::Put { key, value } => {
                if let Some(s) = &store {
                    match s.put(&key, &value) {
                        Ok(()) => log::debug!("stored {} bytes under {key}", value.len()),
                        Err(e) => log::warn!("blob write {key} failed: {e}"),
                    }
                }
            }
            Request::Delete { key } => {
                if let Some(Err(e)) = store.as_ref().map(|s| s.delete(&key)) {
                    log::warn!("blob delete {key} failed: {e}");
                }
            }
            Request::Flush { done } => {
                let _ = done.send(());
            }
        }
    }
}

/// Handle for a read in flight
#[derive(Debug)]
pub struct PendingBlob {
    key: String,
    rx: Receiver<Option<Vec<u8>>>,
}

impl PendingBlob {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn wait(self) -> Option<Vec<u8>> {
        self.rx.recv().ok().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn sqlite_put_get_overwrite() {
        let store = SqliteBlobStore::open_in_memory().unwrap();
        assert_eq!(store.get("image-file").unwrap(), None);
        store.put("image-file", b"first").unwrap();
        store.put("image-file", b"second").unwrap();
        assert_eq!(store.get("image-file").unwrap().as_deref(), Some(&b"second"[..]));
        assert!(store.updated_at("image-file").unwrap().is_some());
        store.delete("image-file").unwrap();
        assert_eq!(store.get("image-file").unwrap(), None);
    }

    #[test]
    fn sqlite_persists_across_connections() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("blobs.db");
        SqliteBlobStore::open(&path)
            .unwrap()
            .put("pdf-file", &[1, 2, 3])
            .unwrap();
        let reopened = SqliteBlobStore::open(&path).unwrap();
        assert_eq!(reopened.get("pdf-file").unwrap(), Some(vec![1, 2, 3]));
    }

    #[test]
    fn async_store_orders_writes_before_reads() {
        let store = AsyncBlobStore::spawn(MemoryBlobStore::new());
        store.put("k", vec![9; 1024]);
        let pending = store.get("k");
        assert_eq!(pending.key(), "k");
        assert_eq!(pending.wait(), Some(vec![9; 1024]));
    }

    #[test]
    fn async_store_callback_runs() {
        let store = AsyncBlobStore::spawn(MemoryBlobStore::new());
        let (tx, rx) = mpsc::channel();
        store.get_with("absent", move |v| tx.send(v).unwrap());
        assert_eq!(rx.recv().unwrap(), None);
    }

    #[test]
    fn failed_open_degrades_to_absent() {
        let store = AsyncBlobStore::spawn_with(|| -> Result<MemoryBlobStore> {
            Err(RowmarkError::Unsupported("no disk".into()))
        });
        store.put("k", vec![1]);
        store.flush();
        assert_eq!(store.get("k").wait(), None);
    }

    #[test]
    fn drop_drains_queued_writes() {
        let backing = MemoryBlobStore::new();
        {
            let store = AsyncBlobStore::spawn(backing.clone());
            store.put("k", vec![7]);
        }
        assert_eq!(backing.get("k").unwrap(), Some(vec![7]));
    }
}
