//! Deferred release of locally produced media files.
//!
//! A merged/assembled file outlives the request that created it: the caller
//! serves it, then signals `video-done` with the filename. The signal and a
//! watchdog timeout race; whichever fires first deletes the file, and the
//! loser is a no-op. The handle is first-class — deletion is owned by the
//! `DeferredFile`, not by a side table of closures.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Exactly-once deletion handle for one temp file.
#[derive(Debug)]
pub struct DeferredFile {
    path: PathBuf,
    released: AtomicBool,
}

impl DeferredFile {
    pub fn new(path: PathBuf) -> Arc<Self> {
        Arc::new(Self {
            path,
            released: AtomicBool::new(false),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the backing file. Safe to call any number of times; only the
    /// first call touches the filesystem.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::SeqCst) {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("released {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("failed to release {}: {}", self.path.display(), e),
        }
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }
}

/// Registry of deferred files keyed by their path string, with a watchdog
/// that force-releases anything the caller never claims.
#[derive(Default)]
pub struct FileHooks {
    inner: Mutex<HashMap<String, Arc<DeferredFile>>>,
}

impl FileHooks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Track a handle and start its watchdog. After `ttl` the file is
    /// deleted regardless — last-resort leak prevention, not the primary
    /// release path.
    pub fn register(self: &Arc<Self>, file: Arc<DeferredFile>, ttl: Duration) {
        let key = file.path().display().to_string();
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.clone(), file.clone());

        let hooks = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if hooks.take(&key).is_some() {
                log::info!("watchdog releasing unclaimed file {key}");
            }
            file.release();
        });
    }

    /// Explicit release signal for a previously registered filename.
    /// Returns whether the filename was known.
    pub fn release(&self, filename: &str) -> bool {
        match self.take(filename) {
            Some(file) => {
                file.release();
                true
            }
            None => false,
        }
    }

    fn take(&self, filename: &str) -> Option<Arc<DeferredFile>> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(filename)
    }
}
