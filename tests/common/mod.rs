#![allow(dead_code)]
//! Shared test support: a scriptable resource loader with observable
//! fetch behavior, mirroring how cooperating agent processes would be
//! wired up in production

use fetching_cache::errors::Result;
use fetching_cache::resource::{Resource, ResourceLoader};
use fetching_cache::{CacheConfig, CleanupExecutor, FetchingCache, FileLockFactory};
use std::io::{self, Cursor, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};
use url::Url;

/// Observable, scriptable state backing a [`TestLoader`]
pub struct LoaderState {
    pub exists: AtomicBool,
    pub version: AtomicI64,
    pub payload: Mutex<Vec<u8>>,
    /// Total `open_stream` invocations, successful or not
    pub opens: AtomicUsize,
    /// The first N opens yield streams that fail mid-read
    pub failing_opens: AtomicUsize,
    /// Signaled once per `open_stream` call
    pub open_started: Mutex<Option<Sender<()>>>,
    /// When set, each `open_stream` call waits for one message before
    /// producing its stream
    pub open_gate: Mutex<Option<Receiver<()>>>,
}

/// Resource loader driven by a [`LoaderState`] script
pub struct TestLoader {
    state: Arc<LoaderState>,
}

impl TestLoader {
    pub fn new(payload: &[u8], version: i64) -> Self {
        Self {
            state: Arc::new(LoaderState {
                exists: AtomicBool::new(true),
                version: AtomicI64::new(version),
                payload: Mutex::new(payload.to_vec()),
                opens: AtomicUsize::new(0),
                failing_opens: AtomicUsize::new(0),
                open_started: Mutex::new(None),
                open_gate: Mutex::new(None),
            }),
        }
    }

    pub fn state(&self) -> Arc<LoaderState> {
        Arc::clone(&self.state)
    }
}

impl ResourceLoader for TestLoader {
    fn get_resource(&self, _uri: &Url) -> Result<Box<dyn Resource>> {
        Ok(Box::new(TestResource {
            state: Arc::clone(&self.state),
        }))
    }
}

struct TestResource {
    state: Arc<LoaderState>,
}

impl Resource for TestResource {
    fn exists(&self) -> Result<bool> {
        Ok(self.state.exists.load(Ordering::SeqCst))
    }

    fn last_modified(&self) -> Result<i64> {
        Ok(self.state.version.load(Ordering::SeqCst))
    }

    fn open_stream(&self) -> Result<Box<dyn Read + Send>> {
        let ordinal = self.state.opens.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some(started) = &*self.state.open_started.lock().unwrap() {
            let _ = started.send(());
        }
        if let Some(gate) = &*self.state.open_gate.lock().unwrap() {
            let _ = gate.recv();
        }

        if ordinal <= self.state.failing_opens.load(Ordering::SeqCst) {
            Ok(Box::new(BrokenStream))
        } else {
            let payload = self.state.payload.lock().unwrap().clone();
            Ok(Box::new(Cursor::new(payload)))
        }
    }
}

/// Stream that aborts on the first read, simulating a dropped
/// connection mid-download
struct BrokenStream;

impl Read for BrokenStream {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::ConnectionAborted,
            "simulated mid-download failure",
        ))
    }
}

/// Build a cache instance over shared collaborators, the way
/// cooperating workers sharing one cache directory would
pub fn cache_with(
    loader: Arc<dyn ResourceLoader>,
    cache_dir: &Path,
    lock_factory: &Arc<FileLockFactory>,
    cleanup: &Arc<CleanupExecutor>,
) -> FetchingCache {
    FetchingCache::new(
        loader,
        &CacheConfig::new(cache_dir),
        Arc::clone(lock_factory),
        Arc::clone(cleanup),
    )
    .unwrap()
}

pub fn test_uri() -> Url {
    Url::parse("https://my-server.com/path/to/config/config.xml").unwrap()
}
