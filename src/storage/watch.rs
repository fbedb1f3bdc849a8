//! Reload the song file when it changes on disk.
//!
//! A `notify` watcher on the parent directory catches most edits; a polling
//! thread covers editors that save via atomic rename and missed events. Both
//! hand reloaded songs to the REPL through one channel.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use crate::console;
use crate::model::song::Song;
use crate::storage::song as song_io;

const DEBOUNCE: Duration = Duration::from_millis(50);
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Reloaded songs from a running watch. Dropping it stops both threads
/// within one poll interval.
pub struct Reloads {
    songs: Receiver<Song>,
    stop: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl Reloads {
    /// Next reloaded song, if one is waiting.
    pub fn try_recv(&self) -> Option<Song> {
        self.songs.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<Song> {
        self.songs.recv_timeout(timeout).ok()
    }

    /// Stop watching and wait for both threads to exit.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        for handle in std::mem::take(&mut self.threads) {
            let _ = handle.join();
        }
    }
}

impl Drop for Reloads {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

/// Start watching `path`.
pub fn spawn(path: PathBuf) -> Reloads {
    let (tx, rx) = mpsc::channel();
    let stop = Arc::new(AtomicBool::new(false));
    let threads = vec![
        start_watcher(path.clone(), tx.clone(), Arc::clone(&stop)),
        start_polling(path, tx, Arc::clone(&stop)),
    ];
    Reloads {
        songs: rx,
        stop,
        threads,
    }
}

fn watch_dir(path: &Path) -> PathBuf {
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(p) => p.to_path_buf(),
        None => env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn reload(path: &Path, tx: &Sender<Song>, source: &str) -> Result<bool, ()> {
    thread::sleep(DEBOUNCE);
    match song_io::open(path) {
        Ok(song) => {
            console::info(format!("reloaded: {} ({})", path.display(), source));
            tx.send(song).map(|_| true).map_err(|_| ())
        }
        Err(e) => {
            console::warn(format!("reload skipped: {:#}", e));
            Ok(false)
        }
    }
}

fn start_watcher(path: PathBuf, songs: Sender<Song>, stop: Arc<AtomicBool>) -> JoinHandle<()> {
    let parent = watch_dir(&path);
    let file_name = path.file_name().map(|s| s.to_os_string());
    thread::spawn(move || {
        let (tx, rx) = mpsc::channel::<notify::Result<notify::Event>>();
        let mut watcher: RecommendedWatcher = match Watcher::new(tx, notify::Config::default()) {
            Ok(w) => w,
            Err(e) => {
                console::warn(format!("file watch disabled (create watcher failed): {}", e));
                return;
            }
        };
        if let Err(e) = watcher.watch(parent.as_path(), RecursiveMode::NonRecursive) {
            console::warn(format!(
                "file watch disabled (cannot watch '{}'): {}",
                parent.display(),
                e
            ));
            return;
        }
        while !stop.load(Ordering::Relaxed) {
            let event = match rx.recv_timeout(POLL_INTERVAL) {
                Ok(Ok(event)) => event,
                Ok(Err(_)) | Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };
            let relevant = event
                .paths
                .iter()
                .any(|p| file_name.as_deref().is_some_and(|name| p.file_name() == Some(name)));
            if relevant && reload(&path, &songs, "event").is_err() {
                break;
            }
        }
    })
}

fn stamp(path: &Path) -> Option<(SystemTime, u64)> {
    let meta = fs::metadata(path).ok()?;
    meta.modified().ok().map(|m| (m, meta.len()))
}

fn start_polling(path: PathBuf, songs: Sender<Song>, stop: Arc<AtomicBool>) -> JoinHandle<()> {
    thread::spawn(move || {
        // The caller has already loaded the current contents
        let mut last = stamp(&path);
        while !stop.load(Ordering::Relaxed) {
            match stamp(&path) {
                Some(current) => {
                    let changed = match last {
                        Some((lm, ll)) => current.0 > lm || current.1 != ll,
                        None => true,
                    };
                    if changed {
                        match reload(&path, &songs, "poll") {
                            Ok(true) => last = Some(current),
                            Ok(false) => {}
                            Err(()) => break,
                        }
                    }
                }
                None => {
                    // File missing; reset and keep watching
                    last = None;
                }
            }
            thread::sleep(POLL_INTERVAL);
        }
    })
}
