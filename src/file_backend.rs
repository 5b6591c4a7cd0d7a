// SPDX-License-Identifier: MIT OR Apache-2.0

//! # File Backend
//!
//! Writes composed events to a size-rotated set of files:
//! `{prefix}-00.txt` is the active file; when it crosses the configured size
//! it is compressed into a single-entry `.zip` archive and the archive set is
//! shifted up by one index, deleting the oldest archive to bound disk usage.
//! Indices are zero-padded to the digit width of the retention count.
//!
//! Delivery is asynchronous: `deliver` enqueues a clone of the event onto the
//! backend's own unbounded channel and returns; a dedicated worker thread
//! composes, writes, flushes and rotates. The writer handle and the byte
//! cursor are owned exclusively by that thread, so the hot write path takes
//! no locks.
//!
//! # Failure model
//!
//! Any I/O failure (cannot create the directory, open a writer, archive or
//! rename during a shift) permanently disables this backend instance: the
//! cause is reported once to the fallback sink and every later `log` call
//! becomes a no-op. There is no automatic recovery; replacing the
//! configuration generation creates a fresh instance.

use crate::composer::{Composer, DefaultComposer};
use crate::fallback::{FallbackSink, StderrFallback};
use crate::{Backend, FileConfig, LevelWindow, LogEvent};
use parking_lot::{Mutex, RwLock};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// File-set naming and enumeration for one backend instance.
#[derive(Debug, Clone)]
struct FilePlan {
    dir: PathBuf,
    prefix: String,
    size: u64,
    count: u32,
}

impl FilePlan {
    fn text_path(&self, index: u32) -> PathBuf {
        self.path(index, "txt")
    }

    fn zip_path(&self, index: u32) -> PathBuf {
        self.path(index, "zip")
    }

    fn path(&self, index: u32, suffix: &str) -> PathBuf {
        self.dir
            .join(format!("{}-{}.{suffix}", self.prefix, self.padded(index)))
    }

    /// Index rendered at the digit width of the retention count, so a count
    /// of 10 yields `00`..`09` and a count of 3 yields `0`..`2`.
    fn padded(&self, index: u32) -> String {
        let width = self.count.to_string().len();
        format!("{index:0width$}")
    }

    /// Every text and archive file that exists on disk right now, in index
    /// order, text before archive at each index.
    fn existing_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for index in 0..self.count {
            for path in [self.text_path(index), self.zip_path(index)] {
                if path.exists() {
                    files.push(path);
                }
            }
        }
        files
    }
}

/// The write cursor, the open writer, and the rotation state machine.
///
/// Owned by the worker thread after `init`; never shared.
#[derive(Debug)]
struct RotatingWriter {
    plan: FilePlan,
    writer: Option<BufWriter<File>>,
    written: u64,
}

impl RotatingWriter {
    fn new(plan: FilePlan) -> Self {
        Self {
            plan,
            writer: None,
            written: 0,
        }
    }

    /// Synchronous setup: ensure the directory, then either resume appending
    /// to an under-limit primary file or rotate immediately.
    fn prepare(&mut self) -> io::Result<()> {
        fs::create_dir_all(&self.plan.dir)?;
        let primary = self.plan.text_path(0);
        match fs::metadata(&primary) {
            Ok(meta) if meta.len() < self.plan.size => {
                let file = OpenOptions::new().append(true).open(&primary)?;
                self.writer = Some(BufWriter::new(file));
                self.written = meta.len();
            }
            _ => self.rotate()?,
        }
        Ok(())
    }

    /// Writes and flushes one composed entry, then rotates if the cursor
    /// reached the size limit.
    fn write_entry(&mut self, text: &str) -> io::Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| io::Error::other("no active writer"))?;
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
        self.written += text.len() as u64;
        if self.written >= self.plan.size {
            self.rotate()?;
        }
        Ok(())
    }

    /**
    Archives the active file and shifts the archive set up by one index.

    The oldest archive (index count-1) is deleted first, then indices
    count-2 down to 0 are shifted. The descending order is load-bearing:
    every rename lands on an index that was just vacated, so no shift ever
    overwrites a file that still needs relocating.

    The fresh primary writer is opened before the previous writer is closed,
    leaving no window without a live writer.
    */
    fn rotate(&mut self) -> io::Result<()> {
        let last = self.plan.count.saturating_sub(1);
        let oldest = self.plan.zip_path(last);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (0..last).rev() {
            self.shift(index)?;
        }

        let primary = self.plan.text_path(0);
        if primary.exists() {
            fs::remove_file(&primary)?;
        }
        let file = OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(&primary)?;
        let previous = self.writer.replace(BufWriter::new(file));
        self.written = 0;
        if let Some(mut previous) = previous {
            // Flushed after every entry; nothing buffered is left to lose.
            let _ = previous.flush();
        }
        Ok(())
    }

    /// Moves index `index` to `index + 1`: compress a live text file into an
    /// archive first, then rename the archive upward. Indices with neither
    /// file are skipped.
    fn shift(&mut self, index: u32) -> io::Result<()> {
        let text = self.plan.text_path(index);
        let archive = self.plan.zip_path(index);
        if !text.exists() && !archive.exists() {
            return Ok(());
        }
        if text.exists() {
            archive_file(&text, &archive)?;
            fs::remove_file(&text)?;
        }
        fs::rename(&archive, self.plan.zip_path(index + 1))?;
        Ok(())
    }
}

/// Compresses `source` into a fresh single-entry zip archive at `target`.
fn archive_file(source: &Path, target: &Path) -> io::Result<()> {
    let entry_name = source
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| io::Error::other("log file name is not valid UTF-8"))?;
    let mut input = File::open(source)?;
    let mut writer = ZipWriter::new(File::create(target)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    writer.start_file(entry_name, options).map_err(io::Error::other)?;
    io::copy(&mut input, &mut writer)?;
    writer.finish().map_err(io::Error::other)?;
    Ok(())
}

#[derive(Debug)]
enum WorkerState {
    Idle,
    Running {
        tx: flume::Sender<LogEvent>,
        handle: JoinHandle<()>,
    },
    Stopped,
}

/**
The rotating file backend.

On disk: `{prefix}-00.txt` is the active file; `{prefix}-01.zip` and up are
single-entry archives, newest first, at most `count - 1` of them. Delivery
runs on the backend's own worker thread; any I/O failure permanently
disables the instance after one report to the fallback sink.
*/
#[derive(Debug)]
pub struct FileBackend {
    key: String,
    plan: FilePlan,
    window: RwLock<LevelWindow>,
    composer: Arc<dyn Composer>,
    fallback: Arc<dyn FallbackSink>,
    accepting: Arc<AtomicBool>,
    state: Mutex<WorkerState>,
}

impl FileBackend {
    /// Builds the backend with the stock composer and the stderr fallback
    /// sink. No filesystem work happens until [`init`](Backend::init).
    pub fn new(config: FileConfig) -> Self {
        Self::with(
            config,
            Arc::new(DefaultComposer::new()),
            Arc::new(StderrFallback::new()),
        )
    }

    pub fn with(
        config: FileConfig,
        composer: Arc<dyn Composer>,
        fallback: Arc<dyn FallbackSink>,
    ) -> Self {
        let plan = FilePlan {
            dir: PathBuf::from(&config.folder),
            prefix: config.file_name(),
            size: config.size,
            count: config.count,
        };
        Self {
            key: config.key.clone(),
            plan,
            window: RwLock::new(config.window),
            composer,
            fallback,
            accepting: Arc::new(AtomicBool::new(true)),
            state: Mutex::new(WorkerState::Idle),
        }
    }

    pub(crate) fn from_config(config: &FileConfig, fallback: Arc<dyn FallbackSink>) -> Self {
        Self::with(config.clone(), Arc::new(DefaultComposer::new()), fallback)
    }

    /// Every text and archive file of this backend that exists on disk at
    /// call time, in index order. Intended for export and upload tooling.
    pub fn log_files(&self) -> Vec<PathBuf> {
        self.plan.existing_files()
    }

    fn disable(&self, state: &mut WorkerState, reason: &str) {
        self.accepting.store(false, Ordering::Release);
        *state = WorkerState::Stopped;
        self.fallback.report(&self.key, reason);
    }
}

impl Backend for FileBackend {
    fn key(&self) -> &str {
        &self.key
    }

    /**
    Ensures the directory and the active file, then starts the worker.

    If the primary file is absent or already at the size limit this performs
    an immediate rotation. The worker thread starts only after this setup
    succeeded, so no event is ever queued against an unready writer.
    */
    fn init(&self) {
        let mut state = self.state.lock();
        if !matches!(*state, WorkerState::Idle) {
            return;
        }

        let mut writer = RotatingWriter::new(self.plan.clone());
        if let Err(error) = writer.prepare() {
            self.disable(&mut state, &format!("disabling file backend, cannot initialize: {error}"));
            return;
        }

        let (tx, rx) = flume::unbounded();
        let composer = self.composer.clone();
        let accepting = self.accepting.clone();
        let fallback = self.fallback.clone();
        let key = self.key.clone();
        let spawned = std::thread::Builder::new()
            .name(format!("logfan-file-{}", self.key))
            .spawn(move || run_worker(rx, writer, composer, accepting, fallback, key));
        match spawned {
            Ok(handle) => *state = WorkerState::Running { tx, handle },
            Err(error) => {
                self.disable(&mut state, &format!("disabling file backend, cannot start worker: {error}"));
            }
        }
    }

    fn window(&self) -> LevelWindow {
        *self.window.read()
    }

    fn set_window(&self, window: LevelWindow) {
        *self.window.write() = window;
    }

    /// Enqueues a clone of the event for the worker. Never blocks; silently
    /// drops when the backend is disabled or disposed.
    fn deliver(&self, event: &LogEvent) {
        if !self.accepting.load(Ordering::Acquire) {
            return;
        }
        let state = self.state.lock();
        if let WorkerState::Running { tx, .. } = &*state {
            let _ = tx.send(event.clone());
        }
    }

    /// Stops accepting, lets the worker drain everything already queued,
    /// then joins it and releases the file handle.
    fn dispose(&self) {
        self.accepting.store(false, Ordering::Release);
        let mut state = self.state.lock();
        if let WorkerState::Running { tx, handle } =
            std::mem::replace(&mut *state, WorkerState::Stopped)
        {
            drop(tx);
            let _ = handle.join();
        }
    }
}

fn run_worker(
    rx: flume::Receiver<LogEvent>,
    mut writer: RotatingWriter,
    composer: Arc<dyn Composer>,
    accepting: Arc<AtomicBool>,
    fallback: Arc<dyn FallbackSink>,
    key: String,
) {
    // `failed` is worker-local: after the first I/O failure the backlog is
    // drained and dropped so dispose can still join promptly.
    let mut failed = false;
    for event in rx.iter() {
        if failed {
            continue;
        }
        let text = composer.compose(&event);
        if let Err(error) = writer.write_entry(&text) {
            failed = true;
            accepting.store(false, Ordering::Release);
            fallback.report(&key, &format!("disabling file backend: {error}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(dir: &Path, size: u64, count: u32) -> FilePlan {
        FilePlan {
            dir: dir.to_path_buf(),
            prefix: "app".into(),
            size,
            count,
        }
    }

    #[test]
    fn index_padding_follows_count_width() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert_eq!(plan(dir.path(), 100, 3).padded(0), "0");
        assert_eq!(plan(dir.path(), 100, 10).padded(0), "00");
        assert_eq!(plan(dir.path(), 100, 10).padded(9), "09");
        assert_eq!(plan(dir.path(), 100, 100).padded(42), "042");
    }

    #[test]
    fn prepare_creates_fresh_primary_when_absent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let plan = plan(dir.path(), 1024, 3);
        let mut writer = RotatingWriter::new(plan.clone());
        writer.prepare().expect("prepare");
        assert!(plan.text_path(0).exists());
        assert_eq!(writer.written, 0);
        assert!(!plan.zip_path(1).exists(), "no spurious archive on first init");
    }

    #[test]
    fn prepare_resumes_cursor_from_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let plan = plan(dir.path(), 1024, 3);
        fs::write(plan.text_path(0), b"previous run\n").expect("seed file");

        let mut writer = RotatingWriter::new(plan.clone());
        writer.prepare().expect("prepare");
        assert_eq!(writer.written, 13);
        assert!(!plan.zip_path(1).exists());
    }

    #[test]
    fn prepare_rotates_when_existing_file_is_at_limit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let plan = plan(dir.path(), 8, 3);
        fs::write(plan.text_path(0), b"0123456789").expect("seed file");

        let mut writer = RotatingWriter::new(plan.clone());
        writer.prepare().expect("prepare");
        assert_eq!(writer.written, 0);
        assert_eq!(
            fs::metadata(plan.text_path(0)).expect("primary").len(),
            0,
            "primary should be fresh after the init rotation"
        );
        assert!(plan.zip_path(1).exists());
    }

    #[test]
    fn write_entry_rotates_at_threshold() {
        let dir = tempfile::tempdir().expect("tempdir");
        let plan = plan(dir.path(), 40, 3);
        let mut writer = RotatingWriter::new(plan.clone());
        writer.prepare().expect("prepare");

        writer.write_entry("0123456789012345678\n").expect("write");
        assert!(!plan.zip_path(1).exists(), "20 bytes is under the limit");

        writer.write_entry("0123456789012345678\n").expect("write");
        assert!(plan.zip_path(1).exists(), "40 bytes hits the limit");
        assert_eq!(writer.written, 0);
        assert_eq!(fs::metadata(plan.text_path(0)).expect("primary").len(), 0);
    }

    #[test]
    fn repeated_rotation_never_exceeds_retention() {
        let dir = tempfile::tempdir().expect("tempdir");
        let plan = plan(dir.path(), 4, 3);
        let mut writer = RotatingWriter::new(plan.clone());
        writer.prepare().expect("prepare");

        for _ in 0..10 {
            writer.write_entry("12345\n").expect("write");
        }
        assert!(plan.text_path(0).exists());
        assert!(plan.zip_path(1).exists());
        assert!(plan.zip_path(2).exists());
        assert!(!plan.zip_path(3).exists(), "index must stay below the count");
        assert_eq!(plan.existing_files().len(), 3);
    }

    #[test]
    fn existing_files_lists_in_index_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let plan = plan(dir.path(), 4, 3);
        let mut writer = RotatingWriter::new(plan.clone());
        writer.prepare().expect("prepare");
        writer.write_entry("12345\n").expect("write");
        writer.write_entry("12345\n").expect("write");

        let files = plan.existing_files();
        assert_eq!(files, vec![plan.text_path(0), plan.zip_path(1), plan.zip_path(2)]);
    }
}
