// Copyright (C) 2026  Caprica Software Limited
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Drives one scan session: directory walk, per-file change detection, tag
//! read, and handoff to the [`crate::writer`] normalizer, all under a
//! cooperative interrupt latch with periodic progress reporting.
//!
//! Generalizes `process_music_library`'s hard-coded MP3 walk-and-insert loop
//! into the pluggable reader/source model, keeping its progress-tick cadence
//! and its per-file error log.

pub mod source;

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rusqlite::{params, OptionalExtension};

use crate::config::EngineConfig;
use crate::error::IndexError;
use crate::model::TrackCore;
use crate::store::Store;
use crate::tags::ReaderRegistry;
use crate::writer::{self, WriteRequest};

use source::{FilesystemSource, IndexerSource};

const PROGRESS_TICK_INTERVAL: usize = 300;
const PROGRESS_TIME_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexerState {
    Idle,
    Scanning,
    Draining,
}

#[derive(Debug, Clone)]
pub enum ScanProgress {
    Started,
    StartedRoot(String),
    ProcessedFile { count: usize, filename: String },
    FinishedRoot(String),
    Finished { count: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanResult {
    /// The session completed (possibly because it was interrupted partway
    /// through); `count` tracks that committed during the session.
    Commit(i64),
    /// A store-level failure aborted the scan outright.
    Rollback,
}

/// Owns a scan session's cooperative interrupt latch and reader set.
pub struct Indexer {
    readers: ReaderRegistry,
    interrupted: Arc<AtomicBool>,
    state: IndexerState,
}

impl Indexer {
    pub fn new(readers: ReaderRegistry) -> Self {
        Self {
            readers,
            interrupted: Arc::new(AtomicBool::new(false)),
            state: IndexerState::Idle,
        }
    }

    pub fn state(&self) -> IndexerState {
        self.state
    }

    /// A clone of the interrupt latch; raising it from another thread
    /// cooperatively cancels the in-progress scan.
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    /// Walks `roots`, indexing new and changed files, then garbage-collects
    /// tracks whose folder no longer appears under any of them. `library_dir`
    /// holds `thumbs/` and `scan_log.txt`.
    pub fn scan(
        &mut self,
        store: &mut Store,
        library_dir: &Path,
        config: &EngineConfig,
        roots: &[PathBuf],
        progress_tx: Option<&Sender<ScanProgress>>,
    ) -> Result<ScanResult, IndexError> {
        self.state = IndexerState::Scanning;
        send(progress_tx, ScanProgress::Started);

        let thumbnails_dir = library_dir.join("thumbs");
        let mut error_log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(library_dir.join("scan_log.txt"))
            .map_err(|source| IndexError::Io {
                path: library_dir.join("scan_log.txt"),
                source,
            })?;

        let mut source = FilesystemSource;
        source.on_before_scan();

        let mut count: i64 = 0;
        let mut processed_since_tick = 0usize;
        let mut last_tick = Instant::now();
        let mut seen_folder_ids: HashSet<i64> = HashSet::new();
        let interrupted = self.interrupted.clone();
        let is_interrupted = move || interrupted.load(Ordering::SeqCst);

        'roots: for root in roots {
            if is_interrupted() {
                self.state = IndexerState::Draining;
                break 'roots;
            }

            send(progress_tx, ScanProgress::StartedRoot(root.display().to_string()));

            let candidates = source.candidates(std::slice::from_ref(root), &is_interrupted);
            for path in candidates {
                if is_interrupted() {
                    self.state = IndexerState::Draining;
                    break 'roots;
                }

                match self.process_candidate(
                    store,
                    &thumbnails_dir,
                    config,
                    root,
                    &path,
                    source.source_id(),
                    &mut seen_folder_ids,
                ) {
                    Ok(true) => count += 1,
                    Ok(false) => {}
                    Err(IndexError::TagParse { path } | IndexError::Io { path, .. }) => {
                        let _ = writeln!(error_log, "{} | unreadable", path.display());
                    }
                    Err(e @ IndexError::Store(_)) => {
                        return Err(e);
                    }
                    Err(IndexError::Interrupted) => {
                        self.state = IndexerState::Draining;
                        break 'roots;
                    }
                }

                processed_since_tick += 1;
                if processed_since_tick >= PROGRESS_TICK_INTERVAL
                    || last_tick.elapsed() >= PROGRESS_TIME_INTERVAL
                {
                    let filename = path
                        .file_name()
                        .map(|f| f.to_string_lossy().into_owned())
                        .unwrap_or_else(|| "unknown".into());
                    send(
                        progress_tx,
                        ScanProgress::ProcessedFile {
                            count: count as usize,
                            filename,
                        },
                    );
                    processed_since_tick = 0;
                    last_tick = Instant::now();
                }
            }

            send(progress_tx, ScanProgress::FinishedRoot(root.display().to_string()));
        }

        if self.state != IndexerState::Draining {
            gc_removed_folders(store, roots, &seen_folder_ids)?;
            self.state = IndexerState::Idle;
        }

        source.on_after_scan();
        send(progress_tx, ScanProgress::Finished { count });
        Ok(ScanResult::Commit(count))
    }

    /// Applies the fast-path change check, reads tags if needed, and hands
    /// the result to the writer. Returns `Ok(true)` if a write happened,
    /// `Ok(false)` if the file was already up to date.
    fn process_candidate(
        &self,
        store: &mut Store,
        thumbnails_dir: &Path,
        config: &EngineConfig,
        root: &Path,
        path: &Path,
        source_id: i32,
        seen_folder_ids: &mut HashSet<i64>,
    ) -> Result<bool, IndexError> {
        let metadata = std::fs::metadata(path).map_err(|source| IndexError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let filesize = metadata.len() as i64;
        let filetime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        let folder_id = ensure_folder(store, root, path)?;
        seen_folder_ids.insert(folder_id);

        let filename = path
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();

        let existing: Option<(i64, i64, i64)> = store
            .connection()
            .query_row(
                "SELECT id, filesize, filetime FROM tracks WHERE folder_id = ?1 AND filename = ?2",
                params![folder_id, filename],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()
            .map_err(|source| IndexError::Store(crate::error::StoreError::Sql(source)))?;

        let existing_track_id = match existing {
            None => None,
            Some((_, old_size, old_time)) if old_size == filesize && old_time == filetime => {
                return Ok(false);
            }
            Some((id, _, _)) => Some(id),
        };

        let bag = self.readers.read(path).ok_or_else(|| IndexError::TagParse {
            path: path.to_path_buf(),
        })?;
        let mut core = TrackCore::extract(&bag);
        core.filename = Some(filename);
        core.filesize = Some(filesize);
        core.filetime = Some(filetime);

        writer::write_track(
            store,
            thumbnails_dir,
            config,
            WriteRequest {
                folder_id,
                source_id,
                external_id: None,
                existing_track_id,
                core,
            },
            &|| false,
        )
        .map_err(IndexError::from)?;

        Ok(true)
    }
}

/// Gets or creates the `(paths, folders)` rows for `path`'s containing
/// directory relative to `root`.
fn ensure_folder(store: &mut Store, root: &Path, path: &Path) -> Result<i64, IndexError> {
    let root_str = root.to_string_lossy().into_owned();
    let relative = source::relative_dir(root, path);

    let tx = store.transaction()?;
    let conn = tx.connection();
    conn.execute(
        "INSERT INTO paths (path) VALUES (?1) ON CONFLICT(path) DO NOTHING",
        params![root_str],
    )?;
    let path_id: i64 = conn.query_row("SELECT id FROM paths WHERE path = ?1", params![root_str], |r| {
        r.get(0)
    })?;
    conn.execute(
        "INSERT INTO folders (path_id, relative_path) VALUES (?1, ?2)
         ON CONFLICT(path_id, relative_path) DO NOTHING",
        params![path_id, relative],
    )?;
    let folder_id: i64 = conn.query_row(
        "SELECT id FROM folders WHERE path_id = ?1 AND relative_path = ?2",
        params![path_id, relative],
        |r| r.get(0),
    )?;
    tx.commit()?;
    Ok(folder_id)
}

/// Deletes filesystem-source tracks whose folder was not visited this scan,
/// restricted to folders under one of `roots` so a partial scan of a subset
/// of configured roots can't prune unrelated libraries.
fn gc_removed_folders(
    store: &mut Store,
    roots: &[PathBuf],
    seen_folder_ids: &HashSet<i64>,
) -> Result<(), IndexError> {
    let tx = store.transaction()?;
    let conn = tx.connection();

    for root in roots {
        let root_str = root.to_string_lossy().into_owned();
        let path_id: Option<i64> = conn
            .query_row("SELECT id FROM paths WHERE path = ?1", params![root_str], |r| r.get(0))
            .optional()?;
        let Some(path_id) = path_id else { continue };

        let mut stmt = conn.prepare("SELECT id FROM folders WHERE path_id = ?1")?;
        let folder_ids: Vec<i64> = stmt
            .query_map(params![path_id], |r| r.get(0))?
            .collect::<Result<_, _>>()?;
        drop(stmt);

        for folder_id in folder_ids {
            if seen_folder_ids.contains(&folder_id) {
                continue;
            }
            conn.execute(
                "DELETE FROM tracks WHERE folder_id = ?1 AND source_id = ?2",
                params![folder_id, source::FILESYSTEM_SOURCE_ID],
            )?;
        }
    }

    tx.commit()?;
    Ok(())
}

fn send(tx: Option<&Sender<ScanProgress>>, progress: ScanProgress) {
    if let Some(tx) = tx {
        let _ = tx.send(progress);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::LoftyReader;
    use std::fs;

    fn registry() -> ReaderRegistry {
        let mut r = ReaderRegistry::new();
        r.register(Box::new(LoftyReader::new()));
        r
    }

    #[test]
    fn scanning_an_empty_root_indexes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let library_dir = tempfile::tempdir().unwrap();
        let mut store = Store::open_in_memory().unwrap();
        let config = EngineConfig::default();
        let mut indexer = Indexer::new(registry());

        let result = indexer
            .scan(
                &mut store,
                library_dir.path(),
                &config,
                &[dir.path().to_path_buf()],
                None,
            )
            .unwrap();
        assert_eq!(result, ScanResult::Commit(0));
        assert_eq!(indexer.state(), IndexerState::Idle);
    }

    #[test]
    fn unreadable_file_is_logged_and_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("not-audio.mp3"), b"not a real mp3 file").unwrap();
        let library_dir = tempfile::tempdir().unwrap();
        let mut store = Store::open_in_memory().unwrap();
        let config = EngineConfig::default();
        let mut indexer = Indexer::new(registry());

        let result = indexer
            .scan(
                &mut store,
                library_dir.path(),
                &config,
                &[dir.path().to_path_buf()],
                None,
            )
            .unwrap();
        assert_eq!(result, ScanResult::Commit(0));
        assert!(library_dir.path().join("scan_log.txt").exists());
    }

    #[test]
    fn interrupt_before_scan_starts_drains_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let library_dir = tempfile::tempdir().unwrap();
        let mut store = Store::open_in_memory().unwrap();
        let config = EngineConfig::default();
        let mut indexer = Indexer::new(registry());
        indexer.interrupt_handle().store(true, Ordering::SeqCst);

        let result = indexer
            .scan(
                &mut store,
                library_dir.path(),
                &config,
                &[dir.path().to_path_buf()],
                None,
            )
            .unwrap();
        assert_eq!(result, ScanResult::Commit(0));
        assert_eq!(indexer.state(), IndexerState::Draining);
    }

    #[test]
    fn ensure_folder_is_idempotent() {
        let mut store = Store::open_in_memory().unwrap();
        let root = Path::new("/music");
        let a = ensure_folder(&mut store, root, Path::new("/music/Artist/song.mp3")).unwrap();
        let b = ensure_folder(&mut store, root, Path::new("/music/Artist/other.mp3")).unwrap();
        assert_eq!(a, b);
    }

    struct StubReader;

    impl crate::tags::TagReader for StubReader {
        fn can_read(&self, extension: &str) -> bool {
            extension == "mp3"
        }

        fn read(&self, _path: &Path, sink: &mut dyn crate::tags::TrackWriterSink) -> bool {
            sink.set("title", "Stub Title");
            sink.set("artist", "Stub Artist");
            true
        }
    }

    fn stub_registry() -> ReaderRegistry {
        let mut r = ReaderRegistry::new();
        r.register(Box::new(StubReader));
        r
    }

    #[test]
    fn idempotent_rescan_skips_unchanged_file_without_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("song.mp3"), b"stub audio bytes").unwrap();
        let library_dir = tempfile::tempdir().unwrap();
        let mut store = Store::open_in_memory().unwrap();
        let config = EngineConfig::default();
        let mut indexer = Indexer::new(stub_registry());
        let roots = [dir.path().to_path_buf()];

        let result = indexer.scan(&mut store, library_dir.path(), &config, &roots, None).unwrap();
        assert_eq!(result, ScanResult::Commit(1));

        let track_id: i64 = store
            .connection()
            .query_row("SELECT id FROM tracks", [], |r| r.get(0))
            .unwrap();
        store
            .connection()
            .execute("UPDATE tracks SET title = 'sentinel' WHERE id = ?1", params![track_id])
            .unwrap();

        let result = indexer.scan(&mut store, library_dir.path(), &config, &roots, None).unwrap();
        assert_eq!(result, ScanResult::Commit(0), "unchanged file must not be reprocessed");

        let title: String = store
            .connection()
            .query_row("SELECT title FROM tracks WHERE id = ?1", params![track_id], |r| r.get(0))
            .unwrap();
        assert_eq!(title, "sentinel", "fast path must not rewrite an unchanged track");
    }

    #[test]
    fn changed_mtime_updates_filetime_without_adding_a_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.mp3");
        fs::write(&path, b"stub audio bytes").unwrap();
        let library_dir = tempfile::tempdir().unwrap();
        let mut store = Store::open_in_memory().unwrap();
        let config = EngineConfig::default();
        let mut indexer = Indexer::new(stub_registry());
        let roots = [dir.path().to_path_buf()];

        indexer.scan(&mut store, library_dir.path(), &config, &roots, None).unwrap();
        let (track_id, old_filetime): (i64, i64) = store
            .connection()
            .query_row("SELECT id, filetime FROM tracks", [], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap();

        let new_mtime = std::time::UNIX_EPOCH + std::time::Duration::from_secs(old_filetime as u64 + 3600);
        fs::File::options()
            .write(true)
            .open(&path)
            .unwrap()
            .set_modified(new_mtime)
            .unwrap();

        let result = indexer.scan(&mut store, library_dir.path(), &config, &roots, None).unwrap();
        assert_eq!(result, ScanResult::Commit(1), "a changed mtime must trigger a rewrite");

        let (count, same_id, new_filetime): (i64, i64, i64) = store
            .connection()
            .query_row(
                "SELECT COUNT(*), MIN(id), MAX(filetime) FROM tracks",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .unwrap();
        assert_eq!(count, 1, "the row count must stay at one");
        assert_eq!(same_id, track_id, "the existing row must be updated in place");
        assert_ne!(new_filetime, old_filetime);
    }

    struct InterruptingReader {
        interrupt: Arc<AtomicBool>,
        after: usize,
        seen: std::sync::atomic::AtomicUsize,
    }

    impl crate::tags::TagReader for InterruptingReader {
        fn can_read(&self, extension: &str) -> bool {
            extension == "mp3"
        }

        fn read(&self, _path: &Path, sink: &mut dyn crate::tags::TrackWriterSink) -> bool {
            sink.set("title", "Stub Title");
            let seen = self.seen.fetch_add(1, Ordering::SeqCst) + 1;
            if seen >= self.after {
                self.interrupt.store(true, Ordering::SeqCst);
            }
            true
        }
    }

    #[test]
    fn interrupt_mid_scan_leaves_a_partial_commit_and_draining_state() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..5 {
            fs::write(dir.path().join(format!("track{i}.mp3")), format!("stub {i}")).unwrap();
        }
        let library_dir = tempfile::tempdir().unwrap();
        let mut store = Store::open_in_memory().unwrap();
        let config = EngineConfig::default();

        let interrupt = Arc::new(AtomicBool::new(false));
        let mut registry = ReaderRegistry::new();
        registry.register(Box::new(InterruptingReader {
            interrupt: interrupt.clone(),
            after: 2,
            seen: std::sync::atomic::AtomicUsize::new(0),
        }));
        let mut indexer = Indexer::new(registry);
        indexer.interrupted = interrupt;

        let result = indexer
            .scan(&mut store, library_dir.path(), &config, &[dir.path().to_path_buf()], None)
            .unwrap();

        assert_eq!(result, ScanResult::Commit(2), "scan must stop at the interrupt boundary");
        assert_eq!(indexer.state(), IndexerState::Draining);
    }
}
