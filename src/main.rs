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

//! A thin CLI over the library engine: scan configured media directories,
//! browse categories, list tracks, and play one by path.

use std::path::PathBuf;
use std::sync::mpsc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use muzak::config::{self, EngineConfig};
use muzak::indexer::{Indexer, ScanProgress};
use muzak::model::{Category, MatchMode, PlayQueueSnapshot};
use muzak::player::{AudioPlayer, PlayerEvent};
use muzak::query::{self, TrackFilter};
use muzak::tags::{LoftyReader, ReaderRegistry};
use muzak::store::Store;

#[derive(Parser)]
#[command(version, about, author, long_about = None)]
struct Cli {
    /// Directory holding musik.db, thumbs/ and scan_log.txt.
    #[arg(long, default_value = "./library")]
    library_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Walk the configured media directories and index new or changed files.
    Scan,
    /// List the names in a browsing category (artist, album, genre,
    /// album-artist, playlists).
    Browse {
        category: CategoryArg,
        /// Only show names containing this substring.
        filter: Option<String>,
    },
    /// List every indexed track, optionally filtered by free text.
    Tracks {
        /// Case-insensitive substring match against artist/album/title.
        filter: Option<String>,
    },
    /// Play a single file by path, blocking until it ends or is interrupted.
    Play { path: PathBuf },
    /// Show the persisted play queue, or replace it with the given track ids.
    Queue {
        /// Replace the persisted queue with these track ids, in order.
        #[arg(long, value_delimiter = ',')]
        save: Option<Vec<i64>>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum CategoryArg {
    Artist,
    Album,
    Genre,
    AlbumArtist,
    Playlists,
}

impl From<CategoryArg> for Category {
    fn from(value: CategoryArg) -> Self {
        match value {
            CategoryArg::Artist => Category::Artist,
            CategoryArg::Album => Category::Album,
            CategoryArg::Genre => Category::Genre,
            CategoryArg::AlbumArtist => Category::AlbumArtist,
            CategoryArg::Playlists => Category::Playlists,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load_config();
    let mut store = Store::open(cli.library_dir.join("musik.db")).context("opening library store")?;

    match cli.command {
        Command::Scan => store = run_scan(store, &cli.library_dir, &config)?,
        Command::Browse { category, filter } => {
            let items = query::list_category(store.connection(), category.into(), filter.as_deref())?;
            for item in items {
                println!("{}\t{}", item.id, item.name);
            }
        }
        Command::Tracks { filter } => {
            let track_filter = match filter {
                Some(text) => TrackFilter::FreeText { text, mode: MatchMode::Substring },
                None => TrackFilter::All,
            };
            for track in query::list_tracks(store.connection(), &track_filter)? {
                println!(
                    "{}\t{} - {} ({})",
                    track.track_id, track.artist_name, track.title, track.album_name
                );
            }
        }
        Command::Play { path } => run_play(&path)?,
        Command::Queue { save } => run_queue(&store, &config, save)?,
    }

    Ok(())
}

fn run_scan(mut store: Store, library_dir: &std::path::Path, config: &EngineConfig) -> Result<Store> {
    std::fs::create_dir_all(library_dir).context("creating library directory")?;

    let roots: Vec<PathBuf> = config.media_dirs.iter().map(PathBuf::from).collect();
    if roots.is_empty() {
        println!("no media directories configured; nothing to scan");
        return Ok(store);
    }

    let (progress_tx, progress_rx) = mpsc::channel::<ScanProgress>();
    let library_dir = library_dir.to_path_buf();
    let config = config.clone();
    let handle = std::thread::spawn(move || {
        let mut readers = ReaderRegistry::new();
        readers.register(Box::new(LoftyReader::new()));
        let mut indexer = Indexer::new(readers);
        let result = indexer.scan(&mut store, &library_dir, &config, &roots, Some(&progress_tx));
        (store, result)
    });

    for progress in progress_rx {
        match progress {
            ScanProgress::Started => println!("scan started"),
            ScanProgress::StartedRoot(root) => println!("scanning {root}"),
            ScanProgress::ProcessedFile { count, filename } => {
                if count % 300 == 0 {
                    println!("  {count} files processed, at {filename}");
                }
            }
            ScanProgress::FinishedRoot(root) => println!("finished {root}"),
            ScanProgress::Finished { count } => println!("scan finished, {count} tracks committed"),
        }
    }

    let (scanned_store, result) = handle.join().expect("scan thread panicked");
    result?;
    Ok(scanned_store)
}

/// With `save`, persists those track ids as the play queue (gated on
/// `save_session_on_exit`). Without it, shows the persisted queue, resolved
/// from `preferences` and `play_queue` (gated on `resume_playback_on_startup`).
fn run_queue(store: &Store, config: &EngineConfig, save: Option<Vec<i64>>) -> Result<()> {
    let conn = store.connection();

    if let Some(track_ids) = save {
        if !config.save_session_on_exit {
            println!("save_session_on_exit is disabled; not persisting");
            return Ok(());
        }
        query::save_play_queue(
            conn,
            &PlayQueueSnapshot {
                track_ids,
                active_index: Some(0),
                offset_seconds: 0.0,
            },
        )?;
        println!("play queue saved");
        return Ok(());
    }

    if !config.resume_playback_on_startup {
        println!("resume_playback_on_startup is disabled");
        return Ok(());
    }

    let snapshot = query::load_play_queue(conn)?;
    if snapshot.track_ids.is_empty() {
        println!("no persisted play queue");
        return Ok(());
    }
    for (i, track_id) in snapshot.track_ids.iter().enumerate() {
        let marker = if Some(i as i32) == snapshot.active_index { "*" } else { " " };
        println!("{marker} {track_id}");
    }
    println!("offset: {:.1}s", snapshot.offset_seconds);
    Ok(())
}

fn run_play(path: &std::path::Path) -> Result<()> {
    let (event_tx, event_rx) = mpsc::channel::<PlayerEvent>();
    let player = AudioPlayer::new(event_tx)?;
    player.play_track(0, &path.to_string_lossy())?;

    for event in event_rx {
        match event {
            PlayerEvent::TrackFinished(_) => break,
            PlayerEvent::Error(message) => {
                eprintln!("playback error: {message}");
                break;
            }
            other => println!("{other:?}"),
        }
    }

    Ok(())
}
