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

//! Normalizes a [`TrackCore`] into the relational schema.
//!
//! One call to [`write_track`] is one all-or-nothing transaction: the scalar
//! track row, album lookup, multi-valued artist/genre normalization (with
//! synthetic aggregate rows for tracks with more than one value), thumbnail
//! dedup-by-checksum, and free-form metadata all commit together or not at
//! all. Generalizes the get-or-create-by-name pattern the indexer used to
//! apply only to a single artist per MP3 into the multi-valued, aggregate-row
//! scheme the normalized schema requires.

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};

use crate::config::EngineConfig;
use crate::error::WriterError;
use crate::model::TrackCore;
use crate::store::Store;

/// Everything [`write_track`] needs beyond the tag-derived [`TrackCore`]:
/// where the file lives and whether this call is updating a known row.
pub struct WriteRequest {
    pub folder_id: i64,
    pub source_id: i32,
    pub external_id: Option<String>,
    pub existing_track_id: Option<i64>,
    pub core: TrackCore,
}

/// Writes one track's normalized data under a single transaction, returning
/// the track's id. `thumbnails_dir` is where deduped thumbnail blobs live,
/// named `<thumbnail_id>.jpg`.
pub fn write_track(
    store: &mut Store,
    thumbnails_dir: &Path,
    config: &EngineConfig,
    req: WriteRequest,
    interrupted: &dyn Fn() -> bool,
) -> Result<i64, WriterError> {
    if interrupted() {
        return Err(WriterError::Interrupted);
    }

    let tx = store.transaction()?;
    let conn = tx.connection();

    // Step 1: pre-clean junction rows so an update doesn't leave stale
    // artist/genre/meta links alongside the freshly written ones.
    if let Some(existing_id) = req.existing_track_id {
        conn.execute("DELETE FROM track_artists WHERE track_id = ?1", params![existing_id])?;
        conn.execute("DELETE FROM track_genres WHERE track_id = ?1", params![existing_id])?;
        conn.execute("DELETE FROM track_meta WHERE track_id = ?1", params![existing_id])?;
    }

    let core = &req.core;
    let filename = core.filename.clone().unwrap_or_default();
    let extension = extension_of(&filename);
    let title = core
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| filename.clone());

    // Step 2: core scalar upsert. The FK columns are left unset here and
    // filled in by the step 6 fixup once album/artist/genre ids exist;
    // they're nullable for exactly this reason, and every row has them set
    // by the time this transaction commits.
    let track_id = match req.existing_track_id {
        Some(id) => {
            conn.execute(
                "UPDATE tracks SET track=?1, disc=?2, bpm=?3, duration=?4, filesize=?5, year=?6,
                 folder_id=?7, title=?8, filename=?9, filetime=?10, source_id=?11, external_id=?12
                 WHERE id=?13",
                params![
                    core.track_number,
                    core.disc_number,
                    core.bpm,
                    core.duration.unwrap_or(0),
                    core.filesize.unwrap_or(0),
                    core.year,
                    req.folder_id,
                    title,
                    filename,
                    core.filetime.unwrap_or(0),
                    req.source_id,
                    req.external_id,
                    id,
                ],
            )?;
            id
        }
        None => {
            conn.execute(
                "INSERT INTO tracks (track, disc, bpm, duration, filesize, year, folder_id,
                 title, filename, filetime, source_id, external_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    core.track_number,
                    core.disc_number,
                    core.bpm,
                    core.duration.unwrap_or(0),
                    core.filesize.unwrap_or(0),
                    core.year,
                    req.folder_id,
                    title,
                    filename,
                    core.filetime.unwrap_or(0),
                    req.source_id,
                    req.external_id,
                ],
            )?;
            conn.last_insert_rowid()
        }
    };

    // Step 3: album lookup/insert. An empty tag falls back to the
    // configured default-name template; only if that template itself
    // resolves to empty does the album name become the literal empty
    // string, preserving the unique-name join without inventing a title.
    let album_name = core
        .album
        .clone()
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| EngineConfig::substitute(&config.default_album_name, &extension));
    let album_id = upsert_vocab_row(conn, "albums", &album_name, None)?;

    // Step 4: multi-valued artist/genre normalization.
    let mut artist_names = core.artists.clone();
    if artist_names.is_empty() {
        let default = EngineConfig::substitute(&config.default_artist_name, &extension);
        if !default.trim().is_empty() {
            artist_names.push(default);
        }
    }
    let visual_artist_id = normalize_multi_valued(
        conn,
        "artists",
        "track_artists",
        "artist_id",
        track_id,
        artist_names,
    )?;
    let visual_genre_id = normalize_multi_valued(
        conn,
        "genres",
        "track_genres",
        "genre_id",
        track_id,
        core.genres.clone(),
    )?;

    // Step 5: thumbnail dedup by (filesize, checksum); first writer of a
    // given checksum wins the blob file, later tracks with the same image
    // just reference it.
    let thumbnail_id = match &core.thumbnail {
        Some(bytes) => Some(upsert_thumbnail(conn, thumbnails_dir, bytes)?),
        None => None,
    };

    // Step 6: foreign-key fixup now that every referenced id is known.
    conn.execute(
        "UPDATE tracks SET album_id=?1, visual_artist_id=?2, visual_genre_id=?3, thumbnail_id=?4
         WHERE id=?5",
        params![album_id, visual_artist_id, visual_genre_id, thumbnail_id, track_id],
    )?;

    // Step 7: free-form metadata not consumed by the core schema.
    for (key, values) in &core.extra {
        let meta_key_id = upsert_meta_key(conn, key)?;
        for value in values {
            let meta_value_id = upsert_meta_value(conn, meta_key_id, value)?;
            conn.execute(
                "INSERT OR IGNORE INTO track_meta (track_id, meta_value_id) VALUES (?1, ?2)",
                params![track_id, meta_value_id],
            )?;
        }
    }

    if interrupted() {
        return Err(WriterError::Interrupted);
    }

    tx.commit()?;
    Ok(track_id)
}

/// Deletes a track row outright; `ON DELETE CASCADE` takes the junction and
/// meta rows with it. Vocabulary and album rows are left behind even if
/// orphaned, matching the "no pruning on single-track removal" policy.
pub fn delete_track(store: &mut Store, track_id: i64) -> Result<(), WriterError> {
    let tx = store.transaction()?;
    tx.connection()
        .execute("DELETE FROM tracks WHERE id = ?1", params![track_id])?;
    tx.commit()?;
    Ok(())
}

fn normalize_multi_valued(
    conn: &Connection,
    vocab_table: &str,
    junction_table: &str,
    junction_col: &str,
    track_id: i64,
    values: Vec<String>,
) -> Result<i64, WriterError> {
    if values.is_empty() {
        let sentinel_id = upsert_vocab_row(conn, vocab_table, "Unknown", Some(true))?;
        insert_junction(conn, junction_table, junction_col, track_id, sentinel_id)?;
        return Ok(sentinel_id);
    }

    let mut concrete_ids = Vec::with_capacity(values.len());
    for name in &values {
        let id = upsert_vocab_row(conn, vocab_table, name, Some(false))?;
        insert_junction(conn, junction_table, junction_col, track_id, id)?;
        concrete_ids.push(id);
    }

    if values.len() == 1 {
        Ok(concrete_ids[0])
    } else {
        let aggregate_name = values.join(", ");
        upsert_vocab_row(conn, vocab_table, &aggregate_name, Some(true))
    }
}

/// Gets or creates a row in `artists`, `genres`, or `albums` by name
/// (case-insensitively unique). `aggregated` is only written on insert;
/// `albums` has no such column and passes `None`.
fn upsert_vocab_row(
    conn: &Connection,
    table: &str,
    name: &str,
    aggregated: Option<bool>,
) -> Result<i64, WriterError> {
    match aggregated {
        Some(flag) => {
            conn.execute(
                &format!(
                    "INSERT INTO {table} (name, aggregated) VALUES (?1, ?2)
                     ON CONFLICT(name) DO NOTHING"
                ),
                params![name, flag as i64],
            )?;
        }
        None => {
            conn.execute(
                &format!("INSERT INTO {table} (name) VALUES (?1) ON CONFLICT(name) DO NOTHING"),
                params![name],
            )?;
        }
    }
    let id = conn.query_row(
        &format!("SELECT id FROM {table} WHERE name = ?1 COLLATE NOCASE"),
        params![name],
        |r| r.get(0),
    )?;
    Ok(id)
}

fn insert_junction(
    conn: &Connection,
    table: &str,
    col: &str,
    track_id: i64,
    vocab_id: i64,
) -> Result<(), WriterError> {
    conn.execute(
        &format!("INSERT OR IGNORE INTO {table} (track_id, {col}) VALUES (?1, ?2)"),
        params![track_id, vocab_id],
    )?;
    Ok(())
}

fn upsert_thumbnail(conn: &Connection, dir: &Path, bytes: &[u8]) -> Result<i64, WriterError> {
    let filesize = bytes.len() as i64;
    let checksum = xxhash_rust::xxh3::xxh3_64(bytes) as i64;

    let existing: Option<i64> = conn
        .query_row(
            "SELECT id FROM thumbnails WHERE filesize = ?1 AND checksum = ?2",
            params![filesize, checksum],
            |r| r.get(0),
        )
        .optional()?;
    if let Some(id) = existing {
        return Ok(id);
    }

    conn.execute(
        "INSERT INTO thumbnails (filesize, checksum) VALUES (?1, ?2)",
        params![filesize, checksum],
    )?;
    let id = conn.last_insert_rowid();
    let final_path = dir.join(format!("{id}.jpg"));
    write_thumbnail_blob(dir, id, bytes).map_err(|source| WriterError::Io {
        path: final_path,
        source,
    })?;
    Ok(id)
}

/// Writes a thumbnail blob to `<dir>/<id>.jpg` via a temp-file-then-rename so
/// a crash mid-write can never leave a half-written blob at the final path.
fn write_thumbnail_blob(dir: &Path, id: i64, bytes: &[u8]) -> std::io::Result<()> {
    fs::create_dir_all(dir)?;
    let tmp_path = dir.join(format!("{id}.jpg.tmp"));
    let final_path = dir.join(format!("{id}.jpg"));
    fs::write(&tmp_path, bytes)?;
    fs::rename(&tmp_path, &final_path)?;
    Ok(())
}

fn upsert_meta_key(conn: &Connection, name: &str) -> Result<i64, WriterError> {
    conn.execute(
        "INSERT INTO meta_keys (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
        params![name],
    )?;
    let id = conn.query_row("SELECT id FROM meta_keys WHERE name = ?1", params![name], |r| {
        r.get(0)
    })?;
    Ok(id)
}

fn upsert_meta_value(conn: &Connection, meta_key_id: i64, content: &str) -> Result<i64, WriterError> {
    conn.execute(
        "INSERT INTO meta_values (meta_key_id, content) VALUES (?1, ?2)
         ON CONFLICT(meta_key_id, content) DO NOTHING",
        params![meta_key_id, content],
    )?;
    let id = conn.query_row(
        "SELECT id FROM meta_values WHERE meta_key_id = ?1 AND content = ?2",
        params![meta_key_id, content],
        |r| r.get(0),
    )?;
    Ok(id)
}

fn extension_of(filename: &str) -> String {
    PathBuf::from(filename)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TrackCore;

    fn test_store_with_folder() -> (Store, i64) {
        let mut store = Store::open_in_memory().unwrap();
        {
            let tx = store.transaction().unwrap();
            tx.connection()
                .execute("INSERT INTO paths (path) VALUES ('/music')", [])
                .unwrap();
            let path_id = tx.connection().last_insert_rowid();
            tx.connection()
                .execute(
                    "INSERT INTO folders (path_id, relative_path) VALUES (?1, '')",
                    params![path_id],
                )
                .unwrap();
            tx.commit().unwrap();
        }
        let folder_id = store
            .connection()
            .query_row("SELECT id FROM folders LIMIT 1", [], |r| r.get(0))
            .unwrap();
        (store, folder_id)
    }

    #[test]
    fn writes_core_fields_and_single_valued_vocab() {
        let (mut store, folder_id) = test_store_with_folder();
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::default();

        let core = TrackCore {
            title: Some("Song".into()),
            filename: Some("song.mp3".into()),
            artists: vec!["Artist".into()],
            genres: vec!["Rock".into()],
            album: Some("Album".into()),
            ..Default::default()
        };

        let track_id = write_track(
            &mut store,
            dir.path(),
            &config,
            WriteRequest {
                folder_id,
                source_id: 0,
                external_id: None,
                existing_track_id: None,
                core,
            },
            &|| false,
        )
        .unwrap();

        let (title, album_id): (String, i64) = store
            .connection()
            .query_row(
                "SELECT title, album_id FROM tracks WHERE id = ?1",
                params![track_id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(title, "Song");
        assert!(album_id > 0);

        let artist_aggregated: i64 = store
            .connection()
            .query_row("SELECT aggregated FROM artists WHERE name = 'Artist'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(artist_aggregated, 0);
    }

    #[test]
    fn multi_valued_artists_get_an_aggregate_visual_row() {
        let (mut store, folder_id) = test_store_with_folder();
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::default();

        let core = TrackCore {
            filename: Some("song.mp3".into()),
            artists: vec!["A".into(), "B".into()],
            ..Default::default()
        };

        let track_id = write_track(
            &mut store,
            dir.path(),
            &config,
            WriteRequest {
                folder_id,
                source_id: 0,
                external_id: None,
                existing_track_id: None,
                core,
            },
            &|| false,
        )
        .unwrap();

        let (visual_artist_id, name): (i64, String) = store
            .connection()
            .query_row(
                "SELECT a.id, a.name FROM tracks t
                 JOIN artists a ON a.id = t.visual_artist_id
                 WHERE t.id = ?1",
                params![track_id],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert_eq!(name, "A, B");

        let linked: i64 = store
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM track_artists WHERE track_id = ?1",
                params![track_id],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(linked, 2);
        assert!(visual_artist_id > 0);
    }

    #[test]
    fn empty_genre_set_falls_back_to_unknown_sentinel() {
        let (mut store, folder_id) = test_store_with_folder();
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::default();

        let core = TrackCore {
            filename: Some("song.mp3".into()),
            ..Default::default()
        };

        write_track(
            &mut store,
            dir.path(),
            &config,
            WriteRequest {
                folder_id,
                source_id: 0,
                external_id: None,
                existing_track_id: None,
                core,
            },
            &|| false,
        )
        .unwrap();

        let (name, aggregated): (String, i64) = store
            .connection()
            .query_row("SELECT name, aggregated FROM genres WHERE name = 'Unknown'", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!(name, "Unknown");
        assert_eq!(aggregated, 1);
    }

    #[test]
    fn re_writing_an_existing_track_replaces_its_artist_links() {
        let (mut store, folder_id) = test_store_with_folder();
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::default();

        let first = TrackCore {
            filename: Some("song.mp3".into()),
            artists: vec!["Old".into()],
            ..Default::default()
        };
        let track_id = write_track(
            &mut store,
            dir.path(),
            &config,
            WriteRequest {
                folder_id,
                source_id: 0,
                external_id: None,
                existing_track_id: None,
                core: first,
            },
            &|| false,
        )
        .unwrap();

        let second = TrackCore {
            filename: Some("song.mp3".into()),
            artists: vec!["New".into()],
            ..Default::default()
        };
        write_track(
            &mut store,
            dir.path(),
            &config,
            WriteRequest {
                folder_id,
                source_id: 0,
                external_id: None,
                existing_track_id: Some(track_id),
                core: second,
            },
            &|| false,
        )
        .unwrap();

        let count: i64 = store
            .connection()
            .query_row(
                "SELECT COUNT(*) FROM track_artists WHERE track_id = ?1",
                params![track_id],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);

        let name: String = store
            .connection()
            .query_row(
                "SELECT a.name FROM track_artists ta JOIN artists a ON a.id = ta.artist_id
                 WHERE ta.track_id = ?1",
                params![track_id],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(name, "New");
    }

    #[test]
    fn identical_thumbnail_bytes_dedupe_to_one_row() {
        let (mut store, folder_id) = test_store_with_folder();
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::default();
        let bytes = vec![1u8, 2, 3, 4];

        for filename in ["a.mp3", "b.mp3"] {
            let core = TrackCore {
                filename: Some(filename.into()),
                thumbnail: Some(bytes.clone()),
                ..Default::default()
            };
            write_track(
                &mut store,
                dir.path(),
                &config,
                WriteRequest {
                    folder_id,
                    source_id: 0,
                    external_id: None,
                    existing_track_id: None,
                    core,
                },
                &|| false,
            )
            .unwrap();
        }

        let count: i64 = store
            .connection()
            .query_row("SELECT COUNT(*) FROM thumbnails", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
        assert!(dir.path().join("1.jpg").exists());
    }

    #[test]
    fn interrupt_before_commit_rolls_back_the_whole_write() {
        let (mut store, folder_id) = test_store_with_folder();
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::default();

        let core = TrackCore {
            filename: Some("song.mp3".into()),
            artists: vec!["X".into()],
            ..Default::default()
        };

        let result = write_track(
            &mut store,
            dir.path(),
            &config,
            WriteRequest {
                folder_id,
                source_id: 0,
                external_id: None,
                existing_track_id: None,
                core,
            },
            &|| true,
        );
        assert!(matches!(result, Err(WriterError::Interrupted)));

        let count: i64 = store
            .connection()
            .query_row("SELECT COUNT(*) FROM tracks", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
