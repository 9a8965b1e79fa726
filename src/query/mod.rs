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

//! Parameterized read queries and playlist/play-queue mutations.
//!
//! Generalizes the existing dynamic-filter-list `search()` (build a `WHERE`
//! clause out of an accumulated `Vec<String>` of predicates and a matching
//! `Vec` of bound values) into the richer category/track-listing vocabulary,
//! while keeping its tie-break-to-id-for-determinism convention.

use std::hash::{Hash, Hasher};

use regex::Regex;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::error::QueryError;
use crate::model::{Category, CategoryItem, MatchMode, PlayQueueSnapshot, Playlist, TrackInfo};

const MIN_FILTER_LEN: usize = 1;

fn category_table(category: Category) -> Option<&'static str> {
    match category {
        Category::Artist => Some("artists"),
        Category::Genre => Some("genres"),
        Category::Album => Some("albums"),
        Category::AlbumArtist | Category::Playlists => None,
    }
}

/// Lists `(id, display_name)` rows for a browsing category, optionally
/// filtered to names containing `filter` (case-insensitive substring).
pub fn list_category(
    conn: &Connection,
    category: Category,
    filter: Option<&str>,
) -> Result<Vec<CategoryItem>, QueryError> {
    match category {
        Category::Playlists => list_playlists_as_category(conn, filter),
        Category::AlbumArtist => list_album_artists(conn, filter),
        _ => {
            let table = category_table(category).expect("handled above");
            let mut sql = format!("SELECT id, name FROM {table}");
            let mut clauses = Vec::new();
            let mut bound = Vec::new();
            if let Some(f) = filter.filter(|f| f.len() >= MIN_FILTER_LEN) {
                clauses.push("name LIKE ?".to_string());
                bound.push(format!("%{f}%"));
            }
            if !clauses.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&clauses.join(" AND "));
            }
            sql.push_str(" ORDER BY name COLLATE NOCASE, id");

            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(bound), |r| {
                    Ok(CategoryItem {
                        id: r.get(0)?,
                        name: r.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        }
    }
}

fn list_playlists_as_category(
    conn: &Connection,
    filter: Option<&str>,
) -> Result<Vec<CategoryItem>, QueryError> {
    let mut sql = "SELECT id, name FROM playlists".to_string();
    let mut bound = Vec::new();
    if let Some(f) = filter.filter(|f| f.len() >= MIN_FILTER_LEN) {
        sql.push_str(" WHERE name LIKE ?");
        bound.push(format!("%{f}%"));
    }
    sql.push_str(" ORDER BY name COLLATE NOCASE, id");
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(bound), |r| {
            Ok(CategoryItem {
                id: r.get(0)?,
                name: r.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Album-artist browsing has no dedicated column in the schema; album-artist
/// tag values are captured as free-form metadata, so this dimension is
/// implemented as a distinct listing over `meta_values` under the
/// `album_artist` meta key.
fn list_album_artists(conn: &Connection, filter: Option<&str>) -> Result<Vec<CategoryItem>, QueryError> {
    let mut sql = "
        SELECT mv.id, mv.content FROM meta_values mv
        JOIN meta_keys mk ON mk.id = mv.meta_key_id
        WHERE mk.name = 'album_artist'"
        .to_string();
    let mut bound = Vec::new();
    if let Some(f) = filter.filter(|f| f.len() >= MIN_FILTER_LEN) {
        sql.push_str(" AND mv.content LIKE ?");
        bound.push(format!("%{f}%"));
    }
    sql.push_str(" ORDER BY mv.content COLLATE NOCASE, mv.id");
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(bound), |r| {
            Ok(CategoryItem {
                id: r.get(0)?,
                name: r.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// A single `(category, id)` predicate used to AND-combine track listing
/// filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CategoryPredicate {
    pub category: Category,
    pub id: i64,
}

/// The set of ways the track listing can be filtered. `query_hash()` lets a
/// cache recognize a repeated query without re-running it.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackFilter {
    All,
    ByCategory(CategoryPredicate),
    ByCategories(Vec<CategoryPredicate>),
    FreeText { text: String, mode: MatchMode },
    ByExternalIds(Vec<String>),
}

impl TrackFilter {
    pub fn query_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        match self {
            TrackFilter::All => 0u8.hash(&mut hasher),
            TrackFilter::ByCategory(p) => {
                1u8.hash(&mut hasher);
                p.hash(&mut hasher);
            }
            TrackFilter::ByCategories(ps) => {
                2u8.hash(&mut hasher);
                ps.hash(&mut hasher);
            }
            TrackFilter::FreeText { text, mode } => {
                3u8.hash(&mut hasher);
                text.hash(&mut hasher);
                (*mode as u8).hash(&mut hasher);
            }
            TrackFilter::ByExternalIds(ids) => {
                4u8.hash(&mut hasher);
                ids.hash(&mut hasher);
            }
        }
        hasher.finish()
    }
}

const TRACK_INFO_SELECT: &str = "
    SELECT t.id, t.external_id, t.title, t.track, t.disc, t.duration, t.year,
           al.name, ar.name, g.name, t.filename
    FROM tracks t
    JOIN albums al ON al.id = t.album_id
    JOIN artists ar ON ar.id = t.visual_artist_id
    JOIN genres g ON g.id = t.visual_genre_id
";

const TRACK_INFO_ORDER: &str = " ORDER BY ar.name COLLATE NOCASE, al.name COLLATE NOCASE, t.track, t.id";

fn row_to_track_info(r: &rusqlite::Row<'_>) -> rusqlite::Result<TrackInfo> {
    Ok(TrackInfo {
        track_id: r.get(0)?,
        external_id: r.get(1)?,
        title: r.get(2)?,
        track_number: r.get(3)?,
        disc_number: r.get(4)?,
        duration: r.get(5)?,
        year: r.get(6)?,
        album_name: r.get(7)?,
        artist_name: r.get(8)?,
        genre_name: r.get(9)?,
        filename: r.get(10)?,
    })
}

/// Lists tracks matching `filter`, always tie-broken by internal id.
pub fn list_tracks(conn: &Connection, filter: &TrackFilter) -> Result<Vec<TrackInfo>, QueryError> {
    match filter {
        TrackFilter::All => {
            let sql = format!("{TRACK_INFO_SELECT}{TRACK_INFO_ORDER}");
            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt
                .query_map([], row_to_track_info)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        }
        TrackFilter::ByCategory(predicate) => list_by_categories(conn, std::slice::from_ref(predicate)),
        TrackFilter::ByCategories(predicates) => list_by_categories(conn, predicates),
        TrackFilter::FreeText { text, mode } => list_by_free_text(conn, text, *mode),
        TrackFilter::ByExternalIds(ids) => list_by_external_ids(conn, ids),
    }
}

fn predicate_clause(predicate: &CategoryPredicate, index: usize) -> Result<(String, i64), QueryError> {
    let alias = format!("p{index}");
    let clause = match predicate.category {
        Category::Artist => format!(
            "t.id IN (SELECT track_id FROM track_artists WHERE artist_id = :{alias})"
        ),
        Category::Genre => format!(
            "t.id IN (SELECT track_id FROM track_genres WHERE genre_id = :{alias})"
        ),
        Category::Album => format!("t.album_id = :{alias}"),
        Category::AlbumArtist => format!(
            "t.id IN (SELECT tm.track_id FROM track_meta tm WHERE tm.meta_value_id = :{alias})"
        ),
        Category::Playlists => {
            return Err(QueryError::Conflict(
                "playlists is not a track-listing predicate category".into(),
            ))
        }
    };
    Ok((clause, predicate.id))
}

fn list_by_categories(conn: &Connection, predicates: &[CategoryPredicate]) -> Result<Vec<TrackInfo>, QueryError> {
    if predicates.is_empty() {
        return list_tracks(conn, &TrackFilter::All);
    }

    let mut clauses = Vec::new();
    let mut named_params: Vec<(String, i64)> = Vec::new();
    for (i, predicate) in predicates.iter().enumerate() {
        let (clause, value) = predicate_clause(predicate, i)?;
        named_params.push((format!(":p{i}"), value));
        clauses.push(clause);
    }

    let sql = format!(
        "{TRACK_INFO_SELECT} WHERE {}{TRACK_INFO_ORDER}",
        clauses.join(" AND ")
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let bound: Vec<(&str, &dyn rusqlite::ToSql)> = named_params
        .iter()
        .map(|(name, value)| (name.as_str(), value as &dyn rusqlite::ToSql))
        .collect();
    let rows = stmt
        .query_map(bound.as_slice(), row_to_track_info)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn list_by_free_text(conn: &Connection, text: &str, mode: MatchMode) -> Result<Vec<TrackInfo>, QueryError> {
    let sql = format!("{TRACK_INFO_SELECT}{TRACK_INFO_ORDER}");
    let mut stmt = conn.prepare_cached(&sql)?;
    let candidates = stmt
        .query_map([], row_to_track_info)?
        .collect::<Result<Vec<_>, _>>()?;

    match mode {
        MatchMode::Substring => {
            let needle = text.to_ascii_lowercase();
            Ok(candidates
                .into_iter()
                .filter(|t| display_string(t).to_ascii_lowercase().contains(&needle))
                .collect())
        }
        MatchMode::Regex => {
            let re = Regex::new(text).map_err(|e| QueryError::Conflict(format!("bad regex: {e}")))?;
            Ok(candidates
                .into_iter()
                .filter(|t| re.is_match(&display_string(t)))
                .collect())
        }
    }
}

fn display_string(track: &TrackInfo) -> String {
    format!("{} {} {}", track.artist_name, track.album_name, track.title)
}

fn list_by_external_ids(conn: &Connection, ids: &[String]) -> Result<Vec<TrackInfo>, QueryError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
    let sql = format!("{TRACK_INFO_SELECT} WHERE t.external_id IN ({placeholders}){TRACK_INFO_ORDER}");
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(ids.iter()), row_to_track_info)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// --- Playlist CRUD ---------------------------------------------------------

pub fn create_playlist(conn: &Connection, name: &str) -> Result<i64, QueryError> {
    conn.execute("INSERT INTO playlists (name) VALUES (?1)", params![name])
        .map_err(|e| match e {
            rusqlite::Error::SqliteFailure(err, _) if err.code == rusqlite::ErrorCode::ConstraintViolation => {
                QueryError::Conflict(format!("playlist named {name:?} already exists"))
            }
            other => QueryError::Sql(other),
        })?;
    Ok(conn.last_insert_rowid())
}

pub fn rename_playlist(conn: &Connection, playlist_id: i64, new_name: &str) -> Result<(), QueryError> {
    let changed = conn.execute(
        "UPDATE playlists SET name = ?1 WHERE id = ?2",
        params![new_name, playlist_id],
    )?;
    if changed == 0 {
        return Err(QueryError::NotFound {
            what: format!("playlist {playlist_id}"),
        });
    }
    Ok(())
}

pub fn delete_playlist(conn: &Connection, playlist_id: i64) -> Result<(), QueryError> {
    conn.execute("DELETE FROM playlists WHERE id = ?1", params![playlist_id])?;
    Ok(())
}

pub fn get_playlist(conn: &Connection, playlist_id: i64) -> Result<Playlist, QueryError> {
    conn.query_row(
        "SELECT id, name FROM playlists WHERE id = ?1",
        params![playlist_id],
        |r| {
            Ok(Playlist {
                id: r.get(0)?,
                name: r.get(1)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| QueryError::NotFound {
        what: format!("playlist {playlist_id}"),
    })
}

/// Appends `track_ids` to the end of `playlist_id`, continuing its existing
/// sort order.
pub fn append_to_playlist(conn: &Connection, playlist_id: i64, track_ids: &[i64]) -> Result<(), QueryError> {
    let next: i64 = conn.query_row(
        "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM playlist_tracks WHERE playlist_id = ?1",
        params![playlist_id],
        |r| r.get(0),
    )?;
    let mut stmt = conn.prepare_cached(
        "INSERT INTO playlist_tracks (playlist_id, track_id, sort_order) VALUES (?1, ?2, ?3)",
    )?;
    for (offset, track_id) in track_ids.iter().enumerate() {
        stmt.execute(params![playlist_id, track_id, next + offset as i64])?;
    }
    Ok(())
}

/// Appends tracks to `playlist_id` by resolving `external_ids` against the
/// library first.
pub fn append_to_playlist_by_external_ids(
    conn: &Connection,
    playlist_id: i64,
    external_ids: &[String],
) -> Result<(), QueryError> {
    let resolved = list_by_external_ids(conn, external_ids)?;
    let track_ids: Vec<i64> = resolved.into_iter().map(|t| t.track_id).collect();
    append_to_playlist(conn, playlist_id, &track_ids)
}

/// Removes `count` entries from `playlist_id` starting at `start_sort_order`,
/// then compacts the remaining sort order to stay contiguous.
pub fn remove_from_playlist(
    conn: &Connection,
    playlist_id: i64,
    start_sort_order: i64,
    count: i64,
) -> Result<(), QueryError> {
    conn.execute(
        "DELETE FROM playlist_tracks WHERE playlist_id = ?1 AND sort_order >= ?2 AND sort_order < ?3",
        params![playlist_id, start_sort_order, start_sort_order + count],
    )?;
    conn.execute(
        "UPDATE playlist_tracks SET sort_order = sort_order - ?1
         WHERE playlist_id = ?2 AND sort_order >= ?3",
        params![count, playlist_id, start_sort_order + count],
    )?;
    Ok(())
}

/// Atomically overwrites `playlist_id`'s contents with `track_ids`.
pub fn replace_playlist_contents(
    conn: &Connection,
    playlist_id: i64,
    track_ids: &[i64],
) -> Result<(), QueryError> {
    conn.execute("DELETE FROM playlist_tracks WHERE playlist_id = ?1", params![playlist_id])?;
    append_to_playlist(conn, playlist_id, track_ids)
}

// --- Play queue -------------------------------------------------------------

const LAST_PLAY_QUEUE_INDEX_KEY: &str = "LastPlayQueueIndex";
const LAST_PLAY_QUEUE_TIME_KEY: &str = "LastPlayQueueTime";

fn set_preference(conn: &Connection, key: &str, value: &str) -> Result<(), QueryError> {
    conn.execute(
        "INSERT INTO preferences (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = ?2",
        params![key, value],
    )?;
    Ok(())
}

fn get_preference(conn: &Connection, key: &str) -> Result<Option<String>, QueryError> {
    conn.query_row("SELECT value FROM preferences WHERE key = ?1", params![key], |r| r.get(0))
        .optional()
        .map_err(QueryError::Sql)
}

/// Loads the ordered set of persisted play-queue track ids.
pub fn load_play_queue_track_ids(conn: &Connection) -> Result<Vec<i64>, QueryError> {
    let mut stmt = conn.prepare_cached("SELECT track_id FROM play_queue ORDER BY sort_order, id")?;
    let ids = stmt
        .query_map([], |r| r.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

/// Loads the full persisted play-queue snapshot: track ids from `play_queue`,
/// active index and playback offset from `preferences` under the
/// `LastPlayQueueIndex`/`LastPlayQueueTime` keys.
pub fn load_play_queue(conn: &Connection) -> Result<PlayQueueSnapshot, QueryError> {
    let track_ids = load_play_queue_track_ids(conn)?;
    let active_index = get_preference(conn, LAST_PLAY_QUEUE_INDEX_KEY)?
        .and_then(|v| v.parse::<i32>().ok())
        .filter(|i| *i >= 0);
    let offset_seconds = get_preference(conn, LAST_PLAY_QUEUE_TIME_KEY)?
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(0.0);
    Ok(PlayQueueSnapshot {
        track_ids,
        active_index,
        offset_seconds,
    })
}

/// Overwrites the persisted play queue with `snapshot`'s track ids, active
/// index, and playback offset.
pub fn save_play_queue(conn: &Connection, snapshot: &PlayQueueSnapshot) -> Result<(), QueryError> {
    conn.execute("DELETE FROM play_queue", [])?;
    let mut stmt =
        conn.prepare_cached("INSERT INTO play_queue (track_id, sort_order) VALUES (?1, ?2)")?;
    for (i, track_id) in snapshot.track_ids.iter().enumerate() {
        stmt.execute(params![track_id, i as i64])?;
    }
    drop(stmt);

    set_preference(
        conn,
        LAST_PLAY_QUEUE_INDEX_KEY,
        &snapshot.active_index.unwrap_or(-1).to_string(),
    )?;
    set_preference(conn, LAST_PLAY_QUEUE_TIME_KEY, &snapshot.offset_seconds.to_string())?;
    Ok(())
}

// --- Track stats -------------------------------------------------------------

/// A durable identity for a track's play-count/rating bookkeeping, stable
/// across the track's internal id changing (e.g. a rescan deleting and
/// recreating its row). Computed from the fields most likely to identify the
/// "same song" across such churn, not stored on the track row itself.
pub fn durable_id_for(artist_name: &str, album_name: &str, track_number: Option<i64>, title: &str) -> i64 {
    let key = format!(
        "{artist_name}|{album_name}|{}|{title}",
        track_number.unwrap_or_default()
    );
    xxhash_rust::xxh3::xxh3_64(key.as_bytes()) as i64
}

/// The `(play_count, rating)` recorded for `durable_id`, or `(0, 0)` if it
/// has never been played or rated.
pub fn track_stats(conn: &Connection, durable_id: i64) -> Result<(i64, i64), QueryError> {
    conn.query_row(
        "SELECT play_count, rating FROM track_stats WHERE durable_id = ?1",
        params![durable_id],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )
    .optional()
    .map(|row| row.unwrap_or((0, 0)))
    .map_err(QueryError::Sql)
}

pub fn increment_play_count(conn: &Connection, durable_id: i64) -> Result<(), QueryError> {
    conn.execute(
        "INSERT INTO track_stats (durable_id, play_count) VALUES (?1, 1)
         ON CONFLICT (durable_id) DO UPDATE SET play_count = play_count + 1",
        params![durable_id],
    )?;
    Ok(())
}

pub fn update_rating(conn: &Connection, durable_id: i64, rating: i64) -> Result<(), QueryError> {
    conn.execute(
        "INSERT INTO track_stats (durable_id, rating) VALUES (?1, ?2)
         ON CONFLICT (durable_id) DO UPDATE SET rating = ?2",
        params![durable_id, rating],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use crate::writer::{write_track, WriteRequest};
    use crate::config::EngineConfig;
    use crate::model::TrackCore;

    fn seeded_store() -> Store {
        let mut store = Store::open_in_memory().unwrap();
        let config = EngineConfig::default();
        let dir = tempfile::tempdir().unwrap();
        {
            let tx = store.transaction().unwrap();
            tx.connection()
                .execute("INSERT INTO paths (path) VALUES ('/m')", [])
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
        let folder_id: i64 = store
            .connection()
            .query_row("SELECT id FROM folders LIMIT 1", [], |r| r.get(0))
            .unwrap();

        for (filename, title, artist, album, genre) in [
            ("a.mp3", "Song A", "Alice", "Album One", "Rock"),
            ("b.mp3", "Song B", "Bob", "Album Two", "Jazz"),
        ] {
            let core = TrackCore {
                title: Some(title.into()),
                filename: Some(filename.into()),
                artists: vec![artist.into()],
                genres: vec![genre.into()],
                album: Some(album.into()),
                ..Default::default()
            };
            write_track(
                &mut store,
                dir.path(),
                &config,
                WriteRequest {
                    folder_id,
                    source_id: 0,
                    external_id: Some(format!("fs://0/{filename}")),
                    existing_track_id: None,
                    core,
                },
                &|| false,
            )
            .unwrap();
        }
        store
    }

    #[test]
    fn category_listing_orders_by_name_and_filters() {
        let store = seeded_store();
        let all = list_category(store.connection(), Category::Artist, None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "Alice");

        let filtered = list_category(store.connection(), Category::Artist, Some("bo")).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "Bob");
    }

    #[test]
    fn list_all_tracks_ties_to_internal_id() {
        let store = seeded_store();
        let tracks = list_tracks(store.connection(), &TrackFilter::All).unwrap();
        assert_eq!(tracks.len(), 2);
    }

    #[test]
    fn list_by_category_filters_to_matching_artist() {
        let store = seeded_store();
        let artist_id: i64 = store
            .connection()
            .query_row("SELECT id FROM artists WHERE name = 'Alice'", [], |r| r.get(0))
            .unwrap();
        let tracks = list_tracks(
            store.connection(),
            &TrackFilter::ByCategory(CategoryPredicate {
                category: Category::Artist,
                id: artist_id,
            }),
        )
        .unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].title, "Song A");
    }

    #[test]
    fn free_text_substring_is_case_insensitive() {
        let store = seeded_store();
        let tracks = list_tracks(
            store.connection(),
            &TrackFilter::FreeText {
                text: "song b".into(),
                mode: MatchMode::Substring,
            },
        )
        .unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].title, "Song B");
    }

    #[test]
    fn by_external_ids_resolves_in_library_order_not_input_order() {
        let store = seeded_store();
        let tracks = list_by_external_ids(
            store.connection(),
            &["fs://0/b.mp3".to_string(), "fs://0/a.mp3".to_string()],
        )
        .unwrap();
        assert_eq!(tracks.len(), 2);
    }

    #[test]
    fn playlist_round_trip_create_append_remove() {
        let store = seeded_store();
        let conn = store.connection();
        let playlist_id = create_playlist(conn, "Favorites").unwrap();

        let track_ids: Vec<i64> = conn
            .prepare("SELECT id FROM tracks ORDER BY id")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        append_to_playlist(conn, playlist_id, &track_ids).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM playlist_tracks WHERE playlist_id = ?1",
                params![playlist_id],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(count, 2);

        remove_from_playlist(conn, playlist_id, 0, 1).unwrap();
        let remaining: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM playlist_tracks WHERE playlist_id = ?1",
                params![playlist_id],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(remaining, 1);
    }

    #[test]
    fn duplicate_playlist_name_is_a_conflict_not_a_panic() {
        let store = seeded_store();
        let conn = store.connection();
        create_playlist(conn, "Dup").unwrap();
        let result = create_playlist(conn, "Dup");
        assert!(matches!(result, Err(QueryError::Conflict(_))));
    }

    #[test]
    fn play_queue_save_then_load_round_trips_order() {
        let store = seeded_store();
        let conn = store.connection();
        let track_ids: Vec<i64> = conn
            .prepare("SELECT id FROM tracks ORDER BY id DESC")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        save_play_queue(
            conn,
            &PlayQueueSnapshot {
                track_ids: track_ids.clone(),
                active_index: Some(0),
                offset_seconds: 12.5,
            },
        )
        .unwrap();

        let loaded = load_play_queue_track_ids(conn).unwrap();
        assert_eq!(loaded, track_ids);
    }

    #[test]
    fn play_queue_save_then_load_round_trips_index_and_offset() {
        let store = seeded_store();
        let conn = store.connection();
        let track_ids: Vec<i64> = conn
            .prepare("SELECT id FROM tracks ORDER BY id")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        save_play_queue(
            conn,
            &PlayQueueSnapshot {
                track_ids: track_ids.clone(),
                active_index: Some(1),
                offset_seconds: 42.25,
            },
        )
        .unwrap();

        let snapshot = load_play_queue(conn).unwrap();
        assert_eq!(snapshot.track_ids, track_ids);
        assert_eq!(snapshot.active_index, Some(1));
        assert_eq!(snapshot.offset_seconds, 42.25);
    }

    #[test]
    fn play_queue_with_no_active_index_loads_as_none() {
        let store = seeded_store();
        let conn = store.connection();

        save_play_queue(
            conn,
            &PlayQueueSnapshot {
                track_ids: vec![],
                active_index: None,
                offset_seconds: 0.0,
            },
        )
        .unwrap();

        let snapshot = load_play_queue(conn).unwrap();
        assert_eq!(snapshot.active_index, None);
        assert!(snapshot.track_ids.is_empty());
    }

    #[test]
    fn durable_id_is_stable_across_different_internal_ids() {
        let id_a = durable_id_for("X", "Y", Some(3), "Song");
        let id_b = durable_id_for("X", "Y", Some(3), "Song");
        assert_eq!(id_a, id_b);

        let id_c = durable_id_for("X", "Y", Some(4), "Song");
        assert_ne!(id_a, id_c);
    }

    #[test]
    fn play_count_and_rating_upsert_into_track_stats() {
        let store = seeded_store();
        let conn = store.connection();
        let durable_id = durable_id_for("X", "Album", Some(1), "Title");

        assert_eq!(track_stats(conn, durable_id).unwrap(), (0, 0));

        increment_play_count(conn, durable_id).unwrap();
        increment_play_count(conn, durable_id).unwrap();
        update_rating(conn, durable_id, 4).unwrap();

        assert_eq!(track_stats(conn, durable_id).unwrap(), (2, 4));
    }
}
