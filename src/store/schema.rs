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

//! Schema version and DDL for the library database.
//!
//! Column names are kept bit-exact against the external schema contract so
//! that any external tooling reading `musik.db` directly keeps working.

pub const SCHEMA_VERSION: i64 = 1;

pub const CREATE_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS paths (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        path TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS folders (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        path_id INTEGER NOT NULL,
        relative_path TEXT NOT NULL,
        UNIQUE (path_id, relative_path),
        FOREIGN KEY (path_id) REFERENCES paths (id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS artists (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL COLLATE NOCASE UNIQUE,
        aggregated INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS genres (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL COLLATE NOCASE UNIQUE,
        aggregated INTEGER NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS albums (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL COLLATE NOCASE UNIQUE
    );

    CREATE TABLE IF NOT EXISTS thumbnails (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        filesize INTEGER NOT NULL,
        checksum INTEGER NOT NULL,
        UNIQUE (filesize, checksum)
    );

    CREATE TABLE IF NOT EXISTS tracks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        track INTEGER,
        disc INTEGER,
        bpm REAL,
        duration INTEGER NOT NULL DEFAULT 0,
        filesize INTEGER NOT NULL DEFAULT 0,
        year INTEGER,
        folder_id INTEGER NOT NULL,
        title TEXT NOT NULL COLLATE NOCASE,
        filename TEXT NOT NULL,
        filetime INTEGER NOT NULL DEFAULT 0,
        sort_order1 INTEGER NOT NULL DEFAULT 0,
        album_id INTEGER,
        visual_genre_id INTEGER,
        visual_artist_id INTEGER,
        thumbnail_id INTEGER,
        source_id INTEGER NOT NULL DEFAULT 0,
        external_id TEXT,
        UNIQUE (folder_id, filename),
        FOREIGN KEY (folder_id) REFERENCES folders (id) ON DELETE CASCADE,
        FOREIGN KEY (album_id) REFERENCES albums (id),
        FOREIGN KEY (visual_genre_id) REFERENCES genres (id),
        FOREIGN KEY (visual_artist_id) REFERENCES artists (id),
        FOREIGN KEY (thumbnail_id) REFERENCES thumbnails (id)
    );

    CREATE UNIQUE INDEX IF NOT EXISTS idx_tracks_external_id ON tracks (external_id)
        WHERE external_id IS NOT NULL;
    CREATE INDEX IF NOT EXISTS idx_tracks_folder_id ON tracks (folder_id);
    CREATE INDEX IF NOT EXISTS idx_tracks_album_id ON tracks (album_id);

    CREATE TABLE IF NOT EXISTS track_artists (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        track_id INTEGER NOT NULL,
        artist_id INTEGER NOT NULL,
        UNIQUE (track_id, artist_id),
        FOREIGN KEY (track_id) REFERENCES tracks (id) ON DELETE CASCADE,
        FOREIGN KEY (artist_id) REFERENCES artists (id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS track_genres (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        track_id INTEGER NOT NULL,
        genre_id INTEGER NOT NULL,
        UNIQUE (track_id, genre_id),
        FOREIGN KEY (track_id) REFERENCES tracks (id) ON DELETE CASCADE,
        FOREIGN KEY (genre_id) REFERENCES genres (id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS meta_keys (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS meta_values (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        meta_key_id INTEGER NOT NULL,
        content TEXT NOT NULL,
        UNIQUE (meta_key_id, content),
        FOREIGN KEY (meta_key_id) REFERENCES meta_keys (id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS track_meta (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        track_id INTEGER NOT NULL,
        meta_value_id INTEGER NOT NULL,
        UNIQUE (track_id, meta_value_id),
        FOREIGN KEY (track_id) REFERENCES tracks (id) ON DELETE CASCADE,
        FOREIGN KEY (meta_value_id) REFERENCES meta_values (id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS playlists (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS playlist_tracks (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        playlist_id INTEGER NOT NULL,
        track_id INTEGER NOT NULL,
        sort_order INTEGER NOT NULL,
        FOREIGN KEY (playlist_id) REFERENCES playlists (id) ON DELETE CASCADE,
        FOREIGN KEY (track_id) REFERENCES tracks (id) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_playlist_tracks_playlist_id ON playlist_tracks (playlist_id);

    CREATE TABLE IF NOT EXISTS play_queue (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        track_id INTEGER NOT NULL,
        sort_order INTEGER NOT NULL,
        FOREIGN KEY (track_id) REFERENCES tracks (id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS preferences (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS track_stats (
        durable_id INTEGER PRIMARY KEY,
        play_count INTEGER NOT NULL DEFAULT 0,
        rating INTEGER NOT NULL DEFAULT 0
    );
";
