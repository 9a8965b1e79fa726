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

//! Domain models and core data structures.
//!
//! This module defines the central entities of the library engine: tracks,
//! the normalized vocabulary rows (artists, albums, genres), thumbnails,
//! free-form metadata, and the playlist/play-queue shapes used by the query
//! layer and track list.

pub mod tagbag;

pub use tagbag::{TagBag, TrackCore};

/// A normalized vocabulary row shared by artists and genres: a unique name,
/// plus a flag marking it as a synthetic "aggregate" row used for display
/// when a track has more than one value for the field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VocabRow {
    pub id: i64,
    pub name: String,
    pub aggregated: bool,
}

pub type Artist = VocabRow;
pub type Genre = VocabRow;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Album {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub id: i64,
    pub filesize: i64,
    pub checksum: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRow {
    pub id: i64,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    pub id: i64,
    pub path_id: i64,
    pub relative_path: String,
}

/// A normalized free-form tag key, e.g. `"comment"` or `"isrc"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaKey {
    pub id: i64,
    pub name: String,
}

/// A value recorded under a [`MetaKey`]; tracks may share the same
/// `(meta_key_id, content)` pair, in which case they share a `MetaValue` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaValue {
    pub id: i64,
    pub meta_key_id: i64,
    pub content: String,
}

/// The canonical track row as stored in the relational schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: i64,
    pub external_id: Option<String>,
    pub source_id: i32,

    pub title: String,
    pub track_number: Option<i64>,
    pub disc_number: Option<i64>,
    pub duration: i64,
    pub filesize: i64,
    pub year: Option<i64>,
    pub bpm: Option<f64>,
    pub filename: String,
    pub filetime: i64,
    pub sort_order: i64,

    pub folder_id: i64,
    pub album_id: Option<i64>,
    pub visual_artist_id: Option<i64>,
    pub visual_genre_id: Option<i64>,
    pub thumbnail_id: Option<i64>,
}

/// A denormalized, display-ready view of a track joined against its vocabulary
/// rows; this is the shape returned by the query layer and hydrated into
/// [`crate::tracklist::TrackList`] handles.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub track_id: i64,
    pub external_id: Option<String>,
    pub title: String,
    pub track_number: Option<i64>,
    pub disc_number: Option<i64>,
    pub duration: i64,
    pub year: Option<i64>,
    pub album_name: String,
    pub artist_name: String,
    pub genre_name: String,
    pub filename: String,
}

/// The categorical dimensions the query layer can browse by. `Playlists`
/// browses the set of user playlists rather than a vocabulary table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Artist,
    Album,
    Genre,
    AlbumArtist,
    Playlists,
}

/// A `(id, display_name)` row as returned by a category listing query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryItem {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playlist {
    pub id: i64,
    pub name: String,
}

/// One entry in a playlist or the play queue: a track reference plus its
/// position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub track_id: i64,
    pub sort_order: i64,
}

/// The persisted play-queue snapshot: ordered track ids, the active index
/// within that order, and the playback offset at the time it was saved.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlayQueueSnapshot {
    pub track_ids: Vec<i64>,
    pub active_index: Option<i32>,
    pub offset_seconds: f64,
}

/// Free-text match mode used by track-listing filter queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Substring,
    Regex,
}
