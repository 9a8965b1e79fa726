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

//! The flat, multi-valued tag bag produced by a reader, and the typed
//! `TrackCore` view the Writer normalizes it into.
//!
//! Readers emit into a [`TagBag`]: a multimap of lowercase ASCII keys to
//! insertion-ordered string values, plus an optional thumbnail blob. The
//! Writer never deals with the multimap directly; [`TrackCore::extract`]
//! peels off the keys consumed by the normalized schema (title, track, disc,
//! bpm, duration, year, filename, filetime, filesize, path, extension, genre,
//! artist, album) and leaves everything else in `extra`, destined for
//! `meta_keys`/`meta_values`/`track_meta`.

use std::collections::HashMap;

/// Keys consumed by the core normalizer; anything else in a [`TagBag`] lands
/// in free-form track metadata.
const CONSUMED_KEYS: &[&str] = &[
    "track",
    "disc",
    "bpm",
    "duration",
    "year",
    "title",
    "filename",
    "filetime",
    "filesize",
    "path",
    "extension",
    "genre",
    "artist",
    "album",
];

/// An insertion-ordered multimap of lowercase ASCII keys to UTF-8 values,
/// plus an optional thumbnail blob. This is the sink a [`crate::tags::TagReader`]
/// fills in for one file.
#[derive(Debug, Clone, Default)]
pub struct TagBag {
    entries: Vec<(String, String)>,
    thumbnail: Option<Vec<u8>>,
}

impl TagBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a value for `key`, preserving insertion order for
    /// multi-valued keys such as `artist` and `genre`.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.entries.push((key.to_ascii_lowercase(), value.into()));
    }

    pub fn set_thumbnail(&mut self, bytes: Vec<u8>) {
        self.thumbnail = Some(bytes);
    }

    pub fn thumbnail(&self) -> Option<&[u8]> {
        self.thumbnail.as_deref()
    }

    /// All values recorded for `key`, in insertion order.
    pub fn values(&self, key: &str) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The first value recorded for `key`, if any.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.values(key).next()
    }

    /// Keys present in the bag that are not consumed by the core schema,
    /// each mapped to its insertion-ordered values.
    pub fn extra_keys(&self) -> HashMap<String, Vec<String>> {
        let mut extra: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in &self.entries {
            if CONSUMED_KEYS.contains(&key.as_str()) {
                continue;
            }
            extra.entry(key.clone()).or_default().push(value.clone());
        }
        extra
    }
}

/// The typed fields consumed directly by the normalized schema, extracted
/// from a [`TagBag`]. Numeric fields keep the raw string alongside the parsed
/// value so the Writer can store the original text when parsing fails (e.g.
/// `track="A/B"`).
#[derive(Debug, Clone, Default)]
pub struct TrackCore {
    pub title: Option<String>,
    pub track_number: Option<i64>,
    pub disc_number: Option<i64>,
    pub bpm: Option<f64>,
    pub duration: Option<i64>,
    pub year: Option<i64>,
    pub filename: Option<String>,
    pub filetime: Option<i64>,
    pub filesize: Option<i64>,

    /// Deduped, first-seen-order artist names.
    pub artists: Vec<String>,
    /// Deduped, first-seen-order genre names.
    pub genres: Vec<String>,
    pub album: Option<String>,

    pub thumbnail: Option<Vec<u8>>,

    /// Free-form tags not consumed by the core schema.
    pub extra: HashMap<String, Vec<String>>,
}

impl TrackCore {
    /// Builds a [`TrackCore`] from a tag bag, deduping multi-valued fields
    /// while preserving first-seen order.
    pub fn extract(bag: &TagBag) -> Self {
        Self {
            title: bag.first("title").map(str::to_string),
            track_number: bag.first("track").and_then(|s| s.parse().ok()),
            disc_number: bag.first("disc").and_then(|s| s.parse().ok()),
            bpm: bag.first("bpm").and_then(|s| s.parse().ok()),
            duration: bag.first("duration").and_then(|s| s.parse().ok()),
            year: bag.first("year").and_then(|s| s.parse().ok()),
            filename: bag.first("filename").map(str::to_string),
            filetime: bag.first("filetime").and_then(|s| s.parse().ok()),
            filesize: bag.first("filesize").and_then(|s| s.parse().ok()),
            artists: dedupe_preserve_order(bag.values("artist")),
            genres: dedupe_preserve_order(bag.values("genre")),
            album: bag.first("album").map(str::to_string),
            thumbnail: bag.thumbnail().map(|b| b.to_vec()),
            extra: bag.extra_keys(),
        }
    }
}

fn dedupe_preserve_order<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for v in values {
        if seen.insert(v.to_string()) {
            out.push(v.to_string());
        }
    }
    out
}
