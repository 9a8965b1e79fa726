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

//! Format-agnostic tag reader backed by `lofty`.
//!
//! Generalizes the MP3-specific tag extraction the indexer used to do
//! in-line (title/album/artist/album_artist/genre/year/track/duration/
//! thumbnail) to every container `lofty` can probe, via `ParsingMode::Relaxed`
//! so malformed-but-recoverable tags don't abort the read.

use std::path::Path;

use lofty::config::{ParseOptions, ParsingMode};
use lofty::prelude::*;
use lofty::probe::Probe;
use lofty::tag::ItemKey;

use crate::tags::{TagReader, TrackWriterSink};

const EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "m4a", "wav", "opus"];

pub struct LoftyReader;

impl LoftyReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LoftyReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TagReader for LoftyReader {
    fn can_read(&self, extension: &str) -> bool {
        EXTENSIONS.contains(&extension)
    }

    fn read(&self, path: &Path, sink: &mut dyn TrackWriterSink) -> bool {
        let options = ParseOptions::new().parsing_mode(ParsingMode::Relaxed);

        let tagged_file = match Probe::open(path).and_then(|p| p.options(options).read()) {
            Ok(f) => f,
            Err(_) => return false,
        };

        let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) else {
            return false;
        };

        if let Some(title) = tag.title() {
            sink.set("title", &title);
        }
        if let Some(album) = tag.album() {
            sink.set("album", &album);
        }
        if let Some(artist) = tag.artist() {
            sink.set("artist", &artist);
        }
        if let Some(album_artist) = tag
            .get(&ItemKey::AlbumArtist)
            .and_then(|item| item.value().text())
        {
            sink.set("album_artist", album_artist);
        }
        if let Some(genre) = tag.genre() {
            for name in genre.split(';').map(str::trim).filter(|s| !s.is_empty()) {
                sink.set("genre", name);
            }
        }
        if let Some(comment) = tag.comment() {
            sink.set("comment", &comment);
        }
        if let Some(track) = tag.track() {
            sink.set("track", &track.to_string());
        }
        if let Some(disc) = tag.disk() {
            sink.set("disc", &disc.to_string());
        }
        if let Some(year) = tag.year() {
            sink.set("year", &year.to_string());
        }

        let duration = tagged_file.properties().duration().as_secs();
        sink.set("duration", &duration.to_string());

        if let Some(picture) = tag.pictures().first() {
            sink.set_thumbnail(picture.data().to_vec());
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_known_audio_extensions() {
        let reader = LoftyReader::new();
        assert!(reader.can_read("mp3"));
        assert!(reader.can_read("flac"));
        assert!(!reader.can_read("txt"));
    }

    #[test]
    fn unreadable_path_fails_softly() {
        let reader = LoftyReader::new();
        let mut bag = crate::model::tagbag::TagBag::new();
        assert!(!reader.read(Path::new("/nonexistent/path/does-not-exist.mp3"), &mut bag));
    }
}
