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

//! Pluggable tag readers.
//!
//! A [`TagReader`] never touches the database; it only emits key/value pairs
//! and an optional thumbnail into a [`TrackWriterSink`] handed to it by the
//! indexer. The [`ReaderRegistry`] picks the first registered reader whose
//! [`TagReader::can_read`] answers true for a file's (lowercased) extension —
//! registration order is priority order.

pub mod lofty_reader;

use std::path::Path;

use crate::model::tagbag::TagBag;

pub use lofty_reader::LoftyReader;

/// The capability a reader is given to emit tag data, decoupling readers
/// from the normalized schema and the store.
pub trait TrackWriterSink {
    fn set(&mut self, key: &str, value: &str);
    fn set_thumbnail(&mut self, bytes: Vec<u8>);
}

impl TrackWriterSink for TagBag {
    fn set(&mut self, key: &str, value: &str) {
        TagBag::set(self, key, value);
    }

    fn set_thumbnail(&mut self, bytes: Vec<u8>) {
        TagBag::set_thumbnail(self, bytes);
    }
}

/// A pluggable tag extractor, selected by file extension.
pub trait TagReader: Send + Sync {
    /// Whether this reader handles files with the given lowercase extension
    /// (no leading dot, e.g. `"mp3"`).
    fn can_read(&self, extension: &str) -> bool;

    /// Fills `sink` with tag data read from `path`. Returns `false` if the
    /// file could not be read or carried no usable tags, marking it
    /// unreadable for this scan; the caller must not treat a `false` return
    /// as fatal to the overall scan.
    fn read(&self, path: &Path, sink: &mut dyn TrackWriterSink) -> bool;
}

/// An ordered set of readers; the first whose [`TagReader::can_read`]
/// answers true for a file's extension is used.
#[derive(Default)]
pub struct ReaderRegistry {
    readers: Vec<Box<dyn TagReader>>,
}

impl ReaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `reader`, giving it lower priority than any reader already
    /// registered.
    pub fn register(&mut self, reader: Box<dyn TagReader>) {
        self.readers.push(reader);
    }

    /// The highest-priority reader that can handle `extension`, if any.
    pub fn select(&self, extension: &str) -> Option<&dyn TagReader> {
        let extension = extension.to_ascii_lowercase();
        self.readers
            .iter()
            .find(|r| r.can_read(&extension))
            .map(|r| r.as_ref())
    }

    /// Selects a reader for `path` by extension and reads it into a fresh
    /// [`TagBag`]. Returns `None` if no reader claims the extension or the
    /// selected reader reports failure.
    pub fn read(&self, path: &Path) -> Option<TagBag> {
        let extension = path.extension()?.to_string_lossy().to_ascii_lowercase();
        let reader = self.select(&extension)?;

        let mut bag = TagBag::new();
        if reader.read(path, &mut bag) {
            Some(bag)
        } else {
            None
        }
    }
}
