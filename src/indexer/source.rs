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

//! Pluggable discovery sources and the external-id format they share.
//!
//! The built-in [`FilesystemSource`] is the only concrete source this tree
//! ships; the trait exists so a future scanner for multi-track container
//! files or optical media can plug into the same pipeline without the
//! indexer caring where a candidate file came from. Such a source would
//! identify its subtracks with `<prefix>://<n>/<path>` external ids, built
//! and parsed by the free functions below.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// A pluggable discovery source. The filesystem walk is the built-in
/// instance; non-filesystem sources (container-file scanners, optical
/// media) would introduce tracks through the same [`super::Indexer::scan`]
/// entry point by yielding their own candidate identifiers here.
pub trait IndexerSource: Send {
    /// Stable small integer distinguishing this source's tracks from other
    /// sources' in the `tracks.source_id` column.
    fn source_id(&self) -> i32;

    /// Whether this source's external ids are stable across scans (so an
    /// existing track can be matched by external id alone rather than by
    /// filesystem identity).
    fn has_stable_ids(&self) -> bool;

    fn on_before_scan(&mut self) {}
    fn on_after_scan(&mut self) {}

    /// Enumerates candidate file paths under `roots`. Implementations doing
    /// a long directory listing must call `interrupted` at least once per
    /// directory and stop early if it answers true.
    fn candidates(&self, roots: &[PathBuf], interrupted: &dyn Fn() -> bool) -> Vec<PathBuf>;
}

pub const FILESYSTEM_SOURCE_ID: i32 = 0;

/// The built-in source: a recursive directory walk over the configured
/// library roots.
pub struct FilesystemSource;

impl IndexerSource for FilesystemSource {
    fn source_id(&self) -> i32 {
        FILESYSTEM_SOURCE_ID
    }

    fn has_stable_ids(&self) -> bool {
        false
    }

    fn candidates(&self, roots: &[PathBuf], interrupted: &dyn Fn() -> bool) -> Vec<PathBuf> {
        let mut out = Vec::new();
        for root in roots {
            for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
                if interrupted() {
                    return out;
                }
                if entry.file_type().is_file() {
                    out.push(entry.into_path());
                }
            }
        }
        out
    }
}

/// Builds an external id of the form `<prefix>://<n>/<path>`.
pub fn make_external_id(prefix: &str, subtrack: u32, path: &str) -> String {
    format!("{prefix}://{subtrack}/{path}")
}

/// Parses an external id back into `(prefix, subtrack, path)`. Pure string
/// operation, kept free of any store or filesystem access so it stays
/// deterministic to test.
pub fn parse_external_id(id: &str) -> Option<(String, u32, String)> {
    let (prefix, rest) = id.split_once("://")?;
    let (n, path) = rest.split_once('/')?;
    let subtrack: u32 = n.parse().ok()?;
    Some((prefix.to_string(), subtrack, path.to_string()))
}

/// Path of the containing directory for `path` relative to `root`, using
/// `/`-joined components so the stored value is platform-independent.
pub fn relative_dir(root: &Path, path: &Path) -> String {
    let parent = path.parent().unwrap_or(root);
    let rel = parent.strip_prefix(root).unwrap_or(parent);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
