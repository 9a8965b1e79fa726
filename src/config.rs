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

//! Application configuration.
//!
//! This module manages the engine's persisted configuration file, loaded and
//! saved through `confy`.

use serde::{Deserialize, Serialize};

const CONFIG_NAME: &str = "muzak";

/// Persisted engine configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub version: u32,

    /// Root directories scanned by the indexer.
    pub media_dirs: Vec<String>,

    /// Persist the play queue on shutdown.
    pub save_session_on_exit: bool,
    /// Resume the persisted play queue on startup.
    pub resume_playback_on_startup: bool,

    /// Last known play-queue index, updated as the session plays.
    pub last_play_queue_index: i32,
    /// Last known play-queue offset, in seconds.
    pub last_play_queue_time: f64,

    /// Substituted in for an empty/missing album tag. `%s` is replaced with
    /// the file's extension.
    pub default_album_name: String,
    /// Substituted in for an empty/missing artist tag. `%s` is replaced with
    /// the file's extension.
    pub default_artist_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            version: 1,
            media_dirs: vec![],
            save_session_on_exit: true,
            resume_playback_on_startup: false,
            last_play_queue_index: -1,
            last_play_queue_time: 0.0,
            default_album_name: "Unknown Album (%s)".to_string(),
            default_artist_name: "Unknown Artist (%s)".to_string(),
        }
    }
}

impl EngineConfig {
    /// Substitutes `%s` in a default-name template with `extension`.
    pub fn substitute(template: &str, extension: &str) -> String {
        template.replace("%s", extension)
    }
}

/// Loads the engine configuration, falling back to defaults if none exists.
pub fn load_config() -> EngineConfig {
    confy::load(CONFIG_NAME, None).unwrap_or_default()
}

/// Persists the engine configuration to disk.
pub fn save_config(cfg: &EngineConfig) -> Result<(), confy::ConfyError> {
    confy::store(CONFIG_NAME, None, cfg)
}
