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

//! Transport-level playback control.
//!
//! [`AudioPlayer`] is a command proxy to a background worker thread that
//! drives MPV. It answers play/pause/seek/volume requests issued against
//! whichever track a caller resolved from a [`crate::tracklist::TrackList`];
//! the facade itself holds no queue state beyond "what is currently loaded".

pub mod commands;

use std::sync::mpsc;

use anyhow::Result;

use commands::AudioPlayerCommand;

/// The current playback status of the audio engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlayerState {
    Playing,
    Paused,
    Stopped,
}

/// Events broadcast from the worker thread as MPV's observed properties
/// change. `TrackFinished` carries the id of the track that just ended so a
/// caller can advance its track list without the facade knowing about queues.
#[derive(Clone, Debug, PartialEq)]
pub enum PlayerEvent {
    TitleChanged(String),
    DurationChanged(f64),
    TimeChanged(f64),
    VolumeChanged(u32),
    PlayerStateChanged(PlayerState),
    TrackFinished(i64),
    Error(String),
}

/// A handle to the audio playback engine.
///
/// This struct acts as a command proxy; it does not perform audio processing
/// itself but instead sends instructions to a background worker thread.
pub struct AudioPlayer {
    command_tx: mpsc::Sender<AudioPlayerCommand>,
}

impl AudioPlayer {
    /// Spawns the audio worker thread and returns a new player handle.
    ///
    /// `event_tx` carries playback state changes back to the caller, which
    /// owns the track list and decides what "next" means.
    pub fn new(event_tx: mpsc::Sender<PlayerEvent>) -> Result<Self> {
        let (command_tx, command_rx) = mpsc::channel::<AudioPlayerCommand>();

        commands::spawn_player_worker(command_rx, event_tx);

        Ok(Self { command_tx })
    }

    /// Maps MPV's observed flags to a simplified [`PlayerState`].
    fn player_state(is_paused: bool, is_idle: bool) -> PlayerState {
        if is_idle {
            PlayerState::Stopped
        } else if is_paused {
            PlayerState::Paused
        } else {
            PlayerState::Playing
        }
    }

    /// Loads and plays the file at `path`, tagging subsequent events with
    /// `track_id` so the caller can correlate them back to its track list.
    pub fn play_track(&self, track_id: i64, path: &str) -> Result<()> {
        self.command_tx.send(AudioPlayerCommand::PlayTrack {
            track_id,
            path: path.to_string(),
        })?;
        Ok(())
    }

    pub fn toggle_pause(&self) -> Result<()> {
        self.command_tx.send(AudioPlayerCommand::TogglePause)?;
        Ok(())
    }

    pub fn stop(&self) -> Result<()> {
        self.command_tx.send(AudioPlayerCommand::Stop)?;
        Ok(())
    }

    /// Adjusts the playback volume relative to the current level.
    pub fn adjust_volume(&self, delta: i32) -> Result<()> {
        self.command_tx
            .send(AudioPlayerCommand::AdjustVolume(delta))?;
        Ok(())
    }

    pub fn toggle_mute(&self) -> Result<()> {
        self.command_tx.send(AudioPlayerCommand::ToggleMute)?;
        Ok(())
    }

    /// Seeks forward or backward relative to the current position, in
    /// seconds.
    pub fn seek(&self, delta: i32) -> Result<()> {
        self.command_tx.send(AudioPlayerCommand::Seek(delta))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_flag_wins_over_pause_flag() {
        assert_eq!(AudioPlayer::player_state(true, true), PlayerState::Stopped);
        assert_eq!(AudioPlayer::player_state(false, true), PlayerState::Stopped);
    }

    #[test]
    fn pause_flag_applies_only_when_not_idle() {
        assert_eq!(AudioPlayer::player_state(true, false), PlayerState::Paused);
        assert_eq!(AudioPlayer::player_state(false, false), PlayerState::Playing);
    }
}
