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

//! MPV-backed audio playback engine and event processing.
//!
//! The worker thread bridges a command channel (what the caller wants to
//! happen) and an event channel (what MPV reports happened), observing a
//! fixed set of MPV properties and translating property-change notifications
//! into [`PlayerEvent`]s.

use anyhow::{Context, Result};
use mpv::Format;
use std::{
    sync::mpsc::{self, Receiver, Sender},
    thread,
};

use crate::player::{AudioPlayer, PlayerEvent, PlayerState};

#[derive(Debug)]
pub enum AudioPlayerCommand {
    PlayTrack { track_id: i64, path: String },
    TogglePause,
    Seek(i32),
    Stop,
    AdjustVolume(i32),
    ToggleMute,
}

/// Spawns the audio worker thread to process playback commands.
///
/// If the worker loop returns an error, it is caught here and reported as a
/// single [`PlayerEvent::Error`] rather than panicking the thread's caller.
pub(crate) fn spawn_player_worker(
    command_rx: Receiver<AudioPlayerCommand>,
    event_tx: Sender<PlayerEvent>,
) {
    let error_tx = event_tx.clone();

    thread::spawn(move || {
        if let Err(e) = audio_player_worker(command_rx, event_tx) {
            let _ = error_tx.send(PlayerEvent::Error(format!("MPV worker failure: {e:?}")));
        }
    });
}

/// The primary execution loop for the audio player backend: initializes a
/// local MPV context, then alternates between draining pending commands and
/// polling for property-change events until the channel disconnects.
fn audio_player_worker(command_rx: Receiver<AudioPlayerCommand>, event_tx: Sender<PlayerEvent>) -> Result<()> {
    let mut handler = (|| {
        let mut builder = mpv::MpvHandlerBuilder::new().context("failed to create MPV builder")?;
        builder
            .set_option("vo", "null")
            .context("failed to set no video output")?;
        builder.build().context("failed to build MPV handler")
    })()?;

    handler
        .observe_property::<&str>("media-title", 0)
        .context("failed to observe media-title")?;
    handler
        .observe_property::<f64>("duration", 0)
        .context("failed to observe duration")?;
    handler
        .observe_property::<bool>("pause", 0)
        .context("failed to observe pause")?;
    handler
        .observe_property::<f64>("time-pos", 0)
        .context("failed to observe time-pos")?;
    handler
        .observe_property::<f64>("volume", 0)
        .context("failed to observe volume")?;
    handler
        .observe_property::<f64>("idle-active", 0)
        .context("failed to observe idle-active")?;

    let mut is_paused = false;
    let mut is_idle = true;
    let mut current_track_id: Option<i64> = None;
    let mut player_state = PlayerState::Stopped;

    loop {
        if !process_commands(&mut handler, &command_rx, &mut current_track_id)? {
            return Ok(());
        }
        process_mpv_events(
            &mut handler,
            &mut is_paused,
            &mut is_idle,
            &mut player_state,
            current_track_id,
            &event_tx,
        )?;
    }
}

/// Drains and executes all pending commands from the caller. Returns `false`
/// once the command channel has disconnected, which ends the worker loop.
fn process_commands(
    handler: &mut mpv::MpvHandler,
    command_rx: &mpsc::Receiver<AudioPlayerCommand>,
    current_track_id: &mut Option<i64>,
) -> Result<bool> {
    loop {
        match command_rx.try_recv() {
            Ok(command) => match command {
                AudioPlayerCommand::PlayTrack { track_id, path } => {
                    handler
                        .command(&["loadfile", &path, "replace"])
                        .context(format!("failed to load file: {path}"))?;
                    handler.set_property("pause", false)?;
                    *current_track_id = Some(track_id);
                }
                AudioPlayerCommand::TogglePause => {
                    handler.command(&["cycle", "pause"])?;
                }
                AudioPlayerCommand::Seek(delta) => {
                    handler.command(&["seek", &delta.to_string(), "relative"])?;
                }
                AudioPlayerCommand::Stop => {
                    handler.command(&["stop"])?;
                    *current_track_id = None;
                }
                AudioPlayerCommand::AdjustVolume(delta) => {
                    handler.command(&["add", "volume", &delta.to_string()])?;
                }
                AudioPlayerCommand::ToggleMute => {
                    handler.command(&["cycle", "mute"])?;
                }
            },
            Err(mpsc::TryRecvError::Empty) => return Ok(true),
            Err(mpsc::TryRecvError::Disconnected) => return Ok(false),
        }
    }
}

/// Polls for an MPV event for up to 50ms, updating the tracked flags and
/// broadcasting any resulting [`PlayerEvent`]s.
fn process_mpv_events(
    handler: &mut mpv::MpvHandler,
    is_paused: &mut bool,
    is_idle: &mut bool,
    current_state: &mut PlayerState,
    current_track_id: Option<i64>,
    event_tx: &mpsc::Sender<PlayerEvent>,
) -> Result<()> {
    if let Some(mpv_event) = handler.wait_event(0.05) {
        let player_event = match mpv_event {
            mpv::Event::PropertyChange { name, change, .. } => match (name, change) {
                ("media-title", Format::Str(title)) => Some(PlayerEvent::TitleChanged(title.to_string())),
                ("duration", Format::Double(duration)) => Some(PlayerEvent::DurationChanged(duration)),
                ("pause", Format::Flag(pause)) => {
                    *is_paused = pause;
                    None
                }
                ("time-pos", Format::Double(seconds)) if seconds >= 0.0 => {
                    Some(PlayerEvent::TimeChanged(seconds))
                }
                ("volume", Format::Double(volume)) => Some(PlayerEvent::VolumeChanged(volume.round() as u32)),
                ("idle-active", Format::Flag(idle_active)) => {
                    *is_idle = idle_active;
                    None
                }
                _ => None,
            },
            mpv::Event::EndFile(result) => match result {
                Ok(mpv::EndFileReason::MPV_END_FILE_REASON_EOF) => {
                    current_track_id.map(PlayerEvent::TrackFinished)
                }
                _ => None,
            },
            _ => None,
        };

        let new_player_state = AudioPlayer::player_state(*is_paused, *is_idle);
        if new_player_state != *current_state {
            *current_state = new_player_state;
            event_tx
                .send(PlayerEvent::PlayerStateChanged(new_player_state))
                .context("failed to send player state event")?;
        }

        if let Some(event) = player_event {
            event_tx.send(event).context("failed to send event")?;
        }
    }

    Ok(())
}
