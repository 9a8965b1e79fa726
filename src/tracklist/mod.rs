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

//! An ordered, position-addressable sequence of track handles with lazy
//! metadata hydration and change notifications.
//!
//! Generalizes the existing `Queue`/`Search` types — each an
//! `Arc<Mutex<Vec<TrackInfo>>>` handed out to callers — into a single owner
//! applying edits and broadcasting `Changed` notifications over `mpsc`
//! channels, rather than sharing a mutex with every observer.

use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, Sender};

use crate::error::QueryError;
use crate::model::TrackInfo;

/// What changed after a mutation, for an observer to decide whether it needs
/// to re-render the whole list or just one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    WholeList,
    Index(usize),
}

/// A lightweight reference into a [`TrackList`]; does not itself carry
/// hydrated fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackHandle {
    pub index: usize,
    pub track_id: i64,
}

/// An ordered sequence of track ids, with a hydration cache and a set of
/// change observers. The owning thread applies all edits; observers read
/// change notifications from their own [`Receiver`].
#[derive(Default)]
pub struct TrackList {
    ids: Vec<i64>,
    cache: HashMap<i64, TrackInfo>,
    observers: Vec<Sender<Change>>,
}

impl TrackList {
    pub fn new(ids: Vec<i64>) -> Self {
        Self {
            ids,
            cache: HashMap::new(),
            observers: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn id_at(&self, index: usize) -> Option<i64> {
        self.ids.get(index).copied()
    }

    /// A handle for the track at `index`; does not force hydration.
    pub fn get_at(&self, index: usize) -> Option<TrackHandle> {
        self.id_at(index).map(|track_id| TrackHandle { index, track_id })
    }

    /// The hydrated info for `track_id`, if [`TrackList::hydrate_window`] has
    /// already fetched it.
    pub fn cached(&self, track_id: i64) -> Option<&TrackInfo> {
        self.cache.get(&track_id)
    }

    /// Fetches and caches info for every not-yet-cached id in
    /// `[start, end)`, in one call to `fetch`. A window entirely already
    /// cached costs nothing.
    pub fn hydrate_window(
        &mut self,
        start: usize,
        end: usize,
        fetch: impl FnOnce(&[i64]) -> Result<Vec<TrackInfo>, QueryError>,
    ) -> Result<(), QueryError> {
        let end = end.min(self.ids.len());
        if start >= end {
            return Ok(());
        }
        let missing: Vec<i64> = self.ids[start..end]
            .iter()
            .filter(|id| !self.cache.contains_key(id))
            .copied()
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        for info in fetch(&missing)? {
            self.cache.insert(info.track_id, info);
        }
        Ok(())
    }

    /// Registers an observer; returns the receiving end of its channel. A
    /// dropped receiver is pruned lazily on the next notification.
    pub fn subscribe(&mut self) -> Receiver<Change> {
        let (tx, rx) = channel();
        self.observers.push(tx);
        rx
    }

    /// Shifts the entry at `from` to `to`, preserving relative order of
    /// everything else (a shift, not a swap).
    pub fn move_entry(&mut self, from: usize, to: usize) {
        if from >= self.ids.len() || to >= self.ids.len() || from == to {
            return;
        }
        let id = self.ids.remove(from);
        self.ids.insert(to, id);
        self.notify(Change::WholeList);
    }

    pub fn delete(&mut self, index: usize) -> Option<i64> {
        if index >= self.ids.len() {
            return None;
        }
        let id = self.ids.remove(index);
        self.cache.remove(&id);
        self.notify(Change::WholeList);
        Some(id)
    }

    pub fn insert(&mut self, index: usize, track_id: i64) {
        let index = index.min(self.ids.len());
        self.ids.insert(index, track_id);
        self.notify(Change::WholeList);
    }

    pub fn append(&mut self, track_id: i64) {
        self.ids.push(track_id);
        let index = self.ids.len() - 1;
        self.notify(Change::Index(index));
    }

    pub fn track_ids(&self) -> &[i64] {
        &self.ids
    }

    fn notify(&mut self, change: Change) {
        self.observers.retain(|tx| tx.send(change).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(track_id: i64) -> TrackInfo {
        TrackInfo {
            track_id,
            external_id: None,
            title: format!("Track {track_id}"),
            track_number: None,
            disc_number: None,
            duration: 0,
            year: None,
            album_name: String::new(),
            artist_name: String::new(),
            genre_name: String::new(),
            filename: String::new(),
        }
    }

    #[test]
    fn hydrate_window_only_fetches_missing_ids() {
        let mut list = TrackList::new(vec![1, 2, 3]);
        let mut fetch_calls = 0;

        list.hydrate_window(0, 2, |ids| {
            fetch_calls += 1;
            Ok(ids.iter().map(|id| info(*id)).collect())
        })
        .unwrap();
        assert_eq!(fetch_calls, 1);
        assert!(list.cached(1).is_some());
        assert!(list.cached(3).is_none());

        list.hydrate_window(0, 2, |_| {
            fetch_calls += 1;
            Ok(vec![])
        })
        .unwrap();
        assert_eq!(fetch_calls, 1, "already-cached window should not re-fetch");
    }

    #[test]
    fn move_entry_shifts_rather_than_swaps() {
        let mut list = TrackList::new(vec![1, 2, 3, 4]);
        list.move_entry(0, 2);
        assert_eq!(list.track_ids(), &[2, 3, 1, 4]);
    }

    /// Save `[11, 22, 33]`, move index 0 to 2, delete index 0: a
    /// remove-then-insert move leaves `[22, 33, 11]`, and deleting its new
    /// index 0 leaves `[33, 11]`. See DESIGN.md for why this tree keeps that
    /// result rather than chasing an unconfirmed alternative.
    #[test]
    fn playlist_move_then_delete_scenario() {
        let mut list = TrackList::new(vec![11, 22, 33]);
        list.move_entry(0, 2);
        list.delete(0);
        assert_eq!(list.track_ids(), &[33, 11]);
    }

    #[test]
    fn append_notifies_single_index_delete_notifies_whole_list() {
        let mut list = TrackList::new(vec![1, 2]);
        let rx = list.subscribe();

        list.append(3);
        assert_eq!(rx.try_recv().unwrap(), Change::Index(2));

        list.delete(0);
        assert_eq!(rx.try_recv().unwrap(), Change::WholeList);
        assert_eq!(list.track_ids(), &[2, 3]);
    }

    #[test]
    fn dropped_observer_does_not_panic_on_notify() {
        let mut list = TrackList::new(vec![1]);
        {
            let _rx = list.subscribe();
        }
        list.append(2);
    }
}
