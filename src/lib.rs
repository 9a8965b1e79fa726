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

//! A local music library engine: a filesystem indexer that normalizes tags
//! into a relational store, a query layer over that store, a track list
//! abstraction for browsing and editing ordered track sequences, and a
//! playback facade that drives MPV.
//!
//! The crate has no UI of its own; `muzak`'s binary is a thin CLI that
//! exercises the library against a configured set of media directories.

pub mod config;
pub mod error;
pub mod indexer;
pub mod model;
pub mod player;
pub mod query;
pub mod store;
pub mod tags;
pub mod writer;
pub mod tracklist;

pub use config::EngineConfig;
pub use error::{IndexError, QueryError, StoreError, WriterError};
pub use store::Store;
