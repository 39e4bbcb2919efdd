// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Topos Runtime
//!
//! Orchestrates one incremental build pass over the tiered crates: scan the
//! source tree, diff against the live store, apply and mark changes, rebuild
//! the structural edges, propagate invalidation, refresh the indexes, commit
//! to the persistence backend, and report.
//!
//! External processors (rendering, stylesheet compilation) run between
//! passes against the [`topos_data::ecs::World`] exposed here; this crate
//! only owns the bookkeeping.

pub mod link;
pub mod pipeline;
pub mod report;

pub use pipeline::{BuildOptions, BuildPass, DEST_URL_INDEX, SRC_URL_INDEX};
pub use report::{BuildReport, EntityError};
