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

//! # Topos IO
//!
//! Filesystem-facing services of the build core: walking a source tree into
//! a disposable entity store plus a diffable snapshot.
//!
//! The walk itself is synchronous; [`scan`] wraps it in a blocking task so
//! callers suspend only at this I/O boundary, never inside the graph or
//! diff algorithms.

pub mod scan;

use std::path::PathBuf;

pub use scan::{scan_tree, ScanError, ScanOutcome, SourceKind};

/// Scans a source tree on the blocking thread pool.
///
/// The async seam of the build pass: everything downstream of the returned
/// [`ScanOutcome`] is pure in-memory work.
pub async fn scan(root: PathBuf) -> Result<ScanOutcome, ScanError> {
    match tokio::task::spawn_blocking(move || scan_tree(&root)).await {
        Ok(outcome) => outcome,
        Err(join_error) => std::panic::resume_unwind(join_error.into_panic()),
    }
}
