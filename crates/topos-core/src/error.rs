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

//! Defines the hierarchy of error types for the store core.
//!
//! Only failures that abort the enclosing build step live here. Invalid
//! graph input (self-loops, sentinel endpoints) and unresolved references
//! are *not* errors: they surface as [`crate::entity::EntityId::NONE`] or
//! `None` so that bulk loops and best-effort resolution need no per-item
//! handling. Per-entity processing failures are recorded as `topos/err`
//! components on the offending entity instead of aborting the build.

use crate::component::DefId;
use crate::entity::EntityId;
use std::fmt;

/// A convenience alias for store-level results.
pub type StoreResult<T> = Result<T, StoreError>;

/// An error raised by the entity store or its backing persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be read or written. Fatal to the
    /// enclosing build pass.
    Backend {
        /// What the store was doing when the backend failed.
        context: String,
        /// The underlying error, flattened to text.
        source_error: String,
    },
    /// A component referenced a definition id the registry never assigned.
    UnknownDefinition {
        /// The unassigned definition id.
        def: DefId,
    },
    /// An operation addressed an entity id that was never created (or was
    /// the sentinel where a live entity is required).
    MissingEntity {
        /// The offending id.
        id: EntityId,
    },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Backend {
                context,
                source_error,
            } => {
                write!(f, "Store backend failure while {context}: {source_error}")
            }
            StoreError::UnknownDefinition { def } => {
                write!(f, "Unknown component definition {def}")
            }
            StoreError::MissingEntity { id } => {
                write!(f, "Entity {id} does not exist in this store")
            }
        }
    }
}

impl std::error::Error for StoreError {}
