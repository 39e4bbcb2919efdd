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

//! Defines core types related to entities in the store.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A unique identifier for an entity in the store.
///
/// An entity has no intrinsic data of its own; everything it "is" emerges
/// from the set of components attached to it. The id `0` is reserved as the
/// [`EntityId::NONE`] sentinel meaning "not found / not yet created", so the
/// allocator in `topos-data` starts at 1.
///
/// Ids are never recycled within a store: once an entity is removed, its id
/// stays dead. Correlation across rebuild snapshots is done by stable key,
/// never by id, so nothing is gained by reuse and stale handles stay inert.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct EntityId(pub u64);

impl EntityId {
    /// The "not found" sentinel.
    ///
    /// Graph operations return this instead of raising on invalid input, so
    /// bulk graph-building loops need no per-edge error handling.
    pub const NONE: EntityId = EntityId(0);

    /// Returns `true` if this id is the [`EntityId::NONE`] sentinel.
    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` for any id other than the sentinel.
    pub fn is_some(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}
