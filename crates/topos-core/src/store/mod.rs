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

//! Contracts for durable store backends.
//!
//! The entity store itself is a synchronous in-memory structure; persistence
//! is a seam behind this trait. A build pass funnels each logical mutation
//! batch through [`StoreBackend::commit`], and a durable implementation can
//! be substituted without touching the graph, diff, or propagation logic.
//! Backend calls are the only suspension points in the core's design.

use crate::component::Component;
use crate::entity::EntityId;
use crate::error::StoreResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One logical batch of store writes.
///
/// All components in a batch become visible to subsequent selections
/// atomically; no observer sees a partial batch. The diff engine relies on
/// this to make "apply + attach markers" a single unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WriteBatch {
    /// Components created or replaced in this batch.
    pub upserts: Vec<Component>,
    /// Entities removed in this batch (all their components with them).
    pub removed: Vec<EntityId>,
}

impl WriteBatch {
    /// Returns `true` if the batch carries no writes.
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.removed.is_empty()
    }
}

/// The persistence interface of the entity store.
///
/// Implementations must apply batches in the order they are committed; the
/// core guarantees a single logical writer per store, so no two commits race.
#[async_trait]
pub trait StoreBackend: Send + Sync {
    /// Loads every persisted component, in a deterministic order.
    ///
    /// Used to re-materialize a store at startup. A fresh backend returns an
    /// empty list.
    async fn load(&self) -> StoreResult<Vec<Component>>;

    /// Durably applies one write batch.
    ///
    /// # Errors
    /// Returns [`crate::error::StoreError::Backend`] if the batch could not
    /// be persisted; the caller aborts the enclosing build step.
    async fn commit(&self, batch: &WriteBatch) -> StoreResult<()>;
}
