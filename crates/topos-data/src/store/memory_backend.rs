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

//! An in-memory implementation of the store persistence contract.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use topos_core::component::{Component, DefId};
use topos_core::entity::EntityId;
use topos_core::error::StoreResult;
use topos_core::store::{StoreBackend, WriteBatch};

/// A volatile [`StoreBackend`] holding committed components in memory.
///
/// The default backend of a build pass, and the reference behavior a durable
/// implementation must match: batches apply atomically and in commit order.
/// The mutex makes the backend shareable across tasks; the core still issues
/// at most one mutating operation at a time.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<HashMap<(EntityId, DefId), Component>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of components currently persisted. Test support.
    pub async fn component_count(&self) -> usize {
        self.state.lock().await.len()
    }
}

#[async_trait]
impl StoreBackend for MemoryBackend {
    async fn load(&self) -> StoreResult<Vec<Component>> {
        let state = self.state.lock().await;
        let mut components: Vec<Component> = state.values().cloned().collect();
        components.sort_by_key(|component| (component.entity, component.def));
        Ok(components)
    }

    async fn commit(&self, batch: &WriteBatch) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        for component in &batch.upserts {
            state.insert((component.entity, component.def), component.clone());
        }
        if !batch.removed.is_empty() {
            state.retain(|(entity, _), _| !batch.removed.contains(entity));
        }
        log::trace!(
            "committed batch: {} upserts, {} removals",
            batch.upserts.len(),
            batch.removed.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn commit_then_load_roundtrips_in_order() {
        let backend = MemoryBackend::new();
        let batch = WriteBatch {
            upserts: vec![
                Component::new(EntityId(2), DefId(0)).with("url", "b"),
                Component::new(EntityId(1), DefId(0)).with("url", "a"),
            ],
            removed: vec![],
        };
        backend.commit(&batch).await.unwrap();

        let loaded = backend.load().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].entity, EntityId(1), "load order is deterministic");
    }

    #[tokio::test]
    async fn removal_drops_every_component_of_the_entity() {
        let backend = MemoryBackend::new();
        backend
            .commit(&WriteBatch {
                upserts: vec![
                    Component::new(EntityId(1), DefId(0)),
                    Component::new(EntityId(1), DefId(1)),
                    Component::new(EntityId(2), DefId(0)),
                ],
                removed: vec![],
            })
            .await
            .unwrap();

        backend
            .commit(&WriteBatch {
                upserts: vec![],
                removed: vec![EntityId(1)],
            })
            .await
            .unwrap();

        assert_eq!(backend.component_count().await, 1);
    }
}
