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

//! Internal entity slot storage and id management.

use std::collections::HashMap;

use crate::ecs::bitset::PresenceBitset;
use topos_core::component::{Component, DefId};
use topos_core::entity::EntityId;

/// The record behind one live entity: its presence bitset and components.
#[derive(Debug, Clone, Default)]
pub struct EntityRecord {
    /// The entity this record belongs to.
    pub id: EntityId,
    /// One bit per registered definition; set iff a component of that
    /// definition is attached. Kept in lockstep with `components`.
    pub(crate) presence: PresenceBitset,
    /// The attached components, at most one per definition.
    pub(crate) components: HashMap<DefId, Component>,
}

impl EntityRecord {
    /// The entity's presence bitset.
    pub fn presence(&self) -> &PresenceBitset {
        &self.presence
    }

    /// Returns the component of the given definition, if attached.
    pub fn component(&self, def: DefId) -> Option<&Component> {
        self.components.get(&def)
    }

    /// Returns true if a component of the given definition is attached.
    pub fn has(&self, def: DefId) -> bool {
        self.presence.is_set(def.bit())
    }

    /// Iterates over all attached components (unspecified order).
    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.components.values()
    }
}

/// Internal manager for entity slots.
///
/// Maintains a dense list of slots where slot `i` holds the entity with id
/// `i + 1` (id 0 is the "not found" sentinel). Ids are allocated
/// monotonically and never recycled: a removed entity leaves a permanently
/// vacant slot. Stable-key correlation across snapshots makes id reuse
/// worthless, and dead ids staying dead keeps stale edge references inert.
#[derive(Debug, Default)]
pub(crate) struct EntityStore {
    slots: Vec<Option<EntityRecord>>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_of(id: EntityId) -> Option<usize> {
        if id.is_none() {
            None
        } else {
            Some((id.0 - 1) as usize)
        }
    }

    /// The bit index an entity occupies in per-definition membership bitsets.
    pub fn bit_of(id: EntityId) -> u32 {
        debug_assert!(id.is_some());
        (id.0 - 1) as u32
    }

    /// Allocates a fresh entity id.
    pub fn create(&mut self) -> EntityId {
        let id = EntityId(self.slots.len() as u64 + 1);
        self.slots.push(Some(EntityRecord {
            id,
            ..EntityRecord::default()
        }));
        id
    }

    /// Materializes a caller-supplied id, growing the slot table if needed.
    ///
    /// Used when re-materializing a known entity for a merge-style update.
    /// If the slot is vacant (never created, or previously removed) a fresh
    /// empty record is installed; an existing record is left untouched.
    pub fn create_with_id(&mut self, id: EntityId) -> EntityId {
        let Some(slot) = Self::slot_of(id) else {
            return self.create();
        };
        if slot >= self.slots.len() {
            self.slots.resize_with(slot + 1, || None);
        }
        if self.slots[slot].is_none() {
            self.slots[slot] = Some(EntityRecord {
                id,
                ..EntityRecord::default()
            });
        }
        id
    }

    pub fn get(&self, id: EntityId) -> Option<&EntityRecord> {
        self.slots.get(Self::slot_of(id)?)?.as_ref()
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut EntityRecord> {
        let slot = Self::slot_of(id)?;
        self.slots.get_mut(slot)?.as_mut()
    }

    /// Removes an entity, returning its record. The slot stays vacant.
    pub fn remove(&mut self, id: EntityId) -> Option<EntityRecord> {
        let slot = Self::slot_of(id)?;
        self.slots.get_mut(slot)?.take()
    }

    /// Iterates over all live entities in id order.
    pub fn iter(&self) -> impl Iterator<Item = &EntityRecord> {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }

    /// The number of live entities.
    pub fn alive_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}
