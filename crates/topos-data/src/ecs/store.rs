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

//! The central store facade.

use std::collections::HashSet;

use crate::ecs::bitset::PresenceBitset;
use crate::ecs::entity_store::{EntityRecord, EntityStore};
use crate::ecs::registry::{BuiltinDefs, ComponentRegistry};
use topos_core::component::{Component, ComponentDef, DefId};
use topos_core::dep::ChangeOp;
use topos_core::entity::EntityId;
use topos_core::value::Value;

/// Options for a bulk component write.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddOptions {
    /// Keep the already-recorded touched set instead of starting a new one.
    ///
    /// A plain `add_components` call begins a fresh logical batch: the
    /// touched set is reset before the write. Passing `retain_changes`
    /// chains this call onto the previous one so that, for example, a diff
    /// apply and the marker attach that follows it are observed by
    /// [`World::take_updated`] as a single unit.
    pub retain_changes: bool,
}

/// The central container for all entities and components of one store.
///
/// The `World` owns the component registry, the entity slot table, and the
/// per-definition membership bitsets, and provides the add/query/remove
/// contract every other part of the build core is written against. One
/// logical writer mutates a `World` at a time; all operations are
/// synchronous.
#[derive(Debug)]
pub struct World {
    registry: ComponentRegistry,
    builtins: BuiltinDefs,
    entities: EntityStore,
    /// For each `DefId`, the set of entity bits currently carrying that
    /// definition. The selection primitive intersects these.
    def_members: Vec<PresenceBitset>,
    /// Entity ids written since the last `take_updated` (or since the last
    /// non-retaining batch started).
    touched: HashSet<EntityId>,
}

impl World {
    /// Creates a store with the well-known definitions registered.
    pub fn new() -> Self {
        let mut registry = ComponentRegistry::new();
        let builtins = BuiltinDefs::register(&mut registry);
        let mut def_members = Vec::new();
        def_members.resize_with(registry.len(), PresenceBitset::new);
        Self {
            registry,
            builtins,
            entities: EntityStore::new(),
            def_members,
            touched: HashSet::new(),
        }
    }

    /// The well-known definition ids of this store.
    pub fn builtins(&self) -> BuiltinDefs {
        self.builtins
    }

    /// The component registry owned by this store.
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Registers a component definition (idempotent by uri) and returns its
    /// dense id.
    pub fn register(&mut self, def: ComponentDef) -> DefId {
        let id = self.registry.register(def);
        if self.def_members.len() < self.registry.len() {
            self.def_members
                .resize_with(self.registry.len(), PresenceBitset::new);
        }
        id
    }

    /// Shorthand for [`ComponentRegistry::resolve`].
    pub fn resolve_def(&self, uri: &str) -> Option<DefId> {
        self.registry.resolve(uri)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Entity lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Allocates a fresh entity with no components.
    pub fn create_entity(&mut self) -> EntityId {
        self.entities.create()
    }

    /// Materializes the given id (growing the slot table if necessary) and
    /// returns it. An already-live entity is left untouched.
    pub fn create_entity_with_id(&mut self, id: EntityId) -> EntityId {
        self.entities.create_with_id(id)
    }

    /// Returns the record behind a live entity.
    pub fn get(&self, id: EntityId) -> Option<&EntityRecord> {
        self.entities.get(id)
    }

    /// Removes entities and all their components.
    ///
    /// Dependency-edge entities referencing a removed entity are *not*
    /// implicitly removed; callers that want edge cleanup use
    /// [`crate::graph::remove_entities_with_edges`].
    pub fn remove_entities(&mut self, ids: &[EntityId]) {
        for &id in ids {
            if let Some(record) = self.entities.remove(id) {
                let bit = EntityStore::bit_of(id);
                for def in record.components.keys() {
                    if let Some(members) = self.def_members.get_mut(def.0 as usize) {
                        members.clear(bit);
                    }
                }
                self.touched.insert(id);
                log::trace!("removed entity {id} ({} components)", record.components.len());
            }
        }
    }

    /// Detaches a single component from an entity.
    ///
    /// Returns `true` if the component existed.
    pub fn remove_component(&mut self, id: EntityId, def: DefId) -> bool {
        let Some(record) = self.entities.get_mut(id) else {
            return false;
        };
        if record.components.remove(&def).is_none() {
            return false;
        }
        record.presence.clear(def.bit());
        if let Some(members) = self.def_members.get_mut(def.0 as usize) {
            members.clear(EntityStore::bit_of(id));
        }
        self.touched.insert(id);
        true
    }

    // ─────────────────────────────────────────────────────────────────────
    // Bulk writes
    // ─────────────────────────────────────────────────────────────────────

    /// Bulk component upsert.
    ///
    /// For each component: a `NONE` entity id allocates a fresh entity; any
    /// other id is materialized if it is not live yet. Components merge into
    /// existing entities by definition id — the incoming component replaces
    /// only its own definition's slot, so two consecutive adds touching the
    /// same entity with *different* definitions lose neither write.
    ///
    /// Returns the entity ids written to, aligned with the input order.
    /// Within one call the whole batch becomes visible atomically; no
    /// selection observes a partial write.
    pub fn add_components(
        &mut self,
        components: Vec<Component>,
        options: AddOptions,
    ) -> Vec<EntityId> {
        if !options.retain_changes {
            self.touched.clear();
        }

        let mut written = Vec::with_capacity(components.len());
        for mut component in components {
            let id = if component.entity.is_none() {
                self.entities.create()
            } else {
                self.entities.create_with_id(component.entity)
            };
            component.entity = id;

            let def = component.def;
            let record = self
                .entities
                .get_mut(id)
                .expect("slot was just materialized");
            record.presence.set(def.bit());
            record.components.insert(def, component);

            if let Some(members) = self.def_members.get_mut(def.0 as usize) {
                members.set(EntityStore::bit_of(id));
            } else {
                log::warn!("component write for unregistered definition {def} on {id}");
            }

            self.touched.insert(id);
            written.push(id);
        }

        log::trace!("added {} components", written.len());
        written
    }

    /// Drains and returns the set of entity ids touched since the current
    /// logical batch began, in ascending order.
    pub fn take_updated(&mut self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.touched.drain().collect();
        ids.sort_unstable();
        ids
    }

    // ─────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────

    /// Returns the component of the given definition on an entity.
    pub fn component(&self, id: EntityId, def: DefId) -> Option<&Component> {
        self.entities.get(id)?.component(def)
    }

    /// Returns one attribute of one component on an entity.
    pub fn attribute(&self, id: EntityId, def: DefId, name: &str) -> Option<&Value> {
        self.component(id, def)?.attribute(name)
    }

    /// Selects all entities whose presence set is a superset of `defs`, in
    /// ascending id order.
    ///
    /// This is the fundamental query primitive: it intersects the
    /// per-definition membership bitsets and never inspects attribute
    /// values. An empty `defs` slice selects every live entity.
    pub fn select_with_all(&self, defs: &[DefId]) -> Vec<EntityId> {
        let Some((&first, rest)) = defs.split_first() else {
            return self.entities.iter().map(|record| record.id).collect();
        };

        let Some(mut combined) = self.def_members.get(first.0 as usize).cloned() else {
            return Vec::new();
        };
        for def in rest {
            match self.def_members.get(def.0 as usize) {
                Some(members) => combined.intersect(members),
                None => return Vec::new(),
            }
        }

        combined
            .iter_ones()
            .map(|bit| EntityId(bit as u64 + 1))
            .collect()
    }

    /// Selects all entities carrying a single definition.
    pub fn select_with(&self, def: DefId) -> Vec<EntityId> {
        self.select_with_all(&[def])
    }

    /// Iterates over every live entity record in id order.
    pub fn iter_entities(&self) -> impl Iterator<Item = &EntityRecord> {
        self.entities.iter()
    }

    /// The number of live entities.
    pub fn entity_count(&self) -> usize {
        self.entities.alive_count()
    }

    /// Clones all components attached to an entity.
    pub fn components_of(&self, id: EntityId) -> Vec<Component> {
        self.entities
            .get(id)
            .map(|record| record.components().cloned().collect())
            .unwrap_or_default()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Change markers
    // ─────────────────────────────────────────────────────────────────────

    /// Returns the change marker currently attached to an entity.
    pub fn marker_of(&self, id: EntityId) -> Option<ChangeOp> {
        let upd = self.builtins().upd;
        self.attribute(id, upd, "op")
            .and_then(Value::as_str)
            .and_then(ChangeOp::parse)
    }

    /// All entities currently carrying a change marker, with their ops.
    pub fn marked_entities(&self) -> Vec<(EntityId, ChangeOp)> {
        let upd = self.builtins().upd;
        self.select_with(upd)
            .into_iter()
            .filter_map(|id| self.marker_of(id).map(|op| (id, op)))
            .collect()
    }

    /// Detaches every change marker. Called once a build pass has consumed
    /// them.
    pub fn clear_markers(&mut self) {
        let upd = self.builtins().upd;
        for id in self.select_with(upd) {
            self.remove_component(id, upd);
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}
