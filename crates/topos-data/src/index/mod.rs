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

//! Derived key → entity lookup tables.
//!
//! Indexes are caches over the store, never sources of truth: they may be
//! discarded at any time and must be rebuilt (or patched) after any apply
//! phase that changed the entities they cover, or lookups go stale — a
//! caller responsibility, not enforced here. Declarative indexes are rebuilt
//! wholesale from their [`IndexSpec`]; imperative indexes (e.g. the
//! destination-url table filled during path assignment) are patched through
//! [`Index::set`] / [`Index::remove_entity`] directly.

use std::collections::{BTreeMap, HashMap};

use crate::ecs::World;
use topos_core::component::DefId;
use topos_core::entity::EntityId;
use topos_core::value::Value;

/// One row of an index: the entity a key resolves to, plus projected extras.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    /// The entity the key maps to.
    pub entity: EntityId,
    /// Extra projected attributes, keyed by attribute name.
    pub extra: BTreeMap<String, Value>,
}

/// A key ↔ entity lookup table.
///
/// Invariant: the forward (key → entry) and reverse (entity → key) maps are
/// always mutual inverses — every mutation updates both sides.
#[derive(Debug, Default)]
pub struct Index {
    forward: HashMap<String, IndexEntry>,
    reverse: HashMap<EntityId, String>,
}

impl Index {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `key` to `entity`, displacing any previous binding of either
    /// side so the two maps stay inverse.
    pub fn set(&mut self, key: impl Into<String>, entity: EntityId, extra: BTreeMap<String, Value>) {
        let key = key.into();
        // Displace an old key of this entity.
        if let Some(old_key) = self.reverse.remove(&entity) {
            if old_key != key {
                self.forward.remove(&old_key);
            }
        }
        // Displace an old entity of this key.
        if let Some(old_entry) = self.forward.remove(&key) {
            self.reverse.remove(&old_entry.entity);
        }
        self.forward.insert(key.clone(), IndexEntry { entity, extra });
        self.reverse.insert(entity, key);
    }

    /// Removes the binding for a key. Returns the displaced entry.
    pub fn remove_key(&mut self, key: &str) -> Option<IndexEntry> {
        let entry = self.forward.remove(key)?;
        self.reverse.remove(&entry.entity);
        Some(entry)
    }

    /// Removes the binding for an entity. Returns the displaced key.
    pub fn remove_entity(&mut self, entity: EntityId) -> Option<String> {
        let key = self.reverse.remove(&entity)?;
        self.forward.remove(&key);
        Some(key)
    }

    /// Looks up a key.
    pub fn get(&self, key: &str) -> Option<&IndexEntry> {
        self.forward.get(key)
    }

    /// Looks up the key an entity is filed under.
    pub fn key_of(&self, entity: EntityId) -> Option<&str> {
        self.reverse.get(&entity).map(String::as_str)
    }

    /// The number of bindings.
    pub fn len(&self) -> usize {
        self.forward.len()
    }

    /// Returns true if the index holds no bindings.
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Iterates over all `(key, entry)` bindings (unspecified order).
    pub fn iter(&self) -> impl Iterator<Item = (&str, &IndexEntry)> {
        self.forward.iter().map(|(key, entry)| (key.as_str(), entry))
    }
}

/// A declarative index description: which entities to cover and what to
/// project out of them.
#[derive(Debug, Clone)]
pub struct IndexSpec {
    /// The index name (e.g. `"src_url"`).
    pub name: String,
    /// Presence requirement: only entities carrying all these definitions
    /// are indexed.
    pub require: Vec<DefId>,
    /// The `(definition, attribute)` whose string value becomes the key.
    /// Entities lacking it are skipped.
    pub key: (DefId, String),
    /// Extra `(definition, attribute)` pairs projected into
    /// [`IndexEntry::extra`] under the attribute name.
    pub extra: Vec<(DefId, String)>,
}

/// Holds every index of a store, declarative and imperative alike.
#[derive(Debug, Default)]
pub struct IndexStore {
    specs: Vec<IndexSpec>,
    indexes: HashMap<String, Index>,
}

impl IndexStore {
    /// Creates an empty index store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a declarative index. Its contents are produced by
    /// [`IndexStore::rebuild`]; registering replaces any previous spec and
    /// contents under the same name.
    pub fn add_index(&mut self, spec: IndexSpec) {
        self.indexes.insert(spec.name.clone(), Index::new());
        self.specs.retain(|existing| existing.name != spec.name);
        self.specs.push(spec);
    }

    /// Registers an imperative index, maintained by callers through
    /// [`IndexStore::index_mut`]. Untouched by [`IndexStore::rebuild`].
    pub fn add_manual(&mut self, name: impl Into<String>) {
        self.indexes.entry(name.into()).or_default();
    }

    /// Looks up an index by name.
    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.get(name)
    }

    /// Mutable access to an index (imperative maintenance).
    pub fn index_mut(&mut self, name: &str) -> Option<&mut Index> {
        self.indexes.get_mut(name)
    }

    /// Re-executes every declarative spec against the store and replaces
    /// the corresponding index contents.
    pub fn rebuild(&mut self, world: &World) {
        for spec in &self.specs {
            let mut index = Index::new();
            for id in world.select_with_all(&spec.require) {
                let Some(key) = world
                    .attribute(id, spec.key.0, &spec.key.1)
                    .and_then(Value::as_str)
                else {
                    log::debug!("index {}: entity {id} lacks key attribute, skipped", spec.name);
                    continue;
                };
                let mut extra = BTreeMap::new();
                for (def, attr) in &spec.extra {
                    if let Some(value) = world.attribute(id, *def, attr) {
                        extra.insert(attr.clone(), value.clone());
                    }
                }
                index.set(key.to_owned(), id, extra);
            }
            log::debug!("rebuilt index {} ({} entries)", spec.name, index.len());
            self.indexes.insert(spec.name.clone(), index);
        }
    }
}
