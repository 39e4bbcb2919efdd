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

use std::collections::HashMap;

use topos_core::component::{well_known, ComponentDef, DefId, PropertyDef, PropertyType};

/// A registry that maps component uris to dense definition ids.
///
/// This is the single source of truth for which component kinds exist in a
/// store and which bit position each occupies in presence bitsets. The
/// registry is an explicit value owned by the store instance; there is no
/// process-wide singleton.
///
/// Invariant: `uri ↔ DefId` is a bijection for the lifetime of the registry.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    defs: Vec<ComponentDef>,
    by_uri: HashMap<String, DefId>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a component definition, or returns the id already assigned
    /// to its uri.
    ///
    /// Registration is idempotent by uri: the first registration wins and
    /// later calls with the same uri do not alter the stored schema.
    pub fn register(&mut self, def: ComponentDef) -> DefId {
        if let Some(&id) = self.by_uri.get(&def.uri) {
            return id;
        }
        let id = DefId(self.defs.len() as u32);
        self.by_uri.insert(def.uri.clone(), id);
        self.defs.push(def);
        log::trace!("registered component definition {} as {id}", self.defs[id.0 as usize].uri);
        id
    }

    /// Looks up the id assigned to a uri.
    pub fn resolve(&self, uri: &str) -> Option<DefId> {
        self.by_uri.get(uri).copied()
    }

    /// Returns the definition for an assigned id.
    pub fn def(&self, id: DefId) -> Option<&ComponentDef> {
        self.defs.get(id.0 as usize)
    }

    /// The number of registered definitions (also the width of presence
    /// bitsets).
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Returns true if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

/// The definition ids of the well-known components every store registers at
/// construction.
///
/// Kept as a plain struct of ids so hot paths never re-resolve uris.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinDefs {
    /// `topos/src` — source artifact identity.
    pub src: DefId,
    /// `topos/dep` — typed dependency edge.
    pub dep: DefId,
    /// `topos/upd` — transient change marker.
    pub upd: DefId,
    /// `topos/meta` — parser-provided attribute dictionary.
    pub meta: DefId,
    /// `topos/dest` — explicit destination url.
    pub dest: DefId,
    /// `topos/tag` — tag identity.
    pub tag: DefId,
    /// `topos/content` — raw content body.
    pub content: DefId,
    /// `topos/render` — rendered output.
    pub render: DefId,
    /// `topos/err` — structured per-entity error.
    pub err: DefId,
}

impl BuiltinDefs {
    /// Registers the well-known definitions and returns their ids.
    pub(crate) fn register(registry: &mut ComponentRegistry) -> Self {
        use PropertyType as T;
        let string = |name: &str| PropertyDef::new(name, T::String);

        Self {
            src: registry.register(ComponentDef::new(
                well_known::SRC,
                vec![string("url"), string("kind"), string("token")],
            )),
            dep: registry.register(ComponentDef::new(
                well_known::DEP,
                vec![
                    PropertyDef::new("src", T::Entity),
                    PropertyDef::new("dst", T::Entity),
                    string("kind"),
                ],
            )),
            upd: registry.register(ComponentDef::new(well_known::UPD, vec![string("op")])),
            meta: registry.register(ComponentDef::new(well_known::META, vec![])),
            dest: registry.register(ComponentDef::new(well_known::DEST, vec![string("url")])),
            tag: registry.register(ComponentDef::new(well_known::TAG, vec![string("name")])),
            content: registry.register(ComponentDef::new(
                well_known::CONTENT,
                vec![string("body")],
            )),
            render: registry.register(ComponentDef::new(
                well_known::RENDER,
                vec![string("body"), string("ext")],
            )),
            err: registry.register(ComponentDef::new(
                well_known::ERR,
                vec![string("stage"), string("message")],
            )),
        }
    }
}
