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

//! Component definitions and component instances.
//!
//! A *component definition* declares a kind of component: a stable uri, a
//! dense numeric id assigned by the registry, and a property schema. A
//! *component* is an instance of a definition attached to exactly one entity,
//! carrying an attribute map. Components are the only place data lives; an
//! entity's "type" (file, directory, tag, edge) is emergent from which
//! definitions it carries.

use crate::entity::EntityId;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A dense index identifying a registered component definition.
///
/// Assigned by the registry in registration order and used as the bit
/// position in presence bitsets. The uri ↔ id mapping is a bijection for the
/// lifetime of a store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct DefId(pub u32);

impl DefId {
    /// The bit position this definition occupies in presence bitsets.
    pub fn bit(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DefId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "def{}", self.0)
    }
}

/// The declared type of a single component property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    /// UTF-8 text.
    String,
    /// Signed integer.
    Integer,
    /// Boolean flag.
    Boolean,
    /// Datetime kept as opaque text.
    DateTime,
    /// Arbitrary structured data.
    Json,
    /// An entity-id reference. Marks properties that participate in the
    /// dependency graph (e.g. edge endpoints).
    Entity,
}

/// One named property in a component definition's schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyDef {
    /// The attribute name.
    pub name: String,
    /// The declared value type.
    pub ty: PropertyType,
}

impl PropertyDef {
    /// Creates a property declaration.
    pub fn new(name: impl Into<String>, ty: PropertyType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A component definition: the schema surface other subsystems register
/// against.
///
/// The uri is the stable external name; the dense id is assigned at
/// registration time and only meaningful within the registering store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentDef {
    /// Stable external name, unique per store.
    pub uri: String,
    /// Declared properties. Documentation for consumers; the store does not
    /// reject undeclared attributes.
    pub properties: Vec<PropertyDef>,
}

impl ComponentDef {
    /// Creates a definition with the given uri and properties.
    pub fn new(uri: impl Into<String>, properties: Vec<PropertyDef>) -> Self {
        Self {
            uri: uri.into(),
            properties,
        }
    }
}

/// A component instance: an attribute record attached to exactly one entity.
///
/// At most one component of a given definition exists per entity; attaching a
/// second replaces the first (per-def last write wins). Attribute order is
/// deterministic (`BTreeMap`) so serialized batches are reproducible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// The entity this component is attached to. [`EntityId::NONE`] in a
    /// fresh component means "create an entity for me" during a bulk add.
    pub entity: EntityId,
    /// The definition this component instantiates.
    pub def: DefId,
    /// The attribute map. The only place data lives.
    pub attributes: BTreeMap<String, Value>,
}

impl Component {
    /// Creates a component for `entity` with an empty attribute map.
    pub fn new(entity: EntityId, def: DefId) -> Self {
        Self {
            entity,
            def,
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute insertion.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Returns the attribute with the given name, if present.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

/// Well-known component uris registered by every store at construction.
///
/// The vocabulary the surrounding build tool reads and writes through the
/// component API. External subsystems may register additional definitions at
/// any time.
pub mod well_known {
    /// Source artifact identity: `url` (string), `kind` (string), `token`
    /// (string; opaque change token, equality-compared only).
    pub const SRC: &str = "topos/src";
    /// Typed dependency edge: `src` (entity), `dst` (entity), `kind`
    /// (string).
    pub const DEP: &str = "topos/dep";
    /// Transient change marker: `op` (string; see [`crate::dep::ChangeOp`]).
    pub const UPD: &str = "topos/upd";
    /// Attribute dictionary attached by external parsers (frontmatter,
    /// config files). Free-form.
    pub const META: &str = "topos/meta";
    /// Explicit destination url: `url` (string).
    pub const DEST: &str = "topos/dest";
    /// Tag identity: `name` (string).
    pub const TAG: &str = "topos/tag";
    /// Raw content produced by readers: `body` (string).
    pub const CONTENT: &str = "topos/content";
    /// Rendered output produced by the template layer: `body` (string),
    /// `ext` (string).
    pub const RENDER: &str = "topos/render";
    /// Structured per-entity error marker: `stage` (string), `message`
    /// (string).
    pub const ERR: &str = "topos/err";
}
