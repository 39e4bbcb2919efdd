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

//! The entity/component store.
//!
//! Entities are bare integer identities; all data lives in components, which
//! are runtime-registered attribute records. An entity's "shape" (file,
//! directory, tag, dependency edge) is emergent from which component
//! definitions it carries, answered through per-entity presence bitsets and
//! per-definition membership bitsets rather than by scanning attribute
//! values.
//!
//! The primary entry point is the [`World`] struct.

mod bitset;
mod entity_store;
mod registry;
mod store;

pub use bitset::PresenceBitset;
pub use entity_store::EntityRecord;
pub use registry::{BuiltinDefs, ComponentRegistry};
pub use store::{AddOptions, World};
