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

//! # Topos Core
//!
//! Foundational crate containing traits, core types, and interface contracts
//! that define the build core's architecture.

#![warn(missing_docs)]

pub mod component;
pub mod dep;
pub mod entity;
pub mod error;
pub mod graph;
pub mod store;
pub mod value;

pub use component::{Component, ComponentDef, DefId, PropertyDef, PropertyType};
pub use dep::ChangeOp;
pub use entity::EntityId;
pub use error::{StoreError, StoreResult};
pub use value::Value;
