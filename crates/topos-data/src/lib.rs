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

//! # Topos Data
//!
//! The bookkeeping layer of the build tool: the entity/component store
//! ([`ecs::World`]), typed dependency edges stored as entities
//! ([`graph`]), derived lookup tables ([`index`]), snapshot diffing
//! ([`diff`]), change propagation ([`propagate`]), and destination/meta
//! resolution ([`resolve`]).
//!
//! Everything in this crate is synchronous and in-memory; durable storage
//! hangs off the [`store::MemoryBackend`] seam defined in `topos-core`.

pub mod diff;
pub mod ecs;
pub mod graph;
pub mod index;
pub mod propagate;
pub mod resolve;
pub mod store;
