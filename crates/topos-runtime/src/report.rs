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

//! The build-pass report and the error collection pass.

use serde::Serialize;
use topos_core::entity::EntityId;
use topos_core::value::Value;
use topos_data::ecs::World;

/// One entity-level failure, lifted out of its `topos/err` component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityError {
    /// The entity the failure is attached to.
    pub entity: EntityId,
    /// The stage that failed (`scan`, `link`, ...).
    pub stage: String,
    /// The underlying message.
    pub message: String,
}

/// What one build pass did.
///
/// A pass that completes with a non-empty `errors` list still counts as
/// succeeded — per-entity failures never abort the build, they are surfaced
/// here.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    /// Entities created for newly appeared sources.
    pub added: usize,
    /// Entities refreshed for changed sources.
    pub updated: usize,
    /// Entities removed for disappeared sources.
    pub removed: usize,
    /// Entities additionally marked by propagation.
    pub invalidated: usize,
    /// Every entity carrying an error marker at the end of the pass.
    pub errors: Vec<EntityError>,
}

impl BuildReport {
    /// Returns `true` if the pass finished but some entities failed.
    pub fn succeeded_with_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Collects every entity carrying a `topos/err` component.
pub fn collect_errors(world: &World) -> Vec<EntityError> {
    let err = world.builtins().err;
    world
        .select_with(err)
        .into_iter()
        .map(|entity| EntityError {
            entity,
            stage: world
                .attribute(entity, err, "stage")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_owned(),
            message: world
                .attribute(entity, err, "message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
        })
        .collect()
}
