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

//! Transitive change-marker propagation.
//!
//! After a diff apply, only the entities whose backing sources changed carry
//! markers. Downstream processors need the closure: everything that depends,
//! transitively, on a changed entity must be redone too. Propagation walks
//! dependency edges backwards (provider → dependents) to a fixed point,
//! attaching each seed's op to its unmarked dependents. Markers are only
//! ever added, so the walk terminates in at most one pass per entity and is
//! safe on cyclic graphs — a cycle simply stabilizes once all its members
//! are marked.

use std::collections::HashMap;

use crate::ecs::{AddOptions, World};
use crate::graph;
use topos_core::component::Component;
use topos_core::dep::ChangeOp;
use topos_core::entity::EntityId;

/// Propagates change markers to all transitive dependents.
///
/// Edge kinds in `exclude_kinds` do not carry invalidation (the build
/// excludes `link` edges: a hyperlink is not a build-order dependency).
/// Entities already carrying a marker keep it; only unmarked dependents are
/// newly marked, with the same op as the entity that reached them.
///
/// Returns the number of entities newly marked.
pub fn propagate(world: &mut World, exclude_kinds: &[&str]) -> usize {
    // Reverse adjacency, built once per pass: provider -> dependents.
    let mut dependents: HashMap<EntityId, Vec<EntityId>> = HashMap::new();
    for edge in graph::edges(world) {
        if !exclude_kinds.contains(&edge.kind.as_str()) {
            dependents.entry(edge.dst).or_default().push(edge.src);
        }
    }

    let mut marked: HashMap<EntityId, ChangeOp> = world.marked_entities().into_iter().collect();
    let mut frontier: Vec<(EntityId, ChangeOp)> =
        marked.iter().map(|(&id, &op)| (id, op)).collect();
    let mut newly_marked = 0;

    while !frontier.is_empty() {
        let mut next: Vec<(EntityId, ChangeOp)> = Vec::new();
        for &(id, op) in &frontier {
            for &dependent in dependents.get(&id).into_iter().flatten() {
                if !marked.contains_key(&dependent) {
                    marked.insert(dependent, op);
                    next.push((dependent, op));
                }
            }
        }

        if !next.is_empty() {
            let upd = world.builtins().upd;
            let markers = next
                .iter()
                .map(|&(id, op)| Component::new(id, upd).with("op", op.as_str()))
                .collect();
            world.add_components(markers, AddOptions { retain_changes: true });
            newly_marked += next.len();
        }
        frontier = next;
    }

    log::debug!("propagation marked {newly_marked} additional entities");
    newly_marked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::insert_dependency;
    use topos_core::dep::kinds;

    fn mark(world: &mut World, id: EntityId, op: ChangeOp) {
        let upd = world.builtins().upd;
        world.add_components(
            vec![Component::new(id, upd).with("op", op.as_str())],
            AddOptions { retain_changes: true },
        );
    }

    #[test]
    fn closure_covers_transitive_dependents_and_nothing_else() {
        let mut world = World::new();
        let a = world.create_entity();
        let b = world.create_entity();
        let c = world.create_entity();
        let unrelated = world.create_entity();
        // A depends on B depends on C.
        insert_dependency(&mut world, a, b, kinds::LAYOUT);
        insert_dependency(&mut world, b, c, kinds::LAYOUT);

        mark(&mut world, c, ChangeOp::Update);
        let newly = propagate(&mut world, &[]);

        assert_eq!(newly, 2);
        assert_eq!(world.marker_of(a), Some(ChangeOp::Update));
        assert_eq!(world.marker_of(b), Some(ChangeOp::Update));
        assert_eq!(world.marker_of(c), Some(ChangeOp::Update));
        assert_eq!(world.marker_of(unrelated), None);
    }

    #[test]
    fn excluded_kinds_do_not_carry_invalidation() {
        let mut world = World::new();
        let page = world.create_entity();
        let target = world.create_entity();
        insert_dependency(&mut world, page, target, kinds::LINK);

        mark(&mut world, target, ChangeOp::Update);
        let newly = propagate(&mut world, &[kinds::LINK]);

        assert_eq!(newly, 0);
        assert_eq!(world.marker_of(page), None);
    }

    #[test]
    fn existing_markers_are_not_overwritten() {
        let mut world = World::new();
        let a = world.create_entity();
        let b = world.create_entity();
        insert_dependency(&mut world, a, b, kinds::IMPORT);

        mark(&mut world, a, ChangeOp::Add);
        mark(&mut world, b, ChangeOp::Update);
        propagate(&mut world, &[]);

        // `a` was already marked Add; the Update arriving from `b` must not
        // replace it.
        assert_eq!(world.marker_of(a), Some(ChangeOp::Add));
    }

    #[test]
    fn terminates_on_cycles() {
        let mut world = World::new();
        let a = world.create_entity();
        let b = world.create_entity();
        let c = world.create_entity();
        insert_dependency(&mut world, a, b, kinds::IMPORT);
        insert_dependency(&mut world, b, c, kinds::IMPORT);
        insert_dependency(&mut world, c, a, kinds::IMPORT);

        mark(&mut world, a, ChangeOp::Update);
        let newly = propagate(&mut world, &[]);

        assert_eq!(newly, 2, "the cycle stabilizes once every member is marked");
        for id in [a, b, c] {
            assert_eq!(world.marker_of(id), Some(ChangeOp::Update));
        }
    }
}
