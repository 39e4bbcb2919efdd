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

//! Typed dependency edges between entities.
//!
//! An edge is an ordinary entity carrying a `topos/dep` component with
//! `src`, `dst`, and `kind` attributes; everything here is expressed through
//! the store's add/select/remove primitives. `dst` is the provider side: "A
//! depends on B" is an edge with `src = A`, `dst = B`.

use std::collections::{HashMap, HashSet};

use crate::ecs::{AddOptions, World};
use topos_core::component::Component;
use topos_core::entity::EntityId;
use topos_core::graph::{expand_frontier, follow_chain};

/// One dependency edge, decoded from its edge entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepEdge {
    /// The edge entity itself.
    pub edge: EntityId,
    /// The dependent entity.
    pub src: EntityId,
    /// The provider entity.
    pub dst: EntityId,
    /// The edge kind (open vocabulary, see `topos_core::dep::kinds`).
    pub kind: String,
}

/// Decodes every dependency edge currently in the store, in edge-id order.
pub fn edges(world: &World) -> Vec<DepEdge> {
    let dep = world.builtins().dep;
    world
        .select_with(dep)
        .into_iter()
        .filter_map(|edge| {
            let component = world.component(edge, dep)?;
            Some(DepEdge {
                edge,
                src: component.attribute("src")?.as_entity()?,
                dst: component.attribute("dst")?.as_entity()?,
                kind: component.attribute("kind")?.as_str()?.to_owned(),
            })
        })
        .collect()
}

/// Finds or creates the edge `(src, dst, kind)` and returns its edge entity.
///
/// Insertion is idempotent: at most one edge entity exists per triple, so
/// repeated graph-building passes over an unchanged tree create nothing.
/// Invalid input — a self-loop or a sentinel endpoint — returns
/// [`EntityId::NONE`] without creating anything; bulk loops need no per-edge
/// error handling.
pub fn insert_dependency(world: &mut World, src: EntityId, dst: EntityId, kind: &str) -> EntityId {
    if src == dst || src.is_none() || dst.is_none() {
        log::debug!("rejected dependency {src} -> {dst} ({kind})");
        return EntityId::NONE;
    }

    let dep = world.builtins().dep;
    for existing in edges(world) {
        if existing.src == src && existing.dst == dst && existing.kind == kind {
            return existing.edge;
        }
    }

    let component = Component::new(EntityId::NONE, dep)
        .with("src", src)
        .with("dst", dst)
        .with("kind", kind);
    // Edges are created by graph-building processors mid-pass; never reset
    // the ongoing batch.
    let written = world.add_components(vec![component], AddOptions { retain_changes: true });
    let edge = written[0];
    log::trace!("inserted dependency {src} -> {dst} ({kind}) as {edge}");
    edge
}

/// Removes the first edge with the given `src` and `kind`.
///
/// Returns `true` if an edge was removed.
pub fn remove_dependency(world: &mut World, src: EntityId, kind: &str) -> bool {
    let edge = edges(world)
        .into_iter()
        .find(|edge| edge.src == src && edge.kind == kind);
    match edge {
        Some(edge) => {
            world.remove_entities(&[edge.edge]);
            true
        }
        None => false,
    }
}

/// The `dst` of the edge with the given `src` and `kind`, or
/// [`EntityId::NONE`].
///
/// By construction there is at most one `dir` parent per entity; the store
/// does not enforce this structurally, and if several edges match, the one
/// with the lowest edge id wins.
pub fn parent_of(world: &World, entity: EntityId, kind: &str) -> EntityId {
    edges(world)
        .into_iter()
        .find(|edge| edge.src == entity && edge.kind == kind)
        .map(|edge| edge.dst)
        .unwrap_or(EntityId::NONE)
}

/// The chain of ancestors of `entity` along `kind` edges, nearest first.
///
/// Terminates on a malformed (cyclic) chain without revisiting an id.
pub fn ancestors(world: &World, entity: EntityId, kind: &str) -> Vec<EntityId> {
    follow_chain(entity, |node| {
        let parent = parent_of(world, node, kind);
        parent.is_some().then_some(parent)
    })
}

/// All entities reachable by walking `kind` edges *backwards* (provider to
/// dependents) from `entity`, bounded by `max_depth`, in breadth-first
/// order. For `dir` edges this is "the directory's contents".
pub fn descendants(world: &World, entity: EntityId, kind: &str, max_depth: usize) -> Vec<EntityId> {
    let mut children: HashMap<EntityId, Vec<EntityId>> = HashMap::new();
    for edge in edges(world) {
        if edge.kind == kind {
            children.entry(edge.dst).or_default().push(edge.src);
        }
    }
    expand_frontier(&[entity], max_depth, |node| {
        children.get(&node).cloned().unwrap_or_default()
    })
}

/// Entities that have a `kind` parent but are nobody's `kind` parent — the
/// set difference of all `src` and all `dst` values, ascending.
pub fn leaves(world: &World, kind: &str) -> Vec<EntityId> {
    let mut srcs: HashSet<EntityId> = HashSet::new();
    let mut dsts: HashSet<EntityId> = HashSet::new();
    for edge in edges(world) {
        if edge.kind == kind {
            srcs.insert(edge.src);
            dsts.insert(edge.dst);
        }
    }
    let mut result: Vec<EntityId> = srcs.difference(&dsts).copied().collect();
    result.sort_unstable();
    result
}

/// All entities that depend on `dst` through a non-excluded edge kind.
pub fn dependents_of(world: &World, dst: EntityId, exclude_kinds: &[&str]) -> Vec<EntityId> {
    edges(world)
        .into_iter()
        .filter(|edge| edge.dst == dst && !exclude_kinds.contains(&edge.kind.as_str()))
        .map(|edge| edge.src)
        .collect()
}

/// Entities carrying *every* named tag (AND semantics).
///
/// Each name is resolved to its tag entity; the `src` sets of `tag`-kind
/// edges pointing at the resolved entities are intersected. A name that
/// resolves to no tag entity short-circuits the whole query to empty.
pub fn tagged_with_all(world: &World, names: &[&str]) -> Vec<EntityId> {
    if names.is_empty() {
        return Vec::new();
    }

    let tag_def = world.builtins().tag;
    let mut combined: Option<HashSet<EntityId>> = None;

    for name in names {
        let Some(tag_entity) = world.select_with(tag_def).into_iter().find(|&id| {
            world
                .attribute(id, tag_def, "name")
                .and_then(topos_core::Value::as_str)
                == Some(name)
        }) else {
            return Vec::new();
        };

        let members: HashSet<EntityId> = edges(world)
            .into_iter()
            .filter(|edge| edge.kind == topos_core::dep::kinds::TAG && edge.dst == tag_entity)
            .map(|edge| edge.src)
            .collect();

        combined = Some(match combined {
            None => members,
            Some(current) => current.intersection(&members).copied().collect(),
        });
    }

    let mut result: Vec<EntityId> = combined.unwrap_or_default().into_iter().collect();
    result.sort_unstable();
    result
}

/// Removes entities together with the dependency edges *they* own.
///
/// The documented cleanup policy: an entity's src-side edges (edges where it
/// is the dependent) go with it; edges pointing *at* it are left in place as
/// tombstones, to be cleaned up when their own src entity is rescanned or
/// removed. Dependents of a removed entity are never removed here, only
/// marked by propagation.
///
/// Returns every id actually removed — the given entities plus their owned
/// edge entities — so callers can mirror the removal into a persistence
/// batch.
pub fn remove_entities_with_edges(world: &mut World, ids: &[EntityId]) -> Vec<EntityId> {
    let doomed: HashSet<EntityId> = ids.iter().copied().collect();
    let owned_edges: Vec<EntityId> = edges(world)
        .into_iter()
        .filter(|edge| doomed.contains(&edge.src))
        .map(|edge| edge.edge)
        .collect();
    log::debug!(
        "removing {} entities and {} owned edges",
        ids.len(),
        owned_edges.len()
    );
    world.remove_entities(&owned_edges);
    world.remove_entities(ids);

    let mut removed = owned_edges;
    removed.extend_from_slice(ids);
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use topos_core::dep::kinds;

    fn spawn(world: &mut World) -> EntityId {
        world.create_entity()
    }

    #[test]
    fn insert_dependency_is_idempotent() {
        let mut world = World::new();
        let a = spawn(&mut world);
        let b = spawn(&mut world);

        let first = insert_dependency(&mut world, a, b, kinds::DIR);
        let second = insert_dependency(&mut world, a, b, kinds::DIR);
        assert!(first.is_some());
        assert_eq!(first, second, "the same triple must reuse its edge");

        let dir_edges: Vec<_> = edges(&world)
            .into_iter()
            .filter(|edge| edge.kind == kinds::DIR)
            .collect();
        assert_eq!(dir_edges.len(), 1, "exactly one edge entity may exist");
    }

    #[test]
    fn self_loops_and_sentinel_endpoints_are_rejected() {
        let mut world = World::new();
        let a = spawn(&mut world);

        let before = world.entity_count();
        assert_eq!(insert_dependency(&mut world, a, a, kinds::DIR), EntityId::NONE);
        assert_eq!(
            insert_dependency(&mut world, EntityId::NONE, a, kinds::DIR),
            EntityId::NONE
        );
        assert_eq!(
            insert_dependency(&mut world, a, EntityId::NONE, kinds::DIR),
            EntityId::NONE
        );
        assert_eq!(world.entity_count(), before, "no edge entity was created");
    }

    #[test]
    fn ancestors_walks_nearest_to_furthest_and_terminates() {
        let mut world = World::new();
        let root = spawn(&mut world);
        let dir1 = spawn(&mut world);
        let file = spawn(&mut world);
        insert_dependency(&mut world, dir1, root, kinds::DIR);
        insert_dependency(&mut world, file, dir1, kinds::DIR);

        assert_eq!(ancestors(&world, file, kinds::DIR), vec![dir1, root]);
        assert_eq!(ancestors(&world, root, kinds::DIR), vec![]);
    }

    #[test]
    fn ancestors_survives_a_cyclic_chain() {
        let mut world = World::new();
        let a = spawn(&mut world);
        let b = spawn(&mut world);
        insert_dependency(&mut world, a, b, kinds::DIR);
        insert_dependency(&mut world, b, a, kinds::DIR);

        // Must terminate and never revisit an id already returned.
        assert_eq!(ancestors(&world, a, kinds::DIR), vec![b]);
    }

    #[test]
    fn descendants_expands_breadth_first_with_depth_bound() {
        let mut world = World::new();
        let root = spawn(&mut world);
        let dir1 = spawn(&mut world);
        let file = spawn(&mut world);
        insert_dependency(&mut world, dir1, root, kinds::DIR);
        insert_dependency(&mut world, file, dir1, kinds::DIR);

        assert_eq!(descendants(&world, root, kinds::DIR, 1), vec![dir1]);
        assert_eq!(descendants(&world, root, kinds::DIR, 8), vec![dir1, file]);
    }

    #[test]
    fn leaves_are_parents_of_nobody() {
        let mut world = World::new();
        let root = spawn(&mut world);
        let dir1 = spawn(&mut world);
        let dir2 = spawn(&mut world);
        let file_a = spawn(&mut world);
        let file_b = spawn(&mut world);
        insert_dependency(&mut world, dir1, root, kinds::DIR);
        insert_dependency(&mut world, dir2, dir1, kinds::DIR);
        insert_dependency(&mut world, file_a, dir2, kinds::DIR);
        insert_dependency(&mut world, file_b, dir2, kinds::DIR);

        assert_eq!(leaves(&world, kinds::DIR), vec![file_a, file_b]);
    }

    #[test]
    fn remove_dependency_removes_only_the_first_match() {
        let mut world = World::new();
        let a = spawn(&mut world);
        let b = spawn(&mut world);
        let c = spawn(&mut world);
        insert_dependency(&mut world, a, b, kinds::CSS);
        insert_dependency(&mut world, a, c, kinds::CSS);

        assert!(remove_dependency(&mut world, a, kinds::CSS));
        let remaining: Vec<_> = edges(&world)
            .into_iter()
            .filter(|edge| edge.kind == kinds::CSS)
            .collect();
        assert_eq!(remaining.len(), 1);
        assert!(!remove_dependency(&mut world, b, kinds::CSS));
    }

    #[test]
    fn tagged_with_all_intersects_and_short_circuits() {
        let mut world = World::new();
        let tag_def = world.builtins().tag;

        let tag_x = world.add_components(
            vec![Component::new(EntityId::NONE, tag_def).with("name", "x")],
            AddOptions::default(),
        )[0];
        let tag_y = world.add_components(
            vec![Component::new(EntityId::NONE, tag_def).with("name", "y")],
            AddOptions::default(),
        )[0];

        let both = spawn(&mut world);
        let only_x = spawn(&mut world);
        insert_dependency(&mut world, both, tag_x, kinds::TAG);
        insert_dependency(&mut world, both, tag_y, kinds::TAG);
        insert_dependency(&mut world, only_x, tag_x, kinds::TAG);

        assert_eq!(tagged_with_all(&world, &["x", "y"]), vec![both]);
        let mut with_x = tagged_with_all(&world, &["x"]);
        with_x.sort_unstable();
        assert_eq!(with_x, vec![both, only_x]);
        assert_eq!(
            tagged_with_all(&world, &["z"]),
            vec![],
            "an unresolvable tag empties the whole query"
        );
        assert_eq!(
            tagged_with_all(&world, &["x", "z"]),
            vec![],
            "AND semantics, not best effort"
        );
    }

    #[test]
    fn dependents_respect_kind_exclusion() {
        let mut world = World::new();
        let page = spawn(&mut world);
        let other = spawn(&mut world);
        let layout = spawn(&mut world);
        insert_dependency(&mut world, page, layout, kinds::LAYOUT);
        insert_dependency(&mut world, other, layout, kinds::LINK);

        let mut all = dependents_of(&world, layout, &[]);
        all.sort_unstable();
        assert_eq!(all, vec![page, other]);
        assert_eq!(
            dependents_of(&world, layout, &[kinds::LINK]),
            vec![page],
            "excluded kinds never count as dependents"
        );
    }

    #[test]
    fn remove_entities_with_edges_drops_src_side_edges_only() {
        let mut world = World::new();
        let a = spawn(&mut world);
        let b = spawn(&mut world);
        let c = spawn(&mut world);
        insert_dependency(&mut world, a, b, kinds::DIR); // owned by a
        insert_dependency(&mut world, c, a, kinds::LINK); // points at a

        remove_entities_with_edges(&mut world, &[a]);

        let remaining = edges(&world);
        assert_eq!(remaining.len(), 1, "a's own edge went with it");
        assert_eq!(remaining[0].kind, kinds::LINK);
        assert_eq!(
            remaining[0].dst, a,
            "the edge pointing at the removed entity stays as a tombstone"
        );
        assert!(world.get(a).is_none());
    }
}
