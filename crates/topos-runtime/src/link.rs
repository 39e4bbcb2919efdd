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

//! Graph-building processors.
//!
//! These run after every apply phase and observe structural relationships —
//! directory containment, declared layouts, tag membership — turning them
//! into dependency edges. All of them are idempotent: edge insertion is
//! find-or-create, so a pass over an unchanged store creates nothing.

use std::collections::HashMap;

use topos_core::component::Component;
use topos_core::dep::kinds;
use topos_core::entity::EntityId;
use topos_core::value::Value;
use topos_data::ecs::{AddOptions, World};
use topos_data::graph::insert_dependency;
use topos_data::index::Index;

/// Links every source entity to its containing directory with a `dir` edge.
///
/// The parent is found by url in the src-url index; entities whose parent
/// url is outside the scanned tree (the scan root itself) are left without a
/// parent. Returns the number of edges ensured.
pub fn link_directory_tree(world: &mut World, src_index: &Index) -> usize {
    let src = world.builtins().src;
    let mut linked = 0;

    for entity in world.select_with(src) {
        let Some(url) = world
            .attribute(entity, src, "url")
            .and_then(Value::as_str)
            .map(str::to_owned)
        else {
            continue;
        };
        let Some(parent_url) = parent_url(&url) else {
            continue;
        };
        let Some(parent) = src_index.get(&parent_url).map(|entry| entry.entity) else {
            continue;
        };
        if insert_dependency(world, entity, parent, kinds::DIR).is_some() {
            linked += 1;
        }
    }

    log::debug!("dir linking ensured {linked} edges");
    linked
}

/// Links every page declaring `meta.layout` to the named layout source.
///
/// The declared value is a source url resolved through the src-url index. A
/// layout that cannot be located is fatal to that page's processing — the
/// page gets a structured `topos/err` component — but never to the build.
pub fn link_layouts(world: &mut World, src_index: &Index) -> usize {
    let builtins = world.builtins();
    let mut linked = 0;
    let mut failures: Vec<(EntityId, String)> = Vec::new();

    for entity in world.select_with(builtins.meta) {
        let Some(layout_url) = world
            .attribute(entity, builtins.meta, "layout")
            .and_then(Value::as_str)
            .map(str::to_owned)
        else {
            continue;
        };
        match src_index.get(&layout_url) {
            Some(entry) => {
                insert_dependency(world, entity, entry.entity, kinds::LAYOUT);
                linked += 1;
            }
            None => failures.push((entity, layout_url)),
        }
    }

    for (entity, layout_url) in failures {
        log::warn!("layout {layout_url} declared by {entity} cannot be located");
        world.add_components(
            vec![Component::new(entity, builtins.err)
                .with("stage", "link")
                .with("message", format!("layout not found: {layout_url}"))],
            AddOptions { retain_changes: true },
        );
    }

    linked
}

/// Links every page declaring `meta.tags` to its tag entities.
///
/// Tag entities (`topos/tag` with a `name`) are found or created on demand;
/// membership is a `tag` edge page → tag. Returns the number of memberships
/// ensured.
pub fn link_tags(world: &mut World) -> usize {
    let builtins = world.builtins();

    // Existing tag entities by name, so repeated passes reuse them.
    let mut tags_by_name: HashMap<String, EntityId> = world
        .select_with(builtins.tag)
        .into_iter()
        .filter_map(|id| {
            let name = world
                .attribute(id, builtins.tag, "name")?
                .as_str()?
                .to_owned();
            Some((name, id))
        })
        .collect();

    let mut memberships: Vec<(EntityId, String)> = Vec::new();
    for entity in world.select_with(builtins.meta) {
        let Some(declared) = world
            .attribute(entity, builtins.meta, "tags")
            .and_then(Value::as_json)
        else {
            continue;
        };
        let Some(names) = declared.as_array() else {
            continue;
        };
        for name in names.iter().filter_map(|name| name.as_str()) {
            memberships.push((entity, name.to_owned()));
        }
    }

    let mut linked = 0;
    for (page, name) in memberships {
        let tag_entity = match tags_by_name.get(&name) {
            Some(&id) => id,
            None => {
                let id = world.add_components(
                    vec![Component::new(EntityId::NONE, builtins.tag).with("name", name.as_str())],
                    AddOptions { retain_changes: true },
                )[0];
                tags_by_name.insert(name.clone(), id);
                id
            }
        };
        if insert_dependency(world, page, tag_entity, kinds::TAG).is_some() {
            linked += 1;
        }
    }

    linked
}

/// The url of a source's containing directory, if it has one.
///
/// `file:///a/b/c.mdx` → `file:///a/b/`; `file:///a/b/` → `file:///a/`.
/// Returns `None` at the url scheme boundary.
fn parent_url(url: &str) -> Option<String> {
    let trimmed = url.strip_suffix('/').unwrap_or(url);
    let slash_idx = trimmed.rfind('/')?;
    let parent = &trimmed[..=slash_idx];
    // Do not walk above the authority part of a file url.
    if parent.ends_with("://") {
        return None;
    }
    Some(parent.to_owned())
}
