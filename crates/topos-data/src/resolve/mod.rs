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

//! Destination-path assignment and meta inheritance.
//!
//! Both walk the `dir` ancestor chain. A destination is assembled from
//! explicit `topos/dest` urls where present and directory-name fragments
//! where not; meta dictionaries fold together nearest-wins.

use std::collections::BTreeMap;

use crate::ecs::World;
use crate::graph::ancestors;
use topos_core::dep::kinds;
use topos_core::entity::EntityId;
use topos_core::value::Value;

/// Resolves the output path of an entity, walking `dir` parents upward.
///
/// At each step the entity contributes one fragment: its explicit
/// `topos/dest` url if it carries one, otherwise a directory-name fragment
/// derived from its source url. An absolute destination (leading `/`) stops
/// the walk; further ancestors are ignored. The first filename-bearing
/// fragment — necessarily on the starting entity, ancestors only ever
/// contribute directory parts — becomes the final filename, with its
/// extension swapped for the `topos/render` `ext` when the entity carries
/// rendered output.
///
/// Returns `None` when no destination component exists anywhere in the
/// chain: such an entity is not publishable.
pub fn destination_path(world: &World, start: EntityId) -> Option<String> {
    let dest = world.builtins().dest;

    let mut dir_fragments: Vec<String> = Vec::new();
    let mut filename: Option<String> = None;
    let mut saw_dest = false;

    let chain = std::iter::once(start).chain(ancestors(world, start, kinds::DIR));
    for (step, entity) in chain.enumerate() {
        let first = step == 0;

        if let Some(url) = world.attribute(entity, dest, "url").and_then(Value::as_str) {
            saw_dest = true;
            let (dir_part, file_part) = split_fragment(url);
            if first && !file_part.is_empty() {
                filename = Some(file_part.to_owned());
            }
            if !dir_part.is_empty() {
                dir_fragments.push(dir_part.to_owned());
            }
            if url.starts_with('/') {
                break;
            }
        } else if first {
            match source_name(world, entity) {
                Some(SourceName::File(name)) => filename = Some(name),
                Some(SourceName::Dir(name)) => dir_fragments.push(name),
                None => {}
            }
        } else if let Some(SourceName::Dir(name) | SourceName::File(name)) =
            source_name(world, entity)
        {
            // Ancestors contribute directory fragments only.
            dir_fragments.push(ensure_trailing_slash(name));
        }
    }

    if !saw_dest {
        return None;
    }

    let mut path = String::new();
    for fragment in dir_fragments.iter().rev() {
        path.push_str(fragment);
    }
    if let Some(name) = filename {
        path.push_str(&name);
    }
    Some(path)
}

/// Collects the meta dictionaries along the `dir` chain and folds them
/// nearest-wins: the entity's own meta overrides its parent's, which
/// overrides the grandparent's.
pub fn inherited_meta(world: &World, entity: EntityId) -> BTreeMap<String, Value> {
    let meta = world.builtins().meta;

    let mut folded = BTreeMap::new();
    let chain = ancestors(world, entity, kinds::DIR);
    for ancestor in chain.iter().rev().chain(std::iter::once(&entity)) {
        if let Some(component) = world.component(*ancestor, meta) {
            for (name, value) in &component.attributes {
                folded.insert(name.clone(), value.clone());
            }
        }
    }
    folded
}

enum SourceName {
    /// The last segment of a file url, with the render extension applied.
    File(String),
    /// The last segment of a directory url, trailing slash included.
    Dir(String),
}

/// Derives a path fragment from an entity's source url.
fn source_name(world: &World, entity: EntityId) -> Option<SourceName> {
    let builtins = world.builtins();
    let url = world
        .attribute(entity, builtins.src, "url")
        .and_then(Value::as_str)?;

    if let Some(dir_url) = url.strip_suffix('/') {
        let name = dir_url.rsplit('/').next().unwrap_or_default();
        if name.is_empty() {
            return None;
        }
        return Some(SourceName::Dir(format!("{name}/")));
    }

    let name = url.rsplit('/').next().unwrap_or_default();
    if name.is_empty() {
        return None;
    }
    let rendered_ext = world
        .attribute(entity, builtins.render, "ext")
        .and_then(Value::as_str);
    let name = match (rendered_ext, name.rsplit_once('.')) {
        (Some(ext), Some((stem, _))) => format!("{stem}.{ext}"),
        _ => name.to_owned(),
    };
    Some(SourceName::File(name))
}

/// Splits a destination url into its directory part (up to and including the
/// last `/`) and filename part.
fn split_fragment(url: &str) -> (&str, &str) {
    match url.rfind('/') {
        Some(slash_idx) => url.split_at(slash_idx + 1),
        None => ("", url),
    }
}

fn ensure_trailing_slash(name: String) -> String {
    if name.ends_with('/') {
        name
    } else {
        format!("{name}/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::AddOptions;
    use crate::graph::insert_dependency;
    use topos_core::component::Component;

    fn add_src(world: &mut World, url: &str) -> EntityId {
        let src = world.builtins().src;
        world.add_components(
            vec![Component::new(EntityId::NONE, src)
                .with("url", url)
                .with("token", "t")],
            AddOptions::default(),
        )[0]
    }

    fn set_dest(world: &mut World, id: EntityId, url: &str) {
        let dest = world.builtins().dest;
        world.add_components(
            vec![Component::new(id, dest).with("url", url)],
            AddOptions { retain_changes: true },
        );
    }

    #[test]
    fn no_destination_anywhere_means_not_publishable() {
        let mut world = World::new();
        let dir = add_src(&mut world, "file:///pages/");
        let file = add_src(&mut world, "file:///pages/a.mdx");
        insert_dependency(&mut world, file, dir, kinds::DIR);

        assert_eq!(destination_path(&world, file), None);
    }

    #[test]
    fn absolute_ancestor_destination_stops_the_walk() {
        let mut world = World::new();
        let root = add_src(&mut world, "file:///root/");
        let pages = add_src(&mut world, "file:///root/pages/");
        let file = add_src(&mut world, "file:///root/pages/a.mdx");
        insert_dependency(&mut world, pages, root, kinds::DIR);
        insert_dependency(&mut world, file, pages, kinds::DIR);

        set_dest(&mut world, pages, "/site/");
        // This must never appear in the result: the walk stops at /site/.
        set_dest(&mut world, root, "/elsewhere/");

        assert_eq!(destination_path(&world, file), Some("/site/a.mdx".into()));
    }

    #[test]
    fn intermediate_directories_contribute_name_fragments() {
        let mut world = World::new();
        let root = add_src(&mut world, "file:///root/");
        let sub = add_src(&mut world, "file:///root/sub/");
        let file = add_src(&mut world, "file:///root/sub/a.mdx");
        insert_dependency(&mut world, sub, root, kinds::DIR);
        insert_dependency(&mut world, file, sub, kinds::DIR);
        set_dest(&mut world, root, "/site/");

        assert_eq!(
            destination_path(&world, file),
            Some("/site/sub/a.mdx".into())
        );
    }

    #[test]
    fn rendered_extension_replaces_the_source_extension() {
        let mut world = World::new();
        let render = world.builtins().render;
        let pages = add_src(&mut world, "file:///pages/");
        let file = add_src(&mut world, "file:///pages/index.mdx");
        insert_dependency(&mut world, file, pages, kinds::DIR);
        set_dest(&mut world, pages, "/site/");
        world.add_components(
            vec![Component::new(file, render).with("ext", "html")],
            AddOptions { retain_changes: true },
        );

        assert_eq!(
            destination_path(&world, file),
            Some("/site/index.html".into())
        );
    }

    #[test]
    fn own_destination_wins_as_filename() {
        let mut world = World::new();
        let pages = add_src(&mut world, "file:///pages/");
        let file = add_src(&mut world, "file:///pages/a.mdx");
        insert_dependency(&mut world, file, pages, kinds::DIR);
        set_dest(&mut world, pages, "/site/");
        set_dest(&mut world, file, "custom.html");

        assert_eq!(
            destination_path(&world, file),
            Some("/site/custom.html".into())
        );
    }

    #[test]
    fn meta_folds_nearest_wins() {
        let mut world = World::new();
        let meta = world.builtins().meta;
        let root = add_src(&mut world, "file:///root/");
        let sub = add_src(&mut world, "file:///root/sub/");
        let file = add_src(&mut world, "file:///root/sub/a.mdx");
        insert_dependency(&mut world, sub, root, kinds::DIR);
        insert_dependency(&mut world, file, sub, kinds::DIR);

        world.add_components(
            vec![
                Component::new(root, meta)
                    .with("author", "root")
                    .with("lang", "en"),
                Component::new(sub, meta).with("author", "sub"),
                Component::new(file, meta).with("title", "A"),
            ],
            AddOptions { retain_changes: true },
        );

        let folded = inherited_meta(&world, file);
        assert_eq!(folded.get("author"), Some(&Value::String("sub".into())));
        assert_eq!(folded.get("lang"), Some(&Value::String("en".into())));
        assert_eq!(folded.get("title"), Some(&Value::String("A".into())));
    }
}
