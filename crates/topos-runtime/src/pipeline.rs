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

//! One incremental build pass over a source tree.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use topos_core::component::Component;
use topos_core::dep::{kinds, ChangeOp};
use topos_core::store::{StoreBackend, WriteBatch};
use topos_data::diff::{apply, diff, ApplyOptions, Snapshot};
use topos_data::ecs::{AddOptions, World};
use topos_data::graph::remove_entities_with_edges;
use topos_data::index::{IndexSpec, IndexStore};
use topos_data::propagate::propagate;
use topos_data::resolve::destination_path;

use crate::link::{link_directory_tree, link_layouts, link_tags};
use crate::report::{collect_errors, BuildReport};

/// The declarative source-url index every pass maintains.
pub const SRC_URL_INDEX: &str = "src_url";
/// The imperative destination-url index filled during path assignment.
pub const DEST_URL_INDEX: &str = "dest_url";

/// Knobs of a build pass.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Edge kinds that do not carry invalidation. Hyperlinks are not
    /// build-order dependencies.
    pub exclude_kinds: Vec<String>,
    /// Detach all change markers once the report is collected.
    pub clear_markers: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            exclude_kinds: vec![kinds::LINK.to_owned()],
            clear_markers: true,
        }
    }
}

/// The long-lived build state: the live store, its indexes, and the
/// persistence backend, plus the pass orchestration.
pub struct BuildPass {
    world: World,
    indexes: IndexStore,
    backend: Arc<dyn StoreBackend>,
    options: BuildOptions,
}

impl BuildPass {
    /// Creates a build pass around an empty live store.
    pub fn new(backend: Arc<dyn StoreBackend>, options: BuildOptions) -> Self {
        let world = World::new();
        let builtins = world.builtins();

        let mut indexes = IndexStore::new();
        indexes.add_index(IndexSpec {
            name: SRC_URL_INDEX.to_owned(),
            require: vec![builtins.src],
            key: (builtins.src, "url".to_owned()),
            extra: vec![(builtins.src, "token".to_owned())],
        });
        indexes.add_manual(DEST_URL_INDEX);

        Self {
            world,
            indexes,
            backend,
            options,
        }
    }

    /// The live store. External processors read changed entities and write
    /// their components back through this.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access to the live store for external processors.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// The index store. Fresh after every completed pass.
    pub fn indexes(&self) -> &IndexStore {
        &self.indexes
    }

    /// Runs one incremental pass over `root`.
    ///
    /// Scan → diff → apply (with markers, one batch) → structural linking →
    /// propagation → deferred removal (entities plus their src-side edges) →
    /// index rebuild and path assignment → backend commit → error
    /// collection. Store- and I/O-level failures abort the pass; per-entity
    /// failures end up in the report.
    pub async fn run(&mut self, root: &Path) -> anyhow::Result<BuildReport> {
        let builtins = self.world.builtins();

        // Scan: the only filesystem suspension point.
        let outcome = topos_io::scan(root.to_path_buf())
            .await
            .with_context(|| format!("scanning {}", root.display()))?;

        // Diff the live snapshot against the scan and apply. Markers ride
        // the same logical batch as the component copies.
        let live_snapshot = Snapshot::of_world(&self.world);
        let ops = diff(&live_snapshot, &outcome.snapshot);
        let changes = apply(
            &mut self.world,
            &outcome.world,
            &ops,
            ApplyOptions::default(),
        );

        // Doomed entities keep a Remove marker until deletion so their
        // dependents are reached by propagation.
        let removal_markers = changes
            .removed
            .iter()
            .map(|&id| {
                Component::new(id, builtins.upd).with("op", ChangeOp::Remove.as_str())
            })
            .collect();
        self.world
            .add_components(removal_markers, AddOptions { retain_changes: true });

        // Structural linking needs the src-url index to cover this pass's
        // additions.
        self.indexes.rebuild(&self.world);
        let src_index = self
            .indexes
            .index(SRC_URL_INDEX)
            .expect("src_url index is registered in BuildPass::new");
        link_directory_tree(&mut self.world, src_index);
        let src_index = self
            .indexes
            .index(SRC_URL_INDEX)
            .expect("src_url index is registered in BuildPass::new");
        link_layouts(&mut self.world, src_index);
        link_tags(&mut self.world);

        let exclude: Vec<&str> = self
            .options
            .exclude_kinds
            .iter()
            .map(String::as_str)
            .collect();
        let invalidated = propagate(&mut self.world, &exclude);

        // Deferred removal, with the documented edge cleanup policy.
        let removed_with_edges = remove_entities_with_edges(&mut self.world, &changes.removed);

        // Indexes are caches: stale after the apply phase, rebuilt here.
        self.indexes.rebuild(&self.world);
        if let Some(dest_index) = self.indexes.index_mut(DEST_URL_INDEX) {
            for &id in &changes.removed {
                dest_index.remove_entity(id);
            }
        }
        self.assign_destinations();

        // Markers are transient: consumed before anything is persisted, so
        // the backend never sees them.
        if self.options.clear_markers {
            self.world.clear_markers();
        }

        // Persist everything this pass touched as one batch.
        let touched = self.world.take_updated();
        let batch = WriteBatch {
            upserts: touched
                .iter()
                .flat_map(|&id| self.world.components_of(id))
                .collect(),
            removed: removed_with_edges,
        };
        self.backend
            .commit(&batch)
            .await
            .context("committing build pass batch")?;

        let report = BuildReport {
            added: changes.added.len(),
            updated: changes.updated.len(),
            removed: changes.removed.len(),
            invalidated,
            errors: collect_errors(&self.world),
        };

        log::info!(
            "build pass: +{} ~{} -{} entities, {} invalidated, {} errors",
            report.added,
            report.updated,
            report.removed,
            report.invalidated,
            report.errors.len()
        );
        Ok(report)
    }

    /// Path assignment: resolves every source entity's destination and
    /// patches the imperative dest-url index, keeping its two maps inverse.
    fn assign_destinations(&mut self) {
        let src = self.world.builtins().src;
        let entities = self.world.select_with(src);

        let mut assignments = Vec::new();
        for entity in entities {
            assignments.push((entity, destination_path(&self.world, entity)));
        }

        let dest_index = self
            .indexes
            .index_mut(DEST_URL_INDEX)
            .expect("dest_url index is registered in BuildPass::new");
        for (entity, destination) in assignments {
            match destination {
                Some(path) => dest_index.set(path, entity, Default::default()),
                // Not publishable (no destination anywhere in its chain).
                None => {
                    dest_index.remove_entity(entity);
                }
            }
        }
    }
}
