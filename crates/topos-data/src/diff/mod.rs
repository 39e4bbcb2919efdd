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

//! Snapshot comparison and the incremental apply phase.
//!
//! Two stores never share an id space: the live store survives across
//! builds while the scan store is rebuilt from the filesystem every pass.
//! Rows are therefore correlated by a *stable key* (the source url) and
//! compared through an opaque *change token* (the mtime) — token equality is
//! the sole trigger; component-level diffing is intentionally not attempted,
//! keeping change detection O(1) per entity.

use std::collections::HashMap;

use crate::ecs::{AddOptions, PresenceBitset, World};
use topos_core::component::Component;
use topos_core::dep::ChangeOp;
use topos_core::entity::EntityId;
use topos_core::value::Value;

/// One comparable row of a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRow {
    /// The stable, rebuild-durable identifier (e.g. `file:///a/b.mdx`;
    /// directories end in `/`).
    pub key: String,
    /// The entity id in the snapshot's own store.
    pub entity: EntityId,
    /// Opaque change token, compared for equality only.
    pub token: String,
    /// The entity's presence bitset at snapshot time.
    pub presence: PresenceBitset,
}

/// An ordered, key-addressable list of snapshot rows.
#[derive(Debug, Default)]
pub struct Snapshot {
    rows: Vec<SnapshotRow>,
    by_key: HashMap<String, usize>,
}

impl Snapshot {
    /// Builds a snapshot from rows. Later duplicates of a key displace
    /// earlier ones in the key map.
    pub fn from_rows(rows: Vec<SnapshotRow>) -> Self {
        let by_key = rows
            .iter()
            .enumerate()
            .map(|(row_idx, row)| (row.key.clone(), row_idx))
            .collect();
        Self { rows, by_key }
    }

    /// Projects every `topos/src`-carrying entity of a store into a
    /// snapshot, in id order.
    pub fn of_world(world: &World) -> Self {
        let src = world.builtins().src;
        let rows = world
            .select_with(src)
            .into_iter()
            .filter_map(|id| {
                let key = world.attribute(id, src, "url")?.as_str()?.to_owned();
                let token = world
                    .attribute(id, src, "token")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned();
                let presence = world.get(id)?.presence().clone();
                Some(SnapshotRow {
                    key,
                    entity: id,
                    token,
                    presence,
                })
            })
            .collect();
        Self::from_rows(rows)
    }

    /// The rows, in construction order.
    pub fn rows(&self) -> &[SnapshotRow] {
        &self.rows
    }

    /// Looks up a row by stable key.
    pub fn get(&self, key: &str) -> Option<&SnapshotRow> {
        self.by_key.get(key).map(|&row_idx| &self.rows[row_idx])
    }
}

/// One change operation produced by [`diff`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffOp {
    /// The key exists only in the scan: a new source appeared.
    Add {
        /// The entity in the scan store.
        scan: EntityId,
    },
    /// The key exists on both sides but the tokens differ.
    Update {
        /// The entity in the live store.
        live: EntityId,
        /// The entity in the scan store.
        scan: EntityId,
    },
    /// The key exists only in the live store: the source disappeared.
    Remove {
        /// The entity in the live store.
        live: EntityId,
    },
}

impl DiffOp {
    /// The change op a marker for this operation carries.
    pub fn change_op(self) -> ChangeOp {
        match self {
            DiffOp::Add { .. } => ChangeOp::Add,
            DiffOp::Update { .. } => ChangeOp::Update,
            DiffOp::Remove { .. } => ChangeOp::Remove,
        }
    }
}

/// Compares the live snapshot against a fresh scan.
///
/// Removes and updates come out in live-row order, adds in scan-row order;
/// keys present on both sides with equal tokens produce nothing.
pub fn diff(live: &Snapshot, scan: &Snapshot) -> Vec<DiffOp> {
    let mut ops = Vec::new();

    for row in live.rows() {
        match scan.get(&row.key) {
            None => ops.push(DiffOp::Remove { live: row.entity }),
            Some(candidate) if candidate.token != row.token => ops.push(DiffOp::Update {
                live: row.entity,
                scan: candidate.entity,
            }),
            Some(_) => {}
        }
    }

    for row in scan.rows() {
        if live.get(&row.key).is_none() {
            ops.push(DiffOp::Add { scan: row.entity });
        }
    }

    log::debug!("diff produced {} ops", ops.len());
    ops
}

/// Options for [`apply`].
#[derive(Debug, Clone, Copy)]
pub struct ApplyOptions {
    /// Attach a `topos/upd` marker to every added/updated entity as part of
    /// the same logical batch, so propagation observes one consistent unit.
    pub mark: bool,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self { mark: true }
    }
}

/// The outcome of an apply phase. All ids are live-store ids.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AppliedChanges {
    /// Entities newly created for `Add` ops.
    pub added: Vec<EntityId>,
    /// Entities refreshed by `Update` ops.
    pub updated: Vec<EntityId>,
    /// Entities whose backing source disappeared. Deletion is deferred to
    /// the caller, which decides whether and how to cascade.
    pub removed: Vec<EntityId>,
}

/// Applies diff ops to the live store.
///
/// `Add` allocates a fresh live entity and copies every component of the
/// scan entity onto it; `Update` copies onto the existing live id, merging
/// per definition (live components of other definitions survive). Component
/// definitions are re-registered by uri, so the two stores need not share
/// definition ids. Scan components must not carry entity-valued attributes —
/// scan ids mean nothing in the live store; edges are built by the link
/// processors after apply.
///
/// `Remove` ids are only collected into [`AppliedChanges::removed`].
pub fn apply(
    live: &mut World,
    scan: &World,
    ops: &[DiffOp],
    options: ApplyOptions,
) -> AppliedChanges {
    let mut changes = AppliedChanges::default();
    let mut upserts: Vec<Component> = Vec::new();
    let mut marks: Vec<(EntityId, ChangeOp)> = Vec::new();

    for &op in ops {
        match op {
            DiffOp::Add { scan: scan_id } => {
                let live_id = live.create_entity();
                copy_components(live, scan, scan_id, live_id, &mut upserts);
                changes.added.push(live_id);
                marks.push((live_id, ChangeOp::Add));
            }
            DiffOp::Update {
                live: live_id,
                scan: scan_id,
            } => {
                copy_components(live, scan, scan_id, live_id, &mut upserts);
                changes.updated.push(live_id);
                marks.push((live_id, ChangeOp::Update));
            }
            DiffOp::Remove { live: live_id } => {
                changes.removed.push(live_id);
            }
        }
    }

    live.add_components(upserts, AddOptions::default());

    if options.mark {
        let upd = live.builtins().upd;
        let markers = marks
            .iter()
            .map(|&(id, op)| Component::new(id, upd).with("op", op.as_str()))
            .collect();
        // Same logical batch as the component copy above.
        live.add_components(markers, AddOptions { retain_changes: true });
    }

    log::debug!(
        "apply: {} added, {} updated, {} pending removal",
        changes.added.len(),
        changes.updated.len(),
        changes.removed.len()
    );
    changes
}

/// Queues clones of all of `scan_id`'s components, retargeted at `live_id`
/// with definitions remapped by uri.
fn copy_components(
    live: &mut World,
    scan: &World,
    scan_id: EntityId,
    live_id: EntityId,
    upserts: &mut Vec<Component>,
) {
    for component in scan.components_of(scan_id) {
        let Some(def) = scan.registry().def(component.def) else {
            continue;
        };
        let live_def = live.register(def.clone());
        let mut copied = component;
        copied.entity = live_id;
        copied.def = live_def;
        upserts.push(copied);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str, entity: u64, token: &str) -> SnapshotRow {
        SnapshotRow {
            key: key.into(),
            entity: EntityId(entity),
            token: token.into(),
            presence: PresenceBitset::new(),
        }
    }

    #[test]
    fn equal_snapshots_produce_no_ops() {
        let live = Snapshot::from_rows(vec![row("file:///a", 1, "t1")]);
        let scan = Snapshot::from_rows(vec![row("file:///a", 9, "t1")]);
        assert!(diff(&live, &scan).is_empty());
    }

    #[test]
    fn token_change_produces_exactly_one_update() {
        let live = Snapshot::from_rows(vec![row("file:///a", 1, "t1")]);
        let scan = Snapshot::from_rows(vec![row("file:///a", 9, "t2")]);
        assert_eq!(
            diff(&live, &scan),
            vec![DiffOp::Update {
                live: EntityId(1),
                scan: EntityId(9)
            }]
        );
    }

    #[test]
    fn missing_and_new_keys_produce_remove_and_add() {
        let live = Snapshot::from_rows(vec![row("file:///a", 1, "t1")]);
        let scan = Snapshot::from_rows(vec![row("file:///b", 9, "t1")]);
        assert_eq!(
            diff(&live, &scan),
            vec![
                DiffOp::Remove { live: EntityId(1) },
                DiffOp::Add { scan: EntityId(9) }
            ]
        );
    }

    #[test]
    fn apply_merges_updates_and_defers_removal() {
        let mut live = World::new();
        let src = live.builtins().src;
        let content = live.builtins().content;

        // A live page with a src and an externally produced content body.
        let page = live.add_components(
            vec![Component::new(EntityId::NONE, src)
                .with("url", "file:///a.mdx")
                .with("token", "old")],
            AddOptions::default(),
        )[0];
        live.add_components(
            vec![Component::new(page, content).with("body", "cached")],
            AddOptions::default(),
        );

        // A doomed live entity, absent from the scan.
        let doomed = live.add_components(
            vec![Component::new(EntityId::NONE, src)
                .with("url", "file:///gone.mdx")
                .with("token", "old")],
            AddOptions::default(),
        )[0];

        let mut scan = World::new();
        let scan_src = scan.builtins().src;
        scan.add_components(
            vec![
                Component::new(EntityId::NONE, scan_src)
                    .with("url", "file:///a.mdx")
                    .with("token", "new"),
                Component::new(EntityId::NONE, scan_src)
                    .with("url", "file:///fresh.mdx")
                    .with("token", "new"),
            ],
            AddOptions::default(),
        );

        let ops = diff(&Snapshot::of_world(&live), &Snapshot::of_world(&scan));
        let changes = apply(&mut live, &scan, &ops, ApplyOptions::default());

        assert_eq!(changes.updated, vec![page]);
        assert_eq!(changes.removed, vec![doomed]);
        assert_eq!(changes.added.len(), 1);

        // The update refreshed the src token...
        assert_eq!(
            live.attribute(page, src, "token").and_then(Value::as_str),
            Some("new")
        );
        // ...without clobbering components of other definitions (merge, not
        // replace).
        assert_eq!(
            live.attribute(page, content, "body").and_then(Value::as_str),
            Some("cached")
        );
        // Removal was deferred: the doomed entity is still alive.
        assert!(live.get(doomed).is_some());

        // Apply + marker attach form one logical batch.
        assert_eq!(live.marker_of(page), Some(ChangeOp::Update));
        let added = changes.added[0];
        assert_eq!(live.marker_of(added), Some(ChangeOp::Add));
        let touched = live.take_updated();
        assert!(touched.contains(&page) && touched.contains(&added));
    }

    #[test]
    fn snapshot_of_world_uses_src_url_as_key() {
        let mut world = World::new();
        let src = world.builtins().src;
        world.add_components(
            vec![Component::new(EntityId::NONE, src)
                .with("url", "file:///pages/")
                .with("token", "7")],
            AddOptions::default(),
        );
        let snapshot = Snapshot::of_world(&world);
        assert_eq!(snapshot.rows().len(), 1);
        assert_eq!(snapshot.get("file:///pages/").unwrap().token, "7");
    }
}
