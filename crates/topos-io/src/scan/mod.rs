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

//! Walks a source tree into a disposable store and a diffable snapshot.
//!
//! Every file and directory becomes an entity carrying a `topos/src`
//! component: a `file://` url (directories end in `/`), a kind string, and
//! the mtime as an opaque change token. The produced store is thrown away
//! after diffing — only the components copied by the apply phase survive
//! into the live store, which is why the scan never creates dependency
//! edges (scan-local entity ids mean nothing outside it).
//!
//! Per-entry failures (unreadable metadata, unwalkable subtrees) attach a
//! `topos/err` component to the affected entry's entity and the walk
//! continues; only an unusable root aborts the scan.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use thiserror::Error;
use topos_core::component::Component;
use topos_core::entity::EntityId;
use topos_data::diff::Snapshot;
use topos_data::ecs::{AddOptions, World};
use walkdir::WalkDir;

/// A fatal scan failure. Per-entry problems never surface here.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The source root could not be read at all.
    #[error("failed to read source root {root}: {source}")]
    RootUnreadable {
        /// The root that was handed to the scanner.
        root: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The source root is not a directory.
    #[error("source root {0} is not a directory")]
    NotADirectory(PathBuf),
}

/// The classification of a scanned source, stored as the `kind` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// A directory.
    Dir,
    /// A markdown-like page (`.md`, `.mdx`, `.markdown`).
    Mdx,
    /// A stylesheet (`.css`, `.scss`, `.sass`).
    Css,
    /// A raw html document.
    Html,
    /// A structured data file (`.json`, `.yaml`, `.yml`, `.toml`).
    Data,
    /// Anything else; copied through untransformed.
    Asset,
}

impl SourceKind {
    /// The attribute spelling of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Dir => "dir",
            SourceKind::Mdx => "mdx",
            SourceKind::Css => "css",
            SourceKind::Html => "html",
            SourceKind::Data => "data",
            SourceKind::Asset => "asset",
        }
    }

    /// Classifies a file path by extension.
    pub fn of_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("md" | "mdx" | "markdown") => SourceKind::Mdx,
            Some("css" | "scss" | "sass") => SourceKind::Css,
            Some("html" | "htm") => SourceKind::Html,
            Some("json" | "yaml" | "yml" | "toml") => SourceKind::Data,
            _ => SourceKind::Asset,
        }
    }
}

/// The result of one source-tree walk.
#[derive(Debug)]
pub struct ScanOutcome {
    /// The disposable store: one entity per file/directory.
    pub world: World,
    /// The diffable projection of `world`, keyed by source url.
    pub snapshot: Snapshot,
    /// How many entries failed and carry `topos/err` components.
    pub error_count: usize,
}

/// Walks `root` and builds the disposable scan store.
///
/// # Errors
/// [`ScanError`] only when the root itself is unusable; anything below it
/// degrades to per-entity error components.
pub fn scan_tree(root: &Path) -> Result<ScanOutcome, ScanError> {
    let root = root
        .canonicalize()
        .map_err(|source| ScanError::RootUnreadable {
            root: root.to_path_buf(),
            source,
        })?;
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root));
    }

    let mut world = World::new();
    let builtins = world.builtins();
    let mut components: Vec<Component> = Vec::new();
    let mut error_count = 0usize;

    for entry in WalkDir::new(&root) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(walk_error) => {
                // A subtree we cannot descend into: record it and move on.
                error_count += 1;
                match walk_error.path() {
                    Some(path) => {
                        let url = file_url(path, true);
                        log::warn!("scan: cannot walk {url}: {walk_error}");
                        let ids = world.add_components(
                            vec![Component::new(EntityId::NONE, builtins.src)
                                .with("url", url)
                                .with("kind", SourceKind::Dir.as_str())],
                            AddOptions { retain_changes: true },
                        );
                        world.add_components(
                            vec![Component::new(ids[0], builtins.err)
                                .with("stage", "scan")
                                .with("message", walk_error.to_string())],
                            AddOptions { retain_changes: true },
                        );
                    }
                    None => log::warn!("scan: walk error without a path: {walk_error}"),
                }
                continue;
            }
        };

        let is_dir = entry.file_type().is_dir();
        let url = file_url(entry.path(), is_dir);
        let kind = if is_dir {
            SourceKind::Dir
        } else {
            SourceKind::of_path(entry.path())
        };

        match mtime_token(&entry) {
            Ok(token) => {
                components.push(
                    Component::new(EntityId::NONE, builtins.src)
                        .with("url", url)
                        .with("kind", kind.as_str())
                        .with("token", token),
                );
            }
            Err(io_error) => {
                // Metadata is gone (e.g. the file vanished mid-walk). Keep
                // the entity so the error is reportable, with an empty token
                // so the next pass retries it.
                error_count += 1;
                log::warn!("scan: no metadata for {url}: {io_error}");
                let ids = world.add_components(
                    vec![Component::new(EntityId::NONE, builtins.src)
                        .with("url", url)
                        .with("kind", kind.as_str())
                        .with("token", "")],
                    AddOptions { retain_changes: true },
                );
                world.add_components(
                    vec![Component::new(ids[0], builtins.err)
                        .with("stage", "scan")
                        .with("message", io_error.to_string())],
                    AddOptions { retain_changes: true },
                );
            }
        }
    }

    world.add_components(components, AddOptions { retain_changes: true });
    let snapshot = Snapshot::of_world(&world);
    log::debug!(
        "scanned {} entries under {} ({error_count} errors)",
        snapshot.rows().len(),
        root.display()
    );

    Ok(ScanOutcome {
        world,
        snapshot,
        error_count,
    })
}

/// Renders a path as a `file://` url; directories get a trailing `/`.
fn file_url(path: &Path, is_dir: bool) -> String {
    let mut url = format!("file://{}", path.display());
    if is_dir && !url.ends_with('/') {
        url.push('/');
    }
    url
}

/// The entry's mtime in unix milliseconds, as opaque token text.
fn mtime_token(entry: &walkdir::DirEntry) -> std::io::Result<String> {
    let modified = entry.metadata()?.modified()?;
    // Pre-epoch mtimes flatten to 0; tokens are only equality-compared.
    let millis = modified
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    Ok(millis.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn build_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("pages")).unwrap();
        fs::write(temp.path().join("pages/index.mdx"), "# hi").unwrap();
        fs::write(temp.path().join("pages/style.css"), "body{}").unwrap();
        temp
    }

    #[test]
    fn scan_produces_one_entity_per_entry() {
        let temp = build_tree();
        let outcome = scan_tree(temp.path()).unwrap();

        // Root dir, pages dir, two files.
        assert_eq!(outcome.snapshot.rows().len(), 4);
        assert_eq!(outcome.error_count, 0);
        assert_eq!(outcome.world.entity_count(), 4);
    }

    #[test]
    fn directory_urls_end_with_a_slash() {
        let temp = build_tree();
        let outcome = scan_tree(temp.path()).unwrap();

        let dir_rows: Vec<_> = outcome
            .snapshot
            .rows()
            .iter()
            .filter(|row| row.key.ends_with('/'))
            .collect();
        assert_eq!(dir_rows.len(), 2, "root and pages/");
        assert!(outcome
            .snapshot
            .rows()
            .iter()
            .any(|row| row.key.ends_with("pages/index.mdx")));
    }

    #[test]
    fn files_carry_kind_and_mtime_token() {
        let temp = build_tree();
        let outcome = scan_tree(temp.path()).unwrap();
        let src = outcome.world.builtins().src;

        let row = outcome
            .snapshot
            .rows()
            .iter()
            .find(|row| row.key.ends_with("index.mdx"))
            .unwrap();
        assert!(!row.token.is_empty(), "mtime token must be present");
        assert_eq!(
            outcome
                .world
                .attribute(row.entity, src, "kind")
                .and_then(topos_core::Value::as_str),
            Some("mdx")
        );
    }

    #[test]
    fn classification_covers_the_build_vocabulary() {
        assert_eq!(SourceKind::of_path(Path::new("a.mdx")), SourceKind::Mdx);
        assert_eq!(SourceKind::of_path(Path::new("a.MD")), SourceKind::Mdx);
        assert_eq!(SourceKind::of_path(Path::new("a.scss")), SourceKind::Css);
        assert_eq!(SourceKind::of_path(Path::new("a.html")), SourceKind::Html);
        assert_eq!(SourceKind::of_path(Path::new("a.toml")), SourceKind::Data);
        assert_eq!(SourceKind::of_path(Path::new("a.png")), SourceKind::Asset);
        assert_eq!(SourceKind::of_path(Path::new("Makefile")), SourceKind::Asset);
    }

    #[test]
    fn missing_root_is_fatal() {
        let temp = TempDir::new().unwrap();
        let gone = temp.path().join("nope");
        assert!(matches!(
            scan_tree(&gone),
            Err(ScanError::RootUnreadable { .. })
        ));
    }

    #[test]
    fn file_root_is_rejected() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("f.txt");
        fs::write(&file, "x").unwrap();
        assert!(matches!(scan_tree(&file), Err(ScanError::NotADirectory(_))));
    }
}
