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

//! End-to-end build pass tests over a real temporary source tree.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tempfile::TempDir;
use topos_core::component::Component;
use topos_core::dep::kinds;
use topos_core::entity::EntityId;
use topos_data::ecs::AddOptions;
use topos_data::graph::parent_of;
use topos_data::store::MemoryBackend;
use topos_runtime::{BuildOptions, BuildPass, DEST_URL_INDEX, SRC_URL_INDEX};

fn build_tree() -> (TempDir, PathBuf) {
    let temp = TempDir::new().unwrap();
    fs::create_dir(temp.path().join("pages")).unwrap();
    fs::write(temp.path().join("pages/index.mdx"), "# index").unwrap();
    fs::write(temp.path().join("pages/about.mdx"), "# about").unwrap();
    let root = temp.path().canonicalize().unwrap();
    (temp, root)
}

fn url_of(root: &Path, rel: &str) -> String {
    format!("file://{}/{rel}", root.display())
}

/// Forces a deterministic, distinct mtime so the change token flips.
fn bump_mtime(path: &Path, seconds: u64) {
    let file = OpenOptions::new().write(true).open(path).unwrap();
    file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(seconds))
        .unwrap();
}

fn new_pass() -> (Arc<MemoryBackend>, BuildPass) {
    let backend = Arc::new(MemoryBackend::new());
    let pass = BuildPass::new(backend.clone(), BuildOptions::default());
    (backend, pass)
}

#[tokio::test]
async fn first_pass_adds_everything_and_links_directories() {
    let (_temp, root) = build_tree();
    let (backend, mut pass) = new_pass();

    let report = pass.run(&root).await.unwrap();

    // Root dir, pages dir, two files.
    assert_eq!(report.added, 4);
    assert_eq!(report.updated, 0);
    assert_eq!(report.removed, 0);
    assert!(report.errors.is_empty());

    let src_index = pass.indexes().index(SRC_URL_INDEX).unwrap();
    let pages = src_index.get(&url_of(&root, "pages/")).unwrap().entity;
    let index_page = src_index
        .get(&url_of(&root, "pages/index.mdx"))
        .unwrap()
        .entity;
    assert_eq!(parent_of(pass.world(), index_page, kinds::DIR), pages);

    // Everything the pass wrote reached the backend.
    assert!(backend.component_count().await > 0);

    // Markers were consumed at the end of the pass.
    assert!(pass.world().marked_entities().is_empty());
}

#[tokio::test]
async fn unchanged_tree_produces_an_empty_pass() {
    let (_temp, root) = build_tree();
    let (_backend, mut pass) = new_pass();
    pass.run(&root).await.unwrap();

    let report = pass.run(&root).await.unwrap();

    assert_eq!(report.added, 0);
    assert_eq!(report.updated, 0);
    assert_eq!(report.removed, 0);
    assert_eq!(report.invalidated, 0);
}

#[tokio::test]
async fn touched_file_produces_exactly_one_update() {
    let (_temp, root) = build_tree();
    let (_backend, mut pass) = new_pass();
    pass.run(&root).await.unwrap();

    bump_mtime(&root.join("pages/index.mdx"), 1_000_000);
    let report = pass.run(&root).await.unwrap();

    assert_eq!(report.added, 0);
    assert_eq!(report.updated, 1);
    assert_eq!(report.removed, 0);
}

#[tokio::test]
async fn deleted_file_is_removed_with_its_own_edges() {
    let (_temp, root) = build_tree();
    let (_backend, mut pass) = new_pass();
    pass.run(&root).await.unwrap();

    let about_url = url_of(&root, "pages/about.mdx");
    let about = pass
        .indexes()
        .index(SRC_URL_INDEX)
        .unwrap()
        .get(&about_url)
        .unwrap()
        .entity;

    fs::remove_file(root.join("pages/about.mdx")).unwrap();
    let report = pass.run(&root).await.unwrap();

    assert_eq!(report.removed, 1);
    assert!(pass.world().get(about).is_none(), "the entity is gone");
    assert!(
        pass.indexes()
            .index(SRC_URL_INDEX)
            .unwrap()
            .get(&about_url)
            .is_none(),
        "the rebuilt index no longer knows the key"
    );
    assert_eq!(
        parent_of(pass.world(), about, kinds::DIR),
        EntityId::NONE,
        "the dir edge owned by the removed entity went with it"
    );
}

#[tokio::test]
async fn changed_layout_invalidates_its_pages() {
    let (_temp, root) = build_tree();
    fs::create_dir(root.join("layouts")).unwrap();
    fs::write(root.join("layouts/post.html"), "<main/>").unwrap();

    let backend = Arc::new(MemoryBackend::new());
    let mut pass = BuildPass::new(
        backend,
        BuildOptions {
            clear_markers: false,
            ..BuildOptions::default()
        },
    );
    pass.run(&root).await.unwrap();
    pass.world_mut().clear_markers();

    // Act as the frontmatter parser: declare the layout on the index page.
    let src_index = pass.indexes().index(SRC_URL_INDEX).unwrap();
    let index_page = src_index
        .get(&url_of(&root, "pages/index.mdx"))
        .unwrap()
        .entity;
    let layout_url = url_of(&root, "layouts/post.html");
    let meta = pass.world().builtins().meta;
    pass.world_mut().add_components(
        vec![Component::new(index_page, meta).with("layout", layout_url)],
        AddOptions::default(),
    );

    // The linking pass picks the declaration up; nothing changed on disk.
    pass.run(&root).await.unwrap();
    pass.world_mut().clear_markers();

    // Touch the layout: the page depending on it must be invalidated.
    bump_mtime(&root.join("layouts/post.html"), 2_000_000);
    let report = pass.run(&root).await.unwrap();

    assert_eq!(report.updated, 1);
    assert!(report.invalidated >= 1);
    assert_eq!(
        pass.world().marker_of(index_page),
        Some(topos_core::ChangeOp::Update),
        "the page inherited the layout's marker"
    );
}

#[tokio::test]
async fn destination_assignment_resolves_through_the_dir_chain() {
    let (_temp, root) = build_tree();
    let (_backend, mut pass) = new_pass();
    pass.run(&root).await.unwrap();

    let src_index = pass.indexes().index(SRC_URL_INDEX).unwrap();
    let pages = src_index.get(&url_of(&root, "pages/")).unwrap().entity;
    let index_page = src_index
        .get(&url_of(&root, "pages/index.mdx"))
        .unwrap()
        .entity;

    // Act as the config layer and the renderer: the pages directory
    // publishes to /site/, and the page renders to html.
    let builtins = pass.world().builtins();
    pass.world_mut().add_components(
        vec![
            Component::new(pages, builtins.dest).with("url", "/site/"),
            Component::new(index_page, builtins.render).with("ext", "html"),
        ],
        AddOptions::default(),
    );

    pass.run(&root).await.unwrap();

    let about = pass
        .indexes()
        .index(SRC_URL_INDEX)
        .unwrap()
        .get(&url_of(&root, "pages/about.mdx"))
        .unwrap()
        .entity;
    let dest_index = pass.indexes().index(DEST_URL_INDEX).unwrap();
    let entry = dest_index.get("/site/index.html").unwrap();
    assert_eq!(entry.entity, index_page);
    assert_eq!(dest_index.key_of(index_page), Some("/site/index.html"));

    // The bare directory resolves too; the not-yet-rendered about page keeps
    // its source name under /site/.
    assert_eq!(dest_index.key_of(pages), Some("/site/"));
    assert_eq!(dest_index.key_of(about), Some("/site/about.mdx"));
}

#[tokio::test]
async fn missing_root_aborts_the_pass() {
    let temp = TempDir::new().unwrap();
    let gone = temp.path().join("missing");
    let (_backend, mut pass) = new_pass();

    let result = pass.run(&gone).await;
    assert!(result.is_err(), "a store-level failure is not swallowed");

    let message = format!("{:#}", result.unwrap_err());
    assert!(message.contains("missing"), "context names the root: {message}");
}
