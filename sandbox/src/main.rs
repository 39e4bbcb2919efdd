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

//! Minimal demo: two incremental build passes over a source tree.
//!
//! Usage: `cargo run -p sandbox -- <source-root>`. The second pass shows the
//! incremental core at work: an unchanged tree produces an empty report.

use std::path::PathBuf;
use std::sync::Arc;

use topos_data::store::MemoryBackend;
use topos_runtime::{BuildOptions, BuildPass};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let root = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let backend = Arc::new(MemoryBackend::new());
    let mut pass = BuildPass::new(backend, BuildOptions::default());

    let first = pass.run(&root).await?;
    println!("first pass:  {}", serde_json::to_string_pretty(&first)?);

    let second = pass.run(&root).await?;
    println!("second pass: {}", serde_json::to_string_pretty(&second)?);

    log::info!("store now holds {} entities", pass.world().entity_count());
    Ok(())
}
