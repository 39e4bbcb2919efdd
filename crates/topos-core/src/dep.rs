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

//! Dependency-edge vocabulary and change operations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The dependency kinds the surrounding build tool uses.
///
/// The vocabulary is an open set of short strings; new kinds may be added by
/// any processor without schema migration. These constants only document the
/// ones the build itself creates.
pub mod kinds {
    /// Directory containment: file → containing directory.
    pub const DIR: &str = "dir";
    /// Layout inheritance: page → layout source.
    pub const LAYOUT: &str = "layout";
    /// Tag membership: page → tag entity.
    pub const TAG: &str = "tag";
    /// Hyperlink target: page → linked page. Not a build-order dependency;
    /// propagation normally excludes it.
    pub const LINK: &str = "link";
    /// Stylesheet reference: page → stylesheet source.
    pub const CSS: &str = "css";
    /// Import reference: script/style → imported source.
    pub const IMPORT: &str = "import";
}

/// The operation recorded by a change marker.
///
/// Markers are transient annotations placed on an entity to signal "this
/// entity's data changed in the current build pass"; they are consumed by
/// downstream processors and cleared once the pass completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    /// The backing source appeared.
    Add,
    /// The backing source changed.
    Update,
    /// The backing source disappeared.
    Remove,
}

impl ChangeOp {
    /// The wire/attribute spelling of this op.
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeOp::Add => "add",
            ChangeOp::Update => "update",
            ChangeOp::Remove => "remove",
        }
    }

    /// Parses the attribute spelling back into an op.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "add" => Some(ChangeOp::Add),
            "update" => Some(ChangeOp::Update),
            "remove" => Some(ChangeOp::Remove),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
