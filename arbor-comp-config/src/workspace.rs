// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};

fn default_initial_workspaces() -> u32 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct WorkspaceConfig {
    /// How many workspaces to pre-create when an output appears. The first
    /// one becomes the output's active workspace.
    #[serde(default = "default_initial_workspaces")]
    pub initial_workspaces: u32,
}

impl Default for WorkspaceConfig {
    fn default() -> WorkspaceConfig {
        WorkspaceConfig {
            initial_workspaces: 1,
        }
    }
}
