// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};

/// Output rotation/reflection, mirroring the wire enum of the display
/// protocol.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Transform {
    #[default]
    Normal,
    Rotate90,
    Rotate180,
    Rotate270,
    Flipped,
    Flipped90,
    Flipped180,
    Flipped270,
}

fn default_enabled() -> bool {
    true
}

fn default_scale() -> f64 {
    1.0
}

/// Desired state for one output, keyed by connector name in the config file.
///
/// `mode` is `((width, height), refresh_mhz)`; a `None` refresh means "any
/// refresh rate at that resolution". `position` of `None` means the output is
/// placed automatically in the layout.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OutputConfig {
    pub mode: ((i32, i32), Option<u32>),
    #[serde(default)]
    pub vrr: bool,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default)]
    pub position: Option<(i32, i32)>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for OutputConfig {
    fn default() -> OutputConfig {
        OutputConfig {
            mode: ((0, 0), None),
            vrr: false,
            scale: 1.0,
            transform: Transform::Normal,
            position: None,
            enabled: true,
        }
    }
}

impl OutputConfig {
    pub fn mode_size(&self) -> (i32, i32) {
        self.mode.0
    }

    pub fn mode_refresh(&self) -> Option<u32> {
        self.mode.1
    }
}
