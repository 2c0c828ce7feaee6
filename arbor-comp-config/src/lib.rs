// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};

pub mod output;
pub mod workspace;

pub use output::OutputConfig;
pub use workspace::WorkspaceConfig;

/// Keymap negotiation parameters handed to the input backend when a keyboard
/// is added. The core never interprets these itself.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct XkbConfig {
    pub rules: String,
    pub model: String,
    pub layout: String,
    pub variant: String,
    pub options: Option<String>,
}

impl Default for XkbConfig {
    fn default() -> XkbConfig {
        XkbConfig {
            rules: String::new(),
            model: String::new(),
            layout: String::new(),
            variant: String::new(),
            options: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct KeyRepeatConfig {
    pub rate: i32,
    pub delay: i32,
}

impl Default for KeyRepeatConfig {
    fn default() -> KeyRepeatConfig {
        KeyRepeatConfig {
            rate: 25,
            delay: 600,
        }
    }
}
