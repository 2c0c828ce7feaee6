// SPDX-License-Identifier: GPL-3.0-only

use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

use tracing::{error, info, warn};
use xkbcommon::xkb;

use arbor_comp_config::{KeyRepeatConfig, OutputConfig, WorkspaceConfig, XkbConfig};

use crate::backend::ModifiersState;

mod key_bindings;
pub use key_bindings::{Action, KeyModifiers, KeyPattern, KeyPatternError};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// The declarative part of the configuration file, as deserialized. Key
/// bindings stay as raw strings here; they are validated in
/// [`Config::from_static`] so one bad binding does not take the whole file
/// down.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct StaticConfig {
    /// `$name` substitution table for `Exec` commands.
    pub vars: HashMap<String, String>,
    /// Environment applied to the compositor itself at startup and reload.
    pub env: HashMap<String, String>,
    /// Commands spawned once at startup.
    pub exec: Vec<String>,
    /// Commands spawned at startup and again on every reload.
    pub exec_always: Vec<String>,
    pub key_bindings: HashMap<String, Vec<Action>>,
    /// Desired output state, keyed by connector name.
    pub outputs: HashMap<String, OutputConfig>,
    pub workspaces: WorkspaceConfig,
    pub xkb: XkbConfig,
    pub key_repeat: KeyRepeatConfig,
}

#[derive(Debug)]
pub struct Config {
    pub static_conf: StaticConfig,
    bindings: Vec<(KeyPattern, Vec<Action>)>,
    path: Option<PathBuf>,
}

impl Config {
    /// Loads the configuration from `path`, or from
    /// `$XDG_CONFIG_HOME/arbor-comp/config.ron`. A missing file is fine
    /// (defaults apply); an unreadable or unparsable one is reported and
    /// replaced by defaults so the session still starts.
    pub fn load(path: Option<PathBuf>) -> Config {
        let path = path.or_else(default_config_path);

        let static_conf = match &path {
            Some(path) if path.exists() => match Self::read(path) {
                Ok(conf) => {
                    info!(?path, "Loaded configuration");
                    conf
                }
                Err(err) => {
                    error!(?err, ?path, "Failed to load configuration, using defaults");
                    StaticConfig::default()
                }
            },
            Some(path) => {
                warn!(?path, "No configuration file found, using defaults");
                StaticConfig::default()
            }
            None => {
                warn!("No configuration directory available, using defaults");
                StaticConfig::default()
            }
        };

        Config::from_static(static_conf, path)
    }

    fn read(path: &PathBuf) -> Result<StaticConfig, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(ron::from_str(&text)?)
    }

    /// Validates the raw key bindings; offending entries are logged and
    /// dropped, the rest of the configuration stays usable.
    pub fn from_static(static_conf: StaticConfig, path: Option<PathBuf>) -> Config {
        let mut bindings = Vec::new();
        for (pattern, actions) in &static_conf.key_bindings {
            match KeyPattern::parse(pattern) {
                Ok(parsed) => bindings.push((parsed, actions.clone())),
                Err(err) => error!(binding = pattern.as_str(), "Invalid key binding: {}", err),
            }
        }
        Config {
            static_conf,
            bindings,
            path,
        }
    }

    /// Re-reads the configuration file in place (the `reload` action).
    pub fn reload(&mut self) {
        let reloaded = Config::load(self.path.clone());
        self.static_conf = reloaded.static_conf;
        self.bindings = reloaded.bindings;
    }

    pub fn bindings(&self) -> &[(KeyPattern, Vec<Action>)] {
        &self.bindings
    }

    /// The bind-execution lookup: actions configured for this
    /// modifier+keysym combination, if any.
    pub fn binding_for(
        &self,
        modifiers: &ModifiersState,
        sym: xkb::Keysym,
    ) -> Option<&[Action]> {
        self.bindings
            .iter()
            .find(|(pattern, _)| pattern.matches(modifiers, sym))
            .map(|(_, actions)| actions.as_slice())
    }

    /// Expands `$name` references from the `vars` table. Unset variables
    /// expand to the empty string. A variable name runs until the first
    /// non-alphanumeric character.
    pub fn substitute_vars(&self, text: &str) -> String {
        let mut result = String::with_capacity(text.len());
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '$' {
                result.push(c);
                continue;
            }
            let mut name = String::new();
            while let Some(&next) = chars.peek() {
                if next.is_alphanumeric() {
                    name.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            if let Some(value) = self.static_conf.vars.get(&name) {
                result.push_str(value);
            }
        }
        result
    }
}

impl Default for Config {
    fn default() -> Config {
        Config::from_static(StaticConfig::default(), None)
    }
}

fn default_config_path() -> Option<PathBuf> {
    let dirs = xdg::BaseDirectories::with_prefix("arbor-comp").ok()?;
    Some(dirs.get_config_file("config.ron"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_bindings_are_dropped_but_good_ones_survive() {
        let text = r#"(
            key_bindings: {
                "Super+Return": [Exec("$term")],
                "Super+BogusKey": [Close],
                "Super+1": [Workspace(1)],
            },
            vars: { "term": "footclient" },
        )"#;
        let static_conf: StaticConfig = ron::from_str(text).unwrap();
        let config = Config::from_static(static_conf, None);

        assert_eq!(config.bindings().len(), 2);
        let modifiers = ModifiersState {
            logo: true,
            ..Default::default()
        };
        assert!(config
            .binding_for(&modifiers, xkb::Keysym::from(xkb::keysyms::KEY_Return))
            .is_some());
        assert!(config
            .binding_for(&modifiers, xkb::Keysym::from(xkb::keysyms::KEY_2))
            .is_none());
    }

    #[test]
    fn variables_expand_inside_exec_strings() {
        let mut static_conf = StaticConfig::default();
        static_conf
            .vars
            .insert("term".to_string(), "alacritty".to_string());
        let config = Config::from_static(static_conf, None);

        assert_eq!(config.substitute_vars("exec $term -e top"), "exec alacritty -e top");
        assert_eq!(config.substitute_vars("$unset!"), "!");
        assert_eq!(config.substitute_vars("$term$term"), "alacrittyalacritty");
    }
}
