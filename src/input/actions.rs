// SPDX-License-Identifier: GPL-3.0-only

//! Execution of configured actions inside the session context.

use std::thread;

use tracing::{info, warn};
use xkbcommon::xkb::Keysym;

use crate::backend::ModifiersState;
use crate::config::Action;
use crate::utils::prelude::*;

impl State {
    /// The bind-execution entry point: runs the actions configured for this
    /// modifier+keysym combination and reports whether a binding matched.
    pub fn handle_keybinding(&mut self, modifiers: ModifiersState, sym: Keysym) -> bool {
        let Some(actions) = self
            .common
            .config
            .binding_for(&modifiers, sym)
            .map(|actions| actions.to_vec())
        else {
            return false;
        };

        for action in actions {
            if !self.handle_action(action) {
                // `reload`/`terminate` invalidate the rest of the chain.
                break;
            }
        }
        true
    }

    /// Runs one action. Returns whether later actions of the same binding
    /// should still run.
    pub fn handle_action(&mut self, action: Action) -> bool {
        match action {
            Action::Terminate => {
                info!("Terminating the session");
                self.common.should_stop = true;
                false
            }
            Action::Reload => {
                self.reload_config();
                false
            }
            Action::Close => {
                if let Some(toplevel) = self.common.shell.read().focused_toplevel() {
                    toplevel.handle().send_close();
                }
                true
            }
            Action::Workspace(id) => {
                self.common.shell.write().focus_or_create_workspace(id);
                true
            }
            Action::ToggleFullscreen => {
                let mut shell = self.common.shell.write();
                if let Some(toplevel) = shell.focused_toplevel() {
                    shell.toggle_fullscreen(&toplevel);
                }
                true
            }
            Action::Exec(command) => {
                let command = self.common.config.substitute_vars(&command);
                spawn_command(&command);
                true
            }
        }
    }

    /// Applies `env` entries to the compositor's own environment (they are
    /// inherited by everything spawned afterwards).
    pub fn apply_config_environment(&self) {
        for (name, value) in &self.common.config.static_conf.env {
            std::env::set_var(name, value);
        }
    }

    /// Startup phase: environment, then `exec` and `exec_always` commands.
    pub fn run_startup_commands(&mut self) {
        self.apply_config_environment();
        let commands = self
            .common
            .config
            .static_conf
            .exec
            .iter()
            .chain(&self.common.config.static_conf.exec_always)
            .cloned()
            .collect::<Vec<_>>();
        for command in commands {
            let command = self.common.config.substitute_vars(&command);
            spawn_command(&command);
        }
    }

    /// The `reload` action: re-reads the file, re-applies environment and
    /// output configuration and runs `exec_always` again.
    pub fn reload_config(&mut self) {
        info!("Reloading configuration");
        self.common.config.reload();
        self.apply_config_environment();

        let outputs = self.common.config.static_conf.outputs.clone();
        {
            let mut shell = self.common.shell.write();
            for (name, config) in &outputs {
                if let Err(err) = shell.apply_output_config(name, config, false) {
                    warn!(?err, output = name.as_str(), "Output reconfiguration failed");
                }
            }
        }

        let commands = self.common.config.static_conf.exec_always.clone();
        for command in commands {
            let command = self.common.config.substitute_vars(&command);
            spawn_command(&command);
        }
    }
}

fn spawn_command(command: &str) {
    if command.trim().is_empty() {
        return;
    }
    info!(command, "Spawning");
    match std::process::Command::new("/bin/sh")
        .arg("-c")
        .arg(command)
        .spawn()
    {
        Ok(mut child) => {
            // Reap the child off-thread so the event loop never blocks.
            thread::spawn(move || {
                let _ = child.wait();
            });
        }
        Err(err) => warn!(?err, command, "Failed to spawn"),
    }
}
