// SPDX-License-Identifier: GPL-3.0-only

use std::error::Error;
use std::path::PathBuf;
use std::process;

use anyhow::Context;
use calloop::EventLoop;
use clap_lex::RawArgs;
use tracing::{error, info};

use arbor_comp::config::Config;
use arbor_comp::state::State;
use arbor_comp::{backend, logger};

fn main() {
    if let Err(err) = main_inner() {
        error!("Error occured in main(): {}", err);
        process::exit(1);
    }
}

fn main_inner() -> Result<(), Box<dyn Error>> {
    let raw_args = RawArgs::from_args();
    let mut cursor = raw_args.cursor();
    let mut config_path: Option<PathBuf> = None;

    while let Some(arg) = raw_args.next_os(&mut cursor) {
        match arg.to_str() {
            Some("--help") | Some("-h") => {
                print_help(env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            Some("--version") | Some("-V") => {
                println!("arbor-comp {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            Some("--config") | Some("-c") => {
                let path = raw_args
                    .next_os(&mut cursor)
                    .ok_or("--config requires a path argument")?;
                config_path = Some(PathBuf::from(path));
            }
            _ => {}
        }
    }

    logger::init_logger()?;
    info!("Starting up");

    let config = Config::load(config_path);

    let mut event_loop: EventLoop<'static, State> =
        EventLoop::try_new().with_context(|| "Failed to initialize event loop")?;
    let mut state = State::new(config, event_loop.get_signal());

    backend::headless::init_backend(&mut event_loop, &mut state)?;
    state.run_startup_commands();

    event_loop.run(None, &mut state, |state| {
        if state.common.should_stop {
            info!("Shutting down");
            state.common.event_loop_signal.stop();
            state.common.event_loop_signal.wakeup();
            return;
        }
        state.common.refresh();
    })?;

    std::mem::drop(event_loop);
    std::mem::drop(state);

    Ok(())
}

fn print_help(version: &str) {
    println!(
        r#"arbor-comp {version}

A floating Wayland-style compositor core.

Options:
  -h, --help           Show this message
  -V, --version        Show the version
  -c, --config <path>  Use this configuration file"#
    );
}
