// SPDX-License-Identifier: GPL-3.0-only

//! In-process backend without any hardware behind it.
//!
//! Used when no session is available (CI, development shells) and as the
//! substrate for the test suite: it fabricates one output plus a pointer and
//! a keyboard, and forwards whatever [`Event`]s are pushed into its channel
//! to the core on the event loop thread.

use anyhow::Result;
use calloop::channel::{self, Channel, Sender};
use calloop::EventLoop;
use tracing::info;

use super::{DeviceCapability, Event, InputDevice, Mode, OutputDevice};
use crate::state::{BackendData, State};
use crate::utils::geometry::Size;

pub struct HeadlessState {
    sender: Sender<Event>,
}

impl std::fmt::Debug for HeadlessState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HeadlessState")
    }
}

impl HeadlessState {
    /// Queues an event for dispatch on the loop thread.
    pub fn submit(&self, event: Event) {
        let _ = self.sender.send(event);
    }
}

fn default_output() -> OutputDevice {
    OutputDevice::new(
        "HEADLESS-1",
        "arbor",
        "headless",
        vec![
            Mode {
                size: Size::new(1920, 1080),
                refresh: 60_000,
                preferred: true,
            },
            Mode {
                size: Size::new(1920, 1080),
                refresh: 59_940,
                preferred: false,
            },
            Mode {
                size: Size::new(1280, 720),
                refresh: 60_000,
                preferred: false,
            },
        ],
    )
}

pub fn init_backend(event_loop: &mut EventLoop<'static, State>, state: &mut State) -> Result<()> {
    let (sender, receiver): (Sender<Event>, Channel<Event>) = channel::channel();

    event_loop
        .handle()
        .insert_source(receiver, |event, _, state| {
            if let channel::Event::Msg(event) = event {
                state.handle_backend_event(event);
            }
        })
        .map_err(|_| anyhow::anyhow!("Failed to insert the backend event source"))?;

    info!("Starting headless backend");

    let output = default_output();
    sender.send(Event::NewOutput(output)).unwrap();
    sender
        .send(Event::NewInputDevice(InputDevice::new(
            "headless-pointer",
            DeviceCapability::Pointer,
        )))
        .unwrap();
    sender
        .send(Event::NewInputDevice(InputDevice::new(
            "headless-keyboard",
            DeviceCapability::Keyboard,
        )))
        .unwrap();

    state.backend = BackendData::Headless(HeadlessState { sender });
    Ok(())
}
