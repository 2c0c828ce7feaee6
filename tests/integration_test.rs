//! End-to-end test: boots the headless backend on a real event loop and
//! drives the session through backend events and key bindings.

use std::collections::HashMap;
use std::time::Duration;

use calloop::EventLoop;

use arbor_comp::backend::headless::init_backend;
use arbor_comp::backend::{
    DeviceCapability, Event, InputDevice, KeyState, Keysym, ModifiersState, ToplevelHandle,
};
use arbor_comp::config::{Action, Config, StaticConfig};
use arbor_comp::state::State;
use arbor_comp::utils::geometry::Size;

use xkbcommon::xkb::keysyms;

fn test_config() -> Config {
    let mut static_conf = StaticConfig::default();
    let bindings: HashMap<String, Vec<Action>> = [
        ("Super+2".to_string(), vec![Action::Workspace(2)]),
        ("Super+f".to_string(), vec![Action::ToggleFullscreen]),
        (
            "Super+Shift+e".to_string(),
            vec![Action::Terminate, Action::Workspace(9)],
        ),
    ]
    .into_iter()
    .collect();
    static_conf.key_bindings = bindings;
    Config::from_static(static_conf, None)
}

fn dispatch(event_loop: &mut EventLoop<'static, State>, state: &mut State) {
    for _ in 0..3 {
        event_loop
            .dispatch(Some(Duration::from_millis(5)), state)
            .unwrap();
    }
}

fn press(sym: u32) -> Event {
    Event::KeyboardKey {
        device: InputDevice::new("test-keyboard", DeviceCapability::Keyboard),
        time_msec: 0,
        keycode: 0,
        state: KeyState::Pressed,
        raw_sym: Keysym::from(sym),
        sym: Keysym::from(sym),
        modifiers: ModifiersState {
            logo: true,
            shift: sym == keysyms::KEY_e,
            ..Default::default()
        },
    }
}

#[test]
fn headless_session_boots_and_executes_bindings() {
    let mut event_loop: EventLoop<'static, State> = EventLoop::try_new().unwrap();
    let mut state = State::new(test_config(), event_loop.get_signal());
    init_backend(&mut event_loop, &mut state).unwrap();
    dispatch(&mut event_loop, &mut state);

    {
        let shell = state.common.shell.read();
        assert_eq!(shell.outputs.len(), 1);
        assert_eq!(shell.outputs[0].name(), "HEADLESS-1");
        assert_eq!(
            shell.outputs[0].effective_resolution(),
            Size::new(1920, 1080)
        );
        assert!(shell.seat.has_keyboard());
        assert_eq!(shell.outputs[0].active_workspace(), Some(1));
    }

    // Map a window through the regular surface lifecycle.
    let window = ToplevelHandle::new();
    let submit = |event: Event, state: &State| state.backend.headless().submit(event);
    submit(Event::NewToplevel(window.clone()), &state);
    submit(Event::ToplevelCommit(window.clone()), &state);
    dispatch(&mut event_loop, &mut state);
    // The first commit answered with a "pick your own size" configure.
    assert_eq!(
        window.with_state(|s| s.scheduled_size),
        Some(Size::new(0, 0))
    );

    window.with_state(|s| {
        s.scheduled_size = None;
        s.surface_size = Size::new(640, 480);
    });
    submit(Event::ToplevelMapped(window.clone()), &state);
    dispatch(&mut event_loop, &mut state);

    {
        let shell = state.common.shell.read();
        assert_eq!(
            shell.seat.focused_node().map(|n| n.id()),
            Some(window.id())
        );
        assert!(window.activated());
    }

    // Super+2 switches to a fresh workspace; the window stays behind.
    submit(press(keysyms::KEY_2), &state);
    dispatch(&mut event_loop, &mut state);
    {
        let shell = state.common.shell.read();
        assert_eq!(shell.outputs[0].active_workspace(), Some(2));
        assert!(shell.workspaces.get(2).unwrap().active);
    }

    // Super+Shift+e terminates; the rest of the chain must not run.
    submit(press(keysyms::KEY_e), &state);
    dispatch(&mut event_loop, &mut state);
    assert!(state.common.should_stop);
    assert!(!state.common.shell.read().workspaces.contains(9));
}

#[test]
fn fullscreen_binding_round_trips() {
    let mut event_loop: EventLoop<'static, State> = EventLoop::try_new().unwrap();
    let mut state = State::new(test_config(), event_loop.get_signal());
    init_backend(&mut event_loop, &mut state).unwrap();
    dispatch(&mut event_loop, &mut state);

    let window = ToplevelHandle::new();
    window.with_state(|s| s.surface_size = Size::new(640, 480));
    state
        .backend
        .headless()
        .submit(Event::NewToplevel(window.clone()));
    state
        .backend
        .headless()
        .submit(Event::ToplevelMapped(window.clone()));
    dispatch(&mut event_loop, &mut state);

    let before = state
        .common
        .shell
        .read()
        .toplevel_by_handle(&window)
        .unwrap()
        .geometry();

    state
        .backend
        .headless()
        .submit(press(keysyms::KEY_f));
    dispatch(&mut event_loop, &mut state);
    {
        let shell = state.common.shell.read();
        let toplevel = shell.toplevel_by_handle(&window).unwrap();
        assert!(toplevel.is_fullscreen());
        assert_eq!(toplevel.geometry(), shell.outputs[0].geometry());
    }

    state
        .backend
        .headless()
        .submit(press(keysyms::KEY_f));
    dispatch(&mut event_loop, &mut state);
    {
        let shell = state.common.shell.read();
        let toplevel = shell.toplevel_by_handle(&window).unwrap();
        assert!(!toplevel.is_fullscreen());
        assert_eq!(toplevel.geometry(), before);
    }
}
