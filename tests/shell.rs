//! Scenario tests for focus routing, workspace switching and fullscreen
//! behavior, driven through the same surface handles a backend would hand
//! the shell.

use arbor_comp::backend::{
    Anchor, ButtonState, KeyboardInteractivity, Layer, LayerSurfaceHandle, LayerSurfaceState,
    Margins, Mode, OutputDevice, ResizeEdge, ToplevelHandle,
};
use arbor_comp::config::StaticConfig;
use arbor_comp::shell::node::Node;
use arbor_comp::shell::Shell;
use arbor_comp::utils::geometry::{Point, Rectangle, Size};

fn fhd_device(name: &str) -> OutputDevice {
    OutputDevice::new(
        name,
        "make",
        "model",
        vec![Mode {
            size: Size::new(1920, 1080),
            refresh: 60_000,
            preferred: true,
        }],
    )
}

fn shell_with_output() -> Shell {
    let mut shell = Shell::new();
    shell.add_output(fhd_device("OUT-1"), &StaticConfig::default());
    shell
}

fn map_window(shell: &mut Shell, size: (i32, i32)) -> ToplevelHandle {
    let handle = ToplevelHandle::new();
    handle.with_state(|state| state.surface_size = Size::new(size.0, size.1));
    shell.new_toplevel(handle.clone());
    shell.map_toplevel(&handle).unwrap();
    handle
}

fn layer_surface(
    shell: &mut Shell,
    layer: Layer,
    interactivity: KeyboardInteractivity,
    exclusive_zone: i32,
) -> LayerSurfaceHandle {
    let handle = LayerSurfaceHandle::new(
        "test",
        None,
        LayerSurfaceState {
            layer,
            anchor: Anchor::TOP | Anchor::LEFT | Anchor::RIGHT,
            exclusive_zone,
            margin: Margins::default(),
            desired_size: Size::new(0, 40),
            keyboard_interactivity: interactivity,
        },
    );
    shell.new_layer_surface(handle.clone()).unwrap();
    shell.map_layer_surface(&handle);
    handle
}

fn focused_handle(shell: &Shell) -> Option<usize> {
    shell.seat.focused_node().map(|node| node.id())
}

#[test]
fn new_windows_are_centered_in_the_usable_area() {
    let mut shell = shell_with_output();
    let handle = map_window(&mut shell, (600, 400));
    let toplevel = shell.toplevel_by_handle(&handle).unwrap();
    assert_eq!(
        toplevel.geometry(),
        Rectangle::new(((1920 - 600) / 2, (1080 - 400) / 2), (600, 400))
    );
}

#[test]
fn placement_respects_reserved_areas() {
    let mut shell = shell_with_output();
    layer_surface(&mut shell, Layer::Top, KeyboardInteractivity::None, 40);

    let output = shell.outputs[0].clone();
    assert_eq!(output.usable_area(), Rectangle::new((0, 40), (1920, 1040)));

    let handle = map_window(&mut shell, (600, 400));
    let toplevel = shell.toplevel_by_handle(&handle).unwrap();
    assert_eq!(
        toplevel.geometry().loc,
        Point::new((1920 - 600) / 2, 40 + (1040 - 400) / 2)
    );
}

#[test]
fn oversized_windows_never_start_outside_the_usable_area() {
    let mut shell = shell_with_output();
    layer_surface(&mut shell, Layer::Top, KeyboardInteractivity::None, 40);
    let handle = map_window(&mut shell, (2500, 1500));
    let toplevel = shell.toplevel_by_handle(&handle).unwrap();
    assert_eq!(toplevel.geometry().loc, Point::new(0, 40));
}

#[test]
fn clicking_a_window_focuses_it_and_destroy_moves_focus_on() {
    // Scenario: A mapped first, B second; clicking A activates it and
    // destroying it hands focus to B.
    let mut shell = shell_with_output();
    let a = map_window(&mut shell, (400, 300));
    let b = map_window(&mut shell, (400, 300));

    // B was mapped last and holds focus.
    assert_eq!(focused_handle(&shell), Some(b.id()));
    assert!(b.activated());
    assert!(!a.activated());

    // Separate the windows, then click on A.
    shell
        .toplevel_by_handle(&a)
        .unwrap()
        .set_geometry(Rectangle::new((0, 0), (400, 300)));
    shell
        .toplevel_by_handle(&b)
        .unwrap()
        .set_geometry(Rectangle::new((800, 0), (400, 300)));
    shell.seat.cursor.position = Point::new(10.0, 10.0);
    shell.process_cursor_motion(0);
    shell.on_pointer_button(ButtonState::Pressed);

    assert_eq!(focused_handle(&shell), Some(a.id()));
    assert!(a.activated());
    assert!(!b.activated());

    shell.unmap_toplevel(&a);
    assert_eq!(focused_handle(&shell), Some(b.id()));
    assert!(b.activated());
}

#[test]
fn focusing_the_focused_window_changes_nothing() {
    let mut shell = shell_with_output();
    let handle = map_window(&mut shell, (400, 300));
    let toplevel = shell.toplevel_by_handle(&handle).unwrap().clone();
    assert!(handle.activated());

    let node = Node::from(toplevel);
    let result = shell.focus_node(Some(&node));
    assert_eq!(result, arbor_comp::shell::FocusResult::Unchanged);
    assert!(handle.activated());
}

#[test]
fn exclusive_layer_surfaces_cannot_be_preempted() {
    // Scenario: an exclusive on-screen keyboard holds focus against clicks
    // on a toplevel until it goes away.
    let mut shell = shell_with_output();
    let window = map_window(&mut shell, (400, 300));
    let osk = layer_surface(
        &mut shell,
        Layer::Overlay,
        KeyboardInteractivity::Exclusive,
        0,
    );

    assert_eq!(focused_handle(&shell), Some(osk.id()));

    // Click right in the middle of the toplevel.
    let geometry = shell.toplevel_by_handle(&window).unwrap().geometry();
    shell.seat.cursor.position = geometry.center();
    shell.process_cursor_motion(0);
    shell.on_pointer_button(ButtonState::Pressed);
    assert_eq!(focused_handle(&shell), Some(osk.id()));

    shell.unmap_layer_surface(&osk);
    assert_eq!(focused_handle(&shell), Some(window.id()));
}

#[test]
fn a_newer_exclusive_surface_takes_over_and_hands_back() {
    let mut shell = shell_with_output();
    let osk = layer_surface(
        &mut shell,
        Layer::Overlay,
        KeyboardInteractivity::Exclusive,
        0,
    );
    let lock = layer_surface(
        &mut shell,
        Layer::Top,
        KeyboardInteractivity::Exclusive,
        0,
    );

    assert_eq!(focused_handle(&shell), Some(lock.id()));
    shell.unmap_layer_surface(&lock);
    assert_eq!(focused_handle(&shell), Some(osk.id()));
}

#[test]
fn closing_an_interactive_overlay_restores_the_last_window() {
    let mut shell = shell_with_output();
    let window = map_window(&mut shell, (400, 300));
    let launcher = layer_surface(
        &mut shell,
        Layer::Top,
        KeyboardInteractivity::OnDemand,
        0,
    );
    assert_eq!(focused_handle(&shell), Some(launcher.id()));

    shell.unmap_layer_surface(&launcher);
    assert_eq!(focused_handle(&shell), Some(window.id()));
    assert!(window.activated());
}

#[test]
fn workspace_switch_creates_lazily_and_is_idempotent() {
    // Scenario: "workspace 3" creates and activates workspace 3; a second
    // invocation is a no-op without a cursor warp.
    let mut shell = shell_with_output();
    let output = shell.outputs[0].clone();
    assert_eq!(output.active_workspace(), Some(1));

    shell.focus_or_create_workspace(3);
    assert_eq!(output.active_workspace(), Some(3));
    assert_eq!(shell.seat.cursor.position, output.center());
    assert!(shell.workspaces.get(3).unwrap().active);
    assert!(!shell.workspaces.get(1).unwrap().active);

    shell.seat.cursor.position = Point::new(5.0, 5.0);
    shell.process_cursor_motion(0);
    shell.focus_or_create_workspace(3);
    assert_eq!(shell.seat.cursor.position, Point::new(5.0, 5.0));
    assert_eq!(output.active_workspace(), Some(3));
}

#[test]
fn switching_workspaces_hides_windows_and_restores_focus() {
    let mut shell = shell_with_output();
    let first = map_window(&mut shell, (400, 300));
    let first_toplevel = shell.toplevel_by_handle(&first).unwrap().clone();
    let first_node = first_toplevel.with_state(|s| s.scene_node).unwrap();

    shell.focus_or_create_workspace(2);
    assert!(!shell.root.scene.visible(first_node));
    let _second = map_window(&mut shell, (300, 200));

    shell.focus_or_create_workspace(1);
    assert!(shell.root.scene.visible(first_node));
    assert_eq!(focused_handle(&shell), Some(first.id()));
}

#[test]
fn fullscreen_round_trips_to_the_exact_geometry() {
    let mut shell = shell_with_output();
    let handle = map_window(&mut shell, (612, 433));
    let toplevel = shell.toplevel_by_handle(&handle).unwrap().clone();
    let before = toplevel.geometry();

    shell.toggle_fullscreen(&toplevel);
    assert!(toplevel.is_fullscreen());
    assert_eq!(toplevel.geometry(), shell.outputs[0].geometry());
    assert_eq!(handle.with_state(|s| s.scheduled_size), Some(Size::new(1920, 1080)));

    shell.toggle_fullscreen(&toplevel);
    assert!(!toplevel.is_fullscreen());
    assert_eq!(toplevel.geometry(), before);
}

#[test]
fn only_one_window_per_workspace_can_be_fullscreen() {
    let mut shell = shell_with_output();
    let a = map_window(&mut shell, (400, 300));
    let b = map_window(&mut shell, (500, 350));
    let a = shell.toplevel_by_handle(&a).unwrap().clone();
    let b = shell.toplevel_by_handle(&b).unwrap().clone();

    shell.toggle_fullscreen(&a);
    assert!(a.is_fullscreen());
    shell.toggle_fullscreen(&b);
    assert!(b.is_fullscreen());
    assert!(!a.is_fullscreen());

    let id = shell.workspaces.workspace_for(&b).unwrap();
    let workspace = shell.workspaces.get(id).unwrap();
    assert_eq!(workspace.fullscreen.as_ref(), Some(&b));
    assert!(workspace.floating.contains(&a));
}

#[test]
fn destroying_the_fullscreen_window_clears_the_slot() {
    let mut shell = shell_with_output();
    let handle = map_window(&mut shell, (400, 300));
    let toplevel = shell.toplevel_by_handle(&handle).unwrap().clone();
    shell.toggle_fullscreen(&toplevel);

    shell.unmap_toplevel(&handle);
    let workspace = shell.workspaces.get(1).unwrap();
    assert!(workspace.fullscreen.is_none());
    assert!(workspace.floating.is_empty());
}

#[test]
fn node_destroy_fires_exactly_once_and_detaches_listeners() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    let mut shell = shell_with_output();
    let handle = map_window(&mut shell, (400, 300));
    let toplevel = shell.toplevel_by_handle(&handle).unwrap().clone();

    let destroys = Arc::new(AtomicUsize::new(0));
    let counter = destroys.clone();
    let _sub = shell.root.node_destroy.subscribe(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    shell.unmap_toplevel(&handle);
    // A late destroy notification for the same surface must not re-fire.
    shell.toplevel_destroyed(&handle);
    assert_eq!(destroys.load(Ordering::SeqCst), 1);
    assert!(!arbor_comp::utils::IsAlive::alive(&Node::from(toplevel)));
}

#[test]
fn outputs_extend_the_layout_to_the_right() {
    let mut shell = shell_with_output();
    shell.add_output(fhd_device("OUT-2"), &StaticConfig::default());

    let second = shell.output_by_name("OUT-2").unwrap();
    assert_eq!(second.position(), Point::new(1920, 0));
    assert_eq!(
        second.geometry(),
        Rectangle::new((1920, 0), (1920, 1080))
    );
}

#[test]
fn crossing_outputs_moves_the_active_output() {
    let mut shell = shell_with_output();
    shell.add_output(fhd_device("OUT-2"), &StaticConfig::default());

    shell.seat.cursor.position = Point::new(2000.0, 500.0);
    shell.process_cursor_motion(0);
    assert_eq!(
        shell.seat.active_output().map(|o| o.name().to_string()),
        Some("OUT-2".to_string())
    );
}

#[test]
fn removing_an_output_rehomes_its_workspaces() {
    let mut shell = shell_with_output();
    let second = fhd_device("OUT-2");
    shell.add_output(second.clone(), &StaticConfig::default());

    let first = shell.output_by_name("OUT-1").unwrap().clone();
    let orphaned = shell.output_by_name("OUT-2").unwrap().workspaces();
    shell.remove_output(&second);

    for id in orphaned {
        assert_eq!(shell.workspaces.get(id).unwrap().output, first);
        assert!(first.workspaces().contains(&id));
    }
    assert_eq!(shell.outputs.len(), 1);
}

#[test]
fn grabbed_windows_follow_the_cursor_and_release_resets() {
    use arbor_comp::input::CursorMode;

    let mut shell = shell_with_output();
    let handle = map_window(&mut shell, (400, 300));
    let toplevel = shell.toplevel_by_handle(&handle).unwrap().clone();
    let start = toplevel.geometry().loc;

    shell.seat.cursor.position = toplevel.geometry().center();
    shell.begin_interactive(&toplevel, CursorMode::Move, ResizeEdge::empty());

    shell.seat.cursor.position = shell.seat.cursor.position + Point::new(50.0, -20.0);
    shell.process_cursor_motion(0);
    assert_eq!(toplevel.geometry().loc, start + Point::new(50, -20));

    shell.on_pointer_button(ButtonState::Released);
    assert_eq!(shell.seat.cursor.mode, CursorMode::Passthrough);
    assert!(shell.seat.cursor.grab.is_none());
}

#[test]
fn destroying_the_grabbed_window_resets_the_cursor() {
    use arbor_comp::input::CursorMode;

    let mut shell = shell_with_output();
    let handle = map_window(&mut shell, (400, 300));
    let toplevel = shell.toplevel_by_handle(&handle).unwrap().clone();

    shell.begin_interactive(&toplevel, CursorMode::Move, ResizeEdge::empty());
    shell.unmap_toplevel(&handle);

    assert_eq!(shell.seat.cursor.mode, CursorMode::Passthrough);
    assert!(shell.seat.cursor.grab.is_none());
}
