// SPDX-License-Identifier: GPL-3.0-only

use parking_lot::Mutex;
use std::sync::{Arc, Weak};

use tracing::warn;

use arbor_comp_config::OutputConfig;

use crate::backend::{Anchor, Layer, Mode, OutputDevice, PendingOutputState};
use crate::shell::layer::LayerSurface;
use crate::shell::scene::{OutputLayout, Scene, SceneNodeId, SceneRoot};
use crate::utils::geometry::{Point, Rectangle, Size};

/// How far a mode's refresh rate may be from the requested one and still
/// count as a match, in mHz.
const REFRESH_TOLERANCE: i32 = 1_500;

#[derive(Debug, thiserror::Error)]
pub enum OutputConfigError {
    #[error("output has no modes to fall back to")]
    NoModes,
    #[error(transparent)]
    Commit(#[from] crate::backend::OutputCommitError),
}

/// Per-output scene subtrees, one per shell layer.
#[derive(Debug, Clone, Copy)]
pub struct OutputLayers {
    pub shell_background: SceneNodeId,
    pub shell_bottom: SceneNodeId,
    pub shell_top: SceneNodeId,
    pub shell_overlay: SceneNodeId,
}

#[derive(Debug)]
struct OutputState {
    position: Point<i32>,
    usable_area: Rectangle<i32>,
    layers: OutputLayers,
    layer_surfaces: Vec<LayerSurface>,
    workspaces: Vec<u32>,
    active_workspace: Option<u32>,
}

pub(crate) struct OutputInner {
    device: OutputDevice,
    state: Mutex<OutputState>,
}

/// One physical display and its arrangement state.
#[derive(Clone)]
pub struct Output(Arc<OutputInner>);

impl std::fmt::Debug for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Output")
            .field("name", &self.name())
            .finish()
    }
}

impl PartialEq for Output {
    fn eq(&self, other: &Output) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Output {}

impl Output {
    pub fn new(device: OutputDevice, root: &mut SceneRoot) -> Output {
        let layers = OutputLayers {
            shell_background: root
                .scene
                .create_tree(root.shell_layer_container(Layer::Background)),
            shell_bottom: root
                .scene
                .create_tree(root.shell_layer_container(Layer::Bottom)),
            shell_top: root.scene.create_tree(root.shell_layer_container(Layer::Top)),
            shell_overlay: root
                .scene
                .create_tree(root.shell_layer_container(Layer::Overlay)),
        };
        Output(Arc::new(OutputInner {
            device,
            state: Mutex::new(OutputState {
                position: Point::default(),
                usable_area: Rectangle::default(),
                layers,
                layer_surfaces: Vec::new(),
                workspaces: Vec::new(),
                active_workspace: None,
            }),
        }))
    }

    pub fn name(&self) -> &str {
        self.0.device.name()
    }

    pub fn device(&self) -> &OutputDevice {
        &self.0.device
    }

    pub fn position(&self) -> Point<i32> {
        self.0.state.lock().position
    }

    pub fn effective_resolution(&self) -> Size<i32> {
        self.0.device.effective_resolution()
    }

    /// Full output box in global layout coordinates.
    pub fn geometry(&self) -> Rectangle<i32> {
        let state = self.0.state.lock();
        Rectangle::new(state.position, self.0.device.effective_resolution())
    }

    pub fn center(&self) -> Point<f64> {
        self.geometry().center()
    }

    /// Full area minus exclusive-zone reservations, in output-local
    /// coordinates. Recomputed by [`Output::arrange_layers`].
    pub fn usable_area(&self) -> Rectangle<i32> {
        self.0.state.lock().usable_area
    }

    pub fn shell_layer_tree(&self, layer: Layer) -> SceneNodeId {
        let layers = self.0.state.lock().layers;
        match layer {
            Layer::Background => layers.shell_background,
            Layer::Bottom => layers.shell_bottom,
            Layer::Top => layers.shell_top,
            Layer::Overlay => layers.shell_overlay,
        }
    }

    pub fn add_layer_surface(&self, surface: LayerSurface) {
        self.0.state.lock().layer_surfaces.push(surface);
    }

    pub fn remove_layer_surface(&self, surface: &LayerSurface) {
        self.0
            .state
            .lock()
            .layer_surfaces
            .retain(|s| s != surface);
    }

    pub fn layer_surfaces(&self) -> Vec<LayerSurface> {
        self.0.state.lock().layer_surfaces.clone()
    }

    pub fn workspaces(&self) -> Vec<u32> {
        self.0.state.lock().workspaces.clone()
    }

    pub fn add_workspace(&self, id: u32) {
        let mut state = self.0.state.lock();
        if !state.workspaces.contains(&id) {
            state.workspaces.push(id);
        }
    }

    pub fn remove_workspace(&self, id: u32) {
        let mut state = self.0.state.lock();
        state.workspaces.retain(|w| *w != id);
        if state.active_workspace == Some(id) {
            state.active_workspace = None;
        }
    }

    pub fn active_workspace(&self) -> Option<u32> {
        self.0.state.lock().active_workspace
    }

    pub fn set_active_workspace(&self, id: u32) {
        let mut state = self.0.state.lock();
        debug_assert!(state.workspaces.contains(&id));
        state.active_workspace = Some(id);
    }

    /// Re-reads this output's position from the global layout. Must be
    /// called whenever the layout changes or a mode/transform/scale is
    /// applied.
    pub fn update_position(&self, layout: &OutputLayout) {
        if let Some(position) = layout.position_of(self) {
            self.0.state.lock().position = position;
        }
    }

    /// Two-pass shell-layer layout.
    ///
    /// Pass one walks the layers from highest to lowest and only lays out
    /// surfaces that reserve a positive exclusive zone, shrinking the
    /// running usable area edge by edge. Pass two repeats the walk for the
    /// remaining surfaces against the now-final usable area, so a
    /// lower-priority reservation can never shift geometry that pass one
    /// already handed out, and exclusive surfaces win regardless of
    /// declaration order.
    pub fn arrange_layers(&self, scene: &mut Scene) {
        let resolution = self.0.device.effective_resolution();
        if resolution.is_empty() {
            return;
        }
        let full_area = Rectangle::new((0, 0), resolution);
        let mut usable_area = full_area;

        for layer in Layer::ALL.iter().rev() {
            for surface in self.layer_surfaces() {
                let state = surface.handle().current();
                if state.layer == *layer && surface.is_mapped() && state.exclusive_zone > 0 {
                    self.arrange_surface(&surface, &mut usable_area, true, scene);
                }
            }
        }
        for layer in Layer::ALL.iter().rev() {
            for surface in self.layer_surfaces() {
                let state = surface.handle().current();
                if state.layer == *layer && surface.is_mapped() && state.exclusive_zone <= 0 {
                    self.arrange_surface(&surface, &mut usable_area, false, scene);
                }
            }
        }

        debug_assert!(full_area.intersection(&usable_area) == Some(usable_area));
        self.0.state.lock().usable_area = usable_area;
    }

    fn arrange_surface(
        &self,
        surface: &LayerSurface,
        usable_area: &mut Rectangle<i32>,
        exclusive: bool,
        scene: &mut Scene,
    ) {
        let props = surface.handle().current();
        let area = *usable_area;
        let margin = props.margin;

        let mut size = props.desired_size;
        if props.anchor.contains(Anchor::LEFT | Anchor::RIGHT) || size.w == 0 {
            size.w = (area.size.w - margin.left - margin.right).max(1);
        }
        if props.anchor.contains(Anchor::TOP | Anchor::BOTTOM) || size.h == 0 {
            size.h = (area.size.h - margin.top - margin.bottom).max(1);
        }

        let x = if props.anchor.contains(Anchor::LEFT) {
            area.loc.x + margin.left
        } else if props.anchor.contains(Anchor::RIGHT) {
            area.loc.x + area.size.w - size.w - margin.right
        } else {
            area.loc.x + (area.size.w - size.w) / 2
        };
        let y = if props.anchor.contains(Anchor::TOP) {
            area.loc.y + margin.top
        } else if props.anchor.contains(Anchor::BOTTOM) {
            area.loc.y + area.size.h - size.h - margin.bottom
        } else {
            area.loc.y + (area.size.h - size.h) / 2
        };

        let geometry = Rectangle::new((x, y), size);
        surface.with_state(|state| {
            state.geometry = geometry;
            if let Some(node) = state.scene_node {
                scene.set_position(node, geometry.loc);
            }
        });
        surface.handle().configure(size);

        if exclusive {
            let zone = props.exclusive_zone;
            match exclusive_edge(props.anchor) {
                Some(ExclusiveEdge::Top) => {
                    let d = zone.min(usable_area.size.h);
                    usable_area.loc.y += d;
                    usable_area.size.h -= d;
                }
                Some(ExclusiveEdge::Bottom) => {
                    usable_area.size.h -= zone.min(usable_area.size.h);
                }
                Some(ExclusiveEdge::Left) => {
                    let d = zone.min(usable_area.size.w);
                    usable_area.loc.x += d;
                    usable_area.size.w -= d;
                }
                Some(ExclusiveEdge::Right) => {
                    usable_area.size.w -= zone.min(usable_area.size.w);
                }
                None => {}
            }
        }
    }

    /// Finds the closest advertised mode for `config` and commits the
    /// requested state. With `test` set, only checks feasibility and leaves
    /// the device untouched. On a failed commit nothing is mutated and the
    /// failure is returned to the requester.
    pub fn apply_config(&self, config: &OutputConfig, test: bool) -> Result<(), OutputConfigError> {
        let mode = self.match_mode(config)?;

        let mut pending = PendingOutputState {
            mode: Some(mode),
            enabled: Some(config.enabled),
            ..Default::default()
        };
        if config.enabled {
            pending.scale = Some(config.scale);
            pending.transform = Some(config.transform);
            pending.adaptive_sync = Some(config.vrr);
        }

        if test {
            self.0.device.test_state(&pending)?;
        } else {
            self.0.device.commit_state(&pending)?;
        }
        Ok(())
    }

    fn match_mode(&self, config: &OutputConfig) -> Result<Mode, OutputConfigError> {
        let modes = self.0.device.modes();
        if modes.is_empty() {
            return Err(OutputConfigError::NoModes);
        }

        let (width, height) = config.mode_size();
        if (width, height) == (0, 0) {
            return self.preferred_or_first();
        }

        let candidates = modes
            .iter()
            .filter(|m| m.size == Size::new(width, height))
            .copied()
            .collect::<Vec<_>>();

        let best = match config.mode_refresh() {
            Some(refresh) => candidates
                .iter()
                .filter(|m| (m.refresh - refresh as i32).abs() <= REFRESH_TOLERANCE)
                .min_by_key(|m| (m.refresh - refresh as i32).abs())
                .copied(),
            None => candidates
                .iter()
                .find(|m| m.preferred)
                .or_else(|| candidates.iter().max_by_key(|m| m.refresh))
                .copied(),
        };

        match best {
            Some(mode) => Ok(mode),
            None => {
                warn!(
                    output = self.name(),
                    "No mode matches {}x{}@{:?}, using the preferred mode",
                    width,
                    height,
                    config.mode_refresh(),
                );
                self.preferred_or_first()
            }
        }
    }

    fn preferred_or_first(&self) -> Result<Mode, OutputConfigError> {
        self.0
            .device
            .preferred_mode()
            .ok_or(OutputConfigError::NoModes)
    }

    pub fn downgrade(&self) -> WeakOutput {
        WeakOutput(Arc::downgrade(&self.0))
    }
}

#[derive(Debug, Clone, Copy)]
enum ExclusiveEdge {
    Top,
    Bottom,
    Left,
    Right,
}

/// The edge a positive exclusive zone reserves. Surfaces anchored to a
/// corner (or to no edge at all) reserve nothing.
fn exclusive_edge(anchor: Anchor) -> Option<ExclusiveEdge> {
    let top = anchor.contains(Anchor::TOP);
    let bottom = anchor.contains(Anchor::BOTTOM);
    let left = anchor.contains(Anchor::LEFT);
    let right = anchor.contains(Anchor::RIGHT);

    if top && !bottom && left == right {
        Some(ExclusiveEdge::Top)
    } else if bottom && !top && left == right {
        Some(ExclusiveEdge::Bottom)
    } else if left && !right && top == bottom {
        Some(ExclusiveEdge::Left)
    } else if right && !left && top == bottom {
        Some(ExclusiveEdge::Right)
    } else {
        None
    }
}

#[derive(Clone, Default)]
pub struct WeakOutput(Weak<OutputInner>);

impl std::fmt::Debug for WeakOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WeakOutput")
    }
}

impl WeakOutput {
    pub fn upgrade(&self) -> Option<Output> {
        self.0.upgrade().map(Output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{
        KeyboardInteractivity, LayerSurfaceHandle, LayerSurfaceState, Margins, Mode, OutputDevice,
    };

    fn test_device(modes: Vec<Mode>) -> OutputDevice {
        let device = OutputDevice::new("TEST-1", "make", "model", modes);
        let preferred = device.preferred_mode().unwrap();
        device
            .commit_state(&PendingOutputState {
                mode: Some(preferred),
                enabled: Some(true),
                ..Default::default()
            })
            .unwrap();
        device
    }

    fn fhd_modes() -> Vec<Mode> {
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
        ]
    }

    fn mapped_layer_surface(
        output: &Output,
        state: LayerSurfaceState,
    ) -> crate::shell::layer::LayerSurface {
        let handle = LayerSurfaceHandle::new("test", None, state);
        let surface = crate::shell::layer::LayerSurface::new(handle, output.downgrade());
        surface.with_state(|s| s.mapped = true);
        output.add_layer_surface(surface.clone());
        surface
    }

    #[test]
    fn exclusive_top_bar_shrinks_usable_area_before_overlays() {
        let mut root = SceneRoot::new();
        let output = Output::new(test_device(fhd_modes()), &mut root);

        let bar = mapped_layer_surface(
            &output,
            LayerSurfaceState {
                layer: Layer::Top,
                anchor: Anchor::TOP | Anchor::LEFT | Anchor::RIGHT,
                exclusive_zone: 40,
                margin: Margins::default(),
                desired_size: Size::new(0, 40),
                keyboard_interactivity: KeyboardInteractivity::None,
            },
        );
        let overlay = mapped_layer_surface(
            &output,
            LayerSurfaceState {
                layer: Layer::Overlay,
                anchor: Anchor::empty(),
                exclusive_zone: 0,
                margin: Margins::default(),
                desired_size: Size::new(600, 400),
                keyboard_interactivity: KeyboardInteractivity::None,
            },
        );

        output.arrange_layers(&mut root.scene);

        assert_eq!(
            output.usable_area(),
            Rectangle::new((0, 40), (1920, 1040))
        );
        assert_eq!(bar.geometry(), Rectangle::new((0, 0), (1920, 40)));
        // The non-exclusive overlay is centered in the shrunken area.
        assert_eq!(
            overlay.geometry(),
            Rectangle::new((660, 40 + (1040 - 400) / 2), (600, 400))
        );
        assert_eq!(overlay.handle().configured_size(), Some(Size::new(600, 400)));
    }

    #[test]
    fn later_exclusive_surfaces_do_not_move_earlier_ones() {
        let mut root = SceneRoot::new();
        let output = Output::new(test_device(fhd_modes()), &mut root);

        // Declared first, sits in a lower layer; the top-layer bar must
        // still be arranged before it.
        let bottom_bar = mapped_layer_surface(
            &output,
            LayerSurfaceState {
                layer: Layer::Bottom,
                anchor: Anchor::BOTTOM | Anchor::LEFT | Anchor::RIGHT,
                exclusive_zone: 30,
                margin: Margins::default(),
                desired_size: Size::new(0, 30),
                keyboard_interactivity: KeyboardInteractivity::None,
            },
        );
        let top_bar = mapped_layer_surface(
            &output,
            LayerSurfaceState {
                layer: Layer::Top,
                anchor: Anchor::TOP | Anchor::LEFT | Anchor::RIGHT,
                exclusive_zone: 40,
                margin: Margins::default(),
                desired_size: Size::new(0, 40),
                keyboard_interactivity: KeyboardInteractivity::None,
            },
        );

        output.arrange_layers(&mut root.scene);

        assert_eq!(top_bar.geometry().loc, Point::new(0, 0));
        assert_eq!(bottom_bar.geometry().loc, Point::new(0, 1080 - 30));
        assert_eq!(
            output.usable_area(),
            Rectangle::new((0, 40), (1920, 1080 - 40 - 30))
        );
    }

    #[test]
    fn mode_match_prefers_closest_refresh_within_tolerance() {
        let mut root = SceneRoot::new();
        let output = Output::new(test_device(fhd_modes()), &mut root);

        let config = OutputConfig {
            mode: ((1920, 1080), Some(59_950)),
            ..Default::default()
        };
        output.apply_config(&config, false).unwrap();
        assert_eq!(output.device().current_mode().unwrap().refresh, 59_940);
    }

    #[test]
    fn unmatched_mode_falls_back_to_preferred() {
        let mut root = SceneRoot::new();
        let output = Output::new(test_device(fhd_modes()), &mut root);

        let config = OutputConfig {
            mode: ((2560, 1440), Some(60_000)),
            ..Default::default()
        };
        output.apply_config(&config, false).unwrap();
        assert_eq!(
            output.device().current_mode().unwrap().size,
            Size::new(1920, 1080)
        );
        assert_eq!(output.device().current_mode().unwrap().refresh, 60_000);
    }

    #[test]
    fn test_mode_does_not_mutate_the_device() {
        let mut root = SceneRoot::new();
        let output = Output::new(test_device(fhd_modes()), &mut root);
        let before = output.device().current_mode();

        let config = OutputConfig {
            mode: ((1920, 1080), Some(59_950)),
            scale: 2.0,
            ..Default::default()
        };
        output.apply_config(&config, true).unwrap();
        assert_eq!(output.device().current_mode(), before);
        assert_eq!(output.device().scale(), 1.0);
    }
}
