// SPDX-License-Identifier: GPL-3.0-only

use crate::backend::ResizeEdge;
use crate::shell::toplevel::Toplevel;
use crate::utils::geometry::{Point, Rectangle};

/// State captured when an interactive move starts: pointer motion is
/// consumed and translates the window by the cursor delta.
#[derive(Debug, Clone)]
pub struct MoveGrab {
    pub window: Toplevel,
    pub initial_window_location: Point<i32>,
    pub initial_cursor_location: Point<f64>,
}

impl MoveGrab {
    pub fn new_location(&self, cursor: Point<f64>) -> Point<i32> {
        let delta = cursor - self.initial_cursor_location;
        Point::new(
            self.initial_window_location.x + delta.x.round() as i32,
            self.initial_window_location.y + delta.y.round() as i32,
        )
    }
}

/// State captured when an interactive resize starts. The four initial edge
/// coordinates are kept so the box is recomputed from scratch on every
/// motion event.
#[derive(Debug, Clone)]
pub struct ResizeGrab {
    pub window: Toplevel,
    pub edges: ResizeEdge,
    pub initial_geometry: Rectangle<i32>,
    pub initial_cursor_location: Point<f64>,
}

impl ResizeGrab {
    /// The box after dragging to `cursor`, clamped so the dragged edge can
    /// never cross the opposite one (1-unit minimum on each axis).
    pub fn new_geometry(&self, cursor: Point<f64>) -> Rectangle<i32> {
        let delta = cursor - self.initial_cursor_location;
        let dx = delta.x.round() as i32;
        let dy = delta.y.round() as i32;

        let mut left = self.initial_geometry.loc.x;
        let mut right = left + self.initial_geometry.size.w;
        let mut top = self.initial_geometry.loc.y;
        let mut bottom = top + self.initial_geometry.size.h;

        if self.edges.contains(ResizeEdge::LEFT) {
            left = (left + dx).min(right - 1);
        } else if self.edges.contains(ResizeEdge::RIGHT) {
            right = (right + dx).max(left + 1);
        }
        if self.edges.contains(ResizeEdge::TOP) {
            top = (top + dy).min(bottom - 1);
        } else if self.edges.contains(ResizeEdge::BOTTOM) {
            bottom = (bottom + dy).max(top + 1);
        }

        Rectangle::new((left, top), (right - left, bottom - top))
    }
}

/// The data of the non-passthrough cursor modes. Dropping it (button
/// release or grabbed-node destruction) returns the cursor to passthrough.
#[derive(Debug, Clone)]
pub enum GrabState {
    Move(MoveGrab),
    Resize(ResizeGrab),
}

impl GrabState {
    pub fn window(&self) -> &Toplevel {
        match self {
            GrabState::Move(grab) => &grab.window,
            GrabState::Resize(grab) => &grab.window,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ToplevelHandle;

    fn grab(edges: ResizeEdge) -> ResizeGrab {
        ResizeGrab {
            window: Toplevel::new(ToplevelHandle::new()),
            edges,
            initial_geometry: Rectangle::new((100, 100), (200, 150)),
            initial_cursor_location: Point::new(0.0, 0.0),
        }
    }

    #[test]
    fn dragging_the_bottom_right_corner_grows_the_box() {
        let grab = grab(ResizeEdge::BOTTOM | ResizeEdge::RIGHT);
        let geometry = grab.new_geometry(Point::new(30.0, 20.0));
        assert_eq!(geometry, Rectangle::new((100, 100), (230, 170)));
    }

    #[test]
    fn dragging_the_left_edge_moves_the_origin() {
        let grab = grab(ResizeEdge::LEFT);
        let geometry = grab.new_geometry(Point::new(-40.0, 0.0));
        assert_eq!(geometry, Rectangle::new((60, 100), (240, 150)));
    }

    #[test]
    fn the_box_never_inverts() {
        let grab = grab(ResizeEdge::RIGHT);
        let geometry = grab.new_geometry(Point::new(-10_000.0, 0.0));
        assert_eq!(geometry.size.w, 1);
        assert_eq!(geometry.loc.x, 100);

        let grab = grab2_top();
        let geometry = grab.new_geometry(Point::new(0.0, 10_000.0));
        assert_eq!(geometry.size.h, 1);
        assert_eq!(geometry.loc.y, 100 + 150 - 1);
    }

    fn grab2_top() -> ResizeGrab {
        ResizeGrab {
            window: Toplevel::new(ToplevelHandle::new()),
            edges: ResizeEdge::TOP,
            initial_geometry: Rectangle::new((100, 100), (200, 150)),
            initial_cursor_location: Point::new(0.0, 0.0),
        }
    }
}
