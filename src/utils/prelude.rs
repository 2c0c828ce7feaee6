// SPDX-License-Identifier: GPL-3.0-only

pub use crate::utils::geometry::{Point, Rectangle, Size, Transform, TransformExt};
pub use crate::utils::IsAlive;

pub use crate::state::State;
