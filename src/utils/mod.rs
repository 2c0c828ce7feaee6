// SPDX-License-Identifier: GPL-3.0-only

pub mod geometry;
mod ids;
pub(crate) use self::ids::id_gen;
pub mod prelude;
pub mod signal;

/// Liveness of a shared handle. Implementors flip to `false` exactly once,
/// when the underlying object is destroyed; stacks and weak references treat
/// a dead handle as absent.
pub trait IsAlive {
    fn alive(&self) -> bool;
}
