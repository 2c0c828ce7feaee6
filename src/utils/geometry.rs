// SPDX-License-Identifier: GPL-3.0-only

use std::ops::{Add, Sub};

pub use arbor_comp_config::output::Transform;

/// Scalar usable as a coordinate. Layout math runs on `i32`, cursor math on
/// `f64`.
pub trait Coordinate:
    Copy + PartialOrd + Add<Output = Self> + Sub<Output = Self> + Default + std::fmt::Debug
{
    fn from_f64(v: f64) -> Self;
    fn to_f64(self) -> f64;
}

impl Coordinate for i32 {
    fn from_f64(v: f64) -> i32 {
        v as i32
    }
    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Coordinate for f64 {
    fn from_f64(v: f64) -> f64 {
        v
    }
    fn to_f64(self) -> f64 {
        self
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point<N> {
    pub x: N,
    pub y: N,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size<N> {
    pub w: N,
    pub h: N,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rectangle<N> {
    pub loc: Point<N>,
    pub size: Size<N>,
}

impl<N: Coordinate> Point<N> {
    pub fn new(x: N, y: N) -> Point<N> {
        Point { x, y }
    }

    pub fn to_f64(self) -> Point<f64> {
        Point {
            x: self.x.to_f64(),
            y: self.y.to_f64(),
        }
    }
}

impl Point<f64> {
    pub fn to_i32_round(self) -> Point<i32> {
        Point {
            x: self.x.round() as i32,
            y: self.y.round() as i32,
        }
    }
}

impl<N: Coordinate> Add for Point<N> {
    type Output = Point<N>;
    fn add(self, other: Point<N>) -> Point<N> {
        Point {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl<N: Coordinate> Sub for Point<N> {
    type Output = Point<N>;
    fn sub(self, other: Point<N>) -> Point<N> {
        Point {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

impl<N: Coordinate> From<(N, N)> for Point<N> {
    fn from((x, y): (N, N)) -> Point<N> {
        Point { x, y }
    }
}

impl<N: Coordinate> Size<N> {
    pub fn new(w: N, h: N) -> Size<N> {
        Size { w, h }
    }

    pub fn to_f64(self) -> Size<f64> {
        Size {
            w: self.w.to_f64(),
            h: self.h.to_f64(),
        }
    }
}

impl Size<f64> {
    pub fn to_i32_round(self) -> Size<i32> {
        Size {
            w: self.w.round() as i32,
            h: self.h.round() as i32,
        }
    }
}

impl Size<i32> {
    pub fn is_empty(self) -> bool {
        self.w <= 0 || self.h <= 0
    }

    pub fn downscale(self, scale: f64) -> Size<f64> {
        Size {
            w: self.w as f64 / scale,
            h: self.h as f64 / scale,
        }
    }
}

impl<N: Coordinate> From<(N, N)> for Size<N> {
    fn from((w, h): (N, N)) -> Size<N> {
        Size { w, h }
    }
}

impl<N: Coordinate> Rectangle<N> {
    pub fn new(loc: impl Into<Point<N>>, size: impl Into<Size<N>>) -> Rectangle<N> {
        Rectangle {
            loc: loc.into(),
            size: size.into(),
        }
    }

    pub fn contains(&self, point: impl Into<Point<N>>) -> bool {
        let point = point.into();
        point.x >= self.loc.x
            && point.y >= self.loc.y
            && point.x < self.loc.x + self.size.w
            && point.y < self.loc.y + self.size.h
    }

    pub fn to_f64(self) -> Rectangle<f64> {
        Rectangle {
            loc: self.loc.to_f64(),
            size: self.size.to_f64(),
        }
    }
}

impl Rectangle<i32> {
    pub fn center(&self) -> Point<f64> {
        Point {
            x: self.loc.x as f64 + self.size.w as f64 / 2.0,
            y: self.loc.y as f64 + self.size.h as f64 / 2.0,
        }
    }

    pub fn overlaps(&self, other: &Rectangle<i32>) -> bool {
        self.loc.x < other.loc.x + other.size.w
            && other.loc.x < self.loc.x + self.size.w
            && self.loc.y < other.loc.y + other.size.h
            && other.loc.y < self.loc.y + self.size.h
    }

    pub fn intersection(&self, other: &Rectangle<i32>) -> Option<Rectangle<i32>> {
        if !self.overlaps(other) {
            return None;
        }
        let x1 = self.loc.x.max(other.loc.x);
        let y1 = self.loc.y.max(other.loc.y);
        let x2 = (self.loc.x + self.size.w).min(other.loc.x + other.size.w);
        let y2 = (self.loc.y + self.size.h).min(other.loc.y + other.size.h);
        Some(Rectangle::new((x1, y1), (x2 - x1, y2 - y1)))
    }
}

/// Behavior the core needs from the config-level [`Transform`] enum.
pub trait TransformExt {
    /// Applies the rotation to a size (90°/270° variants swap the axes).
    fn transform_size(&self, size: Size<i32>) -> Size<i32>;
}

impl TransformExt for Transform {
    fn transform_size(&self, size: Size<i32>) -> Size<i32> {
        match self {
            Transform::Rotate90
            | Transform::Rotate270
            | Transform::Flipped90
            | Transform::Flipped270 => Size {
                w: size.h,
                h: size.w,
            },
            _ => size,
        }
    }
}
