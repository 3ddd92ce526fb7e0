//! Core geometric types shared by decomposition, registry and placement
//!
//! Coordinates follow a right-handed frame: `x` runs left to right along the
//! flow axis, `y` is vertical, `z` points out of the cabinet front.

use std::fmt;

use serde::Deserialize;

/// A point or offset in 3D space
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(from = "[f64; 3]")]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// True when every component is finite
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Width => self.x,
            Axis::Height => self.y,
            Axis::Depth => self.z,
        }
    }

    pub fn set(&mut self, axis: Axis, value: f64) {
        match axis {
            Axis::Width => self.x = value,
            Axis::Height => self.y = value,
            Axis::Depth => self.z = value,
        }
    }

    pub fn add(&self, other: Vec3) -> Vec3 {
        Vec3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl From<[f64; 3]> for Vec3 {
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

/// Extent of a box along each axis (width x height x depth)
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(from = "[f64; 3]")]
pub struct Size3 {
    pub width: f64,
    pub height: f64,
    pub depth: f64,
}

impl Size3 {
    pub fn new(width: f64, height: f64, depth: f64) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// Cube with the same extent on every axis
    pub fn uniform(size: f64) -> Self {
        Self::new(size, size, size)
    }

    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Width => self.width,
            Axis::Height => self.height,
            Axis::Depth => self.depth,
        }
    }

    /// Half extents as a vector
    pub fn half(&self) -> Vec3 {
        Vec3::new(self.width / 2.0, self.height / 2.0, self.depth / 2.0)
    }

    pub fn is_finite(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.depth.is_finite()
    }

    /// Raise every component to at least `min`
    pub fn floored(&self, min: f64) -> Size3 {
        Size3::new(
            floor_dimension(self.width, min),
            floor_dimension(self.height, min),
            floor_dimension(self.depth, min),
        )
    }
}

impl From<[f64; 3]> for Size3 {
    fn from([width, height, depth]: [f64; 3]) -> Self {
        Self::new(width, height, depth)
    }
}

impl fmt::Display for Size3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} x {:.1} x {:.1}", self.width, self.height, self.depth)
    }
}

/// Clamp a length to a strictly positive floor. Non-finite input collapses to the floor.
pub fn floor_dimension(value: f64, min: f64) -> f64 {
    if value.is_finite() && value > min {
        value
    } else {
        min
    }
}

/// One of the three box axes, named the way cabinet makers name them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    #[serde(alias = "x", alias = "ancho")]
    Width,
    #[serde(alias = "y", alias = "altura", alias = "alto")]
    Height,
    #[serde(alias = "z", alias = "profundidad", alias = "fondo")]
    Depth,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::Width, Axis::Height, Axis::Depth];
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Width => write!(f, "width"),
            Axis::Height => write!(f, "height"),
            Axis::Depth => write!(f, "depth"),
        }
    }
}

/// Axis-aligned bounding box stored as min/max corners
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box of the given size centred on `center`
    pub fn from_center(center: Vec3, size: Size3) -> Self {
        let half = size.half();
        Self {
            min: Vec3::new(center.x - half.x, center.y - half.y, center.z - half.z),
            max: Vec3::new(center.x + half.x, center.y + half.y, center.z + half.z),
        }
    }

    /// Box of the given size centred on the origin (module space)
    pub fn centered(size: Size3) -> Self {
        Self::from_center(Vec3::ZERO, size)
    }

    pub fn center(&self) -> Vec3 {
        Vec3::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
            (self.min.z + self.max.z) / 2.0,
        )
    }

    pub fn size(&self) -> Size3 {
        Size3::new(
            self.max.x - self.min.x,
            self.max.y - self.min.y,
            self.max.z - self.min.z,
        )
    }

    /// Check if this box contains a point (faces inclusive)
    pub fn contains(&self, point: Vec3) -> bool {
        Axis::ALL
            .iter()
            .all(|&a| point.get(a) >= self.min.get(a) && point.get(a) <= self.max.get(a))
    }

    /// Check if this box intersects another (touching faces do not count)
    pub fn intersects(&self, other: &Aabb) -> bool {
        Axis::ALL.iter().all(|&a| {
            self.min.get(a) < other.max.get(a) && self.max.get(a) > other.min.get(a)
        })
    }

    /// Smallest box containing both
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb::new(
            Vec3::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            Vec3::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        )
    }

    /// World-space box of a `size` block centred on `center` and turned
    /// `yaw_degrees` about the vertical axis.
    pub fn rotated_footprint(center: Vec3, size: Size3, yaw_degrees: f64) -> Aabb {
        let (sin, cos) = yaw_degrees.to_radians().sin_cos();
        let (sin, cos) = (sin.abs(), cos.abs());
        let half = size.half();
        let extent = Size3::new(
            2.0 * (cos * half.x + sin * half.z),
            size.height,
            2.0 * (sin * half.x + cos * half.z),
        );
        Aabb::from_center(center, extent)
    }
}
