use nalgebra::{Point3, Vector3};

/// Scalar field value stored per voxel.
pub type Value = f32;

/// A 3D point with [`Value`] components.
pub type Point = Point3<Value>;

/// A 3D vector with [`Value`] components.
pub type Vector = Vector3<Value>;

/// Integer voxel coordinate `(x, y, z)`.
pub type Coord = Point3<i32>;

/// Integer half-extent of a generated region, one component per axis.
pub type Extent = Vector3<i32>;

/// A scalar field rule: maps a voxel [`Coord`] to a [`Value`].
///
/// Any closure `Fn(Coord) -> Value` can be passed where a `&CompiledFunction` is expected.
pub type CompiledFunction = dyn Fn(Coord) -> Value;
