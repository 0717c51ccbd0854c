use crate::types::{Point, Value};

// Return the interpolation factor t corresponding to iso_val
pub fn find_t(v0: Value, v1: Value, iso_val: Value) -> Value {
    let delta = v1 - v0;
    if delta == 0.0 {
        return 0.5;
    }
    ((iso_val - v0) / delta).clamp(0.0, 1.0)
}

// Linear interpolation
pub fn lerp(a: Value, b: Value, t: Value) -> Value {
    a + (b - a) * t
}

// Linearly interpolate between two points by factor t
pub fn interpolate_points(p0: Point, p1: Point, t: Value) -> Point {
    Point::new(lerp(p0.x, p1.x, t), lerp(p0.y, p1.y, t), lerp(p0.z, p1.z, t))
}
