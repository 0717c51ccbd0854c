//! Procedural field generators.
//!
//! Each generator evaluates a rule at every integer coordinate of a cuboid
//! region and writes the result into a fresh [`Volume`]:
//!
//! ```text
//! create_box       min(size - |coord|)        [-size - pad, size + pad]   flood filled
//! create_function  f(coord)                   [-size - pad, size + pad]   flood filled
//! create_noise     noise(coord * scale)       [-size, size]               raw, background 0
//! make_sphere      |coord - c| - r  (banded)  c ± (r + pad)               flood filled
//! ```
//!
//! `pad` is the background magnitude rounded up to whole voxels.

use bevy_math::Vec3;
use noiz::prelude::*;
use tracing::debug;

use crate::{
    types::{CompiledFunction, Coord, Extent, Point, Value, Vector},
    volume::Volume,
};

/// Narrow-band width used when callers have no preference.
pub const DEFAULT_BACKGROUND: Value = 6.0;

/// Smooth gradient noise sampled by [`create_noise`].
pub type GradientNoise = Noise<MixCellGradients<OrthoGrid, Smoothstep, QuickGradients>>;

/// Background magnitude rounded up to a whole number of voxels.
#[inline]
fn padding(background: Value) -> i32 {
    background.abs().ceil() as i32
}

/// Calls `f` for every coordinate of the inclusive cuboid `[-size - pad, size + pad]`
/// and stores the result.
fn fill_padded<F>(volume: &mut Volume, size: Extent, pad: i32, f: F)
where
    F: Fn(Coord) -> Value,
{
    for x in -size.x - pad..=size.x + pad {
        for y in -size.y - pad..=size.y + pad {
            for z in -size.z - pad..=size.z + pad {
                let coord = Coord::new(x, y, z);
                volume.set(coord, f(coord));
            }
        }
    }
}

/// Distance from `coord` to the nearest face of the box with half-extent `size`.
///
/// Positive inside the box, zero on its faces, negative outside.
#[inline]
pub fn box_distance(size: Extent, coord: Coord) -> Value {
    let dx = size.x - coord.x.abs();
    let dy = size.y - coord.y.abs();
    let dz = size.z - coord.z.abs();
    dx.min(dy).min(dz) as Value
}

/// Builds the face-distance field of an axis-aligned box centred on the origin.
///
/// The field is evaluated over the box grown by `background` voxels on every side,
/// then sign-propagated with [`Volume::signed_flood_fill`].
pub fn create_box(size: Extent, background: Value) -> Volume {
    let mut volume = Volume::new(background);
    fill_padded(&mut volume, size, padding(background), |coord| {
        box_distance(size, coord)
    });
    volume.signed_flood_fill();

    debug!(
        active = volume.active_voxel_count(),
        "box field generated"
    );
    volume
}

/// Evaluates `function` over the region `[-size - background, size + background]`.
///
/// ```rust,ignore
/// // slanted half-space: negative below y = 0
/// let volume = create_function(Extent::new(60, 60, 60), &|c: Coord| c.y as Value, 6.0);
/// ```
pub fn create_function(size: Extent, function: &CompiledFunction, background: Value) -> Volume {
    let mut volume = Volume::new(background);
    fill_padded(&mut volume, size, padding(background), function);
    volume.signed_flood_fill();

    debug!(
        active = volume.active_voxel_count(),
        "function field generated"
    );
    volume
}

/// Samples smooth gradient noise at `coord * scale` for every coordinate in `[-size, size]`.
///
/// Values are normalized to `[-1, 1]`. The volume is not a level set, so no
/// flood fill runs and the background stays `0`.
/// Identical arguments always produce an identical volume.
pub fn create_noise(size: Extent, scale: Vector) -> Volume {
    let noise = GradientNoise::default();
    let mut volume = Volume::new(0.0);
    fill_padded(&mut volume, size, 0, |coord| {
        let raw: Value = noise.sample_for(Vec3::new(
            coord.x as f32 * scale.x,
            coord.y as f32 * scale.y,
            coord.z as f32 * scale.z,
        ));
        (raw * NOISE_NORMALIZATION).clamp(-1.0, 1.0)
    });

    debug!(
        active = volume.active_voxel_count(),
        "noise field generated"
    );
    volume
}

/// Gradient noise on an orthogonal grid peaks at `±√3`; this maps it onto `[-1, 1]`.
const NOISE_NORMALIZATION: Value = 0.577_350_26;

/// Builds a narrow-band level set of a sphere.
///
/// Only distances within `[-background, background]` are stored; the rest of
/// the volume is filled by sign propagation. Negative inside.
pub fn make_sphere(radius: Value, center: Point, background: Value) -> Volume {
    let outside = background.abs();
    let dim = (radius + padding(background) as Value).trunc();
    let mut volume = Volume::new(outside);

    // lower bound truncates toward zero, upper bound is exclusive in float space
    let lower = center.map(|c| (c - dim) as i32);
    let upper = center.map(|c| (c + dim).ceil() as i32);
    for i in lower.x..upper.x {
        let x2 = (i as Value - center.x).powi(2);
        for j in lower.y..upper.y {
            let x2y2 = (j as Value - center.y).powi(2) + x2;
            for k in lower.z..upper.z {
                let dist = (x2y2 + (k as Value - center.z).powi(2)).sqrt() - radius;
                if dist < -outside || outside < dist {
                    continue;
                }
                volume.set(Coord::new(i, j, k), dist);
            }
        }
    }
    volume.signed_flood_fill();

    debug!(
        radius,
        active = volume.active_voxel_count(),
        "sphere level set generated"
    );
    volume
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_interior_holds_face_distance() {
        let size = Extent::new(5, 4, 3);
        let volume = create_box(size, 2.0);

        for x in -4..=4 {
            for y in -3..=3 {
                for z in -2..=2 {
                    let value = volume.get(Coord::new(x, y, z));
                    let expected = (5 - x.abs()).min(4 - y.abs()).min(3 - z.abs()) as Value;
                    assert_eq!(value, expected);
                    assert!(value >= 0.0);
                }
            }
        }
    }

    #[test]
    fn box_far_outside_reads_negative_background() {
        let size = Extent::new(5, 4, 3);
        let volume = create_box(size, 2.0);

        assert_eq!(volume.background(), -2.0);
        // beyond the padded region on each axis
        assert_eq!(volume.get(Coord::new(8, 0, 0)), -2.0);
        assert_eq!(volume.get(Coord::new(0, -7, 0)), -2.0);
        assert_eq!(volume.get(Coord::new(0, 0, 40)), -2.0);
        // padded region is evaluated inclusively
        assert!(volume.is_active(Coord::new(7, 6, 5)));
        assert!(volume.is_active(Coord::new(-7, -6, -5)));
        assert!(!volume.is_active(Coord::new(8, 0, 0)));
    }

    #[test]
    fn function_values_match_rule_exactly() {
        let size = Extent::new(4, 4, 4);
        let rule = |c: Coord| (c.x * 3 - c.y) as Value * 0.25 + c.z as Value;
        let volume = create_function(size, &rule, 6.0);

        for x in -10..=10 {
            for y in -10..=10 {
                for z in -10..=10 {
                    let coord = Coord::new(x, y, z);
                    assert!(volume.is_active(coord));
                    assert_eq!(volume.get(coord).to_bits(), rule(coord).to_bits());
                }
            }
        }
        assert_eq!(volume.active_voxel_count(), 21 * 21 * 21);
    }

    #[test]
    fn noise_is_deterministic() {
        let size = Extent::new(6, 6, 6);
        let scale = Vector::new(0.1, 0.2, 0.3);
        let first = create_noise(size, scale);
        let second = create_noise(size, scale);

        let a: Vec<(Coord, Value)> = first.iter_active().collect();
        let b: Vec<(Coord, Value)> = second.iter_active().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn noise_bounds_are_inclusive_and_background_is_zero() {
        let volume = create_noise(Extent::new(3, 2, 1), Vector::new(0.1, 0.1, 0.1));

        assert_eq!(volume.active_voxel_count(), 7 * 5 * 3);
        assert!(volume.is_active(Coord::new(3, 2, 1)));
        assert!(volume.is_active(Coord::new(-3, -2, -1)));
        assert!(!volume.is_active(Coord::new(4, 0, 0)));
        assert_eq!(volume.background(), 0.0);
        assert_eq!(volume.get(Coord::new(100, 0, 0)), 0.0);
    }

    #[test]
    fn noise_varies_and_stays_in_unit_range() {
        let volume = create_noise(Extent::new(60, 60, 60), Vector::new(0.1, 0.1, 0.1));
        let (min, max) = volume
            .iter_active()
            .map(|(_, v)| v)
            .fold((Value::INFINITY, Value::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });

        assert!((-1.0..=1.0).contains(&min), "min {min}");
        assert!((-1.0..=1.0).contains(&max), "max {max}");
        // the field uses most of the range
        assert!(max - min > 1.0, "range {min}..{max}");
    }

    #[test]
    fn sphere_band_and_interior() {
        let volume = make_sphere(8.0, Point::new(1.5, 2.0, 3.0), 2.0);

        // narrow band value on the surface along +x
        let on_band = Coord::new(10, 2, 3);
        assert!(volume.is_active(on_band));
        assert!((volume.get(on_band) - 0.5).abs() < 1e-5);
        // centre is inside, far point is outside
        assert_eq!(volume.get(Coord::new(1, 2, 3)), -2.0);
        assert_eq!(volume.get(Coord::new(60, 0, 0)), 2.0);
    }

    #[test]
    fn sphere_band_reaches_past_a_fractional_centre() {
        // c + r + pad = 11.5 along +x, so x = 11 is the last stored column
        let volume = make_sphere(8.0, Point::new(1.5, 2.0, 3.0), 2.0);
        let edge = Coord::new(11, 2, 3);
        assert!(volume.is_active(edge));
        assert!((volume.get(edge) - 1.5).abs() < 1e-5);
        assert!(volume.is_active(Coord::new(-8, 2, 3)));
        assert!(!volume.is_active(Coord::new(12, 2, 3)));
    }

    #[test]
    fn large_sphere_band_matches_reference_constants() {
        let volume = make_sphere(50.0, Point::new(1.5, 2.0, 3.0), 2.0);
        let edge = Coord::new(53, 2, 3);
        assert!(volume.is_active(edge));
        assert!((volume.get(edge) - 1.5).abs() < 1e-4);
        assert!(volume.is_active(Coord::new(-50, 2, 3)));
    }
}
