use super::*;
use approx::assert_relative_eq;

fn ball(radius: Value, background: Value) -> Volume {
    let mut volume = Volume::new(background);
    let dim = radius as i32 + background as i32;
    for x in -dim..=dim {
        for y in -dim..=dim {
            for z in -dim..=dim {
                let dist = ((x * x + y * y + z * z) as Value).sqrt() - radius;
                if dist.abs() <= background {
                    volume.set(Coord::new(x, y, z), dist);
                }
            }
        }
    }
    volume
}

#[test]
fn test_unwritten_coords_read_background() {
    let volume = Volume::new(3.0);
    assert_eq!(volume.get(Coord::new(0, 0, 0)), 3.0);
    assert_eq!(volume.get(Coord::new(-1000, 7, 123)), 3.0);
    assert!(volume.active_bounds().is_none());
}

#[test]
fn test_set_and_get_negative_coords() {
    let mut volume = Volume::new(1.0);
    volume.set(Coord::new(-1, -8, -9), -0.5);
    volume.set(Coord::new(7, 8, 0), 0.25);

    assert_eq!(volume.get(Coord::new(-1, -8, -9)), -0.5);
    assert_eq!(volume.get(Coord::new(7, 8, 0)), 0.25);
    assert!(volume.is_active(Coord::new(-1, -8, -9)));
    assert!(!volume.is_active(Coord::new(-2, -8, -9)));
    // neighbour in the same leaf still reads background
    assert_eq!(volume.get(Coord::new(-2, -8, -9)), 1.0);
    assert_eq!(volume.active_voxel_count(), 2);
    assert_eq!(volume.leaf_count(), 2);
}

#[test]
fn test_active_bounds_and_iteration() {
    let mut volume = Volume::new(0.0);
    volume.set(Coord::new(3, -2, 9), 1.0);
    volume.set(Coord::new(-4, 5, 0), 2.0);

    let (min, max) = volume.active_bounds().unwrap();
    assert_eq!(min, Coord::new(-4, -2, 0));
    assert_eq!(max, Coord::new(3, 5, 9));

    let mut active: Vec<(Coord, Value)> = volume.iter_active().collect();
    active.sort_by_key(|(coord, _)| (coord.x, coord.y, coord.z));
    assert_eq!(active, vec![(Coord::new(-4, 5, 0), 2.0), (Coord::new(3, -2, 9), 1.0)]);
}

#[test]
fn test_accessor_matches_get() {
    let volume = ball(5.0, 2.0);
    let mut accessor = volume.accessor();
    for x in -9..9 {
        for y in -3..3 {
            let coord = Coord::new(x, y, 1);
            assert_eq!(accessor.get(coord), volume.get(coord));
        }
    }
}

#[test]
fn test_sample_region_layout() {
    let mut volume = Volume::new(0.0);
    volume.set(Coord::new(1, 2, 3), 7.0);
    let samples = volume.sample_region(Coord::new(0, 0, 0), Coord::new(2, 3, 4));

    assert_eq!(samples.dim(), (3, 4, 5));
    assert_eq!(samples[[1, 2, 3]], 7.0);
    assert_eq!(samples[[0, 0, 0]], 0.0);
}

#[test]
fn test_flood_fill_marks_ball_interior_negative() {
    let mut volume = ball(10.0, 2.0);
    volume.signed_flood_fill();

    // deep inside the ball, far from the narrow band
    assert_eq!(volume.get(Coord::new(0, 0, 0)), -2.0);
    assert_eq!(volume.get(Coord::new(3, -2, 1)), -2.0);
    // outside the band but inside the leaf bounding box
    assert_eq!(volume.get(Coord::new(11, 11, 11)), 2.0);
    // far away
    assert_eq!(volume.get(Coord::new(100, 0, 0)), 2.0);
    assert_eq!(volume.background(), 2.0);
}

#[test]
fn test_flood_fill_keeps_active_values() {
    let mut volume = ball(6.0, 1.5);
    let before: Vec<(Coord, Value)> = volume.iter_active().collect();
    volume.signed_flood_fill();
    let after: Vec<(Coord, Value)> = volume.iter_active().collect();
    assert_eq!(before, after);
}

#[test]
fn test_flood_fill_takes_uniform_shell_sign() {
    let mut volume = Volume::new(4.0);
    for x in -3..=3 {
        for y in -3..=3 {
            for z in -3..=3 {
                volume.set(Coord::new(x, y, z), -1.0);
            }
        }
    }
    volume.signed_flood_fill();

    assert_eq!(volume.background(), -4.0);
    assert_eq!(volume.get(Coord::new(50, 50, 50)), -4.0);
    assert_eq!(volume.get(Coord::new(4, 0, 0)), -4.0);
}

#[test]
fn test_flood_fill_on_empty_volume_is_noop() {
    let mut volume = Volume::new(2.0);
    volume.signed_flood_fill();
    assert_eq!(volume.background(), 2.0);
    assert_eq!(volume.tile_count(), 0);
}

#[test]
fn test_sum_adds_values_and_backgrounds() {
    let mut a = Volume::new(1.0);
    let mut b = Volume::new(0.5);
    a.set(Coord::new(0, 0, 0), 2.0);
    a.set(Coord::new(20, 0, 0), 3.0);
    b.set(Coord::new(0, 0, 0), -4.0);
    b.set(Coord::new(-20, 0, 0), 6.0);

    a.sum(b);

    assert_relative_eq!(a.get(Coord::new(0, 0, 0)), -2.0);
    assert_relative_eq!(a.get(Coord::new(20, 0, 0)), 3.5);
    assert_relative_eq!(a.get(Coord::new(-20, 0, 0)), 7.0);
    assert_relative_eq!(a.get(Coord::new(0, 50, 0)), 1.5);
    assert_relative_eq!(a.background(), 1.5);
    assert!(a.is_active(Coord::new(-20, 0, 0)));
}

#[test]
fn test_multiply_matches_pointwise_product() {
    let a = ball(5.0, 2.0);
    let mut b = Volume::new(3.0);
    for x in -8..8 {
        b.set(Coord::new(x, 0, 0), x as Value * 0.5);
    }

    let mut product = a.clone();
    product.multiply(b.clone());

    for x in -12..12 {
        for y in -2..2 {
            let coord = Coord::new(x, y, 0);
            assert_relative_eq!(product.get(coord), a.get(coord) * b.get(coord));
        }
    }
    assert_relative_eq!(product.background(), 6.0);
}

#[test]
fn test_union_and_intersection_of_level_sets() {
    let mut left = Volume::new(2.0);
    let mut right = Volume::new(2.0);
    left.set(Coord::new(0, 0, 0), -1.0);
    right.set(Coord::new(0, 0, 0), 0.5);

    let mut joined = left.clone();
    joined.union(right.clone());
    assert_eq!(joined.get(Coord::new(0, 0, 0)), -1.0);

    let mut common = left;
    common.intersection(right);
    assert_eq!(common.get(Coord::new(0, 0, 0)), 0.5);
    assert_eq!(common.background(), 2.0);
}

#[test]
fn test_compositing_applies_to_flood_filled_values() {
    let mut a = ball(10.0, 2.0);
    a.signed_flood_fill();
    let b = Volume::new(1.0);

    a.sum(b);

    // flood-filled interior: -2 + 1
    assert_relative_eq!(a.get(Coord::new(0, 0, 0)), -1.0);
    assert_relative_eq!(a.background(), 3.0);
}

#[test]
fn test_flood_fill_bridges_missing_leaves_with_tiles() {
    let mut volume = Volume::new(3.0);
    volume.set(Coord::new(0, 0, 0), -1.0);
    volume.set(Coord::new(40, 0, 0), -1.0);
    volume.signed_flood_fill();

    // leaves 1..=4 along x were never allocated
    assert_eq!(volume.leaf_count(), 2);
    assert_eq!(volume.tile_count(), 4);
    assert_eq!(volume.get(Coord::new(20, 3, 5)), -3.0);

    volume.sum(Volume::new(1.0));
    assert_relative_eq!(volume.get(Coord::new(20, 3, 5)), -2.0);
    assert_eq!(volume.tile_count(), 4);
}
