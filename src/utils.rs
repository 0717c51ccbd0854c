use crate::{
    interp::{find_t, interpolate_points},
    types::{Point, Value, Vector},
};

/// Offsets of the 8 cell corners, indexed by the bit pattern `zyx`.
///
/// ```text
///     6----7          Y
///    /|   /|          |
///   2----3 |          *-- X
///   | 4--|-5         /
///   |/   |/         Z
///   0----1
///
///  0 = (0,0,0)    4 = (0,0,1)
///  1 = (1,0,0)    5 = (1,0,1)
///  2 = (0,1,0)    6 = (0,1,1)
///  3 = (1,1,0)    7 = (1,1,1)
/// ```
pub const CORNER_OFFSETS: [[usize; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [0, 1, 0],
    [1, 1, 0],
    [0, 0, 1],
    [1, 0, 1],
    [0, 1, 1],
    [1, 1, 1],
];

/// Corner pairs of the 12 cell edges: four along X, four along Y, four along Z.
pub const EDGE_CORNERS: [[usize; 2]; 12] = [
    [0, 1],
    [2, 3],
    [4, 5],
    [6, 7],
    [0, 2],
    [1, 3],
    [4, 6],
    [5, 7],
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
];

/// Computes the corner state bitmask for a cell.
///
/// A bit is set when the corner's value is **at or below** the threshold
/// (i.e. "inside" the surface):
///
/// ```text
/// corner index:  7  6  5  4  3  2  1  0
/// state bits:   [_][_][_][_][_][_][_][_]
///                                      ^-- corner 0 inside?
/// ```
///
/// `0x00` and `0xFF` mean the cell does not touch the surface.
#[inline]
pub fn get_state(corner_values: &[Value; 8], threshold: Value) -> u8 {
    corner_values
        .iter()
        .enumerate()
        .filter(|(_, v)| **v <= threshold)
        .fold(0u8, |state, (i, _)| state | (1 << i))
}

/// Returns the centroid of every point where the surface crosses a cell edge,
/// in cell-local coordinates (`[0, 1]` per axis).
///
/// Returns `None` if no edge is crossed.
#[inline]
pub fn edge_crossing_centroid(corner_values: &[Value; 8], threshold: Value) -> Option<Point> {
    let mut sum = Vector::zeros();
    let mut count = 0usize;

    for [a, b] in EDGE_CORNERS {
        let (va, vb) = (corner_values[a], corner_values[b]);
        if (va <= threshold) == (vb <= threshold) {
            continue;
        }
        let t = find_t(va, vb, threshold);
        let crossing = interpolate_points(corner_point(a), corner_point(b), t);
        sum += crossing.coords;
        count += 1;
    }

    (count > 0).then(|| Point::from(sum / count as Value))
}

/// Gradient of the trilinear interpolant at the cell centre.
///
/// Points toward increasing field values, i.e. out of the surface.
#[inline]
pub fn cell_gradient(corner_values: &[Value; 8]) -> Vector {
    let mut gradient = Vector::zeros();
    for (i, offset) in CORNER_OFFSETS.iter().enumerate() {
        for axis in 0..3 {
            let sign = if offset[axis] == 1 { 1.0 } else { -1.0 };
            gradient[axis] += sign * corner_values[i];
        }
    }
    gradient / 4.0
}

#[inline]
fn corner_point(corner: usize) -> Point {
    let [x, y, z] = CORNER_OFFSETS[corner];
    Point::new(x as Value, y as Value, z as Value)
}
