use std::collections::{BTreeMap, BTreeSet, VecDeque, btree_map::Entry};

use nalgebra::Vector3;
use ndarray::{Array3, Zip};
use tracing::debug;

use crate::types::{Coord, Value};

/// Number of voxels along each edge of a leaf.
pub const LEAF_DIM: i32 = 8;

const LEAF_SHAPE: (usize, usize, usize) = (LEAF_DIM as usize, LEAF_DIM as usize, LEAF_DIM as usize);

/// Leaf coordinate: voxel coordinate divided (floored) by [`LEAF_DIM`].
type LeafKey = [i32; 3];

const FACE_DIRECTIONS: [[i32; 3]; 6] = [
    [-1, 0, 0],
    [1, 0, 0],
    [0, -1, 0],
    [0, 1, 0],
    [0, 0, -1],
    [0, 0, 1],
];

#[inline]
fn leaf_key(coord: &Coord) -> LeafKey {
    [
        coord.x.div_euclid(LEAF_DIM),
        coord.y.div_euclid(LEAF_DIM),
        coord.z.div_euclid(LEAF_DIM),
    ]
}

#[inline]
fn local_index(coord: &Coord) -> [usize; 3] {
    [
        coord.x.rem_euclid(LEAF_DIM) as usize,
        coord.y.rem_euclid(LEAF_DIM) as usize,
        coord.z.rem_euclid(LEAF_DIM) as usize,
    ]
}

#[inline]
fn leaf_origin(key: &LeafKey) -> Coord {
    Coord::new(key[0] * LEAF_DIM, key[1] * LEAF_DIM, key[2] * LEAF_DIM)
}

#[inline]
fn offset_key(key: &LeafKey, direction: &[i32; 3]) -> LeafKey {
    [
        key[0] + direction[0],
        key[1] + direction[1],
        key[2] + direction[2],
    ]
}

#[inline]
fn signed_background(outside: Value, negative: bool) -> Value {
    if negative { -outside } else { outside }
}

/// A dense `8 × 8 × 8` block of voxels.
///
/// Every voxel holds a value; only voxels written through [`Volume::set`] (or
/// carried over by compositing) are marked active.
#[derive(Clone, Debug)]
struct Leaf {
    values: Array3<Value>,
    active: Array3<bool>,
}

impl Leaf {
    fn filled(value: Value) -> Self {
        Self {
            values: Array3::from_elem(LEAF_SHAPE, value),
            active: Array3::from_elem(LEAF_SHAPE, false),
        }
    }

    fn active_count(&self) -> usize {
        self.active.iter().filter(|&&active| active).count()
    }

    /// Gives every inactive voxel `±outside`, signed like the nearest active voxel
    /// (breadth-first over face neighbours).
    fn fill_inactive(&mut self, outside: Value) {
        let mut visited = self.active.clone();
        let mut queue: VecDeque<[usize; 3]> = self
            .active
            .indexed_iter()
            .filter(|(_, active)| **active)
            .map(|((i, j, k), _)| [i, j, k])
            .collect();

        while let Some(index) = queue.pop_front() {
            let negative = self.values[index] < 0.0;
            for direction in &FACE_DIRECTIONS {
                let neighbour = [
                    index[0] as i32 + direction[0],
                    index[1] as i32 + direction[1],
                    index[2] as i32 + direction[2],
                ];
                if neighbour.iter().any(|&n| n < 0 || n >= LEAF_DIM) {
                    continue;
                }
                let neighbour = neighbour.map(|n| n as usize);
                if visited[neighbour] {
                    continue;
                }
                visited[neighbour] = true;
                self.values[neighbour] = signed_background(outside, negative);
                queue.push_back(neighbour);
            }
        }
    }

    /// Value at the centre of the face pointing along `direction`.
    fn face_value(&self, direction: &[i32; 3]) -> Value {
        let index = (*direction).map(|d| match d {
            d if d < 0 => 0,
            d if d > 0 => (LEAF_DIM - 1) as usize,
            _ => (LEAF_DIM / 2) as usize,
        });
        self.values[index]
    }
}

/// A sparse scalar volume addressed by integer voxel coordinates.
///
/// Voxels are stored in `8 × 8 × 8` leaves that are allocated on first write.
/// Reads outside any leaf return the constant tile value recorded for that
/// region by [`signed_flood_fill`](Volume::signed_flood_fill), or the
/// background otherwise.
///
/// ```text
///  get(coord)
///    leaf allocated?   → leaf.values[local]
///    tile recorded?    → tile value   (±|background|)
///    otherwise         → background
/// ```
///
/// For signed-distance volumes negative values are inside the surface.
#[derive(Clone, Debug)]
pub struct Volume {
    background: Value,
    leaves: BTreeMap<LeafKey, Leaf>,
    tiles: BTreeMap<LeafKey, Value>,
}

impl Volume {
    /// Creates an empty volume where every coordinate reads `background`.
    pub fn new(background: Value) -> Self {
        Self {
            background,
            leaves: BTreeMap::new(),
            tiles: BTreeMap::new(),
        }
    }

    /// The value of every coordinate that was never written and is not covered by a tile.
    pub fn background(&self) -> Value {
        self.background
    }

    /// Returns the value at `coord`.
    pub fn get(&self, coord: Coord) -> Value {
        let key = leaf_key(&coord);
        match self.leaves.get(&key) {
            Some(leaf) => leaf.values[local_index(&coord)],
            None => self.region_value(&key),
        }
    }

    /// Stores `value` at `coord` and marks the voxel active.
    pub fn set(&mut self, coord: Coord, value: Value) {
        let key = leaf_key(&coord);
        let index = local_index(&coord);
        let leaf = self.leaf_mut(key);
        leaf.values[index] = value;
        leaf.active[index] = true;
    }

    /// Returns `true` if `coord` was explicitly written.
    pub fn is_active(&self, coord: Coord) -> bool {
        self.leaves
            .get(&leaf_key(&coord))
            .is_some_and(|leaf| leaf.active[local_index(&coord)])
    }

    /// Number of explicitly written voxels.
    pub fn active_voxel_count(&self) -> usize {
        self.leaves.values().map(Leaf::active_count).sum()
    }

    /// Number of allocated leaves.
    pub fn leaf_count(&self) -> usize {
        self.leaves.len()
    }

    /// Number of constant tiles recorded by the last flood fill or compositing step.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// Iterates over every active voxel as `(coord, value)`.
    ///
    /// Order is deterministic: leaves in key order, voxels in `x, y, z` row-major order within a leaf.
    pub fn iter_active(&self) -> impl Iterator<Item = (Coord, Value)> + '_ {
        self.leaves.iter().flat_map(|(key, leaf)| {
            let origin = leaf_origin(key);
            leaf.active
                .indexed_iter()
                .filter(|(_, active)| **active)
                .map(move |((i, j, k), _)| {
                    (
                        origin + Vector3::new(i as i32, j as i32, k as i32),
                        leaf.values[[i, j, k]],
                    )
                })
        })
    }

    /// Returns the inclusive `(min, max)` bounds of all active voxels, or `None` if the volume is empty.
    pub fn active_bounds(&self) -> Option<(Coord, Coord)> {
        self.iter_active().fold(None, |bounds, (coord, _)| match bounds {
            None => Some((coord, coord)),
            Some((min, max)) => Some((
                Coord::new(min.x.min(coord.x), min.y.min(coord.y), min.z.min(coord.z)),
                Coord::new(max.x.max(coord.x), max.y.max(coord.y), max.z.max(coord.z)),
            )),
        })
    }

    /// Returns a read accessor that caches the most recently visited leaf.
    pub fn accessor(&self) -> ValueAccessor<'_> {
        ValueAccessor {
            volume: self,
            cached: None,
        }
    }

    /// Samples the inclusive box `[min, max]` into a dense array indexed `[x - min.x][y - min.y][z - min.z]`.
    pub fn sample_region(&self, min: Coord, max: Coord) -> Array3<Value> {
        let shape = (
            (max.x - min.x + 1).max(0) as usize,
            (max.y - min.y + 1).max(0) as usize,
            (max.z - min.z + 1).max(0) as usize,
        );
        let mut accessor = self.accessor();
        Array3::from_shape_fn(shape, |(i, j, k)| {
            accessor.get(min + Vector3::new(i as i32, j as i32, k as i32))
        })
    }

    /// Propagates inside/outside sign information from the active voxels to the rest of the volume.
    ///
    /// ```text
    /// 1. inside each leaf:   inactive voxels ← ±|background|, sign of nearest active voxel
    /// 2. between leaves:     missing leaves in the leaf bounding box become constant tiles,
    ///                        signed from the facing voxels of their neighbours
    /// 3. beyond the leaves:  if every active voxel on the bounding shell shares a sign,
    ///                        the background takes that sign
    /// ```
    pub fn signed_flood_fill(&mut self) {
        if self.leaves.is_empty() {
            return;
        }
        let outside = self.background.abs();

        for leaf in self.leaves.values_mut() {
            leaf.fill_inactive(outside);
        }

        self.fill_tiles(outside);

        if let Some(negative) = self.shell_is_negative() {
            self.background = signed_background(outside, negative);
        }

        debug!(
            leaves = self.leaves.len(),
            tiles = self.tiles.len(),
            background = self.background,
            "signed flood fill complete"
        );
    }

    fn fill_tiles(&mut self, outside: Value) {
        self.tiles.clear();

        let mut keys = self.leaves.keys();
        let Some(first) = keys.next() else {
            return;
        };
        let (mut min, mut max) = (*first, *first);
        for key in keys {
            for axis in 0..3 {
                min[axis] = min[axis].min(key[axis]);
                max[axis] = max[axis].max(key[axis]);
            }
        }
        let in_bounds = |key: &LeafKey| (0..3).all(|axis| key[axis] >= min[axis] && key[axis] <= max[axis]);

        let mut queue: VecDeque<LeafKey> = VecDeque::new();
        for (key, leaf) in &self.leaves {
            for direction in &FACE_DIRECTIONS {
                let neighbour = offset_key(key, direction);
                if !in_bounds(&neighbour)
                    || self.leaves.contains_key(&neighbour)
                    || self.tiles.contains_key(&neighbour)
                {
                    continue;
                }
                let negative = leaf.face_value(direction) < 0.0;
                self.tiles.insert(neighbour, signed_background(outside, negative));
                queue.push_back(neighbour);
            }
        }

        while let Some(key) = queue.pop_front() {
            let Some(&tile) = self.tiles.get(&key) else {
                continue;
            };
            for direction in &FACE_DIRECTIONS {
                let neighbour = offset_key(&key, direction);
                if !in_bounds(&neighbour)
                    || self.leaves.contains_key(&neighbour)
                    || self.tiles.contains_key(&neighbour)
                {
                    continue;
                }
                self.tiles.insert(neighbour, tile);
                queue.push_back(neighbour);
            }
        }
    }

    /// `Some(true)` if every active voxel on the active bounding shell is negative,
    /// `Some(false)` if none is, `None` if the shell is mixed.
    fn shell_is_negative(&self) -> Option<bool> {
        let (min, max) = self.active_bounds()?;
        let mut negative = false;
        let mut non_negative = false;
        for (coord, value) in self.iter_active() {
            let on_shell = (0..3).any(|axis| coord[axis] == min[axis] || coord[axis] == max[axis]);
            if !on_shell {
                continue;
            }
            if value < 0.0 {
                negative = true;
            } else {
                non_negative = true;
            }
            if negative && non_negative {
                return None;
            }
        }
        Some(negative)
    }

    /// Multiplies `other` into `self` cell-wise. The background becomes the product of both backgrounds.
    pub fn multiply(&mut self, other: Volume) {
        self.combine(other, |a, b| a * b);
    }

    /// Adds `other` into `self` cell-wise. The background becomes the sum of both backgrounds.
    pub fn sum(&mut self, other: Volume) {
        self.combine(other, |a, b| a + b);
    }

    /// Level-set union: keeps the cell-wise minimum.
    pub fn union(&mut self, other: Volume) {
        self.combine(other, Value::min);
    }

    /// Level-set intersection: keeps the cell-wise maximum.
    pub fn intersection(&mut self, other: Volume) {
        self.combine(other, Value::max);
    }

    /// Combines `other` into `self` so that afterwards `self.get(c) == op(a.get(c), b.get(c))` for
    /// every coordinate, including the background.
    ///
    /// A voxel is active in the result when it was active in either input.
    /// `other` is consumed.
    pub fn combine<F>(&mut self, other: Volume, op: F)
    where
        F: Fn(Value, Value) -> Value,
    {
        let Volume {
            background: other_background,
            leaves: other_leaves,
            tiles: other_tiles,
        } = other;
        let other_region =
            |key: &LeafKey| other_tiles.get(key).copied().unwrap_or(other_background);

        for (key, leaf) in self.leaves.iter_mut() {
            if other_leaves.contains_key(key) {
                continue;
            }
            let b = other_region(key);
            leaf.values.mapv_inplace(|a| op(a, b));
        }

        for (key, other_leaf) in other_leaves {
            let leaf = self.leaf_mut(key);
            Zip::from(&mut leaf.values)
                .and(&other_leaf.values)
                .for_each(|a, &b| *a = op(*a, b));
            Zip::from(&mut leaf.active)
                .and(&other_leaf.active)
                .for_each(|a, &b| *a |= b);
        }

        let tile_keys: BTreeSet<LeafKey> = self
            .tiles
            .keys()
            .chain(other_tiles.keys())
            .filter(|key| !self.leaves.contains_key(*key))
            .copied()
            .collect();
        let tiles: BTreeMap<LeafKey, Value> = tile_keys
            .into_iter()
            .map(|key| (key, op(self.region_value(&key), other_region(&key))))
            .collect();
        self.tiles = tiles;
        self.background = op(self.background, other_background);

        debug!(
            leaves = self.leaves.len(),
            tiles = self.tiles.len(),
            background = self.background,
            "composited volumes"
        );
    }

    /// Value of the region covered by leaf `key` when no leaf is allocated there.
    fn region_value(&self, key: &LeafKey) -> Value {
        self.tiles.get(key).copied().unwrap_or(self.background)
    }

    /// Returns the leaf at `key`, allocating it from the tile or background value if needed.
    fn leaf_mut(&mut self, key: LeafKey) -> &mut Leaf {
        match self.leaves.entry(key) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let fill = self.tiles.remove(&key).unwrap_or(self.background);
                entry.insert(Leaf::filled(fill))
            }
        }
    }
}

/// Read accessor over a [`Volume`] that remembers the last leaf it visited.
///
/// Sequential reads inside one leaf skip the map lookup.
pub struct ValueAccessor<'a> {
    volume: &'a Volume,
    cached: Option<(LeafKey, &'a Leaf)>,
}

impl ValueAccessor<'_> {
    /// Returns the value at `coord`, identical to [`Volume::get`].
    pub fn get(&mut self, coord: Coord) -> Value {
        let key = leaf_key(&coord);
        if let Some((cached_key, leaf)) = self.cached {
            if cached_key == key {
                return leaf.values[local_index(&coord)];
            }
        }
        match self.volume.leaves.get(&key) {
            Some(leaf) => {
                self.cached = Some((key, leaf));
                leaf.values[local_index(&coord)]
            }
            None => self.volume.region_value(&key),
        }
    }
}

#[cfg(test)]
#[path = "volume_test.rs"]
mod volume_test;
