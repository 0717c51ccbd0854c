use std::collections::{BTreeMap, BTreeSet};

use crate::{
    error::{LevelSetError, Result},
    types::{Point, Vector},
};

/// Polygon mesh produced by iso-surface extraction.
///
/// Indices are 0-based into `vertices`. Quads and triangles are stored in
/// separate lists, in extraction order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PolygonMesh {
    /// Vertex positions in voxel coordinates: `[[x, y, z], ...]`
    pub vertices: Vec<Point>,

    /// Quad index quadruples into `vertices`, counter-clockwise seen from outside.
    pub quads: Vec<[usize; 4]>,

    /// Triangle index triples into `vertices`, left behind where adaptivity collapsed a quad.
    pub triangles: Vec<[usize; 3]>,
}

impl PolygonMesh {
    /// Creates an empty mesh with no vertices or polygons.
    pub fn new_empty() -> Self {
        Self::default()
    }

    /// Returns `true` if the mesh has no polygons.
    pub fn is_empty(&self) -> bool {
        self.quads.is_empty() && self.triangles.is_empty()
    }

    /// Total number of polygons (quads and triangles).
    pub fn polygon_count(&self) -> usize {
        self.quads.len() + self.triangles.len()
    }

    /// Appends a vertex and returns its index.
    pub fn push_vertex(&mut self, position: Point) -> usize {
        self.vertices.push(position);
        self.vertices.len() - 1
    }

    /// Adds a quad defined by four vertex indices.
    ///
    /// Returns [`LevelSetError::InvalidIndex`] if any index is out of bounds.
    pub fn push_quad(&mut self, quad: [usize; 4]) -> Result<()> {
        self.check_indices(&quad)?;
        self.quads.push(quad);
        Ok(())
    }

    /// Adds a triangle defined by three vertex indices.
    ///
    /// Returns [`LevelSetError::InvalidIndex`] if any index is out of bounds.
    pub fn push_triangle(&mut self, tri: [usize; 3]) -> Result<()> {
        self.check_indices(&tri)?;
        self.triangles.push(tri);
        Ok(())
    }

    /// Adds a quad whose corners may share vertices after simplification.
    ///
    /// ```text
    /// 4 distinct corners        → quad
    /// 3 distinct, one collapsed → triangle
    /// anything else             → dropped (degenerate or folded)
    /// ```
    pub fn push_polygon(&mut self, corners: [usize; 4]) -> Result<()> {
        let mut ring: Vec<usize> = Vec::with_capacity(4);
        for index in corners {
            if ring.last() != Some(&index) {
                ring.push(index);
            }
        }
        while ring.len() > 1 && ring.first() == ring.last() {
            ring.pop();
        }

        match ring.as_slice() {
            &[a, b, c, d] if a != c && b != d => self.push_quad([a, b, c, d]),
            &[a, b, c] => self.push_triangle([a, b, c]),
            _ => Ok(()),
        }
    }

    /// Computes the face normal of quad `quad` from its first three corners.
    ///
    /// Returns the zero vector if the quad is degenerate.
    pub fn quad_normal(&self, quad: usize) -> Vector {
        let [a, b, c, _] = self.quads[quad];
        face_normal(self.vertices[a], self.vertices[b], self.vertices[c])
    }

    /// Computes the face normal for triangle `tri`.
    ///
    /// Returns the zero vector if the triangle is degenerate.
    pub fn tri_normal(&self, tri: usize) -> Vector {
        let [a, b, c] = self.triangles[tri];
        face_normal(self.vertices[a], self.vertices[b], self.vertices[c])
    }

    /// Iterates over all polygons, quads first, as index slices.
    pub fn polygons(&self) -> impl Iterator<Item = &[usize]> {
        self.quads
            .iter()
            .map(|quad| &quad[..])
            .chain(self.triangles.iter().map(|tri| &tri[..]))
    }

    /// Collects the vertices of every polygon that breaks edge manifoldness.
    ///
    /// A polygon is counted when it traverses a directed edge that another
    /// polygon also traverses, or when another polygon has the same vertex set
    /// (a double-sided fin). Empty for a consistently wound manifold surface.
    pub fn non_manifold_vertices(&self) -> BTreeSet<usize> {
        let mut edge_owners: BTreeMap<(usize, usize), Vec<usize>> = BTreeMap::new();
        let mut face_owners: BTreeMap<Vec<usize>, Vec<usize>> = BTreeMap::new();
        for (id, polygon) in self.polygons().enumerate() {
            for (n, &from) in polygon.iter().enumerate() {
                let to = polygon[(n + 1) % polygon.len()];
                edge_owners.entry((from, to)).or_default().push(id);
            }
            let mut key = polygon.to_vec();
            key.sort_unstable();
            face_owners.entry(key).or_default().push(id);
        }

        let shared: BTreeSet<usize> = edge_owners
            .values()
            .chain(face_owners.values())
            .filter(|owners| owners.len() > 1)
            .flatten()
            .copied()
            .collect();

        self.polygons()
            .enumerate()
            .filter(|(id, _)| shared.contains(id))
            .flat_map(|(_, polygon)| polygon.iter().copied())
            .collect()
    }

    /// Drops vertices no polygon refers to and rewrites indices to match.
    ///
    /// Relative vertex order is preserved.
    pub fn remove_unreferenced_vertices(&mut self) {
        let mut used = vec![false; self.vertices.len()];
        for index in self.quads.iter().flatten().chain(self.triangles.iter().flatten()) {
            used[*index] = true;
        }

        let mut remap = vec![usize::MAX; self.vertices.len()];
        let mut next = 0;
        for (old, keep) in used.iter().enumerate() {
            if *keep {
                remap[old] = next;
                next += 1;
            }
        }

        let mut old_index = 0;
        self.vertices.retain(|_| {
            let keep = used[old_index];
            old_index += 1;
            keep
        });
        for quad in &mut self.quads {
            *quad = quad.map(|i| remap[i]);
        }
        for tri in &mut self.triangles {
            *tri = tri.map(|i| remap[i]);
        }
    }

    fn check_indices(&self, indices: &[usize]) -> Result<()> {
        let vertex_count = self.vertices.len();
        match indices.iter().find(|&&index| index >= vertex_count) {
            Some(&index) => Err(LevelSetError::InvalidIndex {
                index,
                vertex_count,
            }),
            None => Ok(()),
        }
    }
}

fn face_normal(a: Point, b: Point, c: Point) -> Vector {
    let cross = (b - a).cross(&(c - b));
    let nrm = cross.norm();
    if nrm == 0.0 {
        Vector::zeros()
    } else {
        cross / nrm
    }
}
