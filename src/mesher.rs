use std::collections::{BTreeMap, BTreeSet};

use nalgebra::Vector3;
use ndarray::Array3;
use tracing::{debug, info};

use crate::{
    error::{LevelSetError, Result},
    mesh::PolygonMesh,
    settings::MeshSettings,
    types::{Coord, Point, Value, Vector},
    utils::{CORNER_OFFSETS, cell_gradient, edge_crossing_centroid, get_state},
    volume::Volume,
};

/// A cell the surface passes through.
struct SurfaceCell {
    /// Cell index into the sample grid.
    index: [usize; 3],
    /// Vertex position in voxel coordinates.
    position: Point,
    /// Unit outward normal, zero where the gradient vanishes.
    normal: Vector,
}

/// Extracts the iso-surface of `volume` as a quad-dominant polygon mesh.
///
/// The active bounds of the volume, grown by one voxel, are sampled densely; the
/// extra layer picks up crossings against the background.
///
/// ```text
/// 1. sample_region             →  dense values around the active voxels
/// 2. collect_surface_cells     →  one vertex per cell with mixed corner signs,
///                                 at the centroid of its edge crossings
/// 3. merge_flat_blocks         →  (adaptivity > 0) one vertex per flat 2×2×2 block
/// 4. emit_quads                →  one quad per sign-changing lattice edge,
///                                 collapsed quads become triangles
/// 5. non_manifold_vertices     →  blocks whose vertex sits on a fin or a repeated
///                                 edge are split, back to step 3
/// 6. remove_unreferenced_vertices
/// ```
///
/// Returns [`LevelSetError::EmptyVolume`] if no voxel was ever written and
/// [`LevelSetError::InvalidSettings`] if `settings` fails validation. A volume
/// that never crosses the iso value yields an empty mesh.
pub fn volume_to_mesh(volume: &Volume, settings: &MeshSettings) -> Result<PolygonMesh> {
    settings.validate()?;
    let (min, max) = volume.active_bounds().ok_or(LevelSetError::EmptyVolume)?;
    let origin = min - Vector3::repeat(1);
    let samples = volume.sample_region(origin, max + Vector3::repeat(1));
    let iso = settings.iso_value;

    let (cells, cell_ids) = collect_surface_cells(&samples, origin, iso);
    debug!(cells = cells.len(), "surface cells collected");

    // Merged blocks that fold the surface onto itself are split back into
    // their cells until every polygon is edge manifold.
    let mut rejected = BTreeSet::new();
    let mut mesh = loop {
        let (vertices, vertex_of_cell, block_of_vertex) = if settings.adaptivity > 0.0 {
            merge_flat_blocks(&cells, settings.adaptivity, &rejected)
        } else {
            (
                cells.iter().map(|cell| cell.position).collect(),
                (0..cells.len()).collect(),
                BTreeMap::new(),
            )
        };
        debug!(vertices = vertices.len(), "vertices placed");

        let mut mesh = PolygonMesh {
            vertices,
            ..PolygonMesh::new_empty()
        };
        emit_quads(&samples, iso, &cell_ids, &vertex_of_cell, &mut mesh)?;

        let folded: BTreeSet<[usize; 3]> = mesh
            .non_manifold_vertices()
            .iter()
            .filter_map(|vertex| block_of_vertex.get(vertex).copied())
            .collect();
        if folded.is_empty() {
            break mesh;
        }
        debug!(blocks = folded.len(), "splitting folded blocks");
        rejected.extend(folded);
    };
    mesh.remove_unreferenced_vertices();

    info!(
        vertices = mesh.vertices.len(),
        quads = mesh.quads.len(),
        triangles = mesh.triangles.len(),
        "mesh extracted"
    );
    Ok(mesh)
}

#[inline]
fn corner_values(samples: &Array3<Value>, [i, j, k]: [usize; 3]) -> [Value; 8] {
    CORNER_OFFSETS.map(|[dx, dy, dz]| samples[[i + dx, j + dy, k + dz]])
}

/// Places one vertex in every cell whose corners straddle `iso`.
///
/// Returns the cells and a grid mapping each cell index to its position in that list.
fn collect_surface_cells(
    samples: &Array3<Value>,
    origin: Coord,
    iso: Value,
) -> (Vec<SurfaceCell>, Array3<Option<usize>>) {
    let (nx, ny, nz) = samples.dim();
    let shape = (
        nx.saturating_sub(1),
        ny.saturating_sub(1),
        nz.saturating_sub(1),
    );
    let mut cell_ids = Array3::from_elem(shape, None);
    let mut cells = Vec::new();

    for i in 0..shape.0 {
        for j in 0..shape.1 {
            for k in 0..shape.2 {
                let corners = corner_values(samples, [i, j, k]);
                let state = get_state(&corners, iso);
                if state == 0 || state == 0xFF {
                    continue;
                }
                let Some(local) = edge_crossing_centroid(&corners, iso) else {
                    continue;
                };

                let position = Point::new(
                    (origin.x + i as i32) as Value + local.x,
                    (origin.y + j as i32) as Value + local.y,
                    (origin.z + k as i32) as Value + local.z,
                );
                let normal = cell_gradient(&corners)
                    .try_normalize(Value::EPSILON)
                    .unwrap_or_else(Vector::zeros);

                cell_ids[[i, j, k]] = Some(cells.len());
                cells.push(SurfaceCell {
                    index: [i, j, k],
                    position,
                    normal,
                });
            }
        }
    }

    (cells, cell_ids)
}

/// Groups cells into `2 × 2 × 2` blocks and gives every flat block a single shared vertex.
///
/// A block is flat when it holds more than one cell and each cell normal lies
/// within `1 - adaptivity` (dot product) of the block's mean normal. Blocks in
/// `rejected` always keep one vertex per cell.
///
/// Returns the vertex list, per cell the index of its vertex, and the block
/// behind every shared vertex.
fn merge_flat_blocks(
    cells: &[SurfaceCell],
    adaptivity: Value,
    rejected: &BTreeSet<[usize; 3]>,
) -> (Vec<Point>, Vec<usize>, BTreeMap<usize, [usize; 3]>) {
    let tolerance = 1.0 - adaptivity;

    let mut blocks: BTreeMap<[usize; 3], Vec<usize>> = BTreeMap::new();
    for (id, cell) in cells.iter().enumerate() {
        blocks
            .entry(cell.index.map(|v| v / 2))
            .or_default()
            .push(id);
    }

    let mut vertices = Vec::with_capacity(cells.len());
    let mut vertex_of_cell = vec![0; cells.len()];
    let mut block_of_vertex = BTreeMap::new();

    for (block, members) in &blocks {
        let mean_normal = members
            .iter()
            .fold(Vector::zeros(), |acc, &id| acc + cells[id].normal);
        let flat = members.len() > 1
            && !rejected.contains(block)
            && mean_normal
                .try_normalize(Value::EPSILON)
                .is_some_and(|mean| {
                    members
                        .iter()
                        .all(|&id| cells[id].normal.dot(&mean) >= tolerance)
                });

        if flat {
            let centroid = members
                .iter()
                .fold(Vector::zeros(), |acc, &id| acc + cells[id].position.coords)
                / members.len() as Value;
            let vertex = vertices.len();
            vertices.push(Point::from(centroid));
            for &id in members {
                vertex_of_cell[id] = vertex;
            }
            block_of_vertex.insert(vertex, *block);
        } else {
            for &id in members {
                vertex_of_cell[id] = vertices.len();
                vertices.push(cells[id].position);
            }
        }
    }

    debug!(
        blocks = blocks.len(),
        merged = block_of_vertex.len(),
        "flat blocks merged"
    );
    (vertices, vertex_of_cell, block_of_vertex)
}

/// Vertices of the four cells sharing the lattice edge from `p` along `axis`,
/// counter-clockwise seen from the positive end of `axis`.
///
/// ```text
///   c
///   ^   3 ---- 2
///   |   |  p   |      cells around the edge, offsets in (b, c):
///   |   0 ---- 1      0 = (-1,-1)  1 = (0,-1)  2 = (0,0)  3 = (-1,0)
///   +-------> b
/// ```
///
/// Returns `None` if any of the cells lies outside the grid or has no vertex.
fn quad_around_edge(
    cell_ids: &Array3<Option<usize>>,
    vertex_of_cell: &[usize],
    p: [usize; 3],
    axis: usize,
) -> Option<[usize; 4]> {
    let (b, c) = ((axis + 1) % 3, (axis + 2) % 3);
    let mut around = [p; 4];
    around[0][b] = p[b].checked_sub(1)?;
    around[0][c] = p[c].checked_sub(1)?;
    around[1][c] = p[c].checked_sub(1)?;
    around[3][b] = p[b].checked_sub(1)?;

    let mut quad = [0; 4];
    for (slot, cell) in quad.iter_mut().zip(around) {
        let id = (*cell_ids.get(cell)?)?;
        *slot = vertex_of_cell[id];
    }
    Some(quad)
}

/// Emits one polygon per lattice edge whose end points straddle `iso`.
///
/// Faces are wound so their normal points from the inside end of the edge to
/// the outside end, i.e. toward increasing field values.
fn emit_quads(
    samples: &Array3<Value>,
    iso: Value,
    cell_ids: &Array3<Option<usize>>,
    vertex_of_cell: &[usize],
    mesh: &mut PolygonMesh,
) -> Result<()> {
    let (nx, ny, nz) = samples.dim();
    let dims = [nx, ny, nz];

    for ((i, j, k), &value) in samples.indexed_iter() {
        let p = [i, j, k];
        let inside = value <= iso;
        for axis in 0..3 {
            if p[axis] + 1 >= dims[axis] {
                continue;
            }
            let mut q = p;
            q[axis] += 1;
            if (samples[q] <= iso) == inside {
                continue;
            }
            let Some(mut quad) = quad_around_edge(cell_ids, vertex_of_cell, p, axis) else {
                continue;
            };
            if !inside {
                quad.reverse();
            }
            mesh.push_polygon(quad)?;
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "mesher_test.rs"]
mod mesher_test;
