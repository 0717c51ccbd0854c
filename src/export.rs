//! Plain-text mesh output.
//!
//! The format is a minimal subset of Wavefront OBJ:
//!
//! ```text
//! g object
//!
//! v <x> <y> <z>          one per vertex, extraction order
//!
//! f <a> <b> <c> <d>      one per quad, 1-based indices
//! f <a> <b> <c>          one per triangle, after the quads
//!
//! ```
//!
//! No normals, texture coordinates, materials or comments are written.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use tracing::info;

use crate::{
    error::Result, mesh::PolygonMesh, mesher::volume_to_mesh, settings::MeshSettings,
    volume::Volume,
};

/// Writes `mesh` to `writer`, converting indices to 1-based.
///
/// Coordinates use the shortest text that round-trips to the same `f32`, not
/// a fixed five significant digits, so files differ textually from a
/// `precision(5)` writer but reload without loss.
pub fn write_obj<W: Write>(mesh: &PolygonMesh, mut writer: W) -> Result<()> {
    writeln!(writer, "g object")?;
    writeln!(writer)?;

    for v in &mesh.vertices {
        writeln!(writer, "v {} {} {}", v.x, v.y, v.z)?;
    }
    writeln!(writer)?;

    for [a, b, c, d] in &mesh.quads {
        writeln!(writer, "f {} {} {} {}", a + 1, b + 1, c + 1, d + 1)?;
    }
    for [a, b, c] in &mesh.triangles {
        writeln!(writer, "f {} {} {}", a + 1, b + 1, c + 1)?;
    }
    writeln!(writer)?;

    Ok(())
}

/// Serializes `mesh` to an OBJ string.
pub fn to_obj_string(mesh: &PolygonMesh) -> Result<String> {
    let mut buffer = Vec::new();
    write_obj(mesh, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Writes `mesh` to the file at `path`, replacing any existing file.
pub fn save_obj(mesh: &PolygonMesh, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    write_obj(mesh, &mut writer)?;
    writer.flush()?;

    info!(
        path = %path.display(),
        vertices = mesh.vertices.len(),
        polygons = mesh.polygon_count(),
        "mesh written"
    );
    Ok(())
}

/// Meshes `volume` and returns the OBJ text in one step.
pub fn volume_to_obj(volume: &Volume, settings: &MeshSettings) -> Result<String> {
    let mesh = volume_to_mesh(volume, settings)?;
    to_obj_string(&mesh)
}
