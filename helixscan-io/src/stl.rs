//! STL mesh export
//!
//! Faces are written in stitching order with their vertex order intact. The
//! facet normal is the normalised cross product of the first two edges, zero
//! for degenerate faces.

use crate::MeshWriter;
use helixscan_core::{Error, Face, Point3d, Result, StitchedMesh, Vector3d};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// STL encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StlFormat {
    #[default]
    Binary,
    Ascii,
}

/// Size of a binary STL file holding `faces` triangles
pub fn binary_stl_size(faces: usize) -> usize {
    84 + 50 * faces
}

pub struct StlWriter;

impl StlWriter {
    /// Write a mesh in the requested encoding
    pub fn write_with_format<P: AsRef<Path>>(mesh: &StitchedMesh, path: P, format: StlFormat) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        match format {
            StlFormat::Binary => Self::write_binary(mesh, &mut writer)?,
            StlFormat::Ascii => Self::write_ascii(mesh, &mut writer)?,
        }
        writer.flush()?;
        debug!(faces = mesh.face_count(), ?format, "Wrote STL");
        Ok(())
    }

    /// 80-byte header, little-endian face count, then 50 bytes per face
    pub fn write_binary<W: Write>(mesh: &StitchedMesh, writer: &mut W) -> Result<()> {
        let mut header = [0u8; 80];
        let title = b"helixscan stitched mesh";
        header[..title.len()].copy_from_slice(title);
        writer.write_all(&header)?;

        let count = u32::try_from(mesh.face_count())
            .map_err(|_| Error::InvalidData("too many faces for binary STL".to_string()))?;
        writer.write_all(&count.to_le_bytes())?;

        for face in &mesh.faces {
            write_vector(writer, &face.normal())?;
            for vertex in &face.vertices {
                write_point(writer, vertex)?;
            }
            writer.write_all(&0u16.to_le_bytes())?;
        }
        Ok(())
    }

    pub fn write_ascii<W: Write>(mesh: &StitchedMesh, writer: &mut W) -> Result<()> {
        writeln!(writer, "solid helixscan")?;
        for face in &mesh.faces {
            write_ascii_facet(writer, face)?;
        }
        writeln!(writer, "endsolid helixscan")?;
        Ok(())
    }
}

impl MeshWriter for StlWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &StitchedMesh, path: P) -> Result<()> {
        Self::write_with_format(mesh, path, StlFormat::Binary)
    }
}

fn write_vector<W: Write>(writer: &mut W, v: &Vector3d) -> Result<()> {
    for c in [v.x, v.y, v.z] {
        writer.write_all(&(c as f32).to_le_bytes())?;
    }
    Ok(())
}

fn write_point<W: Write>(writer: &mut W, p: &Point3d) -> Result<()> {
    write_vector(writer, &p.coords)
}

fn write_ascii_facet<W: Write>(writer: &mut W, face: &Face) -> Result<()> {
    let n = face.normal();
    writeln!(writer, "  facet normal {:e} {:e} {:e}", n.x as f32, n.y as f32, n.z as f32)?;
    writeln!(writer, "    outer loop")?;
    for v in &face.vertices {
        writeln!(writer, "      vertex {:e} {:e} {:e}", v.x as f32, v.y as f32, v.z as f32)?;
    }
    writeln!(writer, "    endloop")?;
    writeln!(writer, "  endfacet")?;
    Ok(())
}
