//! PLY mesh support

use crate::MeshWriter;
use helixscan_core::{Error, Point3d, Result, StitchedMesh, TriangleMesh};
use ply_rs::{
    parser::Parser,
    ply::{
        Addable, DefaultElement, ElementDef, Encoding, Ply, Property, PropertyDef, PropertyType,
        ScalarType,
    },
    writer::Writer,
};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

pub struct PlyReader;
pub struct PlyWriter;

impl PlyReader {
    /// Read an indexed triangle mesh; polygons with more than three corners
    /// keep their first triangle
    pub fn read_mesh<P: AsRef<Path>>(path: P) -> Result<TriangleMesh> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let parser = Parser::<DefaultElement>::new();
        let ply = parser.read_ply(&mut reader)?;

        let mut vertices = Vec::new();
        if let Some(vertex_element) = ply.payload.get("vertex") {
            for vertex in vertex_element {
                let x = extract_property_value(vertex, "x")?;
                let y = extract_property_value(vertex, "y")?;
                let z = extract_property_value(vertex, "z")?;
                vertices.push(Point3d::new(x, y, z));
            }
        }

        let mut faces = Vec::new();
        if let Some(face_element) = ply.payload.get("face") {
            for face in face_element {
                let indices = extract_face_indices(face)?;
                if indices.len() < 3 {
                    continue;
                }
                if let Some(&bad) = indices.iter().find(|&&i| i >= vertices.len()) {
                    return Err(Error::InvalidData(format!(
                        "face references vertex {} of {}",
                        bad,
                        vertices.len()
                    )));
                }
                faces.push([indices[0], indices[1], indices[2]]);
            }
        }

        Ok(TriangleMesh::from_vertices_and_faces(vertices, faces))
    }
}

impl PlyWriter {
    /// Write a stitched mesh, three vertices per face in face order
    pub fn write_with_encoding<P: AsRef<Path>>(mesh: &StitchedMesh, path: P, encoding: Encoding) -> Result<()> {
        let mesh = mesh.to_triangle_mesh();
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        let mut ply = Ply::<DefaultElement>::new();
        ply.header.encoding = encoding;
        ply.header
            .comments
            .push("helixscan stitched mesh".to_string());

        let mut vertex_element = ElementDef::new("vertex".to_string());
        vertex_element.count = mesh.vertices.len();
        for name in ["x", "y", "z"] {
            vertex_element.properties.add(PropertyDef::new(
                name.to_string(),
                PropertyType::Scalar(ScalarType::Float),
            ));
        }
        ply.header.elements.add(vertex_element);

        let mut face_element = ElementDef::new("face".to_string());
        face_element.count = mesh.faces.len();
        face_element.properties.add(PropertyDef::new(
            "vertex_indices".to_string(),
            PropertyType::List(ScalarType::UChar, ScalarType::Int),
        ));
        ply.header.elements.add(face_element);

        let vertices: Vec<DefaultElement> = mesh
            .vertices
            .iter()
            .map(|vertex| {
                let mut element = DefaultElement::new();
                element.insert("x".to_string(), Property::Float(vertex.x as f32));
                element.insert("y".to_string(), Property::Float(vertex.y as f32));
                element.insert("z".to_string(), Property::Float(vertex.z as f32));
                element
            })
            .collect();
        ply.payload.insert("vertex".to_string(), vertices);

        let faces = mesh
            .faces
            .iter()
            .map(|face| {
                let indices = face
                    .iter()
                    .map(|&i| {
                        i32::try_from(i).map_err(|_| Error::InvalidData("too many vertices for PLY".to_string()))
                    })
                    .collect::<Result<Vec<i32>>>()?;
                let mut element = DefaultElement::new();
                element.insert("vertex_indices".to_string(), Property::ListInt(indices));
                Ok(element)
            })
            .collect::<Result<Vec<DefaultElement>>>()?;
        ply.payload.insert("face".to_string(), faces);

        let writer_instance = Writer::new();
        writer_instance.write_ply(&mut writer, &mut ply)?;
        writer.flush()?;

        debug!(
            vertices = mesh.vertex_count(),
            faces = mesh.face_count(),
            "Wrote PLY"
        );
        Ok(())
    }
}

impl MeshWriter for PlyWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &StitchedMesh, path: P) -> Result<()> {
        Self::write_with_encoding(mesh, path, Encoding::BinaryLittleEndian)
    }
}

/// Extract a property value as f64 from a PLY element
fn extract_property_value(element: &DefaultElement, name: &str) -> Result<f64> {
    match element.get(name) {
        Some(Property::Float(val)) => Ok(f64::from(*val)),
        Some(Property::Double(val)) => Ok(*val),
        Some(Property::Int(val)) => Ok(f64::from(*val)),
        Some(Property::UInt(val)) => Ok(f64::from(*val)),
        _ => Err(Error::InvalidData(format!(
            "Property '{}' not found or invalid type",
            name
        ))),
    }
}

/// Extract face indices from a PLY face element
fn extract_face_indices(element: &DefaultElement) -> Result<Vec<usize>> {
    match element.get("vertex_indices").or_else(|| element.get("vertex_index")) {
        Some(Property::ListInt(indices)) => indices
            .iter()
            .map(|&idx| {
                usize::try_from(idx).map_err(|_| Error::InvalidData(format!("negative vertex index {}", idx)))
            })
            .collect(),
        Some(Property::ListUInt(indices)) => Ok(indices.iter().map(|&idx| idx as usize).collect()),
        _ => Err(Error::InvalidData("Face indices not found".to_string())),
    }
}
