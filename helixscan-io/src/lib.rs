//! I/O operations for scans, clouds and meshes
//!
//! This crate reads the collector's scan CSV files and writes reconstructed
//! clouds (CSV) and stitched meshes (STL, PLY).

pub mod scan_csv;
pub mod cloud_csv;
pub mod stl;
pub mod ply;

pub use scan_csv::{Delimiter, ScanColumn, ScanCsvReader, ScanCsvSchema, ScanCsvWriter};
pub use cloud_csv::{CloudCsvReader, CloudCsvWriter};
pub use stl::{binary_stl_size, StlFormat, StlWriter};
pub use ply::{PlyReader, PlyWriter};

use helixscan_core::{Error, Result, ScanCloud, ScanSample, StitchedMesh};
use std::path::Path;

/// Trait for writing stitched meshes to files
pub trait MeshWriter {
    fn write_mesh<P: AsRef<Path>>(mesh: &StitchedMesh, path: P) -> Result<()>;
}

/// Binary or text flavour of a mesh format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MeshEncoding {
    #[default]
    Binary,
    Ascii,
}

/// Auto-detect format from the extension and write a binary mesh
pub fn write_mesh<P: AsRef<Path>>(path: P, mesh: &StitchedMesh) -> Result<()> {
    write_mesh_with_encoding(path, mesh, MeshEncoding::Binary)
}

/// Auto-detect format from the extension and write a mesh
pub fn write_mesh_with_encoding<P: AsRef<Path>>(path: P, mesh: &StitchedMesh, encoding: MeshEncoding) -> Result<()> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_lowercase);
    match (extension.as_deref(), encoding) {
        (Some("stl"), MeshEncoding::Binary) => StlWriter::write_with_format(mesh, path, StlFormat::Binary),
        (Some("stl"), MeshEncoding::Ascii) => StlWriter::write_with_format(mesh, path, StlFormat::Ascii),
        (Some("ply"), MeshEncoding::Binary) => {
            PlyWriter::write_with_encoding(mesh, path, ply_rs::ply::Encoding::BinaryLittleEndian)
        }
        (Some("ply"), MeshEncoding::Ascii) => PlyWriter::write_with_encoding(mesh, path, ply_rs::ply::Encoding::Ascii),
        _ => Err(Error::UnsupportedFormat(format!(
            "Unsupported mesh format: {:?}",
            path.extension()
        ))),
    }
}

/// Read a scan CSV file
pub fn read_scan<P: AsRef<Path>>(path: P) -> Result<Vec<ScanSample>> {
    ScanCsvReader::read_scan(path)
}

/// Read a cloud CSV file
pub fn read_cloud<P: AsRef<Path>>(path: P) -> Result<ScanCloud> {
    CloudCsvReader::read_cloud(path)
}

/// Write a cloud CSV file
pub fn write_cloud<P: AsRef<Path>>(path: P, cloud: &ScanCloud) -> Result<()> {
    CloudCsvWriter::write_cloud(cloud, path)
}
