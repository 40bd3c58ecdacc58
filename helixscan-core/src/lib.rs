//! Core data structures for helixscan
//!
//! This crate provides the fundamental types shared by the helicoidal scanner
//! pipeline: raw polar scan samples, calibration parameters and the calibration
//! model, layered point clouds, stitched meshes, and the common error type.

pub mod point;
pub mod calibration;
pub mod point_cloud;
pub mod mesh;
pub mod traits;
pub mod error;

pub use point::*;
pub use calibration::*;
pub use point_cloud::*;
pub use mesh::*;
pub use traits::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3};
