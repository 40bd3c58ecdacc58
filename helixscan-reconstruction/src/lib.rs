//! # helixscan Reconstruction
//!
//! Surface output for layered turntable scans.
//!
//! This crate stitches reconstructed layer rings into a triangle band mesh and
//! wires every processing stage into a single configurable pipeline.

pub mod stitching;
pub mod pipeline;

// Re-export commonly used items
pub use stitching::*;
pub use pipeline::*;
