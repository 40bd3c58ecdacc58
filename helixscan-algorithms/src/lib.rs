//! # helixscan Algorithms
//!
//! Processing stages for turntable distance scans.
//!
//! This crate turns raw polar readings into layered Cartesian clouds and fits
//! the scanner's calibration: median noise filtering, reconstruction through a
//! calibration model, circular ring smoothing, and a bounded Nelder–Mead
//! search against a square reference object.

pub mod filtering;
pub mod reconstruction;
pub mod smoothing;
pub mod optimizer;
pub mod calibration;

// Re-export commonly used items
pub use filtering::*;
pub use reconstruction::*;
pub use smoothing::*;
pub use optimizer::*;
pub use calibration::*;
