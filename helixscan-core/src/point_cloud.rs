//! Layered point cloud data structures

use crate::point::*;
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// The reconstructed points of one layer, in ring order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerCloud {
    pub layer: u32,
    pub points: Vec<Point3d>,
}

/// All reconstructed layers of a scan, in ascending layer order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanCloud {
    pub layers: Vec<LayerCloud>,
}

impl LayerCloud {
    /// Create a new empty layer
    pub fn new(layer: u32) -> Self {
        Self {
            layer,
            points: Vec::new(),
        }
    }

    /// Create a layer from ring-ordered points
    pub fn from_points(layer: u32, points: Vec<Point3d>) -> Self {
        Self { layer, points }
    }

    /// Get the number of points in the ring
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the ring has no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Add a point to the end of the ring
    pub fn push(&mut self, point: Point3d) {
        self.points.push(point);
    }

    /// Get an iterator over the points
    pub fn iter(&self) -> std::slice::Iter<'_, Point3d> {
        self.points.iter()
    }
}

impl Index<usize> for LayerCloud {
    type Output = Point3d;

    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}

impl<'a> IntoIterator for &'a LayerCloud {
    type Item = &'a Point3d;
    type IntoIter = std::slice::Iter<'a, Point3d>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

impl ScanCloud {
    /// Create a new empty cloud
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Create a cloud from layers already in ascending order
    pub fn from_layers(layers: Vec<LayerCloud>) -> Self {
        Self { layers }
    }

    /// Number of layers, including empty ones
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Total number of points over all layers
    pub fn point_count(&self) -> usize {
        self.layers.iter().map(LayerCloud::len).sum()
    }

    /// Check if the cloud holds no point at all
    pub fn is_empty(&self) -> bool {
        self.point_count() == 0
    }

    /// Look up a layer by its layer index
    pub fn layer(&self, layer: u32) -> Option<&LayerCloud> {
        self.layers.iter().find(|l| l.layer == layer)
    }

    /// Iterate over every point of every layer, layer by layer
    pub fn points(&self) -> impl Iterator<Item = &Point3d> + '_ {
        self.layers.iter().flat_map(|l| l.points.iter())
    }

    /// Get an iterator over the layers
    pub fn iter(&self) -> std::slice::Iter<'_, LayerCloud> {
        self.layers.iter()
    }
}

impl Index<usize> for ScanCloud {
    type Output = LayerCloud;

    fn index(&self, index: usize) -> &Self::Output {
        &self.layers[index]
    }
}

impl IntoIterator for ScanCloud {
    type Item = LayerCloud;
    type IntoIter = std::vec::IntoIter<LayerCloud>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.into_iter()
    }
}

impl<'a> IntoIterator for &'a ScanCloud {
    type Item = &'a LayerCloud;
    type IntoIter = std::slice::Iter<'a, LayerCloud>;

    fn into_iter(self) -> Self::IntoIter {
        self.layers.iter()
    }
}

impl FromIterator<LayerCloud> for ScanCloud {
    fn from_iter<I: IntoIterator<Item = LayerCloud>>(iter: I) -> Self {
        Self {
            layers: Vec::from_iter(iter),
        }
    }
}
