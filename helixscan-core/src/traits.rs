//! Core traits for helixscan

use crate::{mesh::*, point::*, point_cloud::*};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point3d,
    pub max: Point3d,
}

impl BoundingBox {
    /// Bounding box of a set of points, `None` when the iterator is empty.
    /// Non-finite points are ignored.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point3d>,
    {
        let mut iter = points
            .into_iter()
            .filter(|p| p.x.is_finite() && p.y.is_finite() && p.z.is_finite());
        let first = *iter.next()?;
        let mut min = first;
        let mut max = first;

        for p in iter {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);

            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }

        Some(Self { min, max })
    }

    /// Extent along x
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Extent along y
    pub fn depth(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Extent along z
    pub fn height(&self) -> f64 {
        self.max.z - self.min.z
    }

    pub fn center(&self) -> Point3d {
        Point3d::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
            (self.min.z + self.max.z) / 2.0,
        )
    }
}

/// Trait for objects with a spatial extent
pub trait Bounded {
    /// Get the bounding box of the object, `None` if it has no points
    fn bounding_box(&self) -> Option<BoundingBox>;
}

impl Bounded for LayerCloud {
    fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.points)
    }
}

impl Bounded for ScanCloud {
    fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.points())
    }
}

impl Bounded for StitchedMesh {
    fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.faces.iter().flat_map(|f| f.vertices.iter()))
    }
}
