//! Ring stitching between consecutive layers
//!
//! Each pair of neighbouring rings is joined by a band of triangles, two per
//! ring position, wrapping around the ring. Rings of different sizes are
//! truncated to the shorter one, so the tail of the longer ring is left out
//! of the band.

use helixscan_core::{Face, LayerCloud, ScanCloud, StitchedMesh};
use itertools::Itertools;
use tracing::debug;

/// Stitch consecutive layers of a cloud into a triangle band mesh
///
/// For rings `a` (lower) and `b` (upper) with `n = min(|a|, |b|)`, position
/// `j` emits `[a_j, b_j, b_{j+1}]` and `[a_j, b_{j+1}, a_{j+1}]`, indices
/// modulo `n`. Faces are tagged with the lower ring's layer. A cloud with
/// fewer than two layers gives an empty mesh, and a pairing with an empty ring
/// contributes no faces.
///
/// # Example
/// ```rust
/// use helixscan_core::{LayerCloud, Point3d, ScanCloud};
/// use helixscan_reconstruction::stitch_layers;
///
/// let ring = |layer: u32, z: f64| {
///     LayerCloud::from_points(layer, vec![
///         Point3d::new(1.0, 0.0, z),
///         Point3d::new(0.0, 1.0, z),
///         Point3d::new(-1.0, 0.0, z),
///     ])
/// };
/// let cloud = ScanCloud::from_layers(vec![ring(0, 0.0), ring(1, 1.0)]);
/// assert_eq!(stitch_layers(&cloud).face_count(), 6);
/// ```
pub fn stitch_layers(cloud: &ScanCloud) -> StitchedMesh {
    let mut mesh = StitchedMesh::new();
    for (lower, upper) in cloud.iter().tuple_windows() {
        stitch_pair(lower, upper, &mut mesh);
    }
    debug!(
        layers = cloud.layer_count(),
        faces = mesh.face_count(),
        "Stitched layer rings"
    );
    mesh
}

fn stitch_pair(lower: &LayerCloud, upper: &LayerCloud, mesh: &mut StitchedMesh) {
    let n = lower.len().min(upper.len());
    if lower.len() != upper.len() {
        debug!(
            lower_layer = lower.layer,
            upper_layer = upper.layer,
            lower_points = lower.len(),
            upper_points = upper.len(),
            kept = n,
            "Ring sizes differ, truncating to the shorter ring"
        );
    }

    for j in 0..n {
        let next = (j + 1) % n;
        mesh.push(Face::new(lower.layer, lower[j], upper[j], upper[next]));
        mesh.push(Face::new(lower.layer, lower[j], upper[next], lower[next]));
    }
}
