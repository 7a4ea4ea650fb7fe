use parry3d::{na::Point3, transformation::try_convex_hull};
use tracing::trace;

use crate::TriangleMesh;

/// Number of vertices of the convex hull of `mesh`, `None` if it is degenerate.
pub(crate) fn hull_vertex_count(mesh: &TriangleMesh) -> Option<usize> {
    let points: Vec<Point3<f32>> = mesh
        .vertices
        .iter()
        .map(|v| Point3::new(v.x, v.y, v.z))
        .collect();

    match try_convex_hull(&points) {
        Ok((hull_vertices, _indices)) => Some(hull_vertices.len()),
        Err(error) => {
            trace!("convex hull of {} points failed: {:?}", points.len(), error);
            None
        }
    }
}

/// A mesh is treated as convex when reducing it to its hull loses no vertex.
/// Tiny meshes are always convex.
pub(crate) fn is_convex(mesh: &TriangleMesh, threshold: usize) -> bool {
    mesh.vertex_count() <= threshold
        || hull_vertex_count(mesh).map_or(false, |count| count == mesh.vertex_count())
}
