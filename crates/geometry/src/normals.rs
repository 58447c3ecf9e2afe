//! Vertex normal computation.
//!
//! Both the soft-body topology refresh and the rigid-mesh brush recompute
//! normals from a static index buffer after positions change.

use glam::Vec3;

/// Recalculate per-vertex normals from an indexed triangle list.
///
/// Each vertex normal is the normalized sum of the un-normalized (area
/// weighted) normals of its adjacent faces. Vertices referenced by no valid
/// face get a zero normal. Triangles with out-of-range indices are ignored.
pub fn compute_vertex_normals(positions: &[Vec3], indices: &[u32]) -> Vec<Vec3> {
    let mut normals = vec![Vec3::ZERO; positions.len()];
    accumulate_normals(positions, indices, &mut normals);
    normals
}

/// Like [`compute_vertex_normals`] but reuses an existing buffer.
pub fn recompute_vertex_normals(positions: &[Vec3], indices: &[u32], normals: &mut Vec<Vec3>) {
    normals.clear();
    normals.resize(positions.len(), Vec3::ZERO);
    accumulate_normals(positions, indices, normals);
}

fn accumulate_normals(positions: &[Vec3], indices: &[u32], normals: &mut [Vec3]) {
    for tri in indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let (Some(&v0), Some(&v1), Some(&v2)) = (positions.get(a), positions.get(b), positions.get(c))
        else {
            continue;
        };

        let weighted = (v1 - v0).cross(v2 - v0);
        if !weighted.is_finite() {
            continue;
        }
        normals[a] += weighted;
        normals[b] += weighted;
        normals[c] += weighted;
    }

    for normal in normals.iter_mut() {
        *normal = normal.normalize_or_zero();
    }
}
