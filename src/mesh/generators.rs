//! Simple structured meshes for tests and demos.

use nalgebra as na;

use super::SimplicialMesh;

/// Generate a uniform mesh of the interval `[start, end]` with `n` segments.
///
/// Boundary regions "left" and "right" are declared on the two end points.
pub fn interval_mesh(start: f64, end: f64, n: usize) -> SimplicialMesh<1> {
    assert!(n > 0, "an interval mesh needs at least one segment");

    let step = (end - start) / n as f64;
    let vertices = (0..=n)
        .map(|i| na::Vector1::new(start + i as f64 * step))
        .collect();
    let indices = (0..n).flat_map(|i| [i, i + 1]).collect();

    let mut mesh = SimplicialMesh::new(vertices, indices);
    mesh.add_boundary_region("left", [0]);
    mesh.add_boundary_region("right", [n]);
    mesh
}

/// Generate a mesh of the axis-aligned rectangle between `min` and `max`
/// with `nx` by `ny` cells, each split into two triangles.
///
/// Vertices are numbered row by row from the bottom left corner.
/// Boundary regions "bottom", "right", "top" and "left" are declared in that order.
pub fn rectangle_mesh(
    min: na::Vector2<f64>,
    max: na::Vector2<f64>,
    nx: usize,
    ny: usize,
) -> SimplicialMesh<2> {
    assert!(nx > 0 && ny > 0, "a rectangle mesh needs at least one cell");

    let step = (max - min).component_div(&na::Vector2::new(nx as f64, ny as f64));
    let vertex_idx = |i: usize, j: usize| j * (nx + 1) + i;

    let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1));
    for j in 0..=ny {
        for i in 0..=nx {
            vertices.push(min + na::Vector2::new(i as f64 * step.x, j as f64 * step.y));
        }
    }

    let mut indices = Vec::with_capacity(6 * nx * ny);
    for j in 0..ny {
        for i in 0..nx {
            let (v00, v10) = (vertex_idx(i, j), vertex_idx(i + 1, j));
            let (v01, v11) = (vertex_idx(i, j + 1), vertex_idx(i + 1, j + 1));
            indices.extend_from_slice(&[v00, v10, v11, v00, v11, v01]);
        }
    }

    let mut mesh = SimplicialMesh::new(vertices, indices);
    // tolerance for comparing generated coordinates against the rectangle sides
    let eps = 1e-9 * (max - min).amax();
    mesh.add_boundary_region_where("bottom", |v| (v.y - min.y).abs() < eps);
    mesh.add_boundary_region_where("right", |v| (v.x - max.x).abs() < eps);
    mesh.add_boundary_region_where("top", |v| (v.y - max.y).abs() < eps);
    mesh.add_boundary_region_where("left", |v| (v.x - min.x).abs() < eps);
    mesh
}

/// Generate a rectangle mesh as in [`rectangle_mesh`]
/// where the right side is a periodic copy of the left side (identifier 0).
pub fn rectangle_mesh_periodic_x(
    min: na::Vector2<f64>,
    max: na::Vector2<f64>,
    nx: usize,
    ny: usize,
) -> SimplicialMesh<2> {
    let mut mesh = rectangle_mesh(min, max, nx, ny);
    for j in 0..=ny {
        mesh.add_periodic_pair(j * (nx + 1), j * (nx + 1) + nx, 0);
    }
    mesh
}

/// Generate a rectangle mesh as in [`rectangle_mesh`]
/// that is periodic in both directions:
/// the right side copies the left (identifier 0)
/// and the top copies the bottom (identifier 1).
///
/// The corners form chains of identifications,
/// e.g. bottom left → bottom right → top right.
pub fn rectangle_mesh_periodic_xy(
    min: na::Vector2<f64>,
    max: na::Vector2<f64>,
    nx: usize,
    ny: usize,
) -> SimplicialMesh<2> {
    let mut mesh = rectangle_mesh_periodic_x(min, max, nx, ny);
    for i in 0..=nx {
        mesh.add_periodic_pair(i, ny * (nx + 1) + i, 1);
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_regions() {
        let mesh = interval_mesh(0.0, 1.0, 100);
        assert_eq!(mesh.vertex_count(), 101);
        assert_eq!(mesh.simplex_count::<1>(), 100);

        let regions = mesh.boundary_regions();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].name, "left");
        itertools::assert_equal(regions[0].vertices.ones(), [0]);
        itertools::assert_equal(regions[1].vertices.ones(), [100]);
        itertools::assert_equal(mesh.boundary_vertices().ones(), [0, 100]);
    }

    #[test]
    fn rectangle_regions_cover_boundary() {
        let mesh = rectangle_mesh(na::Vector2::new(0.0, 0.0), na::Vector2::new(2.0, 1.0), 4, 3);
        assert_eq!(mesh.vertex_count(), 20);
        assert_eq!(mesh.simplex_count::<2>(), 24);

        let names: Vec<&str> = mesh
            .boundary_regions()
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, ["bottom", "right", "top", "left"]);

        let facet_counts: Vec<usize> = mesh
            .boundary_regions()
            .iter()
            .map(|r| r.facets.count_ones(..))
            .collect();
        assert_eq!(facet_counts, [4, 3, 4, 3]);

        // every boundary edge is in exactly one region
        let total: usize = facet_counts.iter().sum();
        assert_eq!(total, mesh.boundary::<1>().count_ones(..));
    }

    #[test]
    fn periodic_pairs() {
        let mesh = rectangle_mesh_periodic_xy(
            na::Vector2::new(0.0, 0.0),
            na::Vector2::new(1.0, 1.0),
            2,
            2,
        );
        let pairs = mesh.periodic_pairs();
        assert_eq!(pairs.len(), 6);
        for pair in pairs {
            let (m, s) = (mesh.vertices()[pair.master], mesh.vertices()[pair.servant]);
            match pair.ident {
                0 => assert_eq!((m.x, s.x, m.y), (0.0, 1.0, s.y)),
                1 => assert_eq!((m.y, s.y, m.x), (0.0, 1.0, s.x)),
                other => panic!("unexpected identifier {other}"),
            }
        }
    }
}
