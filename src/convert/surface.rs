use nalgebra as na;
use std::{borrow::Cow, collections::HashMap};

use super::FrontTable;
use crate::{
    mesh::{BoundaryRegion, SimplicialMesh},
    spacetime::SpacetimeMeshBuilder,
};

/// The facets of a volume element as cyclic windows over its vertices:
/// facet `i` is `element[i..i + n]` with indices wrapping around,
/// where `n` is one less than the element's vertex count.
pub(super) fn facet_windows(element: &[usize]) -> impl '_ + Iterator<Item = Vec<usize>> {
    let len = element.len();
    (0..len).map(move |i| (0..len - 1).map(|k| element[(i + k) % len]).collect())
}

/// Orient facets consistently with respect to the centroid of all their points.
///
/// A facet is kept as is if the determinant of
/// `[centroid - v0; v1 - v0; ...; v(n-1) - v0]` is positive,
/// otherwise its first two vertices are swapped.
/// Returns the number of swapped facets.
///
/// This only gives outward (or inward) normals everywhere
/// when the centroid sees every facet from the same side,
/// e.g. for slabs over convex domains.
/// A facet whose hyperplane passes through the centroid has a zero determinant
/// and is swapped on every call, so repeated orientation is only stable
/// when no such facet exists.
pub(super) fn orient_facets<const DIM: usize>(
    points: &[na::SVector<f64, DIM>],
    facets: &mut [Vec<usize>],
) -> usize {
    let point_count = facets.iter().map(Vec::len).sum::<usize>();
    if point_count == 0 {
        return 0;
    }
    let centroid = facets
        .iter()
        .flatten()
        .fold(na::SVector::<f64, DIM>::zeros(), |acc, &v| acc + points[v])
        / point_count as f64;

    let mut flips = 0;
    for facet in facets.iter_mut() {
        let v0 = points[facet[0]];
        let to_centroid = centroid - v0;
        let mat = na::DMatrix::from_fn(DIM, DIM, |row, col| {
            if row == 0 {
                to_centroid[col]
            } else {
                points[facet[row]][col] - v0[col]
            }
        });
        if mat.determinant() <= 0.0 {
            facet.swap(0, 1);
            flips += 1;
        }
    }
    flips
}

/// Extract the boundary facets of the volume elements built so far,
/// orient them and sort them into regions.
///
/// A facet is retained if it belongs to exactly one volume element
/// and all of its vertices lie on the spacetime boundary.
///
/// For 1D spatial meshes all facets go in a single region called "surface".
/// Otherwise the regions are the spatial mesh's boundary regions extended in time
/// (or a single "default" region covering the whole spatial boundary if none are declared),
/// followed by "base" for facets in the initial time slice
/// and "final" for the rest.
pub(super) fn add_surface_elements<const DIM: usize, const ST_DIM: usize>(
    mesh: &SimplicialMesh<DIM>,
    fronts: &FrontTable,
    builder: &mut SpacetimeMeshBuilder<ST_DIM>,
) {
    let mut facet_counts: HashMap<Vec<usize>, usize> = HashMap::new();
    for element in builder.volume_elements() {
        for mut facet in facet_windows(element) {
            facet.sort_unstable();
            *facet_counts.entry(facet).or_default() += 1;
        }
    }

    let mut facets: Vec<Vec<usize>> = Vec::new();
    for element in builder.volume_elements() {
        for facet in facet_windows(element) {
            if !facet.iter().all(|&v| fronts.is_boundary(v)) {
                continue;
            }
            let mut sorted = facet.clone();
            sorted.sort_unstable();
            if facet_counts.get(&sorted) == Some(&1) {
                facets.push(facet);
            }
        }
    }

    let flips = orient_facets(builder.points(), &mut facets);
    log::debug!("{} boundary facets, {flips} flipped", facets.len());

    if ST_DIM == 2 {
        let surface = builder.add_region("surface");
        for facet in facets {
            builder.add_surface_element(facet, surface);
        }
        return;
    }

    // spatial regions in order of precedence
    let spatial_regions: Cow<[BoundaryRegion]> = if mesh.boundary_regions().is_empty() {
        Cow::Owned(vec![BoundaryRegion {
            name: "default".to_string(),
            facets: mesh.boundary_facets().clone(),
            vertices: mesh.boundary_vertices().clone(),
        }])
    } else {
        Cow::Borrowed(mesh.boundary_regions())
    };
    let region_ids: Vec<usize> = spatial_regions
        .iter()
        .map(|r| builder.add_region(r.name.as_str()))
        .collect();
    let base = builder.add_region("base");
    let fin = builder.add_region("final");
    log::debug!("{} surface regions", region_ids.len() + 2);

    let base_vertex_count = mesh.vertex_count();
    for facet in facets {
        let spatial_region = spatial_regions
            .iter()
            .position(|r| r.contains_all(facet.iter().map(|&v| fronts.origin(v))));
        let region = match spatial_region {
            Some(idx) => region_ids[idx],
            None if facet.iter().all(|&v| v < base_vertex_count) => base,
            None => fin,
        };
        builder.add_surface_element(facet, region);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        convert::{elements::add_volume_elements, fronts::add_vertices},
        mesh::{generators, tiny_mesh_2d},
        periodic::PeriodicClosure,
        tents::layered_tents,
    };
    use fixedbitset as fb;

    fn with_volume_elements(
        mesh: &SimplicialMesh<2>,
        rounds: usize,
    ) -> (SpacetimeMeshBuilder<3>, FrontTable) {
        let slab = layered_tents(mesh, 1.0, rounds);
        let mut builder = SpacetimeMeshBuilder::new();
        let fronts = add_vertices(&slab, &PeriodicClosure::default(), 1.0, &mut builder).unwrap();
        add_volume_elements(mesh, &fronts, &mut builder).unwrap();
        (builder, fronts)
    }

    #[test]
    fn windows_wrap_around() {
        itertools::assert_equal(
            facet_windows(&[7, 8, 9]),
            [vec![7, 8], vec![8, 9], vec![9, 7]],
        );
        itertools::assert_equal(
            facet_windows(&[0, 1, 2, 3]),
            [vec![0, 1, 2], vec![1, 2, 3], vec![2, 3, 0], vec![3, 0, 1]],
        );
    }

    #[test]
    fn orientation_is_idempotent() {
        let mesh = generators::rectangle_mesh(
            na::Vector2::new(0.0, 0.0),
            na::Vector2::new(1.0, 1.0),
            3,
            2,
        );
        let (mut builder, fronts) = with_volume_elements(&mesh, 2);
        add_surface_elements(&mesh, &fronts, &mut builder);
        let st_mesh = builder.build();

        let mut facets: Vec<Vec<usize>> = st_mesh
            .surface_elements()
            .iter()
            .map(|s| s.vertices.clone())
            .collect();
        assert_eq!(orient_facets(st_mesh.vertices(), &mut facets), 0);
        assert!(facets
            .iter()
            .zip(st_mesh.surface_elements())
            .all(|(f, s)| *f == s.vertices));
    }

    /// In one spatial dimension the facets are edges,
    /// oriented by the sign of their 2D cross product with the direction to the centroid.
    #[test]
    fn edge_orientation_in_one_spatial_dimension() {
        let mesh = generators::interval_mesh(0.0, 1.0, 6);
        let slab = layered_tents(&mesh, 0.5, 2);
        let mut builder = SpacetimeMeshBuilder::<2>::new();
        let fronts = add_vertices(&slab, &PeriodicClosure::default(), 1.0, &mut builder).unwrap();
        add_volume_elements(&mesh, &fronts, &mut builder).unwrap();
        add_surface_elements(&mesh, &fronts, &mut builder);
        let st_mesh = builder.build();

        // 6 edges at both ends in time and 2 layers of tents on both sides
        let surface = st_mesh.surface_elements();
        assert_eq!(surface.len(), 16);
        assert!(surface.iter().all(|s| s.region == 0));

        let points = st_mesh.vertices();
        let point_count = 2 * surface.len();
        let centroid = surface
            .iter()
            .flat_map(|s| &s.vertices)
            .fold(na::Vector2::zeros(), |acc, &v| acc + points[v])
            / point_count as f64;
        for s in surface {
            let [a, b] = [0, 1].map(|i| points[s.vertices[i]]);
            let to_centroid = centroid - a;
            let along = b - a;
            assert!(
                to_centroid.x * along.y - to_centroid.y * along.x > 0.0,
                "{:?}",
                s.vertices
            );
        }

        let mut facets: Vec<Vec<usize>> = surface.iter().map(|s| s.vertices.clone()).collect();
        assert_eq!(orient_facets(points, &mut facets), 0);
    }

    #[test]
    fn orientation_is_consistent_around_a_tetrahedron() {
        // the four faces of a tetrahedron, listed inconsistently
        let points = [
            na::Vector3::new(0.0, 0.0, 0.0),
            na::Vector3::new(1.0, 0.0, 0.0),
            na::Vector3::new(0.0, 1.0, 0.0),
            na::Vector3::new(0.0, 0.0, 1.0),
        ];
        let mut facets = vec![vec![0, 1, 2], vec![0, 3, 1], vec![1, 2, 3], vec![0, 2, 3]];
        orient_facets(&points, &mut facets);

        let centroid = na::Vector3::new(0.25, 0.25, 0.25);
        for facet in &facets {
            let [a, b, c] = [0, 1, 2].map(|i| points[facet[i]]);
            let normal = (b - a).cross(&(c - a));
            // consistent orientation: all normals point to the same side of their face
            assert!(normal.dot(&(centroid - a)) > 0.0, "{facet:?}");
        }
    }

    #[test]
    fn closure_of_boundary_vertices() {
        let mesh = generators::rectangle_mesh(
            na::Vector2::new(0.0, 0.0),
            na::Vector2::new(2.0, 1.0),
            4,
            2,
        );
        let (mut builder, fronts) = with_volume_elements(&mesh, 2);
        add_surface_elements(&mesh, &fronts, &mut builder);
        let st_mesh = builder.build();

        let mut used = fb::FixedBitSet::with_capacity(st_mesh.vertex_count());
        for s in st_mesh.surface_elements() {
            for &v in &s.vertices {
                assert!(fronts.is_boundary(v));
                used.insert(v);
            }
        }
        for v in 0..st_mesh.vertex_count() {
            assert_eq!(used.contains(v), fronts.is_boundary(v), "vertex {v}");
        }

        // the retained facets are exactly the boundary of the spacetime mesh
        assert_eq!(
            st_mesh.surface_elements().len(),
            st_mesh.topology().boundary::<2>().count_ones(..)
        );
    }

    #[test]
    fn first_matching_region_wins() {
        let mut mesh = tiny_mesh_2d();
        let all_boundary: Vec<usize> = mesh.boundary::<1>().ones().collect();
        mesh.add_boundary_region("whole", all_boundary.iter().copied());
        mesh.add_boundary_region("part", all_boundary[..2].iter().copied());

        let (mut builder, fronts) = with_volume_elements(&mesh, 1);
        add_surface_elements(&mesh, &fronts, &mut builder);
        let st_mesh = builder.build();

        let names: Vec<&str> = st_mesh.regions().iter().map(String::as_str).collect();
        assert_eq!(names, ["whole", "part", "base", "final"]);
        assert!(st_mesh.surface_elements_in(0).count() > 0);
        assert_eq!(st_mesh.surface_elements_in(1).count(), 0);
    }

    #[test]
    fn undeclared_regions_fall_back_to_default() {
        let mesh = tiny_mesh_2d();
        let (mut builder, fronts) = with_volume_elements(&mesh, 1);
        add_surface_elements(&mesh, &fronts, &mut builder);
        let st_mesh = builder.build();

        let names: Vec<&str> = st_mesh.regions().iter().map(String::as_str).collect();
        assert_eq!(names, ["default", "base", "final"]);
        // one vertical facet per tent at either end of each boundary edge,
        // and one triangle per spatial triangle at both ends in time
        let boundary_edges = mesh.boundary::<1>().count_ones(..);
        assert_eq!(st_mesh.surface_elements_in(0).count(), 2 * boundary_edges);
        assert_eq!(
            st_mesh.surface_elements_in(1).count(),
            mesh.simplex_count::<2>()
        );
        assert_eq!(
            st_mesh.surface_elements_in(2).count(),
            mesh.simplex_count::<2>()
        );
    }
}
