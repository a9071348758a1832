use nalgebra as na;
use nalgebra_sparse as nas;

use itertools::Itertools;
use std::cell::OnceCell;

use super::{SimplexCollection, SimplicialMesh};

/// Construct a mesh from raw vertices and indices.
///
/// The indices are given as a flat array,
/// where every `DIM + 1` indices correspond to one `DIM`-simplex.
pub fn build_mesh<const MESH_DIM: usize>(
    vertices: Vec<na::SVector<f64, MESH_DIM>>,
    indices: Vec<usize>,
) -> SimplicialMesh<MESH_DIM> {
    assert!(MESH_DIM > 0, "Cannot create a mesh of dimension 0");

    // collection for every dimension of simplex, including 0
    // (even though those are just the vertices),
    // for unified storage and iteration
    let mut simplices: Vec<SimplexCollection> = (0..=MESH_DIM)
        .map(|i| SimplexCollection {
            simplex_size: i + 1,
            ..Default::default()
        })
        .collect();

    // the collection of 0-simplices is just the vertices in order
    simplices[0].indices = (0..vertices.len()).collect();

    //
    // compute sub-simplices
    //

    // highest dimension simplices have the indices given as parameter
    simplices[MESH_DIM].indices = indices;
    // by convention, sort simplices to have their indices in ascending order.
    // this gives a consistent way to identify a simplex with its vertices
    for simplex in simplices[MESH_DIM].indices.chunks_exact_mut(MESH_DIM + 1) {
        simplex.sort_unstable();
    }

    // rest of the levels are inferred
    // from boundaries of the top-level simplices
    let mut level_iter = simplices.iter_mut().rev().peekable();
    while let Some(upper_simplices) = level_iter.next() {
        let Some(lower_simplices) = level_iter.peek_mut() else {
            // we can't get here because of the break in the next conditional
            unreachable!();
        };

        if lower_simplices.simplex_size == 1 {
            // we're at the 1-simplex level, where boundary simplices are vertices.
            // no deduplication needed, build the pattern directly and stop
            let edge_count = upper_simplices.len();
            let boundary_map = nas::pattern::SparsityPattern::try_from_offsets_and_indices(
                edge_count,
                vertices.len(),
                (0..=edge_count).map(|i| 2 * i).collect(),
                upper_simplices.indices.clone(),
            )
            .expect("Error in boundary pattern construction. This is a bug in tentslab");
            lower_simplices.coboundary_map = boundary_map.transpose();
            upper_simplices.boundary_map = boundary_map;

            break;
        };

        // buffer to hold the simplex currently being processed
        let mut curr_simplex: Vec<usize> = Vec::with_capacity(lower_simplices.simplex_size);
        // vertex indices and parent simplices of every boundary simplex
        // before deduplication
        let boundary_count = upper_simplices.len() * upper_simplices.simplex_size;
        let mut boundary_vert_indices: Vec<usize> =
            Vec::with_capacity(boundary_count * lower_simplices.simplex_size);
        let mut coboundary_indices: Vec<usize> = Vec::with_capacity(boundary_count);

        for (simplex_idx, indices) in upper_simplices
            .indices
            .chunks_exact(upper_simplices.simplex_size)
            .enumerate()
        {
            // every unique combination of vertices in the upper simplex
            // is a simplex on its boundary
            for exclude_idx in 0..upper_simplices.simplex_size {
                curr_simplex.clear();
                curr_simplex.extend(
                    indices
                        .iter()
                        .enumerate()
                        .filter(|(i, _)| *i != exclude_idx)
                        .map(|(_, v)| *v),
                );

                boundary_vert_indices.extend_from_slice(&curr_simplex);
                coboundary_indices.push(simplex_idx);
            }
        }

        // sort in lexicographic order by vertex indices so duplicates end up adjacent,
        // and by parent simplex within duplicates for ascending pattern columns

        let mut sorted_boundary_indices = Vec::with_capacity(boundary_vert_indices.len());
        let mut sorted_coboundary_indices = Vec::with_capacity(coboundary_indices.len());
        for (sorted_indices, sorted_cob) in boundary_vert_indices
            .chunks_exact(lower_simplices.simplex_size)
            .zip(&coboundary_indices)
            .sorted_unstable()
        {
            sorted_boundary_indices.extend_from_slice(sorted_indices);
            sorted_coboundary_indices.push(*sorted_cob);
        }

        // column indices of the coboundary pattern are given directly
        // by the sorted parents; only the row offsets need to be built
        let mut row_offsets: Vec<usize> = vec![0];

        let mut boundary_iter = sorted_boundary_indices
            .chunks_exact(lower_simplices.simplex_size)
            .enumerate()
            .peekable();
        while let Some((simplex_idx, indices)) = boundary_iter.next() {
            // a duplicate stays on the same row:
            // the simplex is on the boundary of multiple upper simplices
            if matches!(boundary_iter.peek(), Some((_, next_indices)) if *next_indices == indices) {
                continue;
            }
            row_offsets.push(simplex_idx + 1);
            lower_simplices.indices.extend_from_slice(indices);
        }

        let col_count = upper_simplices.len();
        let row_count = lower_simplices.len();

        let coboundary_map = nas::pattern::SparsityPattern::try_from_offsets_and_indices(
            row_count,
            col_count,
            row_offsets,
            sorted_coboundary_indices,
        )
        .expect("Error in coboundary pattern construction. This is a bug in tentslab");

        upper_simplices.boundary_map = coboundary_map.transpose();
        lower_simplices.coboundary_map = coboundary_map;
    }

    // set dimensions of the empty 0-boundary and MESH_DIM-coboundary patterns
    // so that row indexing works on them too
    simplices[0].boundary_map = nas::pattern::SparsityPattern::zeros(simplices[0].len(), 0);
    simplices[MESH_DIM].coboundary_map =
        nas::pattern::SparsityPattern::zeros(simplices[MESH_DIM].len(), 0);

    //
    // identify mesh boundary
    //

    for simplices in &mut simplices {
        simplices.mesh_boundary.grow(simplices.len());
    }

    // if a codimension 1 simplex is only on the boundary of one codimension 0 simplex,
    // then it is on the boundary of the mesh
    let cod_1_simplices = &mut simplices[MESH_DIM - 1];
    for row_idx in 0..cod_1_simplices.coboundary_map.major_dim() {
        if cod_1_simplices.coboundary_map.lane(row_idx).len() == 1 {
            cod_1_simplices.mesh_boundary.insert(row_idx);
        }
    }

    // lower-dimensional simplices are on the mesh boundary
    // if they bound a boundary simplex one level up
    let mut level_iter = simplices.iter_mut().rev().skip(1).peekable();
    while let Some(upper_simplices) = level_iter.next() {
        let Some(lower_simplices) = level_iter.peek_mut() else {
            break;
        };
        for simplex_idx in upper_simplices.mesh_boundary.ones() {
            for boundary_simplex_idx in upper_simplices.boundary_map.lane(simplex_idx) {
                lower_simplices.mesh_boundary.insert(*boundary_simplex_idx);
            }
        }
    }

    SimplicialMesh {
        vertices,
        simplices,
        vertex_elements: OnceCell::new(),
        boundary_regions: Vec::new(),
        periodic_pairs: Vec::new(),
    }
}

//
// tests
//

type Vec1 = na::SVector<f64, 1>;
type Vec2 = na::SVector<f64, 2>;

/// A small non-uniform 1D mesh with three segments
/// and vertices at 0, 0.25, 0.5 and 1.
///
/// This is public for visibility in doctests, which frequently need an instance of a mesh.
/// It is not meant to be used by users and thus hidden from docs.
#[doc(hidden)]
pub fn tiny_mesh_1d() -> SimplicialMesh<1> {
    let vertices = vec![
        Vec1::new(0.0),
        Vec1::new(0.25),
        Vec1::new(0.5),
        Vec1::new(1.0),
    ];
    let indices = vec![0, 1, 1, 2, 2, 3];
    SimplicialMesh::new(vertices, indices)
}

/// A small hexagon-shaped 2D mesh for testing basic functionality.
/// Shaped somewhat like this:
///    ____
///   /\  /\
///  /__\/__\
///  \  /\  /
///   \/__\/
///
/// with vertices and triangles ordered left to right, top to bottom.
#[doc(hidden)]
pub fn tiny_mesh_2d() -> SimplicialMesh<2> {
    let vertices = vec![
        Vec2::new(-0.5, 1.0),
        Vec2::new(0.5, 1.0),
        Vec2::new(-1.0, 0.0),
        Vec2::new(0.0, 0.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(-0.5, -1.0),
        Vec2::new(0.5, -1.0),
    ];
    #[rustfmt::skip]
    let indices = vec![
        0, 2, 3,
        0, 1, 3,
        1, 3, 4,
        2, 3, 5,
        3, 5, 6,
        3, 4, 6,
    ];
    SimplicialMesh::new(vertices, indices)
}
