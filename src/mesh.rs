//! The simplicial mesh used on both sides of a slab conversion:
//! as the spatial mesh tents are pitched on,
//! and as the topology of the generated spacetime mesh.

/// Low-level mesh construction and corresponding tests.
mod mesh_construction;
/// re-export the testing meshes for use in other modules' tests
#[doc(hidden)]
pub use mesh_construction::{tiny_mesh_1d, tiny_mesh_2d};

pub mod generators;

//

use fixedbitset as fb;
use nalgebra as na;
use nalgebra_sparse as nas;

use std::{cell::OnceCell, collections::HashMap};

use crate::periodic::PeriodicPair;

/// A mesh where the cells are all simplices
/// (points, line segments, triangles, tetrahedra etc).
///
/// Besides the simplices themselves, the mesh carries
/// the metadata tent pitching needs from a spatial mesh:
/// named boundary regions and periodic vertex identifications.
#[derive(Clone, Debug)]
pub struct SimplicialMesh<const DIM: usize> {
    /// Vertex positions. Mutation after creation is not supported.
    pub(crate) vertices: Vec<na::SVector<f64, DIM>>,
    /// Storage for each dimension of simplex in the mesh.
    pub(crate) simplices: Vec<SimplexCollection>,
    /// map from a vertex to the `DIM`-simplices containing it,
    /// constructed lazily in `SimplicialMesh::elements_around`.
    vertex_elements: OnceCell<Vec<Vec<usize>>>,
    /// named sets of `DIM - 1`-simplices in declaration order.
    boundary_regions: Vec<BoundaryRegion>,
    periodic_pairs: Vec<PeriodicPair>,
}

#[derive(Clone, Debug)]
pub(crate) struct SimplexCollection {
    /// points per simplex in the storage Vec
    simplex_size: usize,
    /// indices stored in a flat Vec to avoid generics for dimension
    pub indices: Vec<usize>,
    /// map from the vertex indices of a simplex to its index in this collection.
    /// constructed lazily in `SimplicialMesh::find_simplex_index`.
    index_map: OnceCell<HashMap<Vec<usize>, usize>>,
    /// incidence pattern where the rows correspond to DIM-simplices
    /// and the columns to the (DIM-1)-simplices on their boundary.
    boundary_map: nas::pattern::SparsityPattern,
    /// transpose of the DIM+1-dimensional collection's `boundary_map`.
    /// the rows in this correspond to DIM-simplices again,
    /// and the columns to DIM+1-simplices.
    coboundary_map: nas::pattern::SparsityPattern,
    /// simplices on the boundary of the mesh.
    mesh_boundary: fb::FixedBitSet,
}

impl Default for SimplexCollection {
    fn default() -> Self {
        // initialize empty collections
        // which will be filled during mesh construction
        Self {
            simplex_size: 0,
            indices: Vec::new(),
            index_map: OnceCell::new(),
            boundary_map: nas::pattern::SparsityPattern::zeros(0, 0),
            coboundary_map: nas::pattern::SparsityPattern::zeros(0, 0),
            mesh_boundary: fb::FixedBitSet::default(),
        }
    }
}

impl SimplexCollection {
    /// Get the number of simplices in the collection.
    #[inline]
    fn len(&self) -> usize {
        self.indices.len() / self.simplex_size
    }

    /// Get the slice of vertex indices corresponding to a single simplex.
    #[inline]
    fn simplex_indices(&self, simplex_idx: usize) -> &[usize] {
        let start_idx = simplex_idx * self.simplex_size;
        &self.indices[start_idx..start_idx + self.simplex_size]
    }
}

/// A named group of `DIM - 1`-simplices on the boundary of a mesh,
/// e.g. one side of a rectangle or a physical group from a gmsh file.
#[derive(Clone, Debug)]
pub struct BoundaryRegion {
    /// Name of the region, carried over to the spacetime mesh.
    pub name: String,
    /// Indices of the `DIM - 1`-simplices in the region.
    ///
    /// Iterate over the indices with `facets.ones()`.
    pub facets: fb::FixedBitSet,
    /// Vertices of all facets in the region.
    pub vertices: fb::FixedBitSet,
}

impl BoundaryRegion {
    /// Check whether every given vertex belongs to this region.
    #[inline]
    pub fn contains_all(&self, mut vertex_indices: impl Iterator<Item = usize>) -> bool {
        vertex_indices.all(|v| self.vertices.contains(v))
    }
}

impl<const MESH_DIM: usize> SimplicialMesh<MESH_DIM> {
    /// Construct a mesh from raw vertices and indices.
    ///
    /// The indices are given as a flat array,
    /// where every `DIM + 1` indices correspond to one `DIM`-simplex.
    #[inline]
    pub fn new(vertices: Vec<na::SVector<f64, MESH_DIM>>, indices: Vec<usize>) -> Self {
        mesh_construction::build_mesh(vertices, indices)
    }

    /// Get the number of `DIM`-simplices in the mesh.
    #[inline]
    pub fn simplex_count<const DIM: usize>(&self) -> usize
    where
        na::Const<MESH_DIM>: na::DimNameSub<na::Const<DIM>>,
    {
        self.simplex_count_dyn(DIM)
    }

    /// Simplex count taking the dimension as a runtime parameter
    /// to allow usage in dynamic contexts (internal APIs)
    #[inline]
    pub(crate) fn simplex_count_dyn(&self, dim: usize) -> usize {
        self.simplices[dim].len()
    }

    /// Get the number of vertices in the mesh.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get the vertex indices of a simplex by its dimension and index.
    #[inline]
    pub(crate) fn simplex_indices_dyn(&self, dim: usize, idx: usize) -> &[usize] {
        self.simplices[dim].simplex_indices(idx)
    }

    /// Get a slice of all vertices in the mesh.
    #[inline]
    pub fn vertices(&self) -> &[na::SVector<f64, MESH_DIM>] {
        &self.vertices
    }

    /// Access the vertex indices for the given dimension of simplex
    /// as a chunked iterator where each element is a `DIM + 1`-length slice
    /// containing the indices of one simplex.
    ///
    /// Indices are sorted in ascending order within each simplex.
    #[inline]
    pub fn indices<const DIM: usize>(&self) -> std::slice::ChunksExact<'_, usize>
    where
        na::Const<MESH_DIM>: na::DimNameSub<na::Const<DIM>>,
    {
        self.simplices[DIM].indices.chunks_exact(DIM + 1)
    }

    /// Get the set of `DIM`-simplices on the mesh boundary.
    ///
    /// For the highest-dimensional simplices this is always empty.
    #[inline]
    pub fn boundary<const DIM: usize>(&self) -> &fb::FixedBitSet
    where
        na::Const<MESH_DIM>: na::DimNameSub<na::Const<DIM>>,
    {
        &self.simplices[DIM].mesh_boundary
    }

    /// Get the set of vertices on the mesh boundary.
    #[inline]
    pub fn boundary_vertices(&self) -> &fb::FixedBitSet {
        &self.simplices[0].mesh_boundary
    }

    /// Get the set of `MESH_DIM - 1`-simplices on the mesh boundary.
    #[inline]
    pub fn boundary_facets(&self) -> &fb::FixedBitSet {
        &self.simplices[MESH_DIM - 1].mesh_boundary
    }

    /// Find the index of a simplex in its collection given its vertex indices.
    ///
    /// Returns None if no `DIM`-simplex with the given indices exists.
    /// This is always the case if the number of indices isn't `DIM + 1`.
    /// The indices must be given in ascending order.
    pub fn find_simplex_index<const DIM: usize>(&self, indices: &[usize]) -> Option<usize>
    where
        na::Const<MESH_DIM>: na::DimNameSub<na::Const<DIM>>,
    {
        self.find_simplex_index_dyn(DIM, indices)
    }

    pub(crate) fn find_simplex_index_dyn(&self, dim: usize, indices: &[usize]) -> Option<usize> {
        let simplices = &self.simplices[dim];
        let index_map = simplices.index_map.get_or_init(|| {
            simplices
                .indices
                .chunks_exact(simplices.simplex_size)
                .enumerate()
                .map(|(i, vert_is)| (Vec::from(vert_is), i))
                .collect()
        });
        index_map.get(indices).copied()
    }

    /// Indices of the `MESH_DIM`-simplices containing the given vertex,
    /// in ascending order.
    pub fn elements_around(&self, vertex: usize) -> &[usize] {
        let incidence = self.vertex_elements.get_or_init(|| {
            let mut incidence = vec![Vec::new(); self.vertices.len()];
            let top_simplices = &self.simplices[MESH_DIM];
            for (elem_idx, indices) in top_simplices
                .indices
                .chunks_exact(top_simplices.simplex_size)
                .enumerate()
            {
                for &v in indices {
                    incidence[v].push(elem_idx);
                }
            }
            incidence
        });
        &incidence[vertex]
    }

    /// Iterate over the indices of the 1-simplices containing the given vertex.
    pub fn edges_around(&self, vertex: usize) -> impl '_ + Iterator<Item = usize> {
        self.simplices[0].coboundary_map.lane(vertex).iter().copied()
    }

    /// Get the two vertex indices of a 1-simplex.
    #[inline]
    pub fn edge_vertices(&self, edge: usize) -> [usize; 2] {
        let indices = self.simplices[1].simplex_indices(edge);
        [indices[0], indices[1]]
    }

    /// Get the number of 1-simplices in the mesh.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.simplices[1].len()
    }

    /// Get the vertex indices of a `MESH_DIM - 1`-simplex.
    #[inline]
    pub fn facet_indices(&self, facet: usize) -> &[usize] {
        self.simplices[MESH_DIM - 1].simplex_indices(facet)
    }

    //
    // boundary regions
    //

    /// Declare a named boundary region from the indices of `MESH_DIM - 1`-simplices
    /// and return its index among the mesh's regions.
    ///
    /// Regions are kept in declaration order,
    /// which is also the order of precedence when classifying spacetime facets
    /// that fit in more than one region.
    pub fn add_boundary_region(
        &mut self,
        name: impl Into<String>,
        facets: impl IntoIterator<Item = usize>,
    ) -> usize {
        let facet_collection = &self.simplices[MESH_DIM - 1];
        let mut facet_bits = fb::FixedBitSet::with_capacity(facet_collection.len());
        let mut vertex_bits = fb::FixedBitSet::with_capacity(self.vertices.len());
        for facet in facets {
            facet_bits.insert(facet);
            for &v in facet_collection.simplex_indices(facet) {
                vertex_bits.insert(v);
            }
        }

        self.boundary_regions.push(BoundaryRegion {
            name: name.into(),
            facets: facet_bits,
            vertices: vertex_bits,
        });
        self.boundary_regions.len() - 1
    }

    /// Declare a named boundary region containing the mesh boundary facets
    /// whose vertices all pass the given predicate.
    pub fn add_boundary_region_where(
        &mut self,
        name: impl Into<String>,
        pred: impl Fn(&na::SVector<f64, MESH_DIM>) -> bool,
    ) -> usize {
        let facet_collection = &self.simplices[MESH_DIM - 1];
        let facets: Vec<usize> = facet_collection
            .mesh_boundary
            .ones()
            .filter(|&f| {
                facet_collection
                    .simplex_indices(f)
                    .iter()
                    .all(|&v| pred(&self.vertices[v]))
            })
            .collect();
        self.add_boundary_region(name, facets)
    }

    /// Get the named boundary regions declared on this mesh, in declaration order.
    #[inline]
    pub fn boundary_regions(&self) -> &[BoundaryRegion] {
        &self.boundary_regions
    }

    //
    // periodicity
    //

    /// Declare `servant` a periodic copy of `master`.
    ///
    /// `ident` distinguishes independent periodic directions
    /// (e.g. x and y in a doubly periodic rectangle).
    pub fn add_periodic_pair(&mut self, master: usize, servant: usize, ident: usize) {
        self.periodic_pairs.push(PeriodicPair {
            master,
            servant,
            ident,
        });
    }

    /// Get the periodic vertex identifications declared on this mesh.
    #[inline]
    pub fn periodic_pairs(&self) -> &[PeriodicPair] {
        &self.periodic_pairs
    }
}
