//! The output side of a slab conversion:
//! a simplicial mesh one dimension above the spatial mesh,
//! with region-tagged surface elements and periodic identifications.

use nalgebra as na;

use crate::mesh::SimplicialMesh;

/// A boundary facet of a spacetime mesh, tagged with a region.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SurfaceElement {
    /// Spacetime vertex indices in oriented order.
    pub vertices: Vec<usize>,
    /// Index into the mesh's [`regions`][SpacetimeMesh::regions].
    pub region: usize,
}

/// How two identified vertices relate to each other.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum IdentificationKind {
    /// The servant is a periodic copy of the master.
    Periodic = 2,
}

/// An identification between two spacetime vertices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Identification {
    /// Spacetime vertex kept as the representative.
    pub master: usize,
    /// Spacetime vertex identified with the master.
    pub servant: usize,
    /// Identifier, 1-based so that 0 can mean "no identification".
    pub ident: usize,
    /// Kind of the identification.
    pub kind: IdentificationKind,
}

/// A spacetime mesh produced from a tent-pitched slab.
#[derive(Clone, Debug)]
pub struct SpacetimeMesh<const DIM: usize> {
    /// topology with sorted simplices, used for edge and facet lookups.
    /// also carries the surface regions and identifications
    /// as boundary regions and periodic pairs.
    topology: SimplicialMesh<DIM>,
    /// volume elements in construction order, flat chunks of `DIM + 1`
    elements: Vec<usize>,
    regions: Vec<String>,
    surface_elements: Vec<SurfaceElement>,
    identifications: Vec<Identification>,
}

impl<const DIM: usize> SpacetimeMesh<DIM> {
    /// Get the spacetime points. The last coordinate is (scaled) time.
    #[inline]
    pub fn vertices(&self) -> &[na::SVector<f64, DIM>] {
        self.topology.vertices()
    }

    /// Get the number of spacetime vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.topology.vertex_count()
    }

    /// Iterate over the volume elements in the order they were built,
    /// each a slice of `DIM + 1` vertex indices
    /// starting with the apex vertex of the tent it came from.
    #[inline]
    pub fn elements(&self) -> std::slice::ChunksExact<'_, usize> {
        self.elements.chunks_exact(DIM + 1)
    }

    /// Get the number of volume elements.
    #[inline]
    pub fn element_count(&self) -> usize {
        self.elements.len() / (DIM + 1)
    }

    /// Get the names of the surface regions.
    /// [`SurfaceElement::region`] indexes into this.
    #[inline]
    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    /// Look up the index of a surface region by name.
    pub fn region_index(&self, name: &str) -> Option<usize> {
        self.regions.iter().position(|r| r == name)
    }

    /// Get the oriented, region-tagged surface elements.
    #[inline]
    pub fn surface_elements(&self) -> &[SurfaceElement] {
        &self.surface_elements
    }

    /// Iterate over the surface elements in one region.
    pub fn surface_elements_in(&self, region: usize) -> impl '_ + Iterator<Item = &SurfaceElement> {
        self.surface_elements
            .iter()
            .filter(move |s| s.region == region)
    }

    /// Get the periodic identifications between spacetime vertices.
    #[inline]
    pub fn identifications(&self) -> &[Identification] {
        &self.identifications
    }

    /// Get the underlying simplicial mesh,
    /// where every simplex has its vertices sorted.
    #[inline]
    pub fn topology(&self) -> &SimplicialMesh<DIM> {
        &self.topology
    }

    /// Get the number of edges in the mesh.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.topology.edge_count()
    }

    /// Find the edge between two spacetime vertices, given in any order.
    pub fn find_edge(&self, a: usize, b: usize) -> Option<usize> {
        self.topology
            .find_simplex_index_dyn(1, &[a.min(b), a.max(b)])
    }
}

/// Incremental construction of a [`SpacetimeMesh`].
#[derive(Clone, Debug)]
pub struct SpacetimeMeshBuilder<const DIM: usize> {
    points: Vec<na::SVector<f64, DIM>>,
    elements: Vec<usize>,
    regions: Vec<String>,
    surface_elements: Vec<SurfaceElement>,
    identifications: Vec<Identification>,
}

impl<const DIM: usize> Default for SpacetimeMeshBuilder<DIM> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const DIM: usize> SpacetimeMeshBuilder<DIM> {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            points: Vec::new(),
            elements: Vec::new(),
            regions: Vec::new(),
            surface_elements: Vec::new(),
            identifications: Vec::new(),
        }
    }

    /// Add a point and return its index.
    pub fn add_point(&mut self, point: na::SVector<f64, DIM>) -> usize {
        self.points.push(point);
        self.points.len() - 1
    }

    /// Get the points added so far.
    #[inline]
    pub fn points(&self) -> &[na::SVector<f64, DIM>] {
        &self.points
    }

    /// Add a volume element given by `DIM + 1` point indices.
    pub fn add_volume_element(&mut self, vertices: &[usize]) {
        assert_eq!(
            vertices.len(),
            DIM + 1,
            "a volume element needs DIM + 1 vertices"
        );
        self.elements.extend_from_slice(vertices);
    }

    /// Iterate over the volume elements added so far.
    #[inline]
    pub fn volume_elements(&self) -> std::slice::ChunksExact<'_, usize> {
        self.elements.chunks_exact(DIM + 1)
    }

    /// Add a named surface region and return its index.
    pub fn add_region(&mut self, name: impl Into<String>) -> usize {
        self.regions.push(name.into());
        self.regions.len() - 1
    }

    /// Add a surface element given by `DIM` point indices.
    pub fn add_surface_element(&mut self, vertices: Vec<usize>, region: usize) {
        assert_eq!(vertices.len(), DIM, "a surface element needs DIM vertices");
        assert!(region < self.regions.len(), "undefined region {region}");
        self.surface_elements
            .push(SurfaceElement { vertices, region });
    }

    /// Identify two points with each other.
    pub fn add_identification(&mut self, identification: Identification) {
        self.identifications.push(identification);
    }

    /// Finish the mesh, computing its full topology.
    pub fn build(self) -> SpacetimeMesh<DIM> {
        let mut topology = SimplicialMesh::new(self.points, self.elements.clone());

        // surface regions double as boundary regions of the topology
        // so that downstream code can treat the result like any other mesh
        for (region_idx, name) in self.regions.iter().enumerate() {
            let facets: Vec<usize> = self
                .surface_elements
                .iter()
                .filter(|s| s.region == region_idx)
                .filter_map(|s| {
                    let mut sorted = s.vertices.clone();
                    sorted.sort_unstable();
                    topology.find_simplex_index_dyn(DIM - 1, &sorted)
                })
                .collect();
            topology.add_boundary_region(name.clone(), facets);
        }
        for ident in &self.identifications {
            topology.add_periodic_pair(ident.master, ident.servant, ident.ident);
        }

        SpacetimeMesh {
            topology,
            elements: self.elements,
            regions: self.regions,
            surface_elements: self.surface_elements,
            identifications: self.identifications,
        }
    }
}
