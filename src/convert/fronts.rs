use fixedbitset as fb;
use nalgebra as na;

use super::ConvertError;
use crate::{periodic::PeriodicClosure, spacetime::SpacetimeMeshBuilder, tents::TentSlab};

/// Correspondence between (front, spatial vertex) pairs
/// and the spacetime vertices realizing them.
///
/// Front 0 is the spatial mesh at time 0 and realizes every spatial vertex.
/// A tent of level `l` realizes its apex (and the apex's periodic servants)
/// in front `l + 1`.
#[derive(Clone, Debug)]
pub struct FrontTable {
    /// spacetime vertex per front per spatial vertex, `None` if not realized
    table: Vec<Vec<Option<usize>>>,
    /// spatial vertices in each front, in realization order
    front_vertices: Vec<Vec<usize>>,
    /// fronts each spatial vertex is realized in, in realization order
    vertex_fronts: Vec<Vec<usize>>,
    /// originating spatial vertex of each spacetime vertex
    origins: Vec<usize>,
    /// spacetime vertices on the boundary of the spacetime domain
    on_boundary: fb::FixedBitSet,
}

impl FrontTable {
    fn new(front_count: usize, spatial_vertex_count: usize) -> Self {
        Self {
            table: vec![vec![None; spatial_vertex_count]; front_count],
            front_vertices: vec![Vec::new(); front_count],
            vertex_fronts: vec![Vec::with_capacity(2); spatial_vertex_count],
            origins: Vec::new(),
            on_boundary: fb::FixedBitSet::new(),
        }
    }

    /// Record a new spacetime vertex for a (front, spatial vertex) pair.
    fn realize(
        &mut self,
        front: usize,
        vertex: usize,
        spacetime_vertex: usize,
        boundary: bool,
    ) -> Result<(), ConvertError> {
        let slot = &mut self.table[front][vertex];
        if slot.is_some() {
            return Err(ConvertError::DuplicateRealization { vertex, front });
        }
        *slot = Some(spacetime_vertex);
        self.front_vertices[front].push(vertex);
        self.vertex_fronts[vertex].push(front);

        debug_assert_eq!(spacetime_vertex, self.origins.len());
        self.origins.push(vertex);
        self.on_boundary.grow(spacetime_vertex + 1);
        self.on_boundary.set(spacetime_vertex, boundary);
        Ok(())
    }

    /// Number of fronts, including front 0.
    #[inline]
    pub fn front_count(&self) -> usize {
        self.table.len()
    }

    /// Number of spatial vertices.
    #[inline]
    pub fn spatial_vertex_count(&self) -> usize {
        self.vertex_fronts.len()
    }

    /// Number of spacetime vertices.
    #[inline]
    pub fn spacetime_vertex_count(&self) -> usize {
        self.origins.len()
    }

    /// Spatial vertices realized in a front, in realization order.
    #[inline]
    pub fn front_vertices(&self, front: usize) -> &[usize] {
        &self.front_vertices[front]
    }

    /// Fronts a spatial vertex is realized in, in realization order.
    /// Always starts with front 0.
    #[inline]
    pub fn vertex_fronts(&self, vertex: usize) -> &[usize] {
        &self.vertex_fronts[vertex]
    }

    /// The spacetime vertex realizing a spatial vertex in a front, if any.
    #[inline]
    pub fn spacetime_vertex(&self, front: usize, vertex: usize) -> Option<usize> {
        self.table[front][vertex]
    }

    /// Like [`spacetime_vertex`][Self::spacetime_vertex],
    /// but a missing realization is an error.
    pub fn realized(&self, front: usize, vertex: usize) -> Result<usize, ConvertError> {
        self.table[front][vertex].ok_or(ConvertError::UnrealizedVertex { vertex, front })
    }

    /// The latest front before `front` in which `vertex` is realized.
    pub fn prev_front(&self, vertex: usize, front: usize) -> Result<usize, ConvertError> {
        self.vertex_fronts[vertex]
            .iter()
            .copied()
            .filter(|&f| f < front)
            .max()
            .ok_or(ConvertError::MissingPriorFront { vertex, front })
    }

    /// The spacetime vertex of the latest realization of `vertex` before `front`.
    pub fn prev_realization(&self, vertex: usize, front: usize) -> Result<usize, ConvertError> {
        let prev = self.prev_front(vertex, front)?;
        self.realized(prev, vertex)
    }

    /// The spatial vertex a spacetime vertex realizes.
    #[inline]
    pub fn origin(&self, spacetime_vertex: usize) -> usize {
        self.origins[spacetime_vertex]
    }

    /// Check whether a spacetime vertex lies on the boundary of the spacetime domain:
    /// in front 0, on the spatial boundary, or at the final time.
    #[inline]
    pub fn is_boundary(&self, spacetime_vertex: usize) -> bool {
        self.on_boundary.contains(spacetime_vertex)
    }

    /// The spatial vertex of a boundary spacetime vertex,
    /// `None` for interior spacetime vertices.
    #[inline]
    pub fn boundary_origin(&self, spacetime_vertex: usize) -> Option<usize> {
        self.is_boundary(spacetime_vertex)
            .then(|| self.origins[spacetime_vertex])
    }
}

/// Create the spacetime vertices of every front,
/// first those of the spatial mesh, then those of the tents in pitching order.
pub(super) fn add_vertices<S, const DIM: usize, const ST_DIM: usize>(
    slab: &S,
    closure: &PeriodicClosure,
    time_scale: f64,
    builder: &mut SpacetimeMeshBuilder<ST_DIM>,
) -> Result<FrontTable, ConvertError>
where
    S: TentSlab<DIM>,
{
    let mesh = slab.mesh();
    let vert_count = mesh.vertex_count();
    let layer_count = slab.layer_count();
    let slab_height = slab.slab_height();
    let spatial_boundary = mesh.boundary_vertices();

    let spacetime_point = |v: usize, time: f64| -> na::SVector<f64, ST_DIM> {
        let x = &mesh.vertices()[v];
        na::SVector::from_fn(|i, _| if i < DIM { x[i] } else { time * time_scale })
    };

    let mut fronts = FrontTable::new(layer_count + 1, vert_count);

    // the whole spatial mesh is the base of the slab
    for v in 0..vert_count {
        let stv = builder.add_point(spacetime_point(v, 0.0));
        fronts.realize(0, v, stv, true)?;
    }

    for tent_idx in 0..slab.tent_count() {
        let tent = slab.tent(tent_idx);
        if tent.vertex >= vert_count {
            return Err(ConvertError::TentVertexOutOfRange {
                tent: tent_idx,
                vertex: tent.vertex,
            });
        }
        if tent.level >= layer_count {
            return Err(ConvertError::TentLevelOutOfRange {
                tent: tent_idx,
                level: tent.level,
                layers: layer_count,
            });
        }

        let front = tent.level + 1;
        // tent heights are assigned, not computed, at the top of the slab
        let on_final = tent.top_time == slab_height;
        let apex_and_servants =
            std::iter::once(tent.vertex).chain(closure.servants_of(tent.vertex).iter().copied());
        for v in apex_and_servants {
            let stv = builder.add_point(spacetime_point(v, tent.top_time));
            fronts.realize(front, v, stv, on_final || spatial_boundary.contains(v))?;
        }
    }

    Ok(fronts)
}
